//! HTTP client module
//!
//! reqwest wrapper used for cold starts and the built-in load generator.

mod client;

pub use client::{HttpClient, HttpError};
