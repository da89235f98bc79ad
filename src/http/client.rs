//! HTTP client for benchmark endpoints
//!
//! Thin wrapper over a shared reqwest client that classifies failures the
//! way the load metrics count them.

use reqwest::{Client, Method};
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// HTTP client errors
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Failed to create HTTP client: {0}")]
    Build(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Connection refused to {0}")]
    ConnectionRefused(String),
}

/// Cheaply cloneable client; clones share one connection pool
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout_secs: u64,
}

impl HttpClient {
    /// Create client with custom timeout
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// Send a request and read the body to completion
    pub async fn send(&self, method: Method, url: &str) -> Result<HttpResponse, HttpError> {
        let start = std::time::Instant::now();

        let response = self
            .client
            .request(method, url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        let waiting_ms = start.elapsed().as_secs_f64() * 1000.0;

        let body = response
            .text()
            .await
            .map_err(|e| self.classify(url, e))?;

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        trace!("{} {} in {:.2}ms", url, status.as_u16(), duration_ms);

        Ok(HttpResponse {
            status_code: status.as_u16(),
            body,
            waiting_ms,
            duration_ms,
        })
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        self.send(Method::GET, url).await
    }

    fn classify(&self, url: &str, e: reqwest::Error) -> HttpError {
        if e.is_timeout() {
            HttpError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            HttpError::ConnectionRefused(url.to_string())
        } else {
            HttpError::RequestFailed(e.to_string())
        }
    }
}

/// HTTP response
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
    /// Time until the response headers arrived
    pub waiting_ms: f64,
    /// Time until the body was read
    pub duration_ms: f64,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}
