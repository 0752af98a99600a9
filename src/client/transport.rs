//! Thin HTTP transport for the public data feeds
//!
//! The loaders stay agnostic to TLS and connection-pooling details; they pass
//! a URL and a per-request timeout and get bytes or a captured failure back.

use std::time::Duration;

use reqwest::Client as HttpClient;

use crate::error::{ApiError, Result};

/// Body bytes kept in a non-2xx error message
const ERROR_BODY_LIMIT: usize = 512;

/// Shared HTTP client for unauthenticated feed downloads
pub struct Transport {
    http: HttpClient,
}

impl Transport {
    /// Create a new transport. Timeouts are per-request, not per-client,
    /// because the bulk price download needs far longer than the rest.
    pub fn new() -> Result<Self> {
        let http = HttpClient::builder()
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self { http })
    }

    /// GET a URL and return the response body.
    ///
    /// A non-2xx status is an error with the body captured for diagnostics.
    pub async fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        log::debug!("GET {} (timeout {}s)", url, timeout.as_secs());

        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        let body = response.bytes().await.map_err(ApiError::from)?;

        if !status.is_success() {
            let detail = String::from_utf8_lossy(&body);
            let detail = detail.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: detail,
            }
            .into());
        }

        Ok(body.to_vec())
    }
}
