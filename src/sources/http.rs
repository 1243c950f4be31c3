use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

use crate::error::{PipelineError, Result};
use crate::sources::retry::FetchFailure;

/// Port for retrieving a remote resource by URL
pub trait Fetcher {
    fn get(&self, url: &str) -> std::result::Result<Vec<u8>, FetchFailure>;
}

/// Blocking `reqwest` implementation of [`Fetcher`]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, url: &str) -> std::result::Result<Vec<u8>, FetchFailure> {
        tracing::debug!("HTTP GET request to: {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchFailure::transient(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = format!("HTTP status {}", status.as_u16());
            // Server errors and throttling may clear up; other statuses will not
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                FetchFailure::transient(message)
            } else {
                FetchFailure::permanent(message)
            });
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = resp
            .bytes()
            .map_err(|e| FetchFailure::transient(e.to_string()))?
            .to_vec();
        tracing::debug!(
            "HTTP response: status={}, size={} bytes, content_type={}",
            status.as_u16(),
            bytes.len(),
            content_type
        );
        Ok(bytes)
    }
}
