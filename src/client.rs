//! HTTP client for the archive's services
//!
//! Wraps a shared `reqwest::Client` in the retry executor: every request
//! waits the courtesy delay, transient failures back off exponentially, and
//! a 429 with `Retry-After` raises the floor of the next wait. One instance
//! is built per run and reused for every request so connections are pooled
//! and the User-Agent stays consistent.

use crate::config::{HttpConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::request_with_retry;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// Query parameter pairs appended to a request URL
pub type QueryParams<'a> = [(&'a str, String)];

/// HTTP client with retry semantics shared by search and download requests
#[derive(Clone, Debug)]
pub struct ArchiveClient {
    client: reqwest::Client,
    retry: RetryConfig,
}

impl ArchiveClient {
    /// Build the client from HTTP and retry configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(http: &HttpConfig, retry: RetryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(http.timeout)
            .user_agent(http.user_agent.clone())
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to build HTTP client: {e}"),
                key: None,
            })?;

        Ok(Self { client, retry })
    }

    /// GET a URL and return the response body, retrying transient failures
    ///
    /// The retried unit covers the whole request including the body read, so
    /// a connection dropped mid-transfer is retried like any other transport
    /// failure. Responses with status 429 or 5xx are retried per the retry
    /// configuration; other error statuses fail immediately.
    ///
    /// # Errors
    ///
    /// Returns the last error once the retry budget is exhausted, or the
    /// first non-retryable error encountered.
    pub async fn get_bytes(&self, url: &str, params: &QueryParams<'_>) -> Result<Vec<u8>> {
        request_with_retry(&self.retry, || self.try_get_bytes(url, params)).await
    }

    /// GET a URL and deserialize its JSON body
    ///
    /// The request itself is retried like [`get_bytes`](Self::get_bytes);
    /// a body that fails to parse is not transient and fails immediately
    /// with [`Error::Serialization`].
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &QueryParams<'_>,
    ) -> Result<T> {
        let body = self.get_bytes(url, params).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn try_get_bytes(&self, url: &str, params: &QueryParams<'_>) -> Result<Vec<u8>> {
        let response = self.client.get(url).query(params).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(&response);
            return Err(Error::RateLimited {
                url: response.url().to_string(),
                retry_after,
            });
        }

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Parse a Retry-After header as seconds
///
/// Only the delta-seconds form is honored; HTTP-date values and nonsense
/// (negative, non-finite) are ignored so standard backoff applies.
fn parse_retry_after(response: &reqwest::Response) -> Option<f64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
}
