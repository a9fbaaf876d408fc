//! Rate-limit aware GET with a bounded number of retries.
//!
//! Each call runs a small state machine over the responses it receives:
//!
//! - a transport failure propagates immediately and is never retried
//! - `200 OK` ends the call with the response body
//! - any other status once `retries == max_retries` ends with
//!   [`SetupError::RetryExhausted`]
//! - `403` carrying `retry-after`, or an exhausted quota with a reset time,
//!   sleeps for the requested time and tries again
//! - every other status ends with [`SetupError::UnknownStatus`]
//!
//! Bodies of responses that are not returned to the caller are drained before
//! the next step.

use super::transport::Transport;
use crate::core::{Result, SetupError};
use crate::utils::backoff::{backoff_with_delay, rate_limit_delay};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// GET client retrying rate-limited responses.
///
/// # Examples
///
/// ```rust,no_run
/// use setup_sqlite::http::{ReqwestTransport, RetryingHttpClient};
///
/// # async fn example() -> setup_sqlite::core::Result<()> {
/// let client = RetryingHttpClient::new(ReqwestTransport::new()?, 3);
/// let body = client.get("https://api.github.com/repos/sqlite/sqlite/git/ref/tags/version-3.47.2").await?;
/// println!("{} bytes", body.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetryingHttpClient<T> {
    transport: T,
    max_retries: u32,
}

impl<T: Transport> RetryingHttpClient<T> {
    /// Create a client allowing up to `max_retries` retries per call, so at
    /// most `max_retries + 1` requests.
    ///
    /// A value of zero is treated as one retry.
    pub fn new(transport: T, max_retries: u32) -> Self {
        Self {
            transport,
            max_retries: max_retries.max(1),
        }
    }

    /// The underlying single-shot transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Retry budget per call.
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Fetch `url`, retrying while the server rate limits.
    ///
    /// # Errors
    ///
    /// - [`SetupError::TransportError`] on a network failure
    /// - [`SetupError::RetryExhausted`] once the retry budget is spent
    /// - [`SetupError::UnknownStatus`] for a non-retryable status
    pub async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let mut retries = 0u32;
        loop {
            let response = self.transport.get(url).await?;
            let status = response.status();
            if status == StatusCode::OK {
                debug!(url, retries, "Request succeeded");
                return response.bytes().await;
            }

            let delay = rate_limit_delay(status, response.headers(), now_epoch_secs());
            response.discard().await;

            if retries >= self.max_retries {
                warn!(url, retries, status = status.as_u16(), "Retry budget exhausted");
                return Err(SetupError::RetryExhausted {
                    url: url.to_string(),
                    attempts: retries + 1,
                    status: status.as_u16(),
                });
            }

            let Some(delay) = delay else {
                return Err(SetupError::UnknownStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            };

            warn!(
                url,
                retries,
                wait_secs = delay.as_secs(),
                "Rate limited by remote API, backing off"
            );
            retries = backoff_with_delay(delay, retries).await;
        }
    }

    /// Fetch `url` and decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Everything [`get`](Self::get) returns, plus
    /// [`SetupError::MalformedRemoteResponse`] when the body does not decode
    /// into `D`.
    pub async fn get_json<D: DeserializeOwned>(&self, url: &str) -> Result<D> {
        let body = self.get(url).await?;
        serde_json::from_slice(&body).map_err(|e| SetupError::MalformedRemoteResponse {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

fn now_epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
