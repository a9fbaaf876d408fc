//! Header-driven backoff for rate-limited API responses.
//!
//! The tag API signals rate limiting with `403 Forbidden` plus either a
//! `retry-after` header (seconds to wait) or an exhausted quota
//! (`x-ratelimit-remaining: 0`) with the epoch second at which it resets.

use crate::constants::{RATE_LIMIT_REMAINING_HEADER, RATE_LIMIT_RESET_HEADER, RETRY_AFTER_HEADER};
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::time::Duration;

/// Computes how long to wait before retrying a rate-limited response.
///
/// # Arguments
/// * `status` - Response status
/// * `headers` - Response headers
/// * `now_epoch_secs` - Current wall-clock time in seconds since the epoch
///
/// # Returns
/// * `Some(delay)` when the response is a retryable rate limit
/// * `None` for any other response
pub fn rate_limit_delay(
    status: StatusCode,
    headers: &HeaderMap,
    now_epoch_secs: i64,
) -> Option<Duration> {
    if status != StatusCode::FORBIDDEN {
        return None;
    }

    if let Some(seconds) = header_str(headers, RETRY_AFTER_HEADER).and_then(|v| v.parse::<u64>().ok())
    {
        return Some(Duration::from_secs(seconds));
    }

    if header_str(headers, RATE_LIMIT_REMAINING_HEADER) == Some("0") {
        // A missing or garbled reset time means "retry now"
        let reset = header_str(headers, RATE_LIMIT_RESET_HEADER)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(now_epoch_secs);
        let wait = reset.saturating_sub(now_epoch_secs).max(0);
        return Some(Duration::from_secs(wait.unsigned_abs()));
    }

    None
}

/// Sleeps for a server-requested delay.
///
/// # Arguments
/// * `delay` - How long to wait
/// * `retries` - Retries made so far
///
/// # Returns
/// * `u32` - The retry count after this wait
pub async fn backoff_with_delay(delay: Duration, retries: u32) -> u32 {
    tokio::time::sleep(delay).await;
    retries.saturating_add(1)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}
