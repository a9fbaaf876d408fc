//! A [`Transport`] that replays scripted responses.
//!
//! Responses are queued per URL and handed out in order. A request for a URL
//! with nothing left in its queue fails as a transport error, which keeps
//! tests honest about how many requests they expect.

use crate::core::{Result, SetupError};
use crate::constants::{RATE_LIMIT_REMAINING_HEADER, RATE_LIMIT_RESET_HEADER, RETRY_AFTER_HEADER};
use crate::http::{HttpResponse, Transport};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One canned reply.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// A complete HTTP response
    Http {
        /// Status code
        status: u16,
        /// Header name/value pairs
        headers: Vec<(String, String)>,
        /// Body bytes
        body: Vec<u8>,
    },
    /// A failure before any status is available
    TransportError(String),
}

impl ScriptedResponse {
    /// `200 OK` with `body`.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::Http {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// `200 OK` with a JSON body.
    pub fn json(value: &serde_json::Value) -> Self {
        Self::ok(value.to_string())
    }

    /// A bare status with a short body.
    pub fn status(status: u16) -> Self {
        Self::Http {
            status,
            headers: Vec::new(),
            body: format!("status {status}").into_bytes(),
        }
    }

    /// `403` asking the client to wait `seconds`.
    pub fn retry_after(seconds: u64) -> Self {
        Self::Http {
            status: 403,
            headers: vec![(RETRY_AFTER_HEADER.to_string(), seconds.to_string())],
            body: b"secondary rate limit".to_vec(),
        }
    }

    /// `403` with an exhausted quota resetting at `reset_epoch_secs`.
    pub fn quota_exhausted(reset_epoch_secs: i64) -> Self {
        Self::Http {
            status: 403,
            headers: vec![
                (RATE_LIMIT_REMAINING_HEADER.to_string(), "0".to_string()),
                (RATE_LIMIT_RESET_HEADER.to_string(), reset_epoch_secs.to_string()),
            ],
            body: b"API rate limit exceeded".to_vec(),
        }
    }

    /// A network-level failure.
    pub fn transport_error(reason: &str) -> Self {
        Self::TransportError(reason.to_string())
    }

    fn into_response(self, url: &str) -> Result<HttpResponse> {
        match self {
            Self::TransportError(reason) => Err(SetupError::TransportError {
                url: url.to_string(),
                reason,
            }),
            Self::Http {
                status,
                headers,
                body,
            } => {
                let status = StatusCode::from_u16(status).map_err(|e| SetupError::Other {
                    message: e.to_string(),
                })?;
                let mut map = HeaderMap::new();
                for (name, value) in headers {
                    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| SetupError::Other {
                        message: e.to_string(),
                    })?;
                    let value = HeaderValue::from_str(&value).map_err(|e| SetupError::Other {
                        message: e.to_string(),
                    })?;
                    map.insert(name, value);
                }
                Ok(HttpResponse::buffered(url, status, map, body))
            }
        }
    }
}

/// Scripted transport; see the module docs.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<ScriptedResponse>>>,
    requests: Mutex<Vec<String>>,
    discards: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    /// An empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `response` for `url` (builder form).
    #[must_use]
    pub fn on(self, url: &str, response: ScriptedResponse) -> Self {
        self.push(url, response);
        self
    }

    /// Queue `response` for `url`.
    pub fn push(&self, url: &str, response: ScriptedResponse) {
        lock(&self.routes).entry(url.to_string()).or_default().push_back(response);
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }

    /// How many times `url` was requested.
    pub fn request_count(&self, url: &str) -> usize {
        lock(&self.requests).iter().filter(|u| u.as_str() == url).count()
    }

    /// How many responses were drained and dropped by their consumer.
    pub fn discarded(&self) -> usize {
        self.discards.load(Ordering::Relaxed)
    }

    /// Whether every queued response was consumed.
    pub fn is_drained(&self) -> bool {
        lock(&self.routes).values().all(VecDeque::is_empty)
    }
}

impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        lock(&self.requests).push(url.to_string());
        let next = lock(&self.routes).get_mut(url).and_then(VecDeque::pop_front);
        match next {
            Some(response) => response
                .into_response(url)
                .map(|r| r.count_discards(Arc::clone(&self.discards))),
            None => Err(SetupError::TransportError {
                url: url.to_string(),
                reason: "no scripted response left".to_string(),
            }),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
