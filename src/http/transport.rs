//! The HTTP transport seam.
//!
//! [`Transport`] performs exactly one GET and hands back the status, headers
//! and an unread body. Retry policy lives one layer up in
//! [`RetryingHttpClient`](super::RetryingHttpClient); the archive download
//! uses the transport directly because it is never retried.
//!
//! [`ReqwestTransport`] is the production implementation. Tests substitute a
//! scripted transport that replays canned responses.

use crate::constants::{HTTP_CONNECT_TIMEOUT, HTTP_READ_TIMEOUT, USER_AGENT};
use crate::core::{Result, SetupError};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// A single-shot HTTP GET.
///
/// Implementations must report failures that happen before a status line is
/// available as [`SetupError::TransportError`]; any status, including errors,
/// is returned as an [`HttpResponse`].
pub trait Transport: Send + Sync {
    /// Issue a GET for `url`.
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse>> + Send;
}

impl<T: Transport> Transport for &T {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse>> + Send {
        (**self).get(url)
    }
}

/// Body of a response that has not been read yet.
#[derive(Debug)]
enum ResponseBody {
    Streaming(reqwest::Response),
    Buffered(Vec<u8>),
}

/// Status, headers and a lazily read body.
#[derive(Debug)]
pub struct HttpResponse {
    url: String,
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
    discards: Option<Arc<AtomicUsize>>,
}

impl HttpResponse {
    /// Wrap a live reqwest response; the body is streamed on demand.
    #[must_use]
    pub fn from_reqwest(url: &str, response: reqwest::Response) -> Self {
        Self {
            url: url.to_string(),
            status: response.status(),
            headers: response.headers().clone(),
            body: ResponseBody::Streaming(response),
            discards: None,
        }
    }

    /// Build a response around an in-memory body.
    #[must_use]
    pub fn buffered(url: &str, status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            url: url.to_string(),
            status,
            headers,
            body: ResponseBody::Buffered(body),
            discards: None,
        }
    }

    /// Bump `counter` whenever this response is discarded.
    #[must_use]
    pub fn count_discards(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.discards = Some(counter);
        self
    }

    /// Response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Read the whole body into memory.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::TransportError`] when the connection fails
    /// mid-body.
    pub async fn bytes(self) -> Result<Vec<u8>> {
        match self.body {
            ResponseBody::Buffered(body) => Ok(body),
            ResponseBody::Streaming(response) => {
                let url = self.url;
                response.bytes().await.map(|b| b.to_vec()).map_err(|e| SetupError::TransportError {
                    url,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Read and discard the body so the connection can be reused.
    ///
    /// Errors while draining are logged and otherwise ignored.
    pub async fn discard(self) {
        if let Some(counter) = &self.discards {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        if let ResponseBody::Streaming(mut response) = self.body {
            loop {
                match response.chunk().await {
                    Ok(Some(_)) => {}
                    Ok(None) => break,
                    Err(e) => {
                        debug!(url = %self.url, error = %e, "Failed to drain response body");
                        break;
                    }
                }
            }
        }
    }

    /// Stream the body into `file`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::TransportError`] when the connection fails and
    /// [`SetupError::IoError`] when the write fails.
    pub async fn write_to(self, file: &mut tokio::fs::File) -> Result<u64> {
        let mut written = 0u64;
        match self.body {
            ResponseBody::Buffered(body) => {
                file.write_all(&body).await?;
                written = body.len() as u64;
            }
            ResponseBody::Streaming(mut response) => {
                while let Some(chunk) =
                    response.chunk().await.map_err(|e| SetupError::TransportError {
                        url: self.url.clone(),
                        reason: e.to_string(),
                    })?
                {
                    file.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
            }
        }
        file.flush().await?;
        Ok(written)
    }
}

/// Production transport backed by a shared [`reqwest::Client`].
///
/// When a token is configured it is sent as a bearer token to the API host
/// only; archive downloads from other hosts stay anonymous.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    token: Option<(String, String)>,
}

impl ReqwestTransport {
    /// Build a transport with the crate's user agent and timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ConfigError`] if the TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self> {
        Self::with_timeouts(HTTP_CONNECT_TIMEOUT, HTTP_READ_TIMEOUT)
    }

    /// Build a transport with explicit connect and per-read timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ConfigError`] if the TLS backend cannot be
    /// initialised.
    pub fn with_timeouts(connect: Duration, read: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect)
            .read_timeout(read)
            .build()
            .map_err(|e| SetupError::ConfigError {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            token: None,
        })
    }

    /// Authenticate requests to the host of `api_url` with `token`.
    ///
    /// An unparseable `api_url` leaves the transport anonymous.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>, api_url: &str) -> Self {
        let host = Url::parse(api_url).ok().and_then(|u| u.host_str().map(str::to_string));
        self.token = token.filter(|t| !t.is_empty()).zip(host);
        self
    }

    fn authorization_for(&self, url: &str) -> Option<HeaderValue> {
        let (token, api_host) = self.token.as_ref()?;
        let parsed = Url::parse(url).ok()?;
        if parsed.host_str() != Some(api_host.as_str()) {
            return None;
        }
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).ok()?;
        value.set_sensitive(true);
        Some(value)
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let mut request = self.client.get(url);
        if let Some(auth) = self.authorization_for(url) {
            request = request.header(AUTHORIZATION, auth);
        }

        debug!(url, "GET");
        let response = request.send().await.map_err(|e| SetupError::TransportError {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(HttpResponse::from_reqwest(url, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_only_sent_to_api_host() {
        let transport = ReqwestTransport::new()
            .unwrap()
            .with_token(Some("secret".to_string()), "https://api.github.com/repos/sqlite/sqlite/git");

        let auth = transport
            .authorization_for("https://api.github.com/repos/sqlite/sqlite/git/ref/tags/version-3.47.2")
            .unwrap();
        assert!(auth.is_sensitive());
        assert_eq!(auth.to_str().unwrap(), "Bearer secret");

        assert!(transport.authorization_for("https://www.sqlite.org/2024/x.zip").is_none());
    }

    #[test]
    fn test_empty_token_is_anonymous() {
        let transport = ReqwestTransport::new()
            .unwrap()
            .with_token(Some(String::new()), "https://api.github.com/");
        assert!(transport.authorization_for("https://api.github.com/x").is_none());
    }

    /// Serve one request with a 5-byte body, sending a byte every `gap`.
    async fn dribbling_server(gap: Duration) -> String {
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 5\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
            for byte in b"hello" {
                tokio::time::sleep(gap).await;
                if socket.write_all(&[*byte]).await.is_err() {
                    return;
                }
            }
        });
        format!("http://{addr}/bundle.zip")
    }

    #[tokio::test]
    async fn test_slow_body_is_not_cut_off() {
        let url = dribbling_server(Duration::from_millis(100)).await;
        let transport = ReqwestTransport::with_timeouts(Duration::from_secs(5), Duration::from_millis(400)).unwrap();

        // Total transfer time exceeds the read timeout; no single gap does
        let response = transport.get(&url).await.unwrap();
        assert_eq!(response.bytes().await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_stalled_body_times_out() {
        let url = dribbling_server(Duration::from_secs(2)).await;
        let transport = ReqwestTransport::with_timeouts(Duration::from_secs(5), Duration::from_millis(200)).unwrap();

        let result = match transport.get(&url).await {
            Ok(response) => response.bytes().await,
            Err(e) => Err(e),
        };
        assert!(matches!(result, Err(SetupError::TransportError { .. })), "got {result:?}");
    }

    #[tokio::test]
    async fn test_buffered_body_round_trip() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("body.bin");
        let response =
            HttpResponse::buffered("mem://x", StatusCode::OK, HeaderMap::new(), b"payload".to_vec());
        assert_eq!(response.status(), StatusCode::OK);

        let mut file = tokio::fs::File::create(&path).await.unwrap();
        let written = response.write_to(&mut file).await.unwrap();
        assert_eq!(written, 7);
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
    }
}
