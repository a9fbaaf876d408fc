//! HTTP access for tag metadata and tool bundle downloads.
//!
//! - [`transport`] - the single-shot [`Transport`] seam and its reqwest implementation
//! - [`retry`] - [`RetryingHttpClient`], which retries rate-limited tag API calls

pub mod retry;
pub mod transport;

pub use retry::RetryingHttpClient;
pub use transport::{HttpResponse, ReqwestTransport, Transport};
