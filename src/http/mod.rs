//! HTTP client: transport seam, interceptor pipeline and token refresh.

mod client;
mod refresh;
mod transport;

pub use client::{ApiClient, Attempt};
pub use refresh::{ExpiryListener, REFRESH_PATH};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, REQUEST_ID_HEADER, ReqwestTransport};
