//! The seam between the upload flow and the network.

use async_trait::async_trait;
use http::HeaderMap;

use crate::error::TransportError;
use crate::request::UploadRequest;

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response text, possibly empty; `None` when the transport has none.
    pub text: Option<String>,
    /// Response headers.
    pub headers: HeaderMap,
}

/// Sends an [`UploadRequest`] and returns the raw response.
///
/// Any answered request is `Ok`, including 4xx and 5xx. `Err` is reserved for
/// requests that got no response at all.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    /// Send the request.
    async fn send(&self, request: UploadRequest) -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: RequestTransport + ?Sized> RequestTransport for std::sync::Arc<T> {
    async fn send(&self, request: UploadRequest) -> Result<TransportResponse, TransportError> {
        (**self).send(request).await
    }
}
