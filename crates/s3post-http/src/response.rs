//! The completed upload.

use http::HeaderMap;
use s3post_xml::PostResponse;

use crate::error::ProtocolError;
use crate::transport::TransportResponse;

/// An answered upload, successful or not.
#[derive(Debug, Clone)]
pub struct UploadResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response text.
    pub text: Option<String>,
    /// Response headers.
    pub headers: HeaderMap,
    /// Fields parsed from the text; `None` only when there is no text.
    pub body: Option<PostResponse>,
}

impl UploadResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into a [`ProtocolError`].
    pub fn error_for_status(self) -> Result<Self, ProtocolError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ProtocolError {
                status: self.status,
                text: self.text,
            })
        }
    }
}

impl From<TransportResponse> for UploadResponse {
    fn from(response: TransportResponse) -> Self {
        let body = PostResponse::parse_body(response.text.as_deref());
        Self {
            status: response.status,
            text: response.text,
            headers: response.headers,
            body,
        }
    }
}
