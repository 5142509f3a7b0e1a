//! Upload error types.

use std::path::PathBuf;

use s3post_policy::PolicyError;

/// A request that never produced an HTTP response.
///
/// Every variant reports status `0`, the value a browser reports for a request
/// that was not answered.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection failed or the response could not be read.
    #[error("network error: {message}")]
    Network {
        /// Description of the failure.
        message: String,
        /// Partial response text, if any was received.
        text: Option<String>,
    },
    /// The upload was aborted by the caller.
    #[error("upload aborted")]
    Aborted,
    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Status reported for a request without a response.
    #[must_use]
    pub fn status(&self) -> u16 {
        0
    }

    /// Response text received before the failure.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Network { text, .. } => text.as_deref(),
            Self::Aborted | Self::InvalidRequest(_) => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Network {
                message: err.to_string(),
                text: None,
            }
        }
    }
}

/// A response outside the 2xx range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("upload rejected with status {status}")]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Response text.
    pub text: Option<String>,
}

/// Errors from the upload flow.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Policy generation failed.
    #[error(transparent)]
    Policy(#[from] PolicyError),
    /// The request was not answered.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The service answered with a non-2xx status.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// A pre-generated policy lacks its `Policy` or `X-Amz-Signature` field.
    #[error("missing policy")]
    MissingPolicy,
    /// No bucket is configured.
    #[error("Must provide `bucket` option with your AWS bucket name")]
    MissingBucket,
    /// The content type is not a valid media type.
    #[error("invalid content type `{0}`")]
    InvalidContentType(String),
    /// The configured endpoint is not a usable URL.
    #[error("invalid endpoint `{0}`")]
    InvalidEndpoint(String),
    /// The upload file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl UploadError {
    /// HTTP status associated with the error, `0` when no response exists.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Protocol(err) => err.status,
            _ => 0,
        }
    }
}

/// Result alias for upload operations.
pub type UploadResult<T> = Result<T, UploadError>;
