//! POST upload transport for s3post.
//!
//! [`Uploader`] turns a file into a signed POST: it derives the object key
//! from the configured prefix and the file name, dates a policy with its
//! clock, posts the policy fields followed by the file to the bucket endpoint,
//! and parses the `PostResponse` the service answers with.
//!
//! The network sits behind [`RequestTransport`]; [`HttpTransport`] implements
//! it over `reqwest` multipart forms with chunked progress reporting.
//!
//! # Modules
//!
//! - [`client`] - `reqwest` transport
//! - [`config`] - Environment-driven configuration
//! - [`error`] - Transport, protocol and upload errors
//! - [`multipart`] - `multipart/form-data` parser
//! - [`request`] - Form requests, files and progress
//! - [`response`] - The completed upload
//! - [`transport`] - The transport trait
//! - [`upload`] - The put flow
//! - [`url`] - Bucket endpoint URLs

pub mod client;
pub mod config;
pub mod error;
pub mod multipart;
pub mod request;
pub mod response;
pub mod transport;
pub mod upload;
pub mod url;

pub use client::HttpTransport;
pub use config::UploadConfig;
pub use error::{ProtocolError, TransportError, UploadError, UploadResult};
pub use futures::future::{AbortHandle, AbortRegistration};
pub use request::{FormFile, Progress, ProgressCallback, UploadRequest};
pub use response::UploadResponse;
pub use transport::{RequestTransport, TransportResponse};
pub use upload::{Clock, FixedClock, PutOptions, SystemClock, Uploader};
pub use url::{AddressingStyle, TargetUrl};
