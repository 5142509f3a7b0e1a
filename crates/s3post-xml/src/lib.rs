//! The XML body S3 answers a POST upload with.
//!
//! On success the service returns:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <PostResponse>
//!   <Location>https://my-s3-bucket.s3.amazonaws.com/uploads%2Fimage.jpg</Location>
//!   <Bucket>my-s3-bucket</Bucket>
//!   <Key>uploads/image.jpg</Key>
//!   <ETag>"afba579120c3ed942f55c8ca50fe39fc"</ETag>
//! </PostResponse>
//! ```
//!
//! Only four fields are ever read, so parsing is a fixed set of single-capture
//! patterns rather than a full XML deserializer. [`PostResponse::to_xml`]
//! renders the same shape and is used by local test endpoints.

pub mod post_response;

pub use post_response::{PostResponse, error_to_xml};
