//! The bucket endpoint a form is posted to.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{UploadError, UploadResult};

/// Host used when no endpoint is configured.
pub const DEFAULT_AWS_HOST: &str = "s3.amazonaws.com";

/// How the bucket appears in the URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AddressingStyle {
    /// `https://<bucket>.<host>`
    #[default]
    VirtualHosted,
    /// `https://<host>/<bucket>`
    Path,
}

/// Upload endpoint for one bucket.
///
/// The configured endpoint is either a bare host (`s3.eu-west-1.amazonaws.com`),
/// which implies `https`, or a URL with an explicit `http`/`https` scheme for
/// local S3-compatible servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    scheme: String,
    host: String,
    bucket: String,
    style: AddressingStyle,
}

impl TargetUrl {
    /// Build the target URL for `bucket`.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3post_http::{AddressingStyle, TargetUrl};
    ///
    /// let url = TargetUrl::new("my-s3-bucket", None, AddressingStyle::VirtualHosted).unwrap();
    /// assert_eq!(url.to_string(), "https://my-s3-bucket.s3.amazonaws.com");
    ///
    /// let url = TargetUrl::new("photos", Some("http://127.0.0.1:9000"), AddressingStyle::Path).unwrap();
    /// assert_eq!(url.to_string(), "http://127.0.0.1:9000/photos");
    /// ```
    pub fn new(bucket: &str, endpoint: Option<&str>, style: AddressingStyle) -> UploadResult<Self> {
        let endpoint = endpoint.map(str::trim).filter(|e| !e.is_empty());
        let (scheme, host) = match endpoint {
            None => ("https", DEFAULT_AWS_HOST),
            Some(endpoint) => match endpoint.split_once("://") {
                Some((scheme, host)) => (scheme, host),
                None => ("https", endpoint),
            },
        };

        let scheme = scheme.to_ascii_lowercase();
        let host = host.trim_end_matches('/');
        if !matches!(scheme.as_str(), "http" | "https") || host.is_empty() {
            return Err(UploadError::InvalidEndpoint(
                endpoint.unwrap_or_default().to_owned(),
            ));
        }

        let target = Self {
            scheme,
            host: host.to_owned(),
            bucket: bucket.to_owned(),
            style,
        };
        reqwest::Url::parse(&target.to_string())
            .map_err(|_| UploadError::InvalidEndpoint(target.to_string()))?;
        Ok(target)
    }

    /// Host the bucket is served from.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Addressing style in use.
    #[must_use]
    pub fn style(&self) -> AddressingStyle {
        self.style
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.style {
            AddressingStyle::VirtualHosted => {
                write!(f, "{}://{}.{}", self.scheme, self.bucket, self.host)
            }
            AddressingStyle::Path => write!(f, "{}://{}/{}", self.scheme, self.host, self.bucket),
        }
    }
}
