//! Upload configuration.
//!
//! All configuration can be driven by environment variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `S3POST_BUCKET` | *(unset)* | Target bucket |
//! | `S3POST_REGION` / `AWS_REGION` | `us-east-1` | Bucket region |
//! | `ACCESS_KEY` / `AWS_ACCESS_KEY_ID` | *(unset)* | Access key ID |
//! | `SECRET_KEY` / `AWS_SECRET_ACCESS_KEY` | *(unset)* | Secret access key |
//! | `AWS_SESSION_TOKEN` | *(unset)* | Session token for temporary credentials |
//! | `S3POST_ACL` | `public-read` | Canned ACL |
//! | `S3POST_SUCCESS_ACTION_STATUS` | `201` | Status requested on success |
//! | `S3POST_AWS_URL` | `s3.amazonaws.com` | Endpoint host or URL |
//! | `S3POST_KEY_PREFIX` | *(empty)* | Prepended to file names |
//! | `S3POST_TIME_DELTA_MS` | `0` | Clock skew compensation in milliseconds |
//! | `S3POST_PATH_STYLE` | `false` | Use path-style URLs |
//! | `LOG_LEVEL` | `info` | Log level filter |

use std::fmt;

use chrono::TimeDelta;
use s3post_policy::PolicyError;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{UploadError, UploadResult};
use crate::url::{AddressingStyle, TargetUrl};

/// Default region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Settings shared by every upload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadConfig {
    /// Target bucket.
    pub bucket: Option<String>,
    /// Bucket region.
    pub region: String,
    /// Access key ID.
    pub access_key: Option<String>,
    /// Secret access key.
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
    /// Session token for temporary credentials.
    #[serde(skip_serializing)]
    pub session_token: Option<String>,
    /// Canned ACL; the policy default applies when unset.
    pub acl: Option<String>,
    /// Success status; the policy default applies when unset.
    pub success_action_status: Option<String>,
    /// Endpoint host or URL; `s3.amazonaws.com` when unset.
    pub aws_url: Option<String>,
    /// Prepended to the file name to form the object key.
    pub key_prefix: String,
    /// Clock skew compensation in milliseconds.
    pub time_delta_ms: i64,
    /// Use path-style URLs.
    pub path_style: bool,
    /// Log level.
    pub log_level: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            region: DEFAULT_REGION.to_owned(),
            access_key: None,
            secret_key: None,
            session_token: None,
            acl: None,
            success_action_status: None,
            aws_url: None,
            key_prefix: String::new(),
            time_delta_ms: 0,
            path_style: false,
            log_level: "info".to_owned(),
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |names: &[&str]| names.iter().find_map(|name| lookup(name));
        let mut config = Self::default();

        if let Some(v) = lookup("S3POST_BUCKET") {
            config.bucket = Some(v);
        }
        if let Some(v) = first(&["S3POST_REGION", "AWS_REGION"]) {
            config.region = v;
        }
        config.access_key = first(&["ACCESS_KEY", "AWS_ACCESS_KEY_ID"]);
        config.secret_key = first(&["SECRET_KEY", "AWS_SECRET_ACCESS_KEY"]);
        config.session_token = lookup("AWS_SESSION_TOKEN");
        config.acl = lookup("S3POST_ACL");
        config.success_action_status = lookup("S3POST_SUCCESS_ACTION_STATUS");
        config.aws_url = lookup("S3POST_AWS_URL");
        if let Some(v) = lookup("S3POST_KEY_PREFIX") {
            config.key_prefix = v;
        }
        if let Some(v) = lookup("S3POST_TIME_DELTA_MS") {
            match v.trim().parse::<i64>() {
                Ok(ms) if TimeDelta::try_milliseconds(ms).is_some() => config.time_delta_ms = ms,
                Ok(_) => warn!(value = %v, "ignoring out-of-range S3POST_TIME_DELTA_MS"),
                Err(e) => warn!(value = %v, error = %e, "ignoring invalid S3POST_TIME_DELTA_MS"),
            }
        }
        if let Some(v) = lookup("S3POST_PATH_STYLE") {
            config.path_style = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Clock skew compensation.
    ///
    /// Fails with `ExpirationOutOfRange` when `time_delta_ms` is outside the
    /// range a `TimeDelta` can hold.
    pub fn time_delta(&self) -> Result<TimeDelta, PolicyError> {
        TimeDelta::try_milliseconds(self.time_delta_ms).ok_or(PolicyError::ExpirationOutOfRange)
    }

    /// Addressing style for the target URL.
    #[must_use]
    pub fn addressing_style(&self) -> AddressingStyle {
        if self.path_style {
            AddressingStyle::Path
        } else {
            AddressingStyle::VirtualHosted
        }
    }

    /// Endpoint for the configured bucket.
    pub fn target_url(&self) -> UploadResult<TargetUrl> {
        let bucket = self.bucket.as_deref().ok_or(UploadError::MissingBucket)?;
        TargetUrl::new(bucket, self.aws_url.as_deref(), self.addressing_style())
    }
}

impl fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "..."))
            .field("session_token", &self.session_token.as_ref().map(|_| "..."))
            .field("acl", &self.acl)
            .field("success_action_status", &self.success_action_status)
            .field("aws_url", &self.aws_url)
            .field("key_prefix", &self.key_prefix)
            .field("time_delta_ms", &self.time_delta_ms)
            .field("path_style", &self.path_style)
            .field("log_level", &self.log_level)
            .finish()
    }
}
