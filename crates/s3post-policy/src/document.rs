//! The POST policy document.
//!
//! The document is a JSON object with an `expiration` instant followed by an
//! ordered list of single-entry `conditions`:
//!
//! ```json
//! {"expiration":"2017-04-15T00:05:00.000Z","conditions":[{"bucket":"my-s3-bucket"},{"key":"image.jpg"},...]}
//! ```
//!
//! The storage service verifies the signature over the exact base64 bytes, so
//! field order, condition order and the compact encoding are all significant.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, TimeDelta, Utc};
use s3post_auth::date::{DateFormat, format_date};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::error::{PolicyError, PolicyResult};
use crate::options::ValidatedOptions;

/// How long a policy stays valid before `timeDelta` is applied, in seconds.
pub const POLICY_LIFETIME_SECS: i64 = 5 * 60;

/// Prefix for user metadata field names.
pub const METADATA_PREFIX: &str = "x-amz-meta-";

/// One `{"name": "value"}` exact-match condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// The form field name the condition constrains.
    pub name: String,
    /// The exact value the field must carry.
    pub value: String,
}

impl Condition {
    fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.value)?;
        map.end()
    }
}

/// A POST policy document ready to be encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDocument {
    /// ISO-8601 instant after which the service rejects the upload.
    pub expiration: String,
    /// Exact-match conditions in signing order.
    pub conditions: Vec<Condition>,
}

impl PolicyDocument {
    /// Assemble the document for validated options.
    ///
    /// `credential` and `amz_date` are passed in so the document carries the
    /// very strings that are also sent as form fields.
    pub(crate) fn build(
        options: &ValidatedOptions<'_>,
        credential: &str,
        algorithm: &str,
        amz_date: &str,
    ) -> PolicyResult<Self> {
        let expiration = expiration_instant(options.date, options.time_delta)?;

        let mut conditions = vec![
            Condition::new("bucket", options.bucket),
            Condition::new("key", options.key),
            Condition::new("acl", options.acl),
            Condition::new("success_action_status", options.success_action_status),
            Condition::new("Content-Type", options.content_type),
            Condition::new("x-amz-credential", credential),
            Condition::new("x-amz-algorithm", algorithm),
            Condition::new("x-amz-date", amz_date),
        ];

        if let Some(token) = options.session_token {
            conditions.push(Condition::new("x-amz-security-token", token));
        }

        if let Some(metadata) = options.metadata {
            conditions.extend(
                metadata
                    .iter()
                    .map(|(name, value)| Condition::new(metadata_field_name(name), value.as_str())),
            );
        }

        Ok(Self {
            expiration: format_date(&expiration, DateFormat::Iso8601),
            conditions,
        })
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> PolicyResult<String> {
        serde_json::to_string(self).map_err(PolicyError::from)
    }

    /// Serialize to compact JSON and base64-encode the UTF-8 bytes.
    pub fn encode(&self) -> PolicyResult<String> {
        Ok(STANDARD.encode(self.to_json()?))
    }

    /// Look up the value of the first condition named `name`.
    #[must_use]
    pub fn condition(&self, name: &str) -> Option<&str> {
        self.conditions
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }
}

/// Compute `date + 5 minutes - time_delta`.
///
/// A negative `time_delta` lengthens the window, a positive one shortens it.
pub fn expiration_instant(
    date: DateTime<Utc>,
    time_delta: TimeDelta,
) -> PolicyResult<DateTime<Utc>> {
    TimeDelta::seconds(POLICY_LIFETIME_SECS)
        .checked_sub(&time_delta)
        .and_then(|window| date.checked_add_signed(window))
        .ok_or(PolicyError::ExpirationOutOfRange)
}

/// Form field name for a metadata entry.
#[must_use]
pub fn metadata_field_name(name: &str) -> String {
    format!("{METADATA_PREFIX}{name}")
}
