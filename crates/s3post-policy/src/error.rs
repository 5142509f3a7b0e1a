//! Error types for policy generation.
//!
//! Every failure is raised before any signing work starts, so a caller either
//! gets a complete policy or one of these errors.

use std::fmt;

/// A required upload option, in the order the options are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredOption {
    /// The object key.
    Key,
    /// The bucket name.
    Bucket,
    /// The object content type.
    ContentType,
    /// The region the bucket lives in.
    Region,
    /// The instant the policy is generated at.
    Date,
    /// The access key ID.
    AccessKey,
    /// The secret access key.
    SecretKey,
}

impl RequiredOption {
    /// All required options in validation order.
    pub const ALL: [Self; 7] = [
        Self::Key,
        Self::Bucket,
        Self::ContentType,
        Self::Region,
        Self::Date,
        Self::AccessKey,
        Self::SecretKey,
    ];

    /// The option name as callers spell it.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Bucket => "bucket",
            Self::ContentType => "contentType",
            Self::Region => "region",
            Self::Date => "date",
            Self::AccessKey => "accessKey",
            Self::SecretKey => "secretKey",
        }
    }

    /// The message reported when this option is missing.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Key => "Must provide `key` option with the object key",
            Self::Bucket => "Must provide `bucket` option with your AWS bucket name",
            Self::ContentType => "Must provide `contentType` option with the object content type",
            Self::Region => "Must provide `region` option with your AWS region",
            Self::Date => "Must provide `date` option with the current date",
            Self::AccessKey => "Must provide `accessKey` option with your AWSAccessKeyId",
            Self::SecretKey => "Must provide `secretKey` option with your AWSSecretKey",
        }
    }
}

impl fmt::Display for RequiredOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that can occur while generating an upload policy.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// A required option was not supplied.
    #[error("{}", .0.message())]
    MissingOption(RequiredOption),

    /// `date + 5 minutes - timeDelta` does not fit in the supported date range.
    #[error("`timeDelta` option moves the policy expiration out of the supported date range")]
    ExpirationOutOfRange,

    /// The policy document could not be serialized.
    #[error("failed to serialize policy document: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PolicyError {
    /// The missing option, when this is a validation failure.
    #[must_use]
    pub fn missing_option(&self) -> Option<RequiredOption> {
        match self {
            Self::MissingOption(option) => Some(*option),
            _ => None,
        }
    }
}

/// Convenience result type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
