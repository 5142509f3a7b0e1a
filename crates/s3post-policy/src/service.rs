//! Upload policy generation.
//!
//! [`generate`] turns [`UploadRequestOptions`] into the complete set of form
//! fields for one POST upload:
//!
//! 1. Validate the required options in a fixed order.
//! 2. Resolve `acl` and `success_action_status` defaults.
//! 3. Render the credential scope and AMZ date once.
//! 4. Build the policy document, serialize it to compact JSON and base64 it.
//! 5. Derive the signing key and sign the base64 string.
//! 6. Emit the form fields.
//!
//! Generation never reads the clock; the instant comes from `options.date`,
//! so equal options always give byte-identical fields.

use s3post_auth::date::{DateFormat, format_date};
use s3post_auth::sigv4::{CredentialScope, SIGNING_ALGORITHM};
use tracing::debug;

use crate::document::{PolicyDocument, metadata_field_name};
use crate::error::PolicyResult;
use crate::options::UploadRequestOptions;
use crate::policy::{POLICY_FIELD, SIGNATURE_FIELD, UploadPolicy};

/// Generate a signed upload policy.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use s3post_policy::{UploadRequestOptions, generate};
///
/// let options = UploadRequestOptions::new()
///     .key("image.jpg")
///     .bucket("my-s3-bucket")
///     .content_type("image/jpg")
///     .region("us-east-1")
///     .date(Utc.with_ymd_and_hms(2017, 4, 15, 0, 0, 0).unwrap())
///     .access_key("AKIAA7AS6DHAD6ASN23")
///     .secret_key("pLx+brfx0u12ERMcJCfNAEOKH+bMk40ZVa7hh8");
///
/// let policy = generate(&options).unwrap();
/// assert_eq!(policy.get("X-Amz-Date"), Some("20170415T000000Z"));
/// ```
pub fn generate(options: &UploadRequestOptions) -> PolicyResult<UploadPolicy> {
    let options = options.validate()?;

    let yyyymmdd = format_date(&options.date, DateFormat::Yyyymmdd);
    let amz_date = format_date(&options.date, DateFormat::AmzIso8601);
    let scope = CredentialScope::s3(options.access_key, &yyyymmdd, options.region);
    let credential = scope.to_string();

    let document = PolicyDocument::build(&options, &credential, SIGNING_ALGORITHM, &amz_date)?;
    let encoded_policy = document.encode()?;
    let signature = scope
        .signing_key(options.secret_key)
        .sign(encoded_policy.as_bytes());

    debug!(
        bucket = options.bucket,
        key = options.key,
        credential = %credential,
        expiration = %document.expiration,
        conditions = document.conditions.len(),
        "Generated upload policy"
    );

    let mut policy = UploadPolicy::default();
    policy.insert("key", options.key);
    policy.insert("acl", options.acl);
    policy.insert("success_action_status", options.success_action_status);
    policy.insert("Content-Type", options.content_type);
    policy.insert("X-Amz-Credential", credential);
    policy.insert("X-Amz-Algorithm", SIGNING_ALGORITHM);
    policy.insert("X-Amz-Date", amz_date);
    policy.insert(POLICY_FIELD, encoded_policy);
    policy.insert(SIGNATURE_FIELD, signature);

    if let Some(token) = options.session_token {
        policy.insert("X-Amz-Security-Token", token);
    }
    if let Some(metadata) = options.metadata {
        for (name, value) in metadata {
            policy.insert(metadata_field_name(name), value.as_str());
        }
    }

    Ok(policy)
}

/// Stateless handle over [`generate`] for callers that want an injectable value.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadPolicyService;

impl UploadPolicyService {
    /// Generate a signed upload policy. See [`generate`].
    pub fn generate(&self, options: &UploadRequestOptions) -> PolicyResult<UploadPolicy> {
        generate(options)
    }
}
