//! SigV4 signing-key derivation and POST policy signing.
//!
//! A POST policy is signed in two steps:
//!
//! 1. Derive a signing key from the secret access key through a fixed
//!    HMAC-SHA256 chain scoped to a day, a region and a service.
//! 2. Compute HMAC-SHA256 of the base64-encoded policy with that key and render
//!    it as lowercase hex.
//!
//! The credential scope that names the same day, region and service is
//! rendered by [`CredentialScope`]. The copy placed in the policy and the copy
//! sent as `X-Amz-Credential` must come from the same value.

use std::fmt;

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

/// The signing algorithm identifier sent as `X-Amz-Algorithm`.
pub const SIGNING_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Service name used in the credential scope for S3.
pub const S3_SERVICE_NAME: &str = "s3";

/// Terminating component of every SigV4 credential scope.
pub const REQUEST_VERSION: &str = "aws4_request";

/// Prefix prepended to the secret key to form the first HMAC key.
const SECRET_KEY_PREFIX: &str = "AWS4";

type HmacSha256 = Hmac<Sha256>;

/// The `/`-joined scope binding a signature to an access key, day, region and service.
///
/// Format: `AKID/YYYYMMDD/region/service/aws4_request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialScope<'a> {
    /// The access key ID.
    pub access_key: &'a str,
    /// The scope date in `YYYYMMDD` form.
    pub date: &'a str,
    /// The region the signature is valid in.
    pub region: &'a str,
    /// The service name.
    pub service: &'a str,
    /// The request version, always `aws4_request` for SigV4.
    pub request_version: &'a str,
}

impl<'a> CredentialScope<'a> {
    /// Build an S3 credential scope.
    #[must_use]
    pub fn s3(access_key: &'a str, date: &'a str, region: &'a str) -> Self {
        Self {
            access_key,
            date,
            region,
            service: S3_SERVICE_NAME,
            request_version: REQUEST_VERSION,
        }
    }

    /// Derive the signing key for this scope.
    #[must_use]
    pub fn signing_key(&self, secret_key: &str) -> SigningKey {
        derive_signing_key_for(
            secret_key,
            self.date,
            self.region,
            self.service,
            self.request_version,
        )
    }
}

impl fmt::Display for CredentialScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.access_key, self.date, self.region, self.service, self.request_version
        )
    }
}

/// A derived, scope-bound SigV4 signing key.
///
/// The key bytes are never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    /// The raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Sign `message` and return the lowercase hex signature.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> String {
        hex::encode(hmac_sha256(&self.0, message))
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

/// Derive the S3 signing key for `date` (`YYYYMMDD`) and `region`.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, "s3")
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
///
/// # Examples
///
/// ```
/// use s3post_auth::sigv4::derive_signing_key;
///
/// let key = derive_signing_key("wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY", "20130524", "us-east-1");
/// assert_eq!(key.as_bytes().len(), 32);
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str) -> SigningKey {
    derive_signing_key_for(secret_key, date, region, S3_SERVICE_NAME, REQUEST_VERSION)
}

/// Derive a signing key for an arbitrary service and request version.
#[must_use]
pub fn derive_signing_key_for(
    secret_key: &str,
    date: &str,
    region: &str,
    service: &str,
    request_version: &str,
) -> SigningKey {
    let date_key = hmac_sha256(
        format!("{SECRET_KEY_PREFIX}{secret_key}").as_bytes(),
        date.as_bytes(),
    );
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    SigningKey(hmac_sha256(
        &date_region_service_key,
        request_version.as_bytes(),
    ))
}

/// Check a POST policy signature.
///
/// Recomputes the signature of `encoded_policy` with the key derived from
/// `secret_key`, `date` and `region` and compares it with `signature` in
/// constant time.
#[must_use]
pub fn verify_policy_signature(
    encoded_policy: &str,
    signature: &str,
    secret_key: &str,
    date: &str,
    region: &str,
) -> bool {
    let expected = derive_signing_key(secret_key, date, region).sign(encoded_policy.as_bytes());
    let matches: bool = expected.as_bytes().ct_eq(signature.as_bytes()).into();

    if !matches {
        debug!(
            expected = %expected,
            provided = %signature,
            "POST policy signature mismatch"
        );
    }
    matches
}

/// Compute HMAC-SHA256 and return the raw bytes.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        <HmacSha256 as KeyInit>::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
