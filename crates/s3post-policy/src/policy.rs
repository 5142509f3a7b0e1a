//! The generated set of form fields.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Form field carrying the base64-encoded policy document.
pub const POLICY_FIELD: &str = "Policy";

/// Form field carrying the hex signature.
pub const SIGNATURE_FIELD: &str = "X-Amz-Signature";

/// The form fields that authorize one POST upload.
///
/// Fields keep the order they were emitted in. Names are unique. A policy is
/// tied to the instant it was generated for and must not be reused for a later
/// upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPolicy {
    fields: Vec<(String, String)>,
}

impl UploadPolicy {
    /// Build a policy from fields obtained elsewhere, such as a signing server.
    ///
    /// Later duplicates of a field name replace earlier values.
    pub fn from_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut policy = Self::default();
        for (name, value) in fields {
            policy.insert(name, value);
        }
        policy
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Value of the field `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The base64-encoded policy document.
    #[must_use]
    pub fn policy(&self) -> Option<&str> {
        self.get(POLICY_FIELD)
    }

    /// The hex signature over [`Self::policy`].
    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.get(SIGNATURE_FIELD)
    }

    /// Iterate over `(name, value)` pairs in emission order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consume the policy and return its fields.
    #[must_use]
    pub fn into_fields(self) -> Vec<(String, String)> {
        self.fields
    }
}

impl IntoIterator for UploadPolicy {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for UploadPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
