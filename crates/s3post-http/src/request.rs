//! A POST form request: fields, one file, optional progress reporting.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use serde::Serialize;

use crate::error::{UploadError, UploadResult};

/// Name of the form field that carries the file.
pub const FILE_FIELD: &str = "file";

/// The file being uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct FormFile {
    /// File name; appended to the key prefix to form the object key.
    pub name: String,
    /// Content type of the object.
    pub content_type: String,
    /// File contents.
    pub data: Bytes,
}

impl FormFile {
    /// Create a file from memory.
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk.
    ///
    /// The name is the path's final component. Without an explicit content
    /// type the file is sent as `application/octet-stream`.
    pub async fn from_path(
        path: impl AsRef<Path>,
        content_type: Option<&str>,
    ) -> UploadResult<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|source| UploadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = match content_type {
            Some(ct) => ct
                .parse::<mime::Mime>()
                .map_err(|_| UploadError::InvalidContentType(ct.to_owned()))?
                .to_string(),
            None => mime::APPLICATION_OCTET_STREAM.to_string(),
        };
        Ok(Self::new(name, content_type, data))
    }

    /// Size of the contents in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for FormFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Upload progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    /// File bytes sent so far.
    pub loaded: u64,
    /// File size in bytes.
    pub total: u64,
    /// `loaded / total`, `0.0` when the total is zero.
    pub percent: f64,
}

impl Progress {
    /// Compute progress for `loaded` of `total` bytes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(loaded: u64, total: u64) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            loaded as f64 / total as f64
        };
        Self {
            loaded,
            total,
            percent,
        }
    }
}

/// Callback invoked as the body is sent.
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// A multipart POST request ready for a transport.
#[derive(Clone)]
pub struct UploadRequest {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    fields: Vec<(String, String)>,
    file: Option<FormFile>,
    on_progress: Option<ProgressCallback>,
}

impl UploadRequest {
    /// Create a request with the given method and URL.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            fields: Vec::new(),
            file: None,
            on_progress: None,
        }
    }

    /// Create a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Add a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a form field. Setting a name twice replaces its value in place.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
        self
    }

    /// Set several form fields in order.
    #[must_use]
    pub fn fields<K, V>(self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        fields
            .into_iter()
            .fold(self, |request, (name, value)| request.field(name, value))
    }

    /// Attach the file, sent after every field.
    #[must_use]
    pub fn file(mut self, file: FormFile) -> Self {
        self.file = Some(file);
        self
    }

    /// Report progress while the body is sent.
    #[must_use]
    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Extra headers.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Form fields in send order.
    pub fn form_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// The attached file.
    #[must_use]
    pub fn form_file(&self) -> Option<&FormFile> {
        self.file.as_ref()
    }

    /// The progress callback, if any.
    #[must_use]
    pub fn progress_callback(&self) -> Option<&ProgressCallback> {
        self.on_progress.as_ref()
    }
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("fields", &self.fields.len())
            .field("file", &self.file)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}
