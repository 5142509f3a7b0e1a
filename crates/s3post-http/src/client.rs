//! [`RequestTransport`] over `reqwest`.
//!
//! The form goes out as a `reqwest` multipart body: every field in order, then
//! the file under [`FILE_FIELD`]. Progress counts the file's bytes as they are
//! pulled into the request body.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::request::{FILE_FIELD, Progress, ProgressCallback, UploadRequest};
use crate::transport::{RequestTransport, TransportResponse};

/// Size of the file chunks progress is reported for.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// HTTP transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    chunk_size: usize,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    /// Create a transport with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Create a transport around an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Report progress every `chunk_size` bytes.
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn form(&self, request: &UploadRequest) -> Result<Form, TransportError> {
        let form = request
            .form_fields()
            .fold(Form::new().percent_encode_noop(), |form, (name, value)| {
                form.text(name.to_owned(), value.to_owned())
            });
        let Some(file) = request.form_file() else {
            return Ok(form);
        };

        let body = match request.progress_callback() {
            Some(callback) => reqwest::Body::wrap_stream(progress_stream(
                file.data.clone(),
                self.chunk_size,
                Arc::clone(callback),
            )),
            None => reqwest::Body::from(file.data.clone()),
        };
        let part = Part::stream_with_length(body, file.len() as u64)
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        Ok(form.part(FILE_FIELD, part))
    }
}

#[async_trait]
impl RequestTransport for HttpTransport {
    async fn send(&self, request: UploadRequest) -> Result<TransportResponse, TransportError> {
        let form = self.form(&request)?;

        let mut builder = self.client.request(request.method().clone(), request.url());
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }

        debug!(
            method = %request.method(),
            url = request.url(),
            boundary = form.boundary(),
            "Sending upload request"
        );

        let response = builder.multipart(form).send().await.map_err(|e| {
            warn!(url = request.url(), error = %e, "Upload request failed");
            TransportError::from(e)
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(|e| TransportError::Network {
            message: e.to_string(),
            text: None,
        })?;

        debug!(status, bytes = text.len(), "Received upload response");

        Ok(TransportResponse {
            status,
            text: Some(text),
            headers,
        })
    }
}

/// Split `data` into chunks and report progress as each one is pulled.
fn progress_stream(
    data: Bytes,
    chunk_size: usize,
    callback: ProgressCallback,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let total = data.len() as u64;
    let chunks: Vec<Bytes> = (0..data.len())
        .step_by(chunk_size)
        .map(|start| data.slice(start..(start + chunk_size).min(data.len())))
        .collect();

    let mut loaded = 0u64;
    stream::iter(chunks).map(move |chunk| {
        loaded += chunk.len() as u64;
        callback(Progress::new(loaded, total));
        Ok(chunk)
    })
}
