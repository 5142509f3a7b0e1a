//! The put flow: sign a policy for a file and post both to the bucket.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{AbortRegistration, Abortable};
use s3post_policy::{UploadPolicy, UploadPolicyService, UploadRequestOptions};
use tracing::{info, warn};

use crate::client::HttpTransport;
use crate::config::UploadConfig;
use crate::error::{TransportError, UploadError, UploadResult};
use crate::request::{FormFile, Progress, ProgressCallback, UploadRequest};
use crate::response::UploadResponse;
use crate::transport::RequestTransport;

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Per-upload options.
#[derive(Default)]
pub struct PutOptions {
    /// User metadata, signed into the policy as `x-amz-meta-*`.
    pub metadata: BTreeMap<String, String>,
    /// Progress callback.
    pub on_progress: Option<ProgressCallback>,
    /// Abort registration; aborting fails the upload with [`TransportError::Aborted`].
    pub abort: Option<AbortRegistration>,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
}

impl PutOptions {
    /// Add one metadata entry.
    #[must_use]
    pub fn metadata_entry(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }

    /// Report progress to `callback`.
    #[must_use]
    pub fn on_progress(mut self, callback: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Send an extra request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Make the upload abortable through the paired `AbortHandle`.
    #[must_use]
    pub fn abort_registration(mut self, registration: AbortRegistration) -> Self {
        self.abort = Some(registration);
        self
    }
}

impl fmt::Debug for PutOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PutOptions")
            .field("metadata", &self.metadata)
            .field("on_progress", &self.on_progress.is_some())
            .field("abort", &self.abort.is_some())
            .field("headers", &self.headers)
            .finish()
    }
}

/// Uploads files to the configured bucket.
///
/// # Examples
///
/// ```no_run
/// use s3post_http::{FormFile, UploadConfig, Uploader};
///
/// # async fn run() -> Result<(), s3post_http::UploadError> {
/// let uploader = Uploader::new(UploadConfig::from_env());
/// let file = FormFile::new("image.jpg", "image/jpeg", vec![0xff, 0xd8]);
/// let response = uploader.put(file).await?;
/// println!("{:?}", response.body);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Uploader<T = HttpTransport> {
    config: UploadConfig,
    transport: T,
    clock: Arc<dyn Clock>,
    service: UploadPolicyService,
}

impl Uploader<HttpTransport> {
    /// Create an uploader over HTTP.
    #[must_use]
    pub fn new(config: UploadConfig) -> Self {
        Self::with_transport(config, HttpTransport::new())
    }
}

impl<T: RequestTransport> Uploader<T> {
    /// Create an uploader over a custom transport.
    pub fn with_transport(config: UploadConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            clock: Arc::new(SystemClock),
            service: UploadPolicyService,
        }
    }

    /// Replace the clock used to date policies.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Object key for `file`.
    #[must_use]
    pub fn object_key(&self, file: &FormFile) -> String {
        format!("{}{}", self.config.key_prefix, file.name)
    }

    /// Policy options for `file`, dated now.
    pub fn options_for(
        &self,
        file: &FormFile,
        metadata: &BTreeMap<String, String>,
    ) -> UploadResult<UploadRequestOptions> {
        let config = &self.config;
        Ok(UploadRequestOptions {
            key: Some(self.object_key(file)),
            bucket: config.bucket.clone(),
            content_type: Some(file.content_type.clone()),
            region: Some(config.region.clone()),
            date: Some(self.clock.now()),
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
            acl: config.acl.clone(),
            success_action_status: config.success_action_status.clone(),
            time_delta: Some(config.time_delta()?),
            session_token: config.session_token.clone(),
            metadata: (!metadata.is_empty()).then(|| metadata.clone()),
        })
    }

    /// Sign a policy for `file` without sending anything.
    pub fn prepare(
        &self,
        file: &FormFile,
        metadata: &BTreeMap<String, String>,
    ) -> UploadResult<UploadPolicy> {
        Ok(self.service.generate(&self.options_for(file, metadata)?)?)
    }

    /// Sign and upload `file`.
    pub async fn put(&self, file: FormFile) -> UploadResult<UploadResponse> {
        self.put_with(file, PutOptions::default()).await
    }

    /// Sign and upload `file` with per-upload options.
    pub async fn put_with(
        &self,
        file: FormFile,
        options: PutOptions,
    ) -> UploadResult<UploadResponse> {
        let policy = self.prepare(&file, &options.metadata)?;
        self.send(policy, file, options).await
    }

    /// Upload `file` with a policy signed elsewhere.
    ///
    /// The fields are posted as given; no secret is needed here. Metadata in
    /// `options` is ignored since it must already be part of the signed policy.
    pub async fn put_with_policy(
        &self,
        policy: UploadPolicy,
        file: FormFile,
        options: PutOptions,
    ) -> UploadResult<UploadResponse> {
        if policy.policy().is_none() || policy.signature().is_none() {
            return Err(UploadError::MissingPolicy);
        }
        self.send(policy, file, options).await
    }

    async fn send(
        &self,
        policy: UploadPolicy,
        file: FormFile,
        options: PutOptions,
    ) -> UploadResult<UploadResponse> {
        let target = self.config.target_url()?;
        let url = target.to_string();
        let key = policy.get("key").unwrap_or_default().to_owned();
        let bytes = file.len();

        let mut request = UploadRequest::post(url.as_str()).fields(policy).file(file);
        for (name, value) in options.headers {
            request = request.header(name, value);
        }
        if let Some(callback) = options.on_progress {
            request = request.on_progress(callback);
        }

        info!(url = %url, style = ?target.style(), key = %key, bytes, "Uploading object");

        let sending = self.transport.send(request);
        let response = match options.abort {
            Some(registration) => Abortable::new(sending, registration)
                .await
                .map_err(|_| TransportError::Aborted)?,
            None => sending.await,
        };
        let response = match response {
            Ok(response) => UploadResponse::from(response),
            Err(err) => {
                warn!(url = %url, key = %key, error = %err, "Upload failed without response");
                return Err(err.into());
            }
        };

        info!(key = %key, status = response.status, "Upload completed");
        Ok(response)
    }
}
