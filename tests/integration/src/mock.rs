//! In-process S3 POST endpoint.
//!
//! Accepts path-style (`/<bucket>`) or virtual-hosted (`Host: <bucket>.<host>`)
//! form uploads, checks them the way S3 does and keeps what it stored:
//!
//! 1. The credential names a known access key and the signature matches.
//! 2. The policy has not expired.
//! 3. Every condition matches the submitted fields (names compare
//!    case-insensitively) and no unsigned field was sent.

use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{CONTENT_TYPE, ETAG, HOST, LOCATION};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use s3post_auth::sigv4::{SIGNING_ALGORITHM, verify_policy_signature};
use s3post_http::multipart::{MultipartForm, extract_boundary, parse_multipart};
use s3post_xml::{PostResponse, error_to_xml};
use sha2::{Digest, Sha256};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Fields that are never listed as policy conditions.
const UNSIGNED_FIELDS: [&str; 3] = ["policy", "x-amz-signature", "file"];

/// An object accepted by the mock.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Bucket from the request URL.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// `Content-Type` form field.
    pub content_type: Option<String>,
    /// `x-amz-meta-*` fields, without the prefix.
    pub metadata: BTreeMap<String, String>,
    /// `X-Amz-Security-Token` field.
    pub security_token: Option<String>,
    /// File payload.
    pub data: Bytes,
}

#[derive(Debug)]
struct MockState {
    credentials: HashMap<String, String>,
    objects: Mutex<Vec<StoredObject>>,
}

/// A running mock endpoint; stops when dropped.
#[derive(Debug)]
pub struct MockS3 {
    addr: SocketAddr,
    state: Arc<MockState>,
    task: JoinHandle<()>,
}

impl MockS3 {
    /// Start an endpoint accepting one access key.
    pub async fn start(access_key: &str, secret_key: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock endpoint");
        let addr = listener.local_addr().expect("mock endpoint address");
        let state = Arc::new(MockState {
            credentials: HashMap::from([(access_key.to_owned(), secret_key.to_owned())]),
            objects: Mutex::new(Vec::new()),
        });

        let task = tokio::spawn(serve(listener, Arc::clone(&state)));
        Self { addr, state, task }
    }

    /// `http://127.0.0.1:<port>`, usable as a path-style endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Objects stored so far.
    #[must_use]
    pub fn objects(&self) -> Vec<StoredObject> {
        self.state.objects.lock().clone()
    }
}

impl Drop for MockS3 {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(listener: TcpListener, state: Arc<MockState>) {
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                continue;
            }
        };

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let state = Arc::clone(&state);
                async move { Ok::<_, Infallible>(handle(&state, req).await) }
            });
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), svc)
                .await
            {
                debug!(peer_addr = %peer_addr, error = %e, "connection error");
            }
        });
    }
}

async fn handle(state: &MockState, req: Request<Incoming>) -> Response<Full<Bytes>> {
    if req.method() != Method::POST {
        return error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "MethodNotAllowed",
            "Only POST uploads are supported",
        );
    }

    let host = req
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let bucket = match req.uri().path().trim_matches('/') {
        "" => host.split('.').next().unwrap_or_default().to_owned(),
        path => path.to_owned(),
    };
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, "IncompleteBody", &e.to_string());
        }
    };

    let form = match extract_boundary(&content_type).and_then(|b| parse_multipart(&body, &b)) {
        Ok(form) => form,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, "InvalidRequest", &e.to_string()),
    };

    if let Err((status, code, message)) = authorize(state, &bucket, &form) {
        debug!(bucket = %bucket, code, message = %message, "rejecting upload");
        return error_response(status, code, &message);
    }

    let object = store(state, &bucket, &form);
    respond(&host, &form, &object)
}

type Rejection = (StatusCode, &'static str, String);

fn authorize(state: &MockState, bucket: &str, form: &MultipartForm) -> Result<(), Rejection> {
    let field = |name: &str| {
        form.field(name).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "InvalidArgument",
                format!("Bucket POST must contain a field named '{name}'"),
            )
        })
    };
    let policy = field("policy")?;
    let signature = field("x-amz-signature")?;
    let credential = field("x-amz-credential")?;
    let algorithm = field("x-amz-algorithm")?;

    if algorithm != SIGNING_ALGORITHM {
        return Err((
            StatusCode::BAD_REQUEST,
            "InvalidArgument",
            format!("unsupported algorithm {algorithm}"),
        ));
    }

    let scope: Vec<&str> = credential.split('/').collect();
    let [access_key, date, region, _service, _request] = scope.as_slice() else {
        return Err((
            StatusCode::BAD_REQUEST,
            "InvalidArgument",
            format!("malformed credential {credential}"),
        ));
    };
    let secret_key = state.credentials.get(*access_key).ok_or_else(|| {
        (
            StatusCode::FORBIDDEN,
            "InvalidAccessKeyId",
            "The AWS Access Key Id you provided does not exist in our records.".to_owned(),
        )
    })?;
    if !verify_policy_signature(policy, signature, secret_key, date, region) {
        return Err((
            StatusCode::FORBIDDEN,
            "SignatureDoesNotMatch",
            "The request signature we calculated does not match the signature you provided."
                .to_owned(),
        ));
    }

    let document: serde_json::Value = STANDARD
        .decode(policy)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "InvalidPolicyDocument",
                "Invalid Policy: Invalid JSON.".to_owned(),
            )
        })?;

    let now = Utc::now();
    let expired = document["expiration"]
        .as_str()
        .and_then(|e| DateTime::parse_from_rfc3339(e).ok())
        .map(|e| e.with_timezone(&Utc))
        .is_none_or(|expiration| expiration <= now);
    if expired {
        return Err((
            StatusCode::FORBIDDEN,
            "AccessDenied",
            "Invalid according to Policy: Policy expired.".to_owned(),
        ));
    }

    let mut covered = Vec::new();
    for condition in document["conditions"].as_array().into_iter().flatten() {
        let Some((name, expected)) = condition
            .as_object()
            .and_then(|c| c.iter().next())
            .and_then(|(name, value)| Some((name.as_str(), value.as_str()?)))
        else {
            continue;
        };
        let actual = if name.eq_ignore_ascii_case("bucket") {
            Some(bucket)
        } else {
            form.field(name)
        };
        if actual != Some(expected) {
            return Err((
                StatusCode::FORBIDDEN,
                "AccessDenied",
                format!(
                    "Invalid according to Policy: Policy Condition failed: [\"eq\", \"${name}\", \"{expected}\"]"
                ),
            ));
        }
        covered.push(name.to_ascii_lowercase());
    }

    if let Some((extra, _)) = form.fields.iter().find(|(name, _)| {
        let name = name.to_ascii_lowercase();
        !UNSIGNED_FIELDS.contains(&name.as_str()) && !covered.contains(&name)
    }) {
        return Err((
            StatusCode::FORBIDDEN,
            "AccessDenied",
            format!("Invalid according to Policy: Extra input fields: {extra}"),
        ));
    }

    Ok(())
}

fn store(state: &MockState, bucket: &str, form: &MultipartForm) -> StoredObject {
    let metadata = form
        .fields
        .iter()
        .filter_map(|(name, value)| {
            let lower = name.to_ascii_lowercase();
            lower
                .strip_prefix("x-amz-meta-")
                .map(|meta| (meta.to_owned(), value.clone()))
        })
        .collect();

    let object = StoredObject {
        bucket: bucket.to_owned(),
        key: form.field("key").unwrap_or_default().to_owned(),
        content_type: form.field("content-type").map(str::to_owned),
        metadata,
        security_token: form.field("x-amz-security-token").map(str::to_owned),
        data: form.file_data.clone(),
    };
    state.objects.lock().push(object.clone());
    object
}

fn respond(host: &str, form: &MultipartForm, object: &StoredObject) -> Response<Full<Bytes>> {
    let etag = hex::encode(&Sha256::digest(&object.data)[..16]);
    let location = format!(
        "http://{host}/{}/{}",
        object.bucket,
        object.key.replace('/', "%2F")
    );

    let builder = Response::builder()
        .header(ETAG, format!("\"{etag}\""))
        .header(LOCATION, location.as_str());

    let response = match form.field("success_action_status") {
        Some("201") => {
            let body = PostResponse {
                key: Some(object.key.clone()),
                etag: Some(etag),
                bucket: Some(object.bucket.clone()),
                location: Some(location),
            };
            builder
                .status(StatusCode::CREATED)
                .header(CONTENT_TYPE, "application/xml")
                .body(Full::new(Bytes::from(body.to_xml())))
        }
        Some("200") => builder.status(StatusCode::OK).body(Full::default()),
        _ => builder.status(StatusCode::NO_CONTENT).body(Full::default()),
    };
    response.unwrap_or_else(|_| Response::new(Full::default()))
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(error_to_xml(code, message))));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, http::HeaderValue::from_static("application/xml"));
    response
}
