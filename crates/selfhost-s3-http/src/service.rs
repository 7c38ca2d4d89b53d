//! The main S3 HTTP service implementing hyper's `Service` trait.
//!
//! [`S3HttpService`] ties together routing, authentication, dispatch, and response
//! serialization into a single hyper-compatible service. It handles:
//!
//! 1. CORS preflight requests (`OPTIONS`)
//! 2. Health check interception (`GET /health`)
//! 3. Path-style routing via [`S3Router`]
//! 4. SigV4 authentication, skipped for public reads
//! 5. Bucket check against the configured bucket
//! 6. Operation dispatch against the [`Storage`]
//! 7. CORS and common response headers (`x-amz-request-id`, `Server`)
//! 8. Error response formatting

use std::convert::Infallible;
use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue, ORIGIN, SERVER};
use hyper::body::Incoming;
use hyper::service::Service;
use selfhost_s3_auth::SignatureValidator;
use selfhost_s3_storage::Storage;
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::body::S3ResponseBody;
use crate::config::{DEFAULT_MAX_FILE_SIZE, DEFAULT_PUBLIC_CACHE_MAX_AGE, S3Config};
use crate::cors::CorsPolicy;
use crate::dispatch::dispatch_operation;
use crate::error::{S3Error, S3ErrorCode};
use crate::response::error_to_response;
use crate::router::S3Router;

/// Value of the `Server` response header.
const SERVER_NAME: &str = "SelfhostS3";

/// Request-handling settings for the S3 HTTP service.
#[derive(Debug, Clone, TypedBuilder)]
pub struct S3HttpConfig {
    /// Largest accepted upload in bytes.
    #[builder(default = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,
    /// Keys under this prefix are readable without a signature. Empty
    /// disables anonymous reads.
    #[builder(default, setter(into))]
    pub public_prefix: String,
    /// `Cache-Control` max-age for public reads; `0` or less omits the header.
    #[builder(default = DEFAULT_PUBLIC_CACHE_MAX_AGE)]
    pub public_cache_max_age: i64,
    /// Allowed CORS origins.
    #[builder(default = vec![String::from("*")])]
    pub cors_origins: Vec<String>,
}

impl Default for S3HttpConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<&S3Config> for S3HttpConfig {
    fn from(config: &S3Config) -> Self {
        Self {
            max_file_size: config.max_file_size,
            public_prefix: config.public_prefix.clone(),
            public_cache_max_age: config.public_cache_max_age,
            cors_origins: config.cors_origins.clone(),
        }
    }
}

/// The S3 HTTP service that implements hyper's `Service` trait.
///
/// Cloning is cheap; clones share the store, validator and settings.
#[derive(Debug, Clone)]
pub struct S3HttpService {
    storage: Arc<Storage>,
    validator: Arc<SignatureValidator>,
    router: S3Router,
    cors: CorsPolicy,
    config: Arc<S3HttpConfig>,
}

impl S3HttpService {
    /// Create a service over `storage` that authenticates with `validator`.
    #[must_use]
    pub fn new(storage: Arc<Storage>, validator: SignatureValidator, config: S3HttpConfig) -> Self {
        Self {
            router: S3Router::new(config.public_prefix.clone()),
            cors: CorsPolicy::new(config.cors_origins.clone()),
            storage,
            validator: Arc::new(validator),
            config: Arc::new(config),
        }
    }

    /// Handle one request and produce the full response, including CORS and
    /// common headers.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<S3ResponseBody>
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let request_id = Uuid::new_v4().to_string();
        let origin = req
            .headers()
            .get(ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let mut response = self.process_request(req, &request_id).await;
        self.cors.apply(response.headers_mut(), origin.as_deref());
        add_common_headers(response, &request_id)
    }

    /// Process a request through the S3 pipeline.
    async fn process_request<B>(
        &self,
        req: http::Request<B>,
        request_id: &str,
    ) -> http::Response<S3ResponseBody>
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        debug!(%method, %path, request_id, "processing S3 request");

        // 1. CORS preflight.
        if method == http::Method::OPTIONS {
            return cors_preflight_response();
        }

        // 2. Health check interception.
        if is_health_check(&method, &path) {
            return health_check_response();
        }

        // 3. Route.
        let ctx = self.router.resolve(&req);
        let (parts, body) = req.into_parts();

        // 4. Authentication.
        if !ctx.public {
            if let Err(auth_err) = self.validator.validate(&parts) {
                warn!(error = %auth_err, %method, %path, request_id, "authentication failed");
                let s3_err = S3Error::from(auth_err).with_resource(path);
                return error_to_response(&s3_err, request_id);
            }
        }

        // 5. Bucket check.
        if ctx.bucket != self.storage.bucket() {
            debug!(bucket = %ctx.bucket, request_id, "unknown bucket");
            return error_to_response(&S3Error::no_such_bucket(ctx.bucket), request_id);
        }

        // 6. Dispatch.
        let op = match ctx.operation(&method) {
            Ok(op) => op,
            Err(err) => {
                warn!(%method, %path, request_id, "method not allowed");
                return error_to_response(&err, request_id);
            }
        };

        info!(
            operation = %op,
            key = %ctx.key,
            public = ctx.public,
            request_id,
            "routed S3 request"
        );

        match dispatch_operation(op, &self.storage, &self.config, &ctx, &parts, body).await {
            Ok(response) => response,
            Err(err) => {
                log_operation_error(&err, request_id);
                error_to_response(&err, request_id)
            }
        }
    }
}

impl Service<http::Request<Incoming>> for S3HttpService {
    type Response = http::Response<S3ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

/// Routine misses are debug; server failures are errors.
fn log_operation_error(err: &S3Error, request_id: &str) {
    match err.code {
        S3ErrorCode::NoSuchKey => {
            debug!(error = %err, request_id, "S3 operation returned error");
        }
        S3ErrorCode::InternalError => {
            error!(error = %err, request_id, "S3 operation failed");
        }
        _ => {
            warn!(error = %err, request_id, "S3 operation rejected");
        }
    }
}

/// Check if the request is a health check probe.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    (*method == http::Method::GET || *method == http::Method::HEAD) && path == "/health"
}

/// Produce a health check response.
fn health_check_response() -> http::Response<S3ResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(S3ResponseBody::from_bytes(r#"{"status":"ok"}"#))
        .expect("static health response should be valid")
}

/// Produce a CORS preflight response. CORS headers are added afterwards.
fn cors_preflight_response() -> http::Response<S3ResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .body(S3ResponseBody::empty())
        .expect("static CORS response should be valid")
}

/// Add common response headers to every S3 response.
fn add_common_headers(
    mut response: http::Response<S3ResponseBody>,
    request_id: &str,
) -> http::Response<S3ResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = HeaderValue::from_str(request_id) {
        headers.insert("x-amz-request-id", hv);
    }
    headers.insert(SERVER, HeaderValue::from_static(SERVER_NAME));

    response
}
