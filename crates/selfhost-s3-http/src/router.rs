//! S3 request routing: path-style addressing and operation identification.
//!
//! Routing happens in two steps so that authentication can run in between:
//!
//! 1. [`S3Router::resolve`] splits the path into bucket and key, parses the
//!    query, and decides whether the request is an anonymous public read.
//! 2. [`RoutingContext::operation`] maps the method and query onto an
//!    [`S3Operation`].

use std::fmt;

use http::Method;
use percent_encoding::percent_decode_str;

use crate::error::S3Error;

/// The operations this server implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum S3Operation {
    /// ListObjectsV2 on the bucket.
    ListObjects,
    /// GetObject.
    GetObject,
    /// HeadObject.
    HeadObject,
    /// PutObject.
    PutObject,
    /// DeleteObject.
    DeleteObject,
}

impl S3Operation {
    /// The AWS operation name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListObjects => "ListObjectsV2",
            Self::GetObject => "GetObject",
            Self::HeadObject => "HeadObject",
            Self::PutObject => "PutObject",
            Self::DeleteObject => "DeleteObject",
        }
    }
}

impl fmt::Display for S3Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path-style router for a single bucket.
#[derive(Debug, Clone)]
pub struct S3Router {
    /// Keys starting with this prefix may be read without a signature.
    /// Empty disables anonymous reads.
    pub public_prefix: String,
}

/// The result of resolving an HTTP request.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    /// First path segment, percent-decoded. Empty for `/`.
    pub bucket: String,
    /// Remainder of the path after the bucket, percent-decoded.
    pub key: String,
    /// Whether this is an anonymous read under the public prefix.
    pub public: bool,
    /// Parsed query parameters.
    pub query_params: Vec<(String, String)>,
}

impl S3Router {
    /// Create a router with the given public prefix.
    #[must_use]
    pub fn new(public_prefix: impl Into<String>) -> Self {
        Self {
            public_prefix: public_prefix.into(),
        }
    }

    /// Resolve an HTTP request to a routing context.
    pub fn resolve<B>(&self, req: &http::Request<B>) -> RoutingContext {
        let (bucket, key) = parse_path(req.uri().path());
        let query_params = parse_query_params(req.uri().query().unwrap_or(""));
        let mut ctx = RoutingContext {
            bucket,
            key,
            public: false,
            query_params,
        };
        ctx.public = self.is_public_read(req.method(), &ctx);
        ctx
    }

    /// Only object reads are public; a listing never is, whatever its path.
    fn is_public_read(&self, method: &Method, ctx: &RoutingContext) -> bool {
        !self.public_prefix.is_empty()
            && ctx.key.starts_with(&self.public_prefix)
            && matches!(
                ctx.operation(method),
                Ok(S3Operation::GetObject | S3Operation::HeadObject)
            )
    }
}

impl RoutingContext {
    /// Identify the operation for `method`.
    ///
    /// # Errors
    ///
    /// Returns `MethodNotAllowed` for methods other than GET, HEAD, PUT and
    /// DELETE.
    pub fn operation(&self, method: &Method) -> Result<S3Operation, S3Error> {
        match *method {
            Method::GET if self.has_query("list-type") || self.key.is_empty() => {
                Ok(S3Operation::ListObjects)
            }
            Method::GET => Ok(S3Operation::GetObject),
            Method::HEAD => Ok(S3Operation::HeadObject),
            Method::PUT => Ok(S3Operation::PutObject),
            Method::DELETE => Ok(S3Operation::DeleteObject),
            _ => Err(S3Error::method_not_allowed().with_resource(self.key.clone())),
        }
    }

    /// Whether the query string names `name`, with or without a value.
    #[must_use]
    pub fn has_query(&self, name: &str) -> bool {
        self.query_params.iter().any(|(k, _)| k == name)
    }

    /// The first value of query parameter `name`.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Split a path-style URI path into decoded `(bucket, key)`.
fn parse_path(path: &str) -> (String, String) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    match trimmed.split_once('/') {
        Some((bucket, key)) => (decode_uri_component(bucket), decode_uri_component(key)),
        None => (decode_uri_component(trimmed), String::new()),
    }
}

/// Decode a percent-encoded URI component.
fn decode_uri_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Parse a query string into decoded key-value pairs.
fn parse_query_params(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}
