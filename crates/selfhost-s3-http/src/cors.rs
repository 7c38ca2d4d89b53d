//! CORS headers for browser clients.
//!
//! Every response carries the same CORS header set. Only
//! `Access-Control-Allow-Origin` depends on the request.

use http::HeaderMap;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE, HeaderValue,
};

const ALLOW_METHODS: &str = "GET, HEAD, PUT, DELETE, OPTIONS";
const MAX_AGE_SECS: &str = "86400";

/// The configured set of allowed origins.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: Vec<String>,
}

impl CorsPolicy {
    /// Create a policy. An empty list, or one whose first entry is `*`,
    /// allows every origin.
    #[must_use]
    pub fn new(origins: Vec<String>) -> Self {
        Self { origins }
    }

    /// The `Access-Control-Allow-Origin` value for a request from `origin`.
    ///
    /// A listed origin is echoed back; an unlisted or absent one gets the
    /// first configured origin, which the browser will then reject.
    #[must_use]
    pub fn allow_origin<'a>(&'a self, origin: Option<&'a str>) -> &'a str {
        match self.origins.first() {
            None => "*",
            Some(first) if first == "*" => "*",
            Some(first) => origin
                .filter(|o| self.origins.iter().any(|allowed| allowed == o))
                .unwrap_or(first.as_str()),
        }
    }

    /// Insert the CORS header set into `headers`.
    pub fn apply(&self, headers: &mut HeaderMap, origin: Option<&str>) {
        if let Ok(hv) = HeaderValue::from_str(self.allow_origin(origin)) {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, hv);
        }
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
        headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static("*"));
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE_SECS));
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self::new(vec!["*".to_owned()])
    }
}
