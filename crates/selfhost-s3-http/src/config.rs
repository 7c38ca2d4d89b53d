//! Server configuration.
//!
//! Provides [`S3Config`], loaded from `S3_*` environment variables. Loading
//! goes through a lookup function so that callers (and tests) can supply the
//! environment explicitly.

use std::fmt;
use std::num::ParseIntError;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Default upload limit: 100 MiB.
pub(crate) const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Default `Cache-Control` max-age for public reads: one year.
pub(crate) const DEFAULT_PUBLIC_CACHE_MAX_AGE: i64 = 31_536_000;

/// Human-readable summary of the environment variables, printed when the
/// configuration cannot be loaded.
pub const ENV_HELP: &str = "\
Required environment variables:
  S3_BUCKET               - S3 bucket name
  S3_ACCESS_KEY           - Access key for authentication
  S3_SECRET_KEY           - Secret key for authentication
Optional environment variables:
  S3_PORT                 - Port to listen on (default: 9000)
  S3_LISTEN_HOST          - Address to bind (default: 0.0.0.0)
  S3_STORAGE_PATH         - Local directory for storage (default: ./data)
  S3_REGION               - AWS region (default: us-east-1)
  S3_CORS_ORIGINS         - Allowed CORS origins, comma separated (default: *)
  S3_MAX_FILE_SIZE        - Maximum upload size, e.g. 500KB, 100MB, 1GB (default: 100MB)
  S3_PUBLIC_PREFIX        - Key prefix readable without auth, empty disables (default: public/)
  S3_PUBLIC_CACHE_MAX_AGE - Cache-Control max-age for public reads in seconds (default: 31536000)
  S3_PRUNE_EMPTY_DIRS     - Remove directories left empty by deletes (default: true)
  LOG_LEVEL               - Log filter when RUST_LOG is unset (default: info)";

/// Errors raised while loading [`S3Config`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("{0} is required")]
    MissingVar(&'static str),

    /// `S3_PORT` is not a valid port number.
    #[error("invalid S3_PORT {value:?}: {source}")]
    InvalidPort {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        source: ParseIntError,
    },

    /// `S3_MAX_FILE_SIZE` is not a valid size.
    #[error("invalid S3_MAX_FILE_SIZE {value:?}: {source}")]
    InvalidSize {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        source: ParseIntError,
    },
}

/// SelfhostS3 server configuration.
///
/// # Examples
///
/// ```
/// use selfhost_s3_http::config::S3Config;
///
/// let config = S3Config::builder()
///     .bucket("uploads".into())
///     .access_key("AKID".into())
///     .secret_key("secret".into())
///     .build();
/// assert_eq!(config.port, 9000);
/// assert_eq!(config.public_prefix, "public/");
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct S3Config {
    /// The single bucket served.
    pub bucket: String,

    /// Access key clients must sign with.
    pub access_key: String,

    /// Secret key clients must sign with.
    #[serde(skip_serializing)]
    pub secret_key: String,

    /// TCP port to listen on.
    #[builder(default = 9000)]
    pub port: u16,

    /// Address to bind.
    #[builder(default = String::from("0.0.0.0"))]
    pub listen_host: String,

    /// Directory that holds the bucket directory.
    #[builder(default = String::from("./data"))]
    pub storage_path: String,

    /// Region folded into the signing key.
    #[builder(default = String::from("us-east-1"))]
    pub region: String,

    /// Allowed CORS origins; `["*"]` allows any.
    #[builder(default = vec![String::from("*")])]
    pub cors_origins: Vec<String>,

    /// Maximum accepted upload size in bytes.
    #[builder(default = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,

    /// Key prefix readable without authentication. Empty disables public reads.
    #[builder(default = String::from("public/"))]
    pub public_prefix: String,

    /// `Cache-Control` max-age for public reads; non-positive values send no header.
    #[builder(default = DEFAULT_PUBLIC_CACHE_MAX_AGE)]
    pub public_cache_max_age: i64,

    /// Remove directories left empty after a delete.
    #[builder(default = true)]
    pub prune_empty_dirs: bool,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("port", &self.port)
            .field("listen_host", &self.listen_host)
            .field("storage_path", &self.storage_path)
            .field("region", &self.region)
            .field("cors_origins", &self.cors_origins)
            .field("max_file_size", &self.max_file_size)
            .field("public_prefix", &self.public_prefix)
            .field("public_cache_max_age", &self.public_cache_max_age)
            .field("prune_empty_dirs", &self.prune_empty_dirs)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl S3Config {
    /// Load configuration from the process environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `S3_BUCKET` | required |
    /// | `S3_ACCESS_KEY` | required |
    /// | `S3_SECRET_KEY` | required |
    /// | `S3_PORT` | `9000` |
    /// | `S3_LISTEN_HOST` | `0.0.0.0` |
    /// | `S3_STORAGE_PATH` | `./data` |
    /// | `S3_REGION` | `us-east-1` |
    /// | `S3_CORS_ORIGINS` | `*` |
    /// | `S3_MAX_FILE_SIZE` | `100MB` |
    /// | `S3_PUBLIC_PREFIX` | `public/` |
    /// | `S3_PUBLIC_CACHE_MAX_AGE` | `31536000` |
    /// | `S3_PRUNE_EMPTY_DIRS` | `true` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// # Errors
    ///
    /// See [`S3Config::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset, except for `S3_PUBLIC_PREFIX` where an
    /// empty value disables public reads. A public prefix without a trailing
    /// `/` gets one. An unparseable `S3_PUBLIC_CACHE_MAX_AGE` keeps the default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] for a missing bucket, access key
    /// or secret key, and [`ConfigError::InvalidPort`] /
    /// [`ConfigError::InvalidSize`] for malformed numbers.
    ///
    /// # Examples
    ///
    /// ```
    /// use selfhost_s3_http::config::S3Config;
    ///
    /// let config = S3Config::from_lookup(|name| match name {
    ///     "S3_BUCKET" => Some("uploads".to_owned()),
    ///     "S3_ACCESS_KEY" => Some("AKID".to_owned()),
    ///     "S3_SECRET_KEY" => Some("secret".to_owned()),
    ///     "S3_MAX_FILE_SIZE" => Some("5MB".to_owned()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.max_file_size, 5 * 1024 * 1024);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let required = |name: &'static str| non_empty(name).ok_or(ConfigError::MissingVar(name));

        let mut config = Self::builder()
            .bucket(required("S3_BUCKET")?)
            .access_key(required("S3_ACCESS_KEY")?)
            .secret_key(required("S3_SECRET_KEY")?)
            .build();

        if let Some(v) = non_empty("S3_PORT") {
            config.port = v
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidPort { value: v, source })?;
        }
        if let Some(v) = non_empty("S3_LISTEN_HOST") {
            config.listen_host = v;
        }
        if let Some(v) = non_empty("S3_STORAGE_PATH") {
            config.storage_path = v;
        }
        if let Some(v) = non_empty("S3_REGION") {
            config.region = v;
        }
        if let Some(v) = non_empty("S3_CORS_ORIGINS") {
            config.cors_origins = v.split(',').map(|o| o.trim().to_owned()).collect();
        }
        if let Some(v) = non_empty("S3_MAX_FILE_SIZE") {
            config.max_file_size =
                parse_size(&v).map_err(|source| ConfigError::InvalidSize { value: v, source })?;
        }
        if let Some(v) = lookup("S3_PUBLIC_PREFIX") {
            config.public_prefix = normalize_public_prefix(v);
        }
        if let Some(v) = non_empty("S3_PUBLIC_CACHE_MAX_AGE") {
            if let Ok(age) = v.trim().parse() {
                config.public_cache_max_age = age;
            }
        }
        if let Some(v) = non_empty("S3_PRUNE_EMPTY_DIRS") {
            config.prune_empty_dirs = parse_bool(&v);
        }
        if let Some(v) = non_empty("LOG_LEVEL") {
            config.log_level = v;
        }

        Ok(config)
    }

    /// `host:port` to bind.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.port)
    }
}

/// Parse a size such as `100MB` into bytes.
///
/// Suffixes `B`, `KB`, `MB` and `GB` (case insensitive, powers of 1024) are
/// accepted; a bare number is bytes.
///
/// # Examples
///
/// ```
/// use selfhost_s3_http::config::parse_size;
///
/// assert_eq!(parse_size("1kb").unwrap(), 1024);
/// assert_eq!(parse_size(" 2 GB ").unwrap(), 2 * 1024 * 1024 * 1024);
/// assert!(parse_size("lots").is_err());
/// ```
pub fn parse_size(value: &str) -> Result<u64, ParseIntError> {
    let upper = value.trim().to_ascii_uppercase();

    let (digits, multiplier) = if let Some(n) = upper.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = upper.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix('B') {
        (n, 1)
    } else {
        (upper.as_str(), 1)
    };

    let n: u64 = digits.trim().parse()?;
    Ok(n.saturating_mul(multiplier))
}

fn normalize_public_prefix(prefix: String) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix
    } else {
        format!("{prefix}/")
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
