//! S3 HTTP routing, configuration, response serialization, and hyper service
//! for SelfhostS3.
//!
//! - **Config** ([`config`]): [`S3Config`](config::S3Config) loaded from `S3_*`
//!   environment variables.
//! - **Routing** ([`router`]): path-style `/{bucket}/{key}` addressing and
//!   operation identification.
//! - **Dispatch** ([`dispatch`]): runs an operation against the
//!   [`Storage`](selfhost_s3_storage::Storage) and builds the response.
//! - **Service** ([`service`]): the [`S3HttpService`](service::S3HttpService)
//!   that implements hyper's `Service` trait.
//! - **Server** ([`server`]): the accept loop with graceful shutdown.
//! - **Body** ([`body`]): buffered, streaming and empty response bodies.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> S3HttpService (hyper Service)
//!     -> CORS preflight / health check interception
//!     -> S3Router (bucket, key, public-read detection)
//!     -> SigV4 authentication (skipped for public reads)
//!     -> bucket check
//!     -> dispatch_operation (Storage)
//!     -> CORS + common response headers (x-amz-request-id, Server)
//!   <- HTTP Response
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use selfhost_s3_auth::{Credentials, SignatureValidator};
//! use selfhost_s3_http::service::{S3HttpConfig, S3HttpService};
//! use selfhost_s3_storage::{Storage, StorageConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Storage::open(StorageConfig::builder().root("./data").bucket("uploads").build()).await?;
//! let validator = SignatureValidator::new(Credentials::new("AKID", "secret", "us-east-1"));
//! let service = S3HttpService::new(Arc::new(storage), validator, S3HttpConfig::default());
//! // Use `service` with hyper server.
//! # Ok(())
//! # }
//! ```

// S3Error is returned by value on every request path; boxing it would add an
// allocation per error for no benefit.
#![allow(clippy::result_large_err)]

pub mod body;
pub mod config;
pub mod cors;
pub mod dispatch;
pub mod error;
pub mod response;
pub mod router;
pub mod server;
pub mod service;
pub mod xml;

// Re-export key types for convenience.
pub use body::S3ResponseBody;
pub use config::{ConfigError, S3Config};
pub use error::{S3Error, S3ErrorCode};
pub use router::{RoutingContext, S3Operation, S3Router};
pub use service::{S3HttpConfig, S3HttpService};
