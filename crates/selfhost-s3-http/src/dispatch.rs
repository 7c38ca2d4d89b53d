//! S3 operation dispatch: runs a routed operation against the store and
//! builds the HTTP response.
//!
//! Upload bodies are never buffered. A PUT streams the request body through a
//! length limit straight into [`Storage::put_object`]; a GET streams the
//! object file back out.

use std::error::Error as StdError;
use std::io;

use bytes::Bytes;
use futures::TryStreamExt;
use http::header::{
    CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED,
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use selfhost_s3_storage::{Object, Storage, StorageError};
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::body::S3ResponseBody;
use crate::error::S3Error;
use crate::response::set_optional_header;
use crate::router::{RoutingContext, S3Operation};
use crate::service::S3HttpConfig;
use crate::xml::list_objects_to_xml;

/// HTTP date format used by `Last-Modified`.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Run `op` and produce its response.
///
/// # Errors
///
/// Returns the [`S3Error`] to render for storage failures and oversized
/// uploads.
pub async fn dispatch_operation<B>(
    op: S3Operation,
    storage: &Storage,
    config: &S3HttpConfig,
    ctx: &RoutingContext,
    parts: &http::request::Parts,
    body: B,
) -> Result<http::Response<S3ResponseBody>, S3Error>
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    debug!(operation = %op, key = %ctx.key, "dispatching S3 operation");
    match op {
        S3Operation::ListObjects => list_objects(storage, ctx).await,
        S3Operation::GetObject => get_object(storage, config, ctx).await,
        S3Operation::HeadObject => head_object(storage, config, ctx).await,
        S3Operation::PutObject => put_object(storage, config, ctx, parts, body).await,
        S3Operation::DeleteObject => delete_object(storage, ctx).await,
    }
}

async fn list_objects(
    storage: &Storage,
    ctx: &RoutingContext,
) -> Result<http::Response<S3ResponseBody>, S3Error> {
    let prefix = ctx.query_value("prefix").unwrap_or("");
    let objects = storage.list_objects(prefix).await?;
    let xml = list_objects_to_xml(storage.bucket(), prefix, &objects);

    Ok(http::Response::builder()
        .status(http::StatusCode::OK)
        .header(CONTENT_TYPE, "application/xml")
        .body(S3ResponseBody::from_xml(xml))
        .expect("static list response should be valid"))
}

async fn get_object(
    storage: &Storage,
    config: &S3HttpConfig,
    ctx: &RoutingContext,
) -> Result<http::Response<S3ResponseBody>, S3Error> {
    let (object, file) = storage.get_object(&ctx.key).await?;

    let mut builder = object_headers(http::Response::builder(), &object);
    builder = cache_control(builder, config, ctx);
    if ctx.query_value("download") == Some("1") {
        let disposition = format!(
            "attachment; filename=\"{}\"",
            file_name(&ctx.key).replace('"', "\\\"")
        );
        builder = set_optional_header(builder, CONTENT_DISPOSITION.as_str(), Some(&disposition));
    }

    let len = object.size;
    builder
        .status(http::StatusCode::OK)
        .body(S3ResponseBody::from_file(file, len))
        .map_err(|e| S3Error::internal_error(e.to_string()))
}

async fn head_object(
    storage: &Storage,
    config: &S3HttpConfig,
    ctx: &RoutingContext,
) -> Result<http::Response<S3ResponseBody>, S3Error> {
    let object = storage.head_object(&ctx.key).await?;

    let builder = object_headers(http::Response::builder(), &object);
    cache_control(builder, config, ctx)
        .status(http::StatusCode::OK)
        .body(S3ResponseBody::empty())
        .map_err(|e| S3Error::internal_error(e.to_string()))
}

async fn put_object<B>(
    storage: &Storage,
    config: &S3HttpConfig,
    ctx: &RoutingContext,
    parts: &http::request::Parts,
    body: B,
) -> Result<http::Response<S3ResponseBody>, S3Error>
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let declared_len = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared_len.is_some_and(|len| len > config.max_file_size) {
        return Err(S3Error::entity_too_large(config.max_file_size).with_resource(&ctx.key));
    }

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let limit = usize::try_from(config.max_file_size).unwrap_or(usize::MAX);
    let stream = Limited::new(body, limit)
        .into_data_stream()
        .map_err(io::Error::other);
    let reader = StreamReader::new(Box::pin(stream));

    let object = match storage.put_object(&ctx.key, content_type, reader).await {
        Ok(object) => object,
        Err(StorageError::Io { source, .. }) if is_length_limit_error(&source) => {
            return Err(S3Error::entity_too_large(config.max_file_size).with_resource(&ctx.key));
        }
        Err(err) => return Err(err.into()),
    };

    let builder = set_optional_header(
        http::Response::builder().status(http::StatusCode::OK),
        ETAG.as_str(),
        Some(&object.etag),
    );
    builder
        .body(S3ResponseBody::empty())
        .map_err(|e| S3Error::internal_error(e.to_string()))
}

async fn delete_object(
    storage: &Storage,
    ctx: &RoutingContext,
) -> Result<http::Response<S3ResponseBody>, S3Error> {
    storage.delete_object(&ctx.key).await?;

    Ok(http::Response::builder()
        .status(http::StatusCode::NO_CONTENT)
        .body(S3ResponseBody::empty())
        .expect("static delete response should be valid"))
}

/// Content-Type, Content-Length, ETag and Last-Modified for `object`.
fn object_headers(builder: http::response::Builder, object: &Object) -> http::response::Builder {
    let last_modified = object.last_modified.format(HTTP_DATE_FORMAT).to_string();
    let builder = set_optional_header(builder, CONTENT_TYPE.as_str(), Some(&object.content_type));
    let builder = builder.header(CONTENT_LENGTH, object.size);
    let builder = set_optional_header(builder, ETAG.as_str(), Some(&object.etag));
    set_optional_header(builder, LAST_MODIFIED.as_str(), Some(&last_modified))
}

/// Cache-Control for anonymous public reads.
fn cache_control(
    builder: http::response::Builder,
    config: &S3HttpConfig,
    ctx: &RoutingContext,
) -> http::response::Builder {
    if ctx.public && config.public_cache_max_age > 0 {
        builder.header(
            CACHE_CONTROL,
            format!("public, max-age={}", config.public_cache_max_age),
        )
    } else {
        builder
    }
}

/// The last path segment of `key`, ignoring a trailing `/`.
fn file_name(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Whether an I/O error came from the upload size limit.
fn is_length_limit_error(err: &io::Error) -> bool {
    err.get_ref()
        .is_some_and(|inner| inner.is::<LengthLimitError>())
}
