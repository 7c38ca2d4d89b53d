//! Response-building helpers shared by the service and the dispatcher.

use http::header::{CONTENT_TYPE, HeaderValue};

use crate::body::S3ResponseBody;
use crate::error::S3Error;
use crate::xml::error_to_xml;

/// Set an optional header on a response builder if the value is `Some` and
/// a valid header value.
pub(crate) fn set_optional_header(
    builder: http::response::Builder,
    name: &str,
    value: Option<&str>,
) -> http::response::Builder {
    if let Some(v) = value {
        if let Ok(hv) = HeaderValue::from_str(v) {
            return builder.header(name, hv);
        }
    }
    builder
}

/// Convert an [`S3Error`] into an XML error response.
#[must_use]
pub fn error_to_response(err: &S3Error, request_id: &str) -> http::Response<S3ResponseBody> {
    let xml = error_to_xml(
        err.code.as_str(),
        &err.message,
        err.resource.as_deref(),
        request_id,
    );

    http::Response::builder()
        .status(err.status_code)
        .header(CONTENT_TYPE, "application/xml")
        .body(S3ResponseBody::from_xml(xml))
        .unwrap_or_else(|_| {
            let mut resp = http::Response::new(S3ResponseBody::empty());
            *resp.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
            resp
        })
}
