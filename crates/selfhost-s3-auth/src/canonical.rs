//! Canonical request construction for AWS Signature Version 4.
//!
//! The canonical request is a newline-separated string:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! `CanonicalHeaders` carries its own trailing newline per header line, so the
//! header block is followed by an empty line before the signed header list.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters that survive query encoding: RFC 3986 unreserved.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Same as [`QUERY_ENCODE_SET`] but forward slashes are kept in paths.
const PATH_ENCODE_SET: &AsciiSet = &QUERY_ENCODE_SET.remove(b'/');

/// Build the full canonical request string from its components.
///
/// `headers` must already be filtered down to the signed headers and kept in
/// the order the client declared them; see [`build_canonical_headers`].
///
/// # Examples
///
/// ```
/// use selfhost_s3_auth::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/test.txt",
///     "",
///     &[("host", "examplebucket.s3.amazonaws.com")],
///     "UNSIGNED-PAYLOAD",
/// );
/// assert_eq!(
///     canonical,
///     "GET\n/test.txt\n\nhost:examplebucket.s3.amazonaws.com\n\nhost\nUNSIGNED-PAYLOAD"
/// );
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    path: &str,
    query: &str,
    headers: &[(&str, &str)],
    payload_hash: &str,
) -> String {
    let canonical_uri = build_canonical_uri(path);
    let canonical_query = build_canonical_query_string(query);
    let canonical_headers = build_canonical_headers(headers);
    let signed_headers = build_signed_headers_string(headers.iter().map(|(name, _)| *name));

    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
    )
}

/// Build the canonical URI from the raw request path.
///
/// A path that already carries percent escapes is used verbatim so that
/// sequences such as `%2F` are not encoded a second time. Otherwise every byte
/// outside the unreserved set is percent-encoded, keeping `/` as is. An empty
/// path becomes `/`.
///
/// # Examples
///
/// ```
/// use selfhost_s3_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri(""), "/");
/// assert_eq!(build_canonical_uri("/test%24file.text"), "/test%24file.text");
/// assert_eq!(build_canonical_uri("/a b/c$d"), "/a%20b/c%24d");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_owned();
    }
    if path.contains('%') {
        return path.to_owned();
    }
    utf8_percent_encode(path, PATH_ENCODE_SET).to_string()
}

/// Build the canonical query string.
///
/// Parameters are decoded as `application/x-www-form-urlencoded`, sorted by
/// name and then by value, and re-encoded with form encoding (space as `+`).
///
/// # Examples
///
/// ```
/// use selfhost_s3_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string(""), "");
/// assert_eq!(build_canonical_query_string("prefix=J&max-keys=2"), "max-keys=2&prefix=J");
/// assert_eq!(build_canonical_query_string("lifecycle"), "lifecycle=");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort_unstable();

    params
        .iter()
        .map(|(k, v)| format!("{}={}", query_escape(k), query_escape(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical header block.
///
/// Each `(name, value)` pair becomes `name:value\n` with the name lowercased
/// and the value trimmed. Internal whitespace runs are left untouched and the
/// declared order is preserved.
///
/// # Examples
///
/// ```
/// use selfhost_s3_auth::canonical::build_canonical_headers;
///
/// let block = build_canonical_headers(&[("Host", " example.com "), ("x-amz-date", "20130524T000000Z")]);
/// assert_eq!(block, "host:example.com\nx-amz-date:20130524T000000Z\n");
/// ```
#[must_use]
pub fn build_canonical_headers(headers: &[(&str, &str)]) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name.to_lowercase(), value.trim()))
        .collect()
}

/// Join signed header names with `;`, lowercased, in the given order.
#[must_use]
pub fn build_signed_headers_string<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(";")
}

/// Form-style escaping: unreserved characters pass, space becomes `+`,
/// everything else is `%XX` with uppercase hex.
fn query_escape(value: &str) -> String {
    utf8_percent_encode(value, QUERY_ENCODE_SET)
        .to_string()
        .replace("%20", "+")
}
