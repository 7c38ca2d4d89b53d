//! AWS Signature Version 4 header-based authentication.
//!
//! Validation runs the following steps in order, stopping at the first failure:
//!
//! 1. Require and parse the `Authorization` header.
//! 2. Compare the access key with the configured one.
//! 3. Require `X-Amz-Date` and check it lies within the clock-skew window.
//! 4. Rebuild the canonical request from the client-declared signed headers.
//! 5. Derive the signing key, sign the string-to-sign and compare in constant time.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::{build_canonical_request, build_signed_headers_string};
use crate::credentials::Credentials;
use crate::error::AuthError;

/// The only algorithm supported by this implementation.
const SUPPORTED_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Service name folded into the signing key.
const SERVICE: &str = "s3";

/// Payload marker used when the client does not send `x-amz-content-sha256`.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// `X-Amz-Date` format.
const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Maximum accepted distance between the request timestamp and the server clock.
const MAX_CLOCK_SKEW: TimeDelta = TimeDelta::minutes(15);

type HmacSha256 = Hmac<Sha256>;

/// Parsed components of an AWS SigV4 `Authorization` header.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256 Credential=AKID/20130524/us-east-1/s3/aws4_request,
///   SignedHeaders=host;x-amz-content-sha256;x-amz-date,
///   Signature=<hex-signature>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAuthorization {
    /// The signing algorithm (always `AWS4-HMAC-SHA256`).
    pub algorithm: String,
    /// The access key ID.
    pub access_key: String,
    /// The date component of the credential scope (YYYYMMDD).
    pub date: String,
    /// The region from the credential scope.
    pub region: String,
    /// The service from the credential scope.
    pub service: String,
    /// Signed header names in the order the client declared them.
    pub signed_headers: Vec<String>,
    /// The hex-encoded signature.
    pub signature: String,
}

/// Parse an AWS SigV4 `Authorization` header value into its components.
///
/// # Errors
///
/// Returns [`AuthError::MalformedHeader`] if the algorithm is not
/// `AWS4-HMAC-SHA256`, if any of `Credential`, `SignedHeaders` or `Signature`
/// is missing, if the signature is not lowercase hex, or if the credential
/// scope does not split into exactly five `/`-separated fields.
///
/// # Examples
///
/// ```
/// use selfhost_s3_auth::sigv4::parse_authorization_header;
///
/// let parsed = parse_authorization_header(
///     "AWS4-HMAC-SHA256 Credential=AKID/20130524/us-east-1/s3/aws4_request, \
///      SignedHeaders=host;x-amz-date, Signature=abc123",
/// )
/// .unwrap();
/// assert_eq!(parsed.access_key, "AKID");
/// assert_eq!(parsed.signed_headers, vec!["host", "x-amz-date"]);
/// ```
pub fn parse_authorization_header(header: &str) -> Result<ParsedAuthorization, AuthError> {
    let rest = header
        .strip_prefix(SUPPORTED_ALGORITHM)
        .ok_or(AuthError::MalformedHeader)?;
    if !rest.starts_with(char::is_whitespace) {
        return Err(AuthError::MalformedHeader);
    }

    let mut fields = rest.split(',').map(str::trim);
    let credential = next_field(&mut fields, "Credential=")?;
    let signed_headers = next_field(&mut fields, "SignedHeaders=")?;
    let signature = next_field(&mut fields, "Signature=")?;

    if signature.is_empty()
        || !signature
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return Err(AuthError::MalformedHeader);
    }

    let scope: Vec<&str> = credential.split('/').collect();
    let [access_key, date, region, service, _terminator] = scope.as_slice() else {
        return Err(AuthError::MalformedHeader);
    };

    Ok(ParsedAuthorization {
        algorithm: SUPPORTED_ALGORITHM.to_owned(),
        access_key: (*access_key).to_owned(),
        date: (*date).to_owned(),
        region: (*region).to_owned(),
        service: (*service).to_owned(),
        signed_headers: signed_headers.split(';').map(ToOwned::to_owned).collect(),
        signature: signature.to_owned(),
    })
}

/// Take the next comma-separated field and strip its expected `Name=` prefix.
fn next_field<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    prefix: &str,
) -> Result<&'a str, AuthError> {
    fields
        .next()
        .and_then(|field| field.strip_prefix(prefix))
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::MalformedHeader)
}

/// Build the SigV4 string to sign.
///
/// # Examples
///
/// ```
/// use selfhost_s3_auth::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    amz_date: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{SUPPORTED_ALGORITHM}\n{amz_date}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key for the `s3` service.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, "s3")
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let service_key = hmac_sha256(&date_region_key, SERVICE.as_bytes());
    hmac_sha256(&service_key, b"aws4_request")
}

/// Compute the hex-encoded HMAC-SHA256 of `data` under `signing_key`.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Hex-encoded SHA-256 of a payload, as sent in `x-amz-content-sha256`.
///
/// # Examples
///
/// ```
/// use selfhost_s3_auth::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Sign a request and return the matching `Authorization` header value.
///
/// The request must already carry every header in `signed_headers` (a missing
/// `host` header falls back to the URI authority). This is the same
/// computation the validator performs, exposed for clients and tests.
///
/// # Examples
///
/// ```
/// use selfhost_s3_auth::{Credentials, SignatureValidator, sign_request};
///
/// let creds = Credentials::new("AKID", "secret", "us-east-1");
/// let amz_date = chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
/// let (mut parts, ()) = http::Request::builder()
///     .uri("/bucket/key")
///     .header("host", "localhost:9000")
///     .header("x-amz-date", &amz_date)
///     .body(())
///     .unwrap()
///     .into_parts();
///
/// let authorization = sign_request(&parts, &creds, &["host", "x-amz-date"], &amz_date);
/// parts.headers.insert("authorization", authorization.parse().unwrap());
///
/// assert!(SignatureValidator::new(creds).validate(&parts).is_ok());
/// ```
#[must_use]
pub fn sign_request(
    parts: &http::request::Parts,
    credentials: &Credentials,
    signed_headers: &[&str],
    amz_date: &str,
) -> String {
    let signature = expected_signature(parts, credentials, signed_headers, amz_date);
    let date = amz_date.get(..8).unwrap_or(amz_date);
    format!(
        "{SUPPORTED_ALGORITHM} Credential={}/{date}/{}/{SERVICE}/aws4_request, SignedHeaders={}, Signature={signature}",
        credentials.access_key(),
        credentials.region(),
        build_signed_headers_string(signed_headers.iter().copied()),
    )
}

/// Validates SigV4-signed requests against a single configured credential.
///
/// The validator is immutable and can be shared freely between tasks.
#[derive(Debug, Clone)]
pub struct SignatureValidator {
    credentials: Credentials,
}

impl SignatureValidator {
    /// Create a validator for the given credentials.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// The configured credentials.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Validate a request against the current wall clock.
    ///
    /// # Errors
    ///
    /// Returns the first [`AuthError`] encountered; see the module docs for the
    /// order of checks.
    pub fn validate(&self, parts: &http::request::Parts) -> Result<(), AuthError> {
        self.validate_at(parts, Utc::now())
    }

    /// Validate a request as if the server clock read `now`.
    ///
    /// # Errors
    ///
    /// Returns the first [`AuthError`] encountered.
    pub fn validate_at(
        &self,
        parts: &http::request::Parts,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::MalformedHeader)?;

        let parsed = parse_authorization_header(auth_header)?;

        if parsed.access_key != self.credentials.access_key() {
            debug!(access_key = %parsed.access_key, "Unknown access key");
            return Err(AuthError::InvalidAccessKey);
        }

        let amz_date = parts
            .headers
            .get("x-amz-date")
            .ok_or(AuthError::MissingDate)?
            .to_str()
            .map_err(|_| AuthError::InvalidDateFormat)?;
        let request_time = NaiveDateTime::parse_from_str(amz_date, AMZ_DATE_FORMAT)
            .map_err(|_| AuthError::InvalidDateFormat)?
            .and_utc();

        let skew = (now - request_time).abs();
        if skew > MAX_CLOCK_SKEW {
            debug!(amz_date, skew_secs = skew.num_seconds(), "Request outside clock-skew window");
            return Err(AuthError::ExpiredOrFutureTimestamp);
        }

        debug!(
            access_key = %parsed.access_key,
            date = %parsed.date,
            region = %parsed.region,
            service = %parsed.service,
            "Verifying SigV4 signature"
        );

        let signed_headers: Vec<&str> = parsed.signed_headers.iter().map(String::as_str).collect();
        let expected = expected_signature(parts, &self.credentials, &signed_headers, amz_date);

        if parsed.signature.as_bytes().ct_eq(expected.as_bytes()).into() {
            debug!(access_key = %parsed.access_key, "Signature verification succeeded");
            Ok(())
        } else {
            debug!(
                expected = %expected,
                provided = %parsed.signature,
                "Signature mismatch"
            );
            Err(AuthError::SignatureMismatch)
        }
    }
}

/// Compute the signature the configured credentials would produce.
///
/// The scope always uses the configured region and the date prefix of
/// `amz_date`, whatever the client put in its credential scope.
fn expected_signature(
    parts: &http::request::Parts,
    credentials: &Credentials,
    signed_headers: &[&str],
    amz_date: &str,
) -> String {
    let values: Vec<Cow<'_, str>> = signed_headers
        .iter()
        .map(|name| signed_header_value(parts, name))
        .collect();
    let header_pairs: Vec<(&str, &str)> = signed_headers
        .iter()
        .zip(&values)
        .map(|(name, value)| (*name, value.as_ref()))
        .collect();

    let payload_hash = parts
        .headers
        .get("x-amz-content-sha256")
        .map_or(Cow::Borrowed(UNSIGNED_PAYLOAD), |v| {
            String::from_utf8_lossy(v.as_bytes())
        });

    let canonical_request = build_canonical_request(
        parts.method.as_str(),
        parts.uri.path(),
        parts.uri.query().unwrap_or(""),
        &header_pairs,
        &payload_hash,
    );
    debug!(canonical_request, "Built canonical request");

    let date = amz_date.get(..8).unwrap_or(amz_date);
    let scope = format!("{date}/{}/{SERVICE}/aws4_request", credentials.region());
    let string_to_sign = build_string_to_sign(amz_date, &scope, &hash_payload(canonical_request.as_bytes()));

    let signing_key = derive_signing_key(credentials.secret_key(), date, credentials.region());
    compute_signature(&signing_key, &string_to_sign)
}

/// Value of a signed header; `host` falls back to the URI authority and an
/// absent header signs as the empty string.
fn signed_header_value<'a>(parts: &'a http::request::Parts, name: &str) -> Cow<'a, str> {
    let name = name.to_lowercase();
    match parts.headers.get(name.as_str()) {
        Some(value) => String::from_utf8_lossy(value.as_bytes()),
        None if name == "host" => parts
            .uri
            .authority()
            .map_or(Cow::Borrowed(""), |a| Cow::Borrowed(a.as_str())),
        None => Cow::Borrowed(""),
    }
}

/// Compute HMAC-SHA256 and return the raw bytes.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
