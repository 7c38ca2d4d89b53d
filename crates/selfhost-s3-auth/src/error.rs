//! Error types for SigV4 validation.
//!
//! Every rejection is one [`AuthError`] variant. Callers map them to a protocol
//! status by matching, never by inspecting the message text.

/// Reasons a request fails AWS Signature Version 4 validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header is missing from the request.
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    /// The `Authorization` header does not follow the
    /// `AWS4-HMAC-SHA256 Credential=..., SignedHeaders=..., Signature=...` grammar,
    /// or its credential scope does not have five components.
    #[error("Malformed Authorization header")]
    MalformedHeader,

    /// The access key in the credential scope is not the configured one.
    #[error("Invalid access key")]
    InvalidAccessKey,

    /// The `X-Amz-Date` header is missing.
    #[error("Missing X-Amz-Date header")]
    MissingDate,

    /// The `X-Amz-Date` header is not in `YYYYMMDDTHHMMSSZ` format.
    #[error("Invalid X-Amz-Date format")]
    InvalidDateFormat,

    /// The request timestamp is more than 15 minutes away from the server clock.
    #[error("Request timestamp too old or too far in the future")]
    ExpiredOrFutureTimestamp,

    /// The computed signature does not match the provided signature.
    #[error("Signature does not match")]
    SignatureMismatch,
}
