//! S3 wire errors.
//!
//! [`S3Error`] carries everything needed to render an S3 `<Error>` response.
//! Storage and authentication errors convert into it by variant, never by
//! message text.

use std::fmt;

use selfhost_s3_auth::AuthError;
use selfhost_s3_storage::StorageError;

/// S3 error codes produced by this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum S3ErrorCode {
    /// Authentication failed.
    AccessDenied,
    /// Upload larger than the configured maximum.
    EntityTooLarge,
    /// Unexpected server-side failure.
    InternalError,
    /// Unsafe or malformed key, or a folder marker with a body.
    InvalidArgument,
    /// Method not supported on this resource.
    MethodNotAllowed,
    /// Bucket other than the configured one.
    NoSuchBucket,
    /// Key does not exist.
    NoSuchKey,
}

impl S3ErrorCode {
    /// The wire name of this code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::EntityTooLarge => "EntityTooLarge",
            Self::InternalError => "InternalError",
            Self::InvalidArgument => "InvalidArgument",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NoSuchKey => "NoSuchKey",
        }
    }

    /// The HTTP status S3 uses for this code.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::AccessDenied => http::StatusCode::FORBIDDEN,
            Self::EntityTooLarge => http::StatusCode::PAYLOAD_TOO_LARGE,
            Self::InternalError => http::StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidArgument => http::StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::NoSuchBucket | Self::NoSuchKey => http::StatusCode::NOT_FOUND,
        }
    }

    /// The message used when no specific one is given.
    #[must_use]
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::AccessDenied => "Access Denied",
            Self::EntityTooLarge => "Your proposed upload exceeds the maximum allowed size",
            Self::InternalError => "We encountered an internal error. Please try again.",
            Self::InvalidArgument => "Invalid Argument",
            Self::MethodNotAllowed => "The specified method is not allowed against this resource",
            Self::NoSuchBucket => "The specified bucket does not exist",
            Self::NoSuchKey => "The specified key does not exist",
        }
    }
}

impl fmt::Display for S3ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An S3 error response.
#[derive(Debug)]
pub struct S3Error {
    /// The error code.
    pub code: S3ErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The resource that caused the error.
    pub resource: Option<String>,
    /// The HTTP status code.
    pub status_code: http::StatusCode,
}

impl fmt::Display for S3Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S3Error({}): {}", self.code, self.message)
    }
}

impl std::error::Error for S3Error {}

impl S3Error {
    /// Create an error with the code's default message and status.
    #[must_use]
    pub fn new(code: S3ErrorCode) -> Self {
        Self::with_message(code, code.default_message())
    }

    /// Create an error with a custom message.
    #[must_use]
    pub fn with_message(code: S3ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            code,
            resource: None,
        }
    }

    /// Set the resource that caused this error.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Create a NoSuchBucket error.
    #[must_use]
    pub fn no_such_bucket(bucket: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::NoSuchBucket).with_resource(bucket)
    }

    /// Create a NoSuchKey error.
    #[must_use]
    pub fn no_such_key(key: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::NoSuchKey).with_resource(key)
    }

    /// Create an EntityTooLarge error naming the limit.
    #[must_use]
    pub fn entity_too_large(max_size: u64) -> Self {
        Self::with_message(
            S3ErrorCode::EntityTooLarge,
            format!("Your proposed upload exceeds the maximum allowed size of {max_size} bytes"),
        )
    }

    /// Create an InvalidArgument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::with_message(S3ErrorCode::InvalidArgument, message)
    }

    /// Create a MethodNotAllowed error.
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::new(S3ErrorCode::MethodNotAllowed)
    }

    /// Create an InternalError error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(S3ErrorCode::InternalError, message)
    }
}

impl From<AuthError> for S3Error {
    fn from(err: AuthError) -> Self {
        Self::with_message(S3ErrorCode::AccessDenied, err.to_string())
    }
}

impl From<StorageError> for S3Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { key } => Self::no_such_key(key),
            StorageError::InvalidPath { .. } | StorageError::FolderMarkerNotEmpty { .. } => {
                Self::invalid_argument(err.to_string())
            }
            StorageError::Io { .. } => Self::internal_error(err.to_string()),
        }
    }
}
