//! The credential triple the server validates requests against.

use std::fmt;

/// The single access key, secret key and region accepted by the server.
///
/// Built once at startup and never mutated. The secret key is never printed:
/// the [`Debug`](fmt::Debug) implementation redacts it.
///
/// # Examples
///
/// ```
/// use selfhost_s3_auth::Credentials;
///
/// let creds = Credentials::new("AKID", "secret", "eu-west-1");
/// assert_eq!(creds.access_key(), "AKID");
/// assert!(!format!("{creds:?}").contains("secret"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
    region: String,
}

impl Credentials {
    /// Create a credential triple.
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: region.into(),
        }
    }

    /// The access key ID clients must present.
    #[must_use]
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// The shared secret used to derive signing keys.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// The region folded into the signing key.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("region", &self.region)
            .finish()
    }
}
