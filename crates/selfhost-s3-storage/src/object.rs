//! Object metadata as reported by the store.

use std::fs::Metadata;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

/// Metadata of a stored object or folder marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    /// Bucket-relative, forward-slash key. Folder markers end with `/`.
    pub key: String,
    /// Size in bytes; always 0 for folder markers.
    pub size: u64,
    /// Last modification time of the backing file or directory.
    pub last_modified: DateTime<Utc>,
    /// MIME type.
    pub content_type: String,
    /// Quoted fingerprint derived from modification time and size.
    pub etag: String,
}

impl Object {
    /// Build an object from filesystem metadata.
    pub(crate) fn from_metadata(
        key: impl Into<String>,
        metadata: &Metadata,
        size: u64,
        content_type: impl Into<String>,
    ) -> Self {
        let last_modified: DateTime<Utc> = metadata
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH)
            .into();
        Self {
            key: key.into(),
            size,
            etag: etag(last_modified, size),
            last_modified,
            content_type: content_type.into(),
        }
    }

    /// Whether this entry is a folder marker.
    #[must_use]
    pub fn is_folder_marker(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// `"<mtime-nanos-hex>-<size-hex>"`. Not content addressed: rewriting identical
/// bytes later yields a different tag.
fn etag(last_modified: DateTime<Utc>, size: u64) -> String {
    let nanos = last_modified.timestamp_nanos_opt().unwrap_or_default();
    format!("\"{nanos:x}-{size:x}\"")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_should_format_etag_from_mtime_and_size() {
        let mtime = Utc.timestamp_nanos(0x1234_5678);
        assert_eq!(etag(mtime, 255), "\"12345678-ff\"");
    }

    #[test]
    fn test_should_change_etag_with_mtime() {
        let size = 10;
        let a = etag(Utc.timestamp_nanos(1), size);
        let b = etag(Utc.timestamp_nanos(2), size);
        assert_ne!(a, b);
    }
}
