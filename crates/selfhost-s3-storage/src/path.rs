//! Mapping of object keys onto filesystem paths under the bucket root.
//!
//! Every key is checked lexically before any syscall. A resolved path always
//! has the bucket directory as a strict ancestor.

use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;

/// Resolve `key` to a path strictly inside `root`.
///
/// One leading `/` is stripped. Empty and `.` segments are ignored, so a
/// trailing `/` resolves to the directory itself.
///
/// # Errors
///
/// Returns [`StorageError::InvalidPath`] when the key is empty, still absolute
/// after stripping, contains NUL or `\`, has a `..` segment, or has a segment
/// the platform would interpret as anything other than a plain file name.
pub(crate) fn resolve_key(root: &Path, key: &str) -> Result<PathBuf, StorageError> {
    let invalid = || StorageError::InvalidPath {
        key: key.to_owned(),
    };

    let mut path = root.to_path_buf();
    for segment in key_segments(key).ok_or_else(invalid)? {
        path.push(segment);
    }

    if path.starts_with(root) && path != root {
        Ok(path)
    } else {
        Err(invalid())
    }
}

/// Check that a listing prefix obeys the same rules as a key and return it
/// without its leading `/`.
///
/// Unlike keys, the empty prefix is valid and matches everything.
pub(crate) fn normalize_prefix(prefix: &str) -> Result<&str, StorageError> {
    if key_segments(prefix).is_none() {
        return Err(StorageError::InvalidPath {
            key: prefix.to_owned(),
        });
    }
    Ok(prefix.strip_prefix('/').unwrap_or(prefix))
}

/// Split a key into the plain path segments it names, or `None` if any part
/// of it is unsafe.
fn key_segments(key: &str) -> Option<Vec<&str>> {
    if key.contains(['\0', '\\']) {
        return None;
    }
    let relative = key.strip_prefix('/').unwrap_or(key);
    if relative.starts_with('/') {
        return None;
    }

    let mut segments = Vec::new();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            _ if is_plain_name(segment) => segments.push(segment),
            _ => return None,
        }
    }
    Some(segments)
}

/// Whether `segment` is exactly one ordinary file name.
pub(crate) fn is_plain_name(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Convert a path under `root` back into a forward-slash key.
pub(crate) fn path_to_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}
