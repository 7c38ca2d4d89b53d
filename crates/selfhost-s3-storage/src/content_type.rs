//! Content-type inference from object key extensions.

/// Returned when nothing else matches.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type reported for folder markers.
pub const DIRECTORY_CONTENT_TYPE: &str = "application/x-directory";

/// Extensions whose registry mapping differs between platforms.
const OVERRIDES: &[(&str, &str)] = &[
    ("xml", "application/xml"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("webm", "video/webm"),
];

/// Common web types, consulted when the registry has no entry.
const FALLBACKS: &[(&str, &str)] = &[
    ("json", "application/json"),
    ("js", "application/javascript"),
    ("css", "text/css"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("txt", "text/plain"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("webp", "image/webp"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("mp4", "video/mp4"),
    ("mp3", "audio/mpeg"),
];

/// Guess a MIME type from the extension of `key`.
///
/// The extension is taken from the last path segment and matched case
/// insensitively against the override table, then [`mime_guess`], then the
/// fallback table.
///
/// # Examples
///
/// ```
/// use selfhost_s3_storage::guess_content_type;
///
/// assert_eq!(guess_content_type("report.PDF"), "application/pdf");
/// assert_eq!(guess_content_type("feed.xml"), "application/xml");
/// assert_eq!(guess_content_type("data.bin"), "application/octet-stream");
/// assert_eq!(guess_content_type("Makefile"), "application/octet-stream");
/// ```
#[must_use]
pub fn guess_content_type(key: &str) -> &'static str {
    let Some(ext) = extension(key) else {
        return DEFAULT_CONTENT_TYPE;
    };

    lookup(OVERRIDES, &ext)
        .or_else(|| mime_guess::from_ext(&ext).first_raw())
        .or_else(|| lookup(FALLBACKS, &ext))
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

fn extension(key: &str) -> Option<String> {
    let name = key.rsplit('/').next().unwrap_or(key);
    let (_, ext) = name.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

fn lookup(table: &[(&str, &'static str)], ext: &str) -> Option<&'static str> {
    table
        .iter()
        .find_map(|(candidate, mime)| (*candidate == ext).then_some(*mime))
}
