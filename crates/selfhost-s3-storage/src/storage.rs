//! Filesystem-backed storage for a single bucket.
//!
//! Objects live as plain files under `{root}/{bucket}`; folder markers are
//! directories. One fair reader/writer lock per [`Storage`] serializes writes
//! (Put, Delete, EnsureDirectory) against everything else, including the
//! streamed body copy of a Put. Reads share the lock.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::content_type::{DIRECTORY_CONTENT_TYPE, guess_content_type};
use crate::error::StorageError;
use crate::object::Object;
use crate::path::{is_plain_name, normalize_prefix, path_to_key, resolve_key};

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// Where and how the bucket is stored.
///
/// # Examples
///
/// ```
/// use selfhost_s3_storage::StorageConfig;
///
/// let config = StorageConfig::builder()
///     .root("./data")
///     .bucket("uploads")
///     .build();
/// assert!(config.prune_empty_dirs);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct StorageConfig {
    /// Directory holding the bucket directory.
    #[builder(setter(into))]
    pub root: PathBuf,
    /// Bucket name; must be a single plain path component.
    #[builder(setter(into))]
    pub bucket: String,
    /// Remove directories left empty after a delete.
    #[builder(default = true)]
    pub prune_empty_dirs: bool,
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// The object store for one bucket.
#[derive(Debug)]
pub struct Storage {
    /// Canonical path of `{root}/{bucket}`.
    root: PathBuf,
    bucket: String,
    prune_empty_dirs: bool,
    lock: RwLock<()>,
}

impl Storage {
    /// Create the bucket directory if needed and open the store on it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] if the bucket name is not a single
    /// plain path component, or [`StorageError::Io`] if the directory cannot be
    /// created or resolved.
    pub async fn open(config: StorageConfig) -> Result<Self, StorageError> {
        if !is_plain_name(&config.bucket) || config.bucket.contains(['/', '\\', '\0']) {
            return Err(StorageError::InvalidPath { key: config.bucket });
        }

        let dir = config.root.join(&config.bucket);
        fs::create_dir_all(&dir)
            .await
            .map_err(StorageError::io("failed to create bucket directory"))?;
        let root = fs::canonicalize(&dir)
            .await
            .map_err(StorageError::io("failed to resolve bucket directory"))?;

        debug!(bucket = %config.bucket, root = %root.display(), "opened storage");

        Ok(Self {
            root,
            bucket: config.bucket,
            prune_empty_dirs: config.prune_empty_dirs,
            lock: RwLock::new(()),
        })
    }

    /// The bucket this store serves.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Absolute path of the bucket directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open an object for reading.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if nothing exists at the key or it names a
    /// directory, [`StorageError::InvalidPath`] for unsafe keys.
    pub async fn get_object(&self, key: &str) -> Result<(Object, File), StorageError> {
        let _guard = self.lock.read().await;

        let path = resolve_key(&self.root, key)?;
        let metadata = file_metadata(key, &path).await?;
        let file = File::open(&path)
            .await
            .map_err(|e| StorageError::from_lookup(key, "failed to open object", e))?;

        trace!(key, size = metadata.len(), "opened object");
        Ok((object_for_file(key, &metadata), file))
    }

    /// Object metadata without opening the file.
    ///
    /// # Errors
    ///
    /// Same as [`Storage::get_object`].
    pub async fn head_object(&self, key: &str) -> Result<Object, StorageError> {
        let _guard = self.lock.read().await;

        let path = resolve_key(&self.root, key)?;
        let metadata = file_metadata(key, &path).await?;
        Ok(object_for_file(key, &metadata))
    }

    /// Write `body` to `key`, replacing any existing object.
    ///
    /// Intermediate directories are created. A key ending in `/` creates a
    /// folder marker directory instead and requires an empty body. The body is
    /// staged in a sibling file and renamed over the key only once fully
    /// written, so a failed upload keeps any previous object and removes the
    /// staging file and the directories this call created.
    ///
    /// # Errors
    ///
    /// [`StorageError::InvalidPath`] for unsafe keys,
    /// [`StorageError::FolderMarkerNotEmpty`] for a folder marker with a body,
    /// [`StorageError::Io`] for filesystem or body read failures.
    pub async fn put_object<R>(
        &self,
        key: &str,
        content_type: Option<&str>,
        mut body: R,
    ) -> Result<Object, StorageError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let _guard = self.lock.write().await;

        let path = resolve_key(&self.root, key)?;
        if key.ends_with('/') {
            return put_folder_marker(key, &path, &mut body).await;
        }

        let parent = path
            .parent()
            .ok_or_else(|| StorageError::InvalidPath {
                key: key.to_owned(),
            })?;
        let created = first_missing_ancestor(parent).await;
        fs::create_dir_all(parent)
            .await
            .map_err(StorageError::io("failed to create parent directories"))?;

        let staging = parent.join(format!(".selfhost-upload-{}", Uuid::new_v4()));
        let mut file = match File::create(&staging).await {
            Ok(file) => file,
            Err(source) => {
                discard_upload(key, &staging, created.as_deref()).await;
                return Err(StorageError::Io {
                    context: "failed to create object file",
                    source,
                });
            }
        };
        let written = match copy_body(&mut body, &mut file).await {
            Ok(size) => fs::rename(&staging, &path).await.map(|()| size),
            Err(source) => Err(source),
        };
        let size = match written {
            Ok(size) => size,
            Err(source) => {
                drop(file);
                discard_upload(key, &staging, created.as_deref()).await;
                return Err(StorageError::Io {
                    context: "failed to write object body",
                    source,
                });
            }
        };

        let metadata = file
            .metadata()
            .await
            .map_err(StorageError::io("failed to stat object"))?;
        let content_type = content_type
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| guess_content_type(key));

        debug!(key, size, content_type, "stored object");
        Ok(Object::from_metadata(
            display_key(key),
            &metadata,
            size,
            content_type,
        ))
    }

    /// Remove an object or an empty folder marker.
    ///
    /// Absent keys, keys that name an entry of the other kind, and folder
    /// markers that still have children all succeed without changing
    /// anything. After a removal the empty ancestors are pruned when the store
    /// is configured to do so.
    ///
    /// # Errors
    ///
    /// [`StorageError::InvalidPath`] for unsafe keys, [`StorageError::Io`] for
    /// other filesystem failures.
    pub async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.write().await;

        let path = resolve_key(&self.root, key)?;
        let metadata = match fs::symlink_metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(key, "delete of absent key");
                return Ok(());
            }
            Err(source) => {
                return Err(StorageError::Io {
                    context: "failed to stat object",
                    source,
                });
            }
        };

        let removed = match (key.ends_with('/'), metadata.is_dir()) {
            (true, true) => fs::remove_dir(&path).await,
            (false, false) => fs::remove_file(&path).await,
            _ => {
                trace!(key, "key names an entry of the other kind, nothing to delete");
                return Ok(());
            }
        };

        match removed {
            Ok(()) => debug!(key, "deleted object"),
            Err(e) if e.kind() == io::ErrorKind::DirectoryNotEmpty => {
                debug!(key, "folder marker is not empty, leaving it in place");
                return Ok(());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(StorageError::Io {
                    context: "failed to delete object",
                    source,
                });
            }
        }

        if self.prune_empty_dirs {
            let pruned = prune_empty_ancestors(&self.root, &path).await;
            if pruned > 0 {
                trace!(key, pruned, "pruned empty directories");
            }
        }
        Ok(())
    }

    /// Every file and directory under the bucket whose key starts with
    /// `prefix`, sorted by key. Directories are reported with a trailing `/`
    /// and size 0.
    ///
    /// # Errors
    ///
    /// [`StorageError::InvalidPath`] for an unsafe prefix,
    /// [`StorageError::Io`] if the walk fails.
    pub async fn list_objects(&self, prefix: &str) -> Result<Vec<Object>, StorageError> {
        let _guard = self.lock.read().await;

        let prefix = normalize_prefix(prefix)?;
        let mut objects = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir)
                .await
                .map_err(StorageError::io("failed to read directory"))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(StorageError::io("failed to read directory entry"))?
            {
                let path = entry.path();
                let metadata = match entry.metadata().await {
                    Ok(metadata) => metadata,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                    Err(source) => {
                        return Err(StorageError::Io {
                            context: "failed to stat directory entry",
                            source,
                        });
                    }
                };
                let Some(mut key) = path_to_key(&self.root, &path) else {
                    continue;
                };

                if metadata.is_dir() {
                    key.push('/');
                    pending.push(path);
                    if key.starts_with(prefix) {
                        objects.push(Object::from_metadata(
                            key,
                            &metadata,
                            0,
                            DIRECTORY_CONTENT_TYPE,
                        ));
                    }
                } else if key.starts_with(prefix) {
                    let content_type = guess_content_type(&key);
                    objects.push(Object::from_metadata(
                        key,
                        &metadata,
                        metadata.len(),
                        content_type,
                    ));
                }
            }
        }

        objects.sort_unstable_by(|a, b| a.key.cmp(&b.key));
        debug!(prefix, count = objects.len(), "listed objects");
        Ok(objects)
    }

    /// Create the directory for `prefix` (and its parents) if missing.
    ///
    /// Trailing slashes are ignored; an empty prefix is a no-op.
    ///
    /// # Errors
    ///
    /// [`StorageError::InvalidPath`] for an unsafe prefix,
    /// [`StorageError::Io`] if creation fails.
    pub async fn ensure_directory(&self, prefix: &str) -> Result<(), StorageError> {
        let trimmed = prefix.trim_end_matches('/');
        if trimmed.is_empty() {
            return Ok(());
        }

        let _guard = self.lock.write().await;

        let path = resolve_key(&self.root, trimmed)?;
        fs::create_dir_all(&path)
            .await
            .map_err(StorageError::io("failed to create directory"))?;

        debug!(prefix, path = %path.display(), "ensured directory");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Remove `removed`'s parent directories while they are empty, stopping at
/// (and never removing) `root`. Returns how many directories were removed.
///
/// Explicit folder markers are not distinguished from implicit parents: an
/// empty marker directory is pruned like any other.
pub(crate) async fn prune_empty_ancestors(root: &Path, removed: &Path) -> usize {
    let mut pruned = 0;
    let mut current = removed.parent();

    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        if let Err(e) = fs::remove_dir(dir).await {
            trace!(dir = %dir.display(), error = %e, "stopped pruning");
            break;
        }
        pruned += 1;
        current = dir.parent();
    }

    pruned
}

/// Stat a key that must be a regular file.
async fn file_metadata(key: &str, path: &Path) -> Result<Metadata, StorageError> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| StorageError::from_lookup(key, "failed to stat object", e))?;

    if metadata.is_dir() || key.ends_with('/') {
        return Err(StorageError::NotFound {
            key: key.to_owned(),
        });
    }
    Ok(metadata)
}

fn object_for_file(key: &str, metadata: &Metadata) -> Object {
    Object::from_metadata(
        display_key(key),
        metadata,
        metadata.len(),
        guess_content_type(key),
    )
}

/// Key as reported back to callers: without the optional leading `/`.
fn display_key(key: &str) -> &str {
    key.strip_prefix('/').unwrap_or(key)
}

async fn put_folder_marker<R>(
    key: &str,
    path: &Path,
    body: &mut R,
) -> Result<Object, StorageError>
where
    R: AsyncRead + Unpin + Send,
{
    let mut probe = [0u8; 1];
    let read = body
        .read(&mut probe)
        .await
        .map_err(StorageError::io("failed to read request body"))?;
    if read > 0 {
        return Err(StorageError::FolderMarkerNotEmpty {
            key: key.to_owned(),
        });
    }

    fs::create_dir_all(path)
        .await
        .map_err(StorageError::io("failed to create folder marker"))?;
    let metadata = fs::metadata(path)
        .await
        .map_err(StorageError::io("failed to stat folder marker"))?;

    debug!(key, "created folder marker");
    Ok(Object::from_metadata(
        display_key(key),
        &metadata,
        0,
        DIRECTORY_CONTENT_TYPE,
    ))
}

/// The topmost directory in `dir`'s chain that does not exist yet, i.e. the
/// first one `create_dir_all(dir)` would create.
async fn first_missing_ancestor(dir: &Path) -> Option<PathBuf> {
    let mut missing = None;
    let mut current = Some(dir);

    while let Some(candidate) = current {
        if fs::try_exists(candidate).await.unwrap_or(true) {
            break;
        }
        missing = Some(candidate.to_path_buf());
        current = candidate.parent();
    }

    missing
}

/// Remove a failed upload's staging file, then the directories created for it.
async fn discard_upload(key: &str, staging: &Path, created: Option<&Path>) {
    if let Err(e) = fs::remove_file(staging).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(key, error = %e, "failed to remove partially written object");
        }
    }
    if let Some(stop) = created.and_then(Path::parent) {
        prune_empty_ancestors(stop, staging).await;
    }
}

async fn copy_body<R>(body: &mut R, file: &mut File) -> io::Result<u64>
where
    R: AsyncRead + Unpin + Send,
{
    let size = tokio::io::copy(body, file).await?;
    file.flush().await?;
    Ok(size)
}
