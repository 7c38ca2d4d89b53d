//! Filesystem-backed object store for a single SelfhostS3 bucket.
//!
//! Keys map onto paths under `{root}/{bucket}`. Every key is validated before
//! any filesystem call so that nothing can resolve outside the bucket
//! directory. Keys ending in `/` are folder markers and are stored as
//! directories.
//!
//! ```text
//! key "photos/2024/cat.jpg"  ->  {root}/{bucket}/photos/2024/cat.jpg   (file)
//! key "photos/2024/"         ->  {root}/{bucket}/photos/2024           (directory)
//! ```

pub mod content_type;
pub mod error;
pub mod object;
mod path;
pub mod storage;

pub use content_type::guess_content_type;
pub use error::StorageError;
pub use object::Object;
pub use storage::{Storage, StorageConfig};
