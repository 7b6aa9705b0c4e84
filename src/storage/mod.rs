//! Object storage for score and part files. The catalog only talks to the
//! [`ObjectStore`] trait; [`LocalBucket`] keeps objects in a directory on disk.

mod local;
#[cfg(test)]
pub(crate) mod memory;

use std::io;

use thiserror::Error;
use uuid::Uuid;

pub use local::LocalBucket;

/// Bucket that holds every sheet-music object.
pub const DEFAULT_BUCKET: &str = "sheet-music";
/// Key prefix shared by all uploaded files.
pub const OBJECT_PREFIX: &str = "music";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key '{0}'")]
    InvalidKey(String),
    #[error("object '{0}' already exists")]
    AlreadyExists(String),
    #[error("object '{0}' not found")]
    NotFound(String),
    #[error("i/o error on object '{key}'")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("object store unavailable: {0}")]
    Unavailable(String),
}

/// Minimal surface of a blob bucket: put, delete, address, fetch.
pub trait ObjectStore {
    /// Store `bytes` under `key`. Keys are never overwritten.
    fn upload(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Remove every listed key. Missing keys are not an error; the first real
    /// failure is reported after all keys have been attempted.
    fn remove(&self, keys: &[String]) -> Result<(), StorageError>;

    /// Public URL under which `key` can be retrieved.
    fn public_url(&self, key: &str) -> String;

    /// Read an object back.
    fn download(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}

/// Generate a fresh, collision-free key such as `music/<uuid>.pdf`.
pub fn new_object_key(extension: &str) -> String {
    format!(
        "{OBJECT_PREFIX}/{}.{}",
        Uuid::new_v4(),
        extension.to_ascii_lowercase()
    )
}

/// Reject keys that could escape the bucket or address a directory.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.ends_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad {
        Err(StorageError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_prefixed_and_unique() {
        let first = new_object_key("PDF");
        let second = new_object_key("pdf");
        assert!(first.starts_with("music/"));
        assert!(first.ends_with(".pdf"));
        assert_ne!(first, second);
        validate_key(&first).unwrap();
    }

    #[test]
    fn rejects_escaping_keys() {
        for key in ["", "/abs.pdf", "music/../x.pdf", "music//x.pdf", "music/", "a\\b"] {
            assert!(
                matches!(validate_key(key), Err(StorageError::InvalidKey(_))),
                "{key} should be rejected"
            );
        }
    }
}
