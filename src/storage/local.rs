use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{validate_key, ObjectStore, StorageError};

const FILE_URL_SCHEME: &str = "file://";

/// A bucket stored as a plain directory: `<root>/<bucket>/<key>`. Public URLs
/// are `file://` URLs so the system viewer can open them directly.
#[derive(Debug, Clone)]
pub struct LocalBucket {
    name: String,
    dir: PathBuf,
}

impl LocalBucket {
    /// Create the bucket directory if needed. The root is canonicalized so the
    /// URLs handed out stay absolute.
    pub fn open(root: &Path, name: &str) -> Result<Self, StorageError> {
        validate_key(name)?;
        let dir = root.join(name);
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: name.to_string(),
            source,
        })?;
        let dir = dir.canonicalize().map_err(|source| StorageError::Io {
            key: name.to_string(),
            source,
        })?;
        Ok(Self {
            name: name.to_string(),
            dir,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(key))
    }

    /// Map a URL produced by [`ObjectStore::public_url`] back to the file on
    /// disk. Returns `None` for URLs that do not point inside this bucket.
    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let path = PathBuf::from(url.strip_prefix(FILE_URL_SCHEME)?);
        if path.starts_with(&self.dir) {
            Some(path)
        } else {
            None
        }
    }
}

impl ObjectStore for LocalBucket {
    fn upload(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                key: key.to_string(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| match source.kind() {
                io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(key.to_string()),
                _ => StorageError::Io {
                    key: key.to_string(),
                    source,
                },
            })?;
        file.write_all(bytes)
            .and_then(|_| file.sync_all())
            .map_err(|source| StorageError::Io {
                key: key.to_string(),
                source,
            })?;

        debug!(bucket = %self.name, key, size = bytes.len(), "stored object");
        Ok(())
    }

    fn remove(&self, keys: &[String]) -> Result<(), StorageError> {
        let mut first_error = None;
        for key in keys {
            let result = self.object_path(key).and_then(|path| {
                match fs::remove_file(&path) {
                    Ok(()) => Ok(()),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                    Err(source) => Err(StorageError::Io {
                        key: key.clone(),
                        source,
                    }),
                }
            });
            match result {
                Ok(()) => debug!(bucket = %self.name, key = %key, "removed object"),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{FILE_URL_SCHEME}{}", self.dir.join(key).display())
    }

    fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(key)?;
        fs::read(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::Io {
                key: key.to_string(),
                source,
            },
        })
    }
}
