use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use super::{validate_key, ObjectStore, StorageError};

/// In-memory bucket for tests, with switches to make uploads or removals
/// fail.
#[derive(Default)]
pub(crate) struct MemoryBucket {
    objects: RefCell<BTreeMap<String, Vec<u8>>>,
    pub(crate) fail_uploads: Cell<bool>,
    pub(crate) fail_removes: Cell<bool>,
}

impl MemoryBucket {
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.objects.borrow().contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.borrow().len()
    }
}

impl ObjectStore for MemoryBucket {
    fn upload(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        validate_key(key)?;
        if self.fail_uploads.get() {
            return Err(StorageError::Unavailable("uploads disabled".to_string()));
        }
        let mut objects = self.objects.borrow_mut();
        if objects.contains_key(key) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        objects.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, keys: &[String]) -> Result<(), StorageError> {
        if self.fail_removes.get() {
            return Err(StorageError::Unavailable("removals disabled".to_string()));
        }
        let mut objects = self.objects.borrow_mut();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("memory://sheet-music/{key}")
    }

    fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}
