//! Sled-backed storage.

use super::StateStorage;
use crate::error::StorageError;
use serde_json::Value;
use std::path::Path;

/// Durable key-value store; values are JSON-encoded bytes.
pub struct SledStateStorage {
    db: sled::Db,
}

impl SledStateStorage {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }
}

impl StateStorage for SledStateStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        match self.db.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.db.insert(key, serde_json::to_vec(&value)?)?;
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SledStateStorage::open(&dir.path().join("state")).unwrap();

        assert_eq!(storage.get("missing").unwrap(), None);
        storage.put("key", json!({"value": 1})).unwrap();
        assert_eq!(storage.get("key").unwrap(), Some(json!({"value": 1})));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");
        {
            let storage = SledStateStorage::open(&path).unwrap();
            storage.put("key", json!("persisted")).unwrap();
        }
        let storage = SledStateStorage::open(&path).unwrap();
        assert_eq!(storage.get("key").unwrap(), Some(json!("persisted")));
    }
}
