//! In-memory storage for tests and ephemeral runs.

use super::StateStorage;
use crate::error::StorageError;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryStateStorage {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStateStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStorage for MemoryStateStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }
}
