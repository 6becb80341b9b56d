//! Persistent key-value state.
//!
//! Custom commands survive across sessions as a single JSON record list
//! under one key, overwritten wholesale on every mutation; there is no
//! incremental diffing and no schema version.

pub mod memory;
pub mod sled_store;

pub use memory::MemoryStateStorage;
pub use sled_store::SledStateStorage;

use crate::command::CustomCommand;
use crate::error::StorageError;
use serde_json::Value;
use tracing::warn;

/// Key holding the full ordered custom command list.
pub const CUSTOM_COMMANDS_KEY: &str = "lets:customCommands";

/// Key holding a release tag the user chose to skip.
pub const SKIP_VERSION_KEY: &str = "skipUpdate";

/// Get/set key-value collaborator.
pub trait StateStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn put(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

/// Loads the persisted custom command list. Absent or unreadable state
/// yields an empty list rather than an error.
pub fn load_custom_commands(storage: &dyn StateStorage) -> Vec<CustomCommand> {
    match storage.get(CUSTOM_COMMANDS_KEY) {
        Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|error| {
            warn!(%error, "discarding unreadable custom command state");
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(error) => {
            warn!(%error, "failed to read custom command state");
            Vec::new()
        }
    }
}

/// Overwrites the whole persisted list.
pub fn save_custom_commands(
    storage: &dyn StateStorage,
    commands: &[CustomCommand],
) -> Result<(), StorageError> {
    storage.put(CUSTOM_COMMANDS_KEY, serde_json::to_value(commands)?)
}
