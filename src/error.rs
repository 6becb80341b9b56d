//! Error taxonomy for the companion.
//!
//! Listing failures are deliberately NOT part of this taxonomy: they
//! downgrade to an empty command list at the discovery layer. Everything
//! here is either a configuration, storage, or session problem, and none of
//! them is allowed to take the process down.

use thiserror::Error;

/// Crate-level error type.
#[derive(Error, Debug)]
pub enum CompanionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("Update check failed: {0}")]
    Update(String),
}

/// Persisted-state failures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Backend(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Language-server session failures. None of these trigger a retry; a
/// failed session stays down until the user asks for a restart.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to spawn language server: {0}")]
    Spawn(std::io::Error),

    #[error("Initialization failed: {0}")]
    Handshake(String),

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Session closed before a response arrived")]
    ChannelClosed,

    #[error("Language server returned an error: {0}")]
    Rpc(String),

    #[error("Document cannot be routed to the session: {0}")]
    Document(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}
