//! Language-server session supervision.
//!
//! The build tool bundles a language server (`lets self lsp`) that speaks
//! LSP over its standard streams. This module owns the whole lifecycle of
//! that subprocess-backed RPC session: spawning and the initialize
//! handshake, request/notification plumbing, document routing for the
//! tool's YAML spec files, and the Stopped/Running/Stopping state machine
//! driven by start, stop, and restart. Server stderr and log traffic
//! surface on the `lets_ls` tracing target, never in user-facing output.

pub mod client;
pub mod documents;
pub mod supervisor;
mod transport;

pub use client::{LspLauncher, LspSession};
pub use supervisor::{SessionBackend, SessionHandle, SessionSupervisor};

/// Lifecycle state of the supervised RPC session. Exactly one holds at any
/// time; `Stopping` is transient while a shutdown is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Running,
    Stopping,
}
