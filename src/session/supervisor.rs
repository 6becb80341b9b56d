//! Session lifecycle state machine.

use super::documents;
use super::SessionState;
use crate::error::SessionError;
use async_trait::async_trait;
use lsp_types::notification::{
    DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument, Notification,
};
use lsp_types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    TextDocumentContentChangeEvent, TextDocumentIdentifier, TextDocumentItem, Url,
    VersionedTextDocumentIdentifier,
};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

const STATE_STOPPED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPING: u8 = 2;

/// One live RPC session produced by a backend.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// Fires a JSON-RPC notification at the server.
    async fn notify(&self, method: &str, params: Value) -> Result<(), SessionError>;

    /// Sends a request and awaits its response.
    async fn request(&self, method: &str, params: Value) -> Result<Value, SessionError>;

    /// Graceful teardown. In-flight requests complete with a closed-channel
    /// error rather than being dropped silently.
    async fn shutdown(&mut self) -> Result<(), SessionError>;
}

/// Factory spawning a fresh session, handshake included.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn SessionHandle>, SessionError>;
}

/// Supervises one session through start/stop/restart transitions.
///
/// The session slot is owned exclusively here. Liveness is mirrored into an
/// atomic tag so `is_running` stays O(1) and lock-free.
pub struct SessionSupervisor {
    backend: Arc<dyn SessionBackend>,
    slot: Mutex<Option<Box<dyn SessionHandle>>>,
    state: AtomicU8,
}

impl SessionSupervisor {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend,
            slot: Mutex::new(None),
            state: AtomicU8::new(STATE_STOPPED),
        }
    }

    /// O(1) liveness query; a never-started session reports not running.
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) == STATE_RUNNING
    }

    pub fn state(&self) -> SessionState {
        match self.state.load(Ordering::SeqCst) {
            STATE_RUNNING => SessionState::Running,
            STATE_STOPPING => SessionState::Stopping,
            _ => SessionState::Stopped,
        }
    }

    /// Launches the server and takes ownership of the session. Starting an
    /// already-running session is a no-op. A launch failure leaves the
    /// session non-functional; there is no automatic retry.
    pub async fn start(&self) -> Result<(), SessionError> {
        let mut slot = self.slot.lock().await;
        if slot.is_some() {
            return Ok(());
        }
        match self.backend.launch().await {
            Ok(handle) => {
                *slot = Some(handle);
                self.state.store(STATE_RUNNING, Ordering::SeqCst);
                info!(target: "lets_ls", "language server session started");
                Ok(())
            }
            Err(error) => {
                self.state.store(STATE_STOPPED, Ordering::SeqCst);
                warn!(target: "lets_ls", %error, "initialization failed, not retrying");
                Err(error)
            }
        }
    }

    /// Best-effort graceful shutdown. Stopping a session that never started
    /// is a no-op; call sites guard with [`is_running`](Self::is_running)
    /// anyway. The slot is empty afterwards even when shutdown failed.
    pub async fn stop(&self) -> Result<(), SessionError> {
        let mut slot = self.slot.lock().await;
        let Some(mut handle) = slot.take() else {
            return Ok(());
        };
        self.state.store(STATE_STOPPING, Ordering::SeqCst);
        let result = handle.shutdown().await;
        self.state.store(STATE_STOPPED, Ordering::SeqCst);
        result
    }

    /// `stop` then `start`, awaited sequentially. A failing stop is logged
    /// and start is attempted regardless; the resulting state is whatever
    /// start leaves behind.
    pub async fn restart(&self) -> Result<(), SessionError> {
        if let Err(error) = self.stop().await {
            warn!(target: "lets_ls", %error, "failed to stop language server before restart");
        }
        self.start().await
    }

    /// Routes a build-spec document open to the running session. Paths
    /// outside the selector and a stopped session are both ignored.
    pub async fn open_document(&self, path: &Path, text: &str) -> Result<(), SessionError> {
        let uri = match self.routable_uri(path) {
            Some(uri) => uri?,
            None => return Ok(()),
        };
        let params = DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri,
                language_id: "yaml".to_string(),
                version: 0,
                text: text.to_string(),
            },
        };
        self.send_notification(DidOpenTextDocument::METHOD, params)
            .await
    }

    /// Routes a full-content change for a build-spec document.
    pub async fn change_document(
        &self,
        path: &Path,
        version: i32,
        text: &str,
    ) -> Result<(), SessionError> {
        let uri = match self.routable_uri(path) {
            Some(uri) => uri?,
            None => return Ok(()),
        };
        let params = DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier { uri, version },
            content_changes: vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: text.to_string(),
            }],
        };
        self.send_notification(DidChangeTextDocument::METHOD, params)
            .await
    }

    /// Routes a build-spec document close.
    pub async fn close_document(&self, path: &Path) -> Result<(), SessionError> {
        let uri = match self.routable_uri(path) {
            Some(uri) => uri?,
            None => return Ok(()),
        };
        let params = DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier { uri },
        };
        self.send_notification(DidCloseTextDocument::METHOD, params)
            .await
    }

    fn routable_uri(&self, path: &Path) -> Option<Result<Url, SessionError>> {
        if !documents::matches_build_file(path) {
            return None;
        }
        Some(Url::from_file_path(path).map_err(|()| {
            SessionError::Document(format!("not an absolute file path: {}", path.display()))
        }))
    }

    async fn send_notification<P: serde::Serialize>(
        &self,
        method: &str,
        params: P,
    ) -> Result<(), SessionError> {
        let slot = self.slot.lock().await;
        let Some(handle) = slot.as_ref() else {
            return Ok(());
        };
        let params = serde_json::to_value(params)
            .map_err(|error| SessionError::Document(error.to_string()))?;
        handle.notify(method, params).await
    }
}
