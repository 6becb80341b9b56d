//! Subprocess-backed LSP client session.
//!
//! Spawns `<executable> self lsp`, speaks Content-Length framed JSON-RPC
//! over its standard streams, and pumps server stderr and log traffic onto
//! the `lets_ls` tracing target.

use super::supervisor::{SessionBackend, SessionHandle};
use super::transport;
use crate::error::SessionError;
use async_trait::async_trait;
use lsp_types::notification::{Exit, Initialized, Notification};
use lsp_types::request::{Initialize, Request, Shutdown};
use lsp_types::{
    ClientCapabilities, ClientInfo, InitializeParams, InitializeResult, InitializedParams,
    WorkspaceFolder,
};
use parking_lot::Mutex as SyncMutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type PendingMap = Arc<SyncMutex<HashMap<i64, oneshot::Sender<Result<Value, SessionError>>>>>;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Backend launching the build tool's bundled language server.
pub struct LspLauncher {
    executable: String,
    workspace_root: PathBuf,
    log_path: Option<PathBuf>,
}

impl LspLauncher {
    pub fn new(
        executable: impl Into<String>,
        workspace_root: impl Into<PathBuf>,
        log_path: Option<PathBuf>,
    ) -> Self {
        Self {
            executable: executable.into(),
            workspace_root: workspace_root.into(),
            log_path,
        }
    }
}

#[async_trait]
impl SessionBackend for LspLauncher {
    async fn launch(&self) -> Result<Box<dyn SessionHandle>, SessionError> {
        let session = LspSession::spawn(
            &self.executable,
            &self.workspace_root,
            self.log_path.as_deref(),
        )
        .await?;
        Ok(Box::new(session))
    }
}

/// One live language-server session.
///
/// Requests are correlated through a pending map of oneshot senders; the
/// reader task completes them as responses arrive and drains the rest with
/// a closed-channel error when the stream ends.
pub struct LspSession {
    child: Mutex<Child>,
    stdin: Arc<Mutex<ChildStdin>>,
    pending: PendingMap,
    next_id: AtomicI64,
    alive: Arc<AtomicBool>,
    reader_task: JoinHandle<()>,
    stderr_task: Option<JoinHandle<()>>,
}

impl LspSession {
    /// Spawns the server and performs the initialize handshake. On any
    /// handshake failure the child is torn down before the error returns.
    pub async fn spawn(
        executable: &str,
        workspace_root: &Path,
        log_path: Option<&Path>,
    ) -> Result<Self, SessionError> {
        info!(target: "lets_ls", executable, "starting language server");
        let mut child = Command::new(executable)
            .args(["self", "lsp"])
            .current_dir(workspace_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(SessionError::Spawn)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SessionError::Handshake("server stdin was not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SessionError::Handshake("server stdout was not captured".to_string()))?;
        let stderr = child.stderr.take();

        let stdin = Arc::new(Mutex::new(stdin));
        let pending: PendingMap = Arc::new(SyncMutex::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));

        let reader_task = tokio::spawn(read_loop(
            BufReader::new(stdout),
            pending.clone(),
            alive.clone(),
            stdin.clone(),
        ));
        let stderr_task = stderr.map(|stderr| tokio::spawn(stderr_loop(BufReader::new(stderr))));

        let mut session = Self {
            child: Mutex::new(child),
            stdin,
            pending,
            next_id: AtomicI64::new(0),
            alive,
            reader_task,
            stderr_task,
        };

        match session.initialize(workspace_root, log_path).await {
            Ok(result) => {
                let server = result
                    .server_info
                    .map(|info| {
                        format!(
                            "{} {}",
                            info.name,
                            info.version.unwrap_or_else(|| "?".to_string())
                        )
                    })
                    .unwrap_or_else(|| "unnamed server".to_string());
                info!(target: "lets_ls", %server, "language server initialized");
                let patterns: Vec<String> = super::documents::build_file_selector()
                    .into_iter()
                    .filter_map(|filter| filter.pattern)
                    .collect();
                debug!(target: "lets_ls", ?patterns, "document selector active");
                Ok(session)
            }
            Err(error) => {
                warn!(target: "lets_ls", "Initialization failed");
                warn!(target: "lets_ls", %error, "language server handshake error");
                let _ = session.teardown(false).await;
                Err(error)
            }
        }
    }

    async fn initialize(
        &self,
        workspace_root: &Path,
        log_path: Option<&Path>,
    ) -> Result<InitializeResult, SessionError> {
        let root_uri = lsp_types::Url::from_file_path(workspace_root).ok();
        let workspace_folders = root_uri.clone().map(|uri| {
            vec![WorkspaceFolder {
                name: workspace_root
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default(),
                uri,
            }]
        });

        #[allow(deprecated)]
        let params = InitializeParams {
            process_id: Some(std::process::id()),
            root_uri,
            initialization_options: Some(json!({
                "log_path": log_path.map(|path| path.display().to_string()).unwrap_or_default(),
            })),
            capabilities: ClientCapabilities::default(),
            workspace_folders,
            client_info: Some(ClientInfo {
                name: "lets-companion".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            ..Default::default()
        };

        let params = serde_json::to_value(params)
            .map_err(|error| SessionError::Handshake(error.to_string()))?;
        let value = self.rpc_request(Initialize::METHOD, params).await?;
        let result: InitializeResult = serde_json::from_value(value)
            .map_err(|error| SessionError::Handshake(format!("malformed initialize result: {error}")))?;

        let initialized = serde_json::to_value(InitializedParams {})
            .map_err(|error| SessionError::Handshake(error.to_string()))?;
        self.rpc_notify(Initialized::METHOD, initialized).await?;
        Ok(result)
    }

    async fn rpc_notify(&self, method: &str, params: Value) -> Result<(), SessionError> {
        self.send(json!({"jsonrpc": "2.0", "method": method, "params": params}))
            .await
    }

    async fn rpc_request(&self, method: &str, params: Value) -> Result<Value, SessionError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let payload = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        if let Err(error) = self.send(payload).await {
            self.pending.lock().remove(&id);
            return Err(error);
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(SessionError::ChannelClosed),
        }
    }

    async fn send(&self, payload: Value) -> Result<(), SessionError> {
        let mut stdin = self.stdin.lock().await;
        transport::write_message(&mut *stdin, &payload)
            .await
            .map_err(SessionError::Transport)
    }

    /// Stops the session. With `graceful` set, the LSP shutdown/exit pair
    /// is attempted first under a bounded wait; the child is killed if it
    /// lingers, and pending requests are drained either way.
    async fn teardown(&mut self, graceful: bool) -> Result<(), SessionError> {
        self.alive.store(false, Ordering::SeqCst);

        let mut result = Ok(());
        if graceful {
            match tokio::time::timeout(
                SHUTDOWN_GRACE,
                self.rpc_request(Shutdown::METHOD, Value::Null),
            )
            .await
            {
                Ok(Ok(_)) => {
                    if let Err(error) = self.rpc_notify(Exit::METHOD, Value::Null).await {
                        debug!(target: "lets_ls", %error, "exit notification failed");
                    }
                }
                Ok(Err(error)) => result = Err(error),
                Err(_) => result = Err(SessionError::Timeout("shutdown request".to_string())),
            }
        }

        {
            let mut child = self.child.lock().await;
            match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                Ok(Ok(status)) => {
                    info!(target: "lets_ls", %status, "language server exited");
                }
                Ok(Err(error)) => {
                    warn!(target: "lets_ls", %error, "failed to await language server exit");
                    let _ = child.kill().await;
                }
                Err(_) => {
                    warn!(target: "lets_ls", "language server did not exit in time, killing it");
                    let _ = child.kill().await;
                }
            }
        }

        self.reader_task.abort();
        if let Some(task) = &self.stderr_task {
            task.abort();
        }
        drain_pending(&self.pending);
        result
    }

    /// Whether the server side of the stream is still up.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionHandle for LspSession {
    async fn notify(&self, method: &str, params: Value) -> Result<(), SessionError> {
        self.rpc_notify(method, params).await
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, SessionError> {
        self.rpc_request(method, params).await
    }

    async fn shutdown(&mut self) -> Result<(), SessionError> {
        self.teardown(true).await
    }
}

async fn read_loop(
    mut reader: BufReader<ChildStdout>,
    pending: PendingMap,
    alive: Arc<AtomicBool>,
    stdin: Arc<Mutex<ChildStdin>>,
) {
    loop {
        match transport::read_message(&mut reader).await {
            Ok(Some(message)) => handle_message(message, &pending, &stdin).await,
            Ok(None) => break,
            Err(error) => {
                warn!(target: "lets_ls", %error, "language server transport error");
                break;
            }
        }
    }
    alive.store(false, Ordering::SeqCst);
    drain_pending(&pending);
}

async fn handle_message(message: Value, pending: &PendingMap, stdin: &Arc<Mutex<ChildStdin>>) {
    let id = message.get("id").and_then(Value::as_i64);
    let method = message.get("method").and_then(Value::as_str);

    match (id, method) {
        // Response to one of our requests.
        (Some(id), None) => {
            let sender = pending.lock().remove(&id);
            if let Some(sender) = sender {
                let outcome = if let Some(error) = message.get("error") {
                    Err(SessionError::Rpc(error.to_string()))
                } else {
                    Ok(message.get("result").cloned().unwrap_or(Value::Null))
                };
                let _ = sender.send(outcome);
            } else {
                debug!(target: "lets_ls", id, "response with no pending request");
            }
        }
        // Server-initiated request; no dynamic capabilities are registered.
        (Some(id), Some(method)) => {
            debug!(target: "lets_ls", method, "declining server request");
            let reply = json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": format!("unsupported client method: {method}")},
            });
            let mut stdin = stdin.lock().await;
            if let Err(error) = transport::write_message(&mut *stdin, &reply).await {
                warn!(target: "lets_ls", %error, "failed to answer server request");
            }
        }
        (None, Some(method)) => match method {
            "window/logMessage" | "window/showMessage" => {
                let text = message
                    .pointer("/params/message")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                info!(target: "lets_ls", "{text}");
            }
            "textDocument/publishDiagnostics" => {
                debug!(target: "lets_ls", "diagnostics received");
            }
            _ => debug!(target: "lets_ls", method, "notification ignored"),
        },
        (None, None) => debug!(target: "lets_ls", "malformed message ignored"),
    }
}

async fn stderr_loop(mut reader: BufReader<ChildStderr>) {
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => info!(target: "lets_ls", "{}", line.trim_end()),
        }
    }
}

fn drain_pending(pending: &PendingMap) {
    for (_, sender) in pending.lock().drain() {
        let _ = sender.send(Err(SessionError::ChannelClosed));
    }
}
