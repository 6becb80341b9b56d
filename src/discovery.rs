//! Command discovery via the build tool's completion listing.
//!
//! One asynchronous round trip to `<executable> completion --list --verbose`
//! in the workspace root; no streaming, no retry. Any failure downgrades to
//! an empty list, so callers cannot tell "no commands defined" from "tool
//! failed"; the coarse signal is kept on purpose.

use crate::command::Command;
use crate::error::CompanionError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tracing::info;

/// Captured outcome of one external tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Any stderr output, a non-zero exit, or a spawn failure counts as a
    /// failed invocation.
    pub fn has_error(&self) -> bool {
        self.error.is_some() || !self.stderr.is_empty() || self.exit_code != Some(0)
    }
}

/// Seam for invoking the external tool.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, program: &str, args: &[&str], cwd: &Path) -> ExecutionResult;
}

/// Executor backed by `tokio::process`. Spawn failures are folded into the
/// result instead of surfacing as errors.
pub struct ProcessExecutor;

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn execute(&self, program: &str, args: &[&str], cwd: &Path) -> ExecutionResult {
        let output = tokio::process::Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) => ExecutionResult {
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                exit_code: output.status.code(),
                error: None,
            },
            Err(error) => ExecutionResult {
                error: Some(format!("Failed to execute {}: {}", program, error)),
                ..Default::default()
            },
        }
    }
}

/// Enumerates base commands with a single listing round trip.
pub struct CommandLister {
    executable: String,
    workspace_root: PathBuf,
    executor: Arc<dyn CommandExecutor>,
}

impl CommandLister {
    pub fn new(
        executable: impl Into<String>,
        workspace_root: impl Into<PathBuf>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            executable: executable.into(),
            workspace_root: workspace_root.into(),
            executor,
        }
    }

    /// Lists base commands in the order the tool emits them. Tool failure
    /// of any kind yields an empty list, logged only.
    pub async fn list_commands(&self) -> Result<Vec<Command>, CompanionError> {
        let result = self
            .executor
            .execute(
                &self.executable,
                &["completion", "--list", "--verbose"],
                &self.workspace_root,
            )
            .await;

        if result.has_error() {
            info!(
                stderr = %result.stderr,
                spawn_error = ?result.error,
                "failed to read commands, treating the list as empty"
            );
            return Ok(Vec::new());
        }

        Ok(parse_command_list(&result.stdout))
    }
}

/// One command per line, `name:description`. The FIRST colon is the
/// separator, so a description containing a colon is truncated at it; a
/// line without a colon yields an empty description.
pub fn parse_command_list(stdout: &str) -> Vec<Command> {
    stdout
        .trim()
        .split('\n')
        .map(|line| {
            let mut parts = line.split(':');
            let name = parts.next().unwrap_or("");
            let description = parts.next().unwrap_or("");
            Command::new(name, description)
        })
        .collect()
}
