//! Interactive execution surface for chosen commands.
//!
//! The surface is an at-most-one owned optional resource: the runner keeps
//! a single terminal, checks its liveness before reuse, and recreates it
//! once the previous incarnation has exited. Sends are fire-and-forget;
//! concurrent sends interleave in the shared surface.

use crate::command::CommandRef;
use crate::error::CompanionError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tracing::info;

/// A terminal-like line sink.
#[async_trait]
pub trait Terminal: Send {
    /// True once the surface's backing process has exited.
    fn has_exited(&mut self) -> bool;

    /// Brings the surface to the user's attention.
    fn show(&mut self);

    /// Sends one invocation line.
    async fn send_line(&mut self, line: &str) -> Result<(), CompanionError>;
}

/// Creates fresh terminal surfaces when the previous one went stale.
pub trait TerminalProvider: Send + Sync {
    fn create(&self) -> Result<Box<dyn Terminal>, CompanionError>;
}

/// Shell-backed terminal: invocation lines are written to a long-lived
/// interactive shell's stdin, its output goes straight to the console.
pub struct ShellTerminal {
    child: Child,
    stdin: ChildStdin,
}

#[async_trait]
impl Terminal for ShellTerminal {
    fn has_exited(&mut self) -> bool {
        self.child.try_wait().map(|s| s.is_some()).unwrap_or(true)
    }

    fn show(&mut self) {}

    async fn send_line(&mut self, line: &str) -> Result<(), CompanionError> {
        let send = async {
            self.stdin.write_all(line.as_bytes()).await?;
            self.stdin.write_all(b"\n").await?;
            self.stdin.flush().await
        };
        send.await
            .map_err(|error| CompanionError::Terminal(format!("failed to send line: {error}")))
    }
}

/// Spawns the user's shell (`$SHELL`, falling back to `sh`).
pub struct ShellTerminalProvider {
    shell: String,
}

impl ShellTerminalProvider {
    pub fn new() -> Self {
        Self {
            shell: std::env::var("SHELL").unwrap_or_else(|_| "sh".to_string()),
        }
    }
}

impl Default for ShellTerminalProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalProvider for ShellTerminalProvider {
    fn create(&self) -> Result<Box<dyn Terminal>, CompanionError> {
        let mut child = tokio::process::Command::new(&self.shell)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|error| {
                CompanionError::Terminal(format!("failed to spawn {}: {}", self.shell, error))
            })?;
        let stdin = child.stdin.take().ok_or_else(|| {
            CompanionError::Terminal("shell stdin was not captured".to_string())
        })?;
        Ok(Box::new(ShellTerminal { child, stdin }))
    }
}

/// Owns at most one live terminal and routes invocation lines into it.
pub struct CommandRunner {
    executable: String,
    provider: Box<dyn TerminalProvider>,
    terminal: Option<Box<dyn Terminal>>,
}

impl CommandRunner {
    pub fn new(executable: impl Into<String>, provider: Box<dyn TerminalProvider>) -> Self {
        Self {
            executable: executable.into(),
            provider,
            terminal: None,
        }
    }

    /// Sends the command's invocation line to the shared surface, creating
    /// or recreating the surface first when needed.
    pub async fn run(&mut self, command: &CommandRef) -> Result<(), CompanionError> {
        info!(name = command.name(), args = ?command.args(), "running command");

        let stale = self
            .terminal
            .as_mut()
            .is_some_and(|terminal| terminal.has_exited());
        if stale {
            info!("terminal is already closed, disposing it");
            self.terminal = None;
        }
        if self.terminal.is_none() {
            info!(name = command.name(), "creating new terminal to run command");
            self.terminal = Some(self.provider.create()?);
        }

        let line = command.invocation_line(&self.executable);
        if let Some(terminal) = self.terminal.as_mut() {
            terminal.show();
            terminal.send_line(&line).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CustomCommand};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        lines: Mutex<Vec<String>>,
        exited: AtomicBool,
        created: AtomicUsize,
    }

    struct FakeTerminal(Arc<Recorder>);

    #[async_trait]
    impl Terminal for FakeTerminal {
        fn has_exited(&mut self) -> bool {
            self.0.exited.load(Ordering::SeqCst)
        }

        fn show(&mut self) {}

        async fn send_line(&mut self, line: &str) -> Result<(), CompanionError> {
            self.0.lines.lock().push(line.to_string());
            Ok(())
        }
    }

    struct FakeProvider(Arc<Recorder>);

    impl TerminalProvider for FakeProvider {
        fn create(&self) -> Result<Box<dyn Terminal>, CompanionError> {
            self.0.created.fetch_add(1, Ordering::SeqCst);
            self.0.exited.store(false, Ordering::SeqCst);
            Ok(Box::new(FakeTerminal(self.0.clone())))
        }
    }

    fn runner() -> (CommandRunner, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let runner = CommandRunner::new("lets", Box::new(FakeProvider(recorder.clone())));
        (runner, recorder)
    }

    #[tokio::test]
    async fn test_formats_invocation_lines() {
        let (mut runner, recorder) = runner();
        runner
            .run(&CommandRef::Base(Command::new("build", "")))
            .await
            .unwrap();
        runner
            .run(&CommandRef::Custom(CustomCommand::new(
                "build",
                "",
                Some("--fast".into()),
                "fast build",
            )))
            .await
            .unwrap();
        assert_eq!(
            recorder.lines.lock().as_slice(),
            ["lets build", "lets build --fast"]
        );
    }

    #[tokio::test]
    async fn test_reuses_the_live_terminal() {
        let (mut runner, recorder) = runner();
        let command = CommandRef::Base(Command::new("build", ""));
        runner.run(&command).await.unwrap();
        runner.run(&command).await.unwrap();
        assert_eq!(recorder.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recreates_after_the_terminal_exits() {
        let (mut runner, recorder) = runner();
        let command = CommandRef::Base(Command::new("build", ""));
        runner.run(&command).await.unwrap();
        recorder.exited.store(true, Ordering::SeqCst);
        runner.run(&command).await.unwrap();
        assert_eq!(recorder.created.load(Ordering::SeqCst), 2);
        assert_eq!(recorder.lines.lock().len(), 2);
    }
}
