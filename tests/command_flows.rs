//! End-to-end flows over the orchestrator with scripted collaborators: no
//! real build tool, terminal, or language server involved.

use async_trait::async_trait;
use lets_companion::app::App;
use lets_companion::command::{CommandRef, CustomCommand};
use lets_companion::discovery::{CommandExecutor, CommandLister, ExecutionResult};
use lets_companion::error::{CompanionError, SessionError};
use lets_companion::interact::{HostContext, UserInteraction};
use lets_companion::runner::{CommandRunner, Terminal, TerminalProvider};
use lets_companion::session::{SessionBackend, SessionHandle, SessionSupervisor};
use lets_companion::storage::{
    load_custom_commands, MemoryStateStorage, StateStorage, CUSTOM_COMMANDS_KEY,
};
use lets_companion::tree::{TreeNode, TreeProjector};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

struct StaticExecutor(ExecutionResult);

#[async_trait]
impl CommandExecutor for StaticExecutor {
    async fn execute(&self, _program: &str, _args: &[&str], _cwd: &Path) -> ExecutionResult {
        self.0.clone()
    }
}

#[derive(Default)]
struct ScriptedInteraction {
    answers: Mutex<VecDeque<Option<String>>>,
    infos: Mutex<Vec<String>>,
}

impl ScriptedInteraction {
    fn with_answers(answers: Vec<Option<&str>>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(
                answers
                    .into_iter()
                    .map(|answer| answer.map(str::to_string))
                    .collect(),
            ),
            infos: Mutex::new(Vec::new()),
        })
    }
}

impl UserInteraction for ScriptedInteraction {
    fn input(
        &self,
        _prompt: &str,
        _placeholder: Option<&str>,
        _initial: Option<&str>,
    ) -> Option<String> {
        self.answers.lock().pop_front().flatten()
    }

    fn info(&self, message: &str) {
        self.infos.lock().push(message.to_string());
    }
}

struct NullHost;

impl HostContext for NullHost {
    fn set_flag(&self, _key: &str, _value: bool) {}
}

#[derive(Default)]
struct TerminalLog {
    lines: Mutex<Vec<String>>,
}

struct FakeTerminal(Arc<TerminalLog>);

#[async_trait]
impl Terminal for FakeTerminal {
    fn has_exited(&mut self) -> bool {
        false
    }

    fn show(&mut self) {}

    async fn send_line(&mut self, line: &str) -> Result<(), CompanionError> {
        self.0.lines.lock().push(line.to_string());
        Ok(())
    }
}

struct FakeTerminalProvider(Arc<TerminalLog>);

impl TerminalProvider for FakeTerminalProvider {
    fn create(&self) -> Result<Box<dyn Terminal>, CompanionError> {
        Ok(Box::new(FakeTerminal(self.0.clone())))
    }
}

struct IdleBackend;

struct IdleHandle;

#[async_trait]
impl SessionHandle for IdleHandle {
    async fn notify(&self, _method: &str, _params: Value) -> Result<(), SessionError> {
        Ok(())
    }

    async fn request(&self, _method: &str, _params: Value) -> Result<Value, SessionError> {
        Ok(Value::Null)
    }

    async fn shutdown(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

#[async_trait]
impl SessionBackend for IdleBackend {
    async fn launch(&self) -> Result<Box<dyn SessionHandle>, SessionError> {
        Ok(Box::new(IdleHandle))
    }
}

struct Harness {
    app: App,
    storage: Arc<MemoryStateStorage>,
    interaction: Arc<ScriptedInteraction>,
    terminal_log: Arc<TerminalLog>,
}

fn harness(listing: ExecutionResult, answers: Vec<Option<&str>>) -> Harness {
    let storage = Arc::new(MemoryStateStorage::new());
    let interaction = ScriptedInteraction::with_answers(answers);
    let terminal_log = Arc::new(TerminalLog::default());

    let app = App::new(
        CommandLister::new("lets", ".", Arc::new(StaticExecutor(listing))),
        Arc::new(TreeProjector::new(true)),
        Arc::new(SessionSupervisor::new(Arc::new(IdleBackend))),
        CommandRunner::new("lets", Box::new(FakeTerminalProvider(terminal_log.clone()))),
        storage.clone(),
        interaction.clone(),
        Arc::new(NullHost),
    );

    Harness {
        app,
        storage,
        interaction,
        terminal_log,
    }
}

fn good_listing() -> ExecutionResult {
    ExecutionResult {
        stdout: "build:Build the project\ntest:Run tests\nrelease:No description provided\n".into(),
        exit_code: Some(0),
        ..Default::default()
    }
}

fn namespace_labels(app: &App, index: usize) -> Vec<String> {
    let roots = app.projector().roots();
    app.projector()
        .children(&roots[index])
        .into_iter()
        .map(|node| match node {
            TreeNode::Command(node) => node.label,
            TreeNode::Namespace(node) => node.label,
        })
        .collect()
}

#[tokio::test]
async fn refresh_projects_sorted_base_commands() {
    let h = harness(good_listing(), Vec::new());
    h.app.refresh().await.unwrap();

    assert_eq!(namespace_labels(&h.app, 0), ["test", "release", "build"]);
    assert!(namespace_labels(&h.app, 1).is_empty());
}

#[tokio::test]
async fn listing_failure_projects_an_empty_tree() {
    let h = harness(
        ExecutionResult {
            stdout: "build:ok".into(),
            stderr: "tool exploded".into(),
            exit_code: Some(0),
            ..Default::default()
        },
        Vec::new(),
    );
    h.app.refresh().await.unwrap();

    assert!(namespace_labels(&h.app, 0).is_empty());
}

#[tokio::test]
async fn clone_persists_wholesale_and_refreshes_the_tree() -> anyhow::Result<()> {
    let h = harness(
        good_listing(),
        vec![Some("--fast"), Some("fast build"), Some("Quick one")],
    );
    h.app.refresh().await?;

    let base = h.app.find_command("build").unwrap();
    let created = h.app.clone_command(&base).await?.unwrap();

    assert_eq!(created.name, "build");
    assert_eq!(created.label, "fast build");
    assert_eq!(created.description, "Quick one");
    assert_eq!(created.args.as_deref(), Some("--fast"));

    let persisted = load_custom_commands(h.storage.as_ref());
    assert_eq!(persisted, vec![created]);
    assert_eq!(namespace_labels(&h.app, 1), ["fast build"]);
    Ok(())
}

#[tokio::test]
async fn clone_description_falls_back_to_the_base_description() -> anyhow::Result<()> {
    let h = harness(good_listing(), vec![Some("--fast"), Some("fast build"), None]);
    h.app.refresh().await?;

    let base = h.app.find_command("build").unwrap();
    let created = h.app.clone_command(&base).await?.unwrap();
    assert_eq!(created.description, "Build the project");
    Ok(())
}

#[tokio::test]
async fn clone_aborts_when_args_prompt_is_cancelled() -> anyhow::Result<()> {
    let h = harness(good_listing(), vec![None]);
    h.app.refresh().await?;

    let base = h.app.find_command("build").unwrap();
    let outcome = h.app.clone_command(&base).await?;

    assert!(outcome.is_none());
    assert!(h.app.custom_commands().is_empty());
    assert!(h.storage.get(CUSTOM_COMMANDS_KEY)?.is_none());
    assert_eq!(h.interaction.infos.lock().as_slice(), ["No args supplied"]);
    Ok(())
}

#[tokio::test]
async fn clone_aborts_when_custom_name_equals_base_name() -> anyhow::Result<()> {
    let h = harness(good_listing(), vec![Some("--fast"), Some("build")]);
    h.app.refresh().await?;

    let base = h.app.find_command("build").unwrap();
    let outcome = h.app.clone_command(&base).await?;

    assert!(outcome.is_none());
    assert!(h.app.custom_commands().is_empty());
    assert_eq!(
        h.interaction.infos.lock().as_slice(),
        ["Custom name cannot be the same as the original name"]
    );
    Ok(())
}

#[tokio::test]
async fn remove_takes_colliding_fingerprints_together() -> anyhow::Result<()> {
    let h = harness(good_listing(), Vec::new());

    // Same name+args entered twice: ids collide on purpose.
    let first = CustomCommand::new("build", "", Some("-v".into()), "one");
    let second = CustomCommand::new("build", "", Some("-v".into()), "two");
    assert_eq!(first.id, second.id);

    lets_companion::storage::save_custom_commands(
        h.storage.as_ref(),
        &[first.clone(), second.clone()],
    )?;
    h.app.load_persisted();

    let removed = h
        .app
        .remove_custom_command(&CommandRef::Custom(first))
        .await?;
    assert!(removed);
    assert!(h.app.custom_commands().is_empty());
    assert!(load_custom_commands(h.storage.as_ref()).is_empty());
    Ok(())
}

#[tokio::test]
async fn remove_ignores_base_commands() -> anyhow::Result<()> {
    let h = harness(good_listing(), Vec::new());
    h.app.refresh().await?;

    let base = h.app.find_command("build").unwrap();
    let removed = h.app.remove_custom_command(&base).await?;
    assert!(!removed);
    Ok(())
}

#[tokio::test]
async fn run_sends_the_invocation_line_to_the_terminal() {
    let h = harness(good_listing(), Vec::new());
    h.app.refresh().await.unwrap();

    let base = h.app.find_command("build").unwrap();
    h.app.run_command(&base).await;

    assert_eq!(h.terminal_log.lines.lock().as_slice(), ["lets build"]);
}

#[tokio::test]
async fn flat_mode_hides_custom_commands() {
    let h = harness(good_listing(), Vec::new());
    lets_companion::storage::save_custom_commands(
        h.storage.as_ref(),
        &[CustomCommand::new("build", "", None, "hidden custom")],
    )
    .unwrap();
    h.app.load_persisted();
    h.app.refresh().await.unwrap();

    h.app.set_tree_nesting(false);
    let roots = h.app.projector().roots();
    assert_eq!(roots.len(), 3);
    assert!(roots
        .iter()
        .all(|node| matches!(node, TreeNode::Command(_))));
}

#[tokio::test]
async fn persisted_custom_commands_survive_reactivation() -> anyhow::Result<()> {
    let storage = Arc::new(MemoryStateStorage::new());
    lets_companion::storage::save_custom_commands(
        storage.as_ref(),
        &[CustomCommand::new(
            "build",
            "",
            Some("--release".into()),
            "release build",
        )],
    )?;

    let terminal_log = Arc::new(TerminalLog::default());
    let app = App::new(
        CommandLister::new("lets", ".", Arc::new(StaticExecutor(good_listing()))),
        Arc::new(TreeProjector::new(true)),
        Arc::new(SessionSupervisor::new(Arc::new(IdleBackend))),
        CommandRunner::new("lets", Box::new(FakeTerminalProvider(terminal_log))),
        storage,
        ScriptedInteraction::with_answers(Vec::new()),
        Arc::new(NullHost),
    );

    app.activate().await;
    app.refresh().await?;
    assert_eq!(namespace_labels(&app, 1), ["release build"]);
    app.deactivate().await;
    Ok(())
}
