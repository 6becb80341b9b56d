//! Command-line trigger points into the orchestrator.
//!
//! Thin glue: every subcommand builds on the same wired [`App`], and all
//! real behavior lives in the library modules.

use crate::app::App;
use crate::command::CommandKind;
use crate::config::{self, CompanionConfig};
use crate::discovery::{CommandExecutor, CommandLister, ProcessExecutor};
use crate::error::CompanionError;
use crate::interact::{DialoguerInteraction, LoggingHostContext};
use crate::runner::{CommandRunner, ShellTerminalProvider};
use crate::session::{LspLauncher, SessionSupervisor};
use crate::storage::{SledStateStorage, StateStorage};
use crate::tree::{TreeNode, TreeProjector};
use crate::update::UpdateChecker;
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::Table;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;

/// Lets companion - command tree and language server supervision
#[derive(Parser)]
#[command(name = "lets-companion")]
#[command(about = "Editor companion for the lets build tool")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the command tree
    Tree {
        /// Flat listing without namespaces (custom commands are hidden)
        #[arg(long)]
        flat: bool,
    },
    /// Run a command in the shared terminal surface
    Run {
        /// Command name or custom command label
        name: String,
    },
    /// Clone a command with custom arguments
    Clone {
        /// Command name to clone
        name: String,
    },
    /// Remove a custom command
    Remove {
        /// Custom command label
        label: String,
    },
    /// Restart the language server session
    Restart,
    /// Probe the language server session
    Session,
    /// Check for a newer lets release
    CheckUpdate {
        /// Skip the latest release in future checks
        #[arg(long)]
        skip: bool,
    },
}

/// Wires the application for one CLI invocation.
pub struct CliContext {
    app: App,
    update: UpdateChecker,
    storage: Arc<dyn StateStorage>,
    workspace_root: PathBuf,
}

impl CliContext {
    pub fn new(workspace_root: PathBuf, config: &CompanionConfig) -> Result<Self, CompanionError> {
        let executor: Arc<dyn CommandExecutor> = Arc::new(ProcessExecutor);

        let state_dir = config::resolve_state_dir(config, &workspace_root)?;
        let storage: Arc<dyn StateStorage> = Arc::new(SledStateStorage::open(&state_dir)?);

        let lister = CommandLister::new(config.executable.as_str(), &workspace_root, executor.clone());
        let projector = Arc::new(TreeProjector::new(config.nested_view));
        let supervisor = Arc::new(SessionSupervisor::new(Arc::new(LspLauncher::new(
            config.executable.as_str(),
            &workspace_root,
            config.log_path.clone(),
        ))));
        let runner = CommandRunner::new(
            config.executable.as_str(),
            Box::new(ShellTerminalProvider::new()),
        );

        let app = App::new(
            lister,
            projector,
            supervisor,
            runner,
            storage.clone(),
            Arc::new(DialoguerInteraction),
            Arc::new(LoggingHostContext),
        );
        let update = UpdateChecker::new(config.executable.as_str(), executor);

        Ok(Self {
            app,
            update,
            storage,
            workspace_root,
        })
    }

    /// Executes one subcommand and returns its rendered output.
    pub async fn execute(&self, command: &Commands) -> Result<String, CompanionError> {
        match command {
            Commands::Tree { flat } => {
                self.app.load_persisted();
                self.app.set_tree_nesting(!flat);
                self.app.refresh().await?;
                Ok(render_tree(&self.app))
            }
            Commands::Run { name } => {
                self.app.load_persisted();
                self.app.refresh().await?;
                let Some(command) = self.app.find_command(name) else {
                    return Ok(format!("No command named \"{name}\""));
                };
                self.app.run_command(&command).await;
                Ok(format!("Sent \"{}\" to the terminal", command.label()))
            }
            Commands::Clone { name } => {
                self.app.load_persisted();
                self.app.refresh().await?;
                let Some(command) = self.app.find_command(name) else {
                    return Ok(format!("No command named \"{name}\""));
                };
                match self.app.clone_command(&command).await? {
                    Some(custom) => Ok(format!(
                        "Created custom command \"{}\" (id {})",
                        custom.label, custom.id
                    )),
                    None => Ok("Clone abandoned".to_string()),
                }
            }
            Commands::Remove { label } => {
                self.app.load_persisted();
                let Some(command) = self.app.find_command(label) else {
                    return Ok(format!("No custom command labelled \"{label}\""));
                };
                if self.app.remove_custom_command(&command).await? {
                    Ok(format!("Removed \"{label}\""))
                } else {
                    Ok(format!("\"{label}\" is not a custom command"))
                }
            }
            Commands::Restart => {
                self.app.activate().await;
                self.app.restart_session().await;
                let state = format!("Session state: {:?}", self.app.supervisor().state());
                self.app.deactivate().await;
                Ok(state)
            }
            Commands::Session => {
                self.app.activate().await;
                let state = format!("Session running: {}", self.app.supervisor().is_running());
                self.app.deactivate().await;
                Ok(state)
            }
            Commands::CheckUpdate { skip } => {
                let notice = self
                    .update
                    .check(self.storage.as_ref(), &self.workspace_root)
                    .await?;
                match notice {
                    Some(notice) if *skip => {
                        self.update.skip(self.storage.as_ref(), &notice.latest)?;
                        Ok(format!("Skipping release {}", notice.latest))
                    }
                    Some(notice) => Ok(format!(
                        "A newer lets release is available: {} (installed {})\n  installation guide: {}\n  changes: {}",
                        notice.latest.bold(),
                        notice.installed,
                        notice.install_url,
                        notice.changes_url
                    )),
                    None => Ok("lets is up to date".to_string()),
                }
            }
        }
    }
}

fn render_tree(app: &App) -> String {
    let projector = app.projector();
    let mut output = String::new();
    let mut flat_table: Option<Table> = None;

    for root in projector.roots() {
        match &root {
            TreeNode::Namespace(namespace) => {
                output.push_str(&format!("{}\n", namespace.label.bold()));
                output.push_str(&commands_table(app, &root).to_string());
                output.push('\n');
            }
            TreeNode::Command(node) => {
                let table = flat_table.get_or_insert_with(new_table);
                table.add_row(vec![
                    node.label.clone(),
                    node.description.clone().unwrap_or_default(),
                    kind_tag(node.kind).to_string(),
                ]);
            }
        }
    }

    if let Some(table) = flat_table {
        output.push_str(&table.to_string());
        output.push('\n');
    }
    if output.is_empty() {
        output.push_str("No commands found\n");
    }
    output
}

fn commands_table(app: &App, root: &TreeNode) -> Table {
    let mut table = new_table();
    for child in app.projector().children(root) {
        if let TreeNode::Command(node) = child {
            table.add_row(vec![
                node.label,
                node.description.unwrap_or_default(),
                kind_tag(node.kind).to_string(),
            ]);
        }
    }
    table
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Command", "Description", "Kind"]);
    table
}

fn kind_tag(kind: CommandKind) -> &'static str {
    match kind {
        CommandKind::Base => "base",
        CommandKind::Custom => "custom",
    }
}
