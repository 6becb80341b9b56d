//! Orchestration of the command model, tree, session, and collaborators.
//!
//! All mutations funnel through here: refresh replaces the base partition
//! and pushes BOTH partitions to the projector, clone/remove mutate the
//! custom partition and persist it wholesale before refreshing. Concurrent
//! refreshes are not serialized; the last listing to resolve wins.

use crate::command::{CommandRef, CommandStore, CustomCommand};
use crate::discovery::CommandLister;
use crate::error::CompanionError;
use crate::interact::{HostContext, UserInteraction};
use crate::runner::CommandRunner;
use crate::session::SessionSupervisor;
use crate::storage::{self, StateStorage};
use crate::tree::TreeProjector;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

/// Host context flag mirroring the tree display mode.
pub const TREE_NESTING_FLAG: &str = "lets-companion:treeNesting";

pub struct App {
    store: Mutex<CommandStore>,
    lister: CommandLister,
    projector: Arc<TreeProjector>,
    supervisor: Arc<SessionSupervisor>,
    runner: AsyncMutex<CommandRunner>,
    storage: Arc<dyn StateStorage>,
    interaction: Arc<dyn UserInteraction>,
    host: Arc<dyn HostContext>,
}

impl App {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lister: CommandLister,
        projector: Arc<TreeProjector>,
        supervisor: Arc<SessionSupervisor>,
        runner: CommandRunner,
        storage: Arc<dyn StateStorage>,
        interaction: Arc<dyn UserInteraction>,
        host: Arc<dyn HostContext>,
    ) -> Self {
        Self {
            store: Mutex::new(CommandStore::new()),
            lister,
            projector,
            supervisor,
            runner: AsyncMutex::new(runner),
            storage,
            interaction,
            host,
        }
    }

    pub fn projector(&self) -> &TreeProjector {
        &self.projector
    }

    pub fn supervisor(&self) -> &SessionSupervisor {
        &self.supervisor
    }

    /// Seeds custom commands from storage and starts the language server.
    /// A session failure is logged and the companion stays usable.
    pub async fn activate(&self) {
        self.load_persisted();
        if let Err(error) = self.supervisor.start().await {
            warn!(target: "lets_ls", %error, "failed to start language server");
        }
    }

    /// Stops the session, but only when it is actually running.
    pub async fn deactivate(&self) {
        if self.supervisor.is_running() {
            if let Err(error) = self.supervisor.stop().await {
                warn!(target: "lets_ls", %error, "failed to stop language server");
            }
        }
    }

    /// Seeds the store with the persisted custom command list.
    pub fn load_persisted(&self) {
        let persisted = storage::load_custom_commands(self.storage.as_ref());
        let mut store = self.store.lock();
        for command in persisted {
            store.add_custom_command(command);
        }
    }

    /// Re-lists base commands and pushes both partitions to the projector,
    /// always both, even when only one changed.
    pub async fn refresh(&self) -> Result<(), CompanionError> {
        let commands = self.lister.list_commands().await?;
        let (base, custom) = {
            let mut store = self.store.lock();
            store.replace_base_commands(commands);
            (
                store.commands().to_vec(),
                store.custom_commands().to_vec(),
            )
        };
        self.projector.refresh(Some(base), Some(custom));
        Ok(())
    }

    /// Sends the invocation line to the shared execution surface.
    /// Fire-and-forget: a terminal failure is logged, never re-thrown.
    pub async fn run_command(&self, command: &CommandRef) {
        if let Err(error) = self.runner.lock().await.run(command).await {
            warn!(%error, "failed to send command to the terminal");
        }
    }

    /// Clone flow: args and custom name are required, the description is
    /// optional and falls back to the base description. A cancelled
    /// required prompt or a name collision abandons the clone with an
    /// informational message and no state change.
    pub async fn clone_command(
        &self,
        base: &CommandRef,
    ) -> Result<Option<CustomCommand>, CompanionError> {
        info!(name = base.name(), "cloning command");

        let Some(args) =
            self.interaction
                .input("Enter Command Line Arguments:", Some("<arg1> <arg2> ..."), None)
        else {
            self.interaction.info("No args supplied");
            return Ok(None);
        };

        let Some(custom_name) =
            self.interaction
                .input("Enter Custom Command Name:", None, Some(base.name()))
        else {
            self.interaction.info("No custom name supplied");
            return Ok(None);
        };
        if custom_name == base.name() {
            self.interaction
                .info("Custom name cannot be the same as the original name");
            return Ok(None);
        }

        let description = self
            .interaction
            .input("Enter Custom Description (optional):", None, None)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| base.description().to_string());

        let custom = CustomCommand::new(base.name(), description, Some(args), custom_name);
        let snapshot = {
            let mut store = self.store.lock();
            store.add_custom_command(custom.clone());
            store.custom_commands().to_vec()
        };
        storage::save_custom_commands(self.storage.as_ref(), &snapshot)?;
        self.refresh().await?;
        Ok(Some(custom))
    }

    /// Removes a custom command by its fingerprint, colliding duplicates
    /// included; base commands are left alone and reported as untouched.
    pub async fn remove_custom_command(
        &self,
        command: &CommandRef,
    ) -> Result<bool, CompanionError> {
        let CommandRef::Custom(custom) = command else {
            return Ok(false);
        };
        let snapshot = {
            let mut store = self.store.lock();
            store.remove_custom_command(custom.id);
            store.custom_commands().to_vec()
        };
        storage::save_custom_commands(self.storage.as_ref(), &snapshot)?;
        self.refresh().await?;
        Ok(true)
    }

    /// Switches display mode and mirrors it into the host context flag.
    pub fn set_tree_nesting(&self, enabled: bool) {
        self.projector.set_nesting(enabled);
        self.host.set_flag(TREE_NESTING_FLAG, enabled);
    }

    /// Forwards a restart request. Failures are logged to the
    /// observability channel and swallowed here at the call site.
    pub async fn restart_session(&self) {
        info!(target: "lets_ls", "Restarting language server");
        if let Err(error) = self.supervisor.restart().await {
            warn!(target: "lets_ls", %error, "failed to restart language server");
        }
    }

    /// Resolves a custom command label or a base command name to a ref;
    /// custom commands win when both match.
    pub fn find_command(&self, needle: &str) -> Option<CommandRef> {
        let store = self.store.lock();
        if let Some(custom) = store
            .custom_commands()
            .iter()
            .find(|command| command.label == needle)
        {
            return Some(CommandRef::Custom(custom.clone()));
        }
        store
            .commands()
            .iter()
            .find(|command| command.name == needle)
            .cloned()
            .map(CommandRef::Base)
    }

    /// Snapshot of the custom partition.
    pub fn custom_commands(&self) -> Vec<CustomCommand> {
        self.store.lock().custom_commands().to_vec()
    }
}
