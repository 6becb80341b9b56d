//! Pull-based tree projection with a single "everything changed" signal.

use super::{CollapseState, CommandNode, NamespaceNode, TreeNode};
use crate::command::{Command, CommandRef, CustomCommand};
use parking_lot::RwLock;
use tokio::sync::watch;

struct ProjectorState {
    commands: Vec<Command>,
    custom_commands: Vec<CustomCommand>,
    nesting_enabled: bool,
}

/// Derives the two-level (optionally flat) view of the command store.
///
/// The projector keeps its own copies of both partitions, updated only via
/// explicit [`refresh`](TreeProjector::refresh) calls, so readers never see
/// a half-updated structure. Change notification is a bare version counter
/// on a watch channel: consumers re-pull everything, there is no diff.
pub struct TreeProjector {
    state: RwLock<ProjectorState>,
    version_tx: watch::Sender<u64>,
}

impl TreeProjector {
    pub fn new(nesting_enabled: bool) -> Self {
        let (version_tx, _) = watch::channel(0);
        Self {
            state: RwLock::new(ProjectorState {
                commands: Vec::new(),
                custom_commands: Vec::new(),
                nesting_enabled,
            }),
            version_tx,
        }
    }

    /// Current value of the change signal.
    pub fn version(&self) -> u64 {
        *self.version_tx.borrow()
    }

    /// Subscribe to "tree changed, root unspecified" signals.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version_tx.subscribe()
    }

    pub fn nesting_enabled(&self) -> bool {
        self.state.read().nesting_enabled
    }

    /// Switches between nested and flat display, re-signalling consumers.
    pub fn set_nesting(&self, enabled: bool) {
        self.state.write().nesting_enabled = enabled;
        self.invalidate();
    }

    /// Push-based refresh. An omitted partition is left untouched; a
    /// supplied one is sorted by label, descending case-sensitive lexical,
    /// before being stored. Exactly one signal fires per call.
    pub fn refresh(
        &self,
        commands: Option<Vec<Command>>,
        custom_commands: Option<Vec<CustomCommand>>,
    ) {
        {
            let mut state = self.state.write();
            if let Some(mut commands) = commands {
                commands.sort_by(|a, b| b.label.cmp(&a.label));
                state.commands = commands;
            }
            if let Some(mut custom_commands) = custom_commands {
                custom_commands.sort_by(|a, b| b.label.cmp(&a.label));
                state.custom_commands = custom_commands;
            }
        }
        self.invalidate();
    }

    fn invalidate(&self) {
        self.version_tx.send_modify(|version| *version += 1);
    }

    /// Root nodes for the current display mode. Flat mode lists the base
    /// commands directly and custom commands are absent from it.
    pub fn roots(&self) -> Vec<TreeNode> {
        let state = self.state.read();
        if state.nesting_enabled {
            vec![
                TreeNode::Namespace(NamespaceNode {
                    label: "Commands".to_string(),
                    workspace: String::new(),
                    commands: state
                        .commands
                        .iter()
                        .cloned()
                        .map(CommandRef::Base)
                        .collect(),
                    collapse: CollapseState::Expanded,
                }),
                TreeNode::Namespace(NamespaceNode {
                    label: "Custom commands".to_string(),
                    workspace: String::new(),
                    commands: state
                        .custom_commands
                        .iter()
                        .cloned()
                        .map(CommandRef::Custom)
                        .collect(),
                    collapse: CollapseState::Expanded,
                }),
            ]
        } else {
            state
                .commands
                .iter()
                .cloned()
                .map(|command| TreeNode::Command(CommandNode::for_command(CommandRef::Base(command))))
                .collect()
        }
    }

    /// Children of a node: command leaves under namespaces, nothing below a
    /// leaf.
    pub fn children(&self, node: &TreeNode) -> Vec<TreeNode> {
        match node {
            TreeNode::Namespace(namespace) => namespace
                .commands
                .iter()
                .cloned()
                .map(|command| TreeNode::Command(CommandNode::for_command(command)))
                .collect(),
            TreeNode::Command(_) => Vec::new(),
        }
    }
}
