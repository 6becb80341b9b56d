//! Tree projection of the command model.
//!
//! Nodes are derived, read-only snapshots recomputed on every pull; nothing
//! here is mutated in place or retained across refreshes.

pub mod projector;

pub use projector::TreeProjector;

use crate::command::{CommandKind, CommandRef};

/// Collapse state for namespace nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseState {
    Expanded,
    Collapsed,
}

/// Grouping node shown in nested mode ("Commands" / "Custom commands").
#[derive(Debug, Clone)]
pub struct NamespaceNode {
    pub label: String,
    /// Workspace-scope tag; empty for the single-workspace case.
    pub workspace: String,
    pub commands: Vec<CommandRef>,
    pub collapse: CollapseState,
}

/// Leaf node wrapping exactly one command.
#[derive(Debug, Clone)]
pub struct CommandNode {
    pub label: String,
    pub command: CommandRef,
    /// Display description; `None` when there is nothing worth showing.
    pub description: Option<String>,
    pub kind: CommandKind,
}

impl CommandNode {
    pub(crate) fn for_command(command: CommandRef) -> Self {
        Self {
            label: command.label().to_string(),
            description: display_description(command.description()),
            kind: command.kind(),
            command,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TreeNode {
    Namespace(NamespaceNode),
    Command(CommandNode),
}

/// Empty descriptions and the listing's "No description" placeholder render
/// as no value, not as literal text.
fn display_description(raw: &str) -> Option<String> {
    if raw.is_empty() || raw.starts_with("No description") {
        None
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;

    #[test]
    fn test_placeholder_description_is_suppressed() {
        let node = CommandNode::for_command(CommandRef::Base(Command::new(
            "build",
            "No description provided",
        )));
        assert_eq!(node.description, None);
    }

    #[test]
    fn test_empty_description_is_suppressed() {
        let node = CommandNode::for_command(CommandRef::Base(Command::new("build", "")));
        assert_eq!(node.description, None);
    }

    #[test]
    fn test_real_description_is_kept() {
        let node =
            CommandNode::for_command(CommandRef::Base(Command::new("build", "Build the project")));
        assert_eq!(node.description.as_deref(), Some("Build the project"));
    }
}
