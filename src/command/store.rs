//! Aggregate state for discovered and user-authored commands.

use super::{Command, CustomCommand};

/// Owns the current base command list and the custom command list.
///
/// The base list is swapped wholesale on every refresh; the custom list is
/// mutated incrementally (append on clone, filter-out-by-id on remove). No
/// locking lives here: access is cooperative and single-owner, the
/// orchestrator holds the store behind one lock.
#[derive(Debug, Default)]
pub struct CommandStore {
    commands: Vec<Command>,
    custom_commands: Vec<CustomCommand>,
}

impl CommandStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditional O(1) swap of the discovered list.
    pub fn replace_base_commands(&mut self, commands: Vec<Command>) {
        self.commands = commands;
    }

    /// Appends without any duplicate check: entries with colliding ids are
    /// permitted and removed together later.
    pub fn add_custom_command(&mut self, command: CustomCommand) {
        self.custom_commands.push(command);
    }

    /// Removes every entry with the given id, colliding duplicates
    /// included. Returns how many entries went away.
    pub fn remove_custom_command(&mut self, id: i32) -> usize {
        let before = self.custom_commands.len();
        self.custom_commands.retain(|command| command.id != id);
        before - self.custom_commands.len()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn custom_commands(&self) -> &[CustomCommand] {
        &self.custom_commands
    }
}
