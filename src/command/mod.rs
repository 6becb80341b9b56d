//! Command model: discovered base commands and user-authored variants.

pub mod store;

pub use store::CommandStore;

use serde::{Deserialize, Serialize};

/// A command discovered from the build tool's listing output.
///
/// Immutable once constructed; a refresh replaces the whole list wholesale
/// rather than patching entries in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Stable identifier used to build the invocation line.
    pub name: String,
    pub description: String,
    /// Pre-filled argument string; absent for base commands.
    pub args: Option<String>,
    /// Display string; defaults to `name`.
    pub label: String,
}

impl Command {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            description: description.into(),
            args: None,
        }
    }
}

/// A user-authored variant of a base command: fixed arguments plus a
/// rename, persisted across sessions. `name` stays the base command's name
/// so the invocation line still reaches the original command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCommand {
    /// Fingerprint of `name` + `args`; the identity used for removal.
    pub id: i32,
    pub name: String,
    pub description: String,
    pub args: Option<String>,
    pub label: String,
}

impl CustomCommand {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        args: Option<String>,
        label: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let id = fingerprint(&name, args.as_deref().unwrap_or(""));
        Self {
            id,
            name,
            description: description.into(),
            args,
            label: label.into(),
        }
    }
}

/// Discriminant tag carried by tree nodes for action-menu filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Base,
    Custom,
}

/// Either flavor of command, discriminated by tag rather than by probing
/// for the presence of an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRef {
    Base(Command),
    Custom(CustomCommand),
}

impl CommandRef {
    pub fn name(&self) -> &str {
        match self {
            CommandRef::Base(command) => &command.name,
            CommandRef::Custom(command) => &command.name,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CommandRef::Base(command) => &command.label,
            CommandRef::Custom(command) => &command.label,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            CommandRef::Base(command) => &command.description,
            CommandRef::Custom(command) => &command.description,
        }
    }

    pub fn args(&self) -> Option<&str> {
        match self {
            CommandRef::Base(command) => command.args.as_deref(),
            CommandRef::Custom(command) => command.args.as_deref(),
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            CommandRef::Base(_) => CommandKind::Base,
            CommandRef::Custom(_) => CommandKind::Custom,
        }
    }

    /// Invocation line for the execution surface. Arguments pass through
    /// verbatim; escaping them is the user's business.
    pub fn invocation_line(&self, executable: &str) -> String {
        match self.args() {
            Some(args) => format!("{} {} {}", executable, self.name(), args),
            None => format!("{} {}", executable, self.name()),
        }
    }
}

/// Deterministic 32-bit fingerprint of `name` + `args`.
///
/// Order-sensitive rolling hash over UTF-16 code units with wrapping
/// 32-bit signed arithmetic (`h * 31 + unit`, and `h * 31 == (h << 5) - h`).
/// Not collision-free: identical name+args pairs collide on purpose, and
/// unrelated inputs may collide too.
pub fn fingerprint(name: &str, args: &str) -> i32 {
    let mut hash: i32 = 0;
    for unit in name.encode_utf16().chain(args.encode_utf16()) {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
    }
    hash
}
