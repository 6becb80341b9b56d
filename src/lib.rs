//! Lets Companion: command tree and language-client supervision for the
//! `lets` build tool.
//!
//! Discovers the commands a workspace's `lets` setup exposes, projects them
//! as a navigable tree alongside user-authored variants that survive across
//! sessions, and supervises the tool's bundled language server over a
//! subprocess LSP session.

pub mod app;
pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
pub mod interact;
pub mod logging;
pub mod runner;
pub mod session;
pub mod storage;
pub mod tooling;
pub mod tree;
pub mod update;
