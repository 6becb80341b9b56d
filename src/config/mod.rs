//! Companion configuration.
//!
//! Sources, lowest to highest precedence: built-in defaults, the workspace
//! file `lets-companion.toml`, then `LETS_COMPANION_*` environment
//! variables (`__` separates nested keys, e.g.
//! `LETS_COMPANION_LOGGING__LEVEL=debug`).

use crate::error::CompanionError;
use crate::logging::{scoped_path, LoggingConfig};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanionConfig {
    /// Path or name of the build tool executable.
    #[serde(default = "default_executable")]
    pub executable: String,

    /// Debug toggle reserved for the language server launch.
    #[serde(default)]
    pub debug: bool,

    /// Log path handed to the language server's initialization options.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Whether the tree starts in nested mode.
    #[serde(default = "default_nested_view")]
    pub nested_view: bool,

    /// Directory for persisted state; defaults under the platform data
    /// directory, scoped per workspace.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_executable() -> String {
    "lets".to_string()
}

fn default_nested_view() -> bool {
    true
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            debug: false,
            log_path: None,
            nested_view: default_nested_view(),
            state_dir: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    pub fn load(workspace_root: &Path) -> Result<CompanionConfig, CompanionError> {
        let mut builder = Config::builder();

        let workspace_file = workspace_root.join("lets-companion.toml");
        if workspace_file.is_file() {
            builder = builder.add_source(File::from(workspace_file));
        }

        builder
            .add_source(
                Environment::with_prefix("LETS_COMPANION")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|config| config.try_deserialize::<CompanionConfig>())
            .map_err(|error| CompanionError::Config(error.to_string()))
    }
}

/// Resolve the persisted-state directory for a workspace.
pub fn resolve_state_dir(
    config: &CompanionConfig,
    workspace_root: &Path,
) -> Result<PathBuf, CompanionError> {
    if let Some(dir) = &config.state_dir {
        return Ok(dir.clone());
    }
    let project_dirs = directories::ProjectDirs::from("", "lets", "lets-companion").ok_or_else(
        || CompanionError::Config("could not determine platform data directory".to_string()),
    )?;
    let canonical = workspace_root.canonicalize().map_err(|error| {
        CompanionError::Config(format!("failed to canonicalize workspace path: {error}"))
    })?;
    let scoped = scoped_path(project_dirs.data_local_dir().to_path_buf(), &canonical);
    Ok(scoped.join("state"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompanionConfig::default();
        assert_eq!(config.executable, "lets");
        assert!(!config.debug);
        assert!(config.nested_view);
        assert_eq!(config.log_path, None);
    }

    #[test]
    fn test_load_without_workspace_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::load(dir.path()).unwrap();
        assert_eq!(config.executable, "lets");
        assert!(config.nested_view);
    }

    #[test]
    fn test_load_reads_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("lets-companion.toml"),
            "executable = \"/usr/local/bin/lets\"\nnested_view = false\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = ConfigLoader::load(dir.path()).unwrap();
        assert_eq!(config.executable, "/usr/local/bin/lets");
        assert!(!config.nested_view);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_explicit_state_dir_wins() {
        let config = CompanionConfig {
            state_dir: Some(PathBuf::from("/custom/state")),
            ..Default::default()
        };
        let dir = resolve_state_dir(&config, Path::new(".")).unwrap();
        assert_eq!(dir, PathBuf::from("/custom/state"));
    }
}
