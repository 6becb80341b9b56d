//! Structured logging built on `tracing`.
//!
//! The companion's own diagnostics and the language server's observability
//! stream (`lets_ls` target) both flow through one subscriber. Logs default
//! to a file so interactive prompts and tree output stay clean.

use crate::error::CompanionError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format: json, text
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stderr, file, file+stderr
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output includes file; None means runtime default
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Colored output (text format, stderr only)
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "file".to_string()
}

fn default_color() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_color(),
        }
    }
}

/// Resolve the log file path with precedence: explicit config, the
/// `LETS_COMPANION_LOG_FILE` environment variable, then the platform state
/// directory with a workspace-scoped segment.
pub fn resolve_log_file_path(
    config_file: Option<PathBuf>,
    workspace: Option<&Path>,
) -> Result<PathBuf, CompanionError> {
    if let Some(path) = config_file {
        if !path.as_os_str().is_empty() {
            return Ok(path);
        }
    }
    if let Ok(env_path) = std::env::var("LETS_COMPANION_LOG_FILE") {
        if !env_path.is_empty() {
            return Ok(PathBuf::from(env_path));
        }
    }
    default_log_file_path(workspace)
}

fn default_log_file_path(workspace: Option<&Path>) -> Result<PathBuf, CompanionError> {
    let project_dirs = directories::ProjectDirs::from("", "lets", "lets-companion").ok_or_else(
        || CompanionError::Config("could not determine platform state directory".to_string()),
    )?;
    let base = project_dirs
        .state_dir()
        .unwrap_or_else(|| project_dirs.data_local_dir())
        .to_path_buf();

    let dir = match workspace {
        Some(workspace) => {
            let canonical = workspace.canonicalize().map_err(|error| {
                CompanionError::Config(format!("failed to canonicalize workspace path: {error}"))
            })?;
            scoped_path(base, &canonical)
        }
        None => base,
    };
    Ok(dir.join("lets-companion.log"))
}

/// Appends every normal component of `scope` under `base`, giving each
/// workspace its own subtree.
pub(crate) fn scoped_path(base: PathBuf, scope: &Path) -> PathBuf {
    let mut path = base;
    for component in scope.components() {
        if let std::path::Component::Normal(name) = component {
            path.push(name);
        }
    }
    path
}

/// Initialize the logging system.
///
/// `LETS_COMPANION_LOG` overrides the level filter; the other env
/// overrides are `LETS_COMPANION_LOG_FORMAT` and
/// `LETS_COMPANION_LOG_OUTPUT`.
pub fn init_logging(
    config: &LoggingConfig,
    workspace: Option<&Path>,
) -> Result<(), CompanionError> {
    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = determine_output(config)?;

    let base = Registry::default().with(filter);

    let file_writer = if output.file {
        let log_file = resolve_log_file_path(config.file.clone(), workspace)?;
        if let Some(parent) = log_file.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                CompanionError::Config(format!("failed to create log directory: {error}"))
            })?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|error| {
                CompanionError::Config(format!("failed to open log file {log_file:?}: {error}"))
            })?;
        Some(file)
    } else {
        None
    };

    match (format.as_str(), file_writer, output.stderr) {
        ("json", Some(file), true) => base
            .with(json_layer().with_writer(file.and(std::io::stderr)))
            .init(),
        ("json", Some(file), false) => base.with(json_layer().with_writer(file)).init(),
        ("json", None, _) => base.with(json_layer().with_writer(std::io::stderr)).init(),
        (_, Some(file), true) => base
            .with(text_layer(false).with_writer(file.and(std::io::stderr)))
            .init(),
        (_, Some(file), false) => base.with(text_layer(false).with_writer(file)).init(),
        (_, None, _) => base
            .with(text_layer(config.color).with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}

fn json_layer<S>() -> fmt::Layer<S, fmt::format::JsonFields, fmt::format::Format<fmt::format::Json, ChronoUtc>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
}

fn text_layer<S>(
    ansi: bool,
) -> fmt::Layer<S, fmt::format::DefaultFields, fmt::format::Format<fmt::format::Full, ChronoUtc>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_ansi(ansi)
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, CompanionError> {
    if let Ok(filter) = EnvFilter::try_from_env("LETS_COMPANION_LOG") {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|error| CompanionError::Config(format!("invalid log level: {error}")))
}

fn determine_format(config: &LoggingConfig) -> Result<String, CompanionError> {
    let format = match std::env::var("LETS_COMPANION_LOG_FORMAT") {
        Ok(format) => format,
        Err(_) => config.format.clone(),
    };
    if format != "json" && format != "text" {
        return Err(CompanionError::Config(format!(
            "invalid log format: {format} (must be 'json' or 'text')"
        )));
    }
    Ok(format)
}

struct OutputDestinations {
    stderr: bool,
    file: bool,
}

fn determine_output(config: &LoggingConfig) -> Result<OutputDestinations, CompanionError> {
    let output = match std::env::var("LETS_COMPANION_LOG_OUTPUT") {
        Ok(output) => output,
        Err(_) => config.output.clone(),
    };
    parse_output_destinations(&output)
}

fn parse_output_destinations(output: &str) -> Result<OutputDestinations, CompanionError> {
    match output {
        "stderr" => Ok(OutputDestinations {
            stderr: true,
            file: false,
        }),
        "file" => Ok(OutputDestinations {
            stderr: false,
            file: true,
        }),
        "file+stderr" => Ok(OutputDestinations {
            stderr: true,
            file: true,
        }),
        _ => Err(CompanionError::Config(format!(
            "invalid log output: {output} (must be 'stderr', 'file', or 'file+stderr')"
        ))),
    }
}
