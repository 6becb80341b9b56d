//! Release update check for the build tool.

use crate::discovery::CommandExecutor;
use crate::error::CompanionError;
use crate::storage::{StateStorage, SKIP_VERSION_KEY};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const RELEASES_API: &str = "https://api.github.com/repos/lets-cli/lets/releases/latest";
const REPO_URL: &str = "https://github.com/lets-cli/lets";

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
}

/// A newer release of the build tool is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNotice {
    pub installed: String,
    pub latest: String,
    pub install_url: String,
    pub changes_url: String,
}

/// Compares the installed tool version against the latest published
/// release. Every failure is terminal for that one check; nothing retries.
pub struct UpdateChecker {
    executable: String,
    http: reqwest::Client,
    executor: Arc<dyn CommandExecutor>,
}

impl UpdateChecker {
    pub fn new(executable: impl Into<String>, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executable: executable.into(),
            http: reqwest::Client::new(),
            executor,
        }
    }

    /// Returns `None` when up to date, when the user skipped the latest
    /// tag, or when the installed version cannot be determined (old
    /// releases predate `--version`).
    pub async fn check(
        &self,
        storage: &dyn StateStorage,
        workspace_root: &Path,
    ) -> Result<Option<UpdateNotice>, CompanionError> {
        let release: LatestRelease = self
            .http
            .get(RELEASES_API)
            .header("User-Agent", "lets-companion")
            .send()
            .await
            .map_err(|error| CompanionError::Update(error.to_string()))?
            .json()
            .await
            .map_err(|error| CompanionError::Update(error.to_string()))?;

        if let Ok(Some(skipped)) = storage.get(SKIP_VERSION_KEY) {
            if skipped.as_str() == Some(release.tag_name.as_str()) {
                debug!(tag = %release.tag_name, "release skipped by user");
                return Ok(None);
            }
        }

        let result = self
            .executor
            .execute(&self.executable, &["--version"], workspace_root)
            .await;
        let Some(installed) = parse_version_output(&result.stdout) else {
            return Ok(None);
        };
        if installed == release.tag_name {
            return Ok(None);
        }

        Ok(Some(UpdateNotice {
            changes_url: format!("{REPO_URL}/compare/{installed}...{}", release.tag_name),
            install_url: format!("{REPO_URL}?tab=readme-ov-file#installation"),
            installed,
            latest: release.tag_name,
        }))
    }

    /// Records the tag so later checks stay silent about it.
    pub fn skip(&self, storage: &dyn StateStorage, tag: &str) -> Result<(), CompanionError> {
        storage
            .put(SKIP_VERSION_KEY, Value::String(tag.to_string()))
            .map_err(CompanionError::from)
    }
}

/// Expected shape `lets X.Y.Z`; anything else reports no version.
pub fn parse_version_output(output: &str) -> Option<String> {
    if output.is_empty() {
        return None;
    }
    let parts: Vec<&str> = output.split(' ').collect();
    if parts.len() != 2 {
        return None;
    }
    let tag = parts[1].trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}
