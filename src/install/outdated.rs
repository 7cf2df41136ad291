//! Installed-vs-latest state reported by the package manager

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, error};

use crate::config::{DEFAULT_NPM_COMMAND, OUTDATED_TIMEOUT_MS};

/// A dependency whose installed version differs from what the manifest wants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedEntry {
    pub name: String,
    /// Version currently installed in `node_modules`
    pub current: String,
}

#[derive(Debug, Error)]
pub enum OutdatedError {
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} outdated timed out")]
    Timeout { command: String },

    #[error("{command} outdated failed ({status}): {message}")]
    Failed {
        command: String,
        status: String,
        message: String,
    },

    #[error("Invalid outdated output: {0}")]
    InvalidOutput(#[from] serde_json::Error),
}

/// Source of outdated-package reports for a project directory
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait OutdatedSource: Send + Sync {
    async fn outdated(&self, project_dir: &Path) -> Result<Vec<OutdatedEntry>, OutdatedError>;
}

/// Runs `<command> outdated --json` in the project directory
#[derive(Debug, Clone)]
pub struct NpmOutdated {
    command: String,
}

impl NpmOutdated {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }
}

impl Default for NpmOutdated {
    fn default() -> Self {
        Self::new(DEFAULT_NPM_COMMAND)
    }
}

#[async_trait::async_trait]
impl OutdatedSource for NpmOutdated {
    async fn outdated(&self, project_dir: &Path) -> Result<Vec<OutdatedEntry>, OutdatedError> {
        debug!("Running {} outdated in {:?}", self.command, project_dir);

        let mut cmd = Command::new(&self.command);
        cmd.args(["outdated", "--json"])
            .current_dir(project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(Duration::from_millis(OUTDATED_TIMEOUT_MS), cmd.output())
            .await
            .map_err(|_| OutdatedError::Timeout {
                command: self.command.clone(),
            })?
            .map_err(|source| OutdatedError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        // Exit code 1 only means that something is outdated
        if !matches!(output.status.code(), Some(0) | Some(1)) {
            return Err(OutdatedError::Failed {
                command: self.command.clone(),
                status: output.status.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_outdated_output(&self.command, &String::from_utf8_lossy(&output.stdout))
    }
}

#[derive(Debug, Deserialize)]
struct OutdatedInfo {
    current: Option<String>,
}

/// npm reports one object per package, or an array of them in workspaces
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OutdatedReport {
    Single(OutdatedInfo),
    Many(Vec<OutdatedInfo>),
}

#[derive(Debug, Deserialize)]
struct ErrorReport {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: String,
    #[serde(default)]
    summary: Option<String>,
}

/// Parse the JSON printed by `npm outdated --json`
///
/// Empty output means nothing is outdated. Entries without `current`
/// (declared but never installed) are skipped.
pub fn parse_outdated_output(
    command: &str,
    stdout: &str,
) -> Result<Vec<OutdatedEntry>, OutdatedError> {
    let stdout = stdout.trim();
    if stdout.is_empty() {
        return Ok(Vec::new());
    }

    if let Ok(ErrorReport { error }) = serde_json::from_str::<ErrorReport>(stdout) {
        return Err(OutdatedError::Failed {
            command: command.to_string(),
            status: error.code,
            message: error.summary.unwrap_or_default(),
        });
    }

    let reports: BTreeMap<String, OutdatedReport> = serde_json::from_str(stdout)?;

    let entries = reports
        .into_iter()
        .filter_map(|(name, report)| {
            let current = match report {
                OutdatedReport::Single(info) => info.current,
                OutdatedReport::Many(infos) => infos.into_iter().find_map(|info| info.current),
            }?;
            Some(OutdatedEntry { name, current })
        })
        .collect();

    Ok(entries)
}

/// Latest outdated report per project directory
///
/// Each refresh replaces the project's entries wholesale.
#[derive(Default)]
pub struct OutdatedCache {
    entries: RwLock<HashMap<PathBuf, Vec<OutdatedEntry>>>,
}

impl OutdatedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-run the outdated query for a project. Failures leave an empty report behind.
    pub async fn refresh(&self, source: &dyn OutdatedSource, project_dir: &Path) {
        let entries = source
            .outdated(project_dir)
            .await
            .inspect_err(|e| {
                error!(
                    "Failed to refresh outdated packages for {:?}: {}",
                    project_dir, e
                )
            })
            .unwrap_or_default();

        debug!("{} outdated packages in {:?}", entries.len(), project_dir);

        self.entries
            .write()
            .await
            .insert(project_dir.to_path_buf(), entries);
    }

    pub async fn find(&self, project_dir: &Path, package_name: &str) -> Option<OutdatedEntry> {
        self.entries
            .read()
            .await
            .get(project_dir)?
            .iter()
            .find(|entry| entry.name == package_name)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, current: &str) -> OutdatedEntry {
        OutdatedEntry {
            name: name.to_string(),
            current: current.to_string(),
        }
    }

    #[test]
    fn parse_outdated_output_reads_current_versions() {
        let stdout = r#"{
            "lodash": { "current": "4.17.20", "wanted": "4.17.21", "latest": "4.17.21" },
            "react": { "current": "17.0.2", "wanted": "17.0.2", "latest": "18.2.0" }
        }"#;

        assert_eq!(
            parse_outdated_output("npm", stdout).unwrap(),
            vec![entry("lodash", "4.17.20"), entry("react", "17.0.2")]
        );
    }

    #[test]
    fn parse_outdated_output_skips_uninstalled_packages() {
        let stdout = r#"{ "left-pad": { "wanted": "1.3.0", "latest": "1.3.0" } }"#;

        assert!(parse_outdated_output("npm", stdout).unwrap().is_empty());
    }

    #[test]
    fn parse_outdated_output_reads_workspace_arrays() {
        let stdout = r#"{ "lodash": [ { "wanted": "4.17.21" }, { "current": "4.17.15" } ] }"#;

        assert_eq!(
            parse_outdated_output("npm", stdout).unwrap(),
            vec![entry("lodash", "4.17.15")]
        );
    }

    #[test]
    fn parse_outdated_output_treats_empty_output_as_nothing_outdated() {
        assert!(parse_outdated_output("npm", "").unwrap().is_empty());
        assert!(parse_outdated_output("npm", "  \n").unwrap().is_empty());
        assert!(parse_outdated_output("npm", "{}").unwrap().is_empty());
    }

    #[test]
    fn parse_outdated_output_reports_npm_errors() {
        let stdout = r#"{ "error": { "code": "ENOENT", "summary": "no package.json" } }"#;

        let result = parse_outdated_output("npm", stdout);

        assert!(matches!(
            result,
            Err(OutdatedError::Failed { ref status, .. }) if status == "ENOENT"
        ));
    }

    #[test]
    fn parse_outdated_output_rejects_garbage() {
        assert!(matches!(
            parse_outdated_output("npm", "npm WARN something"),
            Err(OutdatedError::InvalidOutput(_))
        ));
    }

    #[tokio::test]
    async fn npm_outdated_reports_spawn_failure() {
        let project = tempfile::TempDir::new().unwrap();
        let source = NpmOutdated::new("version-lens-no-such-binary");

        let result = source.outdated(project.path()).await;

        assert!(matches!(result, Err(OutdatedError::Spawn { .. })));
    }

    #[tokio::test]
    async fn outdated_cache_refresh_replaces_entries_per_project() {
        let project_a = PathBuf::from("/work/a");
        let project_b = PathBuf::from("/work/b");

        let mut source = MockOutdatedSource::new();
        source.expect_outdated().times(2).returning(|dir| {
            if dir == Path::new("/work/a") {
                Ok(vec![entry("lodash", "4.17.20")])
            } else {
                Ok(vec![entry("react", "17.0.2")])
            }
        });

        let cache = OutdatedCache::new();
        cache.refresh(&source, &project_a).await;
        cache.refresh(&source, &project_b).await;

        assert_eq!(
            cache.find(&project_a, "lodash").await,
            Some(entry("lodash", "4.17.20"))
        );
        assert_eq!(cache.find(&project_a, "react").await, None);
        assert_eq!(
            cache.find(&project_b, "react").await,
            Some(entry("react", "17.0.2"))
        );
    }

    #[tokio::test]
    async fn outdated_cache_refresh_failure_clears_previous_entries() {
        let project = PathBuf::from("/work/a");

        let mut source = MockOutdatedSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_outdated()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![entry("lodash", "4.17.20")]));
        source
            .expect_outdated()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(OutdatedError::Timeout {
                    command: "npm".to_string(),
                })
            });

        let cache = OutdatedCache::new();
        cache.refresh(&source, &project).await;
        assert!(cache.find(&project, "lodash").await.is_some());

        cache.refresh(&source, &project).await;
        assert_eq!(cache.find(&project, "lodash").await, None);
    }
}
