//! Registry and package manager test doubles

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use version_lens::install::outdated::{OutdatedEntry, OutdatedError, OutdatedSource};
use version_lens::lsp::resolver::PackageResolver;
use version_lens::parser::package_json::PackageJsonParser;
use version_lens::version::cache::Cache;
use version_lens::version::checker::VersionStorer;
use version_lens::version::error::RegistryError;
use version_lens::version::matchers::NpmVersionMatcher;
use version_lens::version::registry::Registry;
use version_lens::version::types::PackageVersions;

/// Mock registry for testing
#[derive(Default)]
pub struct MockRegistry {
    packages: HashMap<String, PackageVersions>,
    unavailable: bool,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `versions` with `latest` pointing at the last one
    pub fn with_versions(mut self, package: &str, versions: Vec<&str>) -> Self {
        let versions: Vec<String> = versions.into_iter().map(|v| v.to_string()).collect();
        let mut package_versions = PackageVersions::new(versions.clone());
        if let Some(latest) = versions.last() {
            package_versions = package_versions
                .with_dist_tags(HashMap::from([("latest".to_string(), latest.clone())]));
        }
        self.packages.insert(package.to_string(), package_versions);
        self
    }

    pub fn with_package(mut self, package: &str, versions: PackageVersions) -> Self {
        self.packages.insert(package.to_string(), versions);
        self
    }

    /// Every fetch fails as if the network were down
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

#[async_trait]
impl Registry for MockRegistry {
    async fn fetch_all_versions(
        &self,
        package_name: &str,
    ) -> Result<PackageVersions, RegistryError> {
        if self.unavailable {
            return Err(RegistryError::InvalidResponse(
                "Unexpected status: 503".to_string(),
            ));
        }

        match self.packages.get(package_name) {
            Some(versions) => Ok(versions.clone()),
            None => Err(RegistryError::NotFound(package_name.to_string())),
        }
    }
}

/// Outdated source returning a fixed report
#[derive(Default)]
pub struct StaticOutdated {
    entries: Vec<OutdatedEntry>,
    failing: bool,
}

impl StaticOutdated {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, name: &str, current: &str) -> Self {
        self.entries.push(OutdatedEntry {
            name: name.to_string(),
            current: current.to_string(),
        });
        self
    }

    /// Every run fails as if npm were missing
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

#[async_trait]
impl OutdatedSource for StaticOutdated {
    async fn outdated(&self, _project_dir: &Path) -> Result<Vec<OutdatedEntry>, OutdatedError> {
        if self.failing {
            return Err(OutdatedError::Failed {
                command: "npm".to_string(),
                status: "127".to_string(),
                message: "npm: command not found".to_string(),
            });
        }
        Ok(self.entries.clone())
    }
}

/// Create a test resolver backed by the given doubles
pub fn create_test_resolver(registry: MockRegistry, outdated: StaticOutdated) -> PackageResolver {
    PackageResolver::new(
        Arc::new(PackageJsonParser::new()),
        Arc::new(NpmVersionMatcher),
        Arc::new(registry),
        Arc::new(outdated),
    )
}

/// Create a test cache with pre-populated versions, `latest` tagging the last one
pub fn create_test_cache(versions: &[(&str, Vec<&str>)]) -> (TempDir, Arc<Cache>) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let cache = Cache::new(&db_path).unwrap();

    for (package_name, package_versions) in versions {
        let versions: Vec<String> = package_versions.iter().map(|v| v.to_string()).collect();
        let latest = versions.last().cloned().unwrap_or_default();
        cache
            .replace_package(
                package_name,
                &PackageVersions::new(versions)
                    .with_dist_tags(HashMap::from([("latest".to_string(), latest)])),
            )
            .unwrap();
    }

    (temp_dir, Arc::new(cache))
}
