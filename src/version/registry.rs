//! Registry trait for fetching package versions

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;
use crate::version::types::PackageVersions;

/// Trait for fetching package metadata from a registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches all versions and dist-tags for a package
    ///
    /// # Returns
    /// * `Ok(PackageVersions)` - Versions ordered from oldest to newest
    /// * `Err(RegistryError::NotFound)` - The registry does not know the package
    /// * `Err(RegistryError)` - Any other fetch failure
    async fn fetch_all_versions(
        &self,
        package_name: &str,
    ) -> Result<PackageVersions, RegistryError>;
}
