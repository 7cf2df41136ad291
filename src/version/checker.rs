//! Cache lookups for packages

use std::collections::HashMap;

#[cfg(test)]
use mockall::automock;

use crate::version::error::CacheError;
use crate::version::types::PackageVersions;

/// Trait for storing and retrieving version information
#[cfg_attr(test, automock)]
pub trait VersionStorer: Send + Sync + 'static {
    /// All cached versions for a package, oldest first
    fn get_versions(&self, package_name: &str) -> Result<Vec<String>, CacheError>;

    /// Cached dist-tags for a package
    fn get_dist_tags(&self, package_name: &str) -> Result<HashMap<String, String>, CacheError>;

    /// Whether the registry reported the package as missing
    fn is_not_found(&self, package_name: &str) -> Result<bool, CacheError>;

    /// Replace all versions and dist-tags for a package
    fn replace_package(
        &self,
        package_name: &str,
        package: &PackageVersions,
    ) -> Result<(), CacheError>;

    /// Remember that the registry does not know the package
    fn mark_not_found(&self, package_name: &str) -> Result<(), CacheError>;

    /// Get packages last fetched more than `refresh_interval` milliseconds ago
    fn get_packages_needing_refresh(
        &self,
        refresh_interval: i64,
    ) -> Result<Vec<String>, CacheError>;

    /// Claim the fetch for a package. Returns false when another fetch is running.
    fn try_start_fetch(&self, package_name: &str) -> Result<bool, CacheError>;

    /// Release the claim taken by `try_start_fetch`
    fn finish_fetch(&self, package_name: &str) -> Result<(), CacheError>;
}

/// What the cache knows about a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageLookup {
    /// Never fetched
    NotCached,
    /// The registry answered 404
    NotFound,
    Found(PackageVersions),
}

pub fn lookup_package<S: VersionStorer + ?Sized>(
    storer: &S,
    package_name: &str,
) -> Result<PackageLookup, CacheError> {
    if storer.is_not_found(package_name)? {
        return Ok(PackageLookup::NotFound);
    }

    let versions = storer.get_versions(package_name)?;
    if versions.is_empty() {
        return Ok(PackageLookup::NotCached);
    }

    let dist_tags = storer.get_dist_tags(package_name)?;
    Ok(PackageLookup::Found(
        PackageVersions::new(versions).with_dist_tags(dist_tags),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn lookup_package_reports_not_found_before_reading_versions() {
        let mut storer = MockVersionStorer::new();
        storer
            .expect_is_not_found()
            .with(eq("ghost"))
            .returning(|_| Ok(true));
        storer.expect_get_versions().never();

        assert_eq!(
            lookup_package(&storer, "ghost").unwrap(),
            PackageLookup::NotFound
        );
    }

    #[test]
    fn lookup_package_reports_not_cached_without_versions() {
        let mut storer = MockVersionStorer::new();
        storer.expect_is_not_found().returning(|_| Ok(false));
        storer.expect_get_versions().returning(|_| Ok(vec![]));
        storer.expect_get_dist_tags().never();

        assert_eq!(
            lookup_package(&storer, "lodash").unwrap(),
            PackageLookup::NotCached
        );
    }

    #[test]
    fn lookup_package_returns_versions_with_dist_tags() {
        let mut storer = MockVersionStorer::new();
        storer.expect_is_not_found().returning(|_| Ok(false));
        storer
            .expect_get_versions()
            .returning(|_| Ok(vec!["1.0.0".to_string(), "2.0.0-beta.1".to_string()]));
        storer.expect_get_dist_tags().returning(|_| {
            Ok(HashMap::from([
                ("latest".to_string(), "1.0.0".to_string()),
                ("beta".to_string(), "2.0.0-beta.1".to_string()),
            ]))
        });

        let PackageLookup::Found(package) = lookup_package(&storer, "lodash").unwrap() else {
            panic!("expected cached package");
        };

        assert_eq!(package.versions, vec!["1.0.0", "2.0.0-beta.1"]);
        assert_eq!(package.latest(), Some("1.0.0"));
    }

    #[test]
    fn lookup_package_propagates_cache_errors() {
        let mut storer = MockVersionStorer::new();
        storer
            .expect_is_not_found()
            .returning(|_| Err(CacheError::LockPoisoned));

        assert!(matches!(
            lookup_package(&storer, "lodash"),
            Err(CacheError::LockPoisoned)
        ));
    }
}
