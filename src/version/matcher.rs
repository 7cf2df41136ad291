//! Version matching abstraction

#[cfg(test)]
use mockall::automock;

/// Range semantics the lens predicates are evaluated with
#[cfg_attr(test, automock)]
pub trait VersionMatcher: Send + Sync {
    /// Whether the declared specifier is a syntactically valid range
    fn is_valid(&self, version_spec: &str) -> bool;

    /// Whether the specifier pins exactly one version (`1.2.3`, `=1.2.3`)
    fn is_fixed(&self, version_spec: &str) -> bool;

    /// Whether a concrete version satisfies the specifier
    fn satisfies(&self, version_spec: &str, version: &str) -> bool;

    /// Highest available version satisfying the specifier
    fn max_satisfying(&self, version_spec: &str, available_versions: &[String]) -> Option<String>;
}
