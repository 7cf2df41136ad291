use std::collections::HashMap;

use crate::version::semver::parse_version;

/// Versions published for a package, as reported by a registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageVersions {
    /// Published versions, lowest first
    pub versions: Vec<String>,
    /// Named pointers to versions (`latest`, `next`, `beta`)
    pub dist_tags: HashMap<String, String>,
}

impl PackageVersions {
    pub fn new(versions: Vec<String>) -> Self {
        Self {
            versions,
            dist_tags: HashMap::new(),
        }
    }

    pub fn with_dist_tags(mut self, dist_tags: HashMap<String, String>) -> Self {
        self.dist_tags = dist_tags;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// The `latest` dist-tag, or the highest stable version when the
    /// registry publishes no tags.
    pub fn latest(&self) -> Option<&str> {
        if let Some(latest) = self.dist_tags.get("latest") {
            return Some(latest.as_str());
        }

        self.versions
            .iter()
            .filter_map(|v| parse_version(v).map(|parsed| (v, parsed)))
            .filter(|(_, parsed)| parsed.pre.is_empty())
            .max_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(v, _)| v.as_str())
    }
}
