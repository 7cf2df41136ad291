//! Per-dependency predicates and the priority chain that picks a lens

use crate::parser::types::{DependencyNode, PackageSource};
use crate::version::matcher::VersionMatcher;
use crate::version::semver::{is_prerelease, range_prefix, versions_equal};
use crate::version::types::PackageVersions;

/// What the registry told us about a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryState {
    Found(PackageVersions),
    /// The registry does not know the package
    NotFound,
    /// The registry could not be reached
    Unavailable,
    /// Not a registry dependency, nothing was asked
    NotQueried,
}

/// A dependency declaration joined with its registry metadata
pub struct PackageLens<'a> {
    node: &'a DependencyNode,
    registry: &'a RegistryState,
    matcher: &'a dyn VersionMatcher,
}

impl<'a> PackageLens<'a> {
    pub fn new(
        node: &'a DependencyNode,
        registry: &'a RegistryState,
        matcher: &'a dyn VersionMatcher,
    ) -> Self {
        Self {
            node,
            registry,
            matcher,
        }
    }

    pub fn node(&self) -> &DependencyNode {
        self.node
    }

    fn declared(&self) -> &str {
        self.node.version.trim()
    }

    fn package(&self) -> Option<&PackageVersions> {
        match self.registry {
            RegistryState::Found(package) => Some(package),
            _ => None,
        }
    }

    pub fn is_github(&self) -> bool {
        matches!(self.node.source, PackageSource::GitHub { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.node.source, PackageSource::File { .. })
    }

    pub fn not_found(&self) -> bool {
        matches!(self.registry, RegistryState::NotFound)
    }

    pub fn unavailable(&self) -> bool {
        matches!(self.registry, RegistryState::Unavailable)
    }

    pub fn not_supported(&self) -> bool {
        matches!(self.node.source, PackageSource::Unsupported)
    }

    /// The declared version names a dist-tag rather than a range
    pub fn is_tagged(&self) -> bool {
        let declared = self.declared();
        !self.matcher.is_valid(declared)
            && self
                .package()
                .is_some_and(|package| package.dist_tags.contains_key(declared))
    }

    pub fn is_invalid(&self) -> bool {
        !self.matcher.is_valid(self.declared())
    }

    pub fn version_match_not_found(&self) -> bool {
        self.resolved_version().is_none()
    }

    /// The highest satisfying version is a prerelease
    pub fn matches_prerelease(&self) -> bool {
        self.resolved_version()
            .is_some_and(|resolved| is_prerelease(&resolved))
    }

    /// The declared version pins exactly the latest version
    pub fn matches_latest(&self) -> bool {
        self.is_fixed_version()
            && self
                .latest_version()
                .is_some_and(|latest| versions_equal(self.declared(), latest))
    }

    pub fn satisfies_latest(&self) -> bool {
        self.latest_version()
            .is_some_and(|latest| self.matcher.satisfies(self.declared(), latest))
    }

    pub fn is_fixed_version(&self) -> bool {
        self.matcher.is_fixed(self.declared())
    }

    pub fn latest_version(&self) -> Option<&str> {
        self.package()?.latest()
    }

    /// The version the declaration installs: the tag's target when tagged,
    /// otherwise the highest published version satisfying the range.
    pub fn resolved_version(&self) -> Option<String> {
        let package = self.package()?;

        if let Some(tagged) = package.dist_tags.get(self.declared()) {
            return Some(tagged.clone());
        }

        self.matcher
            .max_satisfying(self.declared(), &package.versions)
    }
}

/// Lens picked for a dependency, in priority order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    GitHub {
        repo: String,
        reference: Option<String>,
    },
    File {
        path: String,
    },
    NotFound,
    Unavailable,
    NotSupported,
    Tagged {
        tag: String,
        version: Option<String>,
    },
    Invalid,
    NoMatch,
    MatchesPrerelease {
        version: String,
    },
    MatchesLatest {
        latest: String,
    },
    SatisfiesLatest {
        latest: String,
    },
    /// Exact pin that is not the latest; updates to latest
    Fixed {
        latest: String,
    },
    /// Range behind latest; `text` replaces the declaration
    Update {
        latest: String,
        text: String,
    },
}

/// Checks decided by where the dependency comes from. `None` means the
/// declaration is a plain registry version and decorations may apply.
pub fn resolve_source(lens: &PackageLens<'_>) -> Option<Resolution> {
    if let PackageSource::GitHub { repo, reference } = &lens.node.source {
        return Some(Resolution::GitHub {
            repo: repo.clone(),
            reference: reference.clone(),
        });
    }

    if let PackageSource::File { path } = &lens.node.source {
        return Some(Resolution::File { path: path.clone() });
    }

    if lens.not_found() {
        return Some(Resolution::NotFound);
    }

    if lens.unavailable() {
        return Some(Resolution::Unavailable);
    }

    if lens.not_supported() {
        return Some(Resolution::NotSupported);
    }

    if lens.is_tagged() {
        return Some(Resolution::Tagged {
            tag: lens.declared().to_string(),
            version: lens.resolved_version(),
        });
    }

    None
}

/// Checks decided by the declared range against published versions
pub fn resolve_version(lens: &PackageLens<'_>) -> Resolution {
    if lens.is_invalid() {
        return Resolution::Invalid;
    }

    let Some(resolved) = lens.resolved_version() else {
        return Resolution::NoMatch;
    };

    if is_prerelease(&resolved) {
        return Resolution::MatchesPrerelease { version: resolved };
    }

    let Some(latest) = lens.latest_version().map(str::to_string) else {
        return Resolution::NoMatch;
    };

    if lens.matches_latest() {
        return Resolution::MatchesLatest { latest };
    }

    if lens.satisfies_latest() {
        return Resolution::SatisfiesLatest { latest };
    }

    if lens.is_fixed_version() {
        return Resolution::Fixed { latest };
    }

    let text = update_text(lens.declared(), &latest, lens.matcher);
    Resolution::Update { latest, text }
}

pub fn resolve(lens: &PackageLens<'_>) -> Resolution {
    resolve_source(lens).unwrap_or_else(|| resolve_version(lens))
}

/// Replacement text that moves a declaration to `latest`
///
/// A single comparator keeps its operator as long as the result still
/// admits `latest`. Compound ranges and operators that would exclude it
/// (`<`, `<=`) become `^latest`.
pub fn update_text(declared: &str, latest: &str, matcher: &dyn VersionMatcher) -> String {
    let declared = declared.trim();
    let prefix = range_prefix(declared);
    let rest = declared[prefix.len()..].trim_start();

    if rest.contains(char::is_whitespace) || rest.contains("||") {
        return format!("^{}", latest);
    }

    let text = match prefix {
        // `v` is part of the version, not an operator
        "v" => latest.to_string(),
        prefix => format!("{}{}", prefix, latest),
    };

    if matcher.satisfies(&text, latest) {
        text
    } else {
        format!("^{}", latest)
    }
}
