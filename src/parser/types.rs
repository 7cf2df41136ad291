//! Common types for parsers

use serde::{Deserialize, Serialize};

/// Section of package.json a dependency was declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyField {
    Dependencies,
    DevDependencies,
    PeerDependencies,
    OptionalDependencies,
}

impl DependencyField {
    /// Returns the JSON key of this field
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyField::Dependencies => "dependencies",
            DependencyField::DevDependencies => "devDependencies",
            DependencyField::PeerDependencies => "peerDependencies",
            DependencyField::OptionalDependencies => "optionalDependencies",
        }
    }
}

impl std::str::FromStr for DependencyField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dependencies" => Ok(DependencyField::Dependencies),
            "devDependencies" => Ok(DependencyField::DevDependencies),
            "peerDependencies" => Ok(DependencyField::PeerDependencies),
            "optionalDependencies" => Ok(DependencyField::OptionalDependencies),
            _ => Err(()),
        }
    }
}

/// Where a declared dependency comes from, judged by its specifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PackageSource {
    /// Semver range or dist-tag resolved against the npm registry
    Registry,
    /// GitHub shorthand (`user/repo#ref`, `github:user/repo`)
    #[serde(rename = "github")]
    GitHub {
        repo: String,
        reference: Option<String>,
    },
    /// Local path (`file:../lib`)
    File { path: String },
    /// Git URLs, tarball URLs, workspace and link protocols
    Unsupported,
}

/// Detect whether the URI points at a package.json manifest
pub fn is_package_json(uri: &str) -> bool {
    uri.ends_with("/package.json") || uri.ends_with("\\package.json") || uri == "package.json"
}

/// A dependency declaration found in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    /// Key the dependency is declared under, and installed under in `node_modules`
    pub key: String,
    /// Package name as published (alias target for `npm:` aliases)
    pub name: String,
    /// Declared specifier without quotes (range part for `npm:` aliases)
    pub version: String,
    pub field: DependencyField,
    pub source: PackageSource,
    /// Byte offset of `version` in the source (start)
    pub start_offset: usize,
    /// Byte offset of `version` in the source (end)
    pub end_offset: usize,
    /// Line number (0-indexed)
    pub line: usize,
    /// Byte column within the line (0-indexed)
    pub column: usize,
}

impl DependencyNode {
    /// Byte column right after `version`
    pub fn end_column(&self) -> usize {
        self.column + (self.end_offset - self.start_offset)
    }
}
