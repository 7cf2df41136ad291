//! package.json parser

use regex::Regex;
use tracing::warn;

use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::{DependencyField, DependencyNode, PackageSource, is_package_json};

/// Specifier prefixes that cannot be resolved against the npm registry
const UNSUPPORTED_PREFIXES: [&str; 12] = [
    "git+", "git://", "git@", "http://", "https://", "link:", "workspace:", "portal:", "patch:",
    "gitlab:", "bitbucket:", "gist:",
];

/// Prefixes npm treats as local paths even without `file:`
const PATH_PREFIXES: [&str; 4] = ["./", "../", "/", "~/"];

/// Parser for package.json files
pub struct PackageJsonParser {
    /// GitHub shorthand: `user/repo`, `user/repo#ref`, `github:user/repo`
    github_re: Regex,
}

impl PackageJsonParser {
    pub fn new() -> Self {
        Self {
            github_re: Regex::new(r"^(?:github:)?([A-Za-z0-9][\w.-]*/[\w.-]+?)(?:\.git)?(?:#(.+))?$")
                .unwrap(),
        }
    }
}

impl Default for PackageJsonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for PackageJsonParser {
    fn can_parse(&self, uri: &str) -> bool {
        is_package_json(uri)
    }

    fn parse(&self, content: &str) -> Result<Vec<DependencyNode>, ParseError> {
        let mut parser = tree_sitter::Parser::new();
        let language = tree_sitter_json::LANGUAGE;
        parser.set_language(&language.into()).map_err(|e| {
            warn!("Failed to set JSON language for tree-sitter: {}", e);
            ParseError::TreeSitter(e.to_string())
        })?;

        let tree = parser.parse(content, None).ok_or_else(|| {
            warn!("Failed to parse JSON content");
            ParseError::ParseFailed("Failed to parse JSON".to_string())
        })?;

        let root = tree.root_node();

        // Half-typed manifests would produce misplaced lenses
        if root.has_error() {
            let position = first_error_position(root);
            return Err(ParseError::InvalidSyntax(format!(
                "syntax error near line {}, column {}",
                position.row + 1,
                position.column + 1
            )));
        }

        let mut results = Vec::new();

        // Find the root object
        if let Some(document) = root.child(0)
            && document.kind() == "object"
        {
            self.extract_dependencies(document, content, &mut results);
        }

        Ok(results)
    }
}

/// Where `version` sits inside the raw specifier, as (bytes skipped, length).
///
/// Aliases (`npm:name@range`) only expose the range. An alias without a range
/// resolves to `latest`, which is not written, so its span is empty.
fn version_span(raw: &str, version: &str) -> (usize, usize) {
    if raw == version {
        return (0, raw.len());
    }

    match raw.strip_suffix(version) {
        Some(prefix) if prefix.ends_with('@') => (prefix.len(), version.len()),
        _ => (raw.len(), 0),
    }
}

/// Locate the first ERROR or MISSING node for reporting
fn first_error_position(node: tree_sitter::Node) -> tree_sitter::Point {
    if node.is_error() || node.is_missing() {
        return node.start_position();
    }

    let mut cursor = node.walk();
    node.children(&mut cursor)
        .find(|child| child.has_error())
        .map(first_error_position)
        .unwrap_or_else(|| node.start_position())
}

impl PackageJsonParser {
    /// Parse npm alias format: npm:package@version or npm:@scope/package@version
    /// Returns (actual_package_name, version)
    fn parse_npm_alias(value: &str) -> Option<(String, String)> {
        let rest = value.strip_prefix("npm:")?;

        // Handle scoped packages: @scope/package@version
        if rest.starts_with('@') {
            // @scope/package@version -> find @ after the first /
            let slash_pos = rest.find('/')?;
            let after_slash = &rest[slash_pos + 1..];

            if let Some(at_pos) = after_slash.find('@') {
                let package_name = &rest[..slash_pos + 1 + at_pos];
                let version = &after_slash[at_pos + 1..];
                Some((package_name.to_string(), version.to_string()))
            } else {
                Some((rest.to_string(), "latest".to_string()))
            }
        } else if let Some(at_pos) = rest.find('@') {
            let package_name = &rest[..at_pos];
            let version = &rest[at_pos + 1..];
            Some((package_name.to_string(), version.to_string()))
        } else {
            Some((rest.to_string(), "latest".to_string()))
        }
    }

    /// Classify a declared specifier by where it resolves from
    fn classify_source(&self, specifier: &str) -> PackageSource {
        if let Some(path) = specifier.strip_prefix("file:") {
            return PackageSource::File {
                path: path.to_string(),
            };
        }

        if PATH_PREFIXES.iter().any(|p| specifier.starts_with(p)) {
            return PackageSource::File {
                path: specifier.to_string(),
            };
        }

        if UNSUPPORTED_PREFIXES.iter().any(|p| specifier.starts_with(p)) {
            return PackageSource::Unsupported;
        }

        if let Some(caps) = self.github_re.captures(specifier) {
            return PackageSource::GitHub {
                repo: caps[1].to_string(),
                reference: caps.get(2).map(|m| m.as_str().to_string()),
            };
        }

        PackageSource::Registry
    }

    /// Extract dependencies from the root object
    fn extract_dependencies(
        &self,
        object_node: tree_sitter::Node,
        content: &str,
        results: &mut Vec<DependencyNode>,
    ) {
        let mut cursor = object_node.walk();

        for child in object_node.children(&mut cursor) {
            if child.kind() != "pair" {
                continue;
            }

            let Some(key_node) = child.child_by_field_name("key") else {
                continue;
            };

            let Ok(field) = self
                .get_string_value(key_node, content)
                .parse::<DependencyField>()
            else {
                continue;
            };

            let Some(value_node) = child.child_by_field_name("value") else {
                continue;
            };

            if value_node.kind() == "object" {
                self.extract_packages_from_object(value_node, field, content, results);
            }
        }
    }

    /// Extract packages from a dependency object (e.g., "dependencies": { ... })
    fn extract_packages_from_object(
        &self,
        object_node: tree_sitter::Node,
        field: DependencyField,
        content: &str,
        results: &mut Vec<DependencyNode>,
    ) {
        let mut cursor = object_node.walk();

        for child in object_node.children(&mut cursor) {
            if child.kind() != "pair" {
                continue;
            }

            let Some(key_node) = child.child_by_field_name("key") else {
                continue;
            };

            let Some(value_node) = child.child_by_field_name("value") else {
                continue;
            };

            if value_node.kind() != "string" {
                continue;
            }

            let key_name = self.get_string_value(key_node, content);
            let raw_version = self.get_string_value(value_node, content);

            let (package_name, version) = Self::parse_npm_alias(&raw_version)
                .unwrap_or_else(|| (key_name.clone(), raw_version.clone()));
            let source = self.classify_source(&version);
            let (skip, len) = version_span(&raw_version, &version);

            let start_point = value_node.start_position();

            // The version starts after the opening quote
            let start_offset = value_node.start_byte() + 1 + skip;
            results.push(DependencyNode {
                key: key_name,
                name: package_name,
                version,
                field,
                source,
                start_offset,
                end_offset: start_offset + len,
                line: start_point.row,
                column: start_point.column + 1 + skip,
            });
        }
    }

    /// Get the string value from a string node (removes quotes)
    fn get_string_value(&self, node: tree_sitter::Node, content: &str) -> String {
        let text = &content[node.byte_range()];
        text.trim()
            .trim_start_matches('"')
            .trim_end_matches('"')
            .to_string()
    }
}
