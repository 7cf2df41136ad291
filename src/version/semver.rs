use semver::Version;

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Handles partial versions like "1" or "1.2" by padding with zeros.
/// A leading `v` or `=` is accepted, as npm does for exact versions.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "1.2" -> Version(1, 2, 0)
/// - "v1.2.3" -> Version(1, 2, 3)
pub fn parse_version(version: &str) -> Option<Version> {
    let version = version
        .trim()
        .trim_start_matches('=')
        .trim_start_matches('v');
    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Operator prefix of a declared range (`^`, `~`, `>=`, ...), empty for exact versions
pub fn range_prefix(version: &str) -> &str {
    const PREFIXES: [&str; 8] = [">=", "<=", ">", "<", "=", "^", "~", "v"];

    PREFIXES
        .iter()
        .find(|p| version.starts_with(**p))
        .copied()
        .unwrap_or("")
}

/// Whether the version string carries prerelease identifiers
pub fn is_prerelease(version: &str) -> bool {
    parse_version(version).is_some_and(|v| !v.pre.is_empty())
}

/// Semantic equality, tolerant of `v` prefixes and partial versions
pub fn versions_equal(a: &str, b: &str) -> bool {
    match (parse_version(a), parse_version(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}
