//! npm version matcher
//!
//! Supports npm semver range specifications:
//! - `1.2.3`, `=1.2.3`, `v1.2.3` - exact match
//! - `^1.2.3` - compatible with version (>=1.2.3 <2.0.0)
//! - `~1.2.3` - approximately equivalent (>=1.2.3 <1.3.0)
//! - `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3` - comparison operators
//! - `1.2.x`, `1.x`, `1.2`, `1`, `*`, `""` - wildcards and partial versions
//! - `1.0.0 - 2.0.0` - hyphen ranges
//! - space separated comparators (AND) and `||` alternatives (OR)
//!
//! Prerelease versions only satisfy a range when one of its comparators
//! names a prerelease on the same `major.minor.patch`.

use semver::Version;

use crate::version::matcher::VersionMatcher;
use crate::version::semver::parse_version;

pub struct NpmVersionMatcher;

/// Top-level version specification
#[derive(Debug)]
enum VersionSpec {
    /// Single range (^1.0.0, >=1.0.0, etc.)
    Single(VersionRange),
    /// AND of ranges (>=1.0.0 <2.0.0) - all must satisfy
    And(Vec<VersionSpec>),
    /// OR of specs (^1.0.0 || ^2.0.0) - any must satisfy
    Or(Vec<VersionSpec>),
}

impl VersionSpec {
    fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Some(VersionSpec::Single(VersionRange::Any));
        }

        // OR has the lowest precedence
        if spec.contains("||") {
            let specs: Option<Vec<VersionSpec>> =
                spec.split("||").map(Self::parse_and_or_single).collect();
            return specs.map(VersionSpec::Or);
        }

        Self::parse_and_or_single(spec)
    }

    /// Parse a spec that may be AND (space-separated) or a single range
    fn parse_and_or_single(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Some(VersionSpec::Single(VersionRange::Any));
        }

        if let Some(range) = VersionRange::parse_hyphen(spec) {
            return Some(VersionSpec::Single(range));
        }

        let parts = Self::split_and_parts(spec);
        if parts.len() > 1 {
            let ranges: Option<Vec<VersionSpec>> = parts
                .into_iter()
                .map(|p| VersionRange::parse(&p).map(VersionSpec::Single))
                .collect();
            ranges.map(VersionSpec::And)
        } else {
            VersionRange::parse(spec).map(VersionSpec::Single)
        }
    }

    /// Split into AND parts, re-attaching operators separated by a space (`>= 1.0.0`)
    fn split_and_parts(spec: &str) -> Vec<String> {
        let mut parts: Vec<String> = Vec::new();
        let mut pending_operator = String::new();

        for token in spec.split_whitespace() {
            if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
                pending_operator.push_str(token);
                continue;
            }
            parts.push(format!("{pending_operator}{token}"));
            pending_operator.clear();
        }

        if !pending_operator.is_empty() {
            parts.push(pending_operator);
        }

        parts
    }

    fn satisfies(&self, version: &Version) -> bool {
        match self {
            VersionSpec::Single(range) => range.satisfies(version),
            VersionSpec::And(specs) => specs.iter().all(|s| s.satisfies(version)),
            VersionSpec::Or(specs) => specs.iter().any(|s| s.satisfies(version)),
        }
    }

    /// npm matching: [`Self::satisfies`] plus the prerelease opt-in rule
    fn matches(&self, version: &Version) -> bool {
        if !version.pre.is_empty() && !self.opts_into_prerelease(version) {
            return false;
        }
        self.satisfies(version)
    }

    fn opts_into_prerelease(&self, version: &Version) -> bool {
        match self {
            VersionSpec::Single(range) => range.bound_versions().iter().any(|bound| {
                !bound.pre.is_empty()
                    && bound.major == version.major
                    && bound.minor == version.minor
                    && bound.patch == version.patch
            }),
            VersionSpec::And(specs) | VersionSpec::Or(specs) => {
                specs.iter().any(|s| s.opts_into_prerelease(version))
            }
        }
    }
}

/// Represents a parsed npm version range
#[derive(Debug)]
enum VersionRange {
    Exact(Version),
    /// ^1.2.3 means >=1.2.3 <2.0.0 (or special cases for 0.x)
    Caret(Version),
    /// ~1.2.3 means >=1.2.3 <1.3.0
    Tilde(Version),
    Gte(Version),
    Gt(Version),
    Lte(Version),
    Lt(Version),
    Any,
    /// 1.x, 1, ~1 mean >=1.0.0 <2.0.0
    WildcardMajor(u64),
    /// 1.2.x, 1.2 mean >=1.2.0 <1.3.0
    WildcardMinor(u64, u64),
    /// 1.0.0 - 2.0.0 means >=1.0.0 <=2.0.0, 1.0.0 - 2 means >=1.0.0 <3.0.0
    Hyphen {
        from: Version,
        to: Version,
        inclusive: bool,
    },
}

impl VersionRange {
    fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();

        if let Some(range) = Self::parse_hyphen(spec) {
            return Some(range);
        }

        if let Some(rest) = spec.strip_prefix(">=") {
            parse_partial(rest).map(|(v, _)| VersionRange::Gte(v))
        } else if let Some(rest) = spec.strip_prefix('>') {
            // `>1.2` excludes all of 1.2.x
            parse_partial(rest).map(|(v, written)| match written {
                3 => VersionRange::Gt(v),
                _ => VersionRange::Gte(next_unwritten(&v, written)),
            })
        } else if let Some(rest) = spec.strip_prefix("<=") {
            // `<=1.2` includes all of 1.2.x
            parse_partial(rest).map(|(v, written)| match written {
                3 => VersionRange::Lte(v),
                _ => VersionRange::Lt(next_unwritten(&v, written)),
            })
        } else if let Some(rest) = spec.strip_prefix('<') {
            parse_partial(rest).map(|(v, _)| VersionRange::Lt(v))
        } else if let Some(rest) = spec.strip_prefix('^') {
            Self::parse_caret(rest)
        } else if let Some(rest) = spec.strip_prefix('~') {
            Self::parse_tilde(rest.trim_start_matches('>'))
        } else {
            Self::parse_wildcard(spec).or_else(|| parse_version(spec).map(VersionRange::Exact))
        }
    }

    /// A partial upper bound covers everything it names: `1 - 2` is `>=1.0.0 <3.0.0`
    fn parse_hyphen(spec: &str) -> Option<Self> {
        let (from, to) = spec.split_once(" - ")?;
        let (from, _) = parse_partial(from)?;
        let (to, written) = parse_partial(to)?;
        let range = match written {
            3 => VersionRange::Hyphen {
                from,
                to,
                inclusive: true,
            },
            _ => VersionRange::Hyphen {
                from,
                to: next_unwritten(&to, written),
                inclusive: false,
            },
        };
        Some(range)
    }

    /// `^1.2` keeps caret semantics, `^0.0` means `<0.1.0`, and `^1` and
    /// `^1.x` collapse to a major wildcard
    fn parse_caret(rest: &str) -> Option<Self> {
        let rest = rest.trim();
        let has_wildcard = rest.split('.').any(is_wildcard);
        if rest.split('.').count() == 2 && !has_wildcard {
            return parse_version(rest).map(|v| match (v.major, v.minor) {
                (0, 0) => VersionRange::WildcardMinor(0, 0),
                _ => VersionRange::Caret(v),
            });
        }
        Self::parse_wildcard(rest).or_else(|| parse_version(rest).map(VersionRange::Caret))
    }

    /// `~1` and `~1.2` are wildcards, `~1.2.3` pins the minor
    fn parse_tilde(rest: &str) -> Option<Self> {
        let rest = rest.trim();
        Self::parse_wildcard(rest).or_else(|| parse_version(rest).map(VersionRange::Tilde))
    }

    /// Wildcards (`*`, `x`, `1.x`, `1.2.*`) and partial versions (`1`, `1.2`)
    fn parse_wildcard(spec: &str) -> Option<Self> {
        let spec = spec.trim().trim_start_matches('=').trim_start_matches('v');
        let parts: Vec<&str> = spec.split('.').collect();

        match parts.as_slice() {
            [x, ..] if is_wildcard(x) => Some(VersionRange::Any),
            [major] => major.parse::<u64>().ok().map(VersionRange::WildcardMajor),
            [major, x] | [major, x, _] if is_wildcard(x) => {
                major.parse::<u64>().ok().map(VersionRange::WildcardMajor)
            }
            [major, minor] => {
                let major = major.parse::<u64>().ok()?;
                let minor = minor.parse::<u64>().ok()?;
                Some(VersionRange::WildcardMinor(major, minor))
            }
            [major, minor, x] if is_wildcard(x) => {
                let major = major.parse::<u64>().ok()?;
                let minor = minor.parse::<u64>().ok()?;
                Some(VersionRange::WildcardMinor(major, minor))
            }
            _ => None,
        }
    }

    fn satisfies(&self, version: &Version) -> bool {
        match self {
            VersionRange::Exact(v) => version == v,
            VersionRange::Caret(v) => {
                if version < v {
                    return false;
                }
                if v.major == 0 {
                    if v.minor == 0 {
                        version.major == 0 && version.minor == 0 && version.patch == v.patch
                    } else {
                        version.major == 0 && version.minor == v.minor
                    }
                } else {
                    version.major == v.major
                }
            }
            VersionRange::Tilde(v) => {
                version >= v && version.major == v.major && version.minor == v.minor
            }
            VersionRange::Gte(v) => version >= v,
            VersionRange::Gt(v) => version > v,
            VersionRange::Lte(v) => version <= v,
            VersionRange::Lt(v) => version < v,
            VersionRange::Any => true,
            VersionRange::WildcardMajor(major) => version.major == *major,
            VersionRange::WildcardMinor(major, minor) => {
                version.major == *major && version.minor == *minor
            }
            VersionRange::Hyphen {
                from,
                to,
                inclusive,
            } => version >= from && (version < to || (*inclusive && version == to)),
        }
    }

    /// Versions written in the range, used by the prerelease rule
    fn bound_versions(&self) -> Vec<&Version> {
        match self {
            VersionRange::Exact(v)
            | VersionRange::Caret(v)
            | VersionRange::Tilde(v)
            | VersionRange::Gte(v)
            | VersionRange::Gt(v)
            | VersionRange::Lte(v)
            | VersionRange::Lt(v) => vec![v],
            VersionRange::Hyphen { from, to, .. } => vec![from, to],
            VersionRange::Any | VersionRange::WildcardMajor(_) | VersionRange::WildcardMinor(..) => {
                vec![]
            }
        }
    }
}

fn is_wildcard(part: &str) -> bool {
    part == "*" || part.eq_ignore_ascii_case("x")
}

/// Parse a possibly partial version (`1`, `1.2`, `1.x`) padded with zeros,
/// along with how many of major, minor and patch were written
fn parse_partial(spec: &str) -> Option<(Version, usize)> {
    let spec = spec.trim().trim_start_matches('=').trim_start_matches('v');
    let core = spec.split(['-', '+']).next().unwrap_or(spec);
    let written = core.split('.').take_while(|part| !is_wildcard(part)).count();

    match written {
        0 => None,
        1 | 2 if core.len() == spec.len() => {
            let parts: Vec<&str> = core.split('.').take(written).collect();
            parse_version(&parts.join(".")).map(|v| (v, written))
        }
        _ => parse_version(spec).map(|v| (v, written)),
    }
}

/// First version past everything a partial version names: `1` -> `2.0.0`, `1.2` -> `1.3.0`
fn next_unwritten(version: &Version, written: usize) -> Version {
    match written {
        1 => Version::new(version.major + 1, 0, 0),
        _ => Version::new(version.major, version.minor + 1, 0),
    }
}

impl VersionMatcher for NpmVersionMatcher {
    fn is_valid(&self, version_spec: &str) -> bool {
        VersionSpec::parse(version_spec).is_some()
    }

    fn is_fixed(&self, version_spec: &str) -> bool {
        matches!(
            VersionSpec::parse(version_spec),
            Some(VersionSpec::Single(VersionRange::Exact(_)))
        )
    }

    fn satisfies(&self, version_spec: &str, version: &str) -> bool {
        let (Some(spec), Some(version)) = (VersionSpec::parse(version_spec), parse_version(version))
        else {
            return false;
        };
        spec.matches(&version)
    }

    fn max_satisfying(&self, version_spec: &str, available_versions: &[String]) -> Option<String> {
        let spec = VersionSpec::parse(version_spec)?;

        available_versions
            .iter()
            .filter_map(|v| Version::parse(v).ok().map(|parsed| (v, parsed)))
            .filter(|(_, parsed)| spec.matches(parsed))
            .max_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(v, _)| v.clone())
    }
}
