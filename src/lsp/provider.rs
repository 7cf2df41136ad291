//! Code lens generation for package.json documents
//!
//! Lenses are produced unresolved, one per dependency, carrying
//! [`LensData`]. Commands are attached in `codeLens/resolve`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{CodeLens, Position, Range, Url};

use crate::install::node_modules::package_dir_exists;
use crate::install::outdated::OutdatedCache;
use crate::lsp::decorations::{Decoration, DecorationKind, decide_decoration};
use crate::lsp::lens::{PackageLens, RegistryState};
use crate::parser::types::DependencyNode;
use crate::version::matcher::VersionMatcher;

/// Payload of an unresolved lens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LensData {
    pub uri: Url,
    pub node: DependencyNode,
    /// Character offset of the end of the dependency's line
    pub line_end: u32,
}

impl LensData {
    pub fn from_code_lens(lens: &CodeLens) -> Option<Self> {
        serde_json::from_value(lens.data.clone()?).ok()
    }

    /// Where install-state decorations for this dependency are drawn
    pub fn decoration_position(&self) -> Position {
        Position {
            line: self.node.line as u32,
            character: self.line_end,
        }
    }
}

/// Range covering the declared version string, without quotes
///
/// Node columns are bytes, LSP positions count UTF-16 code units.
pub fn node_range(content: &str, node: &DependencyNode) -> Range {
    let line = node.line as u32;
    let text = content.lines().nth(node.line).unwrap_or_default();
    Range {
        start: Position {
            line,
            character: utf16_column(text, node.column),
        },
        end: Position {
            line,
            character: utf16_column(text, node.end_column()),
        },
    }
}

fn utf16_column(line: &str, byte_column: usize) -> u32 {
    line.get(..byte_column)
        .map(|prefix| prefix.encode_utf16().count())
        .unwrap_or(byte_column) as u32
}

/// Directory holding the manifest, `None` for non-file URIs
pub fn project_dir(uri: &Url) -> Option<PathBuf> {
    uri.to_file_path()
        .ok()?
        .parent()
        .map(Path::to_path_buf)
}

/// Length of a line in UTF-16 code units
fn line_end(content: &str, line: usize) -> u32 {
    content
        .lines()
        .nth(line)
        .map(|text| text.trim_end().encode_utf16().count() as u32)
        .unwrap_or_default()
}

/// One unresolved lens per dependency declaration
pub fn unresolved_lenses(uri: &Url, content: &str, nodes: Vec<DependencyNode>) -> Vec<CodeLens> {
    nodes
        .into_iter()
        .filter_map(|node| {
            let range = node_range(content, &node);
            let data = LensData {
                uri: uri.clone(),
                line_end: line_end(content, node.line),
                node,
            };
            Some(CodeLens {
                range,
                command: None,
                data: Some(serde_json::to_value(data).ok()?),
            })
        })
        .collect()
}

/// Install-state decoration for a registry dependency
pub async fn resolve_decoration(
    project_dir: &Path,
    data: &LensData,
    registry: &RegistryState,
    matcher: &dyn VersionMatcher,
    outdated: &OutdatedCache,
) -> Option<Decoration> {
    let node = &data.node;
    // npm installs and reports aliases under the declared key
    let installed = package_dir_exists(project_dir, &node.key);
    let entry = outdated.find(project_dir, &node.key).await;

    let lens = PackageLens::new(node, registry, matcher);
    let resolved = lens.resolved_version();

    let kind: DecorationKind = decide_decoration(
        installed,
        entry.as_ref(),
        resolved.as_deref(),
        lens.latest_version(),
    )?;

    Some(Decoration {
        position: data.decoration_position(),
        kind,
    })
}
