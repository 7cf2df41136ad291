//! Install-state markers rendered as inlay hints

use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;
use tower_lsp::lsp_types::{
    InlayHint, InlayHintKind, InlayHintLabel, InlayHintTooltip, Position, Range, Url,
};

use crate::install::outdated::OutdatedEntry;
use crate::version::semver::{is_prerelease, versions_equal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecorationKind {
    /// Nothing in `node_modules`
    Missing,
    Installed { version: String },
    PrereleaseInstalled { version: String },
    /// Installed as resolved, but the resolved version is behind latest
    Outdated { version: String },
    /// Installed version differs from the resolved one
    NeedsUpdate { current: String },
}

impl DecorationKind {
    pub fn label(&self) -> String {
        match self {
            DecorationKind::Missing => "missing install".to_string(),
            DecorationKind::Installed { version } => format!("installed {}", version),
            DecorationKind::PrereleaseInstalled { version } => {
                format!("prerelease installed {}", version)
            }
            DecorationKind::Outdated { version } => format!("outdated {}", version),
            DecorationKind::NeedsUpdate { current } => {
                format!("needs update, installed {}", current)
            }
        }
    }

    fn tooltip(&self) -> &'static str {
        match self {
            DecorationKind::Missing => "Not found in node_modules",
            DecorationKind::Installed { .. } => "Installed version is up to date",
            DecorationKind::PrereleaseInstalled { .. } => "Installed version is a prerelease",
            DecorationKind::Outdated { .. } => "A newer version has been published",
            DecorationKind::NeedsUpdate { .. } => "Installed version does not match the manifest",
        }
    }
}

/// Pick the decoration for one dependency
///
/// `resolved` is the version the declaration installs, `latest` the
/// registry's latest. Returns `None` when an installed package cannot be
/// judged because nothing resolves.
pub fn decide_decoration(
    installed: bool,
    outdated: Option<&OutdatedEntry>,
    resolved: Option<&str>,
    latest: Option<&str>,
) -> Option<DecorationKind> {
    if !installed {
        return Some(DecorationKind::Missing);
    }

    let resolved = resolved?;

    let Some(entry) = outdated else {
        return Some(DecorationKind::Installed {
            version: resolved.to_string(),
        });
    };

    if !versions_equal(&entry.current, resolved) {
        return Some(DecorationKind::NeedsUpdate {
            current: entry.current.clone(),
        });
    }

    let version = entry.current.clone();
    let kind = if latest.is_some_and(|latest| versions_equal(resolved, latest)) {
        DecorationKind::Installed { version }
    } else if is_prerelease(resolved) {
        DecorationKind::PrereleaseInstalled { version }
    } else {
        DecorationKind::Outdated { version }
    };

    Some(kind)
}

/// A decoration anchored at the end of a dependency line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub position: Position,
    pub kind: DecorationKind,
}

impl Decoration {
    pub fn to_inlay_hint(&self) -> InlayHint {
        InlayHint {
            position: self.position,
            label: InlayHintLabel::String(self.kind.label()),
            kind: Some(InlayHintKind::TYPE),
            text_edits: None,
            tooltip: Some(InlayHintTooltip::String(self.kind.tooltip().to_string())),
            padding_left: Some(true),
            padding_right: None,
            data: None,
        }
    }
}

/// Decorations per document, one per dependency line
#[derive(Default)]
pub struct DecorationStore {
    documents: RwLock<HashMap<Url, BTreeMap<u32, Decoration>>>,
}

impl DecorationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a decoration. Returns true when it differs from what was there.
    pub async fn set(&self, uri: &Url, decoration: Decoration) -> bool {
        let mut documents = self.documents.write().await;
        let lines = documents.entry(uri.clone()).or_default();

        let line = decoration.position.line;
        if lines.get(&line) == Some(&decoration) {
            return false;
        }

        lines.insert(line, decoration);
        true
    }

    /// Drop every decoration of a document. Returns true when any existed.
    pub async fn clear(&self, uri: &Url) -> bool {
        self.documents
            .write()
            .await
            .remove(uri)
            .is_some_and(|lines| !lines.is_empty())
    }

    pub async fn clear_all(&self) {
        self.documents.write().await.clear();
    }

    /// Inlay hints for the decorations inside `range`
    pub async fn inlay_hints(&self, uri: &Url, range: Range) -> Vec<InlayHint> {
        let documents = self.documents.read().await;
        let Some(lines) = documents.get(uri) else {
            return Vec::new();
        };
        if range.start.line > range.end.line {
            return Vec::new();
        }

        lines
            .range(range.start.line..=range.end.line)
            .map(|(_, decoration)| decoration.to_inlay_hint())
            .collect()
    }
}
