//! Commands attached to resolved code lenses

use std::path::Path;

use serde_json::{Value, json};
use tower_lsp::lsp_types::{Command, Range, Url};

use crate::lsp::lens::Resolution;

pub const UPDATE_DEPENDENCY: &str = "versionlens.updateDependency";
pub const OPEN_LINK: &str = "versionlens.openLink";
pub const SHOW_VERSION_LENSES: &str = "versionlens.showVersionLenses";
pub const HIDE_VERSION_LENSES: &str = "versionlens.hideVersionLenses";
pub const SHOW_DEPENDENCY_STATUSES: &str = "versionlens.showDependencyStatuses";
pub const HIDE_DEPENDENCY_STATUSES: &str = "versionlens.hideDependencyStatuses";

/// Informational lenses carry no command id
const NO_COMMAND: &str = "";

/// Every command the server executes through `workspace/executeCommand`
pub fn supported_commands() -> Vec<String> {
    [
        UPDATE_DEPENDENCY,
        OPEN_LINK,
        SHOW_VERSION_LENSES,
        HIDE_VERSION_LENSES,
        SHOW_DEPENDENCY_STATUSES,
        HIDE_DEPENDENCY_STATUSES,
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum LensCommand {
    /// Replace the declared version with `text`
    Update {
        title: String,
        uri: Url,
        range: Range,
        text: String,
    },
    OpenLink {
        title: String,
        url: String,
    },
    Info {
        title: String,
    },
}

impl LensCommand {
    /// Build the command for a resolved dependency
    ///
    /// `uri` and `range` locate the declared version, `project_dir` anchors
    /// `file:` links.
    pub fn from_resolution(
        resolution: &Resolution,
        uri: &Url,
        range: Range,
        project_dir: Option<&Path>,
    ) -> Self {
        match resolution {
            Resolution::GitHub { repo, reference } => LensCommand::OpenLink {
                title: match reference {
                    Some(reference) => format!("github: {}#{}", repo, reference),
                    None => format!("github: {}", repo),
                },
                url: format!("https://github.com/{}", repo),
            },
            Resolution::File { path } => {
                let target = project_dir
                    .map(|dir| dir.join(path))
                    .and_then(|target| Url::from_file_path(target).ok());
                match target {
                    Some(target) => LensCommand::OpenLink {
                        title: format!("file: {}", path),
                        url: target.to_string(),
                    },
                    None => LensCommand::info(format!("file: {}", path)),
                }
            }
            Resolution::NotFound => LensCommand::info("package not found"),
            Resolution::Unavailable => LensCommand::info("registry unavailable"),
            Resolution::NotSupported => LensCommand::info("not supported"),
            Resolution::Tagged { tag, version } => LensCommand::info(match version {
                Some(version) => format!("tag {}: {}", tag, version),
                None => format!("tag {}", tag),
            }),
            Resolution::Invalid => LensCommand::info("invalid version"),
            Resolution::NoMatch => LensCommand::info("no match"),
            Resolution::MatchesPrerelease { version } => {
                LensCommand::info(format!("prerelease {}", version))
            }
            Resolution::MatchesLatest { latest } => {
                LensCommand::info(format!("latest {}", latest))
            }
            Resolution::SatisfiesLatest { latest } => {
                LensCommand::info(format!("satisfies latest {}", latest))
            }
            Resolution::Fixed { latest } => LensCommand::Update {
                title: format!("fixed, update to {}", latest),
                uri: uri.clone(),
                range,
                text: latest.clone(),
            },
            Resolution::Update { latest, text } => LensCommand::Update {
                title: format!("latest {}, update to {}", latest, text),
                uri: uri.clone(),
                range,
                text: text.clone(),
            },
        }
    }

    fn info(title: impl Into<String>) -> Self {
        LensCommand::Info {
            title: title.into(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            LensCommand::Update { title, .. }
            | LensCommand::OpenLink { title, .. }
            | LensCommand::Info { title } => title,
        }
    }
}

impl From<LensCommand> for Command {
    fn from(command: LensCommand) -> Self {
        match command {
            LensCommand::Update {
                title,
                uri,
                range,
                text,
            } => Command {
                title,
                command: UPDATE_DEPENDENCY.to_string(),
                arguments: Some(vec![json!(uri), json!(range), Value::String(text)]),
            },
            LensCommand::OpenLink { title, url } => Command {
                title,
                command: OPEN_LINK.to_string(),
                arguments: Some(vec![Value::String(url)]),
            },
            LensCommand::Info { title } => Command {
                title,
                command: NO_COMMAND.to_string(),
                arguments: None,
            },
        }
    }
}

/// Arguments of `versionlens.updateDependency`
pub fn parse_update_arguments(arguments: &[Value]) -> Option<(Url, Range, String)> {
    let [uri, range, text] = arguments else {
        return None;
    };

    let uri = serde_json::from_value(uri.clone()).ok()?;
    let range = serde_json::from_value(range.clone()).ok()?;
    let text = text.as_str()?.to_string();

    Some((uri, range, text))
}

/// Argument of `versionlens.openLink`
pub fn parse_open_link_arguments(arguments: &[Value]) -> Option<Url> {
    let [url] = arguments else {
        return None;
    };

    Url::parse(url.as_str()?).ok()
}
