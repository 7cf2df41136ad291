//! LSP (Language Server Protocol) implementation layer
//!
//! This module handles communication with editors via LSP and renders
//! version lenses and install-state decorations for package.json.
//!
//! # Modules
//!
//! - [`backend`]: Main LSP backend implementing `LanguageServer` trait
//! - [`commands`]: Lens commands and `workspace/executeCommand` ids
//! - [`decorations`]: Install-state decorations rendered as inlay hints
//! - [`lens`]: Dependency predicates and the lens priority chain
//! - [`provider`]: Unresolved lens generation and decoration lookup
//! - [`refresh`]: On-demand and background registry fetches
//! - [`resolver`]: Groups parser, matcher, registry and outdated source
//! - [`server`]: LSP server initialization and lifecycle
//! - [`settings`]: Runtime show/hide switches

pub mod backend;
pub mod commands;
pub mod decorations;
pub mod lens;
pub mod provider;
pub mod refresh;
pub mod resolver;
pub mod server;
pub mod settings;
