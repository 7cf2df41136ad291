//! Local install state of a project
//!
//! - [`node_modules`]: whether a dependency is present in `node_modules`
//! - [`outdated`]: installed versions reported by `npm outdated`

pub mod node_modules;
pub mod outdated;
