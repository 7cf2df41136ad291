//! Parser layer
//! - traits.rs: Parser trait definition
//! - types.rs: Common types (DependencyNode, PackageSource)
//! - package_json.rs: package.json parser

pub mod package_json;
pub mod traits;
pub mod types;

pub use package_json::PackageJsonParser;
pub use traits::{ParseError, Parser};
pub use types::{DependencyField, DependencyNode, PackageSource};
