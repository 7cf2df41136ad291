//! Package resolution coordinator
//!
//! Groups parser, matcher, registry and outdated source that work together
//! to annotate a manifest.

use std::sync::Arc;

use crate::config::LspConfig;
use crate::install::outdated::{NpmOutdated, OutdatedSource};
use crate::parser::package_json::PackageJsonParser;
use crate::parser::traits::Parser;
use crate::version::matcher::VersionMatcher;
use crate::version::matchers::NpmVersionMatcher;
use crate::version::registries::npm::NpmRegistry;
use crate::version::registry::Registry;

/// Groups all components needed to resolve lenses for a manifest:
/// - Parsing files to extract dependency declarations
/// - Matching declared ranges against published versions
/// - Fetching published versions from the remote registry
/// - Asking the package manager which installs are outdated
#[derive(Clone)]
pub struct PackageResolver {
    parser: Arc<dyn Parser>,
    matcher: Arc<dyn VersionMatcher>,
    registry: Arc<dyn Registry>,
    outdated: Arc<dyn OutdatedSource>,
}

impl PackageResolver {
    pub fn new(
        parser: Arc<dyn Parser>,
        matcher: Arc<dyn VersionMatcher>,
        registry: Arc<dyn Registry>,
        outdated: Arc<dyn OutdatedSource>,
    ) -> Self {
        Self {
            parser,
            matcher,
            registry,
            outdated,
        }
    }

    pub fn parser(&self) -> &Arc<dyn Parser> {
        &self.parser
    }

    pub fn matcher(&self) -> &Arc<dyn VersionMatcher> {
        &self.matcher
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    pub fn outdated(&self) -> &Arc<dyn OutdatedSource> {
        &self.outdated
    }
}

/// Create the npm resolver described by the configuration
pub fn create_default_resolver(config: &LspConfig) -> PackageResolver {
    PackageResolver::new(
        Arc::new(PackageJsonParser::new()),
        Arc::new(NpmVersionMatcher),
        Arc::new(NpmRegistry::new(&config.registry.url)),
        Arc::new(NpmOutdated::new(&config.npm.command)),
    )
}
