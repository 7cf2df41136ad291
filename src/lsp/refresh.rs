//! Registry fetches feeding the version cache

use std::time::Duration;

use futures::future::join_all;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::{FETCH_STAGGER_DELAY_MS, FETCH_WAIT_ATTEMPTS, FETCH_WAIT_INTERVAL_MS};
use crate::lsp::lens::RegistryState;
use crate::version::checker::{PackageLookup, VersionStorer, lookup_package};
use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::types::PackageVersions;

/// Result of a single registry fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched(PackageVersions),
    NotFound,
    Failed,
    /// Another task or process holds the fetch lock
    Busy,
}

/// Fetch and cache a single package's versions
///
/// Handles:
/// - Acquiring fetch lock (prevents duplicate fetches)
/// - Fetching versions and dist-tags from registry
/// - Saving them to cache, or marking the package as not found
/// - Releasing fetch lock
pub async fn fetch_and_cache_package<S: VersionStorer>(
    storer: &S,
    registry: &dyn Registry,
    package_name: &str,
) -> FetchOutcome {
    let can_fetch = storer
        .try_start_fetch(package_name)
        .inspect_err(|e| error!("Failed to start fetch for {}: {}", package_name, e))
        .unwrap_or(false);

    if !can_fetch {
        info!("Skipping {}: already being fetched", package_name);
        return FetchOutcome::Busy;
    }

    let outcome = match registry.fetch_all_versions(package_name).await {
        Ok(package) if package.is_empty() => {
            info!("{} has no published versions", package_name);
            mark_not_found(storer, package_name);
            FetchOutcome::NotFound
        }
        Ok(package) => match storer.replace_package(package_name, &package) {
            Ok(()) => {
                info!(
                    "Saved {} versions for {}",
                    package.versions.len(),
                    package_name
                );
                FetchOutcome::Fetched(package)
            }
            Err(e) => {
                error!("Failed to save versions for {}: {}", package_name, e);
                // The fetch itself succeeded, lenses can still use it
                FetchOutcome::Fetched(package)
            }
        },
        Err(RegistryError::NotFound(_)) => {
            info!(
                "Package not found: {}. Marking as not found to skip future fetches.",
                package_name
            );
            mark_not_found(storer, package_name);
            FetchOutcome::NotFound
        }
        Err(e) => {
            warn!("Failed to fetch versions for {}: {}", package_name, e);
            FetchOutcome::Failed
        }
    };

    // Release fetch lock (always call regardless of success/failure)
    let _ = storer
        .finish_fetch(package_name)
        .inspect_err(|e| error!("Failed to finish fetch for {}: {}", package_name, e));

    outcome
}

fn mark_not_found<S: VersionStorer>(storer: &S, package_name: &str) {
    let _ = storer
        .mark_not_found(package_name)
        .inspect_err(|e| error!("Failed to mark {} as not found: {}", package_name, e));
}

/// Refresh versions for packages that need updating
///
/// Errors are logged but do not stop processing of other packages.
/// Fetches are executed in parallel with staggered start times to avoid rate limiting.
pub async fn refresh_packages<S: VersionStorer>(
    storer: &S,
    registry: &dyn Registry,
    packages: Vec<String>,
) {
    let futures = packages.into_iter().enumerate().map(|(i, package_name)| {
        let delay = Duration::from_millis(FETCH_STAGGER_DELAY_MS * i as u64);
        async move {
            sleep(delay).await;
            fetch_and_cache_package(storer, registry, &package_name).await;
        }
    });

    join_all(futures).await;
}

/// Registry metadata for a package, fetching it on demand when the cache
/// has never seen it
pub async fn registry_state<S: VersionStorer>(
    storer: &S,
    registry: &dyn Registry,
    package_name: &str,
) -> RegistryState {
    match cached_state(storer, package_name) {
        Some(state) => return state,
        None => debug!("{} not in cache, fetching", package_name),
    }

    match fetch_and_cache_package(storer, registry, package_name).await {
        FetchOutcome::Fetched(package) => RegistryState::Found(package),
        FetchOutcome::NotFound => RegistryState::NotFound,
        FetchOutcome::Failed => RegistryState::Unavailable,
        FetchOutcome::Busy => wait_for_fetch(storer, package_name).await,
    }
}

/// Cached state, `None` when the package was never fetched or the cache failed
fn cached_state<S: VersionStorer>(storer: &S, package_name: &str) -> Option<RegistryState> {
    match lookup_package(storer, package_name) {
        Ok(PackageLookup::Found(package)) => Some(RegistryState::Found(package)),
        Ok(PackageLookup::NotFound) => Some(RegistryState::NotFound),
        Ok(PackageLookup::NotCached) => None,
        Err(e) => {
            error!("Failed to read cache for {}: {}", package_name, e);
            None
        }
    }
}

/// Poll the cache while someone else fetches the package
async fn wait_for_fetch<S: VersionStorer>(storer: &S, package_name: &str) -> RegistryState {
    for _ in 0..FETCH_WAIT_ATTEMPTS {
        sleep(Duration::from_millis(FETCH_WAIT_INTERVAL_MS)).await;
        if let Some(state) = cached_state(storer, package_name) {
            return state;
        }
    }

    warn!("Gave up waiting for {} to be fetched", package_name);
    RegistryState::Unavailable
}
