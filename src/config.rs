use serde::Deserialize;
use std::path::PathBuf;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default refresh interval in milliseconds (24 hours)
pub const DEFAULT_REFRESH_INTERVAL_MS: i64 = 24 * 60 * 60 * 1000;

/// Timeout for fetch operations in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: i64 = 30_000;

/// Delay between starting each fetch request to avoid rate limiting (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

/// Poll interval while another task fetches the same package (100ms)
pub const FETCH_WAIT_INTERVAL_MS: u64 = 100;

/// Polls before a package being fetched elsewhere is reported unavailable
pub const FETCH_WAIT_ATTEMPTS: u32 = 30;

/// Upper bound for a single `npm outdated` run (60 seconds)
pub const OUTDATED_TIMEOUT_MS: u64 = 60_000;

/// Default npm registry
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Default package manager executable used for `outdated` queries
pub const DEFAULT_NPM_COMMAND: &str = "npm";

/// LSP configuration structure
///
/// Read from `initializationOptions` and from `workspace/didChangeConfiguration`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LspConfig {
    pub show_version_lenses: bool,
    pub show_dependency_statuses: bool,
    pub cache: CacheConfig,
    pub registry: RegistryConfig,
    pub npm: NpmConfig,
}

impl Default for LspConfig {
    fn default() -> Self {
        Self {
            show_version_lenses: true,
            show_dependency_statuses: false,
            cache: CacheConfig::default(),
            registry: RegistryConfig::default(),
            npm: NpmConfig::default(),
        }
    }
}

impl LspConfig {
    /// Extract the configuration from a settings payload.
    ///
    /// Clients either send the section directly or nest it under `versionLens`.
    /// Anything that does not deserialize falls back to the defaults.
    pub fn from_settings(value: Option<serde_json::Value>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };

        let section = value.get("versionLens").cloned().unwrap_or(value);

        serde_json::from_value(section).unwrap_or_default()
    }
}

/// Cache-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Cache refresh interval in milliseconds
    pub refresh_interval: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    pub url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REGISTRY_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct NpmConfig {
    pub command: String,
}

impl Default for NpmConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_NPM_COMMAND.to_string(),
        }
    }
}

/// Returns the path to the data directory for version-lens.
/// Uses $XDG_DATA_HOME/version-lens if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/version-lens,
/// or ./version-lens if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("versions.db")
}

/// File name of the log file inside [`data_dir`].
pub const LOG_FILE_NAME: &str = "version-lens.log";

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("version-lens")
}
