//! Version management layer for npm packages
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Registry  │────▶│    Cache    │◀────│   Checker   │
//! │  (fetch)    │     │  (storage)  │     │  (lookup)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │   Matcher   │
//!                                         │ (npm ranges)│
//!                                         └─────────────┘
//! ```
//!
//! - [`cache`]: SQLite-based version cache with refresh bookkeeping
//! - [`checker`]: Cache lookups returning [`checker::PackageLookup`]
//! - [`matcher`]: Version matching trait, implemented in [`matchers`]
//! - [`registry`]: Registry trait, implemented in [`registries`]
//! - [`error`]: Error types for cache and registry operations
//! - [`semver`]: Shared semver utilities
//! - [`types`]: `PackageVersions`

pub mod cache;
pub mod checker;
pub mod error;
pub mod matcher;
pub mod matchers;
pub mod registries;
pub mod registry;
pub mod semver;
pub mod types;
