//! Shared utilities for E2E tests

#![allow(dead_code)]

pub mod lsp;
pub mod registry;

pub use lsp::*;
pub use registry::*;
