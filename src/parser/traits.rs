//! Parser trait definition

#[cfg(test)]
use mockall::automock;

use crate::parser::types::DependencyNode;

/// Trait for parsing manifest files
#[cfg_attr(test, automock)]
pub trait Parser: Send + Sync {
    /// Check if this parser can handle the given URI
    fn can_parse(&self, uri: &str) -> bool;

    /// Parse the content and extract dependency declarations
    fn parse(&self, content: &str) -> Result<Vec<DependencyNode>, ParseError>;
}

/// Error type for parsing operations
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to parse the file structure
    #[error("Failed to parse file: {0}")]
    ParseFailed(String),

    /// Invalid syntax in the file
    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),

    /// Tree-sitter related error
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),
}
