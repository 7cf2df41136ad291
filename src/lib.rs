pub mod config;
pub mod install;
pub mod lsp;
pub mod parser;
pub mod version;
