//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Malformed `-H key=value` argument
    #[error("Invalid header '{raw}': expected KEY=VALUE")]
    InvalidHeader { raw: String },

    /// Repeat count must be positive
    #[error("--repeat must be at least 1")]
    InvalidRepeat,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_header(raw: impl Into<String>) -> Self {
        Self::InvalidHeader { raw: raw.into() }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
