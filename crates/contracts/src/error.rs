//! Layered error definitions
//!
//! Categorized by source: config / call

use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure of a single backend call
///
/// Never crosses the dispatcher boundary; a route demotes it to a failed outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    /// Connection could not be established or was lost
    #[error("transport error calling '{endpoint}': {message}")]
    Transport { endpoint: String, message: String },

    /// The backend answered with something the adapter could not understand
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// The request could not be encoded for the wire
    #[error("encoding error: {message}")]
    Encoding { message: String },
}

impl CallError {
    /// Create transport error
    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }
}
