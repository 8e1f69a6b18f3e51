//! Dispatcher error types

use bytes::Bytes;
use contracts::{Metadata, Protocol, Response};
use thiserror::Error;

/// Errors raised while building a dispatcher
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Two routes share a name
    #[error("duplicate route name '{name}'")]
    DuplicateRoute { name: String },

    /// Route registered without a name
    #[error("route name cannot be empty")]
    EmptyRouteName,

    /// Protocol adapter could not be created
    #[error("failed to create caller for route '{route}': {message}")]
    CallerCreation { route: String, message: String },

    /// Configuration error (from contract)
    #[error("config error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    /// Create a caller creation error
    pub fn caller_creation(route: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CallerCreation {
            route: route.into(),
            message: message.into(),
        }
    }
}

/// Terminal error of a single dispatch
///
/// Every variant carries the protocol of the request, so it can be turned
/// into a protocol-specific status ([`ErrorResponse`]).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// Every candidate failed or timed out, or there were no candidates
    #[error("{protocol} service unavailable: no route produced a successful response")]
    ServiceUnavailable { protocol: Protocol },

    /// The caller withdrew the request before it resolved
    #[error("{protocol} dispatch cancelled by caller")]
    Cancelled { protocol: Protocol },

    /// The routing strategy failed to rank the routes
    #[error("{protocol} routing strategy failed: {message}")]
    Strategy { protocol: Protocol, message: String },

    /// The candidate order named unknown or repeated routes
    #[error("{protocol} invalid candidate order: {message}")]
    InvalidCandidates { protocol: Protocol, message: String },
}

impl DispatchError {
    pub fn unavailable(protocol: Protocol) -> Self {
        Self::ServiceUnavailable { protocol }
    }

    pub fn cancelled(protocol: Protocol) -> Self {
        Self::Cancelled { protocol }
    }

    pub fn strategy(protocol: Protocol, message: impl Into<String>) -> Self {
        Self::Strategy {
            protocol,
            message: message.into(),
        }
    }

    pub fn invalid_candidates(protocol: Protocol, message: impl Into<String>) -> Self {
        Self::InvalidCandidates {
            protocol,
            message: message.into(),
        }
    }

    /// Protocol of the request that failed
    pub fn protocol(&self) -> Protocol {
        match self {
            Self::ServiceUnavailable { protocol }
            | Self::Cancelled { protocol }
            | Self::Strategy { protocol, .. }
            | Self::InvalidCandidates { protocol, .. } => *protocol,
        }
    }

    /// Protocol-specific status code for this error
    pub fn status_code(&self) -> i32 {
        let protocol = self.protocol();
        match self {
            Self::ServiceUnavailable { .. } => protocol.unavailable_code(),
            Self::Cancelled { .. } => protocol.cancelled_code(),
            Self::Strategy { .. } | Self::InvalidCandidates { .. } => protocol.internal_code(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Dispatch error rendered as a response
///
/// Payload is `{"code": <status>, "error": "<message>"}`; never successful.
/// The backend tag stays empty because no route produced it.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    protocol: Protocol,
    code: i32,
    metadata: Metadata,
    payload: Bytes,
}

impl From<DispatchError> for ErrorResponse {
    fn from(err: DispatchError) -> Self {
        let code = err.status_code();
        let payload = serde_json::json!({
            "code": code,
            "error": err.to_string(),
        });
        Self {
            protocol: err.protocol(),
            code,
            metadata: Metadata::new(),
            payload: Bytes::from(payload.to_string()),
        }
    }
}

impl Response for ErrorResponse {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn payload(&self) -> &Bytes {
        &self.payload
    }

    fn status_code(&self) -> i32 {
        self.code
    }

    fn is_success(&self) -> bool {
        false
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
