//! Protocol tag

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire protocol family a request, response or route belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Request/response over HTTP semantics
    #[default]
    Http,
    /// Request/response over the framed RPC transport (gRPC status codes)
    Rpc,
}

impl Protocol {
    /// Status code signalling that no backend could serve the request
    pub fn unavailable_code(self) -> i32 {
        match self {
            Protocol::Http => 503,
            Protocol::Rpc => 14,
        }
    }

    /// Status code signalling that the caller withdrew the request
    pub fn cancelled_code(self) -> i32 {
        match self {
            Protocol::Http => 499,
            Protocol::Rpc => 1,
        }
    }

    /// Status code for an internal failure of the dispatcher itself
    pub fn internal_code(self) -> i32 {
        match self {
            Protocol::Http => 500,
            Protocol::Rpc => 13,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => f.write_str("HTTP"),
            Protocol::Rpc => f.write_str("RPC"),
        }
    }
}
