//! RPC request and response types

use std::any::Any;

use bytes::Bytes;
use contracts::{Metadata, Protocol, Request, Response};

use super::RpcCode;

/// Outgoing RPC request
#[derive(Debug, Clone, Default)]
pub struct RpcRequest {
    pub(crate) metadata: Metadata,
    pub(crate) payload: Bytes,
}

impl RpcRequest {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            metadata: Metadata::new(),
            payload: payload.into(),
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.metadata.append(key, value);
        self
    }
}

impl Request for RpcRequest {
    fn protocol(&self) -> Protocol {
        Protocol::Rpc
    }

    fn payload(&self) -> &Bytes {
        &self.payload
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// RPC reply
#[derive(Debug, Clone)]
pub struct RpcResponse {
    pub(crate) code: RpcCode,
    pub(crate) message: String,
    pub(crate) metadata: Metadata,
    pub(crate) payload: Bytes,
}

impl RpcResponse {
    /// Successful reply carrying `payload`
    pub fn ok(payload: impl Into<Bytes>) -> Self {
        Self {
            code: RpcCode::Ok,
            message: String::new(),
            metadata: Metadata::new(),
            payload: payload.into(),
        }
    }

    /// Error reply
    pub fn error(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            metadata: Metadata::new(),
            payload: Bytes::new(),
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.metadata.append(key, value);
        self
    }

    pub fn code(&self) -> RpcCode {
        self.code
    }

    /// Status message (empty on success)
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Response for RpcResponse {
    fn protocol(&self) -> Protocol {
        Protocol::Rpc
    }

    fn payload(&self) -> &Bytes {
        &self.payload
    }

    fn status_code(&self) -> i32 {
        self.code.as_i32()
    }

    fn is_success(&self) -> bool {
        self.code == RpcCode::Ok
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
