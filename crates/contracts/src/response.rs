//! Response trait - protocol-neutral view of a backend reply

use std::fmt::Debug;

use bytes::Bytes;

use crate::{Metadata, Protocol, BACKEND_KEY};

/// Backend reply
///
/// Every protocol family implements this independently; the dispatcher only
/// ever sees `Box<dyn Response>`.
pub trait Response: Debug + Send + Sync {
    /// Protocol the response was received over
    fn protocol(&self) -> Protocol;

    /// Opaque payload bytes
    fn payload(&self) -> &Bytes;

    /// Protocol-specific status code (HTTP status, RPC code)
    fn status_code(&self) -> i32;

    /// Whether the status code denotes success for this protocol
    fn is_success(&self) -> bool;

    /// Response metadata
    fn metadata(&self) -> &Metadata;

    /// Mutable response metadata
    fn metadata_mut(&mut self) -> &mut Metadata;

    /// Name of the route that produced this response
    ///
    /// Multiple values are joined with `,`.
    fn backend_name(&self) -> String {
        self.metadata().get_joined(BACKEND_KEY, ",")
    }

    /// Tag the response with the route that produced it
    ///
    /// Called by the dispatcher after a call completes, never by adapters.
    fn set_backend_name(&mut self, name: &str) {
        self.metadata_mut().set(BACKEND_KEY, name);
    }
}
