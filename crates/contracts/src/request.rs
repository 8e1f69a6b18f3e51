//! Request trait - protocol-neutral view of an outgoing request

use std::any::Any;
use std::fmt::Debug;

use bytes::Bytes;

use crate::{Metadata, Protocol};

/// Outgoing request
///
/// Immutable once handed to a dispatcher; it is shared between all
/// concurrently running route calls as `Arc<dyn Request>`.
pub trait Request: Debug + Send + Sync {
    /// Protocol the request was built for
    fn protocol(&self) -> Protocol;

    /// Opaque payload bytes
    fn payload(&self) -> &Bytes;

    /// Header / metadata entries
    fn metadata(&self) -> &Metadata;

    /// Concrete type access, so an adapter can recover its own request type
    fn as_any(&self) -> &dyn Any;
}
