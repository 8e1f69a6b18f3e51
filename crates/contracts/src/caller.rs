//! Caller trait - protocol adapter behind a route

use async_trait::async_trait;

use crate::{CallError, Protocol, Request, Response};

/// Protocol adapter
///
/// Issues exactly one network call per invocation. Timeouts, cancellation
/// and retries are the route's business, not the adapter's: `call` may be
/// dropped at any await point.
///
/// # Errors
/// Transport or protocol failures are returned as [`CallError`]; a backend
/// reply with a non-success status is still `Ok`.
#[async_trait]
pub trait Caller: Send + Sync {
    /// Protocol of the responses this adapter produces
    fn protocol(&self) -> Protocol;

    /// Target endpoint descriptor (URL, `host:port`, ...)
    fn endpoint(&self) -> &str;

    /// Send the request and wait for the reply
    async fn call(&self, request: &dyn Request) -> Result<Box<dyn Response>, CallError>;
}
