//! DispatchResult - single-slot result handle

use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use contracts::{Protocol, Response};
use futures::stream::{FusedStream, Stream};
use tokio::sync::oneshot;

use crate::error::DispatchError;

/// Item delivered by a dispatch
pub type DispatchOutput = Result<Box<dyn Response>, DispatchError>;

/// Handle to the eventual result of one dispatch
///
/// Yields exactly one item, either through [`recv`](Self::recv) or as a
/// [`Stream`] that ends after its first item. Dropping the handle before the
/// dispatch resolves cancels every in-flight candidate.
#[derive(Debug)]
pub struct DispatchResult {
    protocol: Protocol,
    rx: Option<oneshot::Receiver<DispatchOutput>>,
}

impl DispatchResult {
    pub(crate) fn new(protocol: Protocol, rx: oneshot::Receiver<DispatchOutput>) -> Self {
        Self {
            protocol,
            rx: Some(rx),
        }
    }

    /// Protocol of the dispatched request
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Wait for the result
    ///
    /// If the dispatch went away without answering (runtime shutting down),
    /// or the item was already taken through the stream, this reports
    /// [`DispatchError::Cancelled`].
    pub async fn recv(mut self) -> DispatchOutput {
        let protocol = self.protocol;
        match self.rx.take() {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(DispatchError::cancelled(protocol))),
            None => Err(DispatchError::cancelled(protocol)),
        }
    }
}

impl Stream for DispatchResult {
    type Item = DispatchOutput;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let protocol = self.protocol;
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Ready(None);
        };

        let item = ready!(Pin::new(rx).poll(cx));
        self.rx = None;
        Poll::Ready(Some(
            item.unwrap_or_else(|_| Err(DispatchError::cancelled(protocol))),
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.rx {
            Some(_) => (1, Some(1)),
            None => (0, Some(0)),
        }
    }
}

impl FusedStream for DispatchResult {
    fn is_terminated(&self) -> bool {
        self.rx.is_none()
    }
}
