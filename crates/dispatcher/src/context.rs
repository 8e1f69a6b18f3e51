//! DispatchContext - cancellation scope and optional deadline

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Caller-side context of a dispatch
///
/// Cloning shares the same cancellation token. A [`child`](Self::child) is
/// cancelled together with its parent but can also be cancelled on its own.
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl DispatchContext {
    /// Context without deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Context whose deadline is `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline_at(Instant::now() + timeout)
    }

    /// Context driven by an existing cancellation token
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Set an absolute deadline
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline (zero once it passed)
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Cancel this context and every child
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the context is cancelled
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Underlying token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Nested scope sharing the deadline
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }
}
