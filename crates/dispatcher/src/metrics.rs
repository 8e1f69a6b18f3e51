//! Route metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use observability::RouteOutcomeKind;

/// Counters for a single route
///
/// Shared by every dispatch that invokes the route.
#[derive(Debug, Default)]
pub struct RouteMetrics {
    /// Calls currently running
    in_flight: AtomicUsize,
    /// Total invocations
    invocations: AtomicU64,
    /// Successful responses
    successes: AtomicU64,
    /// Non-success responses and transport failures
    failures: AtomicU64,
    /// Calls that exceeded their budget
    timeouts: AtomicU64,
    /// Calls abandoned because the dispatch scope was cancelled
    cancellations: AtomicU64,
}

impl RouteMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current in-flight count
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Get total invocation count
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    pub fn cancellations(&self) -> u64 {
        self.cancellations.load(Ordering::Relaxed)
    }

    /// Mark a call as started
    ///
    /// The returned guard decrements the in-flight count when dropped, so an
    /// aborted task is accounted for as well.
    pub fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard(Arc::clone(self))
    }

    /// Count a finished call
    pub fn record(&self, kind: RouteOutcomeKind) {
        let counter = match kind {
            RouteOutcomeKind::Success => &self.successes,
            RouteOutcomeKind::NonSuccess | RouteOutcomeKind::Failed => &self.failures,
            RouteOutcomeKind::Timeout => &self.timeouts,
            RouteOutcomeKind::Cancelled => &self.cancellations,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> RouteMetricsSnapshot {
        RouteMetricsSnapshot {
            in_flight: self.in_flight(),
            invocations: self.invocations(),
            successes: self.successes(),
            failures: self.failures(),
            timeouts: self.timeouts(),
            cancellations: self.cancellations(),
        }
    }
}

/// Decrements the in-flight count on drop
#[derive(Debug)]
pub struct InFlightGuard(Arc<RouteMetrics>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Snapshot of route metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMetricsSnapshot {
    pub in_flight: usize,
    pub invocations: u64,
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub cancellations: u64,
}
