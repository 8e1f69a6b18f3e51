//! Outcome - result of one route invocation

use std::fmt;
use std::time::Duration;

use contracts::{CallError, Response};
use observability::RouteOutcomeKind;
use tokio::time::Instant;

/// What happened to a single route call
#[derive(Debug)]
pub enum OutcomeKind {
    /// The backend replied (successfully or not)
    Response(Box<dyn Response>),
    /// The call exceeded its budget
    Timeout { after: Duration },
    /// Transport or protocol failure
    Failed(CallError),
    /// The dispatch scope was cancelled first
    Cancelled,
}

/// Outcome of one route invocation, tagged with the route name
#[derive(Debug)]
pub struct Outcome {
    pub route: String,
    pub kind: OutcomeKind,
    pub received_at: Instant,
}

impl Outcome {
    pub fn new(route: impl Into<String>, kind: OutcomeKind) -> Self {
        Self {
            route: route.into(),
            kind,
            received_at: Instant::now(),
        }
    }

    /// True only for a response whose status denotes success
    pub fn is_success(&self) -> bool {
        matches!(&self.kind, OutcomeKind::Response(r) if r.is_success())
    }

    pub fn into_response(self) -> Option<Box<dyn Response>> {
        match self.kind {
            OutcomeKind::Response(response) => Some(response),
            _ => None,
        }
    }

    /// Metric label for this outcome
    pub fn metric_kind(&self) -> RouteOutcomeKind {
        match &self.kind {
            OutcomeKind::Response(r) if r.is_success() => RouteOutcomeKind::Success,
            OutcomeKind::Response(_) => RouteOutcomeKind::NonSuccess,
            OutcomeKind::Timeout { .. } => RouteOutcomeKind::Timeout,
            OutcomeKind::Failed(_) => RouteOutcomeKind::Failed,
            OutcomeKind::Cancelled => RouteOutcomeKind::Cancelled,
        }
    }

    /// Short human-readable reason (used for failure summaries)
    pub fn reason(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Response(r) if r.is_success() => {
                write!(f, "success (status {})", r.status_code())
            }
            OutcomeKind::Response(r) => write!(f, "non-success status {}", r.status_code()),
            OutcomeKind::Timeout { after } => write!(f, "timed out after {}ms", after.as_millis()),
            OutcomeKind::Failed(e) => write!(f, "{e}"),
            OutcomeKind::Cancelled => f.write_str("cancelled"),
        }
    }
}
