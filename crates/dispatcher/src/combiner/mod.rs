//! Outcome combination
//!
//! A [`CombinePolicy`] creates one [`Combiner`] per dispatch. The combiner
//! receives outcomes in arrival order, each tagged with the rank of its
//! candidate, and decides when the dispatch is resolved.
//!
//! ```text
//! candidates:  [R3, R1, R2]          rank 0, 1, 2
//! arrivals:    R2 ok, R3 timeout, R1 ok
//!
//! fallback:        R2 ok  -> wait (rank 0 pending)
//!                  R3 t/o -> wait (rank 1 pending)
//!                  R1 ok  -> resolve R1
//! first_success:   R2 ok  -> resolve R2
//! ```

mod fallback;
mod first_success;

pub use fallback::{FallbackCombiner, FallbackPolicy};
pub use first_success::{FirstSuccessCombiner, FirstSuccessPolicy};

use std::sync::Arc;

use contracts::CombinerKind;

use crate::outcome::Outcome;

/// How a dispatch ended, from the combiner's point of view
#[derive(Debug)]
pub enum Resolution {
    /// The winning outcome (always a successful response)
    Success(Outcome),
    /// Every candidate failed; `(route, reason)` in rank order
    Exhausted { failures: Vec<(String, String)> },
}

/// Per-dispatch combination state
///
/// Owned exclusively by the task supervising one dispatch.
pub trait Combiner: Send {
    /// Feed the outcome of candidate `rank`
    ///
    /// Returns the resolution the first time the dispatch resolves. Outcomes
    /// for unknown or already-filled ranks, and anything arriving after
    /// resolution, are ignored.
    fn accept(&mut self, rank: usize, outcome: Outcome) -> Option<Resolution>;

    /// Whether a resolution has been produced
    fn is_resolved(&self) -> bool;
}

/// Factory for per-dispatch combiners
pub trait CombinePolicy: Send + Sync {
    /// Combiner for a dispatch with `candidates` ranked candidates
    fn combiner(&self, candidates: usize) -> Box<dyn Combiner>;

    /// Policy name for logging
    fn name(&self) -> &'static str;
}

/// Build the policy selected in configuration
pub fn build_policy(kind: CombinerKind) -> Arc<dyn CombinePolicy> {
    match kind {
        CombinerKind::Fallback => Arc::new(FallbackPolicy),
        CombinerKind::FirstSuccess => Arc::new(FirstSuccessPolicy),
    }
}
