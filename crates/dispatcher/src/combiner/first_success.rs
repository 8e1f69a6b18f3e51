//! First-success combiner

use super::{CombinePolicy, Combiner, Resolution};
use crate::outcome::Outcome;

/// Policy producing [`FirstSuccessCombiner`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstSuccessPolicy;

impl CombinePolicy for FirstSuccessPolicy {
    fn combiner(&self, candidates: usize) -> Box<dyn Combiner> {
        Box::new(FirstSuccessCombiner::new(candidates))
    }

    fn name(&self) -> &'static str {
        "first_success"
    }
}

/// First successful outcome wins, regardless of rank
#[derive(Debug)]
pub struct FirstSuccessCombiner {
    seen: Vec<bool>,
    failures: Vec<Option<(String, String)>>,
    remaining: usize,
    resolved: bool,
}

impl FirstSuccessCombiner {
    pub fn new(candidates: usize) -> Self {
        Self {
            seen: vec![false; candidates],
            failures: vec![None; candidates],
            remaining: candidates,
            resolved: false,
        }
    }
}

impl Combiner for FirstSuccessCombiner {
    fn accept(&mut self, rank: usize, outcome: Outcome) -> Option<Resolution> {
        if self.resolved || rank >= self.seen.len() || self.seen[rank] {
            return None;
        }
        self.seen[rank] = true;
        self.remaining -= 1;

        if outcome.is_success() {
            self.resolved = true;
            return Some(Resolution::Success(outcome));
        }

        self.failures[rank] = Some((outcome.route.clone(), outcome.reason()));
        if self.remaining == 0 {
            self.resolved = true;
            return Some(Resolution::Exhausted {
                failures: self.failures.iter_mut().filter_map(Option::take).collect(),
            });
        }
        None
    }

    fn is_resolved(&self) -> bool {
        self.resolved
    }
}
