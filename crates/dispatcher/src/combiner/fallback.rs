//! Fallback combiner
//!
//! Keeps one slot per rank and a cursor at the highest-priority rank that is
//! still undecided. The cursor only moves past a slot once it is filled with
//! a failure, so a lower-ranked success can never win while a higher rank is
//! pending.

use super::{CombinePolicy, Combiner, Resolution};
use crate::outcome::Outcome;

/// Policy producing [`FallbackCombiner`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPolicy;

impl CombinePolicy for FallbackPolicy {
    fn combiner(&self, candidates: usize) -> Box<dyn Combiner> {
        Box::new(FallbackCombiner::new(candidates))
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}

#[derive(Debug)]
enum Slot {
    Pending,
    Failed { route: String, reason: String },
    Succeeded(Outcome),
    /// Winning outcome already handed out
    Taken,
}

/// Highest-ranked success wins
#[derive(Debug)]
pub struct FallbackCombiner {
    slots: Vec<Slot>,
    cursor: usize,
    resolved: bool,
}

impl FallbackCombiner {
    pub fn new(candidates: usize) -> Self {
        Self {
            slots: (0..candidates).map(|_| Slot::Pending).collect(),
            cursor: 0,
            resolved: false,
        }
    }

    /// Rank the combiner is currently waiting on
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn advance(&mut self) -> Option<Resolution> {
        while self.cursor < self.slots.len() {
            match self.slots[self.cursor] {
                Slot::Pending => return None,
                Slot::Failed { .. } => self.cursor += 1,
                Slot::Succeeded(_) | Slot::Taken => {
                    self.resolved = true;
                    return match std::mem::replace(&mut self.slots[self.cursor], Slot::Taken) {
                        Slot::Succeeded(outcome) => Some(Resolution::Success(outcome)),
                        _ => None,
                    };
                }
            }
        }

        self.resolved = true;
        let failures = self
            .slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Failed { route, reason } => Some((route.clone(), reason.clone())),
                _ => None,
            })
            .collect();
        Some(Resolution::Exhausted { failures })
    }
}

impl Combiner for FallbackCombiner {
    fn accept(&mut self, rank: usize, outcome: Outcome) -> Option<Resolution> {
        if self.resolved {
            return None;
        }
        match self.slots.get(rank) {
            Some(Slot::Pending) => {}
            _ => return None,
        }

        self.slots[rank] = if outcome.is_success() {
            Slot::Succeeded(outcome)
        } else {
            Slot::Failed {
                reason: outcome.reason(),
                route: outcome.route,
            }
        };

        if rank == self.cursor {
            self.advance()
        } else {
            None
        }
    }

    fn is_resolved(&self) -> bool {
        self.resolved
    }
}
