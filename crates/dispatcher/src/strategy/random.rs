//! Random permutation strategy

use std::sync::Mutex;

use contracts::Request;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{base_order, RoutingStrategy, StrategyError};
use crate::route::RouteTable;

/// Shuffles the base order on every request
#[derive(Debug)]
pub struct RandomStrategy {
    order: Vec<String>,
    rng: Mutex<StdRng>,
}

impl RandomStrategy {
    /// Seeded from the OS
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_rng(order, StdRng::from_os_rng())
    }

    /// Deterministic sequence of permutations for a given seed
    pub fn seeded<I, S>(order: I, seed: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_rng(order, StdRng::seed_from_u64(seed))
    }

    fn with_rng<I, S>(order: I, rng: StdRng) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            order: order.into_iter().map(Into::into).collect(),
            rng: Mutex::new(rng),
        }
    }
}

impl RoutingStrategy for RandomStrategy {
    fn select(
        &self,
        _request: &dyn Request,
        routes: &RouteTable,
    ) -> Result<Vec<String>, StrategyError> {
        let mut order = base_order(&self.order, routes);
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| StrategyError::new(self.name(), "rng state poisoned"))?;
        order.shuffle(&mut *rng);
        Ok(order)
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
