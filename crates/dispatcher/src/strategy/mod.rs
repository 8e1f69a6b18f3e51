//! Routing Strategies
//!
//! A strategy ranks the configured routes for one request; the dispatcher
//! turns that ranking into a candidate order.
//!
//! - `PriorityStrategy`: fixed order, independent of the request
//! - `RoundRobinStrategy`: rotates the base order on every request
//! - `RandomStrategy`: random permutation, optionally seeded
//! - `LeastLoadedStrategy`: fewest in-flight calls first

mod least_loaded;
mod priority;
mod random;
mod round_robin;

pub use least_loaded::LeastLoadedStrategy;
pub use priority::PriorityStrategy;
pub use random::RandomStrategy;
pub use round_robin::RoundRobinStrategy;

use std::sync::Arc;

use contracts::{Request, StrategyConfig, StrategyKind};
use thiserror::Error;

use crate::route::RouteTable;

/// Strategy failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{strategy}: {message}")]
pub struct StrategyError {
    pub strategy: &'static str,
    pub message: String,
}

impl StrategyError {
    pub fn new(strategy: &'static str, message: impl Into<String>) -> Self {
        Self {
            strategy,
            message: message.into(),
        }
    }
}

/// Trait for candidate ordering strategies
///
/// Shared read-only across concurrent dispatches; any internal state must be
/// synchronised.
pub trait RoutingStrategy: Send + Sync {
    /// Rank routes for `request`, highest priority first
    ///
    /// May return a subset of the table. Unknown or repeated names are
    /// rejected by the dispatcher.
    fn select(&self, request: &dyn Request, routes: &RouteTable)
        -> Result<Vec<String>, StrategyError>;

    /// Strategy name for logging
    fn name(&self) -> &'static str;
}

/// Build the strategy described by configuration
pub fn build_strategy(config: &StrategyConfig) -> Arc<dyn RoutingStrategy> {
    let order = config.order.clone();
    match config.kind {
        StrategyKind::Priority => Arc::new(PriorityStrategy::new(order)),
        StrategyKind::RoundRobin => Arc::new(RoundRobinStrategy::new(order)),
        StrategyKind::Random => Arc::new(match config.seed {
            Some(seed) => RandomStrategy::seeded(order, seed),
            None => RandomStrategy::new(order),
        }),
        StrategyKind::LeastLoaded => Arc::new(LeastLoadedStrategy::new(order)),
    }
}

/// Explicit order, or configuration order when none was given
fn base_order(explicit: &[String], routes: &RouteTable) -> Vec<String> {
    if explicit.is_empty() {
        routes.names()
    } else {
        explicit.to_vec()
    }
}
