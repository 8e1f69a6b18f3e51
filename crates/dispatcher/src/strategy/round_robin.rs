//! Round-robin strategy

use std::sync::atomic::{AtomicUsize, Ordering};

use contracts::Request;

use super::{base_order, RoutingStrategy, StrategyError};
use crate::route::RouteTable;

/// Rotates the base order by one position per request
///
/// The counter is atomic, so concurrent dispatches each get a distinct rotation.
#[derive(Debug, Default)]
pub struct RoundRobinStrategy {
    order: Vec<String>,
    next: AtomicUsize,
}

impl RoundRobinStrategy {
    /// Base order to rotate (empty = configuration order)
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            order: order.into_iter().map(Into::into).collect(),
            next: AtomicUsize::new(0),
        }
    }
}

impl RoutingStrategy for RoundRobinStrategy {
    fn select(
        &self,
        _request: &dyn Request,
        routes: &RouteTable,
    ) -> Result<Vec<String>, StrategyError> {
        let mut order = base_order(&self.order, routes);
        if !order.is_empty() {
            let offset = self.next.fetch_add(1, Ordering::Relaxed) % order.len();
            order.rotate_left(offset);
        }
        Ok(order)
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
