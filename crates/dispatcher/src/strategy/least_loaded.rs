//! Least loaded strategy

use contracts::Request;
use tracing::trace;

use super::{base_order, RoutingStrategy, StrategyError};
use crate::route::RouteTable;

/// Routes with fewer in-flight calls rank first
///
/// Ties keep the base order (stable sort).
#[derive(Debug, Clone, Default)]
pub struct LeastLoadedStrategy {
    order: Vec<String>,
}

impl LeastLoadedStrategy {
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            order: order.into_iter().map(Into::into).collect(),
        }
    }
}

impl RoutingStrategy for LeastLoadedStrategy {
    fn select(
        &self,
        _request: &dyn Request,
        routes: &RouteTable,
    ) -> Result<Vec<String>, StrategyError> {
        let mut order = base_order(&self.order, routes);
        // Unknown names sort last; the dispatcher rejects them anyway
        order.sort_by_key(|name| {
            routes
                .get(name)
                .map(|r| r.metrics().in_flight())
                .unwrap_or(usize::MAX)
        });
        trace!(order = ?order, "Ranked by in-flight calls");
        Ok(order)
    }

    fn name(&self) -> &'static str {
        "least_loaded"
    }
}
