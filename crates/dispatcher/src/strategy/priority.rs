//! Fixed priority strategy

use contracts::Request;

use super::{base_order, RoutingStrategy, StrategyError};
use crate::route::RouteTable;

/// Same order for every request
///
/// Either an explicit list or the configuration order of the route table.
#[derive(Debug, Clone, Default)]
pub struct PriorityStrategy {
    order: Vec<String>,
}

impl PriorityStrategy {
    /// Explicit priority list (empty = configuration order)
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            order: order.into_iter().map(Into::into).collect(),
        }
    }

    /// Rank routes in configuration order
    pub fn configuration_order() -> Self {
        Self::default()
    }
}

impl RoutingStrategy for PriorityStrategy {
    fn select(
        &self,
        _request: &dyn Request,
        routes: &RouteTable,
    ) -> Result<Vec<String>, StrategyError> {
        Ok(base_order(&self.order, routes))
    }

    fn name(&self) -> &'static str {
        "priority"
    }
}
