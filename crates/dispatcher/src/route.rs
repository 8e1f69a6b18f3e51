//! Route and RouteTable

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use contracts::{Caller, Protocol, Request};
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::context::DispatchContext;
use crate::error::DispatcherError;
use crate::metrics::RouteMetrics;
use crate::outcome::{Outcome, OutcomeKind};

/// A named backend reachable through one protocol adapter
pub struct Route {
    name: String,
    caller: Arc<dyn Caller>,
    timeout: Duration,
    metrics: Arc<RouteMetrics>,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("protocol", &self.caller.protocol())
            .field("endpoint", &self.caller.endpoint())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Route {
    pub fn new(name: impl Into<String>, caller: Arc<dyn Caller>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            caller,
            timeout,
            metrics: Arc::new(RouteMetrics::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Protocol of the adapter behind this route
    pub fn protocol(&self) -> Protocol {
        self.caller.protocol()
    }

    pub fn endpoint(&self) -> &str {
        self.caller.endpoint()
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn metrics(&self) -> &Arc<RouteMetrics> {
        &self.metrics
    }

    /// Budget for a call under `ctx`: the route timeout capped by the deadline
    pub fn budget(&self, ctx: &DispatchContext) -> Duration {
        match ctx.remaining() {
            Some(remaining) => remaining.min(self.timeout),
            None => self.timeout,
        }
    }

    /// Issue one call and report how it ended
    ///
    /// Never retries. Cancellation of `ctx` ends the call without waiting for
    /// the backend. A response is tagged with this route's name.
    #[instrument(
        name = "route_invoke",
        skip(self, ctx, request),
        fields(route = %self.name, endpoint = %self.caller.endpoint())
    )]
    pub async fn invoke(&self, ctx: &DispatchContext, request: &dyn Request) -> Outcome {
        let started = Instant::now();
        let guard = self.metrics.enter();
        observability::record_route_in_flight(&self.name, self.metrics.in_flight());

        let budget = self.budget(ctx);
        let kind = tokio::select! {
            biased;
            _ = ctx.cancelled() => OutcomeKind::Cancelled,
            result = tokio::time::timeout(budget, self.caller.call(request)) => match result {
                Ok(Ok(mut response)) => {
                    response.set_backend_name(&self.name);
                    OutcomeKind::Response(response)
                }
                Ok(Err(e)) => OutcomeKind::Failed(e),
                Err(_) => OutcomeKind::Timeout { after: budget },
            },
        };

        drop(guard);
        let outcome = Outcome::new(self.name.clone(), kind);
        let latency = started.elapsed();
        self.record(&outcome, latency);
        outcome
    }

    fn record(&self, outcome: &Outcome, latency: Duration) {
        let kind = outcome.metric_kind();
        self.metrics.record(kind);

        let latency_ms = latency.as_secs_f64() * 1000.0;
        observability::record_route_outcome(&self.name, kind, latency_ms);
        observability::record_route_in_flight(&self.name, self.metrics.in_flight());

        debug!(
            route = %self.name,
            outcome = %outcome.kind,
            latency_ms,
            "Route call finished"
        );
    }
}

/// Ordered, immutable set of routes
///
/// Configuration order is preserved; names are unique.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
    index: HashMap<String, usize>,
}

impl RouteTable {
    /// Build the table, rejecting empty or duplicate names
    pub fn new(routes: Vec<Route>) -> Result<Self, DispatcherError> {
        let mut table = Self::default();
        for route in routes {
            if route.name.is_empty() {
                return Err(DispatcherError::EmptyRouteName);
            }
            if table.index.contains_key(&route.name) {
                return Err(DispatcherError::DuplicateRoute { name: route.name });
            }
            table.index.insert(route.name.clone(), table.routes.len());
            table.routes.push(Arc::new(route));
        }
        Ok(table)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Route>> {
        self.index.get(name).map(|&i| &self.routes[i])
    }

    /// Position in configuration order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Route names in configuration order
    pub fn names(&self) -> Vec<String> {
        self.routes.iter().map(|r| r.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolve a candidate order to routes
    ///
    /// # Errors
    /// Unknown or repeated names, described as a message.
    pub fn resolve(&self, order: &[String]) -> Result<Vec<Arc<Route>>, String> {
        let mut seen = vec![false; self.routes.len()];
        let mut resolved = Vec::with_capacity(order.len());

        for name in order {
            let idx = self
                .position(name)
                .ok_or_else(|| format!("unknown route '{name}'"))?;
            if seen[idx] {
                return Err(format!("route '{name}' listed more than once"));
            }
            seen[idx] = true;
            resolved.push(Arc::clone(&self.routes[idx]));
        }
        Ok(resolved)
    }
}
