//! Dispatcher - eager fan-out with ranked fallback

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use contracts::{CallError, Caller, DispatchMode, Protocol, Request, RouteConfig, RouterBlueprint};
use futures::FutureExt;
use observability::DispatchStatus;
use protocols::{HttpCaller, RpcCaller};
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::combiner::{build_policy, CombinePolicy, FallbackPolicy, Resolution};
use crate::context::DispatchContext;
use crate::error::{DispatchError, DispatcherError};
use crate::metrics::RouteMetricsSnapshot;
use crate::outcome::{Outcome, OutcomeKind};
use crate::result::{DispatchOutput, DispatchResult};
use crate::route::{Route, RouteTable};
use crate::strategy::{build_strategy, PriorityStrategy, RoutingStrategy};

/// Lifecycle of one dispatch
///
/// Terminal states accept no further outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Created, candidates not yet launched
    Pending,
    /// Candidates running, waiting for the combiner
    Resolving,
    ResolvedSuccess,
    ResolvedUnavailable,
    ResolvedCancelled,
    /// Strategy failure or invalid candidate order
    Failed,
}

impl DispatchState {
    fn terminal(output: &DispatchOutput) -> Self {
        match output {
            Ok(_) => Self::ResolvedSuccess,
            Err(DispatchError::ServiceUnavailable { .. }) => Self::ResolvedUnavailable,
            Err(DispatchError::Cancelled { .. }) => Self::ResolvedCancelled,
            Err(_) => Self::Failed,
        }
    }

    fn status(self) -> DispatchStatus {
        match self {
            Self::ResolvedSuccess => DispatchStatus::Success,
            Self::ResolvedUnavailable => DispatchStatus::Unavailable,
            Self::ResolvedCancelled => DispatchStatus::Cancelled,
            _ => DispatchStatus::Error,
        }
    }
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    id: String,
    routes: Vec<Route>,
    strategy: Option<Arc<dyn RoutingStrategy>>,
    policy: Option<Arc<dyn CombinePolicy>>,
    mode: DispatchMode,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self {
            id: "router".to_string(),
            routes: Vec::new(),
            strategy: None,
            policy: None,
            mode: DispatchMode::Eager,
        }
    }
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier used in logs
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Add a route (configuration order = insertion order)
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Add a route built from its parts
    pub fn caller(
        self,
        name: impl Into<String>,
        caller: Arc<dyn Caller>,
        timeout: std::time::Duration,
    ) -> Self {
        self.route(Route::new(name, caller, timeout))
    }

    /// Candidate ordering strategy (default: configuration order)
    pub fn strategy(mut self, strategy: impl RoutingStrategy + 'static) -> Self {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    pub fn shared_strategy(mut self, strategy: Arc<dyn RoutingStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Outcome combination policy (default: fallback)
    pub fn policy(mut self, policy: impl CombinePolicy + 'static) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn shared_policy(mut self, policy: Arc<dyn CombinePolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Build the dispatcher
    ///
    /// # Errors
    /// Empty or duplicate route names.
    #[instrument(name = "dispatcher_builder_build", skip(self), fields(id = %self.id, routes = self.routes.len()))]
    pub fn build(self) -> Result<Dispatcher, DispatcherError> {
        let routes = RouteTable::new(self.routes)?;
        let strategy = self
            .strategy
            .unwrap_or_else(|| Arc::new(PriorityStrategy::configuration_order()));
        let policy = self.policy.unwrap_or_else(|| Arc::new(FallbackPolicy));

        info!(
            id = %self.id,
            routes = ?routes.names(),
            strategy = strategy.name(),
            policy = policy.name(),
            mode = ?self.mode,
            "Dispatcher built"
        );

        Ok(Dispatcher {
            id: Arc::from(self.id),
            routes: Arc::new(routes),
            strategy,
            policy,
            mode: self.mode,
        })
    }
}

/// Create the protocol adapter for a configured route
#[instrument(
    name = "dispatcher_create_caller",
    skip(config),
    fields(route = %config.name, protocol = %config.protocol)
)]
fn create_caller(config: &RouteConfig) -> Result<Arc<dyn Caller>, DispatcherError> {
    match config.protocol {
        Protocol::Http => {
            let caller = HttpCaller::from_params(&config.endpoint, &config.params)
                .map_err(|e| DispatcherError::caller_creation(&config.name, e.to_string()))?;
            Ok(Arc::new(caller))
        }
        Protocol::Rpc => Ok(Arc::new(RpcCaller::new(&config.endpoint))),
    }
}

/// Dispatches requests to a fixed set of routes
///
/// Cheap to clone; clones share the route table and strategy.
#[derive(Clone)]
pub struct Dispatcher {
    id: Arc<str>,
    routes: Arc<RouteTable>,
    strategy: Arc<dyn RoutingStrategy>,
    policy: Arc<dyn CombinePolicy>,
    mode: DispatchMode,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("id", &self.id)
            .field("routes", &self.routes.names())
            .field("strategy", &self.strategy.name())
            .field("policy", &self.policy.name())
            .field("mode", &self.mode)
            .finish()
    }
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Same routes, different strategy
    pub fn with_strategy(&self, strategy: impl RoutingStrategy + 'static) -> Self {
        Self {
            strategy: Arc::new(strategy),
            ..self.clone()
        }
    }

    /// Same routes, different combination policy
    pub fn with_policy(&self, policy: impl CombinePolicy + 'static) -> Self {
        Self {
            policy: Arc::new(policy),
            ..self.clone()
        }
    }

    /// Get metrics for all routes
    pub fn metrics(&self) -> Vec<(String, RouteMetricsSnapshot)> {
        self.routes
            .iter()
            .map(|r| (r.name().to_string(), r.metrics().snapshot()))
            .collect()
    }

    /// Start dispatching `request`
    ///
    /// Returns immediately; the work runs on a spawned task, so this must be
    /// called from within a Tokio runtime. Cancelling `ctx`, or dropping the
    /// returned handle, cancels every candidate still running.
    pub fn dispatch(&self, ctx: &DispatchContext, request: Arc<dyn Request>) -> DispatchResult {
        let protocol = request.protocol();
        let (tx, rx) = oneshot::channel();

        let supervisor = Supervisor {
            id: Arc::clone(&self.id),
            routes: Arc::clone(&self.routes),
            strategy: Arc::clone(&self.strategy),
            policy: Arc::clone(&self.policy),
            mode: self.mode,
            ctx: ctx.clone(),
            request,
        };
        tokio::spawn(supervisor.run(tx));

        DispatchResult::new(protocol, rx)
    }
}

/// Per-dispatch state, owned by one spawned task
struct Supervisor {
    id: Arc<str>,
    routes: Arc<RouteTable>,
    strategy: Arc<dyn RoutingStrategy>,
    policy: Arc<dyn CombinePolicy>,
    mode: DispatchMode,
    ctx: DispatchContext,
    request: Arc<dyn Request>,
}

impl Supervisor {
    fn protocol(&self) -> Protocol {
        self.request.protocol()
    }

    #[instrument(
        name = "dispatch",
        skip(self, tx),
        fields(dispatcher = %self.id, protocol = %self.request.protocol())
    )]
    async fn run(self, mut tx: oneshot::Sender<DispatchOutput>) {
        let started = Instant::now();
        debug!(state = ?DispatchState::Pending, "Dispatch started");

        let output = self.resolve(&mut tx).await;

        let state = DispatchState::terminal(&output);
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        observability::record_dispatch(self.protocol(), state.status(), latency_ms);

        match &output {
            Ok(response) => info!(
                state = ?state,
                backend = %response.backend_name(),
                status = response.status_code(),
                latency_ms,
                "Dispatch resolved"
            ),
            Err(e) if e.is_unavailable() => warn!(state = ?state, latency_ms, "{e}"),
            Err(e) => info!(state = ?state, latency_ms, "{e}"),
        }

        if tx.send(output).is_err() {
            debug!("Dispatch result handle dropped before delivery");
        }
    }

    /// Candidate order for this request, resolved against the route table
    fn candidates(&self) -> Result<Vec<Arc<Route>>, DispatchError> {
        let order = self
            .strategy
            .select(self.request.as_ref(), &self.routes)
            .map_err(|e| DispatchError::strategy(self.protocol(), e.to_string()))?;

        debug!(strategy = self.strategy.name(), order = ?order, "Candidate order selected");

        self.routes
            .resolve(&order)
            .map_err(|message| DispatchError::invalid_candidates(self.protocol(), message))
    }

    async fn resolve(&self, tx: &mut oneshot::Sender<DispatchOutput>) -> DispatchOutput {
        let protocol = self.protocol();
        let candidates = self.candidates()?;
        if candidates.is_empty() {
            return Err(DispatchError::unavailable(protocol));
        }
        if self.ctx.is_cancelled() {
            return Err(DispatchError::cancelled(protocol));
        }

        let scope = self.ctx.child();
        let mut tasks = JoinSet::new();
        let mut combiner = self.policy.combiner(candidates.len());

        let initial = match self.mode {
            DispatchMode::Eager => candidates.len(),
            DispatchMode::Lazy => 1,
        };
        for rank in 0..initial {
            self.launch(&mut tasks, &scope, rank, &candidates[rank]);
        }
        let mut next = initial;

        debug!(state = ?DispatchState::Resolving, candidates = candidates.len(), "Candidates launched");

        let output = loop {
            tokio::select! {
                biased;
                _ = self.ctx.cancelled() => break Err(DispatchError::cancelled(protocol)),
                _ = tx.closed() => break Err(DispatchError::cancelled(protocol)),
                joined = tasks.join_next() => {
                    let (rank, outcome) = match joined {
                        Some(Ok(ranked)) => ranked,
                        Some(Err(e)) => {
                            warn!(error = %e, "Candidate task ended without an outcome");
                            continue;
                        }
                        None => break Err(DispatchError::unavailable(protocol)),
                    };

                    debug!(rank, route = %outcome.route, outcome = %outcome.kind, "Outcome received");

                    if let Some(resolution) = combiner.accept(rank, outcome) {
                        break self.finish(resolution);
                    }

                    if self.mode == DispatchMode::Lazy && next < candidates.len() {
                        self.launch(&mut tasks, &scope, next, &candidates[next]);
                        next += 1;
                    }
                }
            }
        };

        // Losing routes observe the scope and record their own cancellation.
        scope.cancel();
        while tasks.join_next().await.is_some() {}
        output
    }

    fn launch(
        &self,
        tasks: &mut JoinSet<(usize, Outcome)>,
        scope: &DispatchContext,
        rank: usize,
        route: &Arc<Route>,
    ) {
        let route = Arc::clone(route);
        let scope = scope.clone();
        let request = Arc::clone(&self.request);

        tasks.spawn(async move {
            let outcome = AssertUnwindSafe(route.invoke(&scope, request.as_ref()))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Outcome::new(
                        route.name(),
                        OutcomeKind::Failed(CallError::protocol("caller panicked")),
                    )
                });
            (rank, outcome)
        });
    }

    fn finish(&self, resolution: Resolution) -> DispatchOutput {
        match resolution {
            Resolution::Success(outcome) => {
                let route = outcome.route.clone();
                outcome.into_response().ok_or_else(|| {
                    DispatchError::invalid_candidates(
                        self.protocol(),
                        format!("route '{route}' resolved without a response"),
                    )
                })
            }
            Resolution::Exhausted { failures } => {
                for (route, reason) in &failures {
                    debug!(route = %route, reason = %reason, "Candidate failed");
                }
                Err(DispatchError::unavailable(self.protocol()))
            }
        }
    }
}

/// Convenience function to create a dispatcher from configuration
///
/// Builds an HTTP or RPC caller per route, the configured strategy and
/// combination policy, and the dispatch mode.
#[instrument(name = "dispatcher_create", skip(blueprint), fields(id = %blueprint.router.id))]
pub fn create_dispatcher(blueprint: &RouterBlueprint) -> Result<Dispatcher, DispatcherError> {
    let mut builder = Dispatcher::builder()
        .id(&blueprint.router.id)
        .mode(blueprint.router.mode)
        .shared_strategy(build_strategy(&blueprint.router.strategy))
        .shared_policy(build_policy(blueprint.router.combiner));

    for config in &blueprint.routes {
        builder = builder.caller(&config.name, create_caller(config)?, config.timeout());
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use contracts::{CombinerKind, RouterConfig, StrategyConfig, StrategyKind};
    use futures::StreamExt;
    use protocols::{MockCaller, MockStats, RpcCode, RpcRequest};

    use crate::combiner::FirstSuccessPolicy;
    use crate::strategy::StrategyError;

    const TIMEOUT: Duration = Duration::from_millis(200);
    const SLOW: Duration = Duration::from_secs(2);

    fn request(protocol: Protocol) -> Arc<dyn Request> {
        match protocol {
            Protocol::Http => Arc::new(protocols::HttpRequest::post("input")),
            Protocol::Rpc => Arc::new(RpcRequest::new("input")),
        }
    }

    /// Three routes: R1 and R2 answer after the given delays, R3 hangs
    fn scenario_dispatcher(
        protocol: Protocol,
        r1_delay: Duration,
        r2_delay: Duration,
    ) -> (Dispatcher, [Arc<MockStats>; 3]) {
        let r1 = MockCaller::new(protocol).with_delay(r1_delay).with_payload("R1");
        let r2 = MockCaller::new(protocol).with_delay(r2_delay).with_payload("R2");
        let r3 = MockCaller::new(protocol).with_delay(SLOW).with_payload("R3");
        let stats = [r1.stats(), r2.stats(), r3.stats()];

        let dispatcher = Dispatcher::builder()
            .caller("R1", Arc::new(r1), TIMEOUT)
            .caller("R2", Arc::new(r2), TIMEOUT)
            .caller("R3", Arc::new(r3), TIMEOUT)
            .build()
            .unwrap();
        (dispatcher, stats)
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_a_all_succeed_first_wins() {
        for protocol in [Protocol::Http, Protocol::Rpc] {
            let (dispatcher, _) = scenario_dispatcher(protocol, Duration::ZERO, Duration::ZERO);
            let dispatcher = dispatcher.with_strategy(PriorityStrategy::new(["R1", "R2", "R3"]));

            let response = dispatcher
                .dispatch(&DispatchContext::new(), request(protocol))
                .recv()
                .await
                .unwrap();
            assert_eq!(response.backend_name(), "R1");
            assert_eq!(response.payload().as_ref(), b"R1");
            assert_eq!(response.protocol(), protocol);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_b_higher_rank_beats_faster_lower_rank() {
        for protocol in [Protocol::Http, Protocol::Rpc] {
            // R2 replies long before R1
            let (dispatcher, _) =
                scenario_dispatcher(protocol, Duration::from_millis(100), Duration::from_millis(5));
            let dispatcher = dispatcher.with_strategy(PriorityStrategy::new(["R3", "R1", "R2"]));

            let started = Instant::now();
            let response = dispatcher
                .dispatch(&DispatchContext::new(), request(protocol))
                .recv()
                .await
                .unwrap();
            assert_eq!(response.backend_name(), "R1");
            assert!(started.elapsed() >= TIMEOUT);
            assert!(started.elapsed() < SLOW);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_c_only_candidate_times_out() {
        for protocol in [Protocol::Http, Protocol::Rpc] {
            let (dispatcher, stats) =
                scenario_dispatcher(protocol, Duration::ZERO, Duration::ZERO);
            let dispatcher = dispatcher.with_strategy(PriorityStrategy::new(["R3"]));

            let err = dispatcher
                .dispatch(&DispatchContext::new(), request(protocol))
                .recv()
                .await
                .unwrap_err();
            assert_eq!(err, DispatchError::unavailable(protocol));
            assert_eq!(err.status_code(), protocol.unavailable_code());
            assert_eq!(stats[0].started(), 0);
            assert_eq!(stats[1].started(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_d_fallback_after_timeout() {
        for protocol in [Protocol::Http, Protocol::Rpc] {
            let (dispatcher, _) = scenario_dispatcher(protocol, Duration::ZERO, Duration::ZERO);
            let dispatcher = dispatcher.with_strategy(PriorityStrategy::new(["R3", "R2", "R1"]));

            let started = Instant::now();
            let response = dispatcher
                .dispatch(&DispatchContext::new(), request(protocol))
                .recv()
                .await
                .unwrap();
            assert_eq!(response.backend_name(), "R2");
            // bounded by R3's budget, not by R3's real latency
            assert!(started.elapsed() >= TIMEOUT);
            assert!(started.elapsed() < SLOW);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_success_response_falls_through() {
        let failing = MockCaller::new(Protocol::Rpc).with_status(RpcCode::Internal.as_i32());
        let healthy = MockCaller::new(Protocol::Rpc).with_payload("ok");
        let dispatcher = Dispatcher::builder()
            .caller("primary", Arc::new(failing), TIMEOUT)
            .caller("secondary", Arc::new(healthy), TIMEOUT)
            .build()
            .unwrap();

        let response = dispatcher
            .dispatch(&DispatchContext::new(), request(Protocol::Rpc))
            .recv()
            .await
            .unwrap();
        assert_eq!(response.backend_name(), "secondary");
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_fail_is_unavailable_with_request_protocol() {
        let dispatcher = Dispatcher::builder()
            .caller(
                "a",
                Arc::new(MockCaller::new(Protocol::Http).failing("refused")),
                TIMEOUT,
            )
            .caller(
                "b",
                Arc::new(MockCaller::new(Protocol::Http).with_status(503)),
                TIMEOUT,
            )
            .build()
            .unwrap();

        // RPC request sent through HTTP routes: the error follows the request
        let err = dispatcher
            .dispatch(&DispatchContext::new(), request(Protocol::Rpc))
            .recv()
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::unavailable(Protocol::Rpc));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_resolution_stops_candidates() {
        let (dispatcher, stats) = scenario_dispatcher(Protocol::Http, SLOW, SLOW);
        let ctx = DispatchContext::new();
        let result = dispatcher.dispatch(&ctx, request(Protocol::Http));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(stats.iter().all(|s| s.in_flight() == 1));

        ctx.cancel();
        let err = result.recv().await.unwrap_err();
        assert_eq!(err, DispatchError::cancelled(Protocol::Http));

        for s in &stats {
            assert_eq!(s.in_flight(), 0);
            assert_eq!(s.completed(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_context() {
        let (dispatcher, stats) = scenario_dispatcher(Protocol::Rpc, Duration::ZERO, Duration::ZERO);
        let ctx = DispatchContext::new();
        ctx.cancel();

        let err = dispatcher
            .dispatch(&ctx, request(Protocol::Rpc))
            .recv()
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(stats.iter().all(|s| s.started() == 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_result_cancels_dispatch() {
        let (dispatcher, stats) = scenario_dispatcher(Protocol::Http, SLOW, SLOW);
        let result = dispatcher.dispatch(&DispatchContext::new(), request(Protocol::Http));

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(result);
        tokio::time::sleep(Duration::from_millis(10)).await;

        for s in &stats {
            assert_eq!(s.in_flight(), 0);
            assert_eq!(s.completed(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolution_cancels_remaining_candidates() {
        let (dispatcher, stats) = scenario_dispatcher(Protocol::Http, Duration::ZERO, SLOW);

        let response = dispatcher
            .dispatch(&DispatchContext::new(), request(Protocol::Http))
            .recv()
            .await
            .unwrap();
        assert_eq!(response.backend_name(), "R1");

        // R2 and R3 were started eagerly and are gone now
        assert_eq!(stats[1].started(), 1);
        assert_eq!(stats[1].in_flight(), 0);
        assert_eq!(stats[2].in_flight(), 0);
        assert!(dispatcher.metrics().iter().all(|(_, m)| m.in_flight == 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_losing_candidates_record_cancellation() {
        let fast = MockCaller::new(Protocol::Http).with_payload("R1");
        let slow = MockCaller::new(Protocol::Http).with_delay(SLOW).with_payload("R2");
        let dispatcher = Dispatcher::builder()
            .caller("R1", Arc::new(fast), Duration::from_secs(5))
            .caller("R2", Arc::new(slow), Duration::from_secs(5))
            .build()
            .unwrap();

        let response = dispatcher
            .dispatch(&DispatchContext::new(), request(Protocol::Http))
            .recv()
            .await
            .unwrap();
        assert_eq!(response.backend_name(), "R1");

        let metrics = dispatcher.metrics();
        for (name, m) in &metrics {
            assert_eq!(m.in_flight, 0, "{name}");
            assert_eq!(
                m.invocations,
                m.successes + m.failures + m.timeouts + m.cancellations,
                "{name}"
            );
        }
        let (_, r2) = metrics.iter().find(|(name, _)| name == "R2").unwrap();
        assert_eq!(r2.invocations, 1);
        assert_eq!(r2.cancellations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_route_table_is_unavailable() {
        let empty = Dispatcher::builder().build().unwrap();
        assert!(empty.routes().is_empty());

        let err = empty
            .dispatch(&DispatchContext::new(), request(Protocol::Http))
            .recv()
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::unavailable(Protocol::Http));
    }

    struct FixedOrder(Vec<String>);

    impl RoutingStrategy for FixedOrder {
        fn select(&self, _: &dyn Request, _: &RouteTable) -> Result<Vec<String>, StrategyError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct Broken;

    impl RoutingStrategy for Broken {
        fn select(&self, _: &dyn Request, _: &RouteTable) -> Result<Vec<String>, StrategyError> {
            Err(StrategyError::new("broken", "no ranking"))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_strategy_returning_nothing_is_unavailable() {
        let (dispatcher, _) = scenario_dispatcher(Protocol::Rpc, Duration::ZERO, Duration::ZERO);
        let err = dispatcher
            .with_strategy(FixedOrder(Vec::new()))
            .dispatch(&DispatchContext::new(), request(Protocol::Rpc))
            .recv()
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::unavailable(Protocol::Rpc));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_candidates_and_strategy_errors() {
        let (dispatcher, _) = scenario_dispatcher(Protocol::Http, Duration::ZERO, Duration::ZERO);

        let err = dispatcher
            .with_strategy(FixedOrder(vec!["R1".into(), "R9".into()]))
            .dispatch(&DispatchContext::new(), request(Protocol::Http))
            .recv()
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidCandidates { .. }));

        let err = dispatcher
            .with_strategy(FixedOrder(vec!["R1".into(), "R1".into()]))
            .dispatch(&DispatchContext::new(), request(Protocol::Http))
            .recv()
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidCandidates { .. }));

        let err = dispatcher
            .with_strategy(Broken)
            .dispatch(&DispatchContext::new(), request(Protocol::Http))
            .recv()
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Strategy { .. }));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lazy_mode_probes_sequentially() {
        let first = MockCaller::new(Protocol::Http).failing("down");
        let second = MockCaller::new(Protocol::Http).with_delay(Duration::from_millis(5));
        let third = MockCaller::new(Protocol::Http);
        let third_stats = third.stats();

        let dispatcher = Dispatcher::builder()
            .mode(DispatchMode::Lazy)
            .caller("first", Arc::new(first), TIMEOUT)
            .caller("second", Arc::new(second), TIMEOUT)
            .caller("third", Arc::new(third), TIMEOUT)
            .build()
            .unwrap();

        let response = dispatcher
            .dispatch(&DispatchContext::new(), request(Protocol::Http))
            .recv()
            .await
            .unwrap();
        assert_eq!(response.backend_name(), "second");
        assert_eq!(third_stats.started(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_policy() {
        let (dispatcher, _) =
            scenario_dispatcher(Protocol::Http, Duration::from_millis(100), Duration::from_millis(5));
        let dispatcher = dispatcher.with_policy(FirstSuccessPolicy);

        let response = dispatcher
            .dispatch(&DispatchContext::new(), request(Protocol::Http))
            .recv()
            .await
            .unwrap();
        assert_eq!(response.backend_name(), "R2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_as_stream() {
        let (dispatcher, _) = scenario_dispatcher(Protocol::Rpc, Duration::ZERO, Duration::ZERO);
        let mut result = dispatcher.dispatch(&DispatchContext::new(), request(Protocol::Rpc));

        let first = result.next().await.unwrap().unwrap();
        assert_eq!(first.backend_name(), "R1");
        assert!(result.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounds_wait() {
        let (dispatcher, _) = scenario_dispatcher(Protocol::Http, SLOW, SLOW);
        let ctx = DispatchContext::with_timeout(Duration::from_millis(50));

        let started = Instant::now();
        let err = dispatcher
            .dispatch(&ctx, request(Protocol::Http))
            .recv()
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
        assert!(started.elapsed() < TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_dispatches_share_routes() {
        let (dispatcher, stats) = scenario_dispatcher(Protocol::Http, Duration::ZERO, Duration::ZERO);
        let results: Vec<_> = (0..8)
            .map(|_| dispatcher.dispatch(&DispatchContext::new(), request(Protocol::Http)))
            .collect();

        for result in results {
            assert_eq!(result.recv().await.unwrap().backend_name(), "R1");
        }
        assert_eq!(stats[0].completed(), 8);
    }

    #[tokio::test]
    async fn test_create_dispatcher_from_config() {
        let blueprint = RouterBlueprint {
            version: Default::default(),
            router: RouterConfig {
                id: "predictions".into(),
                protocol: Protocol::Http,
                mode: DispatchMode::Eager,
                combiner: CombinerKind::FirstSuccess,
                strategy: StrategyConfig {
                    kind: StrategyKind::RoundRobin,
                    order: vec![],
                    seed: None,
                },
            },
            routes: vec![
                RouteConfig {
                    name: "route1".into(),
                    protocol: Protocol::Http,
                    endpoint: "http://127.0.0.1:5000".into(),
                    timeout_ms: 300,
                    params: Default::default(),
                },
                RouteConfig {
                    name: "route2".into(),
                    protocol: Protocol::Rpc,
                    endpoint: "127.0.0.1:50556".into(),
                    timeout_ms: 300,
                    params: Default::default(),
                },
            ],
        };

        let dispatcher = create_dispatcher(&blueprint).unwrap();
        assert_eq!(dispatcher.id(), "predictions");
        assert_eq!(dispatcher.strategy_name(), "round_robin");
        assert_eq!(dispatcher.policy_name(), "first_success");
        assert_eq!(dispatcher.routes().names(), vec!["route1", "route2"]);
        assert_eq!(
            dispatcher.routes().get("route2").unwrap().protocol(),
            Protocol::Rpc
        );
        assert_eq!(
            dispatcher.routes().get("route1").unwrap().timeout(),
            Duration::from_millis(300)
        );
    }

    #[test]
    fn test_builder_rejects_duplicate_routes() {
        let err = Dispatcher::builder()
            .caller("a", Arc::new(MockCaller::new(Protocol::Http)), TIMEOUT)
            .caller("a", Arc::new(MockCaller::new(Protocol::Http)), TIMEOUT)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate route name 'a'"));
    }
}
