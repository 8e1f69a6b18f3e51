//! Dispatch scenarios over real HTTP and RPC backends
//!
//! R1 and R2 answer quickly, R3 always exceeds its route timeout.

use std::time::{Duration, Instant};

use contracts::{Protocol, Response};
use dispatcher::{create_dispatcher, DispatchContext, DispatchError, Dispatcher};

use crate::support::{blueprint, closed_endpoint, request, Backend, SLOW, TIMEOUT_MS};

const TIMEOUT: Duration = Duration::from_millis(TIMEOUT_MS);

struct Fixture {
    r1: Backend,
    r2: Backend,
    r3: Backend,
}

impl Fixture {
    async fn new(protocol: Protocol, r1_delay: Duration, r2_delay: Duration) -> Self {
        Self {
            r1: Backend::spawn(protocol, "R1", r1_delay, true).await,
            r2: Backend::spawn(protocol, "R2", r2_delay, true).await,
            r3: Backend::spawn(protocol, "R3", SLOW, true).await,
        }
    }

    fn dispatcher(&self, protocol: Protocol, order: &[&str]) -> Dispatcher {
        create_dispatcher(&blueprint(protocol, order, &[&self.r1, &self.r2, &self.r3])).unwrap()
    }
}

async fn scenario_a(protocol: Protocol) {
    let fixture = Fixture::new(protocol, Duration::ZERO, Duration::ZERO).await;
    let dispatcher = fixture.dispatcher(protocol, &["R1", "R2", "R3"]);

    let response = dispatcher
        .dispatch(&DispatchContext::new(), request(protocol, "input"))
        .recv()
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.protocol(), protocol);
    assert_eq!(response.backend_name(), "R1");
    assert_eq!(response.payload().as_ref(), b"R1:input");
}

async fn scenario_b(protocol: Protocol) {
    // R2 answers first but R1 outranks it
    let fixture = Fixture::new(protocol, Duration::from_millis(50), Duration::ZERO).await;
    let dispatcher = fixture.dispatcher(protocol, &["R3", "R1", "R2"]);

    let started = Instant::now();
    let response = dispatcher
        .dispatch(&DispatchContext::new(), request(protocol, "input"))
        .recv()
        .await
        .unwrap();

    assert_eq!(response.backend_name(), "R1");
    assert_eq!(response.payload().as_ref(), b"R1:input");
    assert!(started.elapsed() >= TIMEOUT);
    assert!(started.elapsed() < SLOW);
    assert_eq!(fixture.r2.hits(), 1);
}

async fn scenario_c(protocol: Protocol) {
    let fixture = Fixture::new(protocol, Duration::ZERO, Duration::ZERO).await;
    let dispatcher = fixture.dispatcher(protocol, &["R3"]);

    let started = Instant::now();
    let err = dispatcher
        .dispatch(&DispatchContext::new(), request(protocol, "input"))
        .recv()
        .await
        .unwrap_err();

    assert_eq!(err, DispatchError::unavailable(protocol));
    assert!(started.elapsed() >= TIMEOUT);
    assert!(started.elapsed() < SLOW);
    assert_eq!(fixture.r1.hits(), 0);
    assert_eq!(fixture.r2.hits(), 0);
}

async fn scenario_d(protocol: Protocol) {
    let fixture = Fixture::new(protocol, Duration::ZERO, Duration::ZERO).await;
    let dispatcher = fixture.dispatcher(protocol, &["R3", "R2", "R1"]);

    let started = Instant::now();
    let response = dispatcher
        .dispatch(&DispatchContext::new(), request(protocol, "input"))
        .recv()
        .await
        .unwrap();

    assert_eq!(response.backend_name(), "R2");
    assert!(started.elapsed() >= TIMEOUT);
    assert!(started.elapsed() < SLOW);
}

#[tokio::test]
async fn scenario_a_http() {
    scenario_a(Protocol::Http).await;
}

#[tokio::test]
async fn scenario_a_rpc() {
    scenario_a(Protocol::Rpc).await;
}

#[tokio::test]
async fn scenario_b_http() {
    scenario_b(Protocol::Http).await;
}

#[tokio::test]
async fn scenario_b_rpc() {
    scenario_b(Protocol::Rpc).await;
}

#[tokio::test]
async fn scenario_c_http() {
    scenario_c(Protocol::Http).await;
}

#[tokio::test]
async fn scenario_c_rpc() {
    scenario_c(Protocol::Rpc).await;
}

#[tokio::test]
async fn scenario_d_http() {
    scenario_d(Protocol::Http).await;
}

#[tokio::test]
async fn scenario_d_rpc() {
    scenario_d(Protocol::Rpc).await;
}

#[tokio::test]
async fn test_non_success_status_falls_back() {
    for protocol in [Protocol::Http, Protocol::Rpc] {
        let broken = Backend::spawn(protocol, "broken", Duration::ZERO, false).await;
        let healthy = Backend::spawn(protocol, "healthy", Duration::ZERO, true).await;
        let dispatcher =
            create_dispatcher(&blueprint(protocol, &["broken", "healthy"], &[&broken, &healthy]))
                .unwrap();

        let response = dispatcher
            .dispatch(&DispatchContext::new(), request(protocol, "x"))
            .recv()
            .await
            .unwrap();
        assert_eq!(response.backend_name(), "healthy");
        assert_eq!(broken.hits(), 1);
    }
}

#[tokio::test]
async fn test_unreachable_route_falls_back() {
    let mut dead = Backend::rpc("dead", Duration::ZERO, true).await;
    dead.endpoint = closed_endpoint().await;
    let healthy = Backend::rpc("healthy", Duration::ZERO, true).await;

    let dispatcher =
        create_dispatcher(&blueprint(Protocol::Rpc, &["dead", "healthy"], &[&dead, &healthy]))
            .unwrap();

    let response = dispatcher
        .dispatch(&DispatchContext::new(), request(Protocol::Rpc, "x"))
        .recv()
        .await
        .unwrap();
    assert_eq!(response.backend_name(), "healthy");
}

#[tokio::test]
async fn test_mixed_protocol_routes() {
    // an HTTP request served by whichever backend answers, RPC ranked first
    let slow_rpc = Backend::rpc("rpc", SLOW, true).await;
    let http = Backend::http("http", Duration::ZERO, true).await;

    let dispatcher =
        create_dispatcher(&blueprint(Protocol::Http, &["rpc", "http"], &[&slow_rpc, &http]))
            .unwrap();

    let response = dispatcher
        .dispatch(&DispatchContext::new(), request(Protocol::Http, "mixed"))
        .recv()
        .await
        .unwrap();
    assert_eq!(response.backend_name(), "http");
    assert_eq!(response.payload().as_ref(), b"http:mixed");
    assert_eq!(slow_rpc.hits(), 1);
}

#[tokio::test]
async fn test_cancellation_stops_dispatch() {
    for protocol in [Protocol::Http, Protocol::Rpc] {
        let fixture = Fixture::new(protocol, SLOW, SLOW).await;
        let dispatcher = fixture.dispatcher(protocol, &["R1", "R2", "R3"]);
        let ctx = DispatchContext::new();

        let started = Instant::now();
        let result = dispatcher.dispatch(&ctx, request(protocol, "x"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        ctx.cancel();

        let err = result.recv().await.unwrap_err();
        assert_eq!(err, DispatchError::cancelled(protocol));
        assert!(started.elapsed() < TIMEOUT);
        assert!(dispatcher.metrics().iter().all(|(_, m)| m.in_flight == 0));
    }
}

#[tokio::test]
async fn test_repeated_dispatches_reuse_routes() {
    let fixture = Fixture::new(Protocol::Rpc, Duration::ZERO, Duration::ZERO).await;
    let dispatcher = fixture.dispatcher(Protocol::Rpc, &["R1", "R2"]);

    for _ in 0..5 {
        let response = dispatcher
            .dispatch(&DispatchContext::new(), request(Protocol::Rpc, "again"))
            .recv()
            .await
            .unwrap();
        assert_eq!(response.backend_name(), "R1");
    }

    let metrics = dispatcher.metrics();
    let (_, r1) = metrics.iter().find(|(name, _)| name == "R1").unwrap();
    assert_eq!(r1.successes, 5);
    assert_eq!(fixture.r3.hits(), 0);
}
