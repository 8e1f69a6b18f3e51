//! Mock Dispatch Example
//!
//! Three mock backends: `slow` never answers within its timeout, `steady`
//! answers after 80ms, `fast` after 10ms. With the order [slow, steady, fast]
//! the dispatcher waits out `slow`, then returns `steady` even though `fast`
//! replied first. Runs without any network.
//!
//! Run with: cargo run -p switchyard_demos --bin mock_dispatch

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{Protocol, Response};
use dispatcher::{DispatchContext, Dispatcher, FirstSuccessPolicy, PriorityStrategy};
use observability::{DispatchSample, DispatchStatsAggregator, DispatchStatus};
use protocols::{HttpRequest, MockCaller};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::init()?;

    tracing::info!("Starting Mock Dispatch Demo");

    let timeout = Duration::from_millis(250);
    let dispatcher = Dispatcher::builder()
        .id("mock-demo")
        .caller(
            "fast",
            Arc::new(
                MockCaller::new(Protocol::Http)
                    .with_delay(Duration::from_millis(10))
                    .with_payload("fast answer"),
            ),
            timeout,
        )
        .caller(
            "steady",
            Arc::new(
                MockCaller::new(Protocol::Http)
                    .with_delay(Duration::from_millis(80))
                    .with_payload("steady answer"),
            ),
            timeout,
        )
        .caller(
            "slow",
            Arc::new(
                MockCaller::new(Protocol::Http)
                    .with_delay(Duration::from_secs(5))
                    .with_payload("slow answer"),
            ),
            timeout,
        )
        .strategy(PriorityStrategy::new(["slow", "steady", "fast"]))
        .build()?;

    let request: Arc<dyn contracts::Request> = Arc::new(HttpRequest::post("hello"));
    let mut stats = DispatchStatsAggregator::new();

    for (label, dispatcher) in [
        ("fallback", dispatcher.clone()),
        ("first_success", dispatcher.with_policy(FirstSuccessPolicy)),
    ] {
        let started = Instant::now();
        let output = dispatcher
            .dispatch(&DispatchContext::new(), Arc::clone(&request))
            .recv()
            .await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &output {
            Ok(response) => {
                tracing::info!(
                    policy = label,
                    backend = %response.backend_name(),
                    payload = %String::from_utf8_lossy(response.payload()),
                    latency_ms,
                    "Dispatch resolved"
                );
                stats.update(&DispatchSample {
                    status: DispatchStatus::Success,
                    backend: Some(response.backend_name()),
                    latency_ms,
                });
            }
            Err(e) => {
                tracing::warn!(policy = label, error = %e, "Dispatch failed");
                stats.update(&DispatchSample {
                    status: DispatchStatus::Unavailable,
                    backend: None,
                    latency_ms,
                });
            }
        }
    }

    // Cancelling mid-flight
    let ctx = DispatchContext::new();
    let pending = dispatcher.dispatch(&ctx, Arc::clone(&request));
    tokio::time::sleep(Duration::from_millis(20)).await;
    ctx.cancel();
    match pending.recv().await {
        Ok(response) => tracing::info!(backend = %response.backend_name(), "Resolved before cancel"),
        Err(e) => tracing::info!(error = %e, "Cancelled dispatch"),
    }

    println!("\n{}", stats.summary());
    for (route, metrics) in dispatcher.metrics() {
        println!("{route}: {metrics:?}");
    }

    Ok(())
}
