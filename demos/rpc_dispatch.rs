//! RPC Dispatch Example
//!
//! Starts three local RPC servers, builds a dispatcher from an inline TOML
//! configuration (or the file given as first argument) and sends a few
//! requests with the round-robin strategy.
//!
//! Run with: cargo run -p switchyard_demos --bin rpc_dispatch

use std::sync::Arc;
use std::time::Duration;

use config_loader::{ConfigFormat, ConfigLoader};
use contracts::{Request, Response};
use dispatcher::{create_dispatcher, DispatchContext};
use protocols::{RpcCode, RpcRequest, RpcResponse, RpcServer};

async fn start_backend(
    name: &'static str,
    delay: Duration,
    healthy: bool,
) -> Result<RpcServer, Box<dyn std::error::Error>> {
    let server = RpcServer::bind("127.0.0.1:0", move |request: RpcRequest| async move {
        tokio::time::sleep(delay).await;
        if healthy {
            let payload = String::from_utf8_lossy(request.payload()).to_uppercase();
            RpcResponse::ok(format!("{name} says {payload}"))
        } else {
            RpcResponse::error(RpcCode::Unavailable, "warming up")
        }
    })
    .await?;
    Ok(server)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::init()?;

    let alpha = start_backend("alpha", Duration::from_millis(20), true).await?;
    let beta = start_backend("beta", Duration::from_millis(5), false).await?;
    let gamma = start_backend("gamma", Duration::from_millis(40), true).await?;

    let blueprint = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!(path = %path, "Loading router config");
            ConfigLoader::load_from_path(std::path::Path::new(&path))?
        }
        None => {
            let toml = format!(
                r#"
[router]
id = "rpc-demo"
protocol = "rpc"

[router.strategy]
kind = "round_robin"

[[routes]]
name = "alpha"
protocol = "rpc"
endpoint = "{}"
timeout_ms = 500

[[routes]]
name = "beta"
protocol = "rpc"
endpoint = "{}"
timeout_ms = 500

[[routes]]
name = "gamma"
protocol = "rpc"
endpoint = "{}"
timeout_ms = 500
"#,
                alpha.local_addr(),
                beta.local_addr(),
                gamma.local_addr()
            );
            ConfigLoader::load_from_str(&toml, ConfigFormat::Toml)?
        }
    };

    let dispatcher = create_dispatcher(&blueprint)?;

    for i in 0..3 {
        let request: Arc<dyn Request> =
            Arc::new(RpcRequest::new(format!("ping {i}")).with_metadata("x-demo", "rpc"));
        match dispatcher
            .dispatch(&DispatchContext::new(), request)
            .recv()
            .await
        {
            Ok(response) => println!(
                "#{i} {} -> {}",
                response.backend_name(),
                String::from_utf8_lossy(response.payload())
            ),
            Err(e) => println!("#{i} failed: {e}"),
        }
    }

    for (route, metrics) in dispatcher.metrics() {
        println!("{route}: {metrics:?}");
    }

    alpha.shutdown().await;
    beta.shutdown().await;
    gamma.shutdown().await;
    Ok(())
}
