//! Test backends: axum HTTP servers and RpcServers with scripted latency

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use bytes::Bytes;
use contracts::{Protocol, Request, RouterBlueprint};
use protocols::{HttpRequest, RpcCode, RpcRequest, RpcResponse, RpcServer};
use tokio::task::JoinHandle;

/// Latency long enough to always exceed a route timeout
pub const SLOW: Duration = Duration::from_secs(2);

/// Route timeout used by the scenarios
pub const TIMEOUT_MS: u64 = 300;

/// A running backend that answers `<name>:<payload>`
pub struct Backend {
    pub name: String,
    pub protocol: Protocol,
    pub endpoint: String,
    hits: Arc<AtomicUsize>,
    _server: Server,
}

enum Server {
    Http(JoinHandle<()>),
    Rpc(RpcServer),
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Server::Http(handle) = self {
            handle.abort();
        }
    }
}

impl Backend {
    /// Number of requests that reached the backend
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub async fn spawn(protocol: Protocol, name: &str, delay: Duration, healthy: bool) -> Self {
        match protocol {
            Protocol::Http => Self::http(name, delay, healthy).await,
            Protocol::Rpc => Self::rpc(name, delay, healthy).await,
        }
    }

    pub async fn http(name: &str, delay: Duration, healthy: bool) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let label = name.to_string();
        let counter = Arc::clone(&hits);

        let app = Router::new().fallback(move |body: Bytes| {
            let label = label.clone();
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                let status = if healthy {
                    StatusCode::OK
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (status, format!("{label}:{}", String::from_utf8_lossy(&body)))
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            name: name.to_string(),
            protocol: Protocol::Http,
            endpoint: format!("http://{addr}/predict"),
            hits,
            _server: Server::Http(handle),
        }
    }

    pub async fn rpc(name: &str, delay: Duration, healthy: bool) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let label = name.to_string();
        let counter = Arc::clone(&hits);

        let server = RpcServer::bind("127.0.0.1:0", move |request: RpcRequest| {
            let label = label.clone();
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                if healthy {
                    let payload = String::from_utf8_lossy(request.payload()).into_owned();
                    RpcResponse::ok(format!("{label}:{payload}"))
                } else {
                    RpcResponse::error(RpcCode::Internal, "backend failure")
                }
            }
        })
        .await
        .unwrap();

        Self {
            name: name.to_string(),
            protocol: Protocol::Rpc,
            endpoint: server.local_addr().to_string(),
            hits,
            _server: Server::Rpc(server),
        }
    }
}

/// Request of `protocol` carrying `payload`
pub fn request(protocol: Protocol, payload: &'static str) -> Arc<dyn Request> {
    match protocol {
        Protocol::Http => Arc::new(HttpRequest::post(payload).with_header("x-request-id", "it")),
        Protocol::Rpc => Arc::new(RpcRequest::new(payload).with_metadata("x-request-id", "it")),
    }
}

/// TOML configuration for `backends` with an explicit priority `order`
pub fn config_toml(protocol: Protocol, order: &[&str], backends: &[&Backend]) -> String {
    let order = order
        .iter()
        .map(|name| format!("\"{name}\""))
        .collect::<Vec<_>>()
        .join(", ");

    let mut toml = format!(
        "[router]\nid = \"it\"\nprotocol = \"{}\"\n\n[router.strategy]\nkind = \"priority\"\norder = [{order}]\n",
        protocol.to_string().to_lowercase()
    );

    for backend in backends {
        toml.push_str(&format!(
            "\n[[routes]]\nname = \"{}\"\nprotocol = \"{}\"\nendpoint = \"{}\"\ntimeout_ms = {TIMEOUT_MS}\n",
            backend.name,
            backend.protocol.to_string().to_lowercase(),
            backend.endpoint
        ));
    }
    toml
}

/// Parse and validate the configuration produced by [`config_toml`]
pub fn blueprint(protocol: Protocol, order: &[&str], backends: &[&Backend]) -> RouterBlueprint {
    config_loader::ConfigLoader::load_from_str(
        &config_toml(protocol, order, backends),
        config_loader::ConfigFormat::Toml,
    )
    .unwrap()
}

/// An address nothing listens on
pub async fn closed_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}
