//! RpcServer - framed TCP server
//!
//! Serves any number of frames per connection until the peer closes it or
//! the server is shut down.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::codec::{decode_request, encode_response, read_frame, write_frame};
use super::{RpcCode, RpcError, RpcRequest, RpcResponse};

/// Pause after a failed `accept` (e.g. descriptor exhaustion)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Request handler
#[async_trait]
pub trait RpcHandler: Send + Sync + 'static {
    async fn handle(&self, request: RpcRequest) -> RpcResponse;
}

#[async_trait]
impl<F, Fut> RpcHandler for F
where
    F: Fn(RpcRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RpcResponse> + Send + 'static,
{
    async fn handle(&self, request: RpcRequest) -> RpcResponse {
        (self)(request).await
    }
}

/// Running server
///
/// Dropping the server stops accepting and closes open connections.
pub struct RpcServer {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RpcServer {
    /// Bind `addr` and start serving in a background task
    #[instrument(name = "rpc_server_bind", skip(handler))]
    pub async fn bind<H: RpcHandler>(addr: &str, handler: H) -> Result<Self, RpcError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(accept_loop(
            listener,
            Arc::new(handler),
            shutdown.clone(),
        ));

        info!(addr = %local_addr, "RPC server listening");

        Ok(Self {
            local_addr,
            shutdown,
            task: Some(task),
        })
    }

    /// Bound address (useful after binding port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, close connections and wait for the accept loop to exit
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = ?e, "RPC accept loop panicked");
            }
        }
        debug!(addr = %self.local_addr, "RPC server shut down");
    }
}

impl Drop for RpcServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_loop<H: RpcHandler>(
    listener: TcpListener,
    handler: Arc<H>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "RPC connection accepted");
                    tokio::spawn(serve_connection(
                        stream,
                        Arc::clone(&handler),
                        shutdown.child_token(),
                    ));
                }
                Err(e) => {
                    warn!(error = %e, "Failed to accept RPC connection");
                    if !accept_backoff(&shutdown).await {
                        break;
                    }
                }
            },
        }
    }
}

/// Wait out [`ACCEPT_BACKOFF`]; `false` if shutdown arrived first
async fn accept_backoff(shutdown: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => true,
    }
}

async fn serve_connection<H: RpcHandler>(
    mut stream: TcpStream,
    handler: Arc<H>,
    shutdown: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => return,
            frame = read_frame(&mut stream) => frame,
        };

        let data = match frame {
            Ok(data) => data,
            Err(RpcError::ConnectionClosed) => return,
            Err(e) => {
                debug!(error = %e, "RPC connection dropped");
                return;
            }
        };

        let response = match decode_request(&data) {
            Ok(request) => {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    response = handler.handle(request) => response,
                }
            }
            Err(e) => RpcResponse::error(RpcCode::InvalidArgument, e.to_string()),
        };

        let written = match encode_response(&response) {
            Ok(encoded) => write_frame(&mut stream, &encoded).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            debug!(error = %e, "Failed to send RPC reply");
            return;
        }
    }
}
