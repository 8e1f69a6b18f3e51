//! RpcCaller - one TCP connection per call

use async_trait::async_trait;
use contracts::{CallError, Caller, Protocol, Request, Response};
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use super::codec::{decode_response, encode_request, read_frame, write_frame};
use super::RpcError;

/// Caller that sends framed requests to a `host:port` endpoint
#[derive(Debug, Clone)]
pub struct RpcCaller {
    endpoint: String,
}

impl RpcCaller {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    fn map_error(&self, err: RpcError) -> CallError {
        match err {
            RpcError::Io(e) => CallError::transport(&self.endpoint, e.to_string()),
            RpcError::ConnectionClosed => {
                CallError::transport(&self.endpoint, "connection closed before reply")
            }
            other => CallError::protocol(other.to_string()),
        }
    }
}

#[async_trait]
impl Caller for RpcCaller {
    fn protocol(&self) -> Protocol {
        Protocol::Rpc
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(
        name = "rpc_caller_call",
        skip(self, request),
        fields(endpoint = %self.endpoint)
    )]
    async fn call(&self, request: &dyn Request) -> Result<Box<dyn Response>, CallError> {
        let frame = encode_request(request).map_err(|e| CallError::encoding(e.to_string()))?;

        let mut stream = TcpStream::connect(&self.endpoint)
            .await
            .map_err(|e| CallError::transport(&self.endpoint, e.to_string()))?;

        write_frame(&mut stream, &frame)
            .await
            .map_err(|e| self.map_error(e))?;
        let reply = read_frame(&mut stream)
            .await
            .map_err(|e| self.map_error(e))?;

        let response = decode_response(&reply).map_err(|e| CallError::protocol(e.to_string()))?;
        debug!(code = %response.code(), bytes = reply.len(), "RPC reply received");

        Ok(Box::new(response))
    }
}
