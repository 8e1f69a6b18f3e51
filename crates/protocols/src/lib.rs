//! # Protocols
//!
//! Reference protocol adapters behind the [`contracts::Caller`] trait.
//!
//! - [`http`]: request/response over HTTP (`reqwest`)
//! - [`rpc`]: length-prefixed JSON frames over TCP with gRPC-style status codes
//! - [`mock`]: scriptable in-process adapter for tests and demos
//!
//! Each adapter issues exactly one network call per invocation and opens a
//! fresh connection every time.

pub mod http;
pub mod mock;
pub mod rpc;

pub use http::{HttpCaller, HttpRequest, HttpResponse};
pub use mock::{MockCaller, MockStats};
pub use rpc::{RpcCaller, RpcCode, RpcError, RpcHandler, RpcRequest, RpcResponse, RpcServer};
