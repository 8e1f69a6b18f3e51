//! RPC adapter
//!
//! # Wire Protocol
//!
//! Every message is one frame: a 4-byte big-endian length followed by a JSON
//! envelope.
//!
//! ```text
//! [4-byte length] [JSON envelope]
//! request:  {"metadata": {..}, "payload": [..]}
//! response: {"code": 0, "message": "", "metadata": {..}, "payload": [..]}
//! ```
//!
//! Status codes follow the gRPC numbering ([`RpcCode`]).

mod client;
mod code;
pub mod codec;
mod error;
mod message;
mod server;

pub use client::RpcCaller;
pub use code::RpcCode;
pub use error::RpcError;
pub use message::{RpcRequest, RpcResponse};
pub use server::{RpcHandler, RpcServer};
