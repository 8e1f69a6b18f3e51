//! RPC transport error types

use thiserror::Error;

/// Framing and transport errors
#[derive(Debug, Error)]
pub enum RpcError {
    /// Socket error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the connection between frames
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Frame length prefix above the limit
    #[error("frame too large: {len} bytes (max {max} bytes)")]
    FrameTooLarge { len: usize, max: usize },

    /// Envelope could not be (de)serialized
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
