//! Frame codec
//!
//! Wire format: `[4-byte length as u32 big-endian] + [JSON envelope]`.

use bytes::Bytes;
use contracts::{Metadata, Request};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{RpcCode, RpcError, RpcRequest, RpcResponse};

/// Largest accepted frame body
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

#[derive(Serialize)]
struct RequestEnvelopeRef<'a> {
    metadata: &'a Metadata,
    payload: &'a Bytes,
}

#[derive(Deserialize)]
struct RequestEnvelope {
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    payload: Bytes,
}

#[derive(Serialize, Deserialize)]
struct ResponseEnvelope {
    code: i32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    payload: Bytes,
}

/// Encode any request as an RPC request envelope
pub fn encode_request(request: &dyn Request) -> Result<Vec<u8>, RpcError> {
    Ok(serde_json::to_vec(&RequestEnvelopeRef {
        metadata: request.metadata(),
        payload: request.payload(),
    })?)
}

pub fn decode_request(data: &[u8]) -> Result<RpcRequest, RpcError> {
    let envelope: RequestEnvelope = serde_json::from_slice(data)?;
    Ok(RpcRequest {
        metadata: envelope.metadata,
        payload: envelope.payload,
    })
}

pub fn encode_response(response: &RpcResponse) -> Result<Vec<u8>, RpcError> {
    Ok(serde_json::to_vec(&ResponseEnvelope {
        code: response.code.as_i32(),
        message: response.message.clone(),
        metadata: response.metadata.clone(),
        payload: response.payload.clone(),
    })?)
}

/// Decode a response envelope
///
/// Codes outside the known range are reported as [`RpcCode::Unknown`].
pub fn decode_response(data: &[u8]) -> Result<RpcResponse, RpcError> {
    let envelope: ResponseEnvelope = serde_json::from_slice(data)?;
    Ok(RpcResponse {
        code: RpcCode::from_i32(envelope.code).unwrap_or(RpcCode::Unknown),
        message: envelope.message,
        metadata: envelope.metadata,
        payload: envelope.payload,
    })
}

/// Write one length-prefixed frame and flush
pub async fn write_frame<W>(writer: &mut W, data: &[u8]) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
{
    if data.len() > MAX_FRAME_LEN {
        return Err(RpcError::FrameTooLarge {
            len: data.len(),
            max: MAX_FRAME_LEN,
        });
    }

    writer.write_u32(data.len() as u32).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame
///
/// A clean EOF before the length prefix is [`RpcError::ConnectionClosed`].
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, RpcError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(RpcError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    };

    if len > MAX_FRAME_LEN {
        return Err(RpcError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}
