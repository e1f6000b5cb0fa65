// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed framing over any async stream, plus the JSON payload codec.
//!
//! Wire format: 4-byte length prefix (native endian) + JSON payload. Native
//! endian rather than network byte order because the protocol only ever runs
//! loopback, single-host, matching the process this workspace replaces
//! (`struct.pack('I', ...)`, which is native-endian with no explicit format
//! character).

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;

/// Serialize a payload to its raw JSON bytes, with no length prefix.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(value).map_err(ProtocolError::Decode)
}

/// Deserialize a payload from raw JSON bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    serde_json::from_slice(bytes).map_err(ProtocolError::Decode)
}

/// Read one length-prefixed frame's payload bytes.
///
/// Reads exactly 4 bytes for the length, then loops reading until that many
/// payload bytes are accumulated. EOF before the payload is complete is a
/// protocol error — short reads are never silently tolerated.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(ProtocolError::Io(e)),
    }
    let len = u32::from_ne_bytes(len_buf) as usize;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolError::ConnectionClosed
        } else {
            ProtocolError::Io(e)
        }
    })?;
    Ok(payload)
}

/// Write one length-prefixed frame: the 4-byte length prefix followed by the
/// full payload, in one logical write (the caller's stream may still
/// fragment it at the OS level; `write_all` handles that).
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError> {
    let len = u32::try_from(payload.len()).map_err(|_| ProtocolError::PayloadTooLarge(payload.len()))?;
    writer.write_all(&len.to_ne_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame and decode it as `T` in a single call.
pub async fn read_value<T: DeserializeOwned, R: AsyncRead + Unpin>(reader: &mut R) -> Result<T, ProtocolError> {
    let bytes = read_message(reader).await?;
    decode(&bytes)
}

/// Encode `T` and write it as one frame in a single call.
pub async fn write_value<T: Serialize, W: AsyncWrite + Unpin>(writer: &mut W, value: &T) -> Result<(), ProtocolError> {
    let bytes = encode(value)?;
    write_message(writer, &bytes).await
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
