// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framing and codec failures. All are fatal for the connection they occur
//! on — the codec never retries (spec §4.1).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("payload decode/encode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("connection closed before a complete frame was read")]
    ConnectionClosed,

    #[error("payload of {0} bytes exceeds the u32 length-prefix range")]
    PayloadTooLarge(usize),

    #[error("timed out waiting for a frame")]
    Timeout,
}
