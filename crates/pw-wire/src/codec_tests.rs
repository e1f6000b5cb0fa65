// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::protocol::{Ack, Message};
use pw_core::TaskId;

#[test]
fn encode_returns_json_without_length_prefix() {
    let msg = Message::Closed;
    let encoded = encode(&msg).expect("encode failed");
    let json_str = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert!(json_str.starts_with('{'), "should be a JSON object: {json_str}");
}

#[tokio::test]
async fn read_write_message_roundtrip() {
    let original = b"hello world";

    let mut buffer = Vec::new();
    write_message(&mut buffer, original).await.expect("write failed");
    assert_eq!(buffer.len(), 4 + original.len());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.expect("read failed");
    assert_eq!(read_back, original);
}

#[tokio::test]
async fn write_message_uses_native_endian_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data).await.expect("write failed");

    let len = u32::from_ne_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn read_message_on_truncated_prefix_is_connection_closed() {
    let mut cursor = std::io::Cursor::new(vec![0u8, 1]);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn read_message_on_truncated_payload_is_connection_closed() {
    let mut frame = 10u32.to_ne_bytes().to_vec();
    frame.extend_from_slice(b"short");
    let mut cursor = std::io::Cursor::new(frame);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn read_write_value_roundtrip_for_message() {
    let msg = Message::Started { task_id: TaskId::new("t1") };

    let mut buffer = Vec::new();
    write_value(&mut buffer, &msg).await.expect("write failed");

    let mut cursor = std::io::Cursor::new(buffer);
    let back: Message = read_value(&mut cursor).await.expect("read failed");
    assert_eq!(back, msg);
}

#[tokio::test]
async fn read_write_value_roundtrip_for_ack() {
    let ack = Ack::ok();

    let mut buffer = Vec::new();
    write_value(&mut buffer, &ack).await.expect("write failed");

    let mut cursor = std::io::Cursor::new(buffer);
    let back: Ack = read_value(&mut cursor).await.expect("read failed");
    assert_eq!(back, ack);
}
