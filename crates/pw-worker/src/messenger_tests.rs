// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use pw_wire::{read_value, write_value, Ack};
use tokio::net::TcpListener;

use super::*;

async fn fake_parent(respond: Ack) -> (u16, tokio::task::JoinHandle<Message>) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let message: Message = read_value(&mut stream).await.unwrap();
        write_value(&mut stream, &respond).await.unwrap();
        message
    });
    (port, handle)
}

#[tokio::test]
async fn started_sends_request_and_awaits_ack() {
    let (port, handle) = fake_parent(Ack::ok()).await;
    let messenger = Messenger::new(port, TaskId::new("t1"));
    messenger.started().await.unwrap();
    let received = handle.await.unwrap();
    assert_eq!(received, Message::Started { task_id: TaskId::new("t1") });
}

#[tokio::test]
async fn ack_with_exception_is_raised_as_an_error() {
    let remote = RemoteError::new("ValueError", "bad diff");
    let (port, _handle) = fake_parent(Ack::failed(remote.clone())).await;
    let messenger = Messenger::new(port, TaskId::new("t1"));

    let err = messenger.apply_tracked_changes(TrackedChanges::default()).await.unwrap_err();
    match err {
        MessengerError::Remote(e) => assert_eq!(e, remote),
        other => panic!("expected Remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn change_transport_impl_round_trips_through_apply_tracked_changes() {
    let (port, handle) = fake_parent(Ack::ok()).await;
    let messenger = Messenger::new(port, TaskId::new("t1"));

    let mut diff = TrackedChanges::default();
    diff.set_attribute(
        pw_core::ModelName::new("node"),
        pw_core::EntityId::new("n1"),
        "state",
        pw_core::TrackedValue::set(serde_json::json!("flushed")),
    );

    ChangeTransport::send_diff(&messenger, diff.clone()).await.unwrap();

    match handle.await.unwrap() {
        Message::ApplyTrackedChanges { task_id, tracked_changes } => {
            assert_eq!(task_id, TaskId::new("t1"));
            assert_eq!(tracked_changes, diff);
        }
        other => panic!("expected ApplyTrackedChanges, got {other:?}"),
    }
}

#[tokio::test]
async fn succeeded_carries_tracked_changes() {
    let (port, handle) = fake_parent(Ack::ok()).await;
    let messenger = Messenger::new(port, TaskId::new("t1"));

    let mut diff = TrackedChanges::default();
    diff.set_attribute(
        pw_core::ModelName::new("node"),
        pw_core::EntityId::new("n1"),
        "state",
        pw_core::TrackedValue::set(serde_json::json!("done")),
    );
    messenger.succeeded(diff.clone()).await.unwrap();

    match handle.await.unwrap() {
        Message::Succeeded { task_id, tracked_changes } => {
            assert_eq!(task_id, TaskId::new("t1"));
            assert_eq!(tracked_changes, diff);
        }
        other => panic!("expected Succeeded, got {other:?}"),
    }
}
