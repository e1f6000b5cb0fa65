// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side client for the parent protocol (spec.md §4.2). Opens a fresh
//! connection per message, sends one request frame, reads exactly one
//! response frame, closes.

use std::future::Future;
use std::pin::Pin;

use pw_core::{RemoteError, TaskId, TrackedChanges};
use pw_instrument::ChangeTransport;
use pw_wire::{read_value, write_value, Message, ProtocolError};
use tokio::net::TcpStream;

/// A `Messenger` bound to one task id and one parent port for the lifetime
/// of a single worker invocation. Cheaply cloneable so it can also be handed
/// to a session as its [`ChangeTransport`].
#[derive(Clone)]
pub struct Messenger {
    port: u16,
    task_id: TaskId,
}

impl Messenger {
    pub fn new(port: u16, task_id: TaskId) -> Self {
        Self { port, task_id }
    }

    async fn send(&self, message: Message) -> Result<(), MessengerError> {
        let mut stream = TcpStream::connect(("127.0.0.1", self.port)).await?;
        write_value(&mut stream, &message).await?;
        let ack: pw_wire::Ack = read_value(&mut stream).await?;
        ack.into_result().map_err(MessengerError::Remote)
    }

    /// Fire-and-forget in spirit, but still awaits the ack (spec.md §4.2).
    pub async fn started(&self) -> Result<(), MessengerError> {
        self.send(Message::Started { task_id: self.task_id.clone() }).await
    }

    /// Terminal: the task body returned normally.
    pub async fn succeeded(&self, tracked_changes: TrackedChanges) -> Result<(), MessengerError> {
        self.send(Message::Succeeded { task_id: self.task_id.clone(), tracked_changes }).await
    }

    /// Terminal: the task body raised. `exception` is shipped alongside
    /// whatever diff had accumulated before the failure.
    pub async fn failed(&self, tracked_changes: TrackedChanges, exception: RemoteError) -> Result<(), MessengerError> {
        self.send(Message::Failed { task_id: self.task_id.clone(), exception, tracked_changes }).await
    }

    /// Mid-execution flush; may be called multiple times per task.
    pub async fn apply_tracked_changes(&self, tracked_changes: TrackedChanges) -> Result<(), MessengerError> {
        self.send(Message::ApplyTrackedChanges { task_id: self.task_id.clone(), tracked_changes }).await
    }
}

/// Failures from a `Messenger` call: either the protocol itself broke, or
/// the parent's response carried an `exception` (spec.md §4.2's rationale:
/// "the worker must observe parent-side apply failures so it can abort
/// rather than continue against stale in-memory state").
#[derive(Debug, thiserror::Error)]
pub enum MessengerError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("parent reported an error: {0}")]
    Remote(RemoteError),
}

/// Lets a [`pw_instrument::WorkerSession`] drive a mid-task flush straight
/// through this messenger's `apply_tracked_changes` (spec.md §4.3), mapping
/// a protocol-level failure to a `RemoteError` since `ChangeTransport`'s
/// contract speaks only in those terms.
impl ChangeTransport for Messenger {
    fn send_diff<'a>(&'a self, diff: TrackedChanges) -> Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send + 'a>> {
        Box::pin(async move {
            self.apply_tracked_changes(diff).await.map_err(|e| match e {
                MessengerError::Remote(remote) => remote,
                MessengerError::Protocol(protocol) => RemoteError::wrap("ProtocolError", &protocol),
            })
        })
    }
}

#[cfg(test)]
#[path = "messenger_tests.rs"]
mod tests;
