// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The parent-side listener loop (spec.md §4.6): accepts worker connections,
//! dispatches by message `type`, and replies with an [`Ack`].
//!
//! Grounded in `oj-daemon`'s `Listener` (`listener/mod.rs`): a dedicated
//! accept loop that spawns one task per connection, racing it against a
//! shutdown signal via `tokio::select!`. Unlike the teacher, there is only
//! one socket here (loopback TCP) and no Hello/auth handshake — the worker
//! protocol is purpose-built and asymmetric (spec.md §1).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pw_core::{RemoteError, TaskId, TaskRegistry, TaskStatus};
use pw_store::{apply_tracked_changes, AuthoritativeStore};
use pw_wire::{read_value, write_value, Ack, Message, ProtocolError};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tracing::{debug, error};

use crate::env;

/// Shared state every connection handler reads and mutates.
pub struct ListenCtx {
    pub registry: Arc<TaskRegistry>,
    pub store: Arc<dyn AuthoritativeStore>,
    /// One logical apply-lock (spec.md §5): a slow apply on one worker's
    /// connection blocks acceptance of further progress from any other,
    /// even though each connection is its own spawned task.
    apply_lock: tokio::sync::Mutex<()>,
    stop: Notify,
    stopped: AtomicBool,
}

impl ListenCtx {
    pub fn new(registry: Arc<TaskRegistry>, store: Arc<dyn AuthoritativeStore>) -> Self {
        Self { registry, store, apply_lock: tokio::sync::Mutex::new(()), stop: Notify::new(), stopped: AtomicBool::new(false) }
    }

    fn request_stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.stop.notify_waiters();
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Runs the accept loop until a `Closed` message is handled or the listen
/// socket itself closes. Intended to be spawned as a single tokio task for
/// the executor's lifetime.
pub async fn run(tcp: TcpListener, ctx: Arc<ListenCtx>, ready: tokio::sync::oneshot::Sender<()>) {
    let _ = ready.send(());
    loop {
        if ctx.is_stopped() {
            return;
        }
        tokio::select! {
            accepted = tcp.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let ctx = Arc::clone(&ctx);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, &ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!(error = %e, "accept error"),
                }
            }
            _ = ctx.stop.notified() => {
                return;
            }
        }
        if ctx.is_stopped() {
            return;
        }
    }
}

fn log_connection_error(e: ProtocolError) {
    match e {
        ProtocolError::ConnectionClosed => debug!("worker disconnected before a complete frame"),
        ProtocolError::Timeout => debug!("timed out waiting for a worker frame"),
        other => debug!(error = %other, "connection error"),
    }
}

/// Handle exactly one request/response cycle on a fresh connection, per the
/// Messenger's "one connection per message" contract (spec.md §4.2).
async fn handle_connection(mut stream: TcpStream, ctx: &ListenCtx) -> Result<(), ProtocolError> {
    let message: Message = tokio::time::timeout(env::ipc_timeout(), read_value(&mut stream))
        .await
        .map_err(|_| ProtocolError::Timeout)??;

    let ack = dispatch(message, ctx).await;

    tokio::time::timeout(env::ipc_timeout(), write_value(&mut stream, &ack)).await.map_err(|_| ProtocolError::Timeout)??;
    Ok(())
}

/// Route one message to its handler and build the response ack, per the
/// per-type behavior spec.md §4.6 and the state transition table define.
async fn dispatch(message: Message, ctx: &ListenCtx) -> Ack {
    match message {
        Message::Closed => {
            ctx.request_stop();
            Ack::ok()
        }
        Message::Started { task_id } => {
            ctx.registry.mark_running(&task_id);
            Ack::ok()
        }
        Message::Succeeded { task_id, tracked_changes } => {
            ctx.registry.remove(&task_id);
            match apply_under_lock(ctx, &tracked_changes).await {
                Ok(_) => {
                    ctx.registry.set_status(&task_id, TaskStatus::Succeeded);
                    Ack::ok()
                }
                Err(e) => {
                    let remote = apply_error_to_remote(&task_id, &e);
                    ctx.registry.set_status(&task_id, TaskStatus::Failed { exception: remote.clone() });
                    Ack::failed(remote)
                }
            }
        }
        Message::Failed { task_id, exception, tracked_changes } => {
            ctx.registry.remove(&task_id);
            // Partial-apply policy (spec.md §9 DESIGN NOTES / SPEC_FULL §4.4):
            // a failed task's in-flight diff is still applied unconditionally.
            match apply_under_lock(ctx, &tracked_changes).await {
                Ok(_) => {
                    ctx.registry.set_status(&task_id, TaskStatus::Failed { exception: exception.clone() });
                    Ack::ok()
                }
                Err(apply_err) => {
                    let apply_remote = apply_error_to_remote(&task_id, &apply_err);
                    let combined = RemoteError::new(
                        "CompositeError",
                        format!(
                            "task {task_id} failed ({exception}); additionally failed to apply its in-flight diff: {apply_remote}"
                        ),
                    )
                    .with_cause(exception);
                    ctx.registry.set_status(&task_id, TaskStatus::Failed { exception: combined });
                    Ack::failed(apply_remote)
                }
            }
        }
        Message::ApplyTrackedChanges { task_id, tracked_changes } => {
            if !ctx.registry.contains(&task_id) {
                return Ack::failed(RemoteError::new("UnknownTask", format!("no running task {task_id}")));
            }
            match apply_under_lock(ctx, &tracked_changes).await {
                Ok(_) => Ack::ok(),
                Err(e) => Ack::failed(apply_error_to_remote(&task_id, &e)),
            }
        }
    }
}

async fn apply_under_lock(
    ctx: &ListenCtx,
    diff: &pw_core::TrackedChanges,
) -> Result<Vec<(pw_core::ModelName, pw_core::EntityId)>, pw_store::ApplyError> {
    let _guard = ctx.apply_lock.lock().await;
    apply_tracked_changes(ctx.store.as_ref(), diff)
}

fn apply_error_to_remote(task_id: &TaskId, err: &pw_store::ApplyError) -> RemoteError {
    RemoteError::new("ApplyError", format!("task {task_id}: {err}")).with_traceback(err.to_string())
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
