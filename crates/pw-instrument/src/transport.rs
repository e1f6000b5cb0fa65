// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The wire round trip a mid-task [`crate::session::WorkerSession::flush`]
//! drives (spec.md §4.2/§4.3: "the session's `commit` is rewired to call
//! `messenger.apply_tracked_changes(...)`, then clear local diff state").
//!
//! Defined here, rather than this crate depending on `pw-worker` directly,
//! so the instrumentation layer never reaches across the protocol boundary
//! itself — `pw-worker`'s `Messenger` is the only implementation that ships
//! with this workspace.

use std::future::Future;
use std::pin::Pin;

use pw_core::{RemoteError, TrackedChanges};

/// Ships a mid-task diff to the parent and waits for its ack, surfacing any
/// apply failure the parent reports (spec.md §4.2's rationale: "the worker
/// must observe parent-side apply failures so it can abort rather than
/// continue against stale in-memory state").
pub trait ChangeTransport: Send + Sync {
    fn send_diff<'a>(&'a self, diff: TrackedChanges) -> Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send + 'a>>;
}
