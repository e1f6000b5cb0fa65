// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-local storage facade: the same read API a tracked entity would use
//! against the authoritative store, except every write is redirected into a
//! [`ChangeSink`] instead of reaching a local database.

use std::sync::Arc;

use pw_core::{ChildEntity, Coercion, EntityId, FieldMap, InstrumentationRegistry, ModelName, RemoteError, TempId, TrackedChanges};

use crate::sink::ChangeSink;
use crate::transport::ChangeTransport;
use crate::versioned::Versioned;

/// The worker-local session. Forced non-autoflush by construction — there is
/// no local flush path at all, since every write lands in the sink.
pub struct WorkerSession<S: ChangeSink> {
    sink: Arc<S>,
    registry: &'static InstrumentationRegistry,
    transport: Option<Arc<dyn ChangeTransport>>,
}

impl<S: ChangeSink> WorkerSession<S> {
    /// A session with no wired transport: `commit`/`flush` only drain the
    /// sink locally. Used by session-level unit tests that never spin up a
    /// parent connection.
    pub fn new(sink: Arc<S>, registry: &'static InstrumentationRegistry) -> Self {
        Self { sink, registry, transport: None }
    }

    /// A session wired to ship mid-task commits over a real transport
    /// (spec.md §4.3). Used by the worker entrypoint.
    pub fn with_transport(sink: Arc<S>, registry: &'static InstrumentationRegistry, transport: Arc<dyn ChangeTransport>) -> Self {
        Self { sink, registry, transport: Some(transport) }
    }

    /// Set an instrumented scalar attribute, coercing the value per the
    /// registry before recording it. Returns the coerced value the caller
    /// should hold in memory.
    pub fn set(&self, model: &ModelName, id: &EntityId, attr: &str, value: serde_json::Value) -> serde_json::Value {
        let coerced = match self.registry.coercion_for(model, attr) {
            Some(Coercion::Scalar(kind)) => kind.coerce(value),
            _ => value,
        };
        self.sink.set_scalar(model, id, attr, coerced)
    }

    /// Load (or refresh) an instrumented scalar attribute's current value,
    /// capturing `initial` the first time it is observed for this entity.
    pub fn load(&self, model: &ModelName, id: &EntityId, attr: &str, value: serde_json::Value) -> serde_json::Value {
        self.sink.load_scalar(model, id, attr, value)
    }

    /// Append a member to an instrumented collection attribute.
    pub fn append(&self, model: &ModelName, id: &EntityId, attr: &str, child: ChildEntity) {
        self.sink.append_child(model, id, attr, child);
    }

    /// Attach a freshly constructed entity, if its model is tracked as
    /// `new`. Returns the synthetic temp-id assigned to it, or `None` if the
    /// model is not tracked for new-instance capture.
    pub fn create(&self, model: &ModelName, fields: FieldMap) -> Option<TempId> {
        if self.registry.tracks_new(model) {
            Some(self.sink.new_instance(model, fields))
        } else {
            None
        }
    }

    /// Capture an entity's version column on load, if it carries one. Routed
    /// through the ordinary scalar-load path under the conventional
    /// `"version"` attribute name so it rides along in the diff shipped to
    /// the parent.
    pub fn load_versioned(&self, model: &ModelName, id: &EntityId, entity: &impl Versioned) {
        if let Some(version) = entity.version() {
            self.sink.load_scalar(model, id, "version", serde_json::Value::from(version));
        }
    }

    /// Drain the diff accumulated so far, locally, resetting the
    /// dirty-tracking baseline for any attribute touched again afterward.
    /// Does not talk to the parent — see [`Self::flush`] for the mid-task
    /// wire round trip spec.md §4.3 describes.
    pub fn commit(&self) -> TrackedChanges {
        self.sink.take_changes()
    }

    /// Drain the accumulated diff and, if a transport is wired, ship it to
    /// the parent via `apply_tracked_changes` and await its ack before
    /// returning (spec.md §4.2/§4.3). A task body calls this for a
    /// mid-execution commit; the worker entrypoint's own final `commit()`
    /// after the body returns ships whatever is left over the ordinary
    /// `succeeded`/`failed` message instead.
    pub async fn flush(&self) -> Result<(), RemoteError> {
        let diff = self.commit();
        if diff.is_empty() {
            return Ok(());
        }
        match &self.transport {
            Some(transport) => transport.send_diff(diff).await,
            None => Ok(()),
        }
    }

    /// Discard new instances accumulated so far without reporting them; any
    /// scalar diffs already recorded are left untouched, matching the
    /// original's "rollback expunges new instances only" behavior.
    pub fn rollback(&self) {
        self.sink.discard_new_instances();
    }

    /// Clear whatever has been tracked for one entity so a subsequent load
    /// reloads authoritatively instead of replaying pending writes.
    pub fn refresh(&self, model: &ModelName, id: &EntityId) {
        self.sink.clear_entity(model, id);
    }

    fn expunge(&self) -> usize {
        self.sink.expunge()
    }
}

/// Scoped acquisition of instrumentation: entering installs a session on the
/// caller's behalf; exiting — including via unwind — runs the expunge step
/// exactly once, on every exit path.
///
/// Holds its session directly rather than behind an `Option`: a scope owns
/// exactly one session for its entire lifetime, so [`Self::session`] is
/// infallible by construction instead of panicking on a state no caller can
/// actually observe (there is no code path between construction and `Drop`
/// where the session is absent).
pub struct InstrumentationScope<S: ChangeSink> {
    session: Arc<WorkerSession<S>>,
}

impl<S: ChangeSink> InstrumentationScope<S> {
    pub fn enter(sink: Arc<S>, registry: &'static InstrumentationRegistry) -> Self {
        Self { session: Arc::new(WorkerSession::new(sink, registry)) }
    }

    /// Enter with a transport wired, so a mid-task `flush()` performs a real
    /// wire round trip instead of only draining locally.
    pub fn enter_with_transport(
        sink: Arc<S>,
        registry: &'static InstrumentationRegistry,
        transport: Arc<dyn ChangeTransport>,
    ) -> Self {
        Self { session: Arc::new(WorkerSession::with_transport(sink, registry, transport)) }
    }

    /// A cheap `Arc` clone of the session this scope owns.
    pub fn session(&self) -> Arc<WorkerSession<S>> {
        Arc::clone(&self.session)
    }
}

impl<S: ChangeSink> Drop for InstrumentationScope<S> {
    fn drop(&mut self) {
        let expunged = self.session.expunge();
        tracing::debug!(expunged, "instrumentation scope exited");
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
