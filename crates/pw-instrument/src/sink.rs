// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `ChangeSink`: the typed interception point every tracked entity
//! routes its reads and writes through instead of touching a local database.
//!
//! Generalizes the ORM event-listener hooks (`sqlalchemy.event.listen` on
//! `set`/`append`/`load`/`refresh`/`after_attach`) into explicit method calls
//! a worker-local storage facade makes on behalf of the entity.

use parking_lot::Mutex;
use pw_core::{ChildEntity, EntityId, FieldMap, Initial, ModelName, TempId, TrackedChanges, TrackedValue};

/// Receives scalar-set, collection-append, new-instance, and load/refresh
/// events and accumulates them into a [`TrackedChanges`] diff.
///
/// Implementations must be safe to share across the single worker task body
/// (typically via `Arc`); the reference implementation here is thread-safe
/// for symmetry with that requirement, though a worker run is single-threaded.
///
/// There is no separate channel for an entity's optimistic-concurrency
/// column: a `Versioned` entity's version is captured through
/// [`ChangeSink::load_scalar`] under the conventional attribute name
/// `"version"`, the same as any other instrumented scalar. That way it rides
/// along in the ordinary diff across the wire, where the applier can read it
/// back out of `tracked_changes` — a side channel that never left the
/// worker process would be useless to a parent in a different process.
pub trait ChangeSink: Send + Sync {
    /// Record a scalar attribute assignment. Returns the coerced value the
    /// caller should treat as authoritative for subsequent reads within this
    /// run (mirrors the original hook returning the coerced value back to
    /// the framework).
    fn set_scalar(&self, model: &ModelName, id: &EntityId, attr: &str, new_value: serde_json::Value) -> serde_json::Value;

    /// Record a load/refresh of a scalar attribute's current value. Captures
    /// `initial` only the first time an attribute is observed; subsequent
    /// calls return whatever `current` already holds, so pending writes
    /// within this run remain visible.
    fn load_scalar(&self, model: &ModelName, id: &EntityId, attr: &str, loaded_value: serde_json::Value) -> serde_json::Value;

    /// Clear whatever has been tracked for one entity (used by `refresh`,
    /// which must reload authoritatively rather than see stale pending
    /// writes).
    fn clear_entity(&self, model: &ModelName, id: &EntityId);

    /// Record a member appended to an instrumented collection attribute.
    fn append_child(&self, model: &ModelName, id: &EntityId, attr: &str, child: ChildEntity);

    /// Record a newly attached entity of a tracked model, returning the
    /// synthetic temp-id assigned to it. The entity is also queued for
    /// expunge.
    fn new_instance(&self, model: &ModelName, fields: FieldMap) -> TempId;

    /// Drain and return everything tracked so far, leaving the sink empty.
    fn take_changes(&self) -> TrackedChanges;

    /// Drop the diff accumulated for a subset of new instances without
    /// reporting them (rollback semantics — new instances only).
    fn discard_new_instances(&self);

    /// Clear the expunge queue and return how many entities were in it.
    /// Called exactly once on every exit path of an instrumentation scope.
    fn expunge(&self) -> usize;
}

#[derive(Default)]
struct SinkState {
    changes: TrackedChanges,
    pending_expunge: Vec<TempId>,
}

/// The reference `ChangeSink`: an in-process, mutex-guarded accumulator.
/// Used by the worker entrypoint and by every test in this workspace.
#[derive(Default)]
pub struct InMemorySink {
    state: Mutex<SinkState>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeSink for InMemorySink {
    fn set_scalar(&self, model: &ModelName, id: &EntityId, attr: &str, new_value: serde_json::Value) -> serde_json::Value {
        let mut state = self.state.lock();
        let entry = state
            .changes
            .modified
            .entry(model.clone())
            .or_default()
            .entry(id.clone())
            .or_default();

        let existing_initial = match entry.get(attr) {
            Some(pw_core::AttributeDiff::Scalar(tv)) => tv.initial.clone(),
            _ => Initial::Stub,
        };
        entry.insert(
            attr.to_string(),
            pw_core::AttributeDiff::Scalar(TrackedValue { initial: existing_initial, current: new_value.clone() }),
        );
        new_value
    }

    fn load_scalar(&self, model: &ModelName, id: &EntityId, attr: &str, loaded_value: serde_json::Value) -> serde_json::Value {
        let mut state = self.state.lock();
        let entry = state
            .changes
            .modified
            .entry(model.clone())
            .or_default()
            .entry(id.clone())
            .or_default();

        match entry.get(attr) {
            Some(pw_core::AttributeDiff::Scalar(tv)) => tv.current.clone(),
            _ => {
                entry.insert(attr.to_string(), pw_core::AttributeDiff::Scalar(TrackedValue::loaded(loaded_value.clone())));
                loaded_value
            }
        }
    }

    fn clear_entity(&self, model: &ModelName, id: &EntityId) {
        let mut state = self.state.lock();
        if let Some(entities) = state.changes.modified.get_mut(model) {
            entities.remove(id);
        }
    }

    fn append_child(&self, model: &ModelName, id: &EntityId, attr: &str, child: ChildEntity) {
        self.state.lock().changes.append_child(model.clone(), id.clone(), attr.to_string(), child);
    }

    fn new_instance(&self, model: &ModelName, fields: FieldMap) -> TempId {
        let mut state = self.state.lock();
        let temp_id = TempId::nth(state.pending_expunge.len());
        state.pending_expunge.push(temp_id.clone());
        state.changes.record_new_instance(model.clone(), temp_id.clone(), fields);
        temp_id
    }

    fn take_changes(&self) -> TrackedChanges {
        std::mem::take(&mut self.state.lock().changes)
    }

    fn discard_new_instances(&self) {
        self.state.lock().changes.new_instances.clear();
    }

    fn expunge(&self) -> usize {
        let mut state = self.state.lock();
        let count = state.pending_expunge.len();
        state.pending_expunge.clear();
        count
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
