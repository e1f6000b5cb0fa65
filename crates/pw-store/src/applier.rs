// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replays a worker's diff against the authoritative store.
//!
//! Resolves the two source-fidelity open questions explicitly:
//!
//! - `new_instances` is walked exactly once, up front, into a substitution
//!   table before any `modified` entry is processed — not per outer
//!   `tracked_changes` entry the way the routine this replaces did, which
//!   reused a loop variable across a nested loop in a way that shadowed the
//!   outer iteration.
//! - A scalar diff's `current` value is checked against the substitution
//!   table before being assigned, so a sibling entity created earlier in the
//!   same diff can be referenced by its temp-id.
//!
//! Temp-ids are assigned by a single counter per worker run (not per model),
//! so the substitution table is keyed by temp-id alone.

use std::collections::BTreeMap;

use pw_core::{AttributeDiff, EntityId, Initial, ModelName, TempId, TrackedChanges};

use crate::error::ApplyError;
use crate::store::AuthoritativeStore;

/// The conventional attribute name a `Versioned` entity's optimistic
/// concurrency column is tracked under (see `pw-instrument`).
const VERSION_ATTR: &str = "version";

fn resolve_temp_id(value: &serde_json::Value, substitutions: &BTreeMap<TempId, EntityId>) -> serde_json::Value {
    match value.as_str() {
        Some(s) => match substitutions.get(&TempId::new(s)) {
            Some(real_id) => serde_json::Value::String(real_id.as_str().to_string()),
            None => value.clone(),
        },
        None => value.clone(),
    }
}

fn wrap_partial(completed: &[(ModelName, EntityId)], err: ApplyError) -> ApplyError {
    if completed.is_empty() {
        return err;
    }
    tracing::error!(completed = ?completed, error = %err, "apply failed after a partial commit");
    ApplyError::PartialFailure { completed: completed.to_vec(), source: Box::new(err) }
}

/// Apply one worker's diff, returning the `(model, entity_id)` pairs that
/// were successfully persisted before any failure. On success that list is
/// every entity touched by the diff; on failure it is whatever had already
/// committed, wrapped in [`ApplyError::PartialFailure`] alongside the cause.
pub fn apply_tracked_changes(
    store: &dyn AuthoritativeStore,
    diff: &TrackedChanges,
) -> Result<Vec<(ModelName, EntityId)>, ApplyError> {
    let mut substitutions: BTreeMap<TempId, EntityId> = BTreeMap::new();
    for (model, by_temp_id) in &diff.new_instances {
        for (temp_id, fields) in by_temp_id {
            let real_id = store.create(model, fields.clone())?;
            substitutions.insert(temp_id.clone(), real_id);
        }
    }

    let mut completed: Vec<(ModelName, EntityId)> = Vec::new();

    for (model, by_entity) in &diff.modified {
        for (entity_id, attrs) in by_entity {
            if let Some(AttributeDiff::Scalar(version)) = attrs.get(VERSION_ATTR) {
                if let Initial::Known(initial) = &version.initial {
                    if let Some(expected) = initial.as_i64() {
                        let found = store
                            .get_committed_version(model, entity_id)
                            .map_err(|e| wrap_partial(&completed, e.into()))?;
                        if found != Some(expected) {
                            return Err(wrap_partial(
                                &completed,
                                ApplyError::VersionConflict { model: model.clone(), id: entity_id.clone(), expected, found },
                            ));
                        }
                    }
                }
            }

            for (attr, diff_value) in attrs {
                let result = match diff_value {
                    AttributeDiff::Collection(children) => children
                        .iter()
                        .try_for_each(|child| store.append_child(model, entity_id, attr, child.clone())),
                    AttributeDiff::Scalar(value) => {
                        if value.is_dirty() {
                            let resolved = resolve_temp_id(&value.current, &substitutions);
                            store.set_attr(model, entity_id, attr, resolved)
                        } else {
                            Ok(())
                        }
                    }
                };
                result.map_err(|e| wrap_partial(&completed, e.into()))?;
            }

            store.persist(model, entity_id).map_err(|e| wrap_partial(&completed, e.into()))?;
            completed.push((model.clone(), entity_id.clone()));
        }
    }

    Ok(completed)
}

#[cfg(test)]
#[path = "applier_tests.rs"]
mod tests;
