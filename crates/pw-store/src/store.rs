// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The authoritative store: the ORM's place, stood in generically since the
//! real relational mapping layer is out of scope. Touched only by the
//! listener's apply path (spec §5) — workers never reach it directly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use pw_core::{ChildEntity, EntityId, FieldMap, ModelName};

use crate::error::StoreError;

/// One persisted entity: its scalar fields plus any instrumented collections,
/// keyed by attribute name.
#[derive(Debug, Clone, Default)]
pub struct EntityRecord {
    pub fields: FieldMap,
    pub collections: std::collections::BTreeMap<String, Vec<FieldMap>>,
}

/// The parent-owned persistence layer. Every method is synchronous — the
/// applier holds a single logical apply-lock for the duration of one call
/// (spec §5), so implementations need not be reentrant-safe beyond ordinary
/// interior mutability.
pub trait AuthoritativeStore: Send + Sync {
    fn create(&self, model: &ModelName, fields: FieldMap) -> Result<EntityId, StoreError>;

    fn get(&self, model: &ModelName, id: &EntityId) -> Result<EntityRecord, StoreError>;

    fn get_committed_version(&self, model: &ModelName, id: &EntityId) -> Result<Option<i64>, StoreError>;

    fn set_attr(&self, model: &ModelName, id: &EntityId, attr: &str, value: serde_json::Value) -> Result<(), StoreError>;

    fn append_child(&self, model: &ModelName, id: &EntityId, attr: &str, child: ChildEntity) -> Result<(), StoreError>;

    /// Commit whatever has been written for this entity so far. The
    /// in-memory reference store has nothing to flush — writes already
    /// landed in the map — but the method exists so the applier's four-step
    /// procedure (create, assign, validate, persist) has a concrete thing to
    /// call, the way a real backing store would require an explicit commit.
    fn persist(&self, model: &ModelName, id: &EntityId) -> Result<(), StoreError>;
}

/// Reference `AuthoritativeStore`: a `HashMap`-of-`HashMap`s mutated under a
/// single mutex, grounded in the same shape used for in-process materialized
/// state elsewhere in this workspace.
#[derive(Default)]
pub struct InMemoryStore {
    entities: Mutex<HashMap<ModelName, HashMap<EntityId, EntityRecord>>>,
    next_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entity directly, bypassing `create` — used by tests to set up
    /// a store's initial state before a diff is applied.
    pub fn seed(&self, model: ModelName, id: EntityId, fields: FieldMap) {
        self.entities.lock().entry(model).or_default().insert(id, EntityRecord { fields, collections: Default::default() });
    }
}

impl AuthoritativeStore for InMemoryStore {
    fn create(&self, model: &ModelName, fields: FieldMap) -> Result<EntityId, StoreError> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = EntityId::new(format!("{model}-{n}"));
        self.entities
            .lock()
            .entry(model.clone())
            .or_default()
            .insert(id.clone(), EntityRecord { fields, collections: Default::default() });
        Ok(id)
    }

    fn get(&self, model: &ModelName, id: &EntityId) -> Result<EntityRecord, StoreError> {
        self.entities
            .lock()
            .get(model)
            .and_then(|entities| entities.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound { model: model.clone(), id: id.clone() })
    }

    fn get_committed_version(&self, model: &ModelName, id: &EntityId) -> Result<Option<i64>, StoreError> {
        Ok(self.get(model, id)?.fields.get("version").and_then(serde_json::Value::as_i64))
    }

    fn set_attr(&self, model: &ModelName, id: &EntityId, attr: &str, value: serde_json::Value) -> Result<(), StoreError> {
        let mut entities = self.entities.lock();
        let record = entities
            .get_mut(model)
            .and_then(|entities| entities.get_mut(id))
            .ok_or_else(|| StoreError::NotFound { model: model.clone(), id: id.clone() })?;
        record.fields.insert(attr.to_string(), value);
        Ok(())
    }

    fn append_child(&self, model: &ModelName, id: &EntityId, attr: &str, child: ChildEntity) -> Result<(), StoreError> {
        let mut entities = self.entities.lock();
        let record = entities
            .get_mut(model)
            .and_then(|entities| entities.get_mut(id))
            .ok_or_else(|| StoreError::NotFound { model: model.clone(), id: id.clone() })?;
        record.collections.entry(attr.to_string()).or_default().push(child.fields);
        Ok(())
    }

    fn persist(&self, model: &ModelName, id: &EntityId) -> Result<(), StoreError> {
        self.get(model, id).map(|_| ())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
