// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tracked change set a worker builds and the parent consumes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::{EntityId, ModelName, TempId};
use crate::value::TrackedValue;

/// Field name → value, the serialized shape of one entity.
pub type FieldMap = BTreeMap<String, serde_json::Value>;

/// A child entity captured by a collection-append hook: the full field map
/// of the appended instance plus which model it belongs to, so the parent
/// can re-instantiate the right type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildEntity {
    #[serde(rename = "_MODEL_CLS")]
    pub model: ModelName,
    #[serde(flatten)]
    pub fields: FieldMap,
}

/// One tracked attribute: either a dirtied scalar, or a list of entities
/// appended to a collection-valued attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeDiff {
    Collection(Vec<ChildEntity>),
    Scalar(TrackedValue),
}

/// model_name → entity_id → attribute_name → diff.
pub type ModifiedMap = BTreeMap<ModelName, BTreeMap<EntityId, BTreeMap<String, AttributeDiff>>>;

/// model_name → temp_id → field_map.
pub type NewInstanceMap = BTreeMap<ModelName, BTreeMap<TempId, FieldMap>>;

/// Everything a worker run intends to have written to the authoritative
/// store, expressed as a diff instead of an actual write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackedChanges {
    #[serde(default)]
    pub modified: ModifiedMap,
    #[serde(default)]
    pub new_instances: NewInstanceMap,
}

impl TrackedChanges {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.new_instances.is_empty()
    }

    /// Record a scalar attribute set, creating the nested maps as needed.
    pub fn set_attribute(&mut self, model: ModelName, id: EntityId, attr: impl Into<String>, value: TrackedValue) {
        self.modified.entry(model).or_default().entry(id).or_default().insert(attr.into(), AttributeDiff::Scalar(value));
    }

    /// Append a child entity to a collection-valued attribute, preserving
    /// insertion order within the attribute's `Vec`.
    pub fn append_child(&mut self, model: ModelName, id: EntityId, attr: impl Into<String>, child: ChildEntity) {
        let attrs = self.modified.entry(model).or_default().entry(id).or_default();
        match attrs.entry(attr.into()).or_insert_with(|| AttributeDiff::Collection(Vec::new())) {
            AttributeDiff::Collection(items) => items.push(child),
            AttributeDiff::Scalar(_) => unreachable!("attribute already tracked as scalar"),
        }
    }

    /// Record a newly created instance under a freshly minted temp-id.
    pub fn record_new_instance(&mut self, model: ModelName, temp_id: TempId, fields: FieldMap) {
        self.new_instances.entry(model).or_default().insert(temp_id, fields);
    }
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
