// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Value{initial, current}` pair tracked changes are built from.

use serde::{Deserialize, Serialize};

/// The `initial` half of a [`TrackedValue`].
///
/// `Stub` is the sentinel described in the spec: "not loaded yet, treat as
/// overwrite". It never compares equal to a `Known` value, so a scalar set
/// on a never-loaded attribute is always considered dirty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Initial {
    Stub,
    Known(serde_json::Value),
}

/// A tracked scalar attribute: what it held when first observed in this
/// worker run (`initial`), and what it holds now (`current`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedValue {
    pub initial: Initial,
    pub current: serde_json::Value,
}

impl TrackedValue {
    /// A freshly-set attribute with no prior load: `initial` is the stub.
    pub fn set(current: serde_json::Value) -> Self {
        Self { initial: Initial::Stub, current }
    }

    /// An attribute captured on load/refresh: `initial` and `current` start
    /// out equal.
    pub fn loaded(value: serde_json::Value) -> Self {
        Self { initial: Initial::Known(value.clone()), current: value }
    }

    /// True iff the applier must write `current` back to the store.
    pub fn is_dirty(&self) -> bool {
        match &self.initial {
            Initial::Stub => true,
            Initial::Known(initial) => initial != &self.current,
        }
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
