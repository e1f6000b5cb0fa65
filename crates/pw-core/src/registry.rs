// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static description of which attributes a worker instruments, and how.
//!
//! Mirrors the original's `_INSTRUMENTED` constant (`aria/storage/instrumentation.py`):
//! a table from (model, attribute) to a coercion, plus a list of models whose
//! every instantiation must be captured as a new instance.

use crate::id::ModelName;

/// How a tracked scalar attribute's value should be normalized before being
/// recorded as `current` in a [`crate::value::TrackedValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Str,
    I64,
    F64,
    Bool,
    /// Pass the value through unchanged (used for attributes with no
    /// narrower native type — the original's "TODO: add support for
    /// pickled type" case).
    Json,
}

impl ScalarKind {
    /// Coerce an arbitrary JSON value into the declared shape. Values that
    /// already match the target shape pass through; anything else is kept
    /// as-is under `Json` semantics rather than silently truncated, since
    /// there is no Rust analog to Python's permissive constructor calls.
    pub fn coerce(self, value: serde_json::Value) -> serde_json::Value {
        match self {
            ScalarKind::Str => match value {
                serde_json::Value::String(_) => value,
                other => serde_json::Value::String(other.to_string()),
            },
            ScalarKind::I64 => match value.as_i64() {
                Some(n) => serde_json::Value::from(n),
                None => value,
            },
            ScalarKind::F64 => match value.as_f64() {
                Some(n) => serde_json::Value::from(n),
                None => value,
            },
            ScalarKind::Bool => match value.as_bool() {
                Some(b) => serde_json::Value::from(b),
                None => value,
            },
            ScalarKind::Json => value,
        }
    }
}

/// Whether an instrumented attribute is a plain scalar or a collection that
/// only ever grows by append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Scalar(ScalarKind),
    Collection,
}

/// One instrumented (model, attribute) pair.
#[derive(Debug, Clone, Copy)]
pub struct ModifiedSpec {
    pub model: &'static str,
    pub attribute: &'static str,
    pub coercion: Coercion,
}

/// The static, worker-side description of what instrumentation tracks.
#[derive(Debug, Clone, Copy)]
pub struct InstrumentationRegistry {
    pub modified: &'static [ModifiedSpec],
    pub new: &'static [&'static str],
}

impl InstrumentationRegistry {
    pub fn coercion_for(&self, model: &ModelName, attribute: &str) -> Option<Coercion> {
        self.modified
            .iter()
            .find(|spec| spec.model == model.as_str() && spec.attribute == attribute)
            .map(|spec| spec.coercion)
    }

    pub fn tracks_new(&self, model: &ModelName) -> bool {
        self.new.iter().any(|&m| m == model.as_str())
    }
}

/// A small reference registry used by tests and examples, analogous to the
/// original's `_INSTRUMENTED` table: a node's `state`, a task's `status`,
/// a node's `attributes` collection, and newly created log entries.
pub const DEMO_REGISTRY: InstrumentationRegistry = InstrumentationRegistry {
    modified: &[
        ModifiedSpec { model: "node", attribute: "state", coercion: Coercion::Scalar(ScalarKind::Str) },
        ModifiedSpec { model: "task", attribute: "status", coercion: Coercion::Scalar(ScalarKind::Str) },
        ModifiedSpec { model: "node", attribute: "attributes", coercion: Coercion::Collection },
    ],
    new: &["log"],
};

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
