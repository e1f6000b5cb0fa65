// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parent-held task records (spec.md §3).

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::id::TaskId;

/// Opaque, serializable execution context handed to a worker. The core
/// workspace never interprets `state` — reconstructing a real context from
/// `context_cls` is the orchestration engine's job (out of scope per
/// spec.md §1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBlob {
    pub context_cls: String,
    pub state: serde_json::Value,
}

/// A task as the parent knows it: identity, target callable, inputs, and
/// the context to hand to the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Module path + attribute describing the callable to invoke.
    pub implementation: String,
    pub inputs: BTreeMap<String, serde_json::Value>,
    /// Opaque plugin handle; presence only affects subprocess env construction.
    pub plugin: Option<String>,
    pub context: ContextBlob,
}

/// Where a task is in its lifecycle, per spec.md §4.6's state transition table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskStatus {
    Submitted,
    Running,
    Succeeded,
    Failed { exception: RemoteError },
}

/// Mapping from task identity to task, keyed for O(1) lookup.
///
/// Invariant (spec.md §3): a task is present in `active` iff the parent
/// expects further messages referencing it — insert on submit, remove on
/// terminal status. The last-known status of every task ever submitted
/// (active or not) is retained in `statuses` so callers can observe a
/// task's final outcome after it leaves the active set.
#[derive(Default)]
pub struct TaskRegistry {
    active: Mutex<HashMap<TaskId, Task>>,
    statuses: Mutex<HashMap<TaskId, TaskStatus>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, task: Task) {
        let id = task.id.clone();
        self.active.lock().insert(id.clone(), task);
        self.statuses.lock().insert(id, TaskStatus::Submitted);
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.active.lock().contains_key(id)
    }

    pub fn mark_running(&self, id: &TaskId) {
        self.statuses.lock().insert(id.clone(), TaskStatus::Running);
    }

    /// Remove the task from the active set and return it. Returns `None` if
    /// the task id is unknown (e.g. a duplicate terminal message, or a
    /// message for a task the parent never registered).
    pub fn remove(&self, id: &TaskId) -> Option<Task> {
        self.active.lock().remove(id)
    }

    /// Record a task's final status. Does not require the task to still be
    /// active — callers remove the task first, then record its outcome.
    pub fn set_status(&self, id: &TaskId, status: TaskStatus) {
        self.statuses.lock().insert(id.clone(), status);
    }

    pub fn status(&self, id: &TaskId) -> Option<TaskStatus> {
        self.statuses.lock().get(id).cloned()
    }

    pub fn active_len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active_len() == 0
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
