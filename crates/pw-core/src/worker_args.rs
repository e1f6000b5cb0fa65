// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The arguments-file contract (spec.md §4.5, §6): what the executor writes
//! to a temp file before spawning a worker, and what the worker entrypoint
//! reads back out and immediately deletes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::TaskId;
use crate::task::ContextBlob;

/// Everything a worker needs to run one task, serialized to a temp file
/// whose path is the worker process's sole argv entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerArgs {
    pub task_id: TaskId,
    pub implementation: String,
    pub operation_inputs: BTreeMap<String, serde_json::Value>,
    pub port: u16,
    pub context: ContextBlob,
}

#[cfg(test)]
#[path = "worker_args_tests.rs"]
mod tests;
