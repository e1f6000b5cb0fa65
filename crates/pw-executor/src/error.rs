// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Failures from `Executor::submit` (spec.md §7: "Spawn error / closed executor").
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("executor is closed")]
    Closed,

    #[error("failed to serialize worker arguments: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write worker arguments file: {0}")]
    ArgsFile(std::io::Error),

    #[error("failed to spawn worker process: {0}")]
    Spawn(std::io::Error),
}
