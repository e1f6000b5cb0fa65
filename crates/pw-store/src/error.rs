// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use pw_core::{EntityId, ModelName};
use thiserror::Error;

/// Failures from the authoritative store itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown entity {model}/{id}")]
    NotFound { model: ModelName, id: EntityId },
}

/// Failures applying a worker's diff.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("version conflict on {model}/{id}: worker loaded version {expected}, store has {found:?}")]
    VersionConflict { model: ModelName, id: EntityId, expected: i64, found: Option<i64> },

    #[error("apply failed after committing {completed:?}: {source}")]
    PartialFailure { completed: Vec<(ModelName, EntityId)>, #[source] source: Box<ApplyError> },
}
