// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response payloads exchanged between a worker and its parent.

use pw_core::{RemoteError, TaskId, TrackedChanges};
use serde::{Deserialize, Serialize};

/// One frame sent from a worker to the parent over a fresh connection.
///
/// Each variant carries only the fields relevant to it rather than the
/// flat always-present field set the wire historically used — `exception`
/// and `tracked_changes`/`new_instances` only show up where they apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Started {
        task_id: TaskId,
    },
    Succeeded {
        task_id: TaskId,
        #[serde(default)]
        tracked_changes: TrackedChanges,
    },
    Failed {
        task_id: TaskId,
        exception: RemoteError,
        #[serde(default)]
        tracked_changes: TrackedChanges,
    },
    ApplyTrackedChanges {
        task_id: TaskId,
        #[serde(default)]
        tracked_changes: TrackedChanges,
    },
    /// Parent-to-self wakeup frame used to unblock the listener on shutdown.
    Closed,
}

impl Message {
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            Message::Started { task_id }
            | Message::Succeeded { task_id, .. }
            | Message::Failed { task_id, .. }
            | Message::ApplyTrackedChanges { task_id, .. } => Some(task_id),
            Message::Closed => None,
        }
    }
}

/// The parent's response to one [`Message`]. Presence of `exception` means
/// the parent failed to apply the diff (or, for `Closed`, is never sent).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<RemoteError>,
}

impl Ack {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failed(exception: RemoteError) -> Self {
        Self { exception: Some(exception) }
    }

    pub fn into_result(self) -> Result<(), RemoteError> {
        match self.exception {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
