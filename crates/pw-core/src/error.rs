// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-safe representation of an arbitrary user exception (DESIGN NOTES §9).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A serializable stand-in for an opaque exception raised in a worker's
/// task body (or encountered applying a diff).
///
/// No attempt is made to reconstruct native error identity on the far side
/// — only the message and traceback are surfaced, per DESIGN NOTES §9.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    pub type_name: String,
    pub message: String,
    #[serde(default)]
    pub traceback: String,
    #[serde(default)]
    pub cause: Option<Box<RemoteError>>,
}

impl RemoteError {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), message: message.into(), traceback: String::new(), cause: None }
    }

    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = traceback.into();
        self
    }

    pub fn with_cause(mut self, cause: RemoteError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Wrap any std error as a `RemoteError`, using its `Display` as the
    /// message and the type name given by the caller (Rust has no runtime
    /// type-name-of-a-trait-object equivalent to Python's exception class
    /// name, so callers supply one).
    pub fn wrap(type_name: impl Into<String>, err: &(dyn std::error::Error)) -> Self {
        Self::new(type_name, err.to_string())
    }

    /// Compose this error as the cause of a new error describing a
    /// higher-level failure (used when an apply error occurs while
    /// reporting an already-failed task, per spec.md §7).
    pub fn compose(outer_message: impl Into<String>, cause: RemoteError) -> Self {
        Self::new("CompositeError", outer_message).with_cause(cause)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " (caused by {cause})")?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
