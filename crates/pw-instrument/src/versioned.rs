// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opt-in trait for entities carrying an optimistic-concurrency column.

/// Implemented by tracked entity types that carry a `version` column. Not
/// every tracked entity needs one — only those the applier checks for a
/// lost update.
pub trait Versioned {
    fn version(&self) -> Option<i64>;
}
