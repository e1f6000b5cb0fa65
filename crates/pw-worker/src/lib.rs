// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side half of the protocol: the [`Messenger`] client and the
//! entrypoint a spawned worker process runs (spec.md §4.2, §4.5).
//!
//! This crate has no executable logic of its own beyond what `bin/pw-worker-entry.rs`
//! wires together — embeddings that need a different `ContextBuilder` or a
//! richer `ImplementationRegistry` link against this library directly
//! instead of the binary.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod entrypoint;
pub mod messenger;

pub use entrypoint::{
    args_path_from_argv, run, ContextBuilder, DecorationHook, ExecutionContext, ExitOutcome, ImplementationRegistry,
    PassthroughContextBuilder, TaskFn, WorkerConfig,
};
pub use messenger::{Messenger, MessengerError};
