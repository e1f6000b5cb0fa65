// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker process entrypoint (spec.md §4.5, §6): `pw-worker-entry
//! <arguments-file-path>`.
//!
//! This binary installs the reference [`InMemorySink`](pw_instrument::InMemorySink)
//! and a [`PassthroughContextBuilder`]; an embedding that needs to resolve
//! `implementation` descriptors against real task bodies links `pw-worker`
//! as a library and builds its own `main` around [`pw_worker::run`] with a
//! populated [`ImplementationRegistry`] instead of using this binary as-is.

use std::process::ExitCode;

use pw_core::DEMO_REGISTRY;
use pw_worker::{args_path_from_argv, run, ExitOutcome, ImplementationRegistry, PassthroughContextBuilder, WorkerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let Some(args_path) = args_path_from_argv() else {
        tracing::error!("usage: pw-worker-entry <arguments-file-path>");
        return ExitCode::FAILURE;
    };

    let config = WorkerConfig {
        implementations: ImplementationRegistry::new(),
        context_builder: std::sync::Arc::new(PassthroughContextBuilder),
        decorations: Vec::new(),
        instrumentation_registry: &DEMO_REGISTRY,
    };

    match run(&args_path, &config).await {
        ExitOutcome::Succeeded => ExitCode::SUCCESS,
        ExitOutcome::Failed => ExitCode::FAILURE,
    }
}
