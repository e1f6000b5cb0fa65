// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the executor crate, grounded
//! in `oj-daemon::env.rs`'s "one function per knob, parse-or-default" shape.

use std::time::Duration;

/// Bounds every frame read/write over the parent<->worker socket.
pub fn ipc_timeout() -> Duration {
    std::env::var("PW_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// TCP listen backlog for the executor's loopback socket (spec.md §4.7: "≥ 10").
pub fn listener_backlog() -> u32 {
    std::env::var("PW_LISTENER_BACKLOG").ok().and_then(|s| s.parse::<u32>().ok()).unwrap_or(16)
}

/// Cap on how long `close()` waits for the listener task to join (spec.md §5: "60 s cap").
pub fn shutdown_join() -> Duration {
    std::env::var("PW_SHUTDOWN_JOIN_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(60))
}

/// Cap on how long the executor constructor waits for the listener's startup
/// readiness signal (spec.md §4.6: "construction blocks for up to 60 s").
pub fn startup_timeout() -> Duration {
    std::env::var("PW_STARTUP_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(60))
}

/// Colon-joined extra module search path variable forwarded to workers,
/// built from the executor's configured extra directories (spec.md §6).
pub const EXTRA_MODULE_PATH_VAR: &str = "PW_EXTRA_PATH";
