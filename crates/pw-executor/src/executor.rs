// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parent-side lifecycle (spec.md §4.7): socket setup, worker spawn, task
//! registry, shutdown. Grounded in `oj-daemon`'s startup/spawn shape
//! (`lifecycle/startup.rs`, `adapters/agent/coop/spawn.rs`), adapted to a
//! loopback-only, asymmetric worker protocol instead of a Unix-socket daemon.

use std::io::Write as _;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pw_core::{Task, TaskRegistry, WorkerArgs};
use pw_store::AuthoritativeStore;
use pw_wire::Message;
use tokio::net::{TcpSocket, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::env;
use crate::error::ExecutorError;
use crate::listener::{self, ListenCtx};

/// Path to the worker-entrypoint executable and the interpreter/launcher
/// that runs it, e.g. `("pw-worker-entry", &[])` for a plain binary, or
/// an interpreter plus script path for other embeddings.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }
}

/// Configuration accepted by [`Executor::new`]. Plugin env entries and extra
/// module search directories are opaque to this crate (plugin discovery
/// itself is out of scope, per spec.md §1) — callers populate them from
/// whatever their embedding resolves.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    pub plugin_env: Vec<(String, String)>,
    pub extra_module_paths: Vec<PathBuf>,
}

/// Parent-side lifecycle: binds the loopback listen socket, spawns the
/// listener task, and exposes `submit`/`close`.
pub struct Executor {
    port: u16,
    registry: Arc<TaskRegistry>,
    store: Arc<dyn AuthoritativeStore>,
    worker_command: WorkerCommand,
    config: ExecutorConfig,
    closed: AtomicBool,
    listener_task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Executor {
    /// Bind a loopback TCP socket on an ephemeral port, start the listener
    /// task, and block until it signals startup readiness (spec.md §4.7,
    /// with the 60 s cap from §4.6 enforced here).
    pub async fn new(
        worker_command: WorkerCommand,
        config: ExecutorConfig,
        store: Arc<dyn AuthoritativeStore>,
    ) -> std::io::Result<Self> {
        let addr: SocketAddr = ([127, 0, 0, 1], 0).into();
        let socket = TcpSocket::new_v4()?;
        socket.bind(addr)?;
        let tcp = socket.listen(env::listener_backlog())?;
        let port = tcp.local_addr()?.port();

        let registry = Arc::new(TaskRegistry::new());
        let ctx = Arc::new(ListenCtx::new(Arc::clone(&registry), Arc::clone(&store)));

        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let task = tokio::spawn(listener::run(tcp, ctx, ready_tx));

        tokio::time::timeout(env::startup_timeout(), ready_rx)
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "listener startup signal timed out"))?
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "listener task dropped before signaling readiness"))?;

        info!(port, "executor listening");

        Ok(Self {
            port,
            registry,
            store,
            worker_command,
            config,
            closed: AtomicBool::new(false),
            listener_task: tokio::sync::Mutex::new(Some(task)),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn AuthoritativeStore> {
        &self.store
    }

    /// Register the task, write its arguments file, and spawn a worker
    /// process inheriting the parent's environment plus plugin-specific and
    /// extra-module-path additions (spec.md §4.7, §6).
    pub async fn submit(&self, task: Task) -> Result<(), ExecutorError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ExecutorError::Closed);
        }

        let args = WorkerArgs {
            task_id: task.id.clone(),
            implementation: task.implementation.clone(),
            operation_inputs: task.inputs.clone(),
            port: self.port,
            context: task.context.clone(),
        };

        // Registry insertion must happen only once the worker is actually
        // spawned: spec.md §3's registry invariant ("a task is present iff
        // the parent expects further messages referencing it") and §4.6's
        // spawn-failure state transition both require that a tempfile or
        // spawn failure never leaves an orphaned entry behind.
        let mut file = tempfile::NamedTempFile::new().map_err(ExecutorError::ArgsFile)?;
        let bytes = serde_json::to_vec(&args)?;
        file.write_all(&bytes).map_err(ExecutorError::ArgsFile)?;
        let (_file, path) = file.keep().map_err(|e| ExecutorError::ArgsFile(e.error))?;

        let mut command = tokio::process::Command::new(&self.worker_command.program);
        command.args(&self.worker_command.args).arg(&path);
        command.envs(std::env::vars());
        for (key, value) in &self.config.plugin_env {
            command.env(key, value);
        }
        if !self.config.extra_module_paths.is_empty() {
            let joined = std::env::join_paths(&self.config.extra_module_paths)
                .map(|os| os.to_string_lossy().into_owned())
                .unwrap_or_default();
            command.env(env::EXTRA_MODULE_PATH_VAR, joined);
        }
        command.stdin(std::process::Stdio::null());

        command.spawn().map_err(ExecutorError::Spawn)?;
        self.registry.insert(task);
        Ok(())
    }

    /// Idempotent: set the closed flag, wake the listener with a self-sent
    /// `Closed` frame, and join the listener task (capped per spec.md §5).
    /// Does not wait for outstanding tasks.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Err(e) = send_closed_frame(self.port).await {
            warn!(error = %e, "failed to self-signal listener shutdown");
        }

        let handle = self.listener_task.lock().await.take();
        if let Some(handle) = handle {
            match tokio::time::timeout(env::shutdown_join(), handle).await {
                Ok(Ok(())) => debug!("listener task joined"),
                Ok(Err(e)) => warn!(error = %e, "listener task panicked"),
                Err(_) => warn!("timed out waiting for listener task to join"),
            }
        }
    }
}

async fn send_closed_frame(port: u16) -> Result<(), pw_wire::ProtocolError> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await?;
    pw_wire::write_value(&mut stream, &Message::Closed).await?;
    let _ack: pw_wire::Ack = pw_wire::read_value(&mut stream).await?;
    Ok(())
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
