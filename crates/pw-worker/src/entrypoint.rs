// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker entrypoint (spec.md §4.5): deserialize the task context, install
//! instrumentation, run the task body, report the outcome.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use pw_core::{ContextBlob, InstrumentationRegistry, RemoteError, WorkerArgs};
use pw_instrument::{ChangeTransport, InMemorySink, InstrumentationScope, WorkerSession};

use crate::messenger::{Messenger, MessengerError};

/// The reconstructed execution context handed to a task body. The real
/// class/state reconstruction this wraps (`context_cls` resolution against
/// the ORM/workflow engine) is out of scope for this workspace (spec.md
/// §1); a [`ContextBuilder`] is the seam an embedding application plugs
/// into.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub context_cls: String,
    pub state: serde_json::Value,
}

/// Reconstructs an [`ExecutionContext`] from its wire blob. Fallible:
/// spec.md §4.5 step 3 requires a reconstruction failure to be reported as
/// `failed(..., tracked_changes=null, new_instances=null)`.
pub trait ContextBuilder: Send + Sync {
    fn build(&self, blob: &ContextBlob) -> Result<ExecutionContext, RemoteError>;
}

/// Reference [`ContextBuilder`]: the blob's state is the context, verbatim.
/// Used by tests and by embeddings that have no richer context class to
/// reconstruct.
pub struct PassthroughContextBuilder;

impl ContextBuilder for PassthroughContextBuilder {
    fn build(&self, blob: &ContextBlob) -> Result<ExecutionContext, RemoteError> {
        Ok(ExecutionContext { context_cls: blob.context_cls.clone(), state: blob.state.clone() })
    }
}

/// A resolved task body's future. Boxed for the same reason
/// `ChangeTransport::send_diff` is: a trait object can't return `impl
/// Future` directly.
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send>>;

/// One resolved task body: given the reconstructed context, the worker
/// session the body must route all persistence through, and its input
/// bindings, run the user's logic. Async, and taking owned `Arc`s rather
/// than borrows, so the body's future can be driven inside a spawned task
/// (spec.md §4.5 step 6: "an unhandled exception in the body becomes a
/// `failed` report rather than crashing the worker process") — a `tokio`
/// task boundary is what lets an in-body panic be caught here the same way
/// an OS-level fault would be, without `catch_unwind`'s restriction against
/// unwinding across an `.await` point.
pub type TaskFn = Arc<dyn Fn(Arc<ExecutionContext>, Arc<WorkerSession<InMemorySink>>, Arc<BTreeMap<String, serde_json::Value>>) -> TaskFuture + Send + Sync>;

/// A hook applied to every resolved [`TaskFn`] in declaration order before
/// invocation (spec.md §4.5 step 5: "apply any registered decoration hooks
/// in declaration order"). Generalizes the original's plugin decoration
/// point (`process_executor.decorate()`).
pub type DecorationHook = Box<dyn Fn(TaskFn) -> TaskFn + Send + Sync>;

/// Maps a callable descriptor string (module path + attribute, e.g.
/// `"pkg.mod:run_task"`) to its [`TaskFn`]. Resolving the descriptor from
/// an actual module system is out of scope (spec.md §1); callers populate
/// this registry however their embedding discovers task implementations.
#[derive(Default)]
pub struct ImplementationRegistry {
    implementations: HashMap<String, TaskFn>,
}

impl ImplementationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, descriptor: impl Into<String>, body: TaskFn) -> Self {
        self.implementations.insert(descriptor.into(), body);
        self
    }

    pub fn resolve(&self, descriptor: &str) -> Option<TaskFn> {
        self.implementations.get(descriptor).cloned()
    }
}

/// Everything the worker entrypoint needs besides the arguments file itself.
pub struct WorkerConfig {
    pub implementations: ImplementationRegistry,
    pub context_builder: Arc<dyn ContextBuilder>,
    pub decorations: Vec<DecorationHook>,
    pub instrumentation_registry: &'static InstrumentationRegistry,
}

/// How the worker process's `main` should exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Succeeded,
    Failed,
}

/// Runs spec.md §4.5 steps 1-8. Returns the outcome for `main` to map to a
/// process exit code; never panics past this boundary (step 7: "do not
/// re-raise past the worker boundary").
pub async fn run(args_path: &Path, config: &WorkerConfig) -> ExitOutcome {
    let args = match read_and_delete_args(args_path) {
        Ok(args) => args,
        Err(e) => {
            tracing::error!(error = %e, path = %args_path.display(), "failed to read worker arguments file");
            return ExitOutcome::Failed;
        }
    };

    let messenger = Messenger::new(args.port, args.task_id.clone());

    let context = match config.context_builder.build(&args.context) {
        Ok(ctx) => ctx,
        Err(e) => {
            report_failed(&messenger, Default::default(), e).await;
            return ExitOutcome::Failed;
        }
    };

    let sink = Arc::new(InMemorySink::new());
    let transport: Arc<dyn ChangeTransport> = Arc::new(messenger.clone());
    let scope = InstrumentationScope::enter_with_transport(Arc::clone(&sink), config.instrumentation_registry, transport);
    let session = scope.session();

    if let Err(e) = messenger.started().await {
        tracing::error!(error = %e, "failed to notify parent of task start");
        drop(scope);
        return ExitOutcome::Failed;
    }

    let outcome = run_task_body(&args, Arc::new(context), &config.implementations, &config.decorations, Arc::clone(&session)).await;
    let diff = session.commit();
    drop(scope);

    match outcome {
        Ok(()) => {
            if let Err(MessengerError::Remote(e)) = messenger.succeeded(diff).await {
                tracing::error!(error = %e, "parent failed to apply succeeded diff");
                return ExitOutcome::Failed;
            }
            ExitOutcome::Succeeded
        }
        Err(exception) => {
            report_failed(&messenger, diff, exception).await;
            ExitOutcome::Failed
        }
    }
}

async fn report_failed(messenger: &Messenger, diff: pw_core::TrackedChanges, exception: RemoteError) {
    if let Err(MessengerError::Remote(apply_err)) = messenger.failed(diff, exception).await {
        tracing::error!(error = %apply_err, "parent failed to apply diff while reporting task failure");
    }
}

async fn run_task_body(
    args: &WorkerArgs,
    context: Arc<ExecutionContext>,
    implementations: &ImplementationRegistry,
    decorations: &[DecorationHook],
    session: Arc<WorkerSession<InMemorySink>>,
) -> Result<(), RemoteError> {
    let mut body = implementations
        .resolve(&args.implementation)
        .ok_or_else(|| RemoteError::new("LookupError", format!("no implementation registered for {}", args.implementation)))?;

    for decorate in decorations {
        body = decorate(body);
    }

    let inputs = Arc::new(args.operation_inputs.clone());
    let future = body(context, session, inputs);
    match tokio::spawn(future).await {
        Ok(result) => result,
        Err(join_err) => Err(RemoteError::new("PanicError", describe_panic(join_err))),
    }
}

fn describe_panic(join_err: tokio::task::JoinError) -> String {
    if !join_err.is_panic() {
        return "task body was cancelled".to_string();
    }
    let payload = join_err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task body panicked".to_string()
    }
}

fn read_and_delete_args(path: &Path) -> std::io::Result<WorkerArgs> {
    let bytes = std::fs::read(path)?;
    let args: WorkerArgs = serde_json::from_slice(&bytes).map_err(std::io::Error::other)?;
    let _ = std::fs::remove_file(path);
    Ok(args)
}

/// Read the arguments-file path from `argv[1]`, per spec.md §6's worker
/// invocation contract.
pub fn args_path_from_argv() -> Option<std::path::PathBuf> {
    std::env::args_os().nth(1).map(std::path::PathBuf::from)
}

#[cfg(test)]
#[path = "entrypoint_tests.rs"]
mod tests;
