// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use pw_core::{ContextBlob, ModelName, TaskId, WorkerArgs, DEMO_REGISTRY};
use pw_wire::{read_value, write_value, Ack, Message};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use super::*;

/// Spawns a fake parent that accepts connections until the channel's sender
/// is dropped by the caller after the expected number of messages; records
/// every message it receives and always acks with `Ack::ok()`.
async fn fake_parent() -> (u16, mpsc::UnboundedReceiver<Message>) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { return };
            let Ok(message) = read_value::<Message, _>(&mut stream).await else { continue };
            let _ = write_value(&mut stream, &Ack::ok()).await;
            if tx.send(message).is_err() {
                return;
            }
        }
    });
    (port, rx)
}

fn write_args(dir: &tempfile::TempDir, args: &WorkerArgs) -> std::path::PathBuf {
    let path = dir.path().join("args.json");
    std::fs::write(&path, serde_json::to_vec(args).unwrap()).unwrap();
    path
}

fn base_args(port: u16) -> WorkerArgs {
    WorkerArgs {
        task_id: TaskId::new("t1"),
        implementation: "demo:set_state".to_string(),
        operation_inputs: Default::default(),
        port,
        context: ContextBlob { context_cls: "Ctx".to_string(), state: serde_json::json!({}) },
    }
}

fn config_with(implementations: ImplementationRegistry) -> WorkerConfig {
    WorkerConfig {
        implementations,
        context_builder: Arc::new(PassthroughContextBuilder),
        decorations: Vec::new(),
        instrumentation_registry: &DEMO_REGISTRY,
    }
}

#[tokio::test]
async fn happy_path_reports_started_then_succeeded_with_diff() {
    let (port, mut rx) = fake_parent().await;
    let args = base_args(port);
    let dir = tempfile::tempdir().unwrap();
    let path = write_args(&dir, &args);

    let body: TaskFn = Arc::new(|_ctx, session, _inputs| {
        Box::pin(async move {
            session.set(&ModelName::new("node"), &pw_core::EntityId::new("n1"), "state", serde_json::json!("started"));
            Ok(())
        })
    });
    let config = config_with(ImplementationRegistry::new().register("demo:set_state", body));

    let outcome = run(&path, &config).await;
    assert_eq!(outcome, ExitOutcome::Succeeded);
    assert!(!path.exists(), "worker must delete the arguments file after reading it");

    let started = rx.recv().await.unwrap();
    assert!(matches!(started, Message::Started { .. }));
    match rx.recv().await.unwrap() {
        Message::Succeeded { tracked_changes, .. } => {
            assert_eq!(
                tracked_changes.modified[&ModelName::new("node")][&pw_core::EntityId::new("n1")]["state"],
                pw_core::AttributeDiff::Scalar(pw_core::TrackedValue::set(serde_json::json!("started")))
            );
        }
        other => panic!("expected Succeeded, got {other:?}"),
    }
}

#[tokio::test]
async fn mid_task_commit_flushes_and_final_state_wins() {
    let (port, mut rx) = fake_parent().await;
    let args = base_args(port);
    let dir = tempfile::tempdir().unwrap();
    let path = write_args(&dir, &args);

    let body: TaskFn = Arc::new(|_ctx, session, _inputs| {
        Box::pin(async move {
            let model = ModelName::new("node");
            let id = pw_core::EntityId::new("n1");
            session.set(&model, &id, "state", serde_json::json!("a"));
            session.flush().await?;
            session.set(&model, &id, "state", serde_json::json!("b"));
            Ok(())
        })
    });
    let config = config_with(ImplementationRegistry::new().register("demo:set_state", body));

    let outcome = run(&path, &config).await;
    assert_eq!(outcome, ExitOutcome::Succeeded);

    assert!(matches!(rx.recv().await.unwrap(), Message::Started { .. }));

    // The mid-task flush must reach the parent as its own apply, distinct
    // from the terminal `Succeeded` message (spec.md §4.2/§4.3's "parent
    // sees two applies" round trip), not just fold into the final state.
    match rx.recv().await.unwrap() {
        Message::ApplyTrackedChanges { tracked_changes, .. } => {
            let value = &tracked_changes.modified[&ModelName::new("node")][&pw_core::EntityId::new("n1")]["state"];
            match value {
                pw_core::AttributeDiff::Scalar(tv) => assert_eq!(tv.current, serde_json::json!("a")),
                other => panic!("expected scalar, got {other:?}"),
            }
        }
        other => panic!("expected ApplyTrackedChanges, got {other:?}"),
    }

    match rx.recv().await.unwrap() {
        Message::Succeeded { tracked_changes, .. } => {
            let value = &tracked_changes.modified[&ModelName::new("node")][&pw_core::EntityId::new("n1")]["state"];
            match value {
                pw_core::AttributeDiff::Scalar(tv) => assert_eq!(tv.current, serde_json::json!("b")),
                other => panic!("expected scalar, got {other:?}"),
            }
        }
        other => panic!("expected Succeeded, got {other:?}"),
    }
}

#[tokio::test]
async fn task_body_error_is_reported_as_failed_with_in_flight_diff() {
    let (port, mut rx) = fake_parent().await;
    let args = base_args(port);
    let dir = tempfile::tempdir().unwrap();
    let path = write_args(&dir, &args);

    let body: TaskFn = Arc::new(|_ctx, session, _inputs| {
        Box::pin(async move {
            session.set(&ModelName::new("node"), &pw_core::EntityId::new("n1"), "state", serde_json::json!("partial"));
            Err(RemoteError::new("ValueError", "boom"))
        })
    });
    let config = config_with(ImplementationRegistry::new().register("demo:set_state", body));

    let outcome = run(&path, &config).await;
    assert_eq!(outcome, ExitOutcome::Failed);

    assert!(matches!(rx.recv().await.unwrap(), Message::Started { .. }));
    match rx.recv().await.unwrap() {
        Message::Failed { exception, tracked_changes, .. } => {
            assert_eq!(exception.type_name, "ValueError");
            assert!(!tracked_changes.is_empty(), "in-flight diff before the raise is still shipped");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_implementation_fails_without_invoking_anything() {
    let (port, mut rx) = fake_parent().await;
    let mut args = base_args(port);
    args.implementation = "demo:does_not_exist".to_string();
    let dir = tempfile::tempdir().unwrap();
    let path = write_args(&dir, &args);

    let config = config_with(ImplementationRegistry::new());
    let outcome = run(&path, &config).await;
    assert_eq!(outcome, ExitOutcome::Failed);

    assert!(matches!(rx.recv().await.unwrap(), Message::Started { .. }));
    match rx.recv().await.unwrap() {
        Message::Failed { exception, .. } => assert_eq!(exception.type_name, "LookupError"),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn context_reconstruction_failure_short_circuits_before_started() {
    struct AlwaysFails;
    impl ContextBuilder for AlwaysFails {
        fn build(&self, _blob: &ContextBlob) -> Result<ExecutionContext, RemoteError> {
            Err(RemoteError::new("ImportError", "no such context class"))
        }
    }

    let (port, mut rx) = fake_parent().await;
    let args = base_args(port);
    let dir = tempfile::tempdir().unwrap();
    let path = write_args(&dir, &args);

    let config = WorkerConfig {
        implementations: ImplementationRegistry::new(),
        context_builder: Arc::new(AlwaysFails),
        decorations: Vec::new(),
        instrumentation_registry: &DEMO_REGISTRY,
    };

    let outcome = run(&path, &config).await;
    assert_eq!(outcome, ExitOutcome::Failed);

    match rx.recv().await.unwrap() {
        Message::Failed { exception, tracked_changes, .. } => {
            assert_eq!(exception.type_name, "ImportError");
            assert!(tracked_changes.is_empty());
        }
        other => panic!("expected Failed without a prior Started, got {other:?}"),
    }
}

#[tokio::test]
async fn decoration_hooks_apply_in_declaration_order() {
    let (port, mut rx) = fake_parent().await;
    let args = base_args(port);
    let dir = tempfile::tempdir().unwrap();
    let path = write_args(&dir, &args);

    let body: TaskFn = Arc::new(|_ctx, session, _inputs| {
        Box::pin(async move {
            session.set(&ModelName::new("node"), &pw_core::EntityId::new("n1"), "state", serde_json::json!("inner"));
            Ok(())
        })
    });

    let order: Arc<std::sync::Mutex<Vec<&'static str>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
    let order_a = Arc::clone(&order);
    let order_b = Arc::clone(&order);
    let decorations: Vec<DecorationHook> = vec![
        Box::new(move |inner: TaskFn| {
            let order_a = Arc::clone(&order_a);
            Arc::new(move |ctx, session, inputs| {
                order_a.lock().unwrap().push("first");
                inner(ctx, session, inputs)
            })
        }),
        Box::new(move |inner: TaskFn| {
            let order_b = Arc::clone(&order_b);
            Arc::new(move |ctx, session, inputs| {
                order_b.lock().unwrap().push("second");
                inner(ctx, session, inputs)
            })
        }),
    ];

    let config = WorkerConfig {
        implementations: ImplementationRegistry::new().register("demo:set_state", body),
        context_builder: Arc::new(PassthroughContextBuilder),
        decorations,
        instrumentation_registry: &DEMO_REGISTRY,
    };

    let outcome = run(&path, &config).await;
    assert_eq!(outcome, ExitOutcome::Succeeded);
    assert!(matches!(rx.recv().await.unwrap(), Message::Started { .. }));
    assert!(matches!(rx.recv().await.unwrap(), Message::Succeeded { .. }));
    assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
}
