// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn sample_task(id: &str) -> Task {
    Task {
        id: TaskId::new(id),
        implementation: "pkg.mod.run".to_string(),
        inputs: BTreeMap::from([("x".to_string(), json!(1))]),
        plugin: None,
        context: ContextBlob { context_cls: "pkg.Context".to_string(), state: json!({}) },
    }
}

#[test]
fn insert_makes_task_active_and_submitted() {
    let registry = TaskRegistry::new();
    registry.insert(sample_task("t1"));

    let id = TaskId::new("t1");
    assert!(registry.contains(&id));
    assert_eq!(registry.status(&id), Some(TaskStatus::Submitted));
    assert_eq!(registry.active_len(), 1);
}

#[test]
fn mark_running_updates_status_without_removing() {
    let registry = TaskRegistry::new();
    registry.insert(sample_task("t1"));
    let id = TaskId::new("t1");

    registry.mark_running(&id);

    assert!(registry.contains(&id));
    assert_eq!(registry.status(&id), Some(TaskStatus::Running));
}

#[test]
fn remove_clears_active_presence_but_retains_status_after_set() {
    let registry = TaskRegistry::new();
    registry.insert(sample_task("t1"));
    let id = TaskId::new("t1");

    let removed = registry.remove(&id);
    assert!(removed.is_some());
    assert_eq!(removed.unwrap().id, id);
    assert!(!registry.contains(&id));

    registry.set_status(&id, TaskStatus::Succeeded);
    assert_eq!(registry.status(&id), Some(TaskStatus::Succeeded));
    assert!(registry.is_empty());
}

#[test]
fn failed_status_carries_exception() {
    let registry = TaskRegistry::new();
    registry.insert(sample_task("t1"));
    let id = TaskId::new("t1");
    registry.remove(&id);

    let exception = RemoteError::new("ValueError", "bad input");
    registry.set_status(&id, TaskStatus::Failed { exception: exception.clone() });

    match registry.status(&id) {
        Some(TaskStatus::Failed { exception: got }) => assert_eq!(got, exception),
        other => panic!("expected Failed status, got {other:?}"),
    }
}

#[test]
fn remove_of_unknown_task_is_none() {
    let registry = TaskRegistry::new();
    assert!(registry.remove(&TaskId::new("ghost")).is_none());
}

#[test]
fn status_of_unknown_task_is_none() {
    let registry = TaskRegistry::new();
    assert_eq!(registry.status(&TaskId::new("ghost")), None);
}

#[test]
fn multiple_tasks_tracked_independently() {
    let registry = TaskRegistry::new();
    registry.insert(sample_task("a"));
    registry.insert(sample_task("b"));
    assert_eq!(registry.active_len(), 2);

    registry.remove(&TaskId::new("a"));
    assert_eq!(registry.active_len(), 1);
    assert!(registry.contains(&TaskId::new("b")));
    assert!(!registry.contains(&TaskId::new("a")));
}
