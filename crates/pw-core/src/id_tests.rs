// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

#[test]
fn define_str_id_hash_map_lookup() {
    let mut map = HashMap::new();
    map.insert(ModelName::new("node"), 42);
    assert_eq!(map.get("node"), Some(&42));
}

#[test]
fn define_str_id_display_roundtrip() {
    let id = EntityId::new("abc-123");
    assert_eq!(id.to_string(), "abc-123");
    assert_eq!(id.as_str(), "abc-123");
}

#[test]
fn temp_id_nth_formats_with_prefix() {
    assert_eq!(TempId::nth(0).as_str(), "NEW_INSTANCE_0");
    assert_eq!(TempId::nth(7).as_str(), "NEW_INSTANCE_7");
}

#[test]
fn define_str_id_serde_roundtrip() {
    let id = TaskId::new("task-1");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"task-1\"");
    let back: TaskId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
