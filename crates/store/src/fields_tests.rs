// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn map(pairs: &[(&str, serde_json::Value)]) -> FieldMap {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn accepts_known_fields() {
    let fields = map(&[("state", json!("READY"))]);
    assert!(validate_update("workspace", &["state", "deleted"], "workspace_id", &fields).is_ok());
}

#[test]
fn rejects_unknown_field() {
    let fields = map(&[("nonexistent", json!(true))]);
    let err = validate_update("workspace", &["state"], "workspace_id", &fields).unwrap_err();
    assert!(matches!(err, StoreError::UnknownField { .. }));
}

#[test]
fn rejects_primary_id_mutation() {
    let fields = map(&[("workspace_id", json!("ws-2"))]);
    let err = validate_update("workspace", &["workspace_id", "state"], "workspace_id", &fields)
        .unwrap_err();
    assert!(matches!(err, StoreError::ImmutableField { .. }));
}
