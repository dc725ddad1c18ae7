// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small helper shared by the consumer and status-checker pipelines.

use operandi_store::FieldMap;

/// Builds a single-field update payload.
pub fn field(name: &str, value: impl serde::Serialize) -> FieldMap {
    let mut fields = FieldMap::new();
    #[allow(clippy::unwrap_used)]
    fields.insert(name.to_string(), serde_json::to_value(value).unwrap());
    fields
}
