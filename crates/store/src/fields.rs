// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Field-level update validation shared by every backend: `update` rejects
//! keys not in the entity's schema and rejects mutation of the primary id.

use crate::StoreError;
use std::collections::HashMap;

/// A partial update payload: field name → new value. Kept as JSON values
/// at the trait boundary so both the synchronous (worker) and asynchronous
/// (REST) call paths can build one the same way.
pub type FieldMap = HashMap<String, serde_json::Value>;

/// Rejects any key not in `allowed`, and any attempt to touch
/// `primary_id_field`.
pub fn validate_update(
    entity: &'static str,
    allowed: &[&'static str],
    primary_id_field: &str,
    fields: &FieldMap,
) -> Result<(), StoreError> {
    for key in fields.keys() {
        if key == primary_id_field {
            return Err(StoreError::immutable_field(entity, key.clone()));
        }
        if !allowed.contains(&key.as_str()) {
            return Err(StoreError::unknown_field(entity, key.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "fields_tests.rs"]
mod tests;
