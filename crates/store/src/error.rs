// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors surfaced by the state store.
///
/// `Transient` covers network blips and DB timeouts (retried with backoff
/// by the caller); every other variant is a permanent classification the
/// caller maps directly onto a poison-ack or worker exit.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no {entity} document with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("field {field:?} is not part of the {entity} schema")]
    UnknownField { entity: &'static str, field: String },

    #[error("field {field:?} is immutable on {entity}")]
    ImmutableField { entity: &'static str, field: String },

    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("failed to encode {entity} field for storage: {source}")]
    Codec {
        entity: &'static str,
        #[source]
        source: bson::ser::Error,
    },
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound { entity, id: id.into() }
    }

    pub fn unknown_field(entity: &'static str, field: impl Into<String>) -> Self {
        StoreError::UnknownField { entity, field: field.into() }
    }

    pub fn immutable_field(entity: &'static str, field: impl Into<String>) -> Self {
        StoreError::ImmutableField { entity, field: field.into() }
    }

    /// Transient-vs-permanent classification driving the caller's retry
    /// policy.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}
