// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow entity: a Nextflow-style script plus metadata.

use crate::id::WorkflowId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A parameterized OCR script executed against a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub workflow_id: WorkflowId,
    pub workflow_dir: PathBuf,
    pub workflow_script_path: PathBuf,
    pub workflow_script_base: String,
    #[serde(default)]
    pub deleted: bool,
}

impl Workflow {
    pub fn new(
        workflow_id: WorkflowId,
        workflow_dir: PathBuf,
        workflow_script_path: PathBuf,
        workflow_script_base: impl Into<String>,
    ) -> Self {
        Self {
            workflow_id,
            workflow_dir,
            workflow_script_path,
            workflow_script_base: workflow_script_base.into(),
            deleted: false,
        }
    }

    /// `create` is idempotent-by-id (insert-or-replace); every other field
    /// is freely updatable.
    pub const UPDATABLE_FIELDS: &'static [&'static str] = &[
        "workflow_dir",
        "workflow_script_path",
        "workflow_script_base",
        "deleted",
    ];
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
