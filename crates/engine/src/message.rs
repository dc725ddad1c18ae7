// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire DTOs for the two queues the broker consumes.

use operandi_core::{JobId, WorkflowId, WorkspaceId};
use serde::Deserialize;

/// Body published to `harvester_queue`/`users_queue`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionMessage {
    pub workflow_id: WorkflowId,
    pub workspace_id: WorkspaceId,
    pub job_id: JobId,
}

/// Body published to `job_statuses_queue`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusProbe {
    pub job_id: JobId,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
