// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WorkflowJob entity: one execution of a [`crate::Workflow`] against a
//! [`crate::Workspace`], and its state machine.

use crate::id::{JobId, SlurmJobId, WorkflowId, WorkspaceId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// State machine driven by the status-checker worker.
///
/// `Success`, `Failed`, and `Cancelled` are terminal: once entered, no
/// further transition is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Unset,
    Queued,
    Pending,
    Running,
    TransferringToHpc,
    TransferringFromHpc,
    Success,
    Failed,
    Cancelled,
}

impl JobState {
    /// Terminal states admit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Success | JobState::Failed | JobState::Cancelled)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Unset => "UNSET",
            JobState::Queued => "QUEUED",
            JobState::Pending => "PENDING",
            JobState::Running => "RUNNING",
            JobState::TransferringToHpc => "TRANSFERRING_TO_HPC",
            JobState::TransferringFromHpc => "TRANSFERRING_FROM_HPC",
            JobState::Success => "SUCCESS",
            JobState::Failed => "FAILED",
            JobState::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

/// One execution of a workflow against a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub job_id: JobId,
    pub job_dir: PathBuf,
    pub job_state: JobState,
    pub workflow_id: WorkflowId,
    pub workspace_id: WorkspaceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hpc_slurm_job_id: Option<SlurmJobId>,
}

impl WorkflowJob {
    pub fn new(
        job_id: JobId,
        job_dir: PathBuf,
        workflow_id: WorkflowId,
        workspace_id: WorkspaceId,
    ) -> Self {
        Self {
            job_id,
            job_dir,
            job_state: JobState::Unset,
            workflow_id,
            workspace_id,
            hpc_slurm_job_id: None,
        }
    }

    /// No transition out of a terminal state is ever permitted. Callers
    /// should check this before writing `job_state`; it is also enforced
    /// again at the reconciliation layer (`operandi-engine`) so a stale
    /// in-memory snapshot can't bypass it.
    pub fn may_transition_to(&self, next: JobState) -> bool {
        !self.job_state.is_terminal() || self.job_state == next
    }

    pub const UPDATABLE_FIELDS: &'static [&'static str] =
        &["job_dir", "job_state", "workflow_id", "workspace_id", "hpc_slurm_job_id"];
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
