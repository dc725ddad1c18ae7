// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HPCSlurmJob entity and the authoritative SLURM → Job state mapping
//! table.

use crate::id::{JobId, SlurmJobId};
use crate::job::JobState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The raw state string a SLURM-like scheduler reports for a job.
///
/// Kept as a closed enum (rather than a bare `String`) so
/// [`map_slurm_to_job`] can be checked for totality over every variant the
/// scheduler is known to emit; an `Other` catch-all absorbs anything new
/// without panicking the status checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlurmState {
    Pending,
    Configuring,
    Running,
    Completing,
    Completed,
    Failed,
    NodeFail,
    BootFail,
    Deadline,
    OutOfMemory,
    Timeout,
    Cancelled,
    Preempted,
    Revoked,
    Unknown,
}

impl SlurmState {
    /// All variants the mapping table and its property tests iterate over.
    pub const ALL: &'static [SlurmState] = &[
        SlurmState::Pending,
        SlurmState::Configuring,
        SlurmState::Running,
        SlurmState::Completing,
        SlurmState::Completed,
        SlurmState::Failed,
        SlurmState::NodeFail,
        SlurmState::BootFail,
        SlurmState::Deadline,
        SlurmState::OutOfMemory,
        SlurmState::Timeout,
        SlurmState::Cancelled,
        SlurmState::Preempted,
        SlurmState::Revoked,
        SlurmState::Unknown,
    ];

    /// Parses the token `sacct`/`squeue` print for job state. Unrecognized
    /// tokens map to `Unknown` rather than failing — an HPC gateway query
    /// must never error just because the scheduler added a new state name.
    pub fn parse(raw: &str) -> SlurmState {
        match raw.trim() {
            "PENDING" => SlurmState::Pending,
            "CONFIGURING" => SlurmState::Configuring,
            "RUNNING" => SlurmState::Running,
            "COMPLETING" => SlurmState::Completing,
            "COMPLETED" => SlurmState::Completed,
            "FAILED" => SlurmState::Failed,
            "NODE_FAIL" => SlurmState::NodeFail,
            "BOOT_FAIL" => SlurmState::BootFail,
            "DEADLINE" => SlurmState::Deadline,
            "OUT_OF_MEMORY" => SlurmState::OutOfMemory,
            "TIMEOUT" => SlurmState::Timeout,
            "CANCELLED" => SlurmState::Cancelled,
            "PREEMPTED" => SlurmState::Preempted,
            "REVOKED" => SlurmState::Revoked,
            _ => SlurmState::Unknown,
        }
    }
}

impl fmt::Display for SlurmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlurmState::Pending => "PENDING",
            SlurmState::Configuring => "CONFIGURING",
            SlurmState::Running => "RUNNING",
            SlurmState::Completing => "COMPLETING",
            SlurmState::Completed => "COMPLETED",
            SlurmState::Failed => "FAILED",
            SlurmState::NodeFail => "NODE_FAIL",
            SlurmState::BootFail => "BOOT_FAIL",
            SlurmState::Deadline => "DEADLINE",
            SlurmState::OutOfMemory => "OUT_OF_MEMORY",
            SlurmState::Timeout => "TIMEOUT",
            SlurmState::Cancelled => "CANCELLED",
            SlurmState::Preempted => "PREEMPTED",
            SlurmState::Revoked => "REVOKED",
            SlurmState::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

/// Shadow of a remote SLURM job; `workflow_job_id` is a unique back-ref —
/// a WorkflowJob owns exactly one HPCSlurmJob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HpcSlurmJob {
    pub hpc_slurm_job_id: SlurmJobId,
    pub workflow_job_id: JobId,
    pub hpc_slurm_job_state: SlurmState,
}

impl HpcSlurmJob {
    pub fn new(hpc_slurm_job_id: SlurmJobId, workflow_job_id: JobId) -> Self {
        Self {
            hpc_slurm_job_id,
            workflow_job_id,
            hpc_slurm_job_state: SlurmState::Pending,
        }
    }

    pub const UPDATABLE_FIELDS: &'static [&'static str] = &["hpc_slurm_job_state"];
}

/// The authoritative SLURM → Job mapping table, declared as data rather
/// than branching logic so [`map_slurm_to_job`]'s totality can be checked
/// mechanically against [`SlurmState::ALL`].
const MAPPING_TABLE: &[(SlurmState, JobState)] = &[
    (SlurmState::Pending, JobState::Pending),
    (SlurmState::Configuring, JobState::Pending),
    (SlurmState::Running, JobState::Running),
    (SlurmState::Completing, JobState::Running),
    (SlurmState::Completed, JobState::Success),
    (SlurmState::Failed, JobState::Failed),
    (SlurmState::NodeFail, JobState::Failed),
    (SlurmState::BootFail, JobState::Failed),
    (SlurmState::Deadline, JobState::Failed),
    (SlurmState::OutOfMemory, JobState::Failed),
    (SlurmState::Timeout, JobState::Failed),
    (SlurmState::Cancelled, JobState::Cancelled),
    (SlurmState::Preempted, JobState::Cancelled),
    (SlurmState::Revoked, JobState::Cancelled),
];

/// Maps a remote SLURM state to the job state it implies. `UNKNOWN` maps
/// to `None`, meaning "leave `job_state` unchanged": the status checker
/// must not react to a probe that failed to resolve a known state.
pub fn map_slurm_to_job(state: SlurmState) -> Option<JobState> {
    MAPPING_TABLE
        .iter()
        .find(|(slurm, _)| *slurm == state)
        .map(|(_, job)| *job)
}

#[cfg(test)]
#[path = "slurm_tests.rs"]
mod tests;
