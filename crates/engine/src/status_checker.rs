// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The status-checker pipeline — the state-machine engine that reconciles
//! bus message, DB row, and remote SLURM state. Modeled on a job-status
//! worker's handling of HPC/workflow state and result downloads, reworked
//! as a free function returning a [`Disposition`] instead of driving acks
//! itself.

use crate::mapping::{map_slurm_to_job, Disposition};
use crate::message::StatusProbe;
use crate::support::field;
use operandi_adapters::HpcGateway;
use operandi_core::{JobState, WorkspaceState};
use operandi_store::{StateStore, StoreError};
use tracing::{info, warn};

/// Processes one status-probe delivery.
///
/// Terminal job states are sticky: once `j.job_state` is
/// `SUCCESS`/`FAILED`/`CANCELLED`, a repeated probe is acked and ignored
/// without touching SLURM or the DB again.
pub fn process_status_probe(
    store: &dyn StateStore,
    hpc: &mut dyn HpcGateway,
    body: &[u8],
) -> Disposition {
    let probe: StatusProbe = match serde_json::from_slice(body) {
        Ok(probe) => probe,
        Err(e) => {
            warn!(error = %e, "malformed status probe body");
            return Disposition::AckPoison { reason: format!("malformed body: {e}") };
        }
    };

    let job = match store.get_job(&probe.job_id) {
        Ok(job) => job,
        Err(StoreError::NotFound { .. }) => {
            return Disposition::AckPoison { reason: format!("unknown job {}", probe.job_id) }
        }
        Err(e) if e.is_transient() => return Disposition::RetryThenPoison { reason: e.to_string() },
        Err(e) => return Disposition::AckPoison { reason: e.to_string() },
    };

    if job.job_state.is_terminal() {
        info!(job_id = %probe.job_id, state = %job.job_state, "probe for terminal job, no-op");
        return Disposition::Ack;
    }

    let slurm_job = match store.get_slurm_job_by_job_id(&probe.job_id) {
        Ok(slurm_job) => slurm_job,
        Err(StoreError::NotFound { .. }) => {
            return Disposition::AckPoison { reason: format!("no HPCSlurmJob for {}", probe.job_id) }
        }
        Err(e) if e.is_transient() => return Disposition::RetryThenPoison { reason: e.to_string() },
        Err(e) => return Disposition::AckPoison { reason: e.to_string() },
    };

    let s_old = slurm_job.hpc_slurm_job_state;
    let s_new = match hpc.query_state(slurm_job.hpc_slurm_job_id.as_str()) {
        Ok(s) => s,
        Err(e) => return Disposition::RetryThenPoison { reason: e.to_string() },
    };

    if s_old != s_new {
        if let Err(e) =
            store.update_slurm_job(&slurm_job.hpc_slurm_job_id, &field("hpc_slurm_job_state", s_new))
        {
            return Disposition::AckPoison { reason: e.to_string() };
        }
    }

    let j_new = match map_slurm_to_job(s_new) {
        Some(state) => state,
        None => return Disposition::Ack, // UNKNOWN: leave job_state unchanged
    };

    if job.job_state == j_new {
        return Disposition::Ack; // conditional write is a no-op: replay is idempotent
    }

    if j_new == JobState::Success {
        return handle_success(store, hpc, &job);
    }

    if let Err(e) = store.update_job(&probe.job_id, &field("job_state", j_new)) {
        return Disposition::AckPoison { reason: e.to_string() };
    }
    Disposition::Ack
}

fn handle_success(
    store: &dyn StateStore,
    hpc: &mut dyn HpcGateway,
    job: &operandi_core::WorkflowJob,
) -> Disposition {
    if let Err(e) =
        store.update_workspace(&job.workspace_id, &field("state", WorkspaceState::TransferringFromHpc))
    {
        return Disposition::AckPoison { reason: e.to_string() };
    }
    if let Err(e) = store.update_job(&job.job_id, &field("job_state", JobState::TransferringFromHpc)) {
        return Disposition::AckPoison { reason: e.to_string() };
    }

    let workspace = match store.get_workspace(&job.workspace_id) {
        Ok(ws) => ws,
        Err(e) => return Disposition::AckPoison { reason: e.to_string() },
    };

    let slurm_job = match store.get_slurm_job_by_job_id(&job.job_id) {
        Ok(slurm_job) => slurm_job,
        Err(e) => return Disposition::AckPoison { reason: e.to_string() },
    };

    match hpc.get_and_unpack(slurm_job.hpc_slurm_job_id.as_str(), &workspace.workspace_dir) {
        Ok(()) => {
            if let Err(e) = store.update_workspace(&job.workspace_id, &field("state", WorkspaceState::Ready)) {
                return Disposition::AckPoison { reason: e.to_string() };
            }
            if let Err(e) = store.update_job(&job.job_id, &field("job_state", JobState::Success)) {
                return Disposition::AckPoison { reason: e.to_string() };
            }
            info!(job_id = %job.job_id, "job completed and results downloaded");
            Disposition::Ack
        }
        // download failure leaves workspace/job at TRANSFERRING_FROM_HPC; the next
        // probe for this job retries the download.
        Err(e) => Disposition::RetryThenPoison { reason: e.to_string() },
    }
}

#[cfg(test)]
#[path = "status_checker_tests.rs"]
mod tests;
