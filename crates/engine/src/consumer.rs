// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job-consumer pipeline: stages a workspace, uploads it to the HPC
//! cluster, and submits the SLURM job.
//!
//! A free function over the `StateStore`/`HpcGateway` traits rather than a
//! struct method, so it is unit-testable without a worker process —
//! `operandi-broker`'s worker entry point only wires concrete adapters to
//! it and loops.

use crate::mapping::Disposition;
use crate::message::SubmissionMessage;
use crate::support::field;
use operandi_adapters::HpcGateway;
use operandi_core::{HpcSlurmJob, JobState, WorkspaceState};
use operandi_store::{FieldMap, StateStore, StoreError};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Tars `workspace_dir` into `<job_dir>/workspace.tar.gz` for upload.
fn stage_workspace_tarball(workspace_dir: &Path, job_dir: &Path) -> io::Result<PathBuf> {
    std::fs::create_dir_all(job_dir)?;
    let tarball_path = job_dir.join("workspace.tar.gz");
    let file = File::create(&tarball_path)?;
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(".", workspace_dir)?;
    builder.into_inner()?.finish()?;
    Ok(tarball_path)
}

/// Processes one submission delivery end to end. The caller (the worker's
/// consume loop) is responsible for turning the returned [`Disposition`]
/// into the actual `ack`/`nack`.
pub fn process_submission(
    store: &dyn StateStore,
    hpc: &mut dyn HpcGateway,
    body: &[u8],
) -> Disposition {
    let msg: SubmissionMessage = match serde_json::from_slice(body) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(error = %e, "malformed submission message body");
            return Disposition::AckPoison { reason: format!("malformed body: {e}") };
        }
    };

    let workspace = match store.get_workspace(&msg.workspace_id) {
        Ok(ws) => ws,
        Err(StoreError::NotFound { .. }) => {
            return Disposition::AckPoison { reason: format!("unknown workspace {}", msg.workspace_id) }
        }
        Err(e) if e.is_transient() => return Disposition::RetryThenPoison { reason: e.to_string() },
        Err(e) => return Disposition::AckPoison { reason: e.to_string() },
    };
    if store.get_workflow(&msg.workflow_id).is_err() {
        return Disposition::AckPoison { reason: format!("unknown workflow {}", msg.workflow_id) };
    }
    let job = match store.get_job(&msg.job_id) {
        Ok(job) => job,
        Err(StoreError::NotFound { .. }) => {
            return Disposition::AckPoison { reason: format!("unknown job {}", msg.job_id) }
        }
        Err(e) if e.is_transient() => return Disposition::RetryThenPoison { reason: e.to_string() },
        Err(e) => return Disposition::AckPoison { reason: e.to_string() },
    };

    // A WorkflowJob that already owns an HpcSlurmJob row was submitted by
    // an earlier delivery of this same message (worker crash/redelivery
    // after the row was written but before the ack landed). Resubmitting
    // would violate the WorkflowJob:HpcSlurmJob 1:1 invariant (§3), so this
    // is a no-op replay rather than a fresh submission.
    if job.hpc_slurm_job_id.is_some() {
        match store.get_slurm_job_by_job_id(&msg.job_id) {
            Ok(_) => {
                info!(job_id = %msg.job_id, "submission already recorded, skipping resubmission");
                return Disposition::Ack;
            }
            Err(StoreError::NotFound { .. }) => {}
            Err(e) if e.is_transient() => return Disposition::RetryThenPoison { reason: e.to_string() },
            Err(e) => return Disposition::AckPoison { reason: e.to_string() },
        }
    }

    if let Err(e) = store.update_workspace(&msg.workspace_id, &field("state", WorkspaceState::TransferringToHpc)) {
        return Disposition::AckPoison { reason: e.to_string() };
    }
    if let Err(e) = store.update_job(&msg.job_id, &field("job_state", JobState::TransferringToHpc)) {
        return Disposition::AckPoison { reason: e.to_string() };
    }

    let tarball = match stage_workspace_tarball(&workspace.workspace_dir, &job.job_dir) {
        Ok(path) => path,
        Err(e) => return Disposition::RetryThenPoison { reason: format!("failed to stage workspace: {e}") },
    };
    let batch_path = job.job_dir.join(format!("{}.sh", msg.job_id));

    // `submit_slurm`'s side effect (the remote `sbatch` invocation) cannot
    // be safely retried here: a failure reading back its result doesn't
    // tell us whether the remote job was actually created, and
    // `run_with_retries` re-running this whole pipeline would risk
    // submitting a second SLURM job for the same WorkflowJob. So this is
    // deliberately *not* `RetryThenPoison` — one attempt, then the job is
    // marked FAILED rather than handed back to the automatic retry path.
    let slurm_job_id = match hpc.submit_slurm(&batch_path, &tarball) {
        Ok(id) => id,
        Err(e) => {
            warn!(job_id = %msg.job_id, error = %e, "slurm submission failed, marking job failed without retry");
            if let Err(update_err) = store.update_job(&msg.job_id, &field("job_state", JobState::Failed)) {
                return Disposition::AckPoison {
                    reason: format!("slurm submission failed ({e}); also failed to record FAILED: {update_err}"),
                };
            }
            return Disposition::AckPoison { reason: format!("slurm submission failed: {e}") };
        }
    };

    if let Err(e) = store.create_slurm_job(HpcSlurmJob::new(slurm_job_id.clone().into(), msg.job_id.clone())) {
        return Disposition::AckPoison { reason: e.to_string() };
    }

    let mut job_fields = FieldMap::new();
    #[allow(clippy::unwrap_used)]
    job_fields.insert(
        "hpc_slurm_job_id".to_string(),
        serde_json::to_value(&slurm_job_id).unwrap(),
    );
    #[allow(clippy::unwrap_used)]
    job_fields.insert("job_state".to_string(), serde_json::to_value(JobState::Queued).unwrap());
    if let Err(e) = store.update_job(&msg.job_id, &job_fields) {
        return Disposition::AckPoison { reason: e.to_string() };
    }

    info!(job_id = %msg.job_id, slurm_job_id, "submitted SLURM job");
    Disposition::Ack
}

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;
