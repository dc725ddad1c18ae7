// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use operandi_adapters::FakeHpcGateway;
use operandi_core::{JobId, WorkflowId, WorkspaceId};
use operandi_store::MemoryStore;
fn seed(dir: &std::path::Path) -> MemoryStore {
    let store = MemoryStore::new();
    let ws_dir = dir.join("ws");
    std::fs::create_dir_all(&ws_dir).unwrap();
    std::fs::write(ws_dir.join("input.xml"), b"<mets/>").unwrap();

    store.seed_workspace(operandi_core::Workspace::new(WorkspaceId::new("ws-1"), ws_dir));
    store.seed_workflow(operandi_core::Workflow::new(
        WorkflowId::new("wf-1"),
        dir.join("wf"),
        dir.join("wf/main.nf"),
        "main.nf",
    ));
    store.seed_job(operandi_core::WorkflowJob::new(
        JobId::new("job-1"),
        dir.join("job"),
        WorkflowId::new("wf-1"),
        WorkspaceId::new("ws-1"),
    ));
    store
}

fn body() -> Vec<u8> {
    br#"{"workflow_id":"wf-1","workspace_id":"ws-1","job_id":"job-1"}"#.to_vec()
}

#[test]
fn happy_path_submits_and_acks() {
    let dir = tempfile::tempdir().unwrap();
    let store = seed(dir.path());
    let mut hpc = FakeHpcGateway::new();
    hpc.next_submit_id = Some("42".to_string());

    let disposition = process_submission(&store, &mut hpc, &body());
    assert_eq!(disposition, Disposition::Ack);

    let job = store.get_job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.job_state, JobState::Queued);
    assert_eq!(job.hpc_slurm_job_id, Some(operandi_core::SlurmJobId::new("42")));

    let ws = store.get_workspace(&WorkspaceId::new("ws-1")).unwrap();
    assert_eq!(ws.state, WorkspaceState::TransferringToHpc);

    let slurm_job = store.get_slurm_job_by_job_id(&JobId::new("job-1")).unwrap();
    assert_eq!(slurm_job.hpc_slurm_job_id, operandi_core::SlurmJobId::new("42"));

    assert_eq!(hpc.submitted.len(), 1);
}

#[test]
fn malformed_body_is_poison_ack_with_no_db_writes() {
    let dir = tempfile::tempdir().unwrap();
    let store = seed(dir.path());
    let mut hpc = FakeHpcGateway::new();

    let disposition = process_submission(&store, &mut hpc, b"not-json");
    assert!(matches!(disposition, Disposition::AckPoison { .. }));

    let job = store.get_job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.job_state, JobState::Unset);
}

#[test]
fn missing_workspace_is_poison_ack() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    store.seed_workflow(operandi_core::Workflow::new(
        WorkflowId::new("wf-1"),
        dir.path().join("wf"),
        dir.path().join("wf/main.nf"),
        "main.nf",
    ));
    store.seed_job(operandi_core::WorkflowJob::new(
        JobId::new("job-1"),
        dir.path().join("job"),
        WorkflowId::new("wf-1"),
        WorkspaceId::new("ws-1"),
    ));
    let mut hpc = FakeHpcGateway::new();

    let disposition = process_submission(&store, &mut hpc, &body());
    assert!(matches!(disposition, Disposition::AckPoison { .. }));
    assert!(hpc.submitted.is_empty());
}

#[test]
fn submit_failure_is_acked_and_marks_job_failed_without_retry() {
    // submit_slurm's failure is never `RetryThenPoison`: retrying would
    // risk re-running `sbatch` and leaking a second remote job for a
    // submission that may have actually gone through.
    let dir = tempfile::tempdir().unwrap();
    let store = seed(dir.path());
    let mut hpc = FakeHpcGateway::new(); // no scripted id -> submit fails

    let disposition = process_submission(&store, &mut hpc, &body());
    assert!(matches!(disposition, Disposition::AckPoison { .. }));
    assert_eq!(hpc.submitted.len(), 1, "submit_slurm is attempted exactly once");

    let job = store.get_job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.job_state, JobState::Failed);
}

#[test]
fn already_submitted_job_is_not_resubmitted() {
    // Simulates a redelivery of the submission message after a worker
    // crash that landed between writing the HpcSlurmJob row and acking.
    let dir = tempfile::tempdir().unwrap();
    let store = seed(dir.path());
    let mut hpc = FakeHpcGateway::new();
    hpc.next_submit_id = Some("42".to_string());

    let first = process_submission(&store, &mut hpc, &body());
    assert_eq!(first, Disposition::Ack);
    assert_eq!(hpc.submitted.len(), 1);

    let second = process_submission(&store, &mut hpc, &body());
    assert_eq!(second, Disposition::Ack);
    assert_eq!(hpc.submitted.len(), 1, "replay must not call submit_slurm again");

    let slurm_job = store.get_slurm_job_by_job_id(&JobId::new("job-1")).unwrap();
    assert_eq!(slurm_job.hpc_slurm_job_id, operandi_core::SlurmJobId::new("42"));
}

