// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level integration tests: the full submission → status-probe
//! lifecycle assembled end to end against fakes, exercised here across
//! *both* pipelines together rather than in isolation as the per-crate
//! unit tests do.

use operandi_adapters::FakeHpcGateway;
use operandi_core::{
    JobId, JobState, SlurmState, Workflow, WorkflowId, WorkflowJob, Workspace, WorkspaceId,
    WorkspaceState,
};
use operandi_engine::{process_status_probe, process_submission, Disposition};
use operandi_store::{MemoryStore, StateStore};
use std::path::Path;
use yare::parameterized;

fn seed_for_submission(dir: &Path) -> MemoryStore {
    let store = MemoryStore::new();
    let ws_dir = dir.join("ws");
    std::fs::create_dir_all(&ws_dir).unwrap();
    std::fs::write(ws_dir.join("input.xml"), b"<mets/>").unwrap();

    store.seed_workspace(Workspace::new(WorkspaceId::new("ws-1"), ws_dir));
    store.seed_workflow(Workflow::new(
        WorkflowId::new("wf-1"),
        dir.join("wf"),
        dir.join("wf/main.nf"),
        "main.nf",
    ));
    store.seed_job(WorkflowJob::new(
        JobId::new("job-1"),
        dir.join("job"),
        WorkflowId::new("wf-1"),
        WorkspaceId::new("ws-1"),
    ));
    store
}

/// Submission message then a run of status probes drives a job from
/// `UNSET` all the way to `SUCCESS`/`READY`, exactly as the REST layer and
/// the external SLURM scheduler would over the job's real lifetime,
/// assembled here without a real AMQP broker, Mongo, or SSH cluster.
#[test]
fn full_lifecycle_submission_to_success() {
    let dir = tempfile::tempdir().unwrap();
    let store = seed_for_submission(dir.path());
    let mut hpc = FakeHpcGateway::new();
    hpc.next_submit_id = Some("9001".to_string());

    let submission_body = br#"{"workflow_id":"wf-1","workspace_id":"ws-1","job_id":"job-1"}"#;
    assert_eq!(process_submission(&store, &mut hpc, submission_body), Disposition::Ack);

    let job = store.get_job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.job_state, JobState::Queued);
    assert_eq!(job.hpc_slurm_job_id, Some(operandi_core::SlurmJobId::new("9001")));

    let probe_body = br#"{"job_id":"job-1"}"#;

    // First probe: scheduler still has it pending.
    hpc.set_state("9001", SlurmState::Pending);
    assert_eq!(process_status_probe(&store, &mut hpc, probe_body), Disposition::Ack);
    assert_eq!(store.get_job(&JobId::new("job-1")).unwrap().job_state, JobState::Pending);

    // Second probe: now running.
    hpc.set_state("9001", SlurmState::Running);
    assert_eq!(process_status_probe(&store, &mut hpc, probe_body), Disposition::Ack);
    assert_eq!(store.get_job(&JobId::new("job-1")).unwrap().job_state, JobState::Running);

    // Third probe: completed, triggers download.
    hpc.set_state("9001", SlurmState::Completed);
    assert_eq!(process_status_probe(&store, &mut hpc, probe_body), Disposition::Ack);

    let job = store.get_job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.job_state, JobState::Success);
    let workspace = store.get_workspace(&WorkspaceId::new("ws-1")).unwrap();
    assert_eq!(workspace.state, WorkspaceState::Ready);
    assert_eq!(hpc.downloaded.len(), 1);

    // Replaying the terminal probe is a no-op: terminal states are sticky
    // and reconciliation is idempotent.
    assert_eq!(process_status_probe(&store, &mut hpc, probe_body), Disposition::Ack);
    assert_eq!(hpc.downloaded.len(), 1, "no second download after terminal state reached");
}

/// SLURM reports TIMEOUT. Expect `j.state=FAILED`; no download attempted;
/// workspace unchanged.
#[test]
fn timeout_fails_job_without_touching_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let store = seed_for_submission(dir.path());
    let mut hpc = FakeHpcGateway::new();
    hpc.next_submit_id = Some("42".to_string());
    process_submission(&store, &mut hpc, br#"{"workflow_id":"wf-1","workspace_id":"ws-1","job_id":"job-1"}"#);

    hpc.set_state("42", SlurmState::Timeout);
    let disposition = process_status_probe(&store, &mut hpc, br#"{"job_id":"job-1"}"#);
    assert_eq!(disposition, Disposition::Ack);

    let job = store.get_job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.job_state, JobState::Failed);
    assert!(hpc.downloaded.is_empty());
    // workspace was moved to TRANSFERRING_TO_HPC by the submission step and
    // never touched again by the failed probe.
    let workspace = store.get_workspace(&WorkspaceId::new("ws-1")).unwrap();
    assert_eq!(workspace.state, WorkspaceState::TransferringToHpc);
}

/// Probe for a non-existent job id is poison-acked with no DB mutation.
#[test]
fn probe_for_missing_job_is_poison() {
    let dir = tempfile::tempdir().unwrap();
    let store = seed_for_submission(dir.path());
    let mut hpc = FakeHpcGateway::new();

    let disposition = process_status_probe(&store, &mut hpc, br#"{"job_id":"job-does-not-exist"}"#);
    assert!(matches!(disposition, Disposition::AckPoison { .. }));
    assert!(hpc.queried.is_empty(), "must not reach the HPC gateway for an unknown job");
}

/// Malformed JSON body is poison-acked with no DB mutation.
#[test]
fn malformed_body_is_poison() {
    let dir = tempfile::tempdir().unwrap();
    let store = seed_for_submission(dir.path());
    let mut hpc = FakeHpcGateway::new();
    let before = store.get_job(&JobId::new("job-1")).unwrap();

    let disposition = process_submission(&store, &mut hpc, b"not-json");
    assert!(matches!(disposition, Disposition::AckPoison { .. }));

    let after = store.get_job(&JobId::new("job-1")).unwrap();
    assert_eq!(before, after, "malformed body must not mutate any document");
}

/// Terminal states are sticky across all three of them, table-driven.
#[parameterized(
    success = (SlurmState::Completed, JobState::Success),
    failed = (SlurmState::Failed, JobState::Failed),
    cancelled = (SlurmState::Cancelled, JobState::Cancelled),
)]
fn terminal_states_reject_further_transitions(terminal_slurm: SlurmState, terminal_job: JobState) {
    let dir = tempfile::tempdir().unwrap();
    let store = seed_for_submission(dir.path());
    let mut hpc = FakeHpcGateway::new();
    hpc.next_submit_id = Some("7".to_string());
    process_submission(&store, &mut hpc, br#"{"workflow_id":"wf-1","workspace_id":"ws-1","job_id":"job-1"}"#);

    hpc.set_state("7", terminal_slurm);
    process_status_probe(&store, &mut hpc, br#"{"job_id":"job-1"}"#);
    assert_eq!(store.get_job(&JobId::new("job-1")).unwrap().job_state, terminal_job);

    // A subsequent probe reporting a completely different state must not
    // move the job out of its terminal state.
    hpc.set_state("7", SlurmState::Running);
    process_status_probe(&store, &mut hpc, br#"{"job_id":"job-1"}"#);
    assert_eq!(store.get_job(&JobId::new("job-1")).unwrap().job_state, terminal_job);
}
