// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use operandi_core::{JobState, SlurmState, WorkspaceState};
use serde_json::json;
use std::path::PathBuf;

fn workspace(id: &str) -> Workspace {
    Workspace::new(WorkspaceId::new(id), PathBuf::from(format!("/ws/{id}")))
}

#[test]
fn get_missing_workspace_is_not_found() {
    let store = MemoryStore::new();
    let err = store.get_workspace(&WorkspaceId::new("nope")).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[test]
fn update_roundtrips_through_get() {
    let store = MemoryStore::new();
    store.seed_workspace(workspace("ws-1"));

    let mut fields = FieldMap::new();
    fields.insert("state".into(), json!("TRANSFERRING_TO_HPC"));
    let updated = store.update_workspace(&WorkspaceId::new("ws-1"), &fields).unwrap();
    assert_eq!(updated.state, WorkspaceState::TransferringToHpc);

    let fetched = store.get_workspace(&WorkspaceId::new("ws-1")).unwrap();
    assert_eq!(fetched.state, WorkspaceState::TransferringToHpc);
}

#[test]
fn update_rejects_unknown_field() {
    let store = MemoryStore::new();
    store.seed_workspace(workspace("ws-1"));
    let mut fields = FieldMap::new();
    fields.insert("nope".into(), json!(1));
    let err = store.update_workspace(&WorkspaceId::new("ws-1"), &fields).unwrap_err();
    assert!(matches!(err, StoreError::UnknownField { .. }));
}

#[test]
fn update_rejects_primary_id_mutation() {
    let store = MemoryStore::new();
    store.seed_workspace(workspace("ws-1"));
    let mut fields = FieldMap::new();
    fields.insert("workspace_id".into(), json!("ws-2"));
    let err = store.update_workspace(&WorkspaceId::new("ws-1"), &fields).unwrap_err();
    assert!(matches!(err, StoreError::ImmutableField { .. }));
}

#[test]
fn create_workflow_is_insert_or_replace() {
    let store = MemoryStore::new();
    let wf = Workflow::new(
        WorkflowId::new("wf-1"),
        PathBuf::from("/wf/wf-1"),
        PathBuf::from("/wf/wf-1/main.nf"),
        "main.nf",
    );
    store.create_workflow(wf.clone()).unwrap();
    assert_eq!(store.get_workflow(&WorkflowId::new("wf-1")).unwrap(), wf);

    let mut replaced = wf;
    replaced.deleted = true;
    store.create_workflow(replaced.clone()).unwrap();
    assert_eq!(store.get_workflow(&WorkflowId::new("wf-1")).unwrap(), replaced);
}

#[test]
fn slurm_job_lookup_by_workflow_job_id() {
    let store = MemoryStore::new();
    let job = HpcSlurmJob::new(SlurmJobId::new("123"), JobId::new("job-1"));
    store.seed_slurm_job(job.clone());
    let found = store.get_slurm_job_by_job_id(&JobId::new("job-1")).unwrap();
    assert_eq!(found, job);
    assert_eq!(found.hpc_slurm_job_state, SlurmState::Pending);
}

#[test]
fn job_state_updates_roundtrip() {
    let store = MemoryStore::new();
    store.seed_job(WorkflowJob::new(
        JobId::new("job-1"),
        PathBuf::from("/jobs/job-1"),
        WorkflowId::new("wf-1"),
        WorkspaceId::new("ws-1"),
    ));
    let mut fields = FieldMap::new();
    fields.insert("job_state".into(), json!("RUNNING"));
    let updated = store.update_job(&JobId::new("job-1"), &fields).unwrap();
    assert_eq!(updated.job_state, JobState::Running);
}
