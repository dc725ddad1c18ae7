// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `StateStore` fake. Grounded in the pack's fakes-over-mocks
//! testing convention: a real (if simplified) backend, not a mock
//! expecting call sequences.

use crate::fields::{validate_update, FieldMap};
use crate::state_store::StateStore;
use crate::StoreError;
use operandi_core::{
    HpcSlurmJob, JobId, SlurmJobId, User, UserId, Workflow, WorkflowId, WorkflowJob, Workspace,
    WorkspaceId,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Default)]
struct Collections {
    workspaces: HashMap<String, serde_json::Value>,
    workflows: HashMap<String, serde_json::Value>,
    jobs: HashMap<String, serde_json::Value>,
    slurm_jobs: HashMap<String, serde_json::Value>,
    users: HashMap<String, serde_json::Value>,
}

/// An in-process `StateStore` backed by `serde_json::Value` documents
/// behind a mutex — the synchronous analogue of `MongoStore`, used by
/// engine and broker unit tests.
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Collections::default()) }
    }

    pub fn seed_workspace(&self, ws: Workspace) {
        let id = ws.workspace_id.to_string();
        self.inner.lock().workspaces.insert(id, to_value(&ws));
    }

    pub fn seed_workflow(&self, wf: Workflow) {
        let id = wf.workflow_id.to_string();
        self.inner.lock().workflows.insert(id, to_value(&wf));
    }

    pub fn seed_job(&self, job: WorkflowJob) {
        let id = job.job_id.to_string();
        self.inner.lock().jobs.insert(id, to_value(&job));
    }

    pub fn seed_slurm_job(&self, job: HpcSlurmJob) {
        let id = job.hpc_slurm_job_id.to_string();
        self.inner.lock().slurm_jobs.insert(id, to_value(&job));
    }

    pub fn seed_user(&self, user: User) {
        let id = user.user_id.to_string();
        self.inner.lock().users.insert(id, to_value(&user));
    }
}

fn to_value<T: Serialize>(t: &T) -> serde_json::Value {
    #[allow(clippy::unwrap_used)]
    serde_json::to_value(t).unwrap()
}

fn get<T: DeserializeOwned>(
    map: &HashMap<String, serde_json::Value>,
    entity: &'static str,
    id: &str,
) -> Result<T, StoreError> {
    let value = map.get(id).ok_or_else(|| StoreError::not_found(entity, id))?;
    serde_json::from_value(value.clone()).map_err(|e| StoreError::Transient(e.to_string()))
}

fn update<T: Serialize + DeserializeOwned>(
    map: &mut HashMap<String, serde_json::Value>,
    entity: &'static str,
    allowed: &'static [&'static str],
    primary_id_field: &str,
    id: &str,
    fields: &FieldMap,
) -> Result<T, StoreError> {
    validate_update(entity, allowed, primary_id_field, fields)?;
    let existing = map.get(id).ok_or_else(|| StoreError::not_found(entity, id))?;
    let mut doc = existing
        .as_object()
        .cloned()
        .ok_or_else(|| StoreError::Transient(format!("{entity} document is not an object")))?;
    for (k, v) in fields {
        doc.insert(k.clone(), v.clone());
    }
    let value = serde_json::Value::Object(doc);
    let decoded: T =
        serde_json::from_value(value.clone()).map_err(|e| StoreError::Transient(e.to_string()))?;
    map.insert(id.to_string(), value);
    Ok(decoded)
}

impl StateStore for MemoryStore {
    fn get_workspace(&self, id: &WorkspaceId) -> Result<Workspace, StoreError> {
        get(&self.inner.lock().workspaces, "workspace", id.as_str())
    }

    fn update_workspace(&self, id: &WorkspaceId, fields: &FieldMap) -> Result<Workspace, StoreError> {
        update(
            &mut self.inner.lock().workspaces,
            "workspace",
            Workspace::UPDATABLE_FIELDS,
            "workspace_id",
            id.as_str(),
            fields,
        )
    }

    fn get_workflow(&self, id: &WorkflowId) -> Result<Workflow, StoreError> {
        get(&self.inner.lock().workflows, "workflow", id.as_str())
    }

    fn update_workflow(&self, id: &WorkflowId, fields: &FieldMap) -> Result<Workflow, StoreError> {
        update(
            &mut self.inner.lock().workflows,
            "workflow",
            Workflow::UPDATABLE_FIELDS,
            "workflow_id",
            id.as_str(),
            fields,
        )
    }

    fn create_workflow(&self, workflow: Workflow) -> Result<Workflow, StoreError> {
        let id = workflow.workflow_id.to_string();
        self.inner.lock().workflows.insert(id, to_value(&workflow));
        Ok(workflow)
    }

    fn get_job(&self, id: &JobId) -> Result<WorkflowJob, StoreError> {
        get(&self.inner.lock().jobs, "workflow_job", id.as_str())
    }

    fn update_job(&self, id: &JobId, fields: &FieldMap) -> Result<WorkflowJob, StoreError> {
        update(
            &mut self.inner.lock().jobs,
            "workflow_job",
            WorkflowJob::UPDATABLE_FIELDS,
            "job_id",
            id.as_str(),
            fields,
        )
    }

    fn get_slurm_job(&self, id: &SlurmJobId) -> Result<HpcSlurmJob, StoreError> {
        get(&self.inner.lock().slurm_jobs, "hpc_slurm_job", id.as_str())
    }

    fn get_slurm_job_by_job_id(&self, job_id: &JobId) -> Result<HpcSlurmJob, StoreError> {
        let guard = self.inner.lock();
        guard
            .slurm_jobs
            .values()
            .find_map(|v| {
                let job: HpcSlurmJob = serde_json::from_value(v.clone()).ok()?;
                (job.workflow_job_id == *job_id).then_some(job)
            })
            .ok_or_else(|| StoreError::not_found("hpc_slurm_job", job_id.as_str()))
    }

    fn update_slurm_job(&self, id: &SlurmJobId, fields: &FieldMap) -> Result<HpcSlurmJob, StoreError> {
        update(
            &mut self.inner.lock().slurm_jobs,
            "hpc_slurm_job",
            HpcSlurmJob::UPDATABLE_FIELDS,
            "hpc_slurm_job_id",
            id.as_str(),
            fields,
        )
    }

    fn create_slurm_job(&self, job: HpcSlurmJob) -> Result<HpcSlurmJob, StoreError> {
        let id = job.hpc_slurm_job_id.to_string();
        self.inner.lock().slurm_jobs.insert(id, to_value(&job));
        Ok(job)
    }

    fn get_user(&self, id: &UserId) -> Result<User, StoreError> {
        get(&self.inner.lock().users, "user", id.as_str())
    }

    fn update_user(&self, id: &UserId, fields: &FieldMap) -> Result<User, StoreError> {
        update(
            &mut self.inner.lock().users,
            "user",
            User::UPDATABLE_FIELDS,
            "user_id",
            id.as_str(),
            fields,
        )
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
