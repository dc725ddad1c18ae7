// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-entity get/update(/create) contract, exposed as a blocking
//! facade. Workers call this directly from their single-threaded consume
//! loop; the REST layer (out of scope here) is expected to wrap the same
//! backing store with an async facade, which is why the backends
//! underneath (`MongoStore`) are built on the async `mongodb` driver
//! rather than a blocking Mongo client.

use crate::fields::FieldMap;
use crate::StoreError;
use operandi_core::{HpcSlurmJob, JobId, SlurmJobId, User, UserId, Workflow, WorkflowId, WorkflowJob, Workspace, WorkspaceId};

/// Synchronous CRUD surface over the five DB collections the broker
/// reconciles against.
pub trait StateStore: Send + Sync {
    fn get_workspace(&self, id: &WorkspaceId) -> Result<Workspace, StoreError>;
    fn update_workspace(&self, id: &WorkspaceId, fields: &FieldMap) -> Result<Workspace, StoreError>;

    fn get_workflow(&self, id: &WorkflowId) -> Result<Workflow, StoreError>;
    fn update_workflow(&self, id: &WorkflowId, fields: &FieldMap) -> Result<Workflow, StoreError>;
    /// Insert-or-replace by primary id.
    fn create_workflow(&self, workflow: Workflow) -> Result<Workflow, StoreError>;

    fn get_job(&self, id: &JobId) -> Result<WorkflowJob, StoreError>;
    fn update_job(&self, id: &JobId, fields: &FieldMap) -> Result<WorkflowJob, StoreError>;

    fn get_slurm_job(&self, id: &SlurmJobId) -> Result<HpcSlurmJob, StoreError>;
    /// Looks up the HPCSlurmJob owned by a WorkflowJob (1:1,
    /// `workflow_job_id` is a unique back-ref).
    fn get_slurm_job_by_job_id(&self, job_id: &JobId) -> Result<HpcSlurmJob, StoreError>;
    fn update_slurm_job(&self, id: &SlurmJobId, fields: &FieldMap) -> Result<HpcSlurmJob, StoreError>;
    fn create_slurm_job(&self, job: HpcSlurmJob) -> Result<HpcSlurmJob, StoreError>;

    fn get_user(&self, id: &UserId) -> Result<User, StoreError>;
    fn update_user(&self, id: &UserId, fields: &FieldMap) -> Result<User, StoreError>;
}
