// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MongoDB-backed `StateStore`.
//!
//! The official `mongodb` driver is async-only; workers are single-threaded
//! and synchronous, so this wraps every call in a dedicated current-thread
//! Tokio runtime rather than forcing the whole worker onto an async
//! executor. The REST layer (out of scope here) is expected to talk to the
//! same `mongodb::Client` directly through its own async code path — both
//! paths share the one backing store.

use crate::fields::{validate_update, FieldMap};
use crate::state_store::StateStore;
use crate::StoreError;
use bson::{doc, Document};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use operandi_core::{
    HpcSlurmJob, JobId, SlurmJobId, User, UserId, Workflow, WorkflowId, WorkflowJob, Workspace,
    WorkspaceId,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::runtime::Runtime;
use tracing::debug;

const WORKSPACES: &str = "workspaces";
const WORKFLOWS: &str = "workflows";
const JOBS: &str = "workflow_jobs";
const SLURM_JOBS: &str = "hpc_slurm_jobs";
const USERS: &str = "users";

/// Blocking facade over `mongodb::Client`, bound to one database.
pub struct MongoStore {
    client: mongodb::Client,
    db_name: String,
    rt: Runtime,
}

impl MongoStore {
    /// Connects using a Mongo connection string. Connection establishment
    /// is lazy in the driver; this only validates the URI shape.
    pub fn connect(uri: &str, db_name: impl Into<String>) -> Result<Self, StoreError> {
        let rt = Runtime::new().map_err(|e| StoreError::Transient(e.to_string()))?;
        let client = rt.block_on(async {
            mongodb::Client::with_uri_str(uri)
                .await
                .map_err(|e| StoreError::Transient(e.to_string()))
        })?;
        Ok(Self { client, db_name: db_name.into(), rt })
    }

    fn collection<T>(&self, name: &str) -> mongodb::Collection<T> {
        self.client.database(&self.db_name).collection(name)
    }

    fn get_doc<T: DeserializeOwned + Unpin + Send + Sync>(
        &self,
        collection: &str,
        entity: &'static str,
        id_field: &str,
        id: &str,
    ) -> Result<T, StoreError> {
        self.rt.block_on(async {
            let coll = self.collection::<T>(collection);
            coll.find_one(doc! { id_field: id })
                .await
                .map_err(|e| StoreError::Transient(e.to_string()))?
                .ok_or_else(|| StoreError::not_found(entity, id))
        })
    }

    fn update_doc<T: DeserializeOwned + Unpin + Send + Sync>(
        &self,
        collection: &str,
        entity: &'static str,
        allowed: &'static [&'static str],
        id_field: &str,
        id: &str,
        fields: &FieldMap,
    ) -> Result<T, StoreError> {
        validate_update(entity, allowed, id_field, fields)?;
        let set_doc = field_map_to_document(fields)?;
        debug!(entity, id, fields = ?set_doc.keys().collect::<Vec<_>>(), "updating document");
        self.rt.block_on(async {
            let coll = self.collection::<T>(collection);
            let opts = FindOneAndUpdateOptions::builder()
                .return_document(ReturnDocument::After)
                .build();
            coll.find_one_and_update(doc! { id_field: id }, doc! { "$set": set_doc })
                .with_options(opts)
                .await
                .map_err(|e| StoreError::Transient(e.to_string()))?
                .ok_or_else(|| StoreError::not_found(entity, id))
        })
    }

    fn insert_or_replace<T: Serialize + Send + Sync>(
        &self,
        collection: &str,
        id_field: &str,
        id: &str,
        value: T,
    ) -> Result<T, StoreError> {
        self.rt.block_on(async {
            let coll = self.collection::<T>(collection);
            coll.replace_one(doc! { id_field: id }, &value)
                .upsert(true)
                .await
                .map_err(|e| StoreError::Transient(e.to_string()))?;
            Ok(value)
        })
    }
}

fn field_map_to_document(fields: &FieldMap) -> Result<Document, StoreError> {
    let mut doc = Document::new();
    for (key, value) in fields {
        let bson_value = bson::to_bson(value)
            .map_err(|source| StoreError::Codec { entity: "field_map", source })?;
        doc.insert(key.clone(), bson_value);
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_map_to_document_preserves_values() {
        let mut fields = FieldMap::new();
        fields.insert("state".into(), serde_json::json!("READY"));
        fields.insert("deleted".into(), serde_json::json!(false));
        let doc = field_map_to_document(&fields).unwrap();
        assert_eq!(doc.get_str("state").unwrap(), "READY");
        assert_eq!(doc.get_bool("deleted").unwrap(), false);
    }
}

impl StateStore for MongoStore {
    fn get_workspace(&self, id: &WorkspaceId) -> Result<Workspace, StoreError> {
        self.get_doc(WORKSPACES, "workspace", "workspace_id", id.as_str())
    }

    fn update_workspace(&self, id: &WorkspaceId, fields: &FieldMap) -> Result<Workspace, StoreError> {
        self.update_doc(
            WORKSPACES,
            "workspace",
            Workspace::UPDATABLE_FIELDS,
            "workspace_id",
            id.as_str(),
            fields,
        )
    }

    fn get_workflow(&self, id: &WorkflowId) -> Result<Workflow, StoreError> {
        self.get_doc(WORKFLOWS, "workflow", "workflow_id", id.as_str())
    }

    fn update_workflow(&self, id: &WorkflowId, fields: &FieldMap) -> Result<Workflow, StoreError> {
        self.update_doc(
            WORKFLOWS,
            "workflow",
            Workflow::UPDATABLE_FIELDS,
            "workflow_id",
            id.as_str(),
            fields,
        )
    }

    fn create_workflow(&self, workflow: Workflow) -> Result<Workflow, StoreError> {
        let id = workflow.workflow_id.to_string();
        self.insert_or_replace(WORKFLOWS, "workflow_id", &id, workflow)
    }

    fn get_job(&self, id: &JobId) -> Result<WorkflowJob, StoreError> {
        self.get_doc(JOBS, "workflow_job", "job_id", id.as_str())
    }

    fn update_job(&self, id: &JobId, fields: &FieldMap) -> Result<WorkflowJob, StoreError> {
        self.update_doc(
            JOBS,
            "workflow_job",
            WorkflowJob::UPDATABLE_FIELDS,
            "job_id",
            id.as_str(),
            fields,
        )
    }

    fn get_slurm_job(&self, id: &SlurmJobId) -> Result<HpcSlurmJob, StoreError> {
        self.get_doc(SLURM_JOBS, "hpc_slurm_job", "hpc_slurm_job_id", id.as_str())
    }

    fn get_slurm_job_by_job_id(&self, job_id: &JobId) -> Result<HpcSlurmJob, StoreError> {
        self.rt.block_on(async {
            let coll = self.collection::<HpcSlurmJob>(SLURM_JOBS);
            coll.find_one(doc! { "workflow_job_id": job_id.as_str() })
                .await
                .map_err(|e| StoreError::Transient(e.to_string()))?
                .ok_or_else(|| StoreError::not_found("hpc_slurm_job", job_id.as_str()))
        })
    }

    fn update_slurm_job(&self, id: &SlurmJobId, fields: &FieldMap) -> Result<HpcSlurmJob, StoreError> {
        self.update_doc(
            SLURM_JOBS,
            "hpc_slurm_job",
            HpcSlurmJob::UPDATABLE_FIELDS,
            "hpc_slurm_job_id",
            id.as_str(),
            fields,
        )
    }

    fn create_slurm_job(&self, job: HpcSlurmJob) -> Result<HpcSlurmJob, StoreError> {
        let id = job.hpc_slurm_job_id.to_string();
        self.insert_or_replace(SLURM_JOBS, "hpc_slurm_job_id", &id, job)
    }

    fn get_user(&self, id: &UserId) -> Result<User, StoreError> {
        self.get_doc(USERS, "user", "user_id", id.as_str())
    }

    fn update_user(&self, id: &UserId, fields: &FieldMap) -> Result<User, StoreError> {
        self.update_doc(USERS, "user", User::UPDATABLE_FIELDS, "user_id", id.as_str(), fields)
    }
}
