// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process `HpcGateway` fake for engine/broker tests.

use super::{HpcError, HpcGateway};
use operandi_core::SlurmState;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Scripts submissions, query responses, and download outcomes; records
/// every call so tests can assert on what the engine actually did.
#[derive(Default)]
pub struct FakeHpcGateway {
    pub next_submit_id: Option<String>,
    pub query_responses: HashMap<String, SlurmState>,
    pub fail_next_download: Option<String>,
    pub submitted: Vec<(PathBuf, PathBuf)>,
    pub queried: Vec<String>,
    pub downloaded: Vec<(String, PathBuf)>,
}

impl FakeHpcGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&mut self, slurm_job_id: impl Into<String>, state: SlurmState) {
        self.query_responses.insert(slurm_job_id.into(), state);
    }
}

impl HpcGateway for FakeHpcGateway {
    fn submit_slurm(&mut self, batch_path: &Path, workspace_tarball: &Path) -> Result<String, HpcError> {
        self.submitted.push((batch_path.to_path_buf(), workspace_tarball.to_path_buf()));
        self.next_submit_id
            .clone()
            .ok_or_else(|| HpcError::Submit { exit_code: 1, stderr: "no scripted job id".into() })
    }

    fn query_state(&mut self, slurm_job_id: &str) -> Result<SlurmState, HpcError> {
        self.queried.push(slurm_job_id.to_string());
        Ok(self.query_responses.get(slurm_job_id).copied().unwrap_or(SlurmState::Unknown))
    }

    fn get_and_unpack(&mut self, remote_job_dir: &str, local_workspace_dir: &Path) -> Result<(), HpcError> {
        if let Some(reason) = self.fail_next_download.take() {
            return Err(HpcError::Transfer(reason));
        }
        self.downloaded.push((remote_job_dir.to_string(), local_workspace_dir.to_path_buf()));
        std::fs::create_dir_all(local_workspace_dir)
            .map_err(|e| HpcError::Transfer(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
