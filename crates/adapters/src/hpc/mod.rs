// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HPC gateway: SSH exec + SFTP transfer to a SLURM-like cluster.

mod paths;
mod ssh;

pub use paths::{
    render_sbatch_script, resolve_batch_scripts_dir, resolve_project_root_dir,
    resolve_slurm_workspaces_dir, resolve_user_home_dir, resolve_user_scratch_dir, SbatchSpec,
};
pub use ssh::{ProxyJumpConfig, SshHpcGateway};

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeHpcGateway;

use operandi_core::SlurmState;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the HPC gateway.
#[derive(Debug, Error)]
pub enum HpcError {
    #[error("ssh keyfile missing or not a regular file: {0}")]
    KeyfileMissing(PathBuf),
    #[error("failed to connect to HPC host: {0}")]
    Connect(String),
    #[error("ssh authentication failed: {0}")]
    Auth(String),
    #[error("sbatch exited {exit_code}: {stderr}")]
    Submit { exit_code: i32, stderr: String },
    #[error("HPC command timed out after {0:?}")]
    Timeout(Duration),
    #[error("artifact transfer failed: {0}")]
    Transfer(String),
}

/// Hard per-command timeout: 300 s by default.
pub const HPC_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Blocking facade over an SSH executor session and an SFTP session — two
/// sessions per worker. One instance is owned exclusively by the worker
/// process that opened it.
pub trait HpcGateway: Send {
    /// Uploads `workspace_tarball`, stages `batch_path`, runs `sbatch`, and
    /// parses the submitted job id from stdout.
    fn submit_slurm(
        &mut self,
        batch_path: &Path,
        workspace_tarball: &Path,
    ) -> Result<String, HpcError>;

    /// Runs `sacct`/`squeue`; an id the scheduler no longer knows about
    /// resolves to `SlurmState::Unknown`, not an error.
    fn query_state(&mut self, slurm_job_id: &str) -> Result<SlurmState, HpcError>;

    /// SFTPs the remote job's result tarball and extracts it into
    /// `local_workspace_dir`, staging to `<dir>.partial` then renaming so a
    /// crash mid-transfer never leaves a half-populated workspace.
    fn get_and_unpack(
        &mut self,
        remote_job_dir: &str,
        local_workspace_dir: &Path,
    ) -> Result<(), HpcError>;
}
