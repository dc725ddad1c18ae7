// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote path layout, ported from `hpc/utils.py`'s
//! `resolve_hpc_*_dir` helpers: every path the HPC gateway touches is
//! derived from the cluster username and a configured project root, never
//! hardcoded per-call.

/// `/home/users/<username>` — the user's login home on the cluster.
pub fn resolve_user_home_dir(username: &str) -> String {
    format!("/home/users/{username}")
}

/// `/scratch1/users/<username>` — fast scratch storage for job I/O.
pub fn resolve_user_scratch_dir(username: &str) -> String {
    format!("/scratch1/users/{username}")
}

/// `<scratch>/<project_root_dir>` — this deployment's working area within
/// the user's scratch space.
pub fn resolve_project_root_dir(username: &str, project_root_dir: &str) -> String {
    format!("{}/{project_root_dir}", resolve_user_scratch_dir(username))
}

/// `<project_root>/batch_scripts` — where `sbatch` scripts are staged
/// before submission.
pub fn resolve_batch_scripts_dir(username: &str, project_root_dir: &str) -> String {
    format!("{}/batch_scripts", resolve_project_root_dir(username, project_root_dir))
}

/// `<project_root>/slurm_workspaces` — where per-job workspace tarballs
/// are staged/unpacked remotely.
pub fn resolve_slurm_workspaces_dir(username: &str, project_root_dir: &str) -> String {
    format!("{}/slurm_workspaces", resolve_project_root_dir(username, project_root_dir))
}

/// Parameters needed to render an SBATCH batch script.
pub struct SbatchSpec<'a> {
    pub job_name: &'a str,
    pub output_log_path: &'a str,
    pub nextflow_invocation: &'a str,
}

/// Renders a minimal SBATCH header plus the nextflow invocation line.
/// `submit_slurm` writes this to `batch_path` before uploading it.
pub fn render_sbatch_script(spec: &SbatchSpec<'_>) -> String {
    format!(
        "#!/bin/bash\n#SBATCH --job-name={job_name}\n#SBATCH --output={output}\n\n{invocation}\n",
        job_name = spec.job_name,
        output = spec.output_log_path,
        invocation = spec.nextflow_invocation,
    )
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
