// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ssh2`-backed `HpcGateway`: a blocking libssh2 session opened through a
//! proxy-jump, matching `create_ssh_connection_to_hpc`/`create_proxy_jump`
//! in `hpc/utils.py` (paramiko's `direct-tcpip` channel, here an
//! `ssh2::Channel` used as the second session's transport stream).

use super::paths::{render_sbatch_script, SbatchSpec};
use super::{HpcError, HpcGateway, HPC_COMMAND_TIMEOUT};
use operandi_core::SlurmState;
use ssh2::Session;
use std::fs::File;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Proxy-jump + target connection parameters (see `OPERANDI_HPC_PROXY_HOST`
/// in the broker's configuration).
pub struct ProxyJumpConfig {
    pub proxy_host: String,
    pub target_host: String,
    pub username: String,
    pub key_path: PathBuf,
    pub project_root_dir: String,
}

/// An SSH exec session and an SFTP session opened via one proxy-jump —
/// two sessions per worker.
pub struct SshHpcGateway {
    exec: Session,
    sftp: Session,
    config: ProxyJumpConfig,
}

impl SshHpcGateway {
    /// Opens both sessions. `fails with KeyfileMissing` before attempting
    /// any network I/O; the keyfile is checked at startup.
    pub fn connect(config: ProxyJumpConfig) -> Result<Self, HpcError> {
        check_keyfile(&config.key_path)?;
        let exec = open_via_proxy_jump(&config)?;
        let sftp = open_via_proxy_jump(&config)?;
        Ok(Self { exec, sftp, config })
    }

    fn batch_scripts_dir(&self) -> String {
        super::resolve_batch_scripts_dir(&self.config.username, &self.config.project_root_dir)
    }

    fn workspaces_dir(&self) -> String {
        super::resolve_slurm_workspaces_dir(&self.config.username, &self.config.project_root_dir)
    }

    fn exec_command(&mut self, command: &str) -> Result<(i32, String, String), HpcError> {
        let mut channel = self.exec.channel_session().map_err(map_ssh_err)?;
        channel.exec(command).map_err(map_ssh_err)?;
        let mut stdout = String::new();
        let mut stderr = String::new();
        channel.read_to_string(&mut stdout).map_err(|e| map_io_err(e))?;
        channel.stderr().read_to_string(&mut stderr).map_err(|e| map_io_err(e))?;
        channel.wait_close().map_err(map_ssh_err)?;
        let exit_code = channel.exit_status().map_err(map_ssh_err)?;
        Ok((exit_code, stdout, stderr))
    }
}

/// `ssh2` surfaces a blocking-timeout (set via `Session::set_timeout`) as
/// an ordinary `io::Error`; the libssh2 message text is the only signal,
/// so that's what distinguishes it from a genuine transport failure.
fn map_io_err(e: std::io::Error) -> HpcError {
    if e.to_string().to_lowercase().contains("timeout") || e.to_string().to_lowercase().contains("timed out") {
        HpcError::Timeout(HPC_COMMAND_TIMEOUT)
    } else {
        HpcError::Connect(e.to_string())
    }
}

fn map_ssh_err(e: ssh2::Error) -> HpcError {
    if e.message().to_lowercase().contains("time") {
        HpcError::Timeout(HPC_COMMAND_TIMEOUT)
    } else {
        HpcError::Connect(e.to_string())
    }
}

fn check_keyfile(path: &Path) -> Result<(), HpcError> {
    let meta = std::fs::metadata(path).map_err(|_| HpcError::KeyfileMissing(path.to_path_buf()))?;
    if !meta.is_file() {
        return Err(HpcError::KeyfileMissing(path.to_path_buf()));
    }
    Ok(())
}

/// Opens the proxy host, carves a `direct-tcpip` channel to the target
/// through it, then hands that channel to a second `Session` as its
/// transport — the Rust analogue of paramiko's `sock=proxy_channel`.
fn open_via_proxy_jump(config: &ProxyJumpConfig) -> Result<Session, HpcError> {
    let proxy_stream = TcpStream::connect((config.proxy_host.as_str(), 22))
        .map_err(|e| HpcError::Connect(e.to_string()))?;
    proxy_stream
        .set_read_timeout(Some(HPC_COMMAND_TIMEOUT))
        .map_err(|e| HpcError::Connect(e.to_string()))?;

    let mut proxy_session = Session::new().map_err(|e| HpcError::Connect(e.to_string()))?;
    proxy_session.set_tcp_stream(proxy_stream);
    proxy_session.handshake().map_err(|e| HpcError::Connect(e.to_string()))?;
    proxy_session
        .userauth_pubkey_file(&config.username, None, &config.key_path, None)
        .map_err(|e| HpcError::Auth(e.to_string()))?;

    let channel = proxy_session
        .channel_direct_tcpip(&config.target_host, 22, None)
        .map_err(|e| HpcError::Connect(e.to_string()))?;

    let mut session = Session::new().map_err(|e| HpcError::Connect(e.to_string()))?;
    session.set_tcp_stream(channel);
    session.handshake().map_err(|e| HpcError::Connect(e.to_string()))?;
    session
        .userauth_pubkey_file(&config.username, None, &config.key_path, None)
        .map_err(|e| HpcError::Auth(e.to_string()))?;
    session.set_timeout(HPC_COMMAND_TIMEOUT.as_millis() as u32);
    Ok(session)
}

impl HpcGateway for SshHpcGateway {
    fn submit_slurm(
        &mut self,
        batch_path: &Path,
        workspace_tarball: &Path,
    ) -> Result<String, HpcError> {
        let batch_dir = self.batch_scripts_dir();
        let job_name = batch_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("job")
            .to_string();
        let remote_batch_path = format!("{batch_dir}/{job_name}.sh");
        let remote_tarball_path = format!("{batch_dir}/{job_name}.tar.gz");

        let script = render_sbatch_script(&SbatchSpec {
            job_name: &job_name,
            output_log_path: &format!("{batch_dir}/{job_name}.out"),
            nextflow_invocation: "nextflow run main.nf -params-file params.json",
        });

        let sftp = self.sftp.sftp().map_err(|e| HpcError::Transfer(e.to_string()))?;
        let mut remote_script = sftp
            .create(Path::new(&remote_batch_path))
            .map_err(|e| HpcError::Transfer(e.to_string()))?;
        remote_script
            .write_all(script.as_bytes())
            .map_err(|e| HpcError::Transfer(e.to_string()))?;

        let mut local_tarball = File::open(workspace_tarball).map_err(|e| HpcError::Transfer(e.to_string()))?;
        let mut remote_tarball = sftp
            .create(Path::new(&remote_tarball_path))
            .map_err(|e| HpcError::Transfer(e.to_string()))?;
        std::io::copy(&mut local_tarball, &mut remote_tarball)
            .map_err(|e| HpcError::Transfer(e.to_string()))?;

        let (exit_code, stdout, stderr) =
            self.exec_command(&format!("sbatch {remote_batch_path}"))?;
        if exit_code != 0 {
            return Err(HpcError::Submit { exit_code, stderr });
        }
        parse_sbatch_job_id(&stdout)
            .ok_or_else(|| HpcError::Submit { exit_code: 0, stderr: format!("unparseable sbatch output: {stdout}") })
    }

    fn query_state(&mut self, slurm_job_id: &str) -> Result<SlurmState, HpcError> {
        let (exit_code, stdout, stderr) =
            self.exec_command(&format!("sacct -j {slurm_job_id} -n -o State --parsable2"))?;
        if exit_code != 0 {
            warn!(slurm_job_id, stderr, "sacct exited non-zero, treating state as unknown");
            return Ok(SlurmState::Unknown);
        }
        let raw = stdout.lines().next().unwrap_or("").trim();
        if raw.is_empty() {
            return Ok(SlurmState::Unknown);
        }
        Ok(SlurmState::parse(raw))
    }

    fn get_and_unpack(
        &mut self,
        remote_job_dir: &str,
        local_workspace_dir: &Path,
    ) -> Result<(), HpcError> {
        let remote_tarball = format!("{}/{remote_job_dir}/results.tar.gz", self.workspaces_dir());
        let sftp = self.sftp.sftp().map_err(|e| HpcError::Transfer(e.to_string()))?;
        let mut remote_file = sftp
            .open(Path::new(&remote_tarball))
            .map_err(|e| HpcError::Transfer(e.to_string()))?;
        let mut bytes = Vec::new();
        remote_file.read_to_end(&mut bytes).map_err(|e| HpcError::Transfer(e.to_string()))?;

        let partial_dir = local_workspace_dir.with_extension("partial");
        std::fs::create_dir_all(&partial_dir).map_err(|e| HpcError::Transfer(e.to_string()))?;
        let decoder = flate2::read::GzDecoder::new(bytes.as_slice());
        let mut archive = tar::Archive::new(decoder);
        archive.unpack(&partial_dir).map_err(|e| HpcError::Transfer(e.to_string()))?;

        if local_workspace_dir.exists() {
            std::fs::remove_dir_all(local_workspace_dir).map_err(|e| HpcError::Transfer(e.to_string()))?;
        }
        std::fs::rename(&partial_dir, local_workspace_dir).map_err(|e| HpcError::Transfer(e.to_string()))?;
        debug!(remote_job_dir, local = %local_workspace_dir.display(), "unpacked HPC results");
        Ok(())
    }
}

/// `sbatch` prints `Submitted batch job <id>` on success.
fn parse_sbatch_job_id(stdout: &str) -> Option<String> {
    stdout
        .split_whitespace()
        .last()
        .filter(|tok| tok.chars().all(|c| c.is_ascii_digit()))
        .map(|tok| tok.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_sbatch_output() {
        assert_eq!(parse_sbatch_job_id("Submitted batch job 123456\n"), Some("123456".to_string()));
    }

    #[test]
    fn rejects_unparseable_output() {
        assert_eq!(parse_sbatch_job_id("sbatch: error: invalid option\n"), None);
    }
}
