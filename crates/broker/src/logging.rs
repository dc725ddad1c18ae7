// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process log file setup: each supervisor or worker process writes to
//! its own file, named `broker_<pid>.log` or `worker_<pid>_<queue>.log`.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Resolves `OPERANDI_LOGS_DIR`, falling back to an XDG-style state-dir
/// convention joined with `operandi/logs` when unset.
pub fn logs_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("OPERANDI_LOGS_DIR") {
        return PathBuf::from(dir);
    }
    let base = std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".local/state"))
                .unwrap_or_else(|_| PathBuf::from("/tmp"))
        });
    base.join("operandi/logs")
}

/// `<logs_dir>/broker_<pid>.log`.
pub fn broker_log_path(logs_dir: &Path, pid: u32) -> PathBuf {
    logs_dir.join(format!("broker_{pid}.log"))
}

/// `<logs_dir>/worker_<pid>_<queue>.log`.
pub fn worker_log_path(logs_dir: &Path, pid: u32, queue: &str) -> PathBuf {
    logs_dir.join(format!("worker_{pid}_{queue}.log"))
}

/// Installs a global `tracing` subscriber writing to `log_path`,
/// non-blocking. The returned [`WorkerGuard`] must be held for the process
/// lifetime — dropping it flushes and detaches the background writer
/// thread.
pub fn init(log_path: &Path) -> std::io::Result<WorkerGuard> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new().create(true).append(true).open(log_path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
