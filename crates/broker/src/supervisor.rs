// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor: spawns one worker subprocess per known queue,
//! propagates SIGINT/SIGTERM in reverse spawn order on shutdown, and
//! respawns crashed workers with bounded backoff.
//!
//! The `Supervisor` owns only `WorkerHandle`s and never a
//! `StateStore`/`MessageBus` itself — it never touches the DB or the
//! message bus directly, so a crashed worker's sockets and SSH channels
//! are reclaimed by the OS on process exit rather than leaked into the
//! supervisor. It re-execs its own binary via `std::env::current_exe()`
//! with a hidden `worker --role <role> --queue <name>` subcommand, since
//! Rust has no portable fork-and-continue primitive.

use crate::config::{Role, SupervisorConfig};
use crate::error::BrokerError;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use operandi_core::backoff;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// The fixed set of queues the supervisor always spawns.
pub const KNOWN_QUEUES: &[(&str, Role)] = &[
    ("harvester_queue", Role::Consumer),
    ("users_queue", Role::Consumer),
    ("job_statuses_queue", Role::StatusChecker),
];

const GRACE_PERIOD: Duration = Duration::from_secs(3);
const MAX_CONSECUTIVE_FAILURES: u32 = 5;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Supervisor-owned record of one worker subprocess (process id, role,
/// restart bookkeeping — never shared with the worker it describes).
pub struct WorkerHandle {
    pub queue_name: String,
    pub role: Role,
    pub pid: u32,
    pub restart_count: u32,
    pub last_start: Instant,
    pub unhealthy: bool,
}

struct ManagedWorker {
    child: Child,
    handle: WorkerHandle,
}

pub struct Supervisor {
    config: SupervisorConfig,
    exe: std::path::PathBuf,
    workers: Vec<ManagedWorker>,
    shutdown: Arc<AtomicBool>,
}

/// True once a worker has stayed up long enough (past the backoff cap
/// since its last start) that a fresh crash should start a new
/// consecutive-failure streak rather than extend the old one. Split out
/// from [`Supervisor::respawn`] so the threshold is a unit test, not an
/// integration test against real process uptime.
fn should_reset_consecutive_failures(restart_count: u32, uptime: Duration) -> bool {
    restart_count > 0 && uptime >= backoff::cap()
}

/// Builds the `worker --role … --queue …` re-exec command. Split out from
/// [`Supervisor::spawn`] so argument construction is testable without
/// actually forking a process.
pub fn worker_command(exe: &std::path::Path, queue_name: &str, role: Role, config: &SupervisorConfig) -> Command {
    let mut cmd = Command::new(exe);
    let role_str = match role {
        Role::Consumer => "consumer",
        Role::StatusChecker => "status-checker",
    };
    cmd.arg("worker")
        .arg("--role")
        .arg(role_str)
        .arg("--queue")
        .arg(queue_name)
        .arg("--queue-url")
        .arg(&config.amqp_url)
        .arg("--database")
        .arg(&config.db_url);
    cmd
}

impl Supervisor {
    /// Spawns one worker subprocess for every known queue.
    pub fn start(config: SupervisorConfig) -> Result<Self, BrokerError> {
        let exe = std::env::current_exe().map_err(|source| BrokerError::Spawn {
            queue: "<supervisor>".to_string(),
            source,
        })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        install_signal_handlers(&shutdown)?;

        let mut workers = Vec::with_capacity(KNOWN_QUEUES.len());
        for (queue_name, role) in KNOWN_QUEUES {
            workers.push(Self::spawn(&exe, queue_name, *role, &config)?);
        }
        Ok(Self { config, exe, workers, shutdown })
    }

    fn spawn(
        exe: &std::path::Path,
        queue_name: &str,
        role: Role,
        config: &SupervisorConfig,
    ) -> Result<ManagedWorker, BrokerError> {
        let child = worker_command(exe, queue_name, role, config)
            .spawn()
            .map_err(|source| BrokerError::Spawn { queue: queue_name.to_string(), source })?;
        let pid = child.id();
        info!(queue = queue_name, pid, "spawned worker");
        Ok(ManagedWorker {
            child,
            handle: WorkerHandle {
                queue_name: queue_name.to_string(),
                role,
                pid,
                restart_count: 0,
                last_start: Instant::now(),
                unhealthy: false,
            },
        })
    }

    /// Parks, respawning crashed workers and propagating shutdown signals,
    /// until SIGINT/SIGTERM is received.
    pub fn run(mut self) -> Result<(), BrokerError> {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                self.shutdown_all();
                return Ok(());
            }

            for i in 0..self.workers.len() {
                let exited = match self.workers[i].child.try_wait() {
                    Ok(status) => status,
                    Err(e) => {
                        warn!(queue = %self.workers[i].handle.queue_name, error = %e, "try_wait failed");
                        None
                    }
                };
                let Some(status) = exited else { continue };
                if self.shutdown.load(Ordering::SeqCst) {
                    continue;
                }
                let queue_name = self.workers[i].handle.queue_name.clone();
                let role = self.workers[i].handle.role;
                if status.success() {
                    info!(queue = %queue_name, "worker exited cleanly, not respawning");
                    continue;
                }
                if self.workers[i].handle.unhealthy {
                    continue;
                }
                self.respawn(i, &queue_name, role);
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn respawn(&mut self, index: usize, queue_name: &str, role: Role) {
        // "5 consecutive failures" means rapid, back-to-back crashes, not
        // 5 crashes over the worker's entire lifetime. A worker that stayed
        // up past the backoff cap before crashing again has demonstrated
        // it can run healthily, so this crash starts a fresh streak.
        let uptime = self.workers[index].handle.last_start.elapsed();
        if should_reset_consecutive_failures(self.workers[index].handle.restart_count, uptime) {
            info!(
                queue = queue_name,
                uptime = ?uptime,
                "worker ran past the backoff cap before crashing, resetting consecutive-failure count"
            );
            self.workers[index].handle.restart_count = 0;
        }
        let restart_count = self.workers[index].handle.restart_count + 1;
        if restart_count > MAX_CONSECUTIVE_FAILURES {
            error!(queue = queue_name, restart_count, "queue unhealthy, giving up");
            self.workers[index].handle.unhealthy = true;
            return;
        }
        let mut rng = rand::rng();
        let delay = backoff::next_delay(restart_count.saturating_sub(1), &mut rng);
        warn!(queue = queue_name, restart_count, delay = ?delay, "worker crashed, respawning after backoff");
        std::thread::sleep(delay);
        match Self::spawn(&self.exe, queue_name, role, &self.config) {
            Ok(mut worker) => {
                worker.handle.restart_count = restart_count;
                self.workers[index] = worker;
            }
            Err(e) => error!(queue = queue_name, error = %e, "respawn failed"),
        }
    }

    /// SIGINT to every worker in reverse spawn order, then waits up to
    /// [`GRACE_PERIOD`] for them to exit before returning regardless.
    fn shutdown_all(&mut self) {
        info!("shutdown requested, signalling workers in reverse spawn order");
        for worker in self.workers.iter().rev() {
            if let Err(e) = kill(Pid::from_raw(worker.handle.pid as i32), Signal::SIGINT) {
                warn!(queue = %worker.handle.queue_name, pid = worker.handle.pid, error = %e, "failed to signal worker");
            }
        }
        let deadline = Instant::now() + GRACE_PERIOD;
        while Instant::now() < deadline {
            let all_exited = self
                .workers
                .iter_mut()
                .all(|w| matches!(w.child.try_wait(), Ok(Some(_))));
            if all_exited {
                break;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        info!("shutdown complete");
    }
}

fn install_signal_handlers(shutdown: &Arc<AtomicBool>) -> Result<(), BrokerError> {
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(shutdown))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(shutdown))?;
    Ok(())
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
