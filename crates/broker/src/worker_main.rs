// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process worker entry point, invoked by the supervisor as
//! `broker worker --role … --queue …`. Wires the concrete
//! `MongoStore`/`AmqpBus`/`SshHpcGateway` adapters to the pure pipeline
//! functions in `operandi-engine` and loops `consume`.

use crate::config::{parse_amqp_endpoint, Role, WorkerArgs};
use crate::error::BrokerError;
use operandi_adapters::{AmqpBus, HpcGateway, MessageBus, ProxyJumpConfig, QueueOptions, SshHpcGateway};
use operandi_engine::Disposition;
use operandi_store::{MongoStore, StateStore};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const CONSUME_TIMEOUT: Duration = Duration::from_secs(5);

/// Transient-retry budget for HPC errors: 3 attempts at 2s/4s/8s, no jitter.
const RETRY_DELAYS: [Duration; 3] =
    [Duration::from_secs(2), Duration::from_secs(4), Duration::from_secs(8)];

/// `job_statuses_queue` is auto-delete; the other known queues are durable.
pub fn queue_options_for(queue: &str) -> QueueOptions {
    if queue == "job_statuses_queue" {
        QueueOptions { durable: false, auto_delete: true }
    } else {
        QueueOptions { durable: true, auto_delete: false }
    }
}

/// Re-invokes `attempt` (the pipeline function closed over the same
/// delivery body) while it returns `RetryThenPoison`, sleeping the fixed
/// backoff schedule between tries. `RetryThenPoison` is only ever returned
/// for steps safe to repeat — read-only store/HPC lookups and local I/O —
/// never for a remote side effect whose outcome we can't observe after a
/// failure (`submit_slurm` is deliberately excluded: see `consumer.rs`), so
/// reprocessing the same body here can't double-submit a SLURM job. Once
/// the budget is exhausted, a persistent `RetryThenPoison` is downgraded to
/// `AckPoison` so the caller only ever sees a terminal disposition.
fn run_with_retries(mut attempt: impl FnMut() -> Disposition) -> Disposition {
    let mut last = attempt();
    for delay in RETRY_DELAYS {
        match last {
            Disposition::RetryThenPoison { .. } => {
                std::thread::sleep(delay);
                last = attempt();
            }
            _ => return last,
        }
    }
    match last {
        Disposition::RetryThenPoison { reason } => {
            Disposition::AckPoison { reason: format!("retry budget exhausted: {reason}") }
        }
        other => other,
    }
}

fn hpc_proxy_jump_from_env() -> Result<ProxyJumpConfig, BrokerError> {
    let target_host = std::env::var("OPERANDI_HPC_HOST")
        .map_err(|_| BrokerError::MissingEnv("OPERANDI_HPC_HOST"))?;
    let username = std::env::var("OPERANDI_HPC_USERNAME")
        .map_err(|_| BrokerError::MissingEnv("OPERANDI_HPC_USERNAME"))?;
    let key_path = std::env::var("OPERANDI_HPC_SSH_KEYPATH")
        .map_err(|_| BrokerError::MissingEnv("OPERANDI_HPC_SSH_KEYPATH"))?;
    let proxy_host = std::env::var("OPERANDI_HPC_PROXY_HOST").unwrap_or_default();
    let project_root_dir =
        std::env::var("OPERANDI_HPC_PROJECT_ROOT").unwrap_or_else(|_| "operandi".to_string());
    Ok(ProxyJumpConfig {
        proxy_host,
        target_host,
        username,
        key_path: PathBuf::from(key_path),
        project_root_dir,
    })
}

fn install_interrupt_handler(flag: &Arc<AtomicBool>) -> Result<(), BrokerError> {
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(flag))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(flag))?;
    Ok(())
}

/// Runs one worker process to completion. Returns `Ok(())` only when the
/// interrupt flag was observed between deliveries (clean shutdown); any
/// connection-layer error propagates as `Err` so `main` can exit non-zero
/// and the supervisor respawns.
pub fn run(args: WorkerArgs) -> Result<(), BrokerError> {
    // Become session leader so any grandchildren (e.g. local tar/untar
    // helpers) are owned by this worker, not the supervisor. Already being
    // a session leader is not an error.
    let _ = nix::unistd::setsid();

    let interrupt = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(&interrupt)?;

    let store = MongoStore::connect(&args.database, "operandi")?;
    let endpoint = parse_amqp_endpoint(&args.queue_url)?;
    let mut bus = AmqpBus::connect(&endpoint.host, endpoint.port, &endpoint.username, &endpoint.password)?;
    bus.declare_queue(&args.queue, queue_options_for(&args.queue))?;

    let mut hpc = SshHpcGateway::connect(hpc_proxy_jump_from_env()?)?;

    info!(queue = %args.queue, role = ?args.role, "worker ready, consuming");
    consume_loop(&args, &store, &mut bus, &mut hpc, &interrupt)
}

fn consume_loop(
    args: &WorkerArgs,
    store: &dyn StateStore,
    bus: &mut dyn MessageBus,
    hpc: &mut dyn HpcGateway,
    interrupt: &Arc<AtomicBool>,
) -> Result<(), BrokerError> {
    loop {
        if interrupt.load(Ordering::SeqCst) {
            info!(queue = %args.queue, "interrupt observed between deliveries, exiting");
            return Ok(());
        }

        let delivery = match bus.consume_one(&args.queue, CONSUME_TIMEOUT) {
            Ok(Some(delivery)) => delivery,
            Ok(None) => continue,
            Err(e) => {
                error!(queue = %args.queue, error = %e, "bus connection error, worker exiting");
                return Err(e.into());
            }
        };

        // On SIGTERM mid-handler the delivery is still acked once the
        // (synchronous, non-preemptible) handler completes, preserving
        // at-most-once delivery rather than introducing a workspace
        // snapshot to make nack+requeue safe.
        let disposition = run_with_retries(|| match args.role {
            Role::Consumer => operandi_engine::process_submission(store, hpc, &delivery.body),
            Role::StatusChecker => operandi_engine::process_status_probe(store, hpc, &delivery.body),
        });

        match disposition {
            Disposition::Ack => {
                bus.ack(delivery.delivery_tag)?;
            }
            Disposition::AckPoison { reason } => {
                warn!(queue = %args.queue, reason, "poison message, acking without retry");
                bus.ack(delivery.delivery_tag)?;
            }
            Disposition::RetryThenPoison { reason } => {
                // run_with_retries never returns this variant; kept so the
                // match stays exhaustive if the retry budget changes.
                warn!(queue = %args.queue, reason, "acking after exhausting retries");
                bus.ack(delivery.delivery_tag)?;
            }
            Disposition::WorkerFatal { reason } => {
                error!(queue = %args.queue, reason, "permanent per-worker failure");
                let _ = bus.nack(delivery.delivery_tag, true);
                return Err(BrokerError::WorkerFatal { reason });
            }
        }

        if interrupt.load(Ordering::SeqCst) {
            info!(queue = %args.queue, "interrupt observed after acking in-flight delivery, exiting");
            return Ok(());
        }
    }
}

#[cfg(test)]
#[path = "worker_main_tests.rs"]
mod tests;
