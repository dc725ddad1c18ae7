// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `broker` binary entry point: dispatches between the supervisor's `start`
//! subcommand and the hidden `worker` subcommand the supervisor re-execs
//! into per queue.

use operandi_broker::config::{Cli, Command, SupervisorConfig};
use operandi_broker::{logging, supervisor::Supervisor, worker_main, BrokerError};

fn main() {
    let cli = Cli::load();
    let pid = std::process::id();

    let result = match cli.command {
        Command::Start(args) => run_start(args, pid),
        Command::Worker(args) => run_worker(args, pid),
    };

    if let Err(e) = result {
        eprintln!("broker: {e}");
        std::process::exit(e.exit_code());
    }
}

fn run_start(args: operandi_broker::config::StartArgs, pid: u32) -> Result<(), BrokerError> {
    let config = SupervisorConfig::validate(&args)?;
    let log_path = logging::broker_log_path(&logging::logs_dir(), pid);
    let _guard = logging::init(&log_path).map_err(BrokerError::LogInit)?;
    tracing::info!(pid, "supervisor starting");
    let supervisor = Supervisor::start(config)?;
    supervisor.run()
}

fn run_worker(args: operandi_broker::config::WorkerArgs, pid: u32) -> Result<(), BrokerError> {
    let log_path = logging::worker_log_path(&logging::logs_dir(), pid, &args.queue);
    let _guard = logging::init(&log_path).map_err(BrokerError::LogInit)?;
    tracing::info!(pid, queue = %args.queue, role = ?args.role, "worker starting");
    worker_main::run(args)
}
