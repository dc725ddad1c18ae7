// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level error type for the supervisor binary, covering both
//! supervisor-fatal errors and permanent per-worker failures.

use thiserror::Error;

/// Errors that can terminate the supervisor or a worker process.
///
/// [`BrokerError::exit_code`] maps errors to process exit codes:
/// 0 clean shutdown, 2 URL validation failure, 1 any other fatal error.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("invalid message bus URL {url:?}: {reason}")]
    InvalidAmqpUrl { url: String, reason: String },
    #[error("invalid database URL {url:?}: {reason}")]
    InvalidDbUrl { url: String, reason: String },
    #[error("failed to spawn worker for queue {queue}: {source}")]
    Spawn { queue: String, source: std::io::Error },
    #[error("signal handler installation failed: {0}")]
    Signal(#[from] std::io::Error),
    #[error("failed to initialize logging: {0}")]
    LogInit(std::io::Error),
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
    #[error("permanent per-worker failure: {reason}")]
    WorkerFatal { reason: String },
    #[error(transparent)]
    Store(#[from] operandi_store::StoreError),
    #[error(transparent)]
    Bus(#[from] operandi_adapters::MessageBusError),
    #[error(transparent)]
    Hpc(#[from] operandi_adapters::HpcError),
}

impl BrokerError {
    /// Exit code the process should use when this error is fatal.
    pub fn exit_code(&self) -> i32 {
        match self {
            BrokerError::InvalidAmqpUrl { .. } | BrokerError::InvalidDbUrl { .. } => 2,
            _ => 1,
        }
    }
}
