// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error type for domain-level validation failures.

use thiserror::Error;

/// Errors raised while constructing or validating domain entities.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown SLURM state: {0}")]
    UnknownSlurmState(String),
    #[error("invalid account type: {0}")]
    InvalidAccountType(String),
}
