// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace entity: a unit of OCR input/output on disk.

use crate::id::WorkspaceId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle state of a [`Workspace`]. Exactly one applies at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkspaceState {
    Ready,
    TransferringToHpc,
    TransferringFromHpc,
    Deleted,
}

impl fmt::Display for WorkspaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceState::Ready => write!(f, "READY"),
            WorkspaceState::TransferringToHpc => write!(f, "TRANSFERRING_TO_HPC"),
            WorkspaceState::TransferringFromHpc => write!(f, "TRANSFERRING_FROM_HPC"),
            WorkspaceState::Deleted => write!(f, "DELETED"),
        }
    }
}

/// A unit of OCR input/output on disk, mirrored to HPC scratch during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub workspace_id: WorkspaceId,
    pub workspace_dir: PathBuf,
    pub state: WorkspaceState,
    #[serde(default)]
    pub deleted: bool,
}

impl Workspace {
    pub fn new(workspace_id: WorkspaceId, workspace_dir: PathBuf) -> Self {
        Self {
            workspace_id,
            workspace_dir,
            state: WorkspaceState::Ready,
            deleted: false,
        }
    }

    /// `deleted ⇒ state != READY`.
    pub fn invariant_holds(&self) -> bool {
        !self.deleted || self.state != WorkspaceState::Ready
    }

    /// Every field updatable through [`crate::schema`]-style allow-lists,
    /// excluding the primary id.
    pub const UPDATABLE_FIELDS: &'static [&'static str] = &["workspace_dir", "state", "deleted"];
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
