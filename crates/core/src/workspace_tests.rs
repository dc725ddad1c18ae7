// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_workspace_is_ready_and_not_deleted() {
    let w = Workspace::new(WorkspaceId::new("ws-1"), PathBuf::from("/data/ws-1"));
    assert_eq!(w.state, WorkspaceState::Ready);
    assert!(!w.deleted);
    assert!(w.invariant_holds());
}

#[test]
fn deleted_ready_workspace_violates_invariant() {
    let mut w = Workspace::new(WorkspaceId::new("ws-1"), PathBuf::from("/data/ws-1"));
    w.deleted = true;
    assert!(!w.invariant_holds());
}

#[test]
fn deleted_non_ready_workspace_is_valid() {
    let mut w = Workspace::new(WorkspaceId::new("ws-1"), PathBuf::from("/data/ws-1"));
    w.deleted = true;
    w.state = WorkspaceState::Deleted;
    assert!(w.invariant_holds());
}

#[test]
fn display_matches_wire_spelling() {
    assert_eq!(WorkspaceState::TransferringToHpc.to_string(), "TRANSFERRING_TO_HPC");
}
