// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn submission_message_decodes_from_json() {
    let body = br#"{"workflow_id":"wf-1","workspace_id":"ws-1","job_id":"job-1"}"#;
    let msg: SubmissionMessage = serde_json::from_slice(body).unwrap();
    assert_eq!(msg.workflow_id, WorkflowId::new("wf-1"));
    assert_eq!(msg.job_id, JobId::new("job-1"));
}

#[test]
fn status_probe_decodes_from_json() {
    let probe: StatusProbe = serde_json::from_slice(br#"{"job_id":"J1"}"#).unwrap();
    assert_eq!(probe.job_id, JobId::new("J1"));
}

#[test]
fn malformed_body_fails_to_decode() {
    let result: Result<SubmissionMessage, _> = serde_json::from_slice(b"not-json");
    assert!(result.is_err());
}
