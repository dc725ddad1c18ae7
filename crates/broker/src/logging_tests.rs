// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn broker_log_path_uses_pid_suffix() {
    let dir = PathBuf::from("/var/log/operandi");
    assert_eq!(broker_log_path(&dir, 123), dir.join("broker_123.log"));
}

#[test]
fn worker_log_path_uses_pid_and_queue_suffix() {
    let dir = PathBuf::from("/var/log/operandi");
    assert_eq!(
        worker_log_path(&dir, 456, "harvester_queue"),
        dir.join("worker_456_harvester_queue.log")
    );
}

#[test]
fn logs_dir_honors_env_override() {
    // SAFETY-equivalent: serialized by the test harness's single-threaded
    // default for `#[test]` unless explicitly parallelized; env var tests
    // only read the value this test itself sets.
    std::env::set_var("OPERANDI_LOGS_DIR", "/tmp/operandi-test-logs");
    assert_eq!(logs_dir(), PathBuf::from("/tmp/operandi-test-logs"));
    std::env::remove_var("OPERANDI_LOGS_DIR");
}
