// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[test]
fn parses_known_scheduler_tokens() {
    assert_eq!(SlurmState::parse("COMPLETED"), SlurmState::Completed);
    assert_eq!(SlurmState::parse("OUT_OF_MEMORY"), SlurmState::OutOfMemory);
    assert_eq!(SlurmState::parse("  RUNNING "), SlurmState::Running);
}

#[test]
fn unrecognized_token_is_unknown_not_an_error() {
    assert_eq!(SlurmState::parse("SOME_FUTURE_STATE"), SlurmState::Unknown);
}

#[test]
fn display_round_trips_through_parse() {
    for state in SlurmState::ALL {
        assert_eq!(SlurmState::parse(&state.to_string()), *state);
    }
}

#[test]
fn mapping_matches_documented_table() {
    assert_eq!(map_slurm_to_job(SlurmState::Pending), Some(JobState::Pending));
    assert_eq!(map_slurm_to_job(SlurmState::Configuring), Some(JobState::Pending));
    assert_eq!(map_slurm_to_job(SlurmState::Running), Some(JobState::Running));
    assert_eq!(map_slurm_to_job(SlurmState::Completing), Some(JobState::Running));
    assert_eq!(map_slurm_to_job(SlurmState::Completed), Some(JobState::Success));
    assert_eq!(map_slurm_to_job(SlurmState::Failed), Some(JobState::Failed));
    assert_eq!(map_slurm_to_job(SlurmState::NodeFail), Some(JobState::Failed));
    assert_eq!(map_slurm_to_job(SlurmState::BootFail), Some(JobState::Failed));
    assert_eq!(map_slurm_to_job(SlurmState::Deadline), Some(JobState::Failed));
    assert_eq!(map_slurm_to_job(SlurmState::OutOfMemory), Some(JobState::Failed));
    assert_eq!(map_slurm_to_job(SlurmState::Timeout), Some(JobState::Failed));
    assert_eq!(map_slurm_to_job(SlurmState::Cancelled), Some(JobState::Cancelled));
    assert_eq!(map_slurm_to_job(SlurmState::Preempted), Some(JobState::Cancelled));
    assert_eq!(map_slurm_to_job(SlurmState::Revoked), Some(JobState::Cancelled));
}

#[test]
fn unknown_state_means_leave_job_state_unchanged() {
    assert_eq!(map_slurm_to_job(SlurmState::Unknown), None);
}

/// `map_slurm_to_job` is total over the closed SlurmState set and
/// deterministic.
#[test]
fn mapping_is_total_over_closed_state_set() {
    for state in SlurmState::ALL {
        if *state == SlurmState::Unknown {
            assert_eq!(map_slurm_to_job(*state), None);
        } else {
            assert!(map_slurm_to_job(*state).is_some(), "no mapping for {state}");
        }
    }
}

proptest! {
    #[test]
    fn mapping_is_deterministic(idx in 0usize..SlurmState::ALL.len()) {
        let state = SlurmState::ALL[idx];
        let a = map_slurm_to_job(state);
        let b = map_slurm_to_job(state);
        prop_assert_eq!(a, b);
    }
}
