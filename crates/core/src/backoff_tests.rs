// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

#[test]
fn first_attempt_is_near_initial_delay() {
    let mut rng = rng();
    let d = next_delay(0, &mut rng);
    assert!(d >= Duration::from_millis(800) && d <= Duration::from_millis(1200));
}

#[test]
fn delay_grows_with_attempt_number() {
    let mut rng = rng();
    let d0 = next_delay(0, &mut rng);
    let d3 = next_delay(3, &mut rng);
    assert!(d3 > d0);
}

#[test]
fn delay_never_exceeds_jittered_cap() {
    let mut rng = rng();
    for attempt in 0..40 {
        let d = next_delay(attempt, &mut rng);
        assert!(d <= Duration::from_secs_f64(30.0 * 1.2 + 0.001), "attempt {attempt} gave {d:?}");
    }
}

#[test]
fn huge_attempt_counts_saturate_instead_of_overflowing() {
    let mut rng = rng();
    let d = next_delay(u32::MAX, &mut rng);
    assert!(d <= Duration::from_secs_f64(30.0 * 1.2 + 0.001));
}

#[test]
fn cap_matches_the_unjittered_ceiling_next_delay_clamps_to() {
    assert_eq!(cap(), Duration::from_secs(30));
}
