// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded exponential backoff with jitter, shared by the message-bus
//! reconnect loop and the supervisor's respawn loop. Both use the same
//! "initial 1 s, cap 30 s" policy; this is the one place it's encoded.

use rand::Rng;
use std::time::Duration;

const INITIAL: Duration = Duration::from_secs(1);
const CAP: Duration = Duration::from_secs(30);
const JITTER_FRACTION: f64 = 0.2;

/// Delay before the `attempt`-th retry (0-indexed: `attempt == 0` is the
/// first retry after an initial failure). Grows as `INITIAL * 2^attempt`,
/// clamped to `CAP`, then jittered by up to ±20% so a fleet of workers
/// failing at once doesn't retry in lockstep.
pub fn next_delay(attempt: u32, rng: &mut impl Rng) -> Duration {
    let exp = INITIAL.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    let base = exp.min(CAP);
    jitter(base, rng)
}

/// The backoff cap, exposed so callers can judge "has this process been
/// running long enough to no longer count as a rapid, consecutive
/// failure" against the same threshold `next_delay` clamps to.
pub const fn cap() -> Duration {
    CAP
}

fn jitter(base: Duration, rng: &mut impl Rng) -> Duration {
    let factor = rng.random_range((1.0 - JITTER_FRACTION)..=(1.0 + JITTER_FRACTION));
    Duration::from_secs_f64((base.as_secs_f64() * factor).max(0.0))
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
