//! Exponential, jittered backoff for retried jobs: `30s * 2^attempt +/- 20%`,
//! the schedule named in the worker lifecycle's retry step. `attempt` is the
//! job's `retry_count` *after* the failure that produced this delay.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;

const BASE_SECS: f64 = 30.0;
const MAX_EXPONENT: u32 = 10; // caps the delay well under a day

pub fn next_attempt_at(attempt: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    let base = BASE_SECS * 2f64.powi(attempt.min(MAX_EXPONENT) as i32);
    let jitter = rand::rng().random_range(-0.2..=0.2);
    let secs = (base * (1.0 + jitter)).max(1.0);
    now + ChronoDuration::milliseconds((secs * 1000.0) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_is_roughly_30s() {
        let now = Utc::now();
        let at = next_attempt_at(0, now);
        let delta = (at - now).num_milliseconds() as f64 / 1000.0;
        assert!((24.0..=36.0).contains(&delta), "got {delta}");
    }

    #[test]
    fn backoff_grows_with_attempt() {
        let now = Utc::now();
        let first = next_attempt_at(1, now) - now;
        let third = next_attempt_at(3, now) - now;
        assert!(third > first);
    }
}
