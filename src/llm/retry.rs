//! Reusable retry/backoff policy
//!
//! One policy object shared by every call site that retries: exponential
//! backoff from `base` doubling up to `cap`, with ±12.5% jitter so
//! concurrent runs don't thunder in lockstep.

use std::time::Duration;

use rand::Rng;

/// Retry policy: total attempts and backoff shape
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first (so `attempts - 1` retries)
    pub attempts: u32,

    /// Backoff before the first retry
    pub base: Duration,

    /// Backoff ceiling
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base: Duration::from_secs(1),
            cap: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt count and backoff bounds
    pub fn new(attempts: u32, base: Duration, cap: Duration) -> Self {
        Self { attempts, base, cap }
    }

    /// Backoff before retry number `attempt` (1-based), jittered
    ///
    /// attempt 1 → ~base, attempt 2 → ~2×base, … capped at `cap`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let raw = self.base.saturating_mul(2u32.saturating_pow(exp)).min(self.cap);
        jitter(raw)
    }

    /// Upper bound on the sum of all backoff sleeps for one call
    pub fn backoff_budget(&self) -> Duration {
        (1..self.attempts).map(|a| self.base.saturating_mul(2u32.saturating_pow(a - 1)).min(self.cap)).sum()
    }
}

/// Apply ±12.5% jitter to a duration
fn jitter(d: Duration) -> Duration {
    let millis = d.as_millis() as u64;
    if millis == 0 {
        return d;
    }
    let spread = millis / 8;
    let low = millis - spread;
    let high = millis + spread + 1;
    Duration::from_millis(rand::rng().random_range(low..high))
}
