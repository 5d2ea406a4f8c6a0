//! # Rate-Limit Backoff
//!
//! Explicit state driving the non-recursive solve loop across 429 events.
//! Each episode widens the inter-request delay for the rest of the run and
//! yields a cooldown of `retry_after + grace`.

use std::time::Duration;

/// Backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Initial delay between dispatches.
    pub delay: Duration,
    /// Added to the delay on every rate-limit episode.
    pub delay_increment: Duration,
    /// Added to the server's retry-after hint.
    pub grace: Duration,
    /// Used when the server gives no retry-after hint.
    pub default_retry_after: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1_000),
            delay_increment: Duration::from_millis(250),
            grace: Duration::from_secs(30),
            default_retry_after: Duration::from_secs(300),
        }
    }
}

/// Current throttle state of a run.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    delay: Duration,
    episodes: u32,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            delay: policy.delay,
            policy,
            episodes: 0,
        }
    }

    /// Delay to wait after each dispatch.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Rate-limit episodes seen so far.
    pub fn episodes(&self) -> u32 {
        self.episodes
    }

    /// Record a rate-limit episode and return the cooldown to observe.
    pub fn on_rate_limit(&mut self, retry_after: Option<Duration>) -> Duration {
        self.episodes += 1;
        self.delay = self.delay.saturating_add(self.policy.delay_increment);
        retry_after
            .unwrap_or(self.policy.default_retry_after)
            .saturating_add(self.policy.grace)
    }
}
