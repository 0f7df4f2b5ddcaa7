// ABOUTME: Backoff policies for task re-delivery and HTTP retry loops
// ABOUTME: Fixed delay for failed fetch tasks, exponential with jitter for rate-limited requests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! The fetch task and the HTTP retry loop back off differently. A transiently failed
//! task waits a fixed hour before the scheduler re-delivers it; a rate-limited request
//! inside one execution waits an exponentially growing, jittered delay. The two are
//! separate policies and are never mixed.

use crate::constants::protocol::RETRY_BACKOFF_SECS;
use rand::Rng;
use std::time::Duration;

/// Delay to wait before the given attempt
pub trait BackoffPolicy: Send + Sync {
    /// Delay before retry number `attempt` (1-based)
    fn delay(&self, attempt: u32) -> Duration;
}

/// Same delay for every attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    /// Create a fixed policy
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(RETRY_BACKOFF_SECS))
    }
}

impl BackoffPolicy for FixedBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// `base * 2^(attempt - 1)`, capped at `max_delay`, then spread by `± jitter_factor`
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound before jitter
    pub max_delay: Duration,
    /// Fraction of the delay randomly added or removed (0.0 disables jitter)
    pub jitter_factor: f64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            jitter_factor: 0.1,
        }
    }
}

impl ExponentialBackoff {
    /// Delay before jitter is applied
    #[must_use]
    pub fn undithered_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay)
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let delay = self.undithered_delay(attempt);
        let jitter = self.jitter_factor.clamp(0.0, 1.0);
        if jitter <= f64::EPSILON {
            return delay;
        }
        let spread = rand::thread_rng().gen_range(-jitter..=jitter);
        delay.mul_f64(1.0 + spread)
    }
}
