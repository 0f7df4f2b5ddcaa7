// ABOUTME: Scheduler-facing runner abstraction and the CGM fetch task runner
// ABOUTME: Defines the Runner trait, runner timing settings, and re-exports the fetch runner
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Fetch Task Runner
//!
//! A scheduler hands one [`Task`] at a time to the [`Runner`] registered for its type.
//! The runner mutates the task in place: on success it is rescheduled after the poll
//! interval, on a transient failure after the fixed retry backoff, and on a permanent
//! failure it is marked failed and never retried.
//!
//! Per execution, the fetch runner:
//!
//! 1. Resolves the provider session and data source named in the task data
//! 2. Walks 90-day windows from the data source cursor up to now
//! 3. Fetches devices, then calibrations, glucose values and events per window
//! 4. Persists any token the device cloud rotated before continuing
//! 5. Stores translated data in fixed-size chunks, advancing the cursor after each

mod execution;
mod runner;

pub use runner::{FetchRunner, FetchRunnerBuilder};

use async_trait::async_trait;
use cgm_core::backoff::FixedBackoff;
use cgm_core::constants::protocol::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TASK_DEADLINE_SECS};
use cgm_core::models::Task;
use std::time::Duration;

/// Executes tasks of one type on behalf of the scheduler
#[async_trait]
pub trait Runner: Send + Sync {
    /// Task type this runner accepts
    fn task_type(&self) -> &str;

    /// Upper bound of one execution
    fn deadline(&self) -> Duration;

    /// Execute `task` to completion, recording the outcome on the task itself
    async fn run(&self, task: &mut Task);
}

/// Timing knobs of the fetch runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Delay before the next run after a success
    pub poll_interval: Duration,
    /// Upper bound of one execution
    pub deadline: Duration,
    /// Delay before the next run after a transient failure
    pub retry_backoff: FixedBackoff,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            deadline: Duration::from_secs(DEFAULT_TASK_DEADLINE_SECS),
            retry_backoff: FixedBackoff::default(),
        }
    }
}
