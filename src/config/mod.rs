// ABOUTME: Configuration module for the CGM sync worker
// ABOUTME: Environment-driven settings for endpoints, credentials, timing, and retries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module
//!
//! All settings come from environment variables; see [`environment::env_keys`].

/// Environment variable configuration
pub mod environment;

pub use environment::{ApiConfig, Environment, RetryConfig, SyncConfig};
