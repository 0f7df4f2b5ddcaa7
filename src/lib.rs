// ABOUTME: Main library entry point for the CGM telemetry sync worker
// ABOUTME: Wires configuration, logging, record translation, and the background fetch runner
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # CGM Sync
//!
//! Background fetch job that pulls continuous glucose monitor telemetry from a
//! third-party device cloud and writes it into the platform's continuous datasets.
//!
//! ## Architecture
//!
//! - **Config**: environment-only configuration of endpoints, credentials and timing
//! - **Logging**: `tracing` subscriber setup with json, pretty and compact output
//! - **Translate**: stateless translators from device-cloud records to platform data
//! - **Fetch**: the scheduler-facing runner that walks windows, rotates tokens and stores data
//! - **Clients**: capability traits for the platform services the runner talks to
//!
//! Shared types live in `cgm-core`; OAuth and the HTTP device cloud in `cgm-providers`.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cgm_sync::config::SyncConfig;
//! use cgm_sync::fetch::FetchRunnerBuilder;
//!
//! fn main() -> anyhow::Result<()> {
//!     cgm_sync::logging::init_from_env()?;
//!     let config = SyncConfig::from_env()?;
//!
//!     // Platform service clients are supplied by the hosting scheduler
//!     let _builder = FetchRunnerBuilder::from_config(&config);
//!     Ok(())
//! }
//! ```

/// Capability traits for platform services
pub mod clients;

/// Environment-based configuration
pub mod config;

/// Fetch task runner
pub mod fetch;

/// Structured logging setup
pub mod logging;

/// Device-cloud record translation
pub mod translate;

pub use cgm_core::errors::{AppError, AppResult, ErrorCode, ErrorRecord};
pub use fetch::{FetchRunner, FetchRunnerBuilder, Runner, RunnerSettings};
