// ABOUTME: Core types and constants for the CGM sync platform
// ABOUTME: Foundation crate with error handling, protocol constants, models, and backoff policies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # CGM Core
//!
//! Foundation crate providing shared types and constants for continuous glucose
//! monitor telemetry sync. This crate is designed to change infrequently, enabling
//! incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and `ProviderError`
//! - **constants**: Protocol constants (fetch windows, chunk sizes, time quantization)
//! - **models**: Tasks, provider sessions, data sources, datasets, and translated data
//! - **backoff**: Fixed and exponential-jittered retry policies
//! - **clock**: Injectable wall clock

/// Fixed and exponential-jittered backoff policies
pub mod backoff;

/// Injectable wall clock
pub mod clock;

/// Protocol constants organized by domain
pub mod constants;

/// Unified error handling system with stable error codes
pub mod errors;

/// Core data models
pub mod models;
