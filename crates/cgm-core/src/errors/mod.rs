// ABOUTME: Unified error types with stable error codes for tasks and data sources
// ABOUTME: Classifies failures into permanent and retryable outcomes for the scheduler
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Every failure surfaced on a task or data source carries one of a small set of
//! stable codes. The code decides whether the scheduler retries the task:
//!
//! - `invalid-state`: malformed task payload or missing linked records (permanent)
//! - `authentication-failure`: the OAuth grant is no longer valid (permanent)
//! - `resource-failure`: anything transient (retried after the fixed backoff)

/// External device-cloud error taxonomy
pub mod provider;

pub use provider::{ProviderError, ProviderResult};

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Standard error codes surfaced on task and data source error fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The OAuth grant is no longer valid
    #[serde(rename = "authentication-failure")]
    AuthenticationFailure,
    /// Malformed task payload or missing linked records
    #[serde(rename = "invalid-state")]
    InvalidState,
    /// Transient failure of a store or the external API
    #[serde(rename = "resource-failure")]
    ResourceFailure,
    /// Invalid or missing configuration
    #[serde(rename = "config-invalid")]
    ConfigInvalid,
}

impl ErrorCode {
    /// Stable string form of the code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthenticationFailure => "authentication-failure",
            Self::InvalidState => "invalid-state",
            Self::ResourceFailure => "resource-failure",
            Self::ConfigInvalid => "config-invalid",
        }
    }

    /// Whether a task failing with this code must never be retried
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        !matches!(self, Self::ResourceFailure)
    }

    /// Human-readable description of this code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AuthenticationFailure => "Authentication with the device cloud failed",
            Self::InvalidState => "Task or linked record is in an invalid state",
            Self::ResourceFailure => "A dependent resource failed",
            Self::ConfigInvalid => "Configuration is invalid",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Malformed payload or missing linked record
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, message)
    }

    /// Invalid OAuth grant
    pub fn authentication_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthenticationFailure, message)
    }

    /// Transient store or network failure
    pub fn resource_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceFailure, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, message)
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether the scheduler must not retry this failure
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        self.code.is_permanent()
    }

    /// Message followed by every source in the chain
    #[must_use]
    pub fn chain_message(&self) -> String {
        let mut message = self.message.clone();
        let mut current = self.source.as_deref().map(|s| s as &dyn StdError);
        while let Some(err) = current {
            message.push_str(": ");
            message.push_str(&err.to_string());
            current = err.source();
        }
        message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Serialized error stored on tasks and data sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Stable error code
    pub code: ErrorCode,
    /// Message including the source chain
    pub message: String,
}

impl From<&AppError> for ErrorRecord {
    fn from(error: &AppError) -> Self {
        Self {
            code: error.code,
            message: error.chain_message(),
        }
    }
}
