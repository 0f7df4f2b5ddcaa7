// ABOUTME: Structured error types for device-cloud API and OAuth operations
// ABOUTME: Distinguishes unauthorized grants from rate limits and retryable API failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use thiserror::Error;

/// Errors returned by the device-cloud client and OAuth token handling
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider rejected the access or refresh token
    #[error("{provider} rejected the authorization: {reason}")]
    Unauthorized {
        /// Provider name
        provider: String,
        /// Reason reported by the provider or client
        reason: String,
    },

    /// Too many requests; retries were exhausted
    #[error("{provider} rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded {
        /// Provider name
        provider: String,
        /// Suggested wait before retrying
        retry_after_secs: u64,
    },

    /// Non-success response other than 401/429
    #[error("{provider} API error ({status_code}): {message}")]
    ApiError {
        /// Provider name
        provider: String,
        /// HTTP status code
        status_code: u16,
        /// Response excerpt
        message: String,
        /// Whether repeating the request may succeed
        retryable: bool,
    },

    /// Transport failure before a response was received
    #[error("{provider} request failed: {message}")]
    Network {
        /// Provider name
        provider: String,
        /// Transport error description
        message: String,
    },

    /// Response body or token could not be interpreted
    #[error("{provider} returned invalid {field}: {reason}")]
    InvalidData {
        /// Provider name
        provider: String,
        /// Offending field or document
        field: String,
        /// Parse failure description
        reason: String,
    },

    /// Rotation was queried before any HTTP client was bound
    #[error("token source missing")]
    TokenSourceMissing,
}

impl ProviderError {
    /// Whether the failure means the OAuth grant is invalid
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Whether repeating the call may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimitExceeded { .. } | Self::Network { .. } => true,
            Self::ApiError { retryable, .. } => *retryable,
            Self::Unauthorized { .. } | Self::InvalidData { .. } | Self::TokenSourceMissing => {
                false
            }
        }
    }
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;
