// ABOUTME: OAuth token value and provider session models
// ABOUTME: Tokens are immutable values replaced wholesale whenever the provider rotates them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// OAuth 2.0 token held by a provider session
///
/// The token is never mutated in place. Refreshing produces a new value that
/// replaces the old one atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthToken {
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiration_time: Option<DateTime<Utc>>,
}

impl OAuthToken {
    /// Create a token value
    pub fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        refresh_token: Option<String>,
        expiration_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            refresh_token,
            expiration_time,
        }
    }

    /// Access token presented to the device cloud
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Token type, usually `Bearer`
    #[must_use]
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Refresh token used to obtain the next access token
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Reject tokens that cannot authorize any request
    ///
    /// # Errors
    ///
    /// Returns `invalid-state` if the access token is empty
    pub fn validate(&self) -> AppResult<()> {
        if self.access_token.trim().is_empty() {
            return Err(AppError::invalid_state("oauth token access token is empty"));
        }
        Ok(())
    }

    /// Whether the token expires within `margin` of `now`
    #[must_use]
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expiration_time
            .is_some_and(|expiration| expiration <= now + margin)
    }

    /// Copy of this token that is already expired at `now`
    #[must_use]
    pub fn expired_at(&self, now: DateTime<Utc>) -> Self {
        Self {
            expiration_time: Some(now - Duration::seconds(1)),
            ..self.clone()
        }
    }

    /// Copy carrying a rotated access token, keeping the old refresh token if none was issued
    #[must_use]
    pub fn rotated(
        &self,
        access_token: impl Into<String>,
        token_type: Option<String>,
        refresh_token: Option<String>,
        expiration_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.unwrap_or_else(|| self.token_type.clone()),
            refresh_token: refresh_token.or_else(|| self.refresh_token.clone()),
            expiration_time,
        }
    }

    /// Value of the `Authorization` header for this token
    #[must_use]
    pub fn authorization_value(&self) -> String {
        let token_type = if self.token_type.is_empty() || self.token_type.eq_ignore_ascii_case("bearer")
        {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{token_type} {}", self.access_token)
    }
}

/// One user's authorization grant for one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSession {
    /// Session identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Current OAuth token, if the grant completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_token: Option<OAuthToken>,
    /// Provider type (`oauth`)
    #[serde(rename = "type")]
    pub provider_type: String,
    /// Provider name
    pub name: String,
}

/// Replacement of a provider session's token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSessionUpdate {
    /// Token that replaces the stored one wholesale
    pub oauth_token: OAuthToken,
}
