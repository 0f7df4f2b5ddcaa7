// ABOUTME: OAuth refresh provider, refresh-capable HTTP client, and rotation-detecting token source
// ABOUTME: Lets the runner persist tokens the device cloud rotated while requests were in flight
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Token Source
//!
//! A [`TokenSource`] wraps the token stored on a provider session. Binding it to an
//! [`OAuthProvider`] yields an [`AuthorizedClient`] that refreshes the token on its
//! own whenever it is about to expire. The source keeps the token it was built with,
//! so after each request the runner can ask whether the client's current token has
//! moved on and persist the rotated one.

use crate::http_client::shared_client;
use async_trait::async_trait;
use cgm_core::errors::{ProviderError, ProviderResult};
use cgm_core::models::OAuthToken;
use chrono::{Duration, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use url::Url;

/// Tokens expiring within this margin are refreshed before use
const REFRESH_MARGIN_SECS: i64 = 10;

/// Capability to exchange a refresh token for a new token
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Provider name used in logs and errors
    fn name(&self) -> &str;

    /// Obtain a new token using `token`'s refresh token
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Unauthorized`] if the grant was revoked or the token has
    /// no refresh token, and other variants for transport or provider failures
    async fn refresh(&self, token: &OAuthToken) -> ProviderResult<OAuthToken>;
}

/// Client credentials and token endpoint of an OAuth provider
#[derive(Debug, Clone)]
pub struct OAuthProviderConfig {
    /// Provider name
    pub name: String,
    /// OAuth client identifier
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Token endpoint
    pub token_url: Url,
}

#[derive(Debug, Deserialize)]
struct TokenRefreshResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Refreshes tokens with a `refresh_token` grant posted to the token endpoint
pub struct HttpOAuthProvider {
    config: OAuthProviderConfig,
    client: Client,
}

impl HttpOAuthProvider {
    /// Provider using the shared HTTP client
    #[must_use]
    pub fn new(config: OAuthProviderConfig) -> Self {
        Self::with_client(config, shared_client().clone())
    }

    /// Provider using the given HTTP client
    #[must_use]
    pub const fn with_client(config: OAuthProviderConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl OAuthProvider for HttpOAuthProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn refresh(&self, token: &OAuthToken) -> ProviderResult<OAuthToken> {
        let provider = self.config.name.clone();
        let refresh_token = token.refresh_token().ok_or_else(|| ProviderError::Unauthorized {
            provider: provider.clone(),
            reason: "token has no refresh token".to_owned(),
        })?;

        info!(provider = %provider, "refreshing oauth token");

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let response = self
            .client
            .post(self.config.token_url.clone())
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Network {
                provider: provider.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(provider = %provider, status = status.as_u16(), "token refresh rejected");
            if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
                return Err(ProviderError::Unauthorized {
                    provider,
                    reason: format!("token refresh rejected with status {status}: {text}"),
                });
            }
            return Err(ProviderError::ApiError {
                provider,
                status_code: status.as_u16(),
                message: text,
                retryable: status.is_server_error(),
            });
        }

        let refreshed: TokenRefreshResponse =
            response.json().await.map_err(|e| ProviderError::InvalidData {
                provider: provider.clone(),
                field: "token response".to_owned(),
                reason: e.to_string(),
            })?;

        let expiration_time = refreshed
            .expires_in
            .map(|seconds| Utc::now() + Duration::seconds(seconds));
        Ok(token.rotated(
            refreshed.access_token,
            refreshed.token_type,
            refreshed.refresh_token,
            expiration_time,
        ))
    }
}

/// HTTP client that authorizes requests and refreshes its token transparently
pub struct AuthorizedClient {
    http: Client,
    provider: Arc<dyn OAuthProvider>,
    token: Mutex<OAuthToken>,
}

impl AuthorizedClient {
    /// Client holding `token`
    #[must_use]
    pub fn new(http: Client, provider: Arc<dyn OAuthProvider>, token: OAuthToken) -> Self {
        Self {
            http,
            provider,
            token: Mutex::new(token),
        }
    }

    /// Token currently held, possibly rotated since construction
    pub async fn current_token(&self) -> OAuthToken {
        self.token.lock().await.clone()
    }

    /// `Authorization` header value, refreshing first if the token is about to expire
    ///
    /// # Errors
    ///
    /// Returns the provider's refresh error
    pub async fn authorization(&self) -> ProviderResult<String> {
        let mut token = self.token.lock().await;
        if token.expires_within(Utc::now(), Duration::seconds(REFRESH_MARGIN_SECS)) {
            let refreshed = self.provider.refresh(&token).await?;
            debug!(provider = %self.provider.name(), "oauth token rotated");
            *token = refreshed;
        }
        Ok(token.authorization_value())
    }

    /// Authorized GET request
    ///
    /// # Errors
    ///
    /// Returns the refresh error or [`ProviderError::Network`] if the request fails
    pub async fn get(&self, url: Url) -> ProviderResult<Response> {
        let authorization = self.authorization().await?;
        self.http
            .get(url)
            .header(AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| ProviderError::Network {
                provider: self.provider.name().to_owned(),
                message: e.to_string(),
            })
    }
}

/// OAuth token wrapper that detects rotation performed by its bound client
pub struct TokenSource {
    token: RwLock<OAuthToken>,
    client: RwLock<Option<Arc<AuthorizedClient>>>,
}

impl TokenSource {
    /// Source holding the token stored on a provider session
    #[must_use]
    pub fn new(token: OAuthToken) -> Self {
        Self {
            token: RwLock::new(token),
            client: RwLock::new(None),
        }
    }

    /// Client bound to `provider`; built on first call and cached afterwards
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Unauthorized`] if the held token can neither authorize a
    /// request nor be refreshed
    pub async fn http_client(
        &self,
        provider: Arc<dyn OAuthProvider>,
    ) -> ProviderResult<Arc<AuthorizedClient>> {
        let mut cached = self.client.write().await;
        if let Some(client) = cached.as_ref() {
            return Ok(Arc::clone(client));
        }

        let token = self.token.read().await.clone();
        if token.access_token().is_empty() && token.refresh_token().is_none() {
            return Err(ProviderError::Unauthorized {
                provider: provider.name().to_owned(),
                reason: "token has neither access token nor refresh token".to_owned(),
            });
        }

        let client = Arc::new(AuthorizedClient::new(
            shared_client().clone(),
            provider,
            token,
        ));
        *cached = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Token the bound client rotated to, or `None` if unchanged
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::TokenSourceMissing`] if no client was bound
    pub async fn refreshed_token(&self) -> ProviderResult<Option<OAuthToken>> {
        let client = self
            .client
            .read()
            .await
            .clone()
            .ok_or(ProviderError::TokenSourceMissing)?;
        let current = client.current_token().await;
        let held = self.token.read().await;
        if current == *held {
            Ok(None)
        } else {
            Ok(Some(current))
        }
    }

    /// Drop the bound client and mark the held token expired so the next client refreshes
    ///
    /// The expired copy is taken from the dropped client's current token, so a rotation it
    /// performed is refreshed from rather than discarded.
    pub async fn expire_token(&self) {
        let dropped = self.client.write().await.take();
        let latest = match dropped {
            Some(client) => client.current_token().await,
            None => self.token.read().await.clone(),
        };
        *self.token.write().await = latest.expired_at(Utc::now());
    }

    /// Adopt a persisted token as the baseline for rotation detection
    pub async fn rebase(&self, token: OAuthToken) {
        *self.token.write().await = token;
    }

    /// Token the source currently compares against
    pub async fn token(&self) -> OAuthToken {
        self.token.read().await.clone()
    }
}
