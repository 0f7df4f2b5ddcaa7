// ABOUTME: Environment configuration for the CGM sync worker
// ABOUTME: Parses device-cloud endpoints, OAuth client credentials, timeouts, and retry settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration

use crate::fetch::RunnerSettings;
use anyhow::{anyhow, bail, Context, Result};
use cgm_core::backoff::{ExponentialBackoff, FixedBackoff};
use cgm_core::constants::{protocol, provider};
use cgm_providers::{DeviceCloudConfig, HttpClientSettings, OAuthProviderConfig};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Environment variable names
pub mod env_keys {
    /// Device-cloud API base URL
    pub const API_BASE_URL: &str = "CGM_API_BASE_URL";
    /// OAuth token endpoint
    pub const TOKEN_URL: &str = "CGM_TOKEN_URL";
    /// OAuth client identifier
    pub const CLIENT_ID: &str = "CGM_CLIENT_ID";
    /// OAuth client secret
    pub const CLIENT_SECRET: &str = "CGM_CLIENT_SECRET";
    /// Whole-request timeout in seconds
    pub const HTTP_TIMEOUT_SECS: &str = "CGM_HTTP_TIMEOUT_SECS";
    /// Connect timeout in seconds
    pub const HTTP_CONNECT_TIMEOUT_SECS: &str = "CGM_HTTP_CONNECT_TIMEOUT_SECS";
    /// Delay between successful runs in seconds
    pub const POLL_INTERVAL_SECS: &str = "CGM_POLL_INTERVAL_SECS";
    /// Upper bound of one execution in seconds
    pub const TASK_DEADLINE_SECS: &str = "CGM_TASK_DEADLINE_SECS";
    /// Attempts per rate-limited request
    pub const RETRY_MAX_ATTEMPTS: &str = "CGM_RETRY_MAX_ATTEMPTS";
    /// First rate-limit backoff in milliseconds
    pub const RETRY_BASE_DELAY_MS: &str = "CGM_RETRY_BASE_DELAY_MS";
    /// Largest rate-limit backoff in milliseconds
    pub const RETRY_MAX_DELAY_MS: &str = "CGM_RETRY_MAX_DELAY_MS";
    /// Rate-limit backoff jitter fraction
    pub const RETRY_JITTER_FACTOR: &str = "CGM_RETRY_JITTER_FACTOR";
    /// Deployment environment
    pub const ENVIRONMENT: &str = "ENVIRONMENT";
}

const DEFAULT_API_BASE_URL: &str = "https://api.dexcom.com";
const TOKEN_PATH: &str = "v2/oauth2/token";

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Device-cloud endpoints and OAuth client credentials
#[derive(Clone)]
pub struct ApiConfig {
    /// API base URL
    pub base_url: Url,
    /// OAuth token endpoint
    pub token_url: Url,
    /// OAuth client identifier
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Rate-limit retry behaviour of device-cloud requests
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts per request
    pub max_attempts: u32,
    /// Backoff between attempts
    pub backoff: ExponentialBackoff,
}

/// Complete configuration of the sync worker
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Deployment environment
    pub environment: Environment,
    /// Endpoints and credentials
    pub api: ApiConfig,
    /// Shared HTTP client timeouts
    pub http: HttpClientSettings,
    /// Delay between successful runs
    pub poll_interval: Duration,
    /// Upper bound of one execution
    pub task_deadline: Duration,
    /// Rate-limit retries
    pub retry: RetryConfig,
}

impl SyncConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable if a required value is missing or any
    /// value fails to parse or validate
    pub fn from_env() -> Result<Self> {
        let base_url = parse_url_var(env_keys::API_BASE_URL, DEFAULT_API_BASE_URL)?;
        let token_url = match env::var(env_keys::TOKEN_URL) {
            Ok(raw) if !raw.trim().is_empty() => Url::parse(raw.trim())
                .with_context(|| format!("Invalid {} value", env_keys::TOKEN_URL))?,
            _ => directory_url(&base_url)
                .join(TOKEN_PATH)
                .with_context(|| format!("Invalid {} value", env_keys::API_BASE_URL))?,
        };

        let config = Self {
            environment: Environment::from_str_or_default(
                &env::var(env_keys::ENVIRONMENT).unwrap_or_default(),
            ),
            api: ApiConfig {
                base_url,
                token_url,
                client_id: required_var(env_keys::CLIENT_ID)?,
                client_secret: required_var(env_keys::CLIENT_SECRET)?,
            },
            http: HttpClientSettings {
                timeout: Duration::from_secs(parse_var(env_keys::HTTP_TIMEOUT_SECS, 30_u64)?),
                connect_timeout: Duration::from_secs(parse_var(
                    env_keys::HTTP_CONNECT_TIMEOUT_SECS,
                    10_u64,
                )?),
            },
            poll_interval: Duration::from_secs(parse_var(
                env_keys::POLL_INTERVAL_SECS,
                protocol::DEFAULT_POLL_INTERVAL_SECS,
            )?),
            task_deadline: Duration::from_secs(parse_var(
                env_keys::TASK_DEADLINE_SECS,
                protocol::DEFAULT_TASK_DEADLINE_SECS,
            )?),
            retry: RetryConfig {
                max_attempts: parse_var(env_keys::RETRY_MAX_ATTEMPTS, 3_u32)?,
                backoff: ExponentialBackoff {
                    base_delay: Duration::from_millis(parse_var(
                        env_keys::RETRY_BASE_DELAY_MS,
                        1000_u64,
                    )?),
                    max_delay: Duration::from_millis(parse_var(
                        env_keys::RETRY_MAX_DELAY_MS,
                        30_000_u64,
                    )?),
                    jitter_factor: parse_var(env_keys::RETRY_JITTER_FACTOR, 0.1_f64)?,
                },
            },
        };

        config.validate()?;
        info!(
            environment = %config.environment,
            api_base_url = %config.api.base_url,
            "loaded sync configuration"
        );
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated constraint
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            bail!("{} must be at least 1", env_keys::RETRY_MAX_ATTEMPTS);
        }
        if !(0.0..=1.0).contains(&self.retry.backoff.jitter_factor) {
            bail!("{} must be between 0.0 and 1.0", env_keys::RETRY_JITTER_FACTOR);
        }
        if self.retry.backoff.base_delay > self.retry.backoff.max_delay {
            bail!(
                "{} must not exceed {}",
                env_keys::RETRY_BASE_DELAY_MS,
                env_keys::RETRY_MAX_DELAY_MS
            );
        }
        if self.task_deadline.is_zero() {
            bail!("{} must be positive", env_keys::TASK_DEADLINE_SECS);
        }
        if self.poll_interval.is_zero() {
            bail!("{} must be positive", env_keys::POLL_INTERVAL_SECS);
        }
        Ok(())
    }

    /// Token endpoint settings for the OAuth refresh provider
    #[must_use]
    pub fn oauth_provider_config(&self) -> OAuthProviderConfig {
        OAuthProviderConfig {
            name: provider::PROVIDER_NAME.to_owned(),
            client_id: self.api.client_id.clone(),
            client_secret: self.api.client_secret.clone(),
            token_url: self.api.token_url.clone(),
        }
    }

    /// Device-cloud client settings
    #[must_use]
    pub fn device_cloud_config(&self) -> DeviceCloudConfig {
        let mut config = DeviceCloudConfig::new(self.api.base_url.clone());
        config.max_attempts = self.retry.max_attempts;
        config.retry_backoff = self.retry.backoff.clone();
        config
    }

    /// Runner timing settings
    #[must_use]
    pub fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            poll_interval: self.poll_interval,
            deadline: self.task_deadline,
            retry_backoff: FixedBackoff::default(),
        }
    }

    /// One-line summary without secrets
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "environment={} api={} token={} poll={}s deadline={}s retries={}",
            self.environment,
            self.api.base_url,
            self.api.token_url,
            self.poll_interval.as_secs(),
            self.task_deadline.as_secs(),
            self.retry.max_attempts
        )
    }
}

fn directory_url(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn required_var(key: &str) -> Result<String> {
    let value = env::var(key).with_context(|| format!("{key} must be set"))?;
    if value.trim().is_empty() {
        return Err(anyhow!("{key} must not be empty"));
    }
    Ok(value)
}

fn parse_url_var(key: &str, default: &str) -> Result<Url> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_owned());
    Url::parse(raw.trim()).with_context(|| format!("Invalid {key} value"))
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::from_str_or_default("PROD"),
            Environment::Production
        );
        assert_eq!(Environment::from_str_or_default("test"), Environment::Testing);
        assert_eq!(
            Environment::from_str_or_default("whatever"),
            Environment::Development
        );
    }

    #[test]
    fn test_directory_url_appends_slash_once() {
        let url = Url::parse("https://example.com/sandbox").unwrap();
        assert_eq!(directory_url(&url).as_str(), "https://example.com/sandbox/");

        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(directory_url(&url).as_str(), "https://example.com/");
    }

    #[test]
    fn test_api_config_debug_redacts_secret() {
        let api = ApiConfig {
            base_url: Url::parse("https://example.com").unwrap(),
            token_url: Url::parse("https://example.com/token").unwrap(),
            client_id: "id".to_owned(),
            client_secret: "hunter2".to_owned(),
        };
        let debug = format!("{api:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }
}
