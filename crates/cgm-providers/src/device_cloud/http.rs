// ABOUTME: reqwest-backed device-cloud client with token rotation and rate-limit retries
// ABOUTME: Maps 401 to unauthorized after one expire-and-retry, 429 to jittered backoff, 5xx to retryable
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::records::{
    CalibrationRecord, CalibrationsResponse, DeviceRecord, DevicesResponse, EgvRecord,
    EgvsResponse, EventRecord, EventsResponse,
};
use super::{DeviceCloudClient, FetchWindow};
use crate::oauth::{OAuthProvider, TokenSource};
use async_trait::async_trait;
use cgm_core::backoff::{BackoffPolicy, ExponentialBackoff};
use cgm_core::errors::{ProviderError, ProviderResult};
use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};
use url::Url;

/// Where and how persistently to call the device cloud
#[derive(Debug, Clone)]
pub struct DeviceCloudConfig {
    /// API base, e.g. `https://api.dexcom.com`
    pub base_url: Url,
    /// Attempts per request before a rate limit is reported
    pub max_attempts: u32,
    /// Delay between rate-limited attempts
    pub retry_backoff: ExponentialBackoff,
}

impl DeviceCloudConfig {
    /// Config with default retry behaviour; `base_url` is treated as a directory
    #[must_use]
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            max_attempts: 3,
            retry_backoff: ExponentialBackoff::default(),
        }
    }
}

/// Device-cloud client speaking the v2 REST API
pub struct HttpDeviceCloudClient {
    config: DeviceCloudConfig,
    provider: Arc<dyn OAuthProvider>,
}

impl HttpDeviceCloudClient {
    /// Client refreshing tokens through `provider`
    #[must_use]
    pub fn new(config: DeviceCloudConfig, provider: Arc<dyn OAuthProvider>) -> Self {
        Self { config, provider }
    }

    fn provider_name(&self) -> String {
        self.provider.name().to_owned()
    }

    fn endpoint(&self, resource: &str, window: &FetchWindow) -> ProviderResult<Url> {
        let mut url = self
            .config
            .base_url
            .join(&format!("v2/users/self/{resource}"))
            .map_err(|e| ProviderError::InvalidData {
                provider: self.provider_name(),
                field: "base_url".to_owned(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut().extend_pairs(window.query_pairs());
        Ok(url)
    }

    /// GET `resource` for `window`, retrying once after a 401 and on 429 with backoff
    async fn fetch<T>(
        &self,
        resource: &str,
        window: &FetchWindow,
        tokens: &TokenSource,
    ) -> ProviderResult<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(resource, window)?;
        let max_attempts = self.config.max_attempts.max(1);
        let mut token_expired = false;
        let mut attempt = 0_u32;

        loop {
            let client = tokens.http_client(Arc::clone(&self.provider)).await?;
            let response = client.get(url.clone()).await?;
            let status = response.status();
            debug!(resource, status = status.as_u16(), "device cloud response");

            if status == StatusCode::UNAUTHORIZED && !token_expired {
                warn!(resource, "access token rejected, forcing refresh");
                tokens.expire_token().await;
                token_expired = true;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                attempt += 1;
                let delay = self.config.retry_backoff.delay(attempt);
                if attempt >= max_attempts {
                    let retry_after_secs = retry_after(&response).unwrap_or(delay).as_secs();
                    warn!(resource, attempt, "rate limit retries exhausted");
                    return Err(ProviderError::RateLimitExceeded {
                        provider: self.provider_name(),
                        retry_after_secs,
                    });
                }
                warn!(
                    resource,
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "rate limited, backing off"
                );
                sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(self.status_error(status, &text));
            }

            return response
                .json::<T>()
                .await
                .map_err(|e| ProviderError::InvalidData {
                    provider: self.provider_name(),
                    field: resource.to_owned(),
                    reason: e.to_string(),
                });
        }
    }

    fn status_error(&self, status: StatusCode, text: &str) -> ProviderError {
        error!(
            status = status.as_u16(),
            body_length = text.len(),
            "device cloud request failed"
        );
        if status == StatusCode::UNAUTHORIZED {
            return ProviderError::Unauthorized {
                provider: self.provider_name(),
                reason: "access token rejected after refresh".to_owned(),
            };
        }
        ProviderError::ApiError {
            provider: self.provider_name(),
            status_code: status.as_u16(),
            message: text.chars().take(512).collect(),
            retryable: status.is_server_error(),
        }
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl DeviceCloudClient for HttpDeviceCloudClient {
    #[instrument(skip(self, window, tokens), fields(window = %window))]
    async fn get_devices(
        &self,
        window: &FetchWindow,
        tokens: &TokenSource,
    ) -> ProviderResult<Vec<DeviceRecord>> {
        let response: DevicesResponse = self.fetch("devices", window, tokens).await?;
        Ok(response.devices)
    }

    #[instrument(skip(self, window, tokens), fields(window = %window))]
    async fn get_calibrations(
        &self,
        window: &FetchWindow,
        tokens: &TokenSource,
    ) -> ProviderResult<Vec<CalibrationRecord>> {
        let response: CalibrationsResponse = self.fetch("calibrations", window, tokens).await?;
        Ok(response.calibrations)
    }

    #[instrument(skip(self, window, tokens), fields(window = %window))]
    async fn get_egvs(
        &self,
        window: &FetchWindow,
        tokens: &TokenSource,
    ) -> ProviderResult<Vec<EgvRecord>> {
        let response: EgvsResponse = self.fetch("egvs", window, tokens).await?;
        Ok(response.into_records())
    }

    #[instrument(skip(self, window, tokens), fields(window = %window))]
    async fn get_events(
        &self,
        window: &FetchWindow,
        tokens: &TokenSource,
    ) -> ProviderResult<Vec<EventRecord>> {
        let response: EventsResponse = self.fetch("events", window, tokens).await?;
        Ok(response.events)
    }
}
