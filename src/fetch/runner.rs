// ABOUTME: Fetch runner construction, deadline enforcement, and task outcome bookkeeping
// ABOUTME: Resolves the linked records, then hands a single execution to the windowed fetch loop
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::execution::TaskRun;
use super::{Runner, RunnerSettings};
use crate::clients::{AuthClient, DataClient, DataSourceClient, DeviceCloudClient};
use crate::config::SyncConfig;
use async_trait::async_trait;
use cgm_core::backoff::BackoffPolicy;
use cgm_core::clock::{Clock, SystemClock};
use cgm_core::constants::provider::TASK_TYPE;
use cgm_core::constants::task_data::{DATA_SOURCE_ID, PROVIDER_SESSION_ID};
use cgm_core::errors::{AppError, AppResult};
use cgm_core::models::{DataSourceRecord, ProviderSession, Task};
use cgm_providers::{
    initialize_shared_client, HttpDeviceCloudClient, HttpOAuthProvider, TokenSource,
};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Runner for CGM fetch tasks
///
/// Holds one trait object per collaborating service. Build it with
/// [`FetchRunner::builder`].
pub struct FetchRunner {
    pub(super) auth_client: Arc<dyn AuthClient>,
    pub(super) data_source_client: Arc<dyn DataSourceClient>,
    pub(super) data_client: Arc<dyn DataClient>,
    pub(super) device_cloud_client: Arc<dyn DeviceCloudClient>,
    pub(super) clock: Arc<dyn Clock>,
    settings: RunnerSettings,
}

impl FetchRunner {
    /// Create a new builder for `FetchRunner`
    #[must_use]
    pub fn builder() -> FetchRunnerBuilder {
        FetchRunnerBuilder::new()
    }

    /// Timing settings in effect
    #[must_use]
    pub const fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    async fn run_bounded(&self, task: &mut Task) {
        let started = self.clock.now();
        info!("fetch task started");

        let deadline = self.settings.deadline;
        let result = match timeout(deadline, self.execute(task)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::resource_failure(format!(
                "task exceeded deadline of {}s",
                deadline.as_secs()
            ))),
        };

        self.finish(task, result, started);
    }

    /// Resolve the linked records, then run the window loop
    async fn execute(&self, task: &mut Task) -> AppResult<()> {
        let provider_session_id = task
            .data_string(PROVIDER_SESSION_ID)
            .ok_or_else(|| AppError::invalid_state("task data is missing providerSessionId"))?
            .to_owned();
        let data_source_id = task
            .data_string(DATA_SOURCE_ID)
            .ok_or_else(|| AppError::invalid_state("task data is missing dataSourceId"))?
            .to_owned();

        let provider_session = self.provider_session(&provider_session_id).await?;
        let token = provider_session.oauth_token.clone().ok_or_else(|| {
            AppError::invalid_state(format!(
                "provider session {provider_session_id} has no oauth token"
            ))
        })?;
        let data_source = self.data_source(&data_source_id, &provider_session_id).await?;

        token.validate()?;

        TaskRun::new(self, task, provider_session, data_source, TokenSource::new(token))
            .fetch_all()
            .await
    }

    async fn provider_session(&self, id: &str) -> AppResult<ProviderSession> {
        self.auth_client
            .get_provider_session(id)
            .await
            .map_err(|err| {
                AppError::resource_failure("unable to get provider session").with_source(err)
            })?
            .ok_or_else(|| AppError::invalid_state(format!("provider session {id} is missing")))
    }

    async fn data_source(
        &self,
        id: &str,
        provider_session_id: &str,
    ) -> AppResult<DataSourceRecord> {
        let data_source = self
            .data_source_client
            .get(id)
            .await
            .map_err(|err| {
                AppError::resource_failure("unable to get data source").with_source(err)
            })?
            .ok_or_else(|| AppError::invalid_state(format!("data source {id} is missing")))?;

        data_source.validate()?;
        if data_source.provider_session_id.as_deref() != Some(provider_session_id) {
            return Err(AppError::invalid_state(format!(
                "data source {id} is not linked to provider session {provider_session_id}"
            )));
        }
        Ok(data_source)
    }

    /// Record the outcome on the task
    fn finish(&self, task: &mut Task, result: AppResult<()>, started: DateTime<Utc>) {
        let now = self.clock.now();
        let elapsed_ms = (now - started).num_milliseconds();
        match result {
            Ok(()) => {
                task.clear_error();
                task.repeat_available_at(after(now, self.settings.poll_interval));
                info!(elapsed_ms, "fetch task completed");
            }
            Err(err) if err.is_permanent() => {
                error!(
                    error_code = %err.code,
                    error = %err.chain_message(),
                    elapsed_ms,
                    "fetch task failed permanently"
                );
                task.set_failed(&err);
            }
            Err(err) => {
                warn!(
                    error_code = %err.code,
                    error = %err.chain_message(),
                    elapsed_ms,
                    "fetch task failed, retrying later"
                );
                task.set_error(&err);
                task.repeat_available_at(after(now, self.settings.retry_backoff.delay(1)));
            }
        }
    }
}

#[async_trait]
impl Runner for FetchRunner {
    fn task_type(&self) -> &str {
        TASK_TYPE
    }

    fn deadline(&self) -> Duration {
        self.settings.deadline
    }

    async fn run(&self, task: &mut Task) {
        let span = info_span!(
            "fetch_task",
            task_id = %task.id,
            run_id = %Uuid::new_v4(),
            data_source_id = task.data_string(DATA_SOURCE_ID).unwrap_or_default(),
        );
        self.run_bounded(task).instrument(span).await;
    }
}

/// `now` plus a std duration, saturating at `now` if out of range
fn after(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(delay)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(now)
}

/// Builder for [`FetchRunner`] that validates every collaborator is present
#[derive(Default)]
pub struct FetchRunnerBuilder {
    auth_client: Option<Arc<dyn AuthClient>>,
    data_source_client: Option<Arc<dyn DataSourceClient>>,
    data_client: Option<Arc<dyn DataClient>>,
    device_cloud_client: Option<Arc<dyn DeviceCloudClient>>,
    clock: Option<Arc<dyn Clock>>,
    settings: RunnerSettings,
}

impl FetchRunnerBuilder {
    /// Empty builder with default settings and the system clock
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with the HTTP device cloud and settings taken from configuration
    ///
    /// The platform service clients still have to be supplied.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        if !initialize_shared_client(config.http) {
            warn!("shared HTTP client settings were already initialized");
        }
        let provider = Arc::new(HttpOAuthProvider::new(config.oauth_provider_config()));
        let device_cloud = HttpDeviceCloudClient::new(config.device_cloud_config(), provider);
        Self::new()
            .with_device_cloud_client(Arc::new(device_cloud))
            .with_settings(config.runner_settings())
    }

    /// Set the provider session service
    #[must_use]
    pub fn with_auth_client(mut self, client: Arc<dyn AuthClient>) -> Self {
        self.auth_client = Some(client);
        self
    }

    /// Set the data source service
    #[must_use]
    pub fn with_data_source_client(mut self, client: Arc<dyn DataSourceClient>) -> Self {
        self.data_source_client = Some(client);
        self
    }

    /// Set the dataset service
    #[must_use]
    pub fn with_data_client(mut self, client: Arc<dyn DataClient>) -> Self {
        self.data_client = Some(client);
        self
    }

    /// Set the device cloud
    #[must_use]
    pub fn with_device_cloud_client(mut self, client: Arc<dyn DeviceCloudClient>) -> Self {
        self.device_cloud_client = Some(client);
        self
    }

    /// Set the clock (defaults to the system clock)
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the timing settings
    #[must_use]
    pub fn with_settings(mut self, settings: RunnerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the `FetchRunner`
    ///
    /// # Errors
    ///
    /// Returns `config-invalid` naming the first missing collaborator
    pub fn build(self) -> AppResult<FetchRunner> {
        Ok(FetchRunner {
            auth_client: self
                .auth_client
                .ok_or_else(|| AppError::config("auth client is required"))?,
            data_source_client: self
                .data_source_client
                .ok_or_else(|| AppError::config("data source client is required"))?,
            data_client: self
                .data_client
                .ok_or_else(|| AppError::config("data client is required"))?,
            device_cloud_client: self
                .device_cloud_client
                .ok_or_else(|| AppError::config("device cloud client is required"))?,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            settings: self.settings,
        })
    }
}
