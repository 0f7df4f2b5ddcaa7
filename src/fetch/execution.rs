// ABOUTME: State of a single fetch execution: windows, token rotation, dataset resolution, storage
// ABOUTME: Keeps the freshest data source record so cursor updates only ever move forward
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::runner::FetchRunner;
use crate::translate::{
    device_hash, translate_calibration, translate_device, translate_egv, translate_event,
};
use cgm_core::constants::protocol::{initial_epoch, FETCH_WINDOW_DAYS, STORAGE_CHUNK_SIZE};
use cgm_core::errors::{AppError, AppResult, ErrorRecord, ProviderError, ProviderResult};
use cgm_core::models::{
    DataSourceRecord, DataSourceState, DataSourceUpdate, Dataset, DatasetCreate, OAuthToken,
    ProviderSession, ProviderSessionUpdate, Task, TranslatedDatum,
};
use cgm_providers::{FetchWindow, TokenSource};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// One execution of a fetch task
pub(super) struct TaskRun<'a> {
    runner: &'a FetchRunner,
    task: &'a mut Task,
    provider_session: ProviderSession,
    data_source: DataSourceRecord,
    tokens: TokenSource,
    dataset: Option<Dataset>,
    device_hashes: BTreeMap<String, String>,
}

impl<'a> TaskRun<'a> {
    pub(super) fn new(
        runner: &'a FetchRunner,
        task: &'a mut Task,
        provider_session: ProviderSession,
        data_source: DataSourceRecord,
        tokens: TokenSource,
    ) -> Self {
        let device_hashes = task.device_hashes();
        Self {
            runner,
            task,
            provider_session,
            data_source,
            tokens,
            dataset: None,
            device_hashes,
        }
    }

    /// Fetch and store every window from the cursor up to now
    pub(super) async fn fetch_all(mut self) -> AppResult<()> {
        let now = self.runner.clock.now();
        let window_length = TimeDelta::days(FETCH_WINDOW_DAYS);

        let mut start = self
            .data_source
            .latest_data_time
            .map_or_else(initial_epoch, |latest| latest.max(initial_epoch()));

        while start < now {
            let end = (start + window_length).min(now);
            self.fetch_window(FetchWindow::new(start, end)).await?;
            start += window_length;
        }
        Ok(())
    }

    async fn fetch_window(&mut self, window: FetchWindow) -> AppResult<()> {
        let runner = self.runner;

        let result = runner
            .device_cloud_client
            .get_devices(&window, &self.tokens)
            .await;
        let devices = self.after_fetch("devices", result).await?;
        if devices.is_empty() {
            debug!(window = %window, "no devices in window, skipping");
            return Ok(());
        }

        let mut data = Vec::new();
        let mut hashes = self.device_hashes.clone();
        for device in &devices {
            let key = device.identity_key();
            let hash = device_hash(device);
            if hashes.get(&key) == Some(&hash) {
                debug!(device = %key, "device snapshot unchanged");
                continue;
            }
            data.extend(translate_device(device));
            hashes.insert(key, hash);
        }

        let result = runner
            .device_cloud_client
            .get_calibrations(&window, &self.tokens)
            .await;
        let calibrations = self.after_fetch("calibrations", result).await?;
        data.extend(calibrations.iter().filter_map(translate_calibration));

        let result = runner
            .device_cloud_client
            .get_egvs(&window, &self.tokens)
            .await;
        let egvs = self.after_fetch("egvs", result).await?;
        data.extend(egvs.iter().filter_map(translate_egv));

        let result = runner
            .device_cloud_client
            .get_events(&window, &self.tokens)
            .await;
        let events = self.after_fetch("events", result).await?;
        data.extend(events.iter().filter_map(translate_event));

        info!(
            window = %window,
            devices = devices.len(),
            calibrations = calibrations.len(),
            egvs = egvs.len(),
            events = events.len(),
            translated = data.len(),
            "fetched window"
        );

        self.store(data).await?;

        if hashes != self.device_hashes {
            self.task.set_device_hashes(&hashes);
            self.device_hashes = hashes;
        }
        Ok(())
    }

    /// Persist a rotated token, then classify the fetch outcome
    async fn after_fetch<T>(
        &mut self,
        resource: &str,
        result: ProviderResult<T>,
    ) -> AppResult<T> {
        match self.tokens.refreshed_token().await {
            Ok(Some(token)) => self.persist_token(token).await?,
            Ok(None) => {}
            Err(ProviderError::TokenSourceMissing) if result.is_err() => {}
            Err(err) => {
                return Err(AppError::resource_failure("unable to get refreshed token")
                    .with_source(err));
            }
        }

        match result {
            Ok(records) => Ok(records),
            Err(err) if err.is_unauthorized() => {
                let error =
                    AppError::authentication_failure(format!("unable to fetch {resource}"))
                        .with_source(err);
                self.mark_data_source_error(&error).await;
                Err(error)
            }
            Err(err) => Err(
                AppError::resource_failure(format!("unable to fetch {resource}")).with_source(err),
            ),
        }
    }

    async fn persist_token(&mut self, token: OAuthToken) -> AppResult<()> {
        let update = ProviderSessionUpdate {
            oauth_token: token.clone(),
        };
        let session = self
            .runner
            .auth_client
            .update_provider_session(&self.provider_session.id, &update)
            .await
            .map_err(|err| {
                AppError::resource_failure("unable to update provider session").with_source(err)
            })?
            .ok_or_else(|| {
                AppError::invalid_state(format!(
                    "provider session {} is missing",
                    self.provider_session.id
                ))
            })?;

        info!(provider_session_id = %session.id, "persisted rotated oauth token");
        self.provider_session = session;
        self.tokens.rebase(token).await;
        Ok(())
    }

    /// Best effort: a failure here is logged and the original error still propagates
    async fn mark_data_source_error(&mut self, error: &AppError) {
        let update = DataSourceUpdate {
            state: Some(DataSourceState::Error),
            error: Some(ErrorRecord::from(error)),
            ..DataSourceUpdate::default()
        };
        match self
            .runner
            .data_source_client
            .update(&self.data_source.id, &update)
            .await
        {
            Ok(Some(record)) => self.data_source = record,
            Ok(None) => warn!(
                data_source_id = %self.data_source.id,
                "data source vanished while recording authentication failure"
            ),
            Err(err) => warn!(
                data_source_id = %self.data_source.id,
                error = %err.chain_message(),
                "unable to record authentication failure on data source"
            ),
        }
    }

    /// Reuse the newest open continuous dataset, or create and link one
    async fn dataset_id(&mut self) -> AppResult<String> {
        if let Some(dataset) = &self.dataset {
            return Ok(dataset.id.clone());
        }

        let candidates: Vec<String> = self
            .data_source
            .data_set_ids_newest_first()
            .map(str::to_owned)
            .collect();
        for id in candidates {
            let dataset = self
                .runner
                .data_client
                .get_dataset(&id)
                .await
                .map_err(|err| {
                    AppError::resource_failure("unable to get dataset").with_source(err)
                })?;
            if let Some(dataset) = dataset.filter(Dataset::accepts_continuous_data) {
                debug!(dataset_id = %dataset.id, "reusing dataset");
                let id = dataset.id.clone();
                self.dataset = Some(dataset);
                return Ok(id);
            }
        }

        let dataset = self
            .runner
            .data_client
            .create_user_dataset(&self.data_source.user_id, &DatasetCreate::continuous_cgm())
            .await
            .map_err(|err| {
                AppError::resource_failure("unable to create dataset").with_source(err)
            })?;

        let mut data_set_ids = self.data_source.data_set_ids.clone();
        data_set_ids.push(dataset.id.clone());
        self.update_data_source(&DataSourceUpdate {
            data_set_ids: Some(data_set_ids),
            ..DataSourceUpdate::default()
        })
        .await?;

        info!(dataset_id = %dataset.id, "created dataset");
        let id = dataset.id.clone();
        self.dataset = Some(dataset);
        Ok(id)
    }

    /// Write data in chunks, advancing the cursor after each one
    async fn store(&mut self, mut data: Vec<TranslatedDatum>) -> AppResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        data.sort_by_key(|datum| datum.time);
        let dataset_id = self.dataset_id().await?;

        for chunk in data.chunks(STORAGE_CHUNK_SIZE) {
            self.runner
                .data_client
                .create_dataset_data(&dataset_id, chunk)
                .await
                .map_err(|err| {
                    AppError::resource_failure("unable to create dataset data").with_source(err)
                })?;

            let update = self.cursor_update(chunk, self.runner.clock.now());
            self.update_data_source(&update).await?;
            debug!(dataset_id = %dataset_id, count = chunk.len(), "stored chunk");
        }
        Ok(())
    }

    fn cursor_update(&self, chunk: &[TranslatedDatum], now: DateTime<Utc>) -> DataSourceUpdate {
        let mut update = DataSourceUpdate {
            last_import_time: Some(now),
            ..DataSourceUpdate::default()
        };
        if let Some(first) = chunk.first() {
            if self
                .data_source
                .earliest_data_time
                .is_none_or(|earliest| first.time < earliest)
            {
                update.earliest_data_time = Some(first.time);
            }
        }
        if let Some(last) = chunk.last() {
            if self
                .data_source
                .latest_data_time
                .is_none_or(|latest| last.time > latest)
            {
                update.latest_data_time = Some(last.time);
            }
        }
        update
    }

    async fn update_data_source(&mut self, update: &DataSourceUpdate) -> AppResult<()> {
        let record = self
            .runner
            .data_source_client
            .update(&self.data_source.id, update)
            .await
            .map_err(|err| {
                AppError::resource_failure("unable to update data source").with_source(err)
            })?
            .ok_or_else(|| {
                AppError::invalid_state(format!("data source {} is missing", self.data_source.id))
            })?;
        self.data_source = record;
        Ok(())
    }
}
