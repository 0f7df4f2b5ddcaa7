// ABOUTME: Shared in-memory collaborators and fixtures for fetch runner integration tests
// ABOUTME: Provides fake platform services, a scripted device cloud, and a rotating OAuth provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
//! Shared test utilities for `cgm_sync`
//!
//! Every fake keeps its state behind a `std::sync::Mutex` that is never held across an
//! await, and records the calls the runner made so tests can assert on them.

use async_trait::async_trait;
use cgm_core::clock::FixedClock;
use cgm_core::errors::{AppError, AppResult, ProviderError, ProviderResult};
use cgm_core::models::{
    DataSourceRecord, DataSourceState, DataSourceUpdate, Dataset, DatasetCreate, DatasetState,
    OAuthToken, ProviderSession, ProviderSessionUpdate, Task, TranslatedDatum,
};
use cgm_providers::device_cloud::{CalibrationRecord, DeviceRecord, EgvRecord, EventRecord};
use cgm_providers::{FetchWindow, OAuthProvider, TokenSource};
use cgm_sync::clients::{AuthClient, DataClient, DataSourceClient, DeviceCloudClient};
use cgm_sync::fetch::{FetchRunner, RunnerSettings};
use cgm_sync::translate::parse_system_time;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::time::sleep;

pub const USER_ID: &str = "user-1";
pub const PROVIDER_SESSION_ID: &str = "ps-1";
pub const DATA_SOURCE_ID: &str = "ds-1";

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("warn")
            .with_test_writer()
            .try_init();
    });
}

/// Instant every fixture treats as now
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn live_token() -> OAuthToken {
    OAuthToken::new(
        "access-0",
        "Bearer",
        Some("refresh-0".to_owned()),
        Some(Utc::now() + ChronoDuration::hours(1)),
    )
}

/// Token the first authorized request will have to refresh
pub fn expiring_token() -> OAuthToken {
    OAuthToken::new(
        "access-0",
        "Bearer",
        Some("refresh-0".to_owned()),
        Some(Utc::now() - ChronoDuration::minutes(1)),
    )
}

pub fn provider_session(token: Option<OAuthToken>) -> ProviderSession {
    ProviderSession {
        id: PROVIDER_SESSION_ID.to_owned(),
        user_id: USER_ID.to_owned(),
        oauth_token: token,
        provider_type: "oauth".to_owned(),
        name: "dexcom".to_owned(),
    }
}

pub fn data_source(latest_data_time: Option<DateTime<Utc>>) -> DataSourceRecord {
    DataSourceRecord {
        id: DATA_SOURCE_ID.to_owned(),
        user_id: USER_ID.to_owned(),
        provider_session_id: Some(PROVIDER_SESSION_ID.to_owned()),
        state: DataSourceState::Connected,
        data_set_ids: Vec::new(),
        earliest_data_time: None,
        latest_data_time,
        last_import_time: None,
        error: None,
    }
}

pub fn dataset(id: &str, state: DatasetState) -> Dataset {
    let create = DatasetCreate::continuous_cgm();
    Dataset {
        id: id.to_owned(),
        user_id: USER_ID.to_owned(),
        data_set_type: create.data_set_type,
        state,
        client: Some(create.client),
        device_manufacturers: create.device_manufacturers,
        device_tags: create.device_tags,
    }
}

pub fn device(system_time: &str, serial_number: &str) -> DeviceRecord {
    serde_json::from_value(json!({
        "lastUploadDate": system_time,
        "displayTime": system_time,
        "serialNumber": serial_number,
        "transmitterGeneration": "g6",
        "displayDevice": "iOS",
        "unit": "mg/dL",
        "alertSettings": [
            {"alertName": "high", "value": 250, "unit": "mg/dL", "snooze": 120, "enabled": true},
            {"alertName": "low", "value": 70, "unit": "mg/dL", "snooze": 15, "enabled": true}
        ]
    }))
    .unwrap()
}

/// Zone-less wire rendering of an instant
pub fn at(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub fn egv(system_time: DateTime<Utc>, value: f64) -> EgvRecord {
    serde_json::from_value(json!({
        "recordId": format!("egv-{}", system_time.timestamp()),
        "systemTime": at(system_time),
        "displayTime": at(system_time - ChronoDuration::hours(5)),
        "value": value,
        "unit": "mg/dL",
        "trend": "flat",
        "trendRate": 0.1
    }))
    .unwrap()
}

pub fn calibration(system_time: &str, value: f64) -> CalibrationRecord {
    serde_json::from_value(json!({
        "systemTime": system_time,
        "displayTime": system_time,
        "value": value,
        "unit": "mg/dL"
    }))
    .unwrap()
}

pub fn carbs(system_time: &str, grams: f64) -> EventRecord {
    serde_json::from_value(json!({
        "eventType": "carbs",
        "systemTime": system_time,
        "displayTime": system_time,
        "value": grams,
        "unit": "grams"
    }))
    .unwrap()
}

// ── Provider sessions ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryAuthClient {
    pub sessions: Mutex<HashMap<String, ProviderSession>>,
    pub updates: Mutex<Vec<ProviderSessionUpdate>>,
    pub fail_get: AtomicBool,
    pub fail_update: AtomicBool,
    pub drop_on_update: AtomicBool,
}

impl MemoryAuthClient {
    pub fn with_session(session: ProviderSession) -> Arc<Self> {
        let client = Self::default();
        client
            .sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
        Arc::new(client)
    }

    pub fn stored_token(&self, id: &str) -> Option<OAuthToken> {
        self.sessions
            .lock()
            .unwrap()
            .get(id)
            .and_then(|session| session.oauth_token.clone())
    }
}

#[async_trait]
impl AuthClient for MemoryAuthClient {
    async fn get_provider_session(&self, id: &str) -> AppResult<Option<ProviderSession>> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(AppError::resource_failure("auth service unavailable"));
        }
        Ok(self.sessions.lock().unwrap().get(id).cloned())
    }

    async fn update_provider_session(
        &self,
        id: &str,
        update: &ProviderSessionUpdate,
    ) -> AppResult<Option<ProviderSession>> {
        self.updates.lock().unwrap().push(update.clone());
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(AppError::resource_failure("auth service unavailable"));
        }
        let mut sessions = self.sessions.lock().unwrap();
        if self.drop_on_update.load(Ordering::SeqCst) {
            sessions.remove(id);
            return Ok(None);
        }
        Ok(sessions.get_mut(id).map(|session| {
            session.oauth_token = Some(update.oauth_token.clone());
            session.clone()
        }))
    }
}

// ── Data sources ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryDataSourceClient {
    pub records: Mutex<HashMap<String, DataSourceRecord>>,
    pub updates: Mutex<Vec<DataSourceUpdate>>,
    pub fail_get: AtomicBool,
    pub fail_update: AtomicBool,
    /// Cursor another run commits right after this run reads the record
    pub concurrent_latest: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryDataSourceClient {
    pub fn with_record(record: DataSourceRecord) -> Arc<Self> {
        let client = Self::default();
        client
            .records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
        Arc::new(client)
    }

    pub fn record(&self, id: &str) -> DataSourceRecord {
        self.records.lock().unwrap().get(id).cloned().unwrap()
    }
}

#[async_trait]
impl DataSourceClient for MemoryDataSourceClient {
    async fn get(&self, id: &str) -> AppResult<Option<DataSourceRecord>> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(AppError::resource_failure("data source service unavailable"));
        }
        let mut records = self.records.lock().unwrap();
        let record = records.get(id).cloned();
        if let Some(latest) = self.concurrent_latest.lock().unwrap().take() {
            if let Some(stored) = records.get_mut(id) {
                stored.apply(&DataSourceUpdate {
                    latest_data_time: Some(latest),
                    ..DataSourceUpdate::default()
                });
            }
        }
        Ok(record)
    }

    async fn update(
        &self,
        id: &str,
        update: &DataSourceUpdate,
    ) -> AppResult<Option<DataSourceRecord>> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(AppError::resource_failure("data source service unavailable"));
        }
        self.updates.lock().unwrap().push(update.clone());
        Ok(self.records.lock().unwrap().get_mut(id).map(|record| {
            record.apply(update);
            record.clone()
        }))
    }
}

// ── Datasets ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryDataClient {
    pub datasets: Mutex<HashMap<String, Dataset>>,
    pub created: Mutex<Vec<DatasetCreate>>,
    pub writes: Mutex<Vec<(String, Vec<TranslatedDatum>)>>,
    /// Zero-based index of the write that fails
    pub fail_write_at: Mutex<Option<usize>>,
    write_attempts: AtomicUsize,
}

impl MemoryDataClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, dataset: Dataset) {
        self.datasets
            .lock()
            .unwrap()
            .insert(dataset.id.clone(), dataset);
    }

    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|(_, data)| data.len())
            .collect()
    }

    pub fn written(&self) -> Vec<TranslatedDatum> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, data)| data.iter().cloned())
            .collect()
    }

    pub fn written_dataset_ids(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[async_trait]
impl DataClient for MemoryDataClient {
    async fn get_dataset(&self, id: &str) -> AppResult<Option<Dataset>> {
        Ok(self.datasets.lock().unwrap().get(id).cloned())
    }

    async fn create_user_dataset(
        &self,
        user_id: &str,
        create: &DatasetCreate,
    ) -> AppResult<Dataset> {
        let mut created = self.created.lock().unwrap();
        created.push(create.clone());
        let dataset = Dataset {
            id: format!("created-{}", created.len()),
            user_id: user_id.to_owned(),
            data_set_type: create.data_set_type,
            state: DatasetState::Open,
            client: Some(create.client.clone()),
            device_manufacturers: create.device_manufacturers.clone(),
            device_tags: create.device_tags.clone(),
        };
        self.insert(dataset.clone());
        Ok(dataset)
    }

    async fn create_dataset_data(
        &self,
        dataset_id: &str,
        data: &[TranslatedDatum],
    ) -> AppResult<()> {
        let attempt = self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if *self.fail_write_at.lock().unwrap() == Some(attempt) {
            return Err(AppError::resource_failure("data service unavailable"));
        }
        self.writes
            .lock()
            .unwrap()
            .push((dataset_id.to_owned(), data.to_vec()));
        Ok(())
    }
}

// ── Device cloud ────────────────────────────────────────────────────────

/// OAuth provider that issues a new access token on every refresh
#[derive(Default)]
pub struct RotatingProvider {
    pub refreshes: AtomicUsize,
}

#[async_trait]
impl OAuthProvider for RotatingProvider {
    fn name(&self) -> &str {
        "dexcom"
    }

    async fn refresh(&self, token: &OAuthToken) -> ProviderResult<OAuthToken> {
        let count = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(token.rotated(
            format!("access-{count}"),
            None,
            Some(format!("refresh-{count}")),
            Some(Utc::now() + ChronoDuration::hours(2)),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Devices,
    Calibrations,
    Egvs,
    Events,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Unauthorized,
    Unavailable,
}

impl Failure {
    fn error(self) -> ProviderError {
        match self {
            Self::Unauthorized => ProviderError::Unauthorized {
                provider: "dexcom".to_owned(),
                reason: "invalid_grant".to_owned(),
            },
            Self::Unavailable => ProviderError::ApiError {
                provider: "dexcom".to_owned(),
                status_code: 503,
                message: "service unavailable".to_owned(),
                retryable: true,
            },
        }
    }
}

/// Device cloud serving fixed records, filtered to each requested window
#[derive(Default)]
pub struct ScriptedDeviceCloud {
    pub provider: Arc<RotatingProvider>,
    pub devices: Mutex<Vec<DeviceRecord>>,
    pub calibrations: Mutex<Vec<CalibrationRecord>>,
    pub egvs: Mutex<Vec<EgvRecord>>,
    pub events: Mutex<Vec<EventRecord>>,
    pub failures: Mutex<HashMap<Resource, Failure>>,
    pub requests: Mutex<Vec<(Resource, FetchWindow)>>,
    pub authorizations: Mutex<Vec<String>>,
    pub delay: Mutex<Option<Duration>>,
}

impl ScriptedDeviceCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, resource: Resource, failure: Failure) {
        self.failures.lock().unwrap().insert(resource, failure);
    }

    pub fn windows(&self, resource: Resource) -> Vec<FetchWindow> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(requested, _)| *requested == resource)
            .map(|(_, window)| *window)
            .collect()
    }

    async fn serve<T: Clone>(
        &self,
        resource: Resource,
        window: &FetchWindow,
        tokens: &TokenSource,
        records: &Mutex<Vec<T>>,
        system_time: impl Fn(&T) -> &str,
    ) -> ProviderResult<Vec<T>> {
        self.requests.lock().unwrap().push((resource, *window));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            sleep(delay).await;
        }

        let provider: Arc<dyn OAuthProvider> = self.provider.clone();
        let client = tokens.http_client(provider).await?;
        let authorization = client.authorization().await?;
        self.authorizations.lock().unwrap().push(authorization);

        let failure = self.failures.lock().unwrap().get(&resource).copied();
        if let Some(failure) = failure {
            return Err(failure.error());
        }

        Ok(records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| {
                parse_system_time(system_time(record))
                    .is_some_and(|time| time >= window.start && time < window.end)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DeviceCloudClient for ScriptedDeviceCloud {
    async fn get_devices(
        &self,
        window: &FetchWindow,
        tokens: &TokenSource,
    ) -> ProviderResult<Vec<DeviceRecord>> {
        self.serve(Resource::Devices, window, tokens, &self.devices, |record| {
            record.system_time.as_str()
        })
        .await
    }

    async fn get_calibrations(
        &self,
        window: &FetchWindow,
        tokens: &TokenSource,
    ) -> ProviderResult<Vec<CalibrationRecord>> {
        self.serve(
            Resource::Calibrations,
            window,
            tokens,
            &self.calibrations,
            |record| record.system_time.as_str(),
        )
        .await
    }

    async fn get_egvs(
        &self,
        window: &FetchWindow,
        tokens: &TokenSource,
    ) -> ProviderResult<Vec<EgvRecord>> {
        self.serve(Resource::Egvs, window, tokens, &self.egvs, |record| {
            record.system_time.as_str()
        })
        .await
    }

    async fn get_events(
        &self,
        window: &FetchWindow,
        tokens: &TokenSource,
    ) -> ProviderResult<Vec<EventRecord>> {
        self.serve(Resource::Events, window, tokens, &self.events, |record| {
            event_system_time(record)
        })
        .await
    }
}

fn event_system_time(record: &EventRecord) -> &str {
    match record {
        EventRecord::Carbs(details)
        | EventRecord::Exercise(details)
        | EventRecord::Health(details)
        | EventRecord::Insulin(details) => details.system_time.as_str(),
        EventRecord::Unknown => "",
    }
}

// ── Fixture ─────────────────────────────────────────────────────────────

/// Linked session, data source and services around one scripted device cloud
pub struct Fixture {
    pub auth: Arc<MemoryAuthClient>,
    pub data_sources: Arc<MemoryDataSourceClient>,
    pub data: Arc<MemoryDataClient>,
    pub cloud: Arc<ScriptedDeviceCloud>,
    pub settings: RunnerSettings,
}

impl Fixture {
    pub fn new(latest_data_time: Option<DateTime<Utc>>) -> Self {
        init_test_logging();
        Self {
            auth: MemoryAuthClient::with_session(provider_session(Some(live_token()))),
            data_sources: MemoryDataSourceClient::with_record(data_source(latest_data_time)),
            data: MemoryDataClient::new(),
            cloud: ScriptedDeviceCloud::new(),
            settings: RunnerSettings::default(),
        }
    }

    pub fn runner(&self) -> FetchRunner {
        FetchRunner::builder()
            .with_auth_client(self.auth.clone())
            .with_data_source_client(self.data_sources.clone())
            .with_data_client(self.data.clone())
            .with_device_cloud_client(self.cloud.clone())
            .with_clock(Arc::new(FixedClock(now())))
            .with_settings(self.settings.clone())
            .build()
            .unwrap()
    }

    pub fn data_source(&self) -> DataSourceRecord {
        self.data_sources.record(DATA_SOURCE_ID)
    }

    pub fn set_session_token(&self, token: Option<OAuthToken>) {
        self.auth
            .sessions
            .lock()
            .unwrap()
            .insert(PROVIDER_SESSION_ID.to_owned(), provider_session(token));
    }

    pub fn update_data_source(&self, update: impl FnOnce(&mut DataSourceRecord)) {
        let mut records = self.data_sources.records.lock().unwrap();
        update(records.get_mut(DATA_SOURCE_ID).unwrap());
    }
}

pub fn fetch_task() -> Task {
    Task::new_fetch(PROVIDER_SESSION_ID, DATA_SOURCE_ID)
}
