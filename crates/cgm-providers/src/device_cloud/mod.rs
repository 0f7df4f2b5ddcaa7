// ABOUTME: Device-cloud capability trait and fetch window used by the sync runner
// ABOUTME: Windowed GET operations for devices, calibrations, glucose values, and events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// HTTP implementation of the device-cloud client
pub mod http;
/// Wire records and response envelopes
pub mod records;

pub use http::{DeviceCloudConfig, HttpDeviceCloudClient};
pub use records::{
    AlertSettingRecord, CalibrationRecord, DeviceRecord, EgvRecord, EventDetails, EventRecord,
};

use crate::oauth::TokenSource;
use async_trait::async_trait;
use cgm_core::errors::ProviderResult;
use chrono::{DateTime, Utc};
use std::fmt;

/// Query format the device cloud expects for window bounds
const WINDOW_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Half-open time range `[start, end)` requested in one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// Exclusive end
    pub end: DateTime<Utc>,
}

impl FetchWindow {
    /// Window between two instants
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `startDate`/`endDate` query parameters
    ///
    /// Bounds are truncated to whole seconds, so a window starting at a stored cursor
    /// requests the record at the cursor instant again.
    #[must_use]
    pub fn query_pairs(&self) -> [(&'static str, String); 2] {
        [
            ("startDate", self.start.format(WINDOW_TIME_FORMAT).to_string()),
            ("endDate", self.end.format(WINDOW_TIME_FORMAT).to_string()),
        ]
    }
}

impl fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format(WINDOW_TIME_FORMAT),
            self.end.format(WINDOW_TIME_FORMAT)
        )
    }
}

/// Third-party CGM device cloud
///
/// Every call authenticates through `tokens`, which may rotate its token while the
/// call is in flight.
#[async_trait]
pub trait DeviceCloudClient: Send + Sync {
    /// Device snapshots uploaded within the window
    async fn get_devices(
        &self,
        window: &FetchWindow,
        tokens: &TokenSource,
    ) -> ProviderResult<Vec<DeviceRecord>>;

    /// Calibrations within the window
    async fn get_calibrations(
        &self,
        window: &FetchWindow,
        tokens: &TokenSource,
    ) -> ProviderResult<Vec<CalibrationRecord>>;

    /// Estimated glucose values within the window
    async fn get_egvs(
        &self,
        window: &FetchWindow,
        tokens: &TokenSource,
    ) -> ProviderResult<Vec<EgvRecord>>;

    /// User-entered events within the window
    async fn get_events(
        &self,
        window: &FetchWindow,
        tokens: &TokenSource,
    ) -> ProviderResult<Vec<EventRecord>>;
}
