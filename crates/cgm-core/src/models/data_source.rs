// ABOUTME: Data source connection record with sync cursor fields
// ABOUTME: Enforces the state/provider-session invariant and monotonic cursor merging
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::{AppError, AppResult, ErrorRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state of a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceState {
    /// Linked to a live provider session
    Connected,
    /// No provider session
    Disconnected,
    /// Linked, but the last sync failed permanently
    Error,
}

impl fmt::Display for DataSourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Per-user, per-provider connection record tracking sync progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceRecord {
    /// Data source identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Linked provider session (required unless disconnected)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_session_id: Option<String>,
    /// Connection state
    pub state: DataSourceState,
    /// Datasets the data source has written to, oldest first
    #[serde(default)]
    pub data_set_ids: Vec<String>,
    /// Earliest telemetry instant ingested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest_data_time: Option<DateTime<Utc>>,
    /// Latest telemetry instant ingested; the resume cursor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_data_time: Option<DateTime<Utc>>,
    /// When data was last written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_import_time: Option<DateTime<Utc>>,
    /// Last permanent failure, shown to the user as a reconnect prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

impl DataSourceRecord {
    /// Check that the state agrees with provider session linkage
    ///
    /// # Errors
    ///
    /// Returns `invalid-state` when a connected or errored record has no provider
    /// session, or a disconnected record still has one
    pub fn validate(&self) -> AppResult<()> {
        let linked = self
            .provider_session_id
            .as_deref()
            .is_some_and(|id| !id.is_empty());
        match (self.state, linked) {
            (DataSourceState::Connected | DataSourceState::Error, false) => {
                Err(AppError::invalid_state(format!(
                    "data source {} is {} without a provider session",
                    self.id, self.state
                )))
            }
            (DataSourceState::Disconnected, true) => Err(AppError::invalid_state(format!(
                "data source {} is disconnected but still has a provider session",
                self.id
            ))),
            _ => Ok(()),
        }
    }

    /// Most recently added datasets first
    pub fn data_set_ids_newest_first(&self) -> impl Iterator<Item = &str> {
        self.data_set_ids.iter().rev().map(String::as_str)
    }

    /// Apply an update, never moving the cursor backwards
    pub fn apply(&mut self, update: &DataSourceUpdate) {
        if let Some(state) = update.state {
            self.state = state;
        }
        if let Some(error) = &update.error {
            self.error = Some(error.clone());
        }
        if let Some(data_set_ids) = &update.data_set_ids {
            self.data_set_ids.clone_from(data_set_ids);
        }
        if let Some(earliest) = update.earliest_data_time {
            if self.earliest_data_time.is_none_or(|current| earliest < current) {
                self.earliest_data_time = Some(earliest);
            }
        }
        if let Some(latest) = update.latest_data_time {
            if self.latest_data_time.is_none_or(|current| latest > current) {
                self.latest_data_time = Some(latest);
            }
        }
        if let Some(last_import) = update.last_import_time {
            self.last_import_time = Some(last_import);
        }
    }
}

/// Partial update of a data source record
///
/// Cursor fields merge monotonically: `latest_data_time` only moves forward and
/// `earliest_data_time` only moves backward.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceUpdate {
    /// New connection state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<DataSourceState>,
    /// Error to record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
    /// Full replacement of the dataset id list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_ids: Option<Vec<String>>,
    /// Candidate earliest data time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest_data_time: Option<DateTime<Utc>>,
    /// Candidate latest data time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_data_time: Option<DateTime<Utc>>,
    /// Import instant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_import_time: Option<DateTime<Utc>>,
}
