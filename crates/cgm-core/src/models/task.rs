// ABOUTME: Scheduler task model consumed by the fetch runner
// ABOUTME: Carries the opaque data map plus state, availability and error fields the runner mutates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::{provider, task_data};
use crate::errors::{AppError, ErrorRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Scheduler state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Waiting for `available_time`
    Pending,
    /// Held by a worker
    Running,
    /// Permanently failed; never re-delivered
    Failed,
    /// Finished and not recurring
    Completed,
}

/// Recurring task handed to a runner by the scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task identifier
    pub id: String,
    /// Runner type this task is dispatched to
    #[serde(rename = "type")]
    pub task_type: String,
    /// Scheduler state
    pub state: TaskState,
    /// Opaque payload
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Earliest instant the scheduler may deliver the task again
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_time: Option<DateTime<Utc>>,
    /// Instant after which a running execution is abandoned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_time: Option<DateTime<Utc>>,
    /// Last failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

impl Task {
    /// Fetch task for a freshly connected data source
    #[must_use]
    pub fn new_fetch(provider_session_id: &str, data_source_id: &str) -> Self {
        let mut data = Map::new();
        data.insert(
            task_data::PROVIDER_SESSION_ID.to_owned(),
            Value::String(provider_session_id.to_owned()),
        );
        data.insert(
            task_data::DATA_SOURCE_ID.to_owned(),
            Value::String(data_source_id.to_owned()),
        );
        Self {
            id: Uuid::new_v4().to_string(),
            task_type: provider::TASK_TYPE.to_owned(),
            state: TaskState::Pending,
            data,
            available_time: None,
            deadline_time: None,
            error: None,
        }
    }

    /// Non-empty string value from the data map
    #[must_use]
    pub fn data_string(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Device snapshot hashes recorded by earlier executions
    ///
    /// Entries that are not strings are ignored.
    #[must_use]
    pub fn device_hashes(&self) -> BTreeMap<String, String> {
        self.data
            .get(task_data::DEVICE_HASHES)
            .and_then(Value::as_object)
            .map(|hashes| {
                hashes
                    .iter()
                    .filter_map(|(key, value)| {
                        value.as_str().map(|hash| (key.clone(), hash.to_owned()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replace the recorded device snapshot hashes
    pub fn set_device_hashes(&mut self, hashes: &BTreeMap<String, String>) {
        let object = hashes
            .iter()
            .map(|(key, hash)| (key.clone(), Value::String(hash.clone())))
            .collect::<Map<String, Value>>();
        self.data
            .insert(task_data::DEVICE_HASHES.to_owned(), Value::Object(object));
    }

    /// Mark the task permanently failed
    pub fn set_failed(&mut self, error: &AppError) {
        self.state = TaskState::Failed;
        self.error = Some(ErrorRecord::from(error));
    }

    /// Keep the task pending and re-deliver it at `available_time`
    pub fn repeat_available_at(&mut self, available_time: DateTime<Utc>) {
        self.state = TaskState::Pending;
        self.available_time = Some(available_time);
    }

    /// Record a transient failure without failing the task
    pub fn set_error(&mut self, error: &AppError) {
        self.error = Some(ErrorRecord::from(error));
    }

    /// Forget the last failure
    pub fn clear_error(&mut self) {
        self.error = None;
    }
}
