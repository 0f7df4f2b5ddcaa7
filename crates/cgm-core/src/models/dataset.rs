// ABOUTME: Destination dataset models owned by the data service
// ABOUTME: The fetch runner reuses open continuous datasets and creates new ones when none remain
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::provider;
use serde::{Deserialize, Serialize};

/// How a dataset receives data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetType {
    /// One-shot upload
    Normal,
    /// Appended to over time
    Continuous,
}

/// Whether a dataset still accepts data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetState {
    /// Accepts data
    Open,
    /// Sealed
    Closed,
}

/// Software that created a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetClient {
    /// Reverse-DNS client name
    pub name: String,
    /// Client version
    pub version: String,
}

impl DatasetClient {
    /// Client descriptor of this crate
    #[must_use]
    pub fn current() -> Self {
        Self {
            name: provider::DATASET_CLIENT_NAME.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

/// Container translated data is appended to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Dataset identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Upload style
    pub data_set_type: DatasetType,
    /// Open or closed
    pub state: DatasetState,
    /// Creating client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<DatasetClient>,
    /// Manufacturers of devices contributing data
    #[serde(default)]
    pub device_manufacturers: Vec<String>,
    /// Device categories contributing data
    #[serde(default)]
    pub device_tags: Vec<String>,
}

impl Dataset {
    /// Whether new telemetry may be appended to this dataset
    #[must_use]
    pub fn accepts_continuous_data(&self) -> bool {
        self.data_set_type == DatasetType::Continuous && self.state == DatasetState::Open
    }
}

/// Request to create a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetCreate {
    /// Upload style
    pub data_set_type: DatasetType,
    /// Creating client
    pub client: DatasetClient,
    /// Manufacturers of devices contributing data
    pub device_manufacturers: Vec<String>,
    /// Device categories contributing data
    pub device_tags: Vec<String>,
}

impl DatasetCreate {
    /// Continuous dataset for CGM telemetry
    #[must_use]
    pub fn continuous_cgm() -> Self {
        Self {
            data_set_type: DatasetType::Continuous,
            client: DatasetClient::current(),
            device_manufacturers: vec![provider::MANUFACTURER.to_owned()],
            device_tags: vec![provider::DEVICE_TAG_CGM.to_owned()],
        }
    }
}
