// ABOUTME: Capability traits for the platform services the fetch runner depends on
// ABOUTME: Provider sessions, data sources, datasets, and the device cloud behind explicit trait objects
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Collaborator interfaces
//!
//! The runner owns one `Arc<dyn ...>` per capability and never assumes anything about
//! the storage behind them. `None` results mean the record does not exist.

use async_trait::async_trait;
use cgm_core::errors::AppResult;
use cgm_core::models::{
    DataSourceRecord, DataSourceUpdate, Dataset, DatasetCreate, ProviderSession,
    ProviderSessionUpdate, TranslatedDatum,
};

pub use cgm_providers::DeviceCloudClient;

/// Provider session storage owned by the auth service
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Look up a provider session
    async fn get_provider_session(&self, id: &str) -> AppResult<Option<ProviderSession>>;

    /// Replace a provider session's token, returning the stored session
    async fn update_provider_session(
        &self,
        id: &str,
        update: &ProviderSessionUpdate,
    ) -> AppResult<Option<ProviderSession>>;
}

/// Data source storage owned by the data-source service
#[async_trait]
pub trait DataSourceClient: Send + Sync {
    /// Look up a data source
    async fn get(&self, id: &str) -> AppResult<Option<DataSourceRecord>>;

    /// Apply an update, returning the stored record
    ///
    /// Implementations merge cursor fields monotonically: `latest_data_time` is only
    /// replaced by a later instant and `earliest_data_time` only by an earlier one, so
    /// overlapping runs never move the cursor backwards.
    async fn update(
        &self,
        id: &str,
        update: &DataSourceUpdate,
    ) -> AppResult<Option<DataSourceRecord>>;
}

/// Dataset and datum storage owned by the data service
#[async_trait]
pub trait DataClient: Send + Sync {
    /// Look up a dataset
    async fn get_dataset(&self, id: &str) -> AppResult<Option<Dataset>>;

    /// Create a dataset owned by `user_id`
    async fn create_user_dataset(&self, user_id: &str, create: &DatasetCreate)
        -> AppResult<Dataset>;

    /// Append data to a dataset
    async fn create_dataset_data(&self, dataset_id: &str, data: &[TranslatedDatum])
        -> AppResult<()>;
}
