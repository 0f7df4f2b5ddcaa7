// ABOUTME: Core data models shared by the runner, translators, and collaborator interfaces
// ABOUTME: Re-exports task, provider session, data source, dataset, and datum types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Data source connection record
pub mod data_source;
/// Destination datasets
pub mod dataset;
/// Translated platform data
pub mod datum;
/// OAuth tokens and provider sessions
pub mod oauth;
/// Scheduler tasks
pub mod task;

pub use data_source::{DataSourceRecord, DataSourceState, DataSourceUpdate};
pub use dataset::{Dataset, DatasetClient, DatasetCreate, DatasetState, DatasetType};
pub use datum::{
    AlertSetting, Annotation, CgmAlerts, CgmSettings, DatumKind, DeviceEvent, Food, Glucose,
    HealthState, Insulin, InsulinKind, Intensity, PhysicalActivity, ReportedState,
    TranslatedDatum, Trend,
};
pub use oauth::{OAuthToken, ProviderSession, ProviderSessionUpdate};
pub use task::{Task, TaskState};
