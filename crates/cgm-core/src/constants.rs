// ABOUTME: Protocol constants for windowed CGM fetching, time translation, and glucose ranges
// ABOUTME: Centralizes stable values so the runner and translators never hardcode them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped by domain. Values in `protocol` and `time_translation` are part
//! of the sync contract and are not configurable.

/// Fetch and storage protocol constants
pub mod protocol {
    use chrono::{DateTime, Utc};

    /// 2015-01-01T00:00:00Z, the earliest instant ever requested from the device cloud
    pub const INITIAL_EPOCH_SECS: i64 = 1_420_070_400;

    /// Width of one fetch window in days (provider per-call range limit)
    pub const FETCH_WINDOW_DAYS: i64 = 90;

    /// Fixed delay before a transiently failed task is re-delivered
    pub const RETRY_BACKOFF_SECS: u64 = 3600;

    /// Maximum number of data written per storage call
    pub const STORAGE_CHUNK_SIZE: usize = 2000;

    /// Default delay between successful runs
    pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3600;

    /// Default upper bound for one task execution
    pub const DEFAULT_TASK_DEADLINE_SECS: u64 = 300;

    /// The initial epoch as an instant
    #[must_use]
    pub fn initial_epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(INITIAL_EPOCH_SECS, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// Constants for reconciling system time and display time
pub mod time_translation {
    /// Timezone quantization unit in minutes
    pub const OFFSET_UNIT_MINUTES: i64 = 30;

    /// Timezone quantization unit in milliseconds
    pub const OFFSET_UNIT_MILLIS: i64 = OFFSET_UNIT_MINUTES * 60 * 1000;

    /// Largest offset count kept before folding a day (+14h)
    pub const OFFSET_COUNT_MAXIMUM: i64 = 28;

    /// Smallest offset count kept before folding a day (-12h)
    pub const OFFSET_COUNT_MINIMUM: i64 = -24;

    /// Offset units in one day
    pub const OFFSET_COUNT_PER_DAY: i64 = 48;

    /// One day in milliseconds
    pub const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

    /// Zone-less device time rendering
    pub const DEVICE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";
}

/// Sensor glucose range and unit constants
pub mod glucose {
    /// Lowest value the sensor reports in mg/dL
    pub const MGDL_MINIMUM: f64 = 40.0;

    /// Highest value the sensor reports in mg/dL
    pub const MGDL_MAXIMUM: f64 = 400.0;

    /// Value stored for readings below the reportable range
    pub const MGDL_PINNED_MINIMUM: f64 = 39.0;

    /// Value stored for readings above the reportable range
    pub const MGDL_PINNED_MAXIMUM: f64 = 401.0;

    /// mg/dL per mmol/L
    pub const MMOLL_TO_MGDL: f64 = 18.01559;

    /// mg/dL unit string
    pub const UNITS_MGDL: &str = "mg/dL";

    /// mmol/L unit string
    pub const UNITS_MMOLL: &str = "mmol/L";

    /// Annotation code attached to pinned readings
    pub const OUT_OF_RANGE_ANNOTATION: &str = "bg/out-of-range";
}

/// Identity of the integrated device cloud
pub mod provider {
    /// Provider name
    pub const PROVIDER_NAME: &str = "dexcom";

    /// Device manufacturer recorded on datasets and settings
    pub const MANUFACTURER: &str = "Dexcom";

    /// Scheduler task type handled by the fetch runner
    pub const TASK_TYPE: &str = "org.cgmsync.fetch";

    /// Client name recorded on created datasets
    pub const DATASET_CLIENT_NAME: &str = "org.cgmsync.fetch";

    /// Device tag recorded on created datasets
    pub const DEVICE_TAG_CGM: &str = "cgm";
}

/// Keys of the opaque task data map
pub mod task_data {
    /// Provider session the task fetches with
    pub const PROVIDER_SESSION_ID: &str = "providerSessionId";

    /// Data source the task fetches for
    pub const DATA_SOURCE_ID: &str = "dataSourceId";

    /// Hashes of device snapshots already translated
    pub const DEVICE_HASHES: &str = "deviceHashes";
}
