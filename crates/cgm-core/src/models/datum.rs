// ABOUTME: Platform datum produced by translating one device-cloud record
// ABOUTME: Common time fields plus a type-tagged body for glucose, settings, and event data
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Translated data are immutable once built. Every datum carries the absolute `time`
//! and, when the device reported a display time, the zone-less `deviceTime` together
//! with the three offsets that reconcile it with `time`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One translated datum ready for storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedDatum {
    /// Absolute UTC instant
    pub time: DateTime<Utc>,
    /// Zone-less device clock reading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_time: Option<String>,
    /// Timezone offset in minutes, a multiple of 30
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone_offset: Option<i64>,
    /// Device clock drift in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_drift_offset: Option<i64>,
    /// Whole-day correction in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_offset: Option<i64>,
    /// Markers such as out-of-range pinning
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    /// Provider fields with no platform equivalent
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub payload: Map<String, Value>,
    /// Type-specific body
    #[serde(flatten)]
    pub kind: DatumKind,
}

impl TranslatedDatum {
    /// Datum at `time` with no offsets
    #[must_use]
    pub fn new(time: DateTime<Utc>, kind: DatumKind) -> Self {
        Self {
            time,
            device_time: None,
            time_zone_offset: None,
            clock_drift_offset: None,
            conversion_offset: None,
            annotations: Vec::new(),
            payload: Map::new(),
            kind,
        }
    }

    /// Platform type name
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

/// Free-form marker on a datum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Annotation code
    pub code: String,
    /// Annotation value
    pub value: String,
    /// Threshold that triggered the annotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

/// Type-specific datum bodies, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DatumKind {
    /// Continuous blood glucose reading
    Cbg(Glucose),
    /// Device event such as a calibration
    DeviceEvent(DeviceEvent),
    /// CGM configuration snapshot
    CgmSettings(CgmSettings),
    /// Carbohydrate intake
    Food(Food),
    /// Exercise
    PhysicalActivity(PhysicalActivity),
    /// Self-reported health state
    ReportedState(ReportedState),
    /// Insulin dose
    Insulin(Insulin),
}

impl DatumKind {
    /// Platform type name
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Cbg(_) => "cbg",
            Self::DeviceEvent(_) => "deviceEvent",
            Self::CgmSettings(_) => "cgmSettings",
            Self::Food(_) => "food",
            Self::PhysicalActivity(_) => "physicalActivity",
            Self::ReportedState(_) => "reportedState",
            Self::Insulin(_) => "insulin",
        }
    }
}

/// Rate-of-change category of a glucose reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trend {
    /// More than 3 mg/dL per minute up
    RapidRise,
    /// 2 to 3 mg/dL per minute up
    ModerateRise,
    /// 1 to 2 mg/dL per minute up
    SlowRise,
    /// Steady
    Constant,
    /// 1 to 2 mg/dL per minute down
    SlowFall,
    /// 2 to 3 mg/dL per minute down
    ModerateFall,
    /// More than 3 mg/dL per minute down
    RapidFall,
}

/// Body of a `cbg` datum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Glucose {
    /// Reading, pinned when out of range
    pub value: f64,
    /// `mg/dL` or `mmol/L`
    pub units: String,
    /// Trend category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
    /// Trend rate in units per minute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend_rate: Option<f64>,
}

/// Body of a `deviceEvent` datum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEvent {
    /// Event subtype, `calibration` for fingerstick calibrations
    pub sub_type: String,
    /// Calibration value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Calibration units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

/// One alert configured on the CGM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSetting {
    /// Whether the alert sounds
    pub enabled: bool,
    /// Threshold level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    /// Threshold units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// Snooze after acknowledgement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snooze_minutes: Option<i64>,
}

/// Known CGM alerts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CgmAlerts {
    /// High glucose alert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<AlertSetting>,
    /// Low glucose alert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<AlertSetting>,
    /// Urgent low glucose alarm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgent_low: Option<AlertSetting>,
    /// Rise rate alert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rise: Option<AlertSetting>,
    /// Fall rate alert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fall: Option<AlertSetting>,
    /// Signal loss alert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_of_range: Option<AlertSetting>,
}

/// Body of a `cgmSettings` datum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CgmSettings {
    /// Device manufacturers
    pub manufacturers: Vec<String>,
    /// Receiver or app model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Receiver serial number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Transmitter identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmitter_id: Option<String>,
    /// Software version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,
    /// Display units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// Configured alerts
    #[serde(default)]
    pub alerts: CgmAlerts,
}

/// Body of a `food` datum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Food {
    /// Net carbohydrate in grams
    pub net_carbohydrate_grams: f64,
}

/// Reported exercise intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Intensity {
    /// Light exercise
    Low,
    /// Moderate exercise
    Medium,
    /// Heavy exercise
    High,
}

/// Body of a `physicalActivity` datum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalActivity {
    /// Duration in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
    /// Reported intensity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_intensity: Option<Intensity>,
}

/// Self-reported health condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HealthState {
    /// Illness
    Illness,
    /// Stress
    Stress,
    /// Symptoms of high glucose
    HyperglycemiaSymptoms,
    /// Symptoms of low glucose
    HypoglycemiaSymptoms,
    /// Menstrual cycle
    Cycle,
    /// Alcohol consumption
    Alcohol,
}

/// Body of a `reportedState` datum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedState {
    /// Reported conditions
    pub states: Vec<HealthState>,
}

/// Insulin formulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InsulinKind {
    /// Fast-acting insulin
    Rapid,
    /// Long-acting insulin
    Long,
}

/// Body of an `insulin` datum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insulin {
    /// Dose in units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose_units: Option<f64>,
    /// Formulation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insulin_kind: Option<InsulinKind>,
}
