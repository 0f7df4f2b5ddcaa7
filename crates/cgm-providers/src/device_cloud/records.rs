// ABOUTME: Wire records returned by the device cloud for devices, calibrations, glucose values, and events
// ABOUTME: Optional fields decode leniently and malformed entries are dropped; unknown fields are retained
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Number that may arrive as a JSON number or a numeric string
///
/// Anything else becomes `None` rather than failing the whole response.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Whole number that may arrive as a JSON number or a numeric string
fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.round() as i64)),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

/// String field; any other JSON type becomes `None`
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}

/// Flag that may arrive as a JSON boolean or a `"true"`/`"false"` string; anything else is `false`
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(flag)) => flag,
        Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// List whose malformed entries are dropped instead of failing the whole response
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Some(Value::Array(entries)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "dropping malformed device cloud entry");
                None
            }
        })
        .collect())
}

/// One alert configured on a display device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSettingRecord {
    /// Alert name such as `high`, `urgentLow`, `outOfRange`
    pub alert_name: String,
    /// Threshold value
    #[serde(default, deserialize_with = "lenient_number")]
    pub value: Option<f64>,
    /// Threshold unit
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: Option<String>,
    /// Snooze in minutes
    #[serde(default, deserialize_with = "lenient_integer")]
    pub snooze: Option<i64>,
    /// Whether the alert is enabled
    #[serde(default, deserialize_with = "lenient_bool")]
    pub enabled: bool,
    /// Unrecognized fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Snapshot of a display device and its transmitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// Device belief of absolute time at upload
    #[serde(alias = "lastUploadDate")]
    pub system_time: String,
    /// Device display time at upload
    #[serde(default, deserialize_with = "lenient_string")]
    pub display_time: Option<String>,
    /// Receiver or app model
    #[serde(default, alias = "displayDevice", deserialize_with = "lenient_string")]
    pub model: Option<String>,
    /// Receiver serial number
    #[serde(default, deserialize_with = "lenient_string")]
    pub serial_number: Option<String>,
    /// Transmitter identifier
    #[serde(default, deserialize_with = "lenient_string")]
    pub transmitter_id: Option<String>,
    /// Transmitter generation such as `g6`
    #[serde(default, deserialize_with = "lenient_string")]
    pub transmitter_generation: Option<String>,
    /// Software version
    #[serde(default, alias = "displayApp", deserialize_with = "lenient_string")]
    pub software_version: Option<String>,
    /// Display unit
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: Option<String>,
    /// Configured alerts
    #[serde(default, deserialize_with = "lenient_list")]
    pub alert_settings: Vec<AlertSettingRecord>,
    /// Unrecognized fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceRecord {
    /// Stable key for deduplicating snapshots of the same device
    #[must_use]
    pub fn identity_key(&self) -> String {
        self.serial_number
            .as_deref()
            .or(self.transmitter_id.as_deref())
            .or(self.model.as_deref())
            .unwrap_or("unknown")
            .to_owned()
    }
}

/// Fingerstick calibration entered on the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationRecord {
    /// Server-assigned identifier, never forwarded
    #[serde(default, deserialize_with = "lenient_string")]
    pub record_id: Option<String>,
    /// Device belief of absolute time
    pub system_time: String,
    /// Device display time
    #[serde(default, deserialize_with = "lenient_string")]
    pub display_time: Option<String>,
    /// Calibration value
    #[serde(default, deserialize_with = "lenient_number")]
    pub value: Option<f64>,
    /// Calibration unit
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: Option<String>,
    /// Unrecognized fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Estimated glucose value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EgvRecord {
    /// Server-assigned identifier, never forwarded
    #[serde(default, deserialize_with = "lenient_string")]
    pub record_id: Option<String>,
    /// Device belief of absolute time
    pub system_time: String,
    /// Device display time
    #[serde(default, deserialize_with = "lenient_string")]
    pub display_time: Option<String>,
    /// Glucose value
    #[serde(default, deserialize_with = "lenient_number")]
    pub value: Option<f64>,
    /// Glucose unit; falls back to the response unit
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: Option<String>,
    /// `low` or `high` when the sensor reading is outside its range
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    /// Trend arrow
    #[serde(default, deserialize_with = "lenient_string")]
    pub trend: Option<String>,
    /// Rate of change per minute
    #[serde(default, deserialize_with = "lenient_number")]
    pub trend_rate: Option<f64>,
    /// Unrecognized fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fields shared by every event kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    /// Server-assigned identifier, never forwarded
    #[serde(default, alias = "eventId", deserialize_with = "lenient_string")]
    pub record_id: Option<String>,
    /// Device belief of absolute time
    pub system_time: String,
    /// Device display time
    #[serde(default, deserialize_with = "lenient_string")]
    pub display_time: Option<String>,
    /// `created`, `updated`, or `deleted`
    #[serde(default, alias = "eventStatus", deserialize_with = "lenient_string")]
    pub status: Option<String>,
    /// Subtype within the event kind
    #[serde(default, deserialize_with = "lenient_string")]
    pub event_sub_type: Option<String>,
    /// Event value
    #[serde(default, deserialize_with = "lenient_number")]
    pub value: Option<f64>,
    /// Event unit
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: Option<String>,
    /// Unrecognized fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventDetails {
    /// Whether the user deleted the event on the device
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("deleted"))
    }
}

/// User-entered event, tagged by `eventType`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "camelCase")]
pub enum EventRecord {
    /// Carbohydrate intake
    Carbs(EventDetails),
    /// Exercise
    Exercise(EventDetails),
    /// Health condition
    Health(EventDetails),
    /// Insulin dose
    Insulin(EventDetails),
    /// Event type this client does not translate
    #[serde(other)]
    Unknown,
}

/// `GET /devices` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevicesResponse {
    /// Device snapshots
    #[serde(default, deserialize_with = "lenient_list")]
    pub devices: Vec<DeviceRecord>,
}

/// `GET /calibrations` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalibrationsResponse {
    /// Calibrations
    #[serde(default, deserialize_with = "lenient_list")]
    pub calibrations: Vec<CalibrationRecord>,
}

/// `GET /egvs` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EgvsResponse {
    /// Unit of every value without its own unit
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: Option<String>,
    /// Glucose values
    #[serde(default, deserialize_with = "lenient_list")]
    pub egvs: Vec<EgvRecord>,
}

impl EgvsResponse {
    /// Glucose values with the response unit applied where a record has none
    #[must_use]
    pub fn into_records(self) -> Vec<EgvRecord> {
        let unit = self.unit;
        self.egvs
            .into_iter()
            .map(|mut egv| {
                if egv.unit.is_none() {
                    egv.unit.clone_from(&unit);
                }
                egv
            })
            .collect()
    }
}

/// `GET /events` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsResponse {
    /// Events
    #[serde(default, deserialize_with = "lenient_list")]
    pub events: Vec<EventRecord>,
}
