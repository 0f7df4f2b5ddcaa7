// ABOUTME: Translates device snapshots into CGM settings and fingerprints them for deduplication
// ABOUTME: Known alerts become typed settings; unknown alerts are preserved in the payload
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::timed_datum;
use cgm_core::constants::provider::MANUFACTURER;
use cgm_core::models::{AlertSetting, CgmAlerts, CgmSettings, DatumKind, TranslatedDatum};
use cgm_providers::device_cloud::{AlertSettingRecord, DeviceRecord};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Translate a device snapshot into a `cgmSettings` datum
#[must_use]
pub fn translate_device(device: &DeviceRecord) -> Option<TranslatedDatum> {
    let mut alerts = CgmAlerts::default();
    let mut unknown_alerts = Map::new();

    for record in &device.alert_settings {
        let setting = AlertSetting {
            enabled: record.enabled,
            level: record.value,
            units: record.unit.clone(),
            snooze_minutes: record.snooze,
        };
        let slot = match record.alert_name.as_str() {
            "high" => &mut alerts.high,
            "low" => &mut alerts.low,
            "urgentLow" => &mut alerts.urgent_low,
            "rise" => &mut alerts.rise,
            "fall" => &mut alerts.fall,
            "outOfRange" => &mut alerts.out_of_range,
            _ => {
                unknown_alerts.insert(record.alert_name.clone(), alert_value(record));
                continue;
            }
        };
        *slot = Some(setting);
    }

    let mut datum = timed_datum(
        "device",
        &device.system_time,
        device.display_time.as_deref(),
        DatumKind::CgmSettings(CgmSettings {
            manufacturers: vec![MANUFACTURER.to_owned()],
            model: device.model.clone(),
            serial_number: device.serial_number.clone(),
            transmitter_id: device.transmitter_id.clone(),
            software_version: device.software_version.clone(),
            units: device.unit.clone(),
            alerts,
        }),
        &device.extra,
    )?;

    if let Some(generation) = &device.transmitter_generation {
        datum.payload.insert(
            "transmitterGeneration".to_owned(),
            Value::String(generation.clone()),
        );
    }
    if !unknown_alerts.is_empty() {
        datum
            .payload
            .insert("alerts".to_owned(), Value::Object(unknown_alerts));
    }
    Some(datum)
}

fn alert_value(record: &AlertSettingRecord) -> Value {
    serde_json::to_value(record).unwrap_or(Value::Null)
}

/// Hex SHA-256 of a device snapshot's canonical JSON
///
/// Identical snapshots hash identically, so an unchanged device is translated once.
#[must_use]
pub fn device_hash(device: &DeviceRecord) -> String {
    let canonical = serde_json::to_vec(device).unwrap_or_default();
    hex::encode(Sha256::digest(&canonical))
}
