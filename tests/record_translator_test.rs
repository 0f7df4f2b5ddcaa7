// ABOUTME: Tests for translating device-cloud records into platform data
// ABOUTME: Covers glucose pinning, trend and event vocabularies, device alerts, and payload preservation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use cgm_core::models::{DatumKind, HealthState, InsulinKind, Intensity, Trend};
use cgm_providers::device_cloud::{CalibrationRecord, DeviceRecord, EgvRecord, EventRecord};
use cgm_sync::translate::glucose::map_trend;
use cgm_sync::translate::{
    device_hash, translate_calibration, translate_device, translate_egv, translate_event,
};
use serde_json::{json, Value};

fn egv(value: Value) -> EgvRecord {
    serde_json::from_value(value).unwrap()
}

fn event(value: Value) -> EventRecord {
    serde_json::from_value(value).unwrap()
}

fn glucose_of(kind: &DatumKind) -> (f64, &str, Option<Trend>) {
    match kind {
        DatumKind::Cbg(glucose) => (glucose.value, glucose.units.as_str(), glucose.trend),
        other => panic!("expected cbg, got {other:?}"),
    }
}

// ── Glucose values ──────────────────────────────────────────────────────

#[test]
fn test_in_range_egv_keeps_value_trend_and_time_fields() {
    let datum = translate_egv(&egv(json!({
        "recordId": "rec-1",
        "systemTime": "2023-10-31T15:31:42",
        "displayTime": "2023-10-31T10:31:42",
        "value": 112,
        "unit": "mg/dL",
        "trend": "fortyFiveUp",
        "trendRate": 1.2,
        "transmitterTicks": 4242
    })))
    .unwrap();

    let (value, units, trend) = glucose_of(&datum.kind);
    assert!((value - 112.0).abs() < f64::EPSILON);
    assert_eq!(units, "mg/dL");
    assert_eq!(trend, Some(Trend::SlowRise));
    assert!(datum.annotations.is_empty());
    assert_eq!(datum.time_zone_offset, Some(-300));
    assert_eq!(datum.device_time.as_deref(), Some("2023-10-31T15:31:42.000"));
    assert_eq!(datum.payload.get("transmitterTicks"), Some(&json!(4242)));
    assert!(!datum.payload.contains_key("recordId"));
}

#[test]
fn test_low_egv_is_pinned_and_annotated() {
    let datum = translate_egv(&egv(json!({
        "systemTime": "2023-10-31T15:31:42Z",
        "value": 35,
        "unit": "mg/dL"
    })))
    .unwrap();

    let (value, _, _) = glucose_of(&datum.kind);
    assert!((value - 39.0).abs() < f64::EPSILON);
    assert_eq!(datum.annotations.len(), 1);
    assert_eq!(datum.annotations[0].code, "bg/out-of-range");
    assert_eq!(datum.annotations[0].value, "low");
    assert_eq!(datum.annotations[0].threshold, Some(40.0));
}

#[test]
fn test_high_status_without_value_is_pinned_high() {
    let datum = translate_egv(&egv(json!({
        "systemTime": "2023-10-31T15:31:42Z",
        "status": "high",
        "unit": "mg/dL"
    })))
    .unwrap();

    let (value, _, _) = glucose_of(&datum.kind);
    assert!((value - 401.0).abs() < f64::EPSILON);
    assert_eq!(datum.annotations[0].value, "high");
    assert_eq!(datum.annotations[0].threshold, Some(400.0));
    assert!(!datum.payload.contains_key("status"));
}

#[test]
fn test_mmol_thresholds_are_converted() {
    let datum = translate_egv(&egv(json!({
        "systemTime": "2023-10-31T15:31:42Z",
        "value": 25.0,
        "unit": "mmol/L"
    })))
    .unwrap();

    let (value, units, _) = glucose_of(&datum.kind);
    assert_eq!(units, "mmol/L");
    assert!((value - 401.0 / 18.015_59).abs() < 1e-9);
    let threshold = datum.annotations[0].threshold.unwrap();
    assert!((threshold - 400.0 / 18.015_59).abs() < 1e-9);
}

#[test]
fn test_egv_without_reading_is_skipped() {
    assert!(translate_egv(&egv(json!({"systemTime": "2023-10-31T15:31:42Z"}))).is_none());
}

#[test]
fn test_egv_with_unparseable_time_is_skipped() {
    assert!(translate_egv(&egv(json!({"systemTime": "garbage", "value": 100}))).is_none());
}

#[test]
fn test_unknown_trend_is_kept_in_payload() {
    let datum = translate_egv(&egv(json!({
        "systemTime": "2023-10-31T15:31:42Z",
        "value": 100,
        "trend": "notComputable"
    })))
    .unwrap();

    let (_, _, trend) = glucose_of(&datum.kind);
    assert_eq!(trend, None);
    assert_eq!(datum.payload.get("trend"), Some(&json!("notComputable")));
}

#[test]
fn test_trend_vocabulary() {
    assert_eq!(map_trend("doubleUp"), Some(Trend::RapidRise));
    assert_eq!(map_trend("singleUp"), Some(Trend::ModerateRise));
    assert_eq!(map_trend("fortyFiveUp"), Some(Trend::SlowRise));
    assert_eq!(map_trend("flat"), Some(Trend::Constant));
    assert_eq!(map_trend("fortyFiveDown"), Some(Trend::SlowFall));
    assert_eq!(map_trend("singleDown"), Some(Trend::ModerateFall));
    assert_eq!(map_trend("doubleDown"), Some(Trend::RapidFall));
    assert_eq!(map_trend("rateOutOfRange"), None);
}

// ── Calibrations ────────────────────────────────────────────────────────

#[test]
fn test_calibration_becomes_device_event() {
    let record: CalibrationRecord = serde_json::from_value(json!({
        "recordId": "cal-1",
        "systemTime": "2023-10-31T15:31:42",
        "displayTime": "2023-10-31T10:31:42",
        "value": 6.5,
        "unit": "MMOL/L"
    }))
    .unwrap();

    let datum = translate_calibration(&record).unwrap();
    assert_eq!(datum.type_name(), "deviceEvent");
    match &datum.kind {
        DatumKind::DeviceEvent(event) => {
            assert_eq!(event.sub_type, "calibration");
            assert_eq!(event.value, Some(6.5));
            assert_eq!(event.units.as_deref(), Some("mmol/L"));
        }
        other => panic!("expected deviceEvent, got {other:?}"),
    }
}

// ── Devices ─────────────────────────────────────────────────────────────

fn device_record() -> DeviceRecord {
    serde_json::from_value(json!({
        "lastUploadDate": "2023-10-31T15:31:42",
        "displayTime": "2023-10-31T10:31:42",
        "transmitterId": "8XXXXX",
        "transmitterGeneration": "g7",
        "displayDevice": "android",
        "displayApp": "G7",
        "unit": "mg/dL",
        "alertSettings": [
            {"alertName": "urgentLow", "value": 55, "unit": "mg/dL", "snooze": 30, "enabled": true},
            {"alertName": "outOfRange", "value": 20, "unit": "minutes", "enabled": false},
            {"alertName": "fixedLow", "value": 55, "unit": "mg/dL", "enabled": true}
        ]
    }))
    .unwrap()
}

#[test]
fn test_device_becomes_cgm_settings_with_known_alerts() {
    let datum = translate_device(&device_record()).unwrap();

    let DatumKind::CgmSettings(settings) = &datum.kind else {
        panic!("expected cgmSettings, got {:?}", datum.kind);
    };
    assert_eq!(settings.manufacturers, vec!["Dexcom"]);
    assert_eq!(settings.model.as_deref(), Some("android"));
    assert_eq!(settings.transmitter_id.as_deref(), Some("8XXXXX"));
    assert_eq!(settings.software_version.as_deref(), Some("G7"));

    let urgent_low = settings.alerts.urgent_low.as_ref().unwrap();
    assert!(urgent_low.enabled);
    assert_eq!(urgent_low.level, Some(55.0));
    assert_eq!(urgent_low.snooze_minutes, Some(30));
    assert!(!settings.alerts.out_of_range.as_ref().unwrap().enabled);
    assert!(settings.alerts.high.is_none());

    assert_eq!(datum.payload["transmitterGeneration"], "g7");
    assert_eq!(datum.payload["alerts"]["fixedLow"]["value"], 55.0);
}

#[test]
fn test_device_hash_tracks_snapshot_content() {
    let original = device_record();
    let mut changed = device_record();
    changed.software_version = Some("G7.1".to_owned());

    assert_eq!(device_hash(&original), device_hash(&device_record()));
    assert_ne!(device_hash(&original), device_hash(&changed));
    assert_eq!(device_hash(&original).len(), 64);
}

// ── Events ──────────────────────────────────────────────────────────────

#[test]
fn test_carbs_become_food() {
    let datum = translate_event(&event(json!({
        "eventType": "carbs",
        "eventId": "ev-1",
        "systemTime": "2023-10-31T15:31:42",
        "displayTime": "2023-10-31T10:31:42",
        "value": 45,
        "unit": "grams"
    })))
    .unwrap();

    match &datum.kind {
        DatumKind::Food(food) => assert!((food.net_carbohydrate_grams - 45.0).abs() < f64::EPSILON),
        other => panic!("expected food, got {other:?}"),
    }
    assert!(!datum.payload.contains_key("eventId"));
}

#[test]
fn test_exercise_intensity_vocabulary() {
    for (sub_type, intensity) in [
        ("light", Intensity::Low),
        ("medium", Intensity::Medium),
        ("heavy", Intensity::High),
    ] {
        let datum = translate_event(&event(json!({
            "eventType": "exercise",
            "systemTime": "2023-10-31T15:31:42Z",
            "eventSubType": sub_type,
            "value": 30
        })))
        .unwrap();

        match &datum.kind {
            DatumKind::PhysicalActivity(activity) => {
                assert_eq!(activity.reported_intensity, Some(intensity));
                assert_eq!(activity.duration_minutes, Some(30.0));
            }
            other => panic!("expected physicalActivity, got {other:?}"),
        }
    }
}

#[test]
fn test_health_state_vocabulary() {
    for (sub_type, state) in [
        ("illness", HealthState::Illness),
        ("stress", HealthState::Stress),
        ("highSymptoms", HealthState::HyperglycemiaSymptoms),
        ("lowSymptoms", HealthState::HypoglycemiaSymptoms),
        ("cycle", HealthState::Cycle),
        ("alcohol", HealthState::Alcohol),
    ] {
        let datum = translate_event(&event(json!({
            "eventType": "health",
            "systemTime": "2023-10-31T15:31:42Z",
            "eventSubType": sub_type
        })))
        .unwrap();

        match &datum.kind {
            DatumKind::ReportedState(reported) => assert_eq!(reported.states, vec![state]),
            other => panic!("expected reportedState, got {other:?}"),
        }
    }
}

#[test]
fn test_insulin_kinds_and_unknown_subtype() {
    let rapid = translate_event(&event(json!({
        "eventType": "insulin",
        "systemTime": "2023-10-31T15:31:42Z",
        "eventSubType": "fastActing",
        "value": 4.5
    })))
    .unwrap();
    match &rapid.kind {
        DatumKind::Insulin(insulin) => {
            assert_eq!(insulin.insulin_kind, Some(InsulinKind::Rapid));
            assert_eq!(insulin.dose_units, Some(4.5));
        }
        other => panic!("expected insulin, got {other:?}"),
    }

    let inhaled = translate_event(&event(json!({
        "eventType": "insulin",
        "systemTime": "2023-10-31T15:31:42Z",
        "eventSubType": "inhaled",
        "value": 2
    })))
    .unwrap();
    match &inhaled.kind {
        DatumKind::Insulin(insulin) => assert_eq!(insulin.insulin_kind, None),
        other => panic!("expected insulin, got {other:?}"),
    }
    assert_eq!(inhaled.payload.get("eventSubType"), Some(&json!("inhaled")));
}

#[test]
fn test_untranslatable_events_are_skipped() {
    let deleted = event(json!({
        "eventType": "carbs",
        "systemTime": "2023-10-31T15:31:42Z",
        "eventStatus": "deleted",
        "value": 30
    }));
    let unknown_type = event(json!({
        "eventType": "bloodGlucose",
        "systemTime": "2023-10-31T15:31:42Z",
        "value": 120
    }));
    let unknown_health = event(json!({
        "eventType": "health",
        "systemTime": "2023-10-31T15:31:42Z",
        "eventSubType": "travel"
    }));
    let empty_carbs = event(json!({
        "eventType": "carbs",
        "systemTime": "2023-10-31T15:31:42Z"
    }));

    assert!(translate_event(&deleted).is_none());
    assert!(translate_event(&unknown_type).is_none());
    assert!(translate_event(&unknown_health).is_none());
    assert!(translate_event(&empty_carbs).is_none());
}
