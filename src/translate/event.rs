// ABOUTME: Translates user-entered events into food, activity, reported state, and insulin data
// ABOUTME: Deleted events and event types without a platform equivalent produce nothing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::timed_datum;
use cgm_core::models::{
    DatumKind, Food, HealthState, Insulin, InsulinKind, Intensity, PhysicalActivity,
    ReportedState, TranslatedDatum,
};
use cgm_providers::device_cloud::{EventDetails, EventRecord};
use serde_json::Value;
use tracing::debug;

/// Platform exercise intensity for a provider subtype
#[must_use]
pub fn map_intensity(sub_type: &str) -> Option<Intensity> {
    match sub_type {
        "light" => Some(Intensity::Low),
        "medium" => Some(Intensity::Medium),
        "heavy" => Some(Intensity::High),
        _ => None,
    }
}

/// Platform health state for a provider subtype
#[must_use]
pub fn map_health_state(sub_type: &str) -> Option<HealthState> {
    match sub_type {
        "illness" => Some(HealthState::Illness),
        "stress" => Some(HealthState::Stress),
        "highSymptoms" => Some(HealthState::HyperglycemiaSymptoms),
        "lowSymptoms" => Some(HealthState::HypoglycemiaSymptoms),
        "cycle" => Some(HealthState::Cycle),
        "alcohol" => Some(HealthState::Alcohol),
        _ => None,
    }
}

/// Platform insulin formulation for a provider subtype
#[must_use]
pub fn map_insulin_kind(sub_type: &str) -> Option<InsulinKind> {
    match sub_type {
        "fastActing" => Some(InsulinKind::Rapid),
        "longActing" => Some(InsulinKind::Long),
        _ => None,
    }
}

/// Translate an event into the matching datum
#[must_use]
pub fn translate_event(event: &EventRecord) -> Option<TranslatedDatum> {
    let (kind, details, body) = match event {
        EventRecord::Carbs(details) => {
            let Some(grams) = details.value else {
                debug!(system_time = %details.system_time, "skipping carbs event without a value");
                return None;
            };
            (
                "carbs",
                details,
                DatumKind::Food(Food {
                    net_carbohydrate_grams: grams,
                }),
            )
        }
        EventRecord::Exercise(details) => (
            "exercise",
            details,
            DatumKind::PhysicalActivity(PhysicalActivity {
                duration_minutes: details.value,
                reported_intensity: sub_type(details).and_then(map_intensity),
            }),
        ),
        EventRecord::Health(details) => {
            let Some(state) = sub_type(details).and_then(map_health_state) else {
                debug!(
                    system_time = %details.system_time,
                    "skipping health event with unknown subtype"
                );
                return None;
            };
            (
                "health",
                details,
                DatumKind::ReportedState(ReportedState {
                    states: vec![state],
                }),
            )
        }
        EventRecord::Insulin(details) => (
            "insulin",
            details,
            DatumKind::Insulin(Insulin {
                dose_units: details.value,
                insulin_kind: sub_type(details).and_then(map_insulin_kind),
            }),
        ),
        EventRecord::Unknown => return None,
    };

    if details.is_deleted() {
        debug!(record_kind = kind, system_time = %details.system_time, "skipping deleted event");
        return None;
    }

    let mut datum = timed_datum(
        kind,
        &details.system_time,
        details.display_time.as_deref(),
        body,
        &details.extra,
    )?;
    if let Some(raw) = sub_type(details) {
        if !subtype_translated(&datum.kind) {
            datum
                .payload
                .insert("eventSubType".to_owned(), Value::String(raw.to_owned()));
        }
    }
    Some(datum)
}

fn sub_type(details: &EventDetails) -> Option<&str> {
    details.event_sub_type.as_deref().filter(|raw| !raw.is_empty())
}

/// Whether the subtype was absorbed into a typed field
fn subtype_translated(kind: &DatumKind) -> bool {
    match kind {
        DatumKind::PhysicalActivity(activity) => activity.reported_intensity.is_some(),
        DatumKind::Insulin(insulin) => insulin.insulin_kind.is_some(),
        DatumKind::ReportedState(_) => true,
        _ => false,
    }
}
