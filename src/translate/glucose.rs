// ABOUTME: Translates estimated glucose values into continuous blood glucose data
// ABOUTME: Pins out-of-range readings to the sensor limits and annotates them instead of dropping them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::timed_datum;
use cgm_core::constants::glucose::{
    MGDL_MAXIMUM, MGDL_MINIMUM, MGDL_PINNED_MAXIMUM, MGDL_PINNED_MINIMUM, MMOLL_TO_MGDL,
    OUT_OF_RANGE_ANNOTATION, UNITS_MGDL, UNITS_MMOLL,
};
use cgm_core::models::{Annotation, DatumKind, Glucose, TranslatedDatum, Trend};
use cgm_providers::device_cloud::EgvRecord;
use serde_json::Value;
use tracing::debug;

/// Sensor limits expressed in one unit
struct Range {
    units: &'static str,
    minimum: f64,
    maximum: f64,
    pinned_minimum: f64,
    pinned_maximum: f64,
}

impl Range {
    fn for_units(units: Option<&str>) -> Self {
        if units.is_some_and(|units| units.eq_ignore_ascii_case(UNITS_MMOLL)) {
            Self {
                units: UNITS_MMOLL,
                minimum: MGDL_MINIMUM / MMOLL_TO_MGDL,
                maximum: MGDL_MAXIMUM / MMOLL_TO_MGDL,
                pinned_minimum: MGDL_PINNED_MINIMUM / MMOLL_TO_MGDL,
                pinned_maximum: MGDL_PINNED_MAXIMUM / MMOLL_TO_MGDL,
            }
        } else {
            Self {
                units: UNITS_MGDL,
                minimum: MGDL_MINIMUM,
                maximum: MGDL_MAXIMUM,
                pinned_minimum: MGDL_PINNED_MINIMUM,
                pinned_maximum: MGDL_PINNED_MAXIMUM,
            }
        }
    }

    fn low(&self) -> (f64, Annotation) {
        (self.pinned_minimum, out_of_range("low", self.minimum))
    }

    fn high(&self) -> (f64, Annotation) {
        (self.pinned_maximum, out_of_range("high", self.maximum))
    }
}

fn out_of_range(value: &str, threshold: f64) -> Annotation {
    Annotation {
        code: OUT_OF_RANGE_ANNOTATION.to_owned(),
        value: value.to_owned(),
        threshold: Some(threshold),
    }
}

/// Platform trend for a provider trend arrow
#[must_use]
pub fn map_trend(trend: &str) -> Option<Trend> {
    match trend {
        "doubleUp" => Some(Trend::RapidRise),
        "singleUp" => Some(Trend::ModerateRise),
        "fortyFiveUp" => Some(Trend::SlowRise),
        "flat" => Some(Trend::Constant),
        "fortyFiveDown" => Some(Trend::SlowFall),
        "singleDown" => Some(Trend::ModerateFall),
        "doubleDown" => Some(Trend::RapidFall),
        _ => None,
    }
}

/// Translate an estimated glucose value into a `cbg` datum
#[must_use]
pub fn translate_egv(egv: &EgvRecord) -> Option<TranslatedDatum> {
    let range = Range::for_units(egv.unit.as_deref());
    let status = egv.status.as_deref().map(str::to_ascii_lowercase);

    let (value, annotation) = match (status.as_deref(), egv.value) {
        (Some("low"), _) => {
            let (value, annotation) = range.low();
            (value, Some(annotation))
        }
        (Some("high"), _) => {
            let (value, annotation) = range.high();
            (value, Some(annotation))
        }
        (_, Some(value)) if value < range.minimum => {
            let (value, annotation) = range.low();
            (value, Some(annotation))
        }
        (_, Some(value)) if value > range.maximum => {
            let (value, annotation) = range.high();
            (value, Some(annotation))
        }
        (_, Some(value)) => (value, None),
        (_, None) => {
            debug!(system_time = %egv.system_time, "skipping glucose value without a reading");
            return None;
        }
    };

    let trend = egv.trend.as_deref().and_then(map_trend);
    let mut datum = timed_datum(
        "egv",
        &egv.system_time,
        egv.display_time.as_deref(),
        DatumKind::Cbg(Glucose {
            value,
            units: range.units.to_owned(),
            trend,
            trend_rate: egv.trend_rate,
        }),
        &egv.extra,
    )?;

    datum.annotations.extend(annotation);
    if trend.is_none() {
        if let Some(raw) = &egv.trend {
            datum.payload.insert("trend".to_owned(), Value::String(raw.clone()));
        }
    }
    if let Some(status) = status.filter(|status| status != "low" && status != "high") {
        datum.payload.insert("status".to_owned(), Value::String(status));
    }
    Some(datum)
}
