// ABOUTME: Translates fingerstick calibrations into calibration device events
// ABOUTME: Keeps the entered value and unit alongside the reconciled time fields
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::timed_datum;
use cgm_core::constants::glucose::{UNITS_MGDL, UNITS_MMOLL};
use cgm_core::models::{DatumKind, DeviceEvent, TranslatedDatum};
use cgm_providers::device_cloud::CalibrationRecord;

const CALIBRATION_SUB_TYPE: &str = "calibration";

/// Translate a calibration into a `deviceEvent` datum
#[must_use]
pub fn translate_calibration(calibration: &CalibrationRecord) -> Option<TranslatedDatum> {
    let units = calibration.unit.as_deref().map(|unit| {
        if unit.eq_ignore_ascii_case(UNITS_MMOLL) {
            UNITS_MMOLL.to_owned()
        } else if unit.eq_ignore_ascii_case(UNITS_MGDL) {
            UNITS_MGDL.to_owned()
        } else {
            unit.to_owned()
        }
    });

    timed_datum(
        "calibration",
        &calibration.system_time,
        calibration.display_time.as_deref(),
        DatumKind::DeviceEvent(DeviceEvent {
            sub_type: CALIBRATION_SUB_TYPE.to_owned(),
            value: calibration.value,
            units: units.or_else(|| calibration.value.map(|_| UNITS_MGDL.to_owned())),
        }),
        &calibration.extra,
    )
}
