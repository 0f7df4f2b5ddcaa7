// ABOUTME: Stateless translators from device-cloud records to platform data
// ABOUTME: One translator per record kind, all delegating time fields to the time translator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Record Translation
//!
//! Every translator is a plain function from a wire record to an optional
//! [`TranslatedDatum`]. Translators never fail: a record whose time cannot be parsed,
//! or which carries nothing translatable, yields `None` and a warning. Server-assigned
//! identifiers are never copied, so the store assigns its own. Provider fields with no
//! platform equivalent land in the datum's payload unchanged.

/// Calibration records
pub mod calibration;
/// Device snapshots
pub mod device;
/// Glucose values
pub mod glucose;
/// User-entered events
pub mod event;
/// System/display time reconciliation
pub mod time;

pub use calibration::translate_calibration;
pub use device::{device_hash, translate_device};
pub use event::translate_event;
pub use glucose::translate_egv;
pub use time::{
    parse_display_time, parse_system_time, translate, translate_str, TimeTranslation,
};

use cgm_core::models::{DatumKind, TranslatedDatum};
use serde_json::{Map, Value};
use tracing::warn;

/// Datum with translated time fields and `extra` as its payload
///
/// Returns `None` and logs if either time is unparseable.
fn timed_datum(
    kind: &'static str,
    system_time: &str,
    display_time: Option<&str>,
    body: DatumKind,
    extra: &Map<String, Value>,
) -> Option<TranslatedDatum> {
    let Some(translation) = translate_str(system_time, display_time) else {
        warn!(
            record_kind = kind,
            system_time,
            display_time = display_time.unwrap_or_default(),
            "skipping record with unparseable time"
        );
        return None;
    };

    let mut datum = TranslatedDatum::new(translation.time, body);
    translation.apply_to(&mut datum);
    datum.payload.clone_from(extra);
    Some(datum)
}
