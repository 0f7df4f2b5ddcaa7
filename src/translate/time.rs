// ABOUTME: Reconciles a device's system clock and display clock into one UTC timeline
// ABOUTME: Splits the difference into a 30-minute timezone offset, clock drift, and whole-day correction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Time Translation
//!
//! A CGM receiver keeps two clocks. `systemTime` is its belief of absolute time and
//! `displayTime` is what it showed the user. Their difference is mostly the user's
//! timezone, plus whatever the clock drifted, plus sometimes a whole day when the user
//! set the wrong date. Translation attributes the difference to those three parts
//! with exact arithmetic:
//!
//! ```text
//! deviceTime + timeZoneOffset + clockDriftOffset + conversionOffset == displayTime
//! ```

use cgm_core::constants::time_translation::{
    DAY_MILLIS, DEVICE_TIME_FORMAT, OFFSET_COUNT_MAXIMUM, OFFSET_COUNT_MINIMUM,
    OFFSET_COUNT_PER_DAY, OFFSET_UNIT_MILLIS, OFFSET_UNIT_MINUTES,
};
use cgm_core::models::TranslatedDatum;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Zone-less layouts accepted after RFC 3339 fails
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Result of translating one `(systemTime, displayTime)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeTranslation {
    /// Absolute UTC instant
    pub time: DateTime<Utc>,
    /// Zone-less rendering of the system time, present when a display time was given
    pub device_time: Option<String>,
    /// Timezone offset in minutes
    pub time_zone_offset: Option<i64>,
    /// Clock drift in milliseconds
    pub clock_drift_offset: Option<i64>,
    /// Whole-day correction in milliseconds
    pub conversion_offset: Option<i64>,
}

impl TimeTranslation {
    /// Copy the time fields onto a datum
    pub fn apply_to(&self, datum: &mut TranslatedDatum) {
        datum.time = self.time;
        datum.device_time.clone_from(&self.device_time);
        datum.time_zone_offset = self.time_zone_offset;
        datum.clock_drift_offset = self.clock_drift_offset;
        datum.conversion_offset = self.conversion_offset;
    }
}

/// Parse a system time; an explicit zone is honoured and an unzoned value is UTC
#[must_use]
pub fn parse_system_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(zoned) = DateTime::parse_from_rfc3339(raw) {
        return Some(zoned.with_timezone(&Utc));
    }
    parse_naive(raw).map(|naive| naive.and_utc())
}

/// Parse a display time as a wall-clock reading; an explicit zone is dropped
#[must_use]
pub fn parse_display_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(zoned) = DateTime::parse_from_rfc3339(raw) {
        return Some(zoned.naive_local());
    }
    parse_naive(raw)
}

fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Translate a parsed pair; pure arithmetic at millisecond precision
#[must_use]
pub fn translate(
    system_time: DateTime<Utc>,
    display_time: Option<NaiveDateTime>,
) -> TimeTranslation {
    let system_millis = system_time.timestamp_millis();
    let time = DateTime::from_timestamp_millis(system_millis).unwrap_or(system_time);

    let Some(display_time) = display_time else {
        return TimeTranslation {
            time,
            device_time: None,
            time_zone_offset: None,
            clock_drift_offset: None,
            conversion_offset: None,
        };
    };

    let delta = display_time.and_utc().timestamp_millis() - system_millis;
    let (offset_count, clock_drift) = quantize(delta);
    let (offset_count, conversion) = fold_days(offset_count);

    TimeTranslation {
        time,
        device_time: Some(time.naive_utc().format(DEVICE_TIME_FORMAT).to_string()),
        time_zone_offset: non_zero(offset_count * OFFSET_UNIT_MINUTES),
        clock_drift_offset: non_zero(clock_drift),
        conversion_offset: non_zero(conversion),
    }
}

/// Translate raw strings; `None` if either present value is unparseable
///
/// A blank display time counts as absent.
#[must_use]
pub fn translate_str(system_time: &str, display_time: Option<&str>) -> Option<TimeTranslation> {
    let system_time = parse_system_time(system_time)?;
    let display_time = match display_time.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => Some(parse_display_time(raw)?),
        None => None,
    };
    Some(translate(system_time, display_time))
}

/// Nearest whole number of offset units (ties away from zero) and the remainder
fn quantize(delta: i64) -> (i64, i64) {
    let mut count = delta / OFFSET_UNIT_MILLIS;
    let remainder = delta % OFFSET_UNIT_MILLIS;
    if remainder.abs() * 2 >= OFFSET_UNIT_MILLIS {
        count += delta.signum();
    }
    (count, delta - count * OFFSET_UNIT_MILLIS)
}

/// Move whole days out of an offset count beyond +14h or -12h
fn fold_days(mut offset_count: i64) -> (i64, i64) {
    let mut conversion = 0;
    while offset_count > OFFSET_COUNT_MAXIMUM {
        offset_count -= OFFSET_COUNT_PER_DAY;
        conversion += DAY_MILLIS;
    }
    while offset_count < OFFSET_COUNT_MINIMUM {
        offset_count += OFFSET_COUNT_PER_DAY;
        conversion -= DAY_MILLIS;
    }
    (offset_count, conversion)
}

const fn non_zero(value: i64) -> Option<i64> {
    if value == 0 {
        None
    } else {
        Some(value)
    }
}
