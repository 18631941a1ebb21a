//! Calendar field accessors and Excel serial dates.
//!
//! Accessors read the local wall-clock time of an instant in a zone and
//! return `None` for a null input.

use chrono::{Datelike, NaiveDateTime, Offset, Timelike};

use crate::time::clock::Clock;
use crate::time::format::format_date;
use crate::time::timestamp::Timestamp;
use crate::time::zone::TimeZone;
use crate::time::{HOUR, MILLI};
use crate::{Error, Result};

/// Excel serial day number of 1970-01-01.
const EXCEL_EPOCH_DAYS: f64 = 25_569.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

fn local(t: Option<Timestamp>, zone: TimeZone) -> Option<NaiveDateTime> {
    t.map(|t| zone.to_local(t))
}

pub fn year(t: Option<Timestamp>, zone: TimeZone) -> Option<i32> {
    local(t, zone).map(|l| l.year())
}

pub fn year_of_century(t: Option<Timestamp>, zone: TimeZone) -> Option<i32> {
    local(t, zone).map(|l| l.year().rem_euclid(100))
}

/// 1 through 12.
pub fn month_of_year(t: Option<Timestamp>, zone: TimeZone) -> Option<u32> {
    local(t, zone).map(|l| l.month())
}

pub fn day_of_month(t: Option<Timestamp>, zone: TimeZone) -> Option<u32> {
    local(t, zone).map(|l| l.day())
}

/// Monday is 1, Sunday is 7.
pub fn day_of_week(t: Option<Timestamp>, zone: TimeZone) -> Option<u32> {
    local(t, zone).map(|l| l.weekday().number_from_monday())
}

pub fn day_of_year(t: Option<Timestamp>, zone: TimeZone) -> Option<u32> {
    local(t, zone).map(|l| l.ordinal())
}

pub fn hour_of_day(t: Option<Timestamp>, zone: TimeZone) -> Option<u32> {
    local(t, zone).map(|l| l.hour())
}

pub fn minute_of_hour(t: Option<Timestamp>, zone: TimeZone) -> Option<u32> {
    local(t, zone).map(|l| l.minute())
}

pub fn minute_of_day(t: Option<Timestamp>, zone: TimeZone) -> Option<u32> {
    local(t, zone).map(|l| l.hour() * 60 + l.minute())
}

pub fn second_of_minute(t: Option<Timestamp>, zone: TimeZone) -> Option<u32> {
    local(t, zone).map(|l| l.second())
}

pub fn second_of_day(t: Option<Timestamp>, zone: TimeZone) -> Option<u32> {
    local(t, zone).map(|l| l.num_seconds_from_midnight())
}

pub fn millis_of_second(t: Option<Timestamp>, zone: TimeZone) -> Option<u32> {
    local(t, zone).map(|l| (l.nanosecond() % 1_000_000_000) / 1_000_000)
}

pub fn millis_of_day(t: Option<Timestamp>, zone: TimeZone) -> Option<i64> {
    nanos_of_day(t, zone).map(|n| n / MILLI)
}

pub fn micros_of_second(t: Option<Timestamp>, zone: TimeZone) -> Option<i64> {
    nanos_of_second(t, zone).map(|n| n / 1_000)
}

pub fn nanos_of_second(t: Option<Timestamp>, zone: TimeZone) -> Option<i64> {
    local(t, zone).map(|l| i64::from(l.nanosecond() % 1_000_000_000))
}

pub fn nanos_of_day(t: Option<Timestamp>, zone: TimeZone) -> Option<i64> {
    local(t, zone).map(|l| {
        i64::from(l.num_seconds_from_midnight()) * 1_000_000_000
            + i64::from(l.nanosecond() % 1_000_000_000)
    })
}

/// Nanoseconds past the millisecond. Zone independent.
pub fn nanos_of_milli(t: Option<Timestamp>) -> Option<i64> {
    t.map(|t| t.nanos().rem_euclid(MILLI))
}

/// Microseconds past the millisecond, rounded. Zone independent.
pub fn micros_of_milli(t: Option<Timestamp>) -> Option<i64> {
    nanos_of_milli(t).map(|n| (n + 500) / 1_000)
}

/// Start of the local day containing `t`.
///
/// When local midnight does not exist (a DST jump at 00:00) the first
/// instant of the day after the gap is used.
pub fn at_midnight(t: Option<Timestamp>, zone: TimeZone) -> Result<Option<Timestamp>> {
    let Some(t) = t else {
        return Ok(None);
    };
    let midnight = zone.to_local(t).date().and_time(chrono::NaiveTime::MIN);
    if let Some(resolved) = zone.resolve_local(&midnight) {
        return crate::time::zone::zoned_to_timestamp(&resolved).map(Some);
    }
    let after_gap = midnight + chrono::Duration::nanoseconds(HOUR);
    zone.local_to_timestamp(&after_gap).map(Some)
}

/// The current local date in `zone` as `yyyy-MM-dd`.
pub fn today(clock: &dyn Clock, zone: TimeZone) -> String {
    format_date(Timestamp::now(clock), zone)
}

// ============================================================================
// Excel
// ============================================================================

/// Excel serial date-time of `t` in `zone`; `0.0` for null.
pub fn to_excel(t: Option<Timestamp>, zone: TimeZone) -> f64 {
    let Some(t) = t else {
        return 0.0;
    };
    let offset_millis = i64::from(zone.offset_seconds(t)) * 1_000;
    (t.millis() + offset_millis) as f64 / MILLIS_PER_DAY + EXCEL_EPOCH_DAYS
}

/// Instant for an Excel serial date-time in `zone`, at millisecond resolution.
pub fn from_excel(excel: f64, zone: TimeZone) -> Result<Timestamp> {
    let local_millis = (excel - EXCEL_EPOCH_DAYS) * MILLIS_PER_DAY;
    // Leave two days of headroom for the zone offset.
    let limit = (i64::MAX / MILLI - 2 * 86_400_000) as f64;
    if !local_millis.is_finite() || local_millis.abs() >= limit {
        return Err(Error::overflow(format!("excel date {excel} is out of range")));
    }
    let local_millis = local_millis.round() as i64;

    // The offset is looked up twice: once at the local reading taken as UTC,
    // then at the corrected instant.
    let offset_at = |millis: i64| -> i64 {
        let instant = Timestamp::from_nanos_unchecked(millis * MILLI);
        i64::from(zone.to_zoned(instant).offset().fix().local_minus_utc()) * 1_000
    };
    let first = local_millis - offset_at(local_millis);
    let utc_millis = local_millis - offset_at(first);
    Timestamp::try_from_nanos(utc_millis * MILLI)
}
