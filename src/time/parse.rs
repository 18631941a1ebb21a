//! Literal grammars for durations, periods, timestamps, dates and local times.
//!
//! Each grammar has a `Result` form that fails with [`Error::Parse`] (or
//! [`Error::Overflow`] when a well-formed literal is out of range) and a
//! `*_quiet` form returning `Option`. Literal-kind detection only ever
//! uses the quiet forms.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::time::arith::checked_plus;
use crate::time::period::Period;
use crate::time::timestamp::Timestamp;
use crate::time::zone::{zoned_to_timestamp, TimeZone};
use crate::time::{DAY, HOUR, MINUTE, SECOND};
use crate::{Error, Result};

/// Field order of slash-separated dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateStyle {
    #[default]
    MDY,
    DMY,
    YMD,
}

impl FromStr for DateStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MDY" => Ok(DateStyle::MDY),
            "DMY" => Ok(DateStyle::DMY),
            "YMD" => Ok(DateStyle::YMD),
            _ => Err(Error::parse(format!("unknown date style '{s}'"))),
        }
    }
}

/// Finest field present in a date-time literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimePrecision {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    SubSecond,
}

impl fmt::Display for TimePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimePrecision::Year => "Year",
            TimePrecision::Month => "Month",
            TimePrecision::Day => "Day",
            TimePrecision::Hour => "Hour",
            TimePrecision::Minute => "Minute",
            TimePrecision::Second => "Second",
            TimePrecision::SubSecond => "SubSecond",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Scanner
// ============================================================================

struct Cursor<'a> {
    s: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Self { s, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.s.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Up to `max` ASCII digits; nothing is consumed when fewer than `min` are present.
    fn digits(&mut self, min: usize, max: usize) -> Option<&'a str> {
        let n = self.s.as_bytes()[self.pos..]
            .iter()
            .take(max)
            .take_while(|b| b.is_ascii_digit())
            .count();
        if n < min {
            return None;
        }
        let out = &self.s[self.pos..self.pos + n];
        self.pos += n;
        Some(out)
    }

    fn number(&mut self, min: usize, max: usize) -> Option<i64> {
        self.digits(min, max)?.parse().ok()
    }

    fn done(&self) -> bool {
        self.pos == self.s.len()
    }
}

/// `yyyy-MM-dd` with exact digit counts.
fn scan_iso_date(cur: &mut Cursor<'_>) -> Option<NaiveDate> {
    let year = cur.number(4, 4)?;
    if !cur.eat(b'-') {
        return None;
    }
    let month = cur.number(2, 2)?;
    if !cur.eat(b'-') {
        return None;
    }
    let day = cur.number(2, 2)?;
    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
}

// ============================================================================
// Fractions
// ============================================================================

/// Parse fractional-second digits as nanoseconds.
///
/// The digits are read as a fixed nine-wide field: shorter input is padded
/// with zeros on the right, digits past the ninth are ignored.
pub fn parse_fraction_nanos(s: &str) -> Result<i64> {
    let bytes = s.as_bytes();
    let mut result = 0_i64;
    for i in 0..9 {
        let digit = match bytes.get(i) {
            None => 0,
            Some(b) if b.is_ascii_digit() => i64::from(b - b'0'),
            Some(&b) => {
                return Err(Error::parse(format!(
                    "invalid character for nanoseconds conversion: '{}'",
                    char::from(b)
                )))
            }
        };
        result = result * 10 + digit;
    }
    Ok(result)
}

// ============================================================================
// Durations
// ============================================================================

/// `-?(<days>T)?hh:mm(:ss)?(.f{1,9})?`. `None` when the grammar does not match.
fn scan_duration(s: &str) -> Option<Result<i64>> {
    let mut cur = Cursor::new(s);
    let negative = cur.eat(b'-');

    let first = cur.number(1, 18)?;
    let (days, hours) = if cur.eat(b'T') {
        (first, cur.number(1, 18)?)
    } else {
        (0, first)
    };
    if !cur.eat(b':') {
        return None;
    }
    let minutes = cur.number(1, 18)?;
    let seconds = if cur.eat(b':') { cur.number(1, 18)? } else { 0 };
    let fraction = if cur.eat(b'.') {
        let digits = cur.digits(1, 9)?;
        match parse_fraction_nanos(digits) {
            Ok(n) => n,
            Err(e) => return Some(Err(e)),
        }
    } else {
        0
    };
    if !cur.done() {
        return None;
    }

    let total = [(days, DAY), (hours, HOUR), (minutes, MINUTE), (seconds, SECOND)]
        .iter()
        .try_fold(fraction, |acc, &(count, unit)| {
            count.checked_mul(unit).and_then(|n| acc.checked_add(n))
        });
    Some(match total {
        Some(n) => Ok(if negative { -n } else { n }),
        None => Err(Error::overflow(format!("duration '{s}' exceeds the nanosecond range"))),
    })
}

/// Parse a duration (`[-][daysT]hh:mm[:ss][.fffffffff]`) or a standard period
/// (`1WT1H`) as a signed nanosecond count.
pub fn parse_nanos(s: &str) -> Result<i64> {
    if let Some(result) = scan_duration(s) {
        return result;
    }
    let period: Period = s
        .parse()
        .map_err(|_| Error::parse(format!("cannot parse time '{s}'")))?;
    period.to_standard_nanos()?.ok_or_else(|| {
        Error::parse(format!(
            "period '{s}' has years or months and no fixed length in nanoseconds"
        ))
    })
}

pub fn parse_nanos_quiet(s: &str) -> Option<i64> {
    parse_nanos(s).ok()
}

// ============================================================================
// Periods
// ============================================================================

pub fn parse_period(s: &str) -> Result<Period> {
    s.parse()
}

pub fn parse_period_quiet(s: &str) -> Option<Period> {
    s.parse().ok()
}

// ============================================================================
// Timestamps
// ============================================================================

/// `yyyy-MM-dd(Thh:mm(:ss)?(.f{1,9})?)? ZONE`.
fn parse_zoned_timestamp(s: &str) -> Result<Timestamp> {
    let invalid = || Error::parse(format!("cannot parse timestamp '{s}'"));

    let (body, zone_id) = s.split_once(' ').ok_or_else(invalid)?;
    if zone_id.is_empty() || !zone_id.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(invalid());
    }
    let zone: TimeZone = zone_id.parse()?;

    let mut cur = Cursor::new(body);
    let date = scan_iso_date(&mut cur).ok_or_else(invalid)?;
    let mut time = NaiveTime::MIN;
    let mut fraction = 0;
    if cur.eat(b'T') {
        let hour = cur.number(1, 2).ok_or_else(invalid)?;
        if !cur.eat(b':') {
            return Err(invalid());
        }
        let minute = cur.number(2, 2).ok_or_else(invalid)?;
        let second = if cur.eat(b':') {
            cur.number(2, 2).ok_or_else(invalid)?
        } else {
            0
        };
        if cur.eat(b'.') {
            fraction = parse_fraction_nanos(cur.digits(1, 9).ok_or_else(invalid)?)?;
        }
        time = NaiveTime::from_hms_opt(hour as u32, minute as u32, second as u32)
            .ok_or_else(invalid)?;
    }
    if !cur.done() {
        return Err(invalid());
    }

    let whole = zone.local_to_timestamp(&date.and_time(time))?;
    checked_plus(whole.nanos(), fraction).map(Timestamp::from_nanos_unchecked)
}

/// Parse an ISO-8601 instant (`2013-01-15T14:30:00Z`, numeric offsets allowed)
/// or a zoned local literal (`2013-01-15T09:30:00.000 NY`).
pub fn parse_timestamp(s: &str) -> Result<Timestamp> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        return zoned_to_timestamp(&instant);
    }
    parse_zoned_timestamp(s)
}

pub fn parse_timestamp_quiet(s: &str) -> Option<Timestamp> {
    parse_timestamp(s).ok()
}

// ============================================================================
// Dates
// ============================================================================

fn two_digit_year(part: &str) -> Option<i32> {
    let value: i32 = part.parse().ok()?;
    match part.len() {
        2 => Some(2000 + value),
        3 | 4 => Some(value),
        _ => None,
    }
}

fn scan_slash_date(s: &str, style: DateStyle) -> Option<NaiveDate> {
    let mut parts = s.split('/');
    let (p1, p2, p3) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    if !(all_digits(p1) && all_digits(p2) && all_digits(p3)) || p2.len() > 2 {
        return None;
    }
    let (year, month, day) = match style {
        DateStyle::MDY => (p3, p1, p2),
        DateStyle::DMY => (p3, p2, p1),
        DateStyle::YMD => (p1, p2, p3),
    };
    if month.len() > 2 || day.len() > 2 {
        return None;
    }
    NaiveDate::from_ymd_opt(two_digit_year(year)?, month.parse().ok()?, day.parse().ok()?)
}

/// Parse `yyyy-MM-dd`, `yyyyMMdd`, or a slash-separated date in `style`.
///
/// Two-digit years in slash dates fall in 2000 through 2099.
pub fn parse_date_quiet(s: &str, style: DateStyle) -> Option<NaiveDate> {
    let mut cur = Cursor::new(s);
    if let Some(date) = scan_iso_date(&mut cur) {
        return cur.done().then_some(date);
    }
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year = s[..4].parse().ok()?;
        let month = s[4..6].parse().ok()?;
        let day = s[6..].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    scan_slash_date(s, style)
}

pub fn parse_date(s: &str, style: DateStyle) -> Result<NaiveDate> {
    parse_date_quiet(s, style).ok_or_else(|| Error::parse(format!("cannot parse date '{s}'")))
}

// ============================================================================
// Local times
// ============================================================================

/// Parse `L` followed by `hh(:?mm)?(:?ss)?(.f{1,9})?`.
pub fn parse_local_time_quiet(s: &str) -> Option<NaiveTime> {
    let mut cur = Cursor::new(s.strip_prefix('L')?);
    let hour = cur.number(2, 2)?;
    cur.eat(b':');
    let minute = cur.number(2, 2).unwrap_or(0);
    cur.eat(b':');
    let second = cur.number(2, 2).unwrap_or(0);
    let nanos = if cur.eat(b'.') {
        parse_fraction_nanos(cur.digits(1, 9)?).ok()?
    } else {
        0
    };
    if !cur.done() {
        return None;
    }
    NaiveTime::from_hms_nano_opt(hour as u32, minute as u32, second as u32, nanos as u32)
}

pub fn parse_local_time(s: &str) -> Result<NaiveTime> {
    parse_local_time_quiet(s).ok_or_else(|| Error::parse(format!("cannot parse local time '{s}'")))
}

// ============================================================================
// Precision
// ============================================================================

/// Finest field present in a (possibly partial) date-time literal.
///
/// Accepts `(yyyy-MM-ddT?)?(h?h(:mm(:ss)?(.f{1,9})?)?)?( ZONE)?`. A bare date
/// reports [`TimePrecision::Day`].
pub fn parse_time_precision(s: &str) -> Option<TimePrecision> {
    let (body, zone) = match s.split_once(' ') {
        Some((body, zone)) => (body, Some(zone)),
        None => (s, None),
    };
    if let Some(zone) = zone {
        if zone.is_empty() || !zone.bytes().all(|b| b.is_ascii_alphabetic()) {
            return None;
        }
    }

    let mut cur = Cursor::new(body);
    let mut finest = None;
    let looks_like_date = body.len() >= 10 && body.as_bytes()[4] == b'-';
    if looks_like_date {
        cur.digits(4, 4)?;
        cur.eat(b'-').then_some(())?;
        cur.digits(2, 2)?;
        cur.eat(b'-').then_some(())?;
        cur.digits(2, 2)?;
        cur.eat(b'T');
        finest = Some(TimePrecision::Day);
    }
    if cur.digits(1, 2).is_some() {
        finest = Some(TimePrecision::Hour);
        if cur.eat(b':') {
            cur.digits(2, 2)?;
            finest = Some(TimePrecision::Minute);
            if cur.eat(b':') {
                cur.digits(2, 2)?;
                finest = Some(TimePrecision::Second);
            }
            if cur.eat(b'.') {
                cur.digits(1, 9)?;
                finest = Some(TimePrecision::SubSecond);
            }
        }
    }
    if !cur.done() {
        return None;
    }
    finest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::MILLI;

    #[test]
    fn fraction_is_fixed_width() {
        assert_eq!(parse_fraction_nanos("5").unwrap(), 500_000_000);
        assert_eq!(parse_fraction_nanos("000123").unwrap(), 123_000);
        assert_eq!(parse_fraction_nanos("1234567891234").unwrap(), 123_456_789);
        assert!(matches!(parse_fraction_nanos("12x"), Err(Error::Parse(_))));
    }

    #[test]
    fn durations() {
        assert_eq!(parse_nanos("01:30").unwrap(), 90 * MINUTE);
        assert_eq!(parse_nanos("1:00:05.5").unwrap(), HOUR + 5 * SECOND + 500 * MILLI);
        assert_eq!(parse_nanos("-2T03:00:00").unwrap(), -(2 * DAY + 3 * HOUR));
        assert_eq!(parse_nanos("1WT1H").unwrap(), 169 * HOUR);
        assert_eq!(parse_nanos("T1M").unwrap(), MINUTE);
        assert!(parse_nanos("1Y").is_err());
        assert!(parse_nanos("12").is_err());
        assert_eq!(parse_nanos_quiet("not a time"), None);
        assert!(matches!(
            parse_nanos("999999999999999999:00"),
            Err(Error::Overflow(_))
        ));
    }

    #[test]
    fn iso_instants() {
        let z = parse_timestamp("2013-01-15T14:30:00Z").unwrap();
        let offset = parse_timestamp("2013-01-15T09:30:00-05:00").unwrap();
        assert_eq!(z, offset);
        assert_eq!(z.nanos(), 1_358_260_200 * SECOND);
        let fine = parse_timestamp("2013-01-15T14:30:00.000000001Z").unwrap();
        assert_eq!(fine.nanos() - z.nanos(), 1);
    }

    #[test]
    fn zoned_literals() {
        let ny = parse_timestamp("2013-01-15T09:30:00.000 NY").unwrap();
        assert_eq!(ny.nanos(), 1_358_260_200 * SECOND);
        assert_eq!(parse_timestamp("2013-01-15T09:30 ny").unwrap(), ny);
        let nanos = parse_timestamp("2013-01-15T09:30:00.123456789 NY").unwrap();
        assert_eq!(nanos.nanos() - ny.nanos(), 123_456_789);
        let midnight = parse_timestamp("2013-01-15 UTC").unwrap();
        assert_eq!(midnight.nanos() % DAY, 0);

        assert!(parse_timestamp("2013-01-15T09:30:00").is_err());
        assert!(parse_timestamp("2013-01-15T09:30:00 XX").is_err());
        assert!(parse_timestamp("2013-03-10T02:30:00 NY").is_err());
        assert_eq!(parse_timestamp_quiet("2013-13-01T00:00 NY"), None);
    }

    #[test]
    fn ambiguous_local_time_takes_earliest() {
        let first = parse_timestamp("2013-11-03T01:30:00 NY").unwrap();
        let utc = parse_timestamp("2013-11-03T05:30:00Z").unwrap();
        assert_eq!(first, utc);
    }

    #[test]
    fn dates() {
        let expected = NaiveDate::from_ymd_opt(2013, 1, 15).unwrap();
        assert_eq!(parse_date("2013-01-15", DateStyle::MDY).unwrap(), expected);
        assert_eq!(parse_date("20130115", DateStyle::MDY).unwrap(), expected);
        assert_eq!(parse_date("1/15/2013", DateStyle::MDY).unwrap(), expected);
        assert_eq!(parse_date("15/01/13", DateStyle::DMY).unwrap(), expected);
        assert_eq!(parse_date("2013/1/15", DateStyle::YMD).unwrap(), expected);
        assert_eq!(parse_date("13/1/15", DateStyle::YMD).unwrap(), expected);
        assert!(parse_date("1/15/2013", DateStyle::DMY).is_err());
        assert!(parse_date("2013-02-30", DateStyle::MDY).is_err());
        assert_eq!(parse_date_quiet("2013-01-15T00:00 NY", DateStyle::MDY), None);
    }

    #[test]
    fn local_times() {
        let t = NaiveTime::from_hms_nano_opt(9, 30, 5, 120_000_000).unwrap();
        assert_eq!(parse_local_time("L09:30:05.12").unwrap(), t);
        assert_eq!(parse_local_time("L093005.12").unwrap(), t);
        assert_eq!(
            parse_local_time("L09").unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
        assert!(parse_local_time("09:30").is_err());
        assert!(parse_local_time("L25:00").is_err());
    }

    #[test]
    fn precision_reports_finest_field() {
        assert_eq!(parse_time_precision("2013-01-15"), Some(TimePrecision::Day));
        assert_eq!(parse_time_precision("2013-01-15T10"), Some(TimePrecision::Hour));
        assert_eq!(parse_time_precision("10:00"), Some(TimePrecision::Minute));
        assert_eq!(parse_time_precision("10:00:00"), Some(TimePrecision::Second));
        assert_eq!(
            parse_time_precision("2013-01-15T10:00:00.5 NY"),
            Some(TimePrecision::SubSecond)
        );
        assert_eq!(parse_time_precision(""), None);
        assert_eq!(parse_time_precision("abc"), None);
    }
}
