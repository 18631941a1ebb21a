//! Calendar periods: `-?(nY)?(nM)?(nW)?(nD)?(T(nH)?(nM)?(nS)?)?`.
//!
//! A period is kept as unsigned field magnitudes plus one sign. Date fields
//! (years, months, weeks, days) move the local calendar date in a zone; time
//! fields (hours, minutes, seconds) are exact durations.
//!
//! # Precision
//!
//! Shifting an instant by a period happens in two parts. Calendar math runs at
//! millisecond granularity on the instant truncated toward zero; the
//! sub-millisecond remainder (`nanos % 1_000_000`) is added back afterwards.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Months, NaiveDateTime, Offset, TimeZone as _};
use chrono_tz::Tz;

use crate::time::arith::checked_plus;
use crate::time::timestamp::Timestamp;
use crate::time::zone::{zoned_to_timestamp, TimeZone};
use crate::time::{DAY, HOUR, MINUTE, SECOND, WEEK};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Period {
    pub negative: bool,
    pub years: i64,
    pub months: i64,
    pub weeks: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Period {
    pub fn is_zero(&self) -> bool {
        self.date_fields_zero() && self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }

    fn date_fields_zero(&self) -> bool {
        self.years == 0 && self.months == 0 && self.weeks == 0 && self.days == 0
    }

    /// Years or months present: the period has no fixed length.
    pub fn has_calendar_fields(&self) -> bool {
        self.years != 0 || self.months != 0
    }

    pub fn negated(&self) -> Period {
        Period {
            negative: !self.negative,
            ..*self
        }
    }

    /// Length in nanoseconds treating a week as 7 days and a day as 24 hours.
    ///
    /// `Ok(None)` when the period carries years or months.
    pub fn to_standard_nanos(&self) -> Result<Option<i64>> {
        if self.has_calendar_fields() {
            return Ok(None);
        }
        let total = [
            (self.weeks, WEEK),
            (self.days, DAY),
            (self.hours, HOUR),
            (self.minutes, MINUTE),
            (self.seconds, SECOND),
        ]
        .iter()
        .try_fold(0_i64, |acc, &(count, unit)| {
            count.checked_mul(unit).and_then(|n| acc.checked_add(n))
        })
        .ok_or_else(|| Error::overflow(format!("period {self} exceeds the nanosecond range")))?;
        Ok(Some(if self.negative { -total } else { total }))
    }

    /// Signed length of the hour/minute/second fields.
    fn time_nanos(&self) -> Result<i64> {
        let total = [(self.hours, HOUR), (self.minutes, MINUTE), (self.seconds, SECOND)]
            .iter()
            .try_fold(0_i64, |acc, &(count, unit)| {
                count.checked_mul(unit).and_then(|n| acc.checked_add(n))
            })
            .ok_or_else(|| Error::overflow(format!("period {self} exceeds the nanosecond range")))?;
        Ok(if self.negative { -total } else { total })
    }
}

// ============================================================================
// Grammar
// ============================================================================

/// Parse `<digits><unit>` pairs whose units appear in `units` order, each at most once.
fn scan_fields<const N: usize>(part: &str, units: [char; N]) -> Option<[Option<i64>; N]> {
    let mut out = [None; N];
    let mut next = 0;
    let mut rest = part;
    while !rest.is_empty() {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        let value: i64 = rest[..digits].parse().ok()?;
        let unit = rest[digits..].chars().next()?.to_ascii_uppercase();
        let slot = next + units[next..].iter().position(|&u| u == unit)?;
        out[slot] = Some(value);
        next = slot + 1;
        rest = &rest[digits + 1..];
    }
    Some(out)
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::parse(format!("cannot parse period '{s}'"));

        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (date_part, time_part) = match body.split_once('T') {
            Some((date, time)) => {
                if time.is_empty() {
                    return Err(invalid());
                }
                (date, time)
            }
            None => (body, ""),
        };

        let [years, months, weeks, days] =
            scan_fields(date_part, ['Y', 'M', 'W', 'D']).ok_or_else(invalid)?;
        let [hours, minutes, seconds] =
            scan_fields(time_part, ['H', 'M', 'S']).ok_or_else(invalid)?;

        let fields = [years, months, weeks, days, hours, minutes, seconds];
        if fields.iter().all(Option::is_none) {
            return Err(invalid());
        }

        Ok(Period {
            negative,
            years: years.unwrap_or(0),
            months: months.unwrap_or(0),
            weeks: weeks.unwrap_or(0),
            days: days.unwrap_or(0),
            hours: hours.unwrap_or(0),
            minutes: minutes.unwrap_or(0),
            seconds: seconds.unwrap_or(0),
        })
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0D");
        }
        if self.negative {
            f.write_str("-")?;
        }
        for (value, unit) in [
            (self.years, 'Y'),
            (self.months, 'M'),
            (self.weeks, 'W'),
            (self.days, 'D'),
        ] {
            if value != 0 {
                write!(f, "{value}{unit}")?;
            }
        }
        if self.hours != 0 || self.minutes != 0 || self.seconds != 0 {
            f.write_str("T")?;
            for (value, unit) in [(self.hours, 'H'), (self.minutes, 'M'), (self.seconds, 'S')] {
                if value != 0 {
                    write!(f, "{value}{unit}")?;
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

fn out_of_range(what: &str) -> Error {
    Error::overflow(format!("{what} is outside the supported calendar range"))
}

/// Move the local date-time by whole months and days.
fn shift_local(local: NaiveDateTime, months: i64, days: i64, back: bool) -> Result<NaiveDateTime> {
    let months = u32::try_from(months).map_err(|_| out_of_range("month shift"))?;
    let days = u64::try_from(days).map_err(|_| out_of_range("day shift"))?;
    let shifted = if back {
        local
            .checked_sub_months(Months::new(months))
            .and_then(|d| d.checked_sub_days(Days::new(days)))
    } else {
        local
            .checked_add_months(Months::new(months))
            .and_then(|d| d.checked_add_days(Days::new(days)))
    };
    shifted.ok_or_else(|| out_of_range("shifted date"))
}

fn apply_date_fields(zoned: DateTime<Tz>, period: &Period, zone: TimeZone) -> Result<Timestamp> {
    let months = period
        .years
        .checked_mul(12)
        .and_then(|m| m.checked_add(period.months))
        .ok_or_else(|| out_of_range("month shift"))?;
    let days = period
        .weeks
        .checked_mul(7)
        .and_then(|d| d.checked_add(period.days))
        .ok_or_else(|| out_of_range("day shift"))?;

    let local = shift_local(zoned.naive_local(), months, days, period.negative)?;
    match zone.resolve_local(&local) {
        Some(resolved) => zoned_to_timestamp(&resolved),
        None => {
            // Landed in a gap: keep the offset in force before the shift.
            let offset = zoned.offset().fix();
            let resolved = offset
                .from_local_datetime(&local)
                .single()
                .ok_or_else(|| out_of_range("shifted date"))?;
            zoned_to_timestamp(&resolved)
        }
    }
}

/// Shift `t` forward by `period` with calendar math in `zone`.
pub fn plus_period(
    t: Option<Timestamp>,
    period: &Period,
    zone: TimeZone,
) -> Result<Option<Timestamp>> {
    let Some(t) = t else {
        return Ok(None);
    };
    let remainder = t.nanos_partial();
    let whole_millis = Timestamp::from_nanos_unchecked(t.nanos() - remainder);

    let base = if period.date_fields_zero() {
        whole_millis
    } else {
        apply_date_fields(zone.to_zoned(whole_millis), period, zone)?
    };

    let moved = checked_plus(base.nanos(), period.time_nanos()?)?;
    let result = checked_plus(moved, remainder)?;
    Ok(Some(Timestamp::from_nanos_unchecked(result)))
}

/// Shift `t` backward by `period` with calendar math in `zone`.
pub fn minus_period(
    t: Option<Timestamp>,
    period: &Period,
    zone: TimeZone,
) -> Result<Option<Timestamp>> {
    plus_period(t, &period.negated(), zone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse::parse_timestamp;
    use crate::time::MILLI;

    fn p(s: &str) -> Period {
        s.parse().expect("valid period")
    }

    #[test]
    fn parses_fields_in_order() {
        let period = p("1Y2M3W4DT5H6M7S");
        assert_eq!(
            (period.years, period.months, period.weeks, period.days),
            (1, 2, 3, 4)
        );
        assert_eq!((period.hours, period.minutes, period.seconds), (5, 6, 7));
        assert!(!period.negative);

        let minutes = p("-T30m");
        assert!(minutes.negative);
        assert_eq!(minutes.minutes, 30);
        assert_eq!(minutes.months, 0);
    }

    #[test]
    fn rejects_malformed_periods() {
        for bad in ["", "-", "T", "1YT", "1D1Y", "1Q", "1W1W", "Y", "1.5D", "1H"] {
            assert!(bad.parse::<Period>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn week_plus_hour_is_169_hours() {
        assert_eq!(p("1WT1H").to_standard_nanos().unwrap(), Some(169 * HOUR));
        assert_eq!(p("-1D").to_standard_nanos().unwrap(), Some(-DAY));
        assert_eq!(p("1M").to_standard_nanos().unwrap(), None);
        assert!(p("9999999999W").to_standard_nanos().is_err());
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(p("1wt1h").to_string(), "1WT1H");
        assert_eq!(p("-2Y0M").to_string(), "-2Y");
        assert_eq!(p("0D").to_string(), "0D");
    }

    #[test]
    fn day_follows_the_local_calendar_across_dst() {
        let before = parse_timestamp("2013-03-09T12:00:00 NY").unwrap();
        let next = plus_period(Some(before), &p("1D"), TimeZone::NY).unwrap().unwrap();
        assert_eq!(next.nanos() - before.nanos(), 23 * HOUR);

        let exact = plus_period(Some(before), &p("T24H"), TimeZone::NY).unwrap().unwrap();
        assert_eq!(exact.nanos() - before.nanos(), 24 * HOUR);
    }

    #[test]
    fn sub_millisecond_remainder_is_preserved() {
        let t = Timestamp::from_nanos(1_358_260_200_000 * MILLI + 123_456).unwrap();
        let shifted = plus_period(Some(t), &p("1M"), TimeZone::UTC).unwrap().unwrap();
        assert_eq!(shifted.nanos_partial(), 123_456);
        let back = minus_period(Some(shifted), &p("1M"), TimeZone::UTC).unwrap().unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn month_end_clamps() {
        let jan31 = parse_timestamp("2013-01-31T00:00:00 UTC").unwrap();
        let feb = plus_period(Some(jan31), &p("1M"), TimeZone::UTC).unwrap().unwrap();
        assert_eq!(feb, parse_timestamp("2013-02-28T00:00:00 UTC").unwrap());
    }

    #[test]
    fn null_and_overflow() {
        assert_eq!(plus_period(None, &p("1D"), TimeZone::UTC).unwrap(), None);
        let near_max = Timestamp::from_nanos(i64::MAX - 5).unwrap();
        assert!(matches!(
            plus_period(Some(near_max), &p("T1S"), TimeZone::UTC),
            Err(Error::Overflow(_))
        ));
    }
}
