//! Rendering for timestamps, dates, local times and durations.

use std::fmt::Write as _;

use chrono::Timelike;

use crate::time::timestamp::Timestamp;
use crate::time::zone::TimeZone;
use crate::time::{DAY, HOUR, MINUTE, SECOND};

/// `yyyy-MM-ddTHH:mm:ss.SSS[nnnnnn] ZONE`.
///
/// The six sub-millisecond digits are written only when non-zero, so a
/// millisecond-precision literal formats back to exactly what was parsed.
pub fn format_timestamp(t: Timestamp, zone: TimeZone) -> String {
    let local = zone.to_local(t);
    let sub_second = local.nanosecond() % 1_000_000_000;
    let millis = sub_second / 1_000_000;
    let below_millis = sub_second % 1_000_000;

    let mut out = String::with_capacity(36);
    let _ = write!(out, "{}.{millis:03}", local.format("%Y-%m-%dT%H:%M:%S"));
    if below_millis != 0 {
        let _ = write!(out, "{below_millis:06}");
    }
    out.push(' ');
    out.push_str(zone.id());
    out
}

/// Nullable form of [`format_timestamp`].
pub fn format_timestamp_opt(t: Option<Timestamp>, zone: TimeZone) -> Option<String> {
    t.map(|t| format_timestamp(t, zone))
}

/// Local calendar date of `t` as `yyyy-MM-dd`.
pub fn format_date(t: Timestamp, zone: TimeZone) -> String {
    zone.to_local(t).format("%Y-%m-%d").to_string()
}

/// `[-][daysT]h:mm:ss[.fffffffff]`.
pub fn format_nanos(nanos: i64) -> String {
    let mut out = String::with_capacity(25);
    if nanos < 0 {
        out.push('-');
    }
    let mut rest = nanos.unsigned_abs();

    let days = rest / DAY as u64;
    rest %= DAY as u64;
    let hours = rest / HOUR as u64;
    rest %= HOUR as u64;
    let minutes = rest / MINUTE as u64;
    rest %= MINUTE as u64;
    let seconds = rest / SECOND as u64;
    rest %= SECOND as u64;

    if days != 0 {
        let _ = write!(out, "{days}T");
    }
    let _ = write!(out, "{hours}:{minutes:02}:{seconds:02}");
    if rest != 0 {
        let _ = write!(out, ".{rest:09}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse::{parse_nanos, parse_timestamp};

    #[test]
    fn millisecond_literals_round_trip_exactly() {
        for literal in [
            "2013-01-15T09:30:00.000 NY",
            "2013-07-04T23:59:59.999 LON",
            "1969-12-31T23:59:59.123 UTC",
            "2013-01-15T09:30:00.000123 JP",
        ] {
            let zone_id = literal.rsplit(' ').next().expect("zone");
            let zone = TimeZone::from_id(zone_id).expect("known zone");
            let t = parse_timestamp(literal).expect("parses");
            assert_eq!(format_timestamp(t, zone), literal);
        }
    }

    #[test]
    fn formats_in_other_zones() {
        let t = parse_timestamp("2013-01-15T09:30:00.000 NY").unwrap();
        assert_eq!(format_timestamp(t, TimeZone::UTC), "2013-01-15T14:30:00.000 UTC");
        assert_eq!(format_date(t, TimeZone::JP), "2013-01-15");
        assert_eq!(format_timestamp_opt(None, TimeZone::UTC), None);
    }

    #[test]
    fn durations() {
        assert_eq!(format_nanos(0), "0:00:00");
        assert_eq!(format_nanos(90 * MINUTE), "1:30:00");
        assert_eq!(format_nanos(-(2 * DAY + 3 * HOUR + 5)), "-2T3:00:00.000000005");
        let s = "3T4:05:06.700000000";
        assert_eq!(format_nanos(parse_nanos(s).unwrap()), s);
        assert!(format_nanos(i64::MIN).starts_with('-'));
    }
}
