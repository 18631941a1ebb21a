//! Overflow-checked timestamp arithmetic.
//!
//! Every function here follows the same null law: a `None` timestamp (or a
//! raw nanos operand equal to [`NULL_NANOS`]) yields `Ok(None)`, and a boolean
//! comparison involving `None` is `false`. Results that would leave the
//! representable range, including landing on the sentinel, fail with
//! [`Error::Overflow`].

use std::cmp::Ordering;

use crate::time::timestamp::{Timestamp, MAX_NANOS, MIN_NANOS, NULL_NANOS};
use crate::time::{DAY, MICRO, MILLI, MINUTE, SECOND, YEAR_365};
use crate::{Error, Result};

// ============================================================================
// Raw checks
// ============================================================================

/// `l1 + l2` over the valid nanosecond range.
///
/// Only operands of equal sign can leave the range, so the bound is checked
/// before the sum is formed.
pub(crate) fn checked_plus(l1: i64, l2: i64) -> Result<i64> {
    if l1 > 0 && l2 > 0 && MAX_NANOS - l1 < l2 {
        return Err(Error::overflow(format!(
            "Adding {l2} nanos to {l1} would overflow"
        )));
    }
    if l1 < 0 && l2 < 0 && MIN_NANOS - l1 > l2 {
        return Err(Error::overflow(format!(
            "Adding {l2} nanos to {l1} would underflow"
        )));
    }
    Ok(l1 + l2)
}

/// `l1 - l2`, expressed as `l1 + (-l2)`.
pub(crate) fn checked_minus(l1: i64, l2: i64) -> Result<i64> {
    let negated = match l2.checked_neg() {
        Some(n) => n,
        None => {
            // -i64::MIN is unrepresentable; only negative l1 keeps the result in range.
            return match l1.checked_sub(l2) {
                Some(v) if v != NULL_NANOS => Ok(v),
                _ => Err(Error::overflow(format!(
                    "Subtracting {l2} nanos from {l1} would overflow"
                ))),
            };
        }
    };
    checked_plus(l1, negated).map_err(|_| {
        let direction = if l2 > 0 { "underflow" } else { "overflow" };
        Error::overflow(format!(
            "Subtracting {l2} nanos from {l1} would {direction}"
        ))
    })
}

// ============================================================================
// Nullable arithmetic
// ============================================================================

/// `t + nanos`.
pub fn plus(t: Option<Timestamp>, nanos: i64) -> Result<Option<Timestamp>> {
    match t {
        Some(t) if nanos != NULL_NANOS => t.checked_add_nanos(nanos).map(Some),
        _ => Ok(None),
    }
}

/// `t - nanos`.
pub fn minus(t: Option<Timestamp>, nanos: i64) -> Result<Option<Timestamp>> {
    match t {
        Some(t) if nanos != NULL_NANOS => t.checked_sub_nanos(nanos).map(Some),
        _ => Ok(None),
    }
}

/// `t1 - t2` in nanoseconds.
pub fn minus_timestamps(t1: Option<Timestamp>, t2: Option<Timestamp>) -> Result<Option<i64>> {
    match (t1, t2) {
        (Some(a), Some(b)) => a.checked_duration_since(b).map(Some),
        _ => Ok(None),
    }
}

/// Nanoseconds from `start` to `end`.
pub fn diff_nanos(start: Option<Timestamp>, end: Option<Timestamp>) -> Result<Option<i64>> {
    minus_timestamps(end, start)
}

pub fn diff_micros(start: Option<Timestamp>, end: Option<Timestamp>) -> Result<Option<i64>> {
    Ok(diff_nanos(start, end)?.map(|n| n / MICRO))
}

pub fn diff_millis(start: Option<Timestamp>, end: Option<Timestamp>) -> Result<Option<i64>> {
    Ok(diff_nanos(start, end)?.map(|n| n / MILLI))
}

pub fn diff_seconds(start: Option<Timestamp>, end: Option<Timestamp>) -> Result<Option<f64>> {
    Ok(diff_nanos(start, end)?.map(|n| n as f64 / SECOND as f64))
}

pub fn diff_minutes(start: Option<Timestamp>, end: Option<Timestamp>) -> Result<Option<f64>> {
    Ok(diff_nanos(start, end)?.map(|n| n as f64 / MINUTE as f64))
}

pub fn diff_days(start: Option<Timestamp>, end: Option<Timestamp>) -> Result<Option<f64>> {
    Ok(diff_nanos(start, end)?.map(|n| n as f64 / DAY as f64))
}

/// Difference in 365-day years.
pub fn diff_years(start: Option<Timestamp>, end: Option<Timestamp>) -> Result<Option<f64>> {
    Ok(diff_nanos(start, end)?.map(|n| n as f64 * (1.0 / YEAR_365 as f64)))
}

// ============================================================================
// Comparisons
// ============================================================================

/// Total order on nullable timestamps, null first (matches raw `i64` order).
pub fn compare(t1: Option<Timestamp>, t2: Option<Timestamp>) -> Ordering {
    t1.cmp(&t2)
}

pub fn is_before(t1: Option<Timestamp>, t2: Option<Timestamp>) -> bool {
    matches!((t1, t2), (Some(a), Some(b)) if a < b)
}

pub fn is_before_or_equal(t1: Option<Timestamp>, t2: Option<Timestamp>) -> bool {
    matches!((t1, t2), (Some(a), Some(b)) if a <= b)
}

pub fn is_after(t1: Option<Timestamp>, t2: Option<Timestamp>) -> bool {
    matches!((t1, t2), (Some(a), Some(b)) if a > b)
}

pub fn is_after_or_equal(t1: Option<Timestamp>, t2: Option<Timestamp>) -> bool {
    matches!((t1, t2), (Some(a), Some(b)) if a >= b)
}

// ============================================================================
// Binning
// ============================================================================

fn check_interval(interval: i64) -> Result<()> {
    if interval <= 0 {
        return Err(Error::InvalidArgument(format!(
            "bin interval must be positive, got {interval}"
        )));
    }
    Ok(())
}

fn lower_bin_raw(value: i64, interval: i64) -> Result<i64> {
    value
        .div_euclid(interval)
        .checked_mul(interval)
        .filter(|v| *v != NULL_NANOS)
        .ok_or_else(|| {
            Error::overflow(format!("Lower bin of {value} by {interval} would overflow"))
        })
}

fn upper_bin_raw(value: i64, interval: i64) -> Result<i64> {
    let lower = lower_bin_raw(value, interval)?;
    if lower == value {
        return Ok(value);
    }
    checked_plus(lower, interval)
}

fn with_offset(
    t: Option<Timestamp>,
    interval: i64,
    offset: i64,
    bin: fn(i64, i64) -> Result<i64>,
) -> Result<Option<Timestamp>> {
    let Some(t) = t else { return Ok(None) };
    if interval == NULL_NANOS || offset == NULL_NANOS {
        return Ok(None);
    }
    check_interval(interval)?;
    let shifted = checked_minus(t.nanos(), offset)?;
    let binned = checked_plus(bin(shifted, interval)?, offset)?;
    Ok(Timestamp::from_nanos(binned))
}

/// Start of the `interval`-wide bin containing `t`.
pub fn lower_bin(t: Option<Timestamp>, interval: i64) -> Result<Option<Timestamp>> {
    with_offset(t, interval, 0, lower_bin_raw)
}

/// Like [`lower_bin`], with bins aligned to `offset` instead of the epoch.
pub fn lower_bin_with_offset(
    t: Option<Timestamp>,
    interval: i64,
    offset: i64,
) -> Result<Option<Timestamp>> {
    with_offset(t, interval, offset, lower_bin_raw)
}

/// End of the `interval`-wide bin containing `t`; `t` itself when aligned.
pub fn upper_bin(t: Option<Timestamp>, interval: i64) -> Result<Option<Timestamp>> {
    with_offset(t, interval, 0, upper_bin_raw)
}

pub fn upper_bin_with_offset(
    t: Option<Timestamp>,
    interval: i64,
    offset: i64,
) -> Result<Option<Timestamp>> {
    with_offset(t, interval, offset, upper_bin_raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(n: i64) -> Option<Timestamp> {
        Timestamp::from_nanos(n)
    }

    #[test]
    fn plus_detects_overflow() {
        let err = plus(ts(i64::MAX - 5), 10).unwrap_err();
        assert!(matches!(err, Error::Overflow(_)));
        assert_eq!(plus(ts(i64::MAX - 5), 5).unwrap(), ts(i64::MAX));
    }

    #[test]
    fn plus_never_produces_sentinel() {
        assert!(plus(ts(MIN_NANOS), -1).is_err());
        assert!(minus(ts(MIN_NANOS), 1).is_err());
        assert_eq!(minus(ts(MIN_NANOS + 1), 1).unwrap(), ts(MIN_NANOS));
    }

    #[test]
    fn minus_detects_underflow_with_mixed_signs() {
        assert!(minus(ts(-10), i64::MAX).is_err());
        assert!(minus(ts(10), -i64::MAX).is_err());
        assert!(minus(ts(-1), i64::MAX).is_err());
        assert_eq!(minus(ts(0), i64::MAX).unwrap(), ts(MIN_NANOS));
    }

    #[test]
    fn minus_timestamps_handles_extremes() {
        assert!(minus_timestamps(ts(MAX_NANOS), ts(-1)).is_err());
        assert_eq!(minus_timestamps(ts(0), ts(MAX_NANOS)).unwrap(), Some(MIN_NANOS));
        assert_eq!(diff_nanos(ts(100), ts(350)).unwrap(), Some(250));
    }

    #[test]
    fn null_propagates() {
        assert_eq!(plus(None, 5).unwrap(), None);
        assert_eq!(plus(ts(5), NULL_NANOS).unwrap(), None);
        assert_eq!(minus(ts(5), NULL_NANOS).unwrap(), None);
        assert_eq!(minus_timestamps(ts(5), None).unwrap(), None);
        assert_eq!(diff_seconds(None, ts(1)).unwrap(), None);
        assert_eq!(lower_bin(None, 10).unwrap(), None);
        assert_eq!(upper_bin(ts(3), NULL_NANOS).unwrap(), None);
    }

    #[test]
    fn comparisons_with_null_are_false() {
        for x in [ts(0), ts(-7), ts(MAX_NANOS), None] {
            assert!(!is_before(None, x));
            assert!(!is_before(x, None));
            assert!(!is_after(None, x));
            assert!(!is_before_or_equal(x, None));
            assert!(!is_after_or_equal(None, x));
        }
        assert!(is_before(ts(1), ts(2)));
        assert!(is_before_or_equal(ts(2), ts(2)));
        assert!(is_after(ts(3), ts(2)));
        assert!(is_after_or_equal(ts(2), ts(2)));
    }

    #[test]
    fn compare_orders_null_first() {
        assert_eq!(compare(None, ts(MIN_NANOS)), Ordering::Less);
        assert_eq!(compare(ts(4), ts(4)), Ordering::Equal);
    }

    #[test]
    fn bins_bracket_value() {
        let n = 15 * MINUTE;
        for raw in [0, 1, -1, 7 * MINUTE, 15 * MINUTE, -16 * MINUTE, 1_358_260_212_345_678_901] {
            let t = ts(raw).unwrap();
            let lo = lower_bin(Some(t), n).unwrap().unwrap().nanos();
            let hi = upper_bin(Some(t), n).unwrap().unwrap().nanos();
            assert!(lo <= raw && raw < lo + n, "lower bin of {raw}");
            assert!(hi - n < raw && raw <= hi, "upper bin of {raw}");
        }
    }

    #[test]
    fn bins_respect_offset() {
        let t = ts(17).unwrap();
        assert_eq!(lower_bin_with_offset(Some(t), 10, 3).unwrap(), ts(13));
        assert_eq!(upper_bin_with_offset(Some(t), 10, 3).unwrap(), ts(23));
    }

    #[test]
    fn bins_reject_bad_interval_and_overflow() {
        assert!(matches!(lower_bin(ts(1), 0), Err(Error::InvalidArgument(_))));
        assert!(upper_bin(ts(MAX_NANOS), 10).is_err());
        assert!(lower_bin(ts(MIN_NANOS), 3).is_err());
    }

    #[test]
    fn diff_units() {
        let start = ts(0);
        let end = ts(3 * DAY + 1_500);
        assert_eq!(diff_micros(start, end).unwrap(), Some(3 * DAY / MICRO + 1));
        assert_eq!(diff_millis(start, end).unwrap(), Some(3 * DAY / MILLI));
        assert_eq!(diff_days(start, ts(3 * DAY)).unwrap(), Some(3.0));
        assert_eq!(diff_minutes(start, ts(90 * SECOND)).unwrap(), Some(1.5));
        let years = diff_years(start, ts(YEAR_365)).unwrap().unwrap();
        assert!((years - 1.0).abs() < 1e-12);
    }
}
