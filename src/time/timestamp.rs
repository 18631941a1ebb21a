//! The nanosecond timestamp value.
//!
//! A [`Timestamp`] is a count of nanoseconds since the UNIX epoch stored in an
//! `i64`. The minimum `i64` is reserved as the null sentinel ([`NULL_NANOS`])
//! and can never be held by a `Timestamp`; nullable values are modelled as
//! `Option<Timestamp>` and only collapse to the sentinel at the raw boundary.

use std::fmt;

use crate::time::clock::Clock;
use crate::{Error, Result};

/// Raw sentinel meaning "no value".
pub const NULL_NANOS: i64 = i64::MIN;

/// Smallest nanosecond count a timestamp may hold.
pub const MIN_NANOS: i64 = i64::MIN + 1;

/// Largest nanosecond count a timestamp may hold.
pub const MAX_NANOS: i64 = i64::MAX;

/// Nanoseconds since the UNIX epoch. Never equal to [`NULL_NANOS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The epoch itself.
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Wrap a raw nanosecond count. The sentinel maps to `None`.
    #[inline]
    pub const fn from_nanos(nanos: i64) -> Option<Timestamp> {
        if nanos == NULL_NANOS {
            None
        } else {
            Some(Timestamp(nanos))
        }
    }

    /// Wrap a raw nanosecond count, failing on the sentinel.
    pub fn try_from_nanos(nanos: i64) -> Result<Timestamp> {
        Timestamp::from_nanos(nanos)
            .ok_or_else(|| Error::overflow("nanosecond value is the null sentinel"))
    }

    /// Read the current time from `clock`.
    pub fn now(clock: &dyn Clock) -> Timestamp {
        // A clock reporting the sentinel is clamped to the smallest valid value.
        Timestamp(clock.current_time_nanos().max(MIN_NANOS))
    }

    #[inline]
    pub const fn nanos(self) -> i64 {
        self.0
    }

    pub const fn micros(self) -> i64 {
        self.0 / 1_000
    }

    pub const fn millis(self) -> i64 {
        self.0 / 1_000_000
    }

    pub const fn seconds(self) -> i64 {
        self.0 / 1_000_000_000
    }

    /// Nanoseconds below the millisecond (`nanos % 1_000_000`, sign of `nanos`).
    pub const fn nanos_partial(self) -> i64 {
        self.0 % 1_000_000
    }

    /// Add a nanosecond delta, failing instead of wrapping.
    pub fn checked_add_nanos(self, nanos: i64) -> Result<Timestamp> {
        crate::time::arith::checked_plus(self.0, nanos).map(Timestamp)
    }

    /// Subtract a nanosecond delta, failing instead of wrapping.
    pub fn checked_sub_nanos(self, nanos: i64) -> Result<Timestamp> {
        crate::time::arith::checked_minus(self.0, nanos).map(Timestamp)
    }

    /// Signed distance `self - other` in nanoseconds.
    pub fn checked_duration_since(self, other: Timestamp) -> Result<i64> {
        crate::time::arith::checked_minus(self.0, other.0)
    }

    pub(crate) const fn from_nanos_unchecked(nanos: i64) -> Timestamp {
        debug_assert!(nanos != NULL_NANOS);
        Timestamp(nanos)
    }
}

/// Collapse a nullable timestamp to its raw representation.
#[inline]
pub fn nanos_or_null(value: Option<Timestamp>) -> i64 {
    match value {
        Some(ts) => ts.0,
        None => NULL_NANOS,
    }
}

impl TryFrom<i64> for Timestamp {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Timestamp::try_from_nanos(value)
    }
}

impl From<Timestamp> for i64 {
    fn from(value: Timestamp) -> Self {
        value.0
    }
}

impl fmt::Display for Timestamp {
    /// ISO-8601 in UTC with nanosecond precision, e.g. `2013-01-15T14:30:00.000000000Z`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.div_euclid(1_000_000_000);
        let sub = self.0.rem_euclid(1_000_000_000) as u32;
        match chrono::DateTime::from_timestamp(secs, sub) {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.9fZ")),
            None => write!(f, "{}ns", self.0),
        }
    }
}
