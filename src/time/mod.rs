//! Nanosecond timestamps: values, arithmetic, conversion, literals and clocks.
//!
//! # Design
//!
//! Every instant is an `i64` count of nanoseconds since the UNIX epoch. The
//! raw sentinel `i64::MIN` never appears inside this module's typed API:
//! nullable inputs are `Option<Timestamp>` and every operation follows the
//! null law (arithmetic on `None` yields `None`, comparisons with `None` are
//! `false`). Overflow is always reported as [`crate::Error::Overflow`].

pub mod arith;
pub mod calendar;
pub mod clock;
pub mod convert;
pub mod format;
pub mod literal;
pub mod parse;
pub mod period;
pub mod timestamp;
pub mod zone;

pub use arith::{
    compare, is_after, is_after_or_equal, is_before, is_before_or_equal, lower_bin,
    lower_bin_with_offset, minus, minus_timestamps, plus, upper_bin, upper_bin_with_offset,
};
pub use clock::{Clock, ClockContext, ControlledClock, QuantaClock, SystemClock};
pub use convert::{EpochUnit, MICROTIME_THRESHOLD};
pub use literal::{detect_literal, TimeLiteral};
pub use parse::{DateStyle, TimePrecision};
pub use period::Period;
pub use timestamp::{nanos_or_null, Timestamp, MAX_NANOS, MIN_NANOS, NULL_NANOS};
pub use zone::TimeZone;

/// Nanoseconds per microsecond.
pub const MICRO: i64 = 1_000;
/// Nanoseconds per millisecond.
pub const MILLI: i64 = 1_000_000;
/// Nanoseconds per second.
pub const SECOND: i64 = 1_000_000_000;
/// Nanoseconds per minute.
pub const MINUTE: i64 = 60 * SECOND;
/// Nanoseconds per hour.
pub const HOUR: i64 = 60 * MINUTE;
/// Nanoseconds per day.
pub const DAY: i64 = 24 * HOUR;
/// Nanoseconds per week.
pub const WEEK: i64 = 7 * DAY;
/// Nanoseconds per 365-day year.
pub const YEAR_365: i64 = 365 * DAY;
