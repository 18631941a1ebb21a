//! Epoch unit conversion.
//!
//! Widening conversions (seconds/millis/micros to nanos) are guarded by a
//! per-unit magnitude threshold `floor(i64::MAX / scale)`; narrowing
//! conversions truncate toward zero. The raw sentinel passes through every
//! conversion untouched.

use crate::time::timestamp::{Timestamp, NULL_NANOS};
use crate::time::{MICRO, MILLI, SECOND};
use crate::{Error, Result};

/// Largest magnitude of micros that converts to nanos without overflow.
pub const MAX_CONVERTIBLE_MICROS: i64 = i64::MAX / MICRO;

/// Largest magnitude of millis that converts to nanos without overflow.
pub const MAX_CONVERTIBLE_MILLIS: i64 = i64::MAX / MILLI;

/// Largest magnitude of seconds that converts to nanos without overflow.
pub const MAX_CONVERTIBLE_SECONDS: i64 = i64::MAX / SECOND;

/// Magnitude above which an epoch offset of unknown unit is taken as micros.
///
/// Millis start above `MICROTIME_THRESHOLD / 1000`, nanos above
/// `MICROTIME_THRESHOLD * 1000`.
pub const MICROTIME_THRESHOLD: i64 = 10_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochUnit {
    Seconds,
    Millis,
    Micros,
    Nanos,
}

impl EpochUnit {
    /// Nanoseconds per unit.
    pub const fn scale(self) -> i64 {
        match self {
            EpochUnit::Seconds => SECOND,
            EpochUnit::Millis => MILLI,
            EpochUnit::Micros => MICRO,
            EpochUnit::Nanos => 1,
        }
    }

    const fn max_convertible(self) -> i64 {
        i64::MAX / self.scale()
    }

    const fn name(self) -> &'static str {
        match self {
            EpochUnit::Seconds => "seconds",
            EpochUnit::Millis => "millis",
            EpochUnit::Micros => "micros",
            EpochUnit::Nanos => "nanos",
        }
    }

    /// Convert `value` in this unit to nanoseconds.
    pub fn to_nanos(self, value: i64) -> Result<i64> {
        if value == NULL_NANOS {
            return Ok(NULL_NANOS);
        }
        if value.abs() > self.max_convertible() {
            return Err(Error::overflow(format!(
                "Converting {value} {} to nanos would overflow",
                self.name()
            )));
        }
        Ok(value * self.scale())
    }

    /// Convert nanoseconds to this unit, truncating toward zero.
    pub fn from_nanos(self, nanos: i64) -> i64 {
        if nanos == NULL_NANOS {
            return NULL_NANOS;
        }
        nanos / self.scale()
    }
}

pub fn micros_to_nanos(micros: i64) -> Result<i64> {
    EpochUnit::Micros.to_nanos(micros)
}

pub fn millis_to_nanos(millis: i64) -> Result<i64> {
    EpochUnit::Millis.to_nanos(millis)
}

pub fn seconds_to_nanos(seconds: i64) -> Result<i64> {
    EpochUnit::Seconds.to_nanos(seconds)
}

pub fn nanos_to_micros(nanos: i64) -> i64 {
    EpochUnit::Micros.from_nanos(nanos)
}

pub fn nanos_to_millis(nanos: i64) -> i64 {
    EpochUnit::Millis.from_nanos(nanos)
}

pub fn nanos_to_seconds(nanos: i64) -> i64 {
    EpochUnit::Seconds.from_nanos(nanos)
}

// ============================================================================
// Timestamp <-> epoch offsets
// ============================================================================

pub fn epoch_nanos(t: Option<Timestamp>) -> i64 {
    t.map_or(NULL_NANOS, Timestamp::nanos)
}

pub fn epoch_micros(t: Option<Timestamp>) -> i64 {
    t.map_or(NULL_NANOS, Timestamp::micros)
}

pub fn epoch_millis(t: Option<Timestamp>) -> i64 {
    t.map_or(NULL_NANOS, Timestamp::millis)
}

pub fn epoch_seconds(t: Option<Timestamp>) -> i64 {
    t.map_or(NULL_NANOS, Timestamp::seconds)
}

pub fn epoch_nanos_to_timestamp(nanos: i64) -> Option<Timestamp> {
    Timestamp::from_nanos(nanos)
}

pub fn epoch_micros_to_timestamp(micros: i64) -> Result<Option<Timestamp>> {
    Ok(Timestamp::from_nanos(micros_to_nanos(micros)?))
}

pub fn epoch_millis_to_timestamp(millis: i64) -> Result<Option<Timestamp>> {
    Ok(Timestamp::from_nanos(millis_to_nanos(millis)?))
}

pub fn epoch_seconds_to_timestamp(seconds: i64) -> Result<Option<Timestamp>> {
    Ok(Timestamp::from_nanos(seconds_to_nanos(seconds)?))
}

// ============================================================================
// Unit inference
// ============================================================================

/// Guess the unit of an epoch offset from its magnitude.
pub fn infer_epoch_unit(epoch_offset: i64) -> EpochUnit {
    let magnitude = epoch_offset.unsigned_abs();
    if magnitude > (1_000 * MICROTIME_THRESHOLD) as u64 {
        EpochUnit::Nanos
    } else if magnitude > MICROTIME_THRESHOLD as u64 {
        EpochUnit::Micros
    } else if magnitude > (MICROTIME_THRESHOLD / 1_000) as u64 {
        EpochUnit::Millis
    } else {
        EpochUnit::Seconds
    }
}

/// Convert an epoch offset in an inferred unit to nanoseconds.
pub fn epoch_auto_to_epoch_nanos(epoch_offset: i64) -> Result<i64> {
    if epoch_offset == NULL_NANOS {
        return Ok(NULL_NANOS);
    }
    infer_epoch_unit(epoch_offset).to_nanos(epoch_offset)
}

pub fn epoch_auto_to_timestamp(epoch_offset: i64) -> Result<Option<Timestamp>> {
    Ok(Timestamp::from_nanos(epoch_auto_to_epoch_nanos(epoch_offset)?))
}
