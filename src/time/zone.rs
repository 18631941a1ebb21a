//! Short time zone identifiers used in timestamp literals.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone as _};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::time::timestamp::Timestamp;
use crate::{Error, Result};

/// Zone table for literal parsing and formatting.
///
/// Several identifiers alias the same IANA zone (`NY`/`ET`, `MN`/`CT`); the
/// identifier, not the IANA name, is what formatting writes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeZone {
    NY,
    ET,
    MN,
    CT,
    MT,
    PT,
    HI,
    BT,
    KR,
    HK,
    JP,
    AT,
    NF,
    AL,
    IN,
    CE,
    SG,
    LON,
    MOS,
    SHG,
    CH,
    NL,
    TW,
    SYD,
    UTC,
}

impl TimeZone {
    pub const ALL: [TimeZone; 25] = [
        TimeZone::NY,
        TimeZone::ET,
        TimeZone::MN,
        TimeZone::CT,
        TimeZone::MT,
        TimeZone::PT,
        TimeZone::HI,
        TimeZone::BT,
        TimeZone::KR,
        TimeZone::HK,
        TimeZone::JP,
        TimeZone::AT,
        TimeZone::NF,
        TimeZone::AL,
        TimeZone::IN,
        TimeZone::CE,
        TimeZone::SG,
        TimeZone::LON,
        TimeZone::MOS,
        TimeZone::SHG,
        TimeZone::CH,
        TimeZone::NL,
        TimeZone::TW,
        TimeZone::SYD,
        TimeZone::UTC,
    ];

    /// The identifier as written in literals, e.g. `"NY"`.
    pub const fn id(self) -> &'static str {
        match self {
            TimeZone::NY => "NY",
            TimeZone::ET => "ET",
            TimeZone::MN => "MN",
            TimeZone::CT => "CT",
            TimeZone::MT => "MT",
            TimeZone::PT => "PT",
            TimeZone::HI => "HI",
            TimeZone::BT => "BT",
            TimeZone::KR => "KR",
            TimeZone::HK => "HK",
            TimeZone::JP => "JP",
            TimeZone::AT => "AT",
            TimeZone::NF => "NF",
            TimeZone::AL => "AL",
            TimeZone::IN => "IN",
            TimeZone::CE => "CE",
            TimeZone::SG => "SG",
            TimeZone::LON => "LON",
            TimeZone::MOS => "MOS",
            TimeZone::SHG => "SHG",
            TimeZone::CH => "CH",
            TimeZone::NL => "NL",
            TimeZone::TW => "TW",
            TimeZone::SYD => "SYD",
            TimeZone::UTC => "UTC",
        }
    }

    pub const fn tz(self) -> Tz {
        match self {
            TimeZone::NY | TimeZone::ET => Tz::America__New_York,
            TimeZone::MN | TimeZone::CT => Tz::America__Chicago,
            TimeZone::MT => Tz::America__Denver,
            TimeZone::PT => Tz::America__Los_Angeles,
            TimeZone::HI => Tz::Pacific__Honolulu,
            TimeZone::BT => Tz::America__Sao_Paulo,
            TimeZone::KR => Tz::Asia__Seoul,
            TimeZone::HK => Tz::Asia__Hong_Kong,
            TimeZone::JP => Tz::Asia__Tokyo,
            TimeZone::AT => Tz::Canada__Atlantic,
            TimeZone::NF => Tz::Canada__Newfoundland,
            TimeZone::AL => Tz::America__Anchorage,
            TimeZone::IN => Tz::Asia__Kolkata,
            TimeZone::CE => Tz::Europe__Berlin,
            TimeZone::SG => Tz::Asia__Singapore,
            TimeZone::LON => Tz::Europe__London,
            TimeZone::MOS => Tz::Europe__Moscow,
            TimeZone::SHG => Tz::Asia__Shanghai,
            TimeZone::CH => Tz::Europe__Zurich,
            TimeZone::NL => Tz::Europe__Amsterdam,
            TimeZone::TW => Tz::Asia__Taipei,
            TimeZone::SYD => Tz::Australia__Sydney,
            TimeZone::UTC => Tz::UTC,
        }
    }

    /// Case-insensitive lookup of an alphabetic identifier.
    pub fn from_id(id: &str) -> Option<TimeZone> {
        let id = id.trim();
        TimeZone::ALL
            .iter()
            .copied()
            .find(|zone| zone.id().eq_ignore_ascii_case(id))
    }

    /// `t` as a zoned date-time.
    pub fn to_zoned(self, t: Timestamp) -> DateTime<Tz> {
        DateTime::from_timestamp_nanos(t.nanos()).with_timezone(&self.tz())
    }

    /// `t` as wall-clock time in this zone.
    pub fn to_local(self, t: Timestamp) -> NaiveDateTime {
        self.to_zoned(t).naive_local()
    }

    /// Resolve a wall-clock time in this zone.
    ///
    /// Ambiguous times (clocks set back) resolve to the earlier instant;
    /// skipped times (clocks set forward) have no instant.
    pub fn resolve_local(self, local: &NaiveDateTime) -> Option<DateTime<Tz>> {
        self.tz().from_local_datetime(local).earliest()
    }

    /// Resolve a wall-clock time to a timestamp.
    pub fn local_to_timestamp(self, local: &NaiveDateTime) -> Result<Timestamp> {
        let zoned = self.resolve_local(local).ok_or_else(|| {
            Error::parse(format!("{local} does not exist in zone {}", self.id()))
        })?;
        zoned_to_timestamp(&zoned)
    }

    /// UTC offset of this zone at `t`, in seconds.
    pub fn offset_seconds(self, t: Timestamp) -> i32 {
        use chrono::Offset;
        self.to_zoned(t).offset().fix().local_minus_utc()
    }
}

pub(crate) fn zoned_to_timestamp<Z: chrono::TimeZone>(dt: &DateTime<Z>) -> Result<Timestamp> {
    dt.timestamp_nanos_opt()
        .and_then(Timestamp::from_nanos)
        .ok_or_else(|| {
            Error::overflow(format!("{} is outside the nanosecond range", dt.naive_utc()))
        })
}

impl fmt::Display for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TimeZone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TimeZone::from_id(s).ok_or_else(|| Error::parse(format!("unknown time zone '{s}'")))
    }
}

impl TryFrom<String> for TimeZone {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimeZone> for String {
    fn from(value: TimeZone) -> Self {
        value.id().to_string()
    }
}

impl Default for TimeZone {
    fn default() -> Self {
        TimeZone::NY
    }
}
