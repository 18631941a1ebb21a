//! Nanosecond timestamps, reinterpretable timestamp column sources and a
//! sort-aware range filter.
//!
//! The scalar layer ([`time`]) holds a null-safe, overflow-checked
//! [`Timestamp`] with parsing, formatting and zone-aware calendar math. The
//! column layer ([`column`], [`region`]) stores nanoseconds in several tiers
//! and exposes each through raw and typed views over the same storage.
//! [`filter`] selects rows by time range and [`schedule`] drives virtual time.

pub mod chunk;
pub mod column;
pub mod config;
pub mod error;
pub mod filter;
pub mod mmap;
pub mod region;
pub mod rowset;
pub mod schedule;
pub mod time;

pub use column::{ColumnRef, LongSource, TimestampSource, ViewKind};
pub use config::NanotickConfig;
pub use error::{Error, Result};
pub use filter::{SortOrder, TimestampRangeFilter};
pub use rowset::RowSet;
pub use schedule::{ControlledScheduler, FixedStepReplayer};
pub use time::{Clock, Period, TimeZone, Timestamp};
