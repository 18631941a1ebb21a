//! Row filters over timestamp columns.

use std::fmt;

mod range;

pub use range::TimestampRangeFilter;

/// What the caller guarantees about value order along the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// No guarantee; filter by linear scan.
    #[default]
    Unsorted,
    /// Non-decreasing raw values (nulls first).
    Ascending,
    /// Non-increasing raw values (nulls last).
    Descending,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortOrder::Unsorted => "unsorted",
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        };
        f.write_str(name)
    }
}
