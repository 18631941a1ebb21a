use std::fmt;
use std::sync::Arc;

use crate::chunk::{LongChunk, RowKeyChunk};
use crate::column::{
    ColumnRef, DataKind, LongSource, TableDefinition, TimestampAsLong, TimestampSource, ViewKind,
};
use crate::config::NanotickConfig;
use crate::filter::SortOrder;
use crate::rowset::{RowSet, RowSetBuilder};
use crate::time::{Timestamp, NULL_NANOS};
use crate::{Error, Result};

const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Keeps rows whose timestamp lies between two bounds.
///
/// Sorted selections are filtered by positional binary search; unsorted ones
/// by a chunked linear scan. Both paths agree exactly on sorted input. Null
/// values never match.
#[derive(Debug, Clone)]
pub struct TimestampRangeFilter {
    column: String,
    lower: Timestamp,
    upper: Timestamp,
    lower_inclusive: bool,
    upper_inclusive: bool,
    chunk_size: usize,
}

impl TimestampRangeFilter {
    /// Both bounds inclusive.
    pub fn new(column: impl Into<String>, lower: Timestamp, upper: Timestamp) -> Self {
        Self {
            column: column.into(),
            lower,
            upper,
            lower_inclusive: true,
            upper_inclusive: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_inclusivity(mut self, lower_inclusive: bool, upper_inclusive: bool) -> Self {
        self.lower_inclusive = lower_inclusive;
        self.upper_inclusive = upper_inclusive;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_config(self, config: &NanotickConfig) -> Self {
        self.with_chunk_size(config.filter_chunk_size)
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn lower(&self) -> Timestamp {
        self.lower
    }

    pub fn upper(&self) -> Timestamp {
        self.upper
    }

    pub fn lower_inclusive(&self) -> bool {
        self.lower_inclusive
    }

    pub fn upper_inclusive(&self) -> bool {
        self.upper_inclusive
    }

    /// Check the column exists and holds timestamps.
    pub fn init(&self, definition: &TableDefinition) -> Result<()> {
        let column = definition.column(&self.column).ok_or_else(|| {
            let available: Vec<&str> =
                definition.columns().iter().map(|c| c.name.as_str()).collect();
            Error::InvalidColumn(format!(
                "column \"{}\" doesn't exist in this table, available columns: [{}]",
                self.column,
                available.join(", ")
            ))
        })?;
        if column.kind != DataKind::Timestamp {
            return Err(Error::InvalidColumn(format!(
                "column \"{}\" is {}, expected timestamp",
                self.column, column.kind
            )));
        }
        Ok(())
    }

    /// Inclusive raw bounds, or `None` when no value can match.
    fn effective_bounds(&self) -> Option<(i64, i64)> {
        let lower = if self.lower_inclusive {
            self.lower.nanos()
        } else {
            self.lower.nanos().checked_add(1)?
        };
        let upper = if self.upper_inclusive {
            self.upper.nanos()
        } else {
            // Nudging below the minimum would land on the null sentinel.
            let nudged = self.upper.nanos().checked_sub(1)?;
            if nudged == NULL_NANOS {
                return None;
            }
            nudged
        };
        (lower <= upper).then_some((lower, upper))
    }

    /// Rows of `selection` whose value lies in range. `selection` is not modified.
    pub fn filter(
        &self,
        selection: &RowSet,
        source: &Arc<dyn TimestampSource>,
        use_prev: bool,
        order: SortOrder,
    ) -> Result<RowSet> {
        if selection.is_empty() {
            return Ok(RowSet::empty());
        }
        let Some((lower, upper)) = self.effective_bounds() else {
            return Ok(RowSet::empty());
        };
        let longs = long_view(source)?;
        match order {
            SortOrder::Unsorted => self.linear(selection, &*longs, use_prev, lower, upper),
            SortOrder::Ascending | SortOrder::Descending => binary_search(
                selection,
                &*longs,
                use_prev,
                order == SortOrder::Descending,
                lower,
                upper,
            ),
        }
    }

    fn linear(
        &self,
        selection: &RowSet,
        source: &dyn LongSource,
        use_prev: bool,
        lower: i64,
        upper: i64,
    ) -> Result<RowSet> {
        let batch = self.chunk_size.min(selection.size() as usize).max(1);
        let mut keys = RowKeyChunk::with_capacity(batch);
        let mut values = LongChunk::with_capacity(batch);
        let mut chunks = selection.chunks(batch);
        let mut out = RowSetBuilder::new();
        while chunks.next_into(&mut keys)? {
            if use_prev {
                source.fill_prev_chunk(&keys, &mut values)?;
            } else {
                source.fill_chunk(&keys, &mut values)?;
            }
            for (key, value) in keys.iter().zip(values.iter()) {
                // Bounds never include the sentinel, so nulls fall out here.
                if value >= lower && value <= upper {
                    out.append_key(key)?;
                }
            }
        }
        Ok(out.build())
    }
}

/// Raw view of `source`, falling back to a converting adapter when the
/// storage has no raw view.
fn long_view(source: &Arc<dyn TimestampSource>) -> Result<Arc<dyn LongSource>> {
    match Arc::clone(source).reinterpret(ViewKind::Long) {
        Ok(ColumnRef::Long(longs)) => Ok(longs),
        Ok(ColumnRef::Timestamp(_)) => Err(Error::UnsupportedReinterpretation {
            from: ViewKind::Timestamp,
            to: ViewKind::Long,
        }),
        Err(Error::UnsupportedReinterpretation { .. }) => {
            log::debug!("column has no raw view, converting per value");
            Ok(Arc::new(TimestampAsLong::new(Arc::clone(source))))
        }
        Err(e) => Err(e),
    }
}

/// Contiguous positions of `selection` whose values lie in `[lower, upper]`.
///
/// Reads are fallible so an unreadable block fails the search instead of
/// looking like nulls.
fn binary_search(
    selection: &RowSet,
    source: &dyn LongSource,
    use_prev: bool,
    descending: bool,
    lower: i64,
    upper: i64,
) -> Result<RowSet> {
    let value_at = |position: u64| -> Result<i64> {
        let key = selection.get(position).ok_or_else(|| {
            Error::InvalidArgument(format!("position {position} outside the selection"))
        })?;
        if use_prev {
            source.try_get_prev_long(key)
        } else {
            source.try_get_long(key)
        }
    };
    let size = selection.size();
    let (start, end) = if descending {
        (
            partition_point(size, |v| v > upper, &value_at)?,
            partition_point(size, |v| v >= lower, &value_at)?,
        )
    } else {
        (
            partition_point(size, |v| v < lower, &value_at)?,
            partition_point(size, |v| v <= upper, &value_at)?,
        )
    };
    Ok(selection.sub_set_by_position_range(start, end))
}

/// First position in `[0, size)` where `pred` turns false.
fn partition_point(
    size: u64,
    pred: impl Fn(i64) -> bool,
    value_at: &impl Fn(u64) -> Result<i64>,
) -> Result<u64> {
    let (mut lo, mut hi) = (0_u64, size);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(value_at(mid)?) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}

impl fmt::Display for TimestampRangeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TimestampRangeFilter({} in {}{},{}{})",
            self.column,
            if self.lower_inclusive { "[" } else { "(" },
            self.lower,
            self.upper,
            if self.upper_inclusive { "]" } else { ")" }
        )
    }
}
