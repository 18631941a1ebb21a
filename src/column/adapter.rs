//! Converting adapters between the two source traits.
//!
//! These wrap an arbitrary trait object rather than a storage tier, so they
//! convert per value instead of sharing a storage `Arc`.

use std::sync::Arc;

use crate::chunk::{LongChunk, RowKeyChunk, TimestampChunk};
use crate::column::{ColumnRef, LongSource, TimestampSource, ViewKind};
use crate::time::{nanos_or_null, Timestamp};
use crate::Result;

/// Typed view over any raw-long source. Conversion happens on read.
#[derive(Clone)]
pub struct LongAsTimestamp {
    inner: Arc<dyn LongSource>,
}

impl LongAsTimestamp {
    pub fn new(inner: Arc<dyn LongSource>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<dyn LongSource> {
        &self.inner
    }
}

impl TimestampSource for LongAsTimestamp {
    #[inline]
    fn get(&self, row_key: u64) -> Option<Timestamp> {
        Timestamp::from_nanos(self.inner.get_long(row_key))
    }

    #[inline]
    fn get_prev(&self, row_key: u64) -> Option<Timestamp> {
        Timestamp::from_nanos(self.inner.get_prev_long(row_key))
    }

    fn try_get(&self, row_key: u64) -> Result<Option<Timestamp>> {
        self.inner.try_get_long(row_key).map(Timestamp::from_nanos)
    }

    fn try_get_prev(&self, row_key: u64) -> Result<Option<Timestamp>> {
        self.inner.try_get_prev_long(row_key).map(Timestamp::from_nanos)
    }

    fn is_immutable(&self) -> bool {
        self.inner.is_immutable()
    }

    fn reinterpret(self: Arc<Self>, kind: ViewKind) -> Result<ColumnRef> {
        match kind {
            ViewKind::Long => Ok(ColumnRef::Long(Arc::clone(&self.inner))),
            ViewKind::Timestamp => Ok(ColumnRef::Timestamp(self)),
        }
    }
}

/// Raw view over any typed source, for consumers that only read longs.
#[derive(Clone)]
pub struct TimestampAsLong {
    inner: Arc<dyn TimestampSource>,
}

impl TimestampAsLong {
    pub fn new(inner: Arc<dyn TimestampSource>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<dyn TimestampSource> {
        &self.inner
    }

    fn convert(
        &self,
        rows: &RowKeyChunk,
        dest: &mut LongChunk,
        fill: impl FnOnce(&RowKeyChunk, &mut TimestampChunk) -> Result<()>,
    ) -> Result<()> {
        let mut typed = TimestampChunk::with_capacity(rows.len());
        fill(rows, &mut typed)?;
        dest.prepare(typed.len())?;
        for value in &typed {
            dest.push(nanos_or_null(value));
        }
        Ok(())
    }
}

impl LongSource for TimestampAsLong {
    #[inline]
    fn get_long(&self, row_key: u64) -> i64 {
        nanos_or_null(self.inner.get(row_key))
    }

    #[inline]
    fn get_prev_long(&self, row_key: u64) -> i64 {
        nanos_or_null(self.inner.get_prev(row_key))
    }

    fn try_get_long(&self, row_key: u64) -> Result<i64> {
        self.inner.try_get(row_key).map(nanos_or_null)
    }

    fn try_get_prev_long(&self, row_key: u64) -> Result<i64> {
        self.inner.try_get_prev(row_key).map(nanos_or_null)
    }

    fn is_immutable(&self) -> bool {
        self.inner.is_immutable()
    }

    fn fill_chunk(&self, rows: &RowKeyChunk, dest: &mut LongChunk) -> Result<()> {
        self.convert(rows, dest, |r, d| self.inner.fill_chunk(r, d))
    }

    fn fill_prev_chunk(&self, rows: &RowKeyChunk, dest: &mut LongChunk) -> Result<()> {
        self.convert(rows, dest, |r, d| self.inner.fill_prev_chunk(r, d))
    }

    fn reinterpret(self: Arc<Self>, kind: ViewKind) -> Result<ColumnRef> {
        match kind {
            ViewKind::Timestamp => Ok(ColumnRef::Timestamp(Arc::clone(&self.inner))),
            ViewKind::Long => Ok(ColumnRef::Long(self)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{FlatStorage, LongColumn};
    use crate::time::NULL_NANOS;

    fn long_source() -> Arc<dyn LongSource> {
        let column = LongColumn::from_storage(FlatStorage::from_raw(vec![1, NULL_NANOS, 3]))
            .expect("flat supports long");
        Arc::new(column)
    }

    #[test]
    fn long_as_timestamp_reads_and_unwraps() {
        let inner = long_source();
        let adapter = Arc::new(LongAsTimestamp::new(Arc::clone(&inner)));
        assert_eq!(adapter.get(0), Timestamp::from_nanos(1));
        assert_eq!(adapter.get(1), None);

        let back = adapter.reinterpret(ViewKind::Long).expect("reinterpret");
        let back = back.as_long().expect("long view");
        assert!(Arc::ptr_eq(back, &inner));
    }

    #[test]
    fn timestamp_as_long_fills_chunks() {
        let typed: Arc<dyn TimestampSource> = Arc::new(LongAsTimestamp::new(long_source()));
        let adapter = TimestampAsLong::new(typed);

        let mut rows = RowKeyChunk::with_capacity(3);
        for key in [2, 1, 0] {
            rows.push(key);
        }
        let mut dest = LongChunk::with_capacity(3);
        adapter.fill_chunk(&rows, &mut dest).expect("fill");
        assert_eq!(dest.as_slice(), &[3, NULL_NANOS, 1]);
    }
}
