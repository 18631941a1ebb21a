use std::fmt;
use std::sync::Arc;

use crate::chunk::{LongChunk, RowKeyChunk, TimestampChunk};
use crate::column::storage::{NanosStorage, WritableStorage};
use crate::column::{unsupported, ColumnRef, LongSource, TimestampSource, ViewKind};
use crate::time::{nanos_or_null, Timestamp};
use crate::Result;

/// Typed timestamp view over a storage tier.
pub struct TimestampColumn<S: ?Sized> {
    storage: Arc<S>,
}

/// Raw nanosecond view over a storage tier.
pub struct LongColumn<S: ?Sized> {
    storage: Arc<S>,
}

impl<S: NanosStorage + ?Sized> TimestampColumn<S> {
    /// Fails if the storage does not support the timestamp view.
    pub fn new(storage: Arc<S>) -> Result<Self> {
        if !storage.supports(ViewKind::Timestamp) {
            return Err(unsupported(ViewKind::Timestamp, ViewKind::Timestamp));
        }
        Ok(Self { storage })
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Raw view over the same storage.
    pub fn as_long(&self) -> Result<LongColumn<S>> {
        if !self.storage.supports(ViewKind::Long) {
            return Err(unsupported(ViewKind::Timestamp, ViewKind::Long));
        }
        Ok(LongColumn {
            storage: Arc::clone(&self.storage),
        })
    }
}

impl<S: NanosStorage> TimestampColumn<S> {
    pub fn from_storage(storage: S) -> Result<Self> {
        Self::new(Arc::new(storage))
    }
}

impl<S: WritableStorage + ?Sized> TimestampColumn<S> {
    pub fn set(&self, row_key: u64, value: Option<Timestamp>) -> Result<()> {
        self.storage.set_raw(row_key, nanos_or_null(value))
    }

    pub fn finish_cycle(&self) {
        self.storage.finish_cycle();
    }
}

impl<S: NanosStorage + ?Sized> LongColumn<S> {
    /// Fails if the storage does not support the raw view.
    pub fn new(storage: Arc<S>) -> Result<Self> {
        if !storage.supports(ViewKind::Long) {
            return Err(unsupported(ViewKind::Long, ViewKind::Long));
        }
        Ok(Self { storage })
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Typed view over the same storage.
    pub fn as_timestamp(&self) -> Result<TimestampColumn<S>> {
        if !self.storage.supports(ViewKind::Timestamp) {
            return Err(unsupported(ViewKind::Long, ViewKind::Timestamp));
        }
        Ok(TimestampColumn {
            storage: Arc::clone(&self.storage),
        })
    }
}

impl<S: NanosStorage> LongColumn<S> {
    pub fn from_storage(storage: S) -> Result<Self> {
        Self::new(Arc::new(storage))
    }
}

impl<S: WritableStorage + ?Sized> LongColumn<S> {
    pub fn set(&self, row_key: u64, value: i64) -> Result<()> {
        self.storage.set_raw(row_key, value)
    }

    pub fn finish_cycle(&self) {
        self.storage.finish_cycle();
    }
}

impl<S: ?Sized> Clone for TimestampColumn<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: ?Sized> Clone for LongColumn<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: ?Sized> fmt::Debug for TimestampColumn<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TimestampColumn")
    }
}

impl<S: ?Sized> fmt::Debug for LongColumn<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LongColumn")
    }
}

/// Batch read through the storage's raw fill, so load errors propagate.
fn fill_typed<S: NanosStorage + ?Sized>(
    storage: &S,
    rows: &RowKeyChunk,
    dest: &mut TimestampChunk,
    prev: bool,
) -> Result<()> {
    let mut raw = LongChunk::with_capacity(rows.len());
    storage.fill_raw(rows, &mut raw, prev)?;
    dest.prepare(raw.len())?;
    for value in &raw {
        dest.push(Timestamp::from_nanos(value));
    }
    Ok(())
}

impl<S: NanosStorage + ?Sized> TimestampSource for TimestampColumn<S> {
    #[inline]
    fn get(&self, row_key: u64) -> Option<Timestamp> {
        Timestamp::from_nanos(self.storage.get_raw(row_key))
    }

    #[inline]
    fn get_prev(&self, row_key: u64) -> Option<Timestamp> {
        Timestamp::from_nanos(self.storage.get_prev_raw(row_key))
    }

    fn try_get(&self, row_key: u64) -> Result<Option<Timestamp>> {
        self.storage.try_get_raw(row_key).map(Timestamp::from_nanos)
    }

    fn try_get_prev(&self, row_key: u64) -> Result<Option<Timestamp>> {
        self.storage.try_get_prev_raw(row_key).map(Timestamp::from_nanos)
    }

    fn is_immutable(&self) -> bool {
        self.storage.is_immutable()
    }

    fn fill_chunk(&self, rows: &RowKeyChunk, dest: &mut TimestampChunk) -> Result<()> {
        fill_typed(&*self.storage, rows, dest, false)
    }

    fn fill_prev_chunk(&self, rows: &RowKeyChunk, dest: &mut TimestampChunk) -> Result<()> {
        fill_typed(&*self.storage, rows, dest, true)
    }

    fn reinterpret(self: Arc<Self>, kind: ViewKind) -> Result<ColumnRef> {
        match kind {
            ViewKind::Timestamp => Ok(ColumnRef::Timestamp(self)),
            ViewKind::Long => Ok(ColumnRef::Long(Arc::new(self.as_long()?))),
        }
    }
}

impl<S: NanosStorage + ?Sized> LongSource for LongColumn<S> {
    #[inline]
    fn get_long(&self, row_key: u64) -> i64 {
        self.storage.get_raw(row_key)
    }

    #[inline]
    fn get_prev_long(&self, row_key: u64) -> i64 {
        self.storage.get_prev_raw(row_key)
    }

    fn try_get_long(&self, row_key: u64) -> Result<i64> {
        self.storage.try_get_raw(row_key)
    }

    fn try_get_prev_long(&self, row_key: u64) -> Result<i64> {
        self.storage.try_get_prev_raw(row_key)
    }

    fn is_immutable(&self) -> bool {
        self.storage.is_immutable()
    }

    fn fill_chunk(&self, rows: &RowKeyChunk, dest: &mut LongChunk) -> Result<()> {
        self.storage.fill_raw(rows, dest, false)
    }

    fn fill_prev_chunk(&self, rows: &RowKeyChunk, dest: &mut LongChunk) -> Result<()> {
        self.storage.fill_raw(rows, dest, true)
    }

    fn reinterpret(self: Arc<Self>, kind: ViewKind) -> Result<ColumnRef> {
        match kind {
            ViewKind::Long => Ok(ColumnRef::Long(self)),
            ViewKind::Timestamp => Ok(ColumnRef::Timestamp(Arc::new(self.as_timestamp()?))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::DenseStorage;
    use crate::time::NULL_NANOS;

    #[test]
    fn writes_are_visible_through_both_views() {
        let typed = TimestampColumn::from_storage(DenseStorage::new()).expect("dense");
        let raw = typed.as_long().expect("long view");
        typed.set(0, Timestamp::from_nanos(11)).expect("write");
        raw.set(1, 22).expect("write");
        typed.set(2, None).expect("write");

        assert_eq!(raw.get_long(0), 11);
        assert_eq!(typed.get(1), Timestamp::from_nanos(22));
        assert_eq!(raw.get_long(2), NULL_NANOS);
        assert!(Arc::ptr_eq(typed.storage(), raw.storage()));
    }

    #[test]
    fn reinterpretation_is_its_own_inverse() {
        let typed = Arc::new(
            TimestampColumn::from_storage(DenseStorage::from_raw(vec![5, NULL_NANOS]))
                .expect("dense"),
        );
        let long = Arc::clone(&typed)
            .reinterpret(ViewKind::Long)
            .expect("to long");
        assert_eq!(long.kind(), ViewKind::Long);
        let back = long.reinterpret(ViewKind::Timestamp).expect("to timestamp");
        let back = back.as_timestamp().expect("typed");
        assert_eq!(back.get(0), typed.get(0));
        assert_eq!(back.get(1), None);

        let same = Arc::clone(&typed)
            .reinterpret(ViewKind::Timestamp)
            .expect("identity");
        assert_eq!(same.get_raw(0), 5);
    }

    #[test]
    fn typed_fill_converts_nulls() {
        let typed = TimestampColumn::from_storage(DenseStorage::from_raw(vec![1, NULL_NANOS, 3]))
            .expect("dense");
        typed.set(0, Timestamp::from_nanos(10)).expect("write");

        let mut rows = RowKeyChunk::with_capacity(3);
        for key in 0..3 {
            rows.push(key);
        }
        let mut dest = TimestampChunk::with_capacity(3);
        typed.fill_chunk(&rows, &mut dest).expect("fill");
        assert_eq!(
            dest.as_slice(),
            &[Timestamp::from_nanos(10), None, Timestamp::from_nanos(3)]
        );
        typed.fill_prev_chunk(&rows, &mut dest).expect("fill prev");
        assert_eq!(dest.get(0), Some(Timestamp::from_nanos(1)));
    }
}
