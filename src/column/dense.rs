use std::sync::RwLock;

use crate::chunk::{LongChunk, RowKeyChunk};
use crate::column::immutable::FlatStorage;
use crate::column::storage::{read, write, NanosStorage, PrevSnapshots, WritableStorage};
use crate::time::{nanos_or_null, Timestamp, NULL_NANOS};
use crate::{Error, Result};

/// Rows per previous-value snapshot block.
const PREV_BLOCK_SHIFT: u32 = 10;

/// Largest row key a dense column will grow to hold.
const MAX_DENSE_ROWS: u64 = 1 << 36;

/// Mutable storage in one contiguous array indexed by row key.
#[derive(Debug)]
pub struct DenseStorage {
    inner: RwLock<DenseInner>,
}

#[derive(Debug)]
struct DenseInner {
    values: Vec<i64>,
    prev: PrevSnapshots,
}

impl DenseInner {
    fn current(&self, row_key: u64) -> i64 {
        usize::try_from(row_key)
            .ok()
            .and_then(|i| self.values.get(i).copied())
            .unwrap_or(NULL_NANOS)
    }

    fn previous(&self, row_key: u64) -> i64 {
        self.prev.get(row_key).unwrap_or_else(|| self.current(row_key))
    }
}

impl Default for DenseStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl DenseStorage {
    pub fn new() -> Self {
        Self::from_raw(Vec::new())
    }

    /// Start from raw values; they are also the previous values.
    pub fn from_raw(values: Vec<i64>) -> Self {
        Self {
            inner: RwLock::new(DenseInner {
                values,
                prev: PrevSnapshots::new(PREV_BLOCK_SHIFT),
            }),
        }
    }

    pub fn from_timestamps(values: &[Option<Timestamp>]) -> Self {
        Self::from_raw(values.iter().copied().map(nanos_or_null).collect())
    }

    /// Number of row keys with storage, written or not.
    pub fn len(&self) -> usize {
        read(&self.inner).values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grow so that row keys below `rows` are addressable; new rows are null.
    pub fn ensure_capacity(&self, rows: usize) {
        let mut inner = write(&self.inner);
        if inner.values.len() < rows {
            inner.values.resize(rows, NULL_NANOS);
        }
    }

    /// Copy the current values into an immutable flat tier.
    pub fn freeze(&self) -> FlatStorage {
        let inner = read(&self.inner);
        FlatStorage::from_raw(inner.values.clone())
    }
}

impl NanosStorage for DenseStorage {
    fn get_raw(&self, row_key: u64) -> i64 {
        read(&self.inner).current(row_key)
    }

    fn get_prev_raw(&self, row_key: u64) -> i64 {
        read(&self.inner).previous(row_key)
    }

    fn fill_raw(&self, rows: &RowKeyChunk, dest: &mut LongChunk, prev: bool) -> Result<()> {
        dest.prepare(rows.len())?;
        let inner = read(&self.inner);
        if prev {
            for key in rows {
                dest.push(inner.previous(key));
            }
        } else {
            for key in rows {
                dest.push(inner.current(key));
            }
        }
        Ok(())
    }

    fn is_immutable(&self) -> bool {
        false
    }
}

impl WritableStorage for DenseStorage {
    fn set_raw(&self, row_key: u64, value: i64) -> Result<()> {
        if row_key >= MAX_DENSE_ROWS {
            return Err(Error::InvalidArgument(format!(
                "row key {row_key} is beyond dense capacity {MAX_DENSE_ROWS}"
            )));
        }
        let idx = row_key as usize;
        let mut guard = write(&self.inner);
        let inner = &mut *guard;
        let values = &inner.values;
        inner.prev.snapshot_before_write(row_key, |k| {
            usize::try_from(k)
                .ok()
                .and_then(|i| values.get(i).copied())
                .unwrap_or(NULL_NANOS)
        });
        if inner.values.len() <= idx {
            inner.values.resize(idx + 1, NULL_NANOS);
        }
        inner.values[idx] = value;
        Ok(())
    }

    fn finish_cycle(&self) {
        let dropped = write(&self.inner).prev.clear();
        log::trace!("dense column finished cycle, dropped {dropped} snapshot blocks");
    }
}
