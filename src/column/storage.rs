use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::chunk::{LongChunk, RowKeyChunk};
use crate::column::ViewKind;
use crate::time::NULL_NANOS;
use crate::Result;

/// Storage policy behind the column views.
///
/// Values are raw nanoseconds; [`NULL_NANOS`] is null. Reads past the end of
/// the stored rows return null.
pub trait NanosStorage: Send + Sync + 'static {
    fn get_raw(&self, row_key: u64) -> i64;

    fn get_prev_raw(&self, row_key: u64) -> i64 {
        self.get_raw(row_key)
    }

    /// Point read that reports load failures instead of reading null.
    fn try_get_raw(&self, row_key: u64) -> Result<i64> {
        Ok(self.get_raw(row_key))
    }

    fn try_get_prev_raw(&self, row_key: u64) -> Result<i64> {
        Ok(self.get_prev_raw(row_key))
    }

    fn fill_raw(&self, rows: &RowKeyChunk, dest: &mut LongChunk, prev: bool) -> Result<()> {
        dest.prepare(rows.len())?;
        for key in rows {
            dest.push(if prev {
                self.get_prev_raw(key)
            } else {
                self.get_raw(key)
            });
        }
        Ok(())
    }

    /// Whether a view of `kind` may be placed over this storage.
    fn supports(&self, kind: ViewKind) -> bool {
        let _ = kind;
        true
    }

    fn is_immutable(&self) -> bool;
}

/// Storage that accepts writes within an update cycle.
pub trait WritableStorage: NanosStorage {
    fn set_raw(&self, row_key: u64, value: i64) -> Result<()>;

    /// End the cycle: current values become the previous values.
    fn finish_cycle(&self);
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

/// Per-block copies of values as they were at the start of the cycle.
#[derive(Debug, Default)]
pub(crate) struct PrevSnapshots {
    shift: u32,
    blocks: HashMap<u64, Box<[i64]>>,
}

impl PrevSnapshots {
    pub(crate) fn new(shift: u32) -> Self {
        Self {
            shift,
            blocks: HashMap::new(),
        }
    }

    pub(crate) fn block_len(&self) -> usize {
        1 << self.shift
    }

    pub(crate) fn block_of(&self, row_key: u64) -> u64 {
        row_key >> self.shift
    }

    pub(crate) fn first_key(&self, block: u64) -> u64 {
        block << self.shift
    }

    /// Previous value, if the block has been written this cycle.
    pub(crate) fn get(&self, row_key: u64) -> Option<i64> {
        let block = self.blocks.get(&self.block_of(row_key))?;
        let offset = (row_key & ((1 << self.shift) - 1)) as usize;
        Some(block[offset])
    }

    /// Snapshot the block of `row_key` unless already taken this cycle.
    ///
    /// `current` reads the value of a row key before the write.
    pub(crate) fn snapshot_before_write(&mut self, row_key: u64, current: impl Fn(u64) -> i64) {
        let block = self.block_of(row_key);
        if self.blocks.contains_key(&block) {
            return;
        }
        let first = self.first_key(block);
        let copy: Box<[i64]> = (0..self.block_len() as u64)
            .map(|i| current(first + i))
            .collect();
        self.blocks.insert(block, copy);
    }

    pub(crate) fn clear(&mut self) -> usize {
        let n = self.blocks.len();
        self.blocks.clear();
        n
    }
}

pub(crate) fn null_block(len: usize) -> Box<[i64]> {
    vec![NULL_NANOS; len].into_boxed_slice()
}
