use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::chunk::{LongChunk, RowKeyChunk};
use crate::column::immutable::PagedStorage;
use crate::column::storage::{
    null_block, read, write, NanosStorage, PrevSnapshots, WritableStorage,
};
use crate::config::{NanotickConfig, MAX_SHIFT};
use crate::time::NULL_NANOS;
use crate::{Error, Result};

/// Mutable storage in fixed-size blocks allocated on first write.
///
/// Row keys in blocks that were never written read as null, so widely spread
/// keys cost one block each rather than a dense array up to the largest key.
#[derive(Debug)]
pub struct SparseStorage {
    shift: u32,
    inner: RwLock<SparseInner>,
}

#[derive(Debug)]
struct SparseInner {
    blocks: BTreeMap<u64, Box<[i64]>>,
    prev: PrevSnapshots,
}

impl SparseInner {
    fn current(&self, shift: u32, row_key: u64) -> i64 {
        let mask = (1_u64 << shift) - 1;
        self.blocks
            .get(&(row_key >> shift))
            .map_or(NULL_NANOS, |block| block[(row_key & mask) as usize])
    }

    fn previous(&self, shift: u32, row_key: u64) -> i64 {
        self.prev
            .get(row_key)
            .unwrap_or_else(|| self.current(shift, row_key))
    }
}

impl SparseStorage {
    pub fn new(block_shift: u32) -> Result<Self> {
        if block_shift > MAX_SHIFT {
            return Err(Error::InvalidArgument(format!(
                "block shift {block_shift} exceeds {MAX_SHIFT}"
            )));
        }
        Ok(Self {
            shift: block_shift,
            inner: RwLock::new(SparseInner {
                blocks: BTreeMap::new(),
                prev: PrevSnapshots::new(block_shift),
            }),
        })
    }

    pub fn from_config(config: &NanotickConfig) -> Result<Self> {
        Self::new(config.sparse_block_shift)
    }

    pub fn block_shift(&self) -> u32 {
        self.shift
    }

    pub fn allocated_blocks(&self) -> usize {
        read(&self.inner).blocks.len()
    }

    /// Copy the current values into an immutable paged tier.
    ///
    /// Only allocated blocks are copied, so far-apart keys stay cheap.
    pub fn freeze(&self) -> PagedStorage {
        let inner = read(&self.inner);
        PagedStorage::from_pages(self.shift, inner.blocks.clone())
    }
}

impl NanosStorage for SparseStorage {
    fn get_raw(&self, row_key: u64) -> i64 {
        read(&self.inner).current(self.shift, row_key)
    }

    fn get_prev_raw(&self, row_key: u64) -> i64 {
        read(&self.inner).previous(self.shift, row_key)
    }

    fn fill_raw(&self, rows: &RowKeyChunk, dest: &mut LongChunk, prev: bool) -> Result<()> {
        dest.prepare(rows.len())?;
        let inner = read(&self.inner);
        for key in rows {
            dest.push(if prev {
                inner.previous(self.shift, key)
            } else {
                inner.current(self.shift, key)
            });
        }
        Ok(())
    }

    fn is_immutable(&self) -> bool {
        false
    }
}

impl WritableStorage for SparseStorage {
    fn set_raw(&self, row_key: u64, value: i64) -> Result<()> {
        let shift = self.shift;
        let mut guard = write(&self.inner);
        let inner = &mut *guard;
        let blocks = &inner.blocks;
        inner.prev.snapshot_before_write(row_key, |k| {
            let mask = (1_u64 << shift) - 1;
            blocks
                .get(&(k >> shift))
                .map_or(NULL_NANOS, |block| block[(k & mask) as usize])
        });
        let block = inner
            .blocks
            .entry(row_key >> shift)
            .or_insert_with(|| null_block(1 << shift));
        block[(row_key & ((1_u64 << shift) - 1)) as usize] = value;
        Ok(())
    }

    fn finish_cycle(&self) {
        let dropped = write(&self.inner).prev.clear();
        log::trace!("sparse column finished cycle, dropped {dropped} snapshot blocks");
    }
}
