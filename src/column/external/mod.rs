//! Lazily loaded, externally backed timestamp storage.
//!
//! Values live in foreign blocks (a mapped column file, Arrow record batches)
//! that carry a validity mask instead of the null sentinel. A block is
//! decoded on the first read that touches it and cached for the life of the
//! storage. The first touch blocks the reader while the loader runs.

use std::fmt;
use std::sync::OnceLock;

use crate::chunk::{LongChunk, RowKeyChunk};
use crate::column::storage::NanosStorage;
use crate::column::ViewKind;
use crate::time::{Timestamp, NULL_NANOS};
use crate::{Error, Result};

#[cfg(feature = "arrow")]
pub mod arrow_ipc;
pub mod mmap_file;

#[cfg(feature = "arrow")]
pub use arrow_ipc::ArrowBlockLoader;
pub use mmap_file::{write_column_file, write_raw_column_file, MmapBlockLoader};

/// Source of foreign blocks.
pub trait BlockLoader: Send + Sync + 'static {
    fn row_count(&self) -> u64;

    fn block_count(&self) -> usize;

    /// Block index and offset inside it, or `None` past the last row.
    fn locate(&self, row_key: u64) -> Option<(usize, usize)>;

    fn load_block(&self, index: usize) -> Result<ExternalBlock>;
}

/// One decoded block: values plus a validity bitmap (bit set = present).
#[derive(Clone, PartialEq, Eq)]
pub struct ExternalBlock {
    values: Box<[i64]>,
    validity: Option<Box<[u8]>>,
}

impl ExternalBlock {
    /// A missing bitmap means every value is present.
    pub fn new(values: Vec<i64>, validity: Option<Vec<u8>>) -> Result<Self> {
        if let Some(bits) = &validity {
            if bits.len() < values.len().div_ceil(8) {
                return Err(Error::Corrupt("validity bitmap shorter than block"));
            }
        }
        Ok(Self {
            values: values.into_boxed_slice(),
            validity: validity.map(Vec::into_boxed_slice),
        })
    }

    pub fn from_timestamps(values: &[Option<Timestamp>]) -> Self {
        let mut bits = vec![0_u8; values.len().div_ceil(8)];
        let raw = values
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Some(t) => {
                    bits[i / 8] |= 1 << (i % 8);
                    t.nanos()
                }
                None => 0,
            })
            .collect::<Vec<_>>();
        Self {
            values: raw.into_boxed_slice(),
            validity: Some(bits.into_boxed_slice()),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_valid(&self, offset: usize) -> bool {
        offset < self.values.len()
            && self
                .validity
                .as_ref()
                .map_or(true, |bits| bits[offset / 8] & (1 << (offset % 8)) != 0)
    }

    /// Raw nanoseconds; masked or out-of-range offsets read as null.
    #[inline]
    pub fn get_raw(&self, offset: usize) -> i64 {
        if self.is_valid(offset) {
            self.values[offset]
        } else {
            NULL_NANOS
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.values.len()).filter(|&i| !self.is_valid(i)).count()
    }
}

impl fmt::Debug for ExternalBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalBlock")
            .field("len", &self.values.len())
            .field("nulls", &self.null_count())
            .finish()
    }
}

/// Read-only storage over a [`BlockLoader`]. Supports only the timestamp view.
pub struct ExternalStorage<L> {
    loader: L,
    blocks: Box<[OnceLock<ExternalBlock>]>,
}

impl<L: BlockLoader> ExternalStorage<L> {
    pub fn new(loader: L) -> Self {
        let blocks = (0..loader.block_count()).map(|_| OnceLock::new()).collect();
        Self { loader, blocks }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn row_count(&self) -> u64 {
        self.loader.row_count()
    }

    pub fn loaded_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| b.get().is_some()).count()
    }

    fn block(&self, index: usize) -> Result<&ExternalBlock> {
        let cell = self
            .blocks
            .get(index)
            .ok_or(Error::Corrupt("block index out of range"))?;
        if let Some(block) = cell.get() {
            return Ok(block);
        }
        // Concurrent first touches may both load; the first published wins.
        let loaded = self.loader.load_block(index)?;
        log::debug!(
            "loaded external block {index} ({} rows, {} nulls)",
            loaded.len(),
            loaded.null_count()
        );
        Ok(cell.get_or_init(|| loaded))
    }

    pub fn try_get(&self, row_key: u64) -> Result<Option<Timestamp>> {
        Ok(Timestamp::from_nanos(self.try_get_raw(row_key)?))
    }
}

impl<L: BlockLoader> NanosStorage for ExternalStorage<L> {
    /// Reports load failures; `get_raw` logs them and reads null.
    fn try_get_raw(&self, row_key: u64) -> Result<i64> {
        match self.loader.locate(row_key) {
            Some((index, offset)) => Ok(self.block(index)?.get_raw(offset)),
            None => Ok(NULL_NANOS),
        }
    }

    fn try_get_prev_raw(&self, row_key: u64) -> Result<i64> {
        self.try_get_raw(row_key)
    }

    fn get_raw(&self, row_key: u64) -> i64 {
        self.try_get_raw(row_key).unwrap_or_else(|e| {
            log::error!("external read of row {row_key} failed: {e}");
            NULL_NANOS
        })
    }

    fn fill_raw(&self, rows: &RowKeyChunk, dest: &mut LongChunk, _prev: bool) -> Result<()> {
        dest.prepare(rows.len())?;
        for key in rows {
            dest.push(self.try_get_raw(key)?);
        }
        Ok(())
    }

    fn supports(&self, kind: ViewKind) -> bool {
        kind == ViewKind::Timestamp
    }

    fn is_immutable(&self) -> bool {
        true
    }
}

impl<L> fmt::Debug for ExternalStorage<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalStorage")
            .field("blocks", &self.blocks.len())
            .finish()
    }
}
