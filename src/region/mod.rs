//! Region partitioning of row-key space.
//!
//! A region is a fixed power-of-two shard: `index = key >> shift`,
//! `offset = key & (capacity - 1)`. Regions are resolved lazily through a
//! factory on first access, published once and never renumbered.

use crate::config::MAX_SHIFT;
use crate::time::{nanos_or_null, Timestamp, NULL_NANOS};
use crate::{Error, Result};

mod storage;
mod table;

pub use storage::RegionedStorage;
pub use table::{RegionFactory, RegionTable};

/// Fixed region geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionShape {
    shift: u32,
}

impl RegionShape {
    pub fn new(shift: u32) -> Result<Self> {
        if shift > MAX_SHIFT {
            return Err(Error::InvalidArgument(format!(
                "region shift {shift} exceeds {MAX_SHIFT}"
            )));
        }
        Ok(Self { shift })
    }

    pub fn shift(&self) -> u32 {
        self.shift
    }

    /// Row keys per region.
    pub fn capacity(&self) -> u64 {
        1 << self.shift
    }

    #[inline]
    pub fn region_index(&self, row_key: u64) -> u64 {
        row_key >> self.shift
    }

    #[inline]
    pub fn offset(&self, row_key: u64) -> usize {
        (row_key & (self.capacity() - 1)) as usize
    }

    /// First row key of region `index`, or `None` when the region lies
    /// beyond the row-key space.
    pub fn first_row_key(&self, index: u64) -> Option<u64> {
        (index <= u64::MAX >> self.shift).then(|| index << self.shift)
    }

    pub fn last_row_key(&self, index: u64) -> Option<u64> {
        self.first_row_key(index)?.checked_add(self.capacity() - 1)
    }
}

/// Read access to one region by offset, in raw nanoseconds.
pub trait Region: Send + Sync {
    fn get_long(&self, offset: usize) -> i64;

    fn get_prev_long(&self, offset: usize) -> i64 {
        self.get_long(offset)
    }
}

/// A region where every row is null.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRegion;

impl Region for NullRegion {
    fn get_long(&self, _offset: usize) -> i64 {
        NULL_NANOS
    }
}

/// A region backed by an array; offsets past its end read null.
#[derive(Debug, Clone)]
pub struct ArrayRegion {
    values: Box<[i64]>,
}

impl ArrayRegion {
    pub fn new(values: Vec<i64>) -> Self {
        Self {
            values: values.into_boxed_slice(),
        }
    }

    pub fn from_timestamps(values: &[Option<Timestamp>]) -> Self {
        Self::new(values.iter().copied().map(nanos_or_null).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Region for ArrayRegion {
    #[inline]
    fn get_long(&self, offset: usize) -> i64 {
        self.values.get(offset).copied().unwrap_or(NULL_NANOS)
    }
}
