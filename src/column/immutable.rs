//! Read-only storage tiers. Previous values always equal current values.

use std::collections::BTreeMap;

use crate::chunk::{LongChunk, RowKeyChunk};
use crate::column::storage::NanosStorage;
use crate::time::{nanos_or_null, Timestamp, NULL_NANOS};
use crate::Result;

/// One contiguous array fixed at construction.
#[derive(Debug, Clone)]
pub struct FlatStorage {
    values: Box<[i64]>,
}

impl FlatStorage {
    pub fn from_raw(values: Vec<i64>) -> Self {
        Self {
            values: values.into_boxed_slice(),
        }
    }

    pub fn from_timestamps(values: &[Option<Timestamp>]) -> Self {
        Self::from_raw(values.iter().copied().map(nanos_or_null).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.values
    }
}

impl NanosStorage for FlatStorage {
    #[inline]
    fn get_raw(&self, row_key: u64) -> i64 {
        usize::try_from(row_key)
            .ok()
            .and_then(|i| self.values.get(i).copied())
            .unwrap_or(NULL_NANOS)
    }

    fn fill_raw(&self, rows: &RowKeyChunk, dest: &mut LongChunk, _prev: bool) -> Result<()> {
        dest.prepare(rows.len())?;
        for key in rows {
            dest.push(self.get_raw(key));
        }
        Ok(())
    }

    fn is_immutable(&self) -> bool {
        true
    }
}

/// Fixed-size pages indexed by `row_key >> shift`; absent pages read as null.
#[derive(Debug, Clone)]
pub struct PagedStorage {
    shift: u32,
    pages: BTreeMap<u64, Box<[i64]>>,
}

impl PagedStorage {
    /// Pages must each hold exactly `1 << shift` values.
    pub(crate) fn from_pages(shift: u32, pages: BTreeMap<u64, Box<[i64]>>) -> Self {
        debug_assert!(pages.values().all(|p| p.len() == 1_usize << shift));
        Self { shift, pages }
    }

    /// Split `values` into pages of `1 << shift` rows.
    pub fn from_raw(shift: u32, values: &[i64]) -> Self {
        let page_len = 1_usize << shift;
        let pages = values
            .chunks(page_len)
            .enumerate()
            .map(|(index, chunk)| {
                let mut page = vec![NULL_NANOS; page_len];
                page[..chunk.len()].copy_from_slice(chunk);
                (index as u64, page.into_boxed_slice())
            })
            .collect();
        Self { shift, pages }
    }

    pub fn page_shift(&self) -> u32 {
        self.shift
    }

    /// Number of pages holding values.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

impl NanosStorage for PagedStorage {
    #[inline]
    fn get_raw(&self, row_key: u64) -> i64 {
        let mask = (1_u64 << self.shift) - 1;
        self.pages
            .get(&(row_key >> self.shift))
            .map_or(NULL_NANOS, |page| page[(row_key & mask) as usize])
    }

    fn is_immutable(&self) -> bool {
        true
    }
}

/// A single value broadcast to every row key.
#[derive(Debug, Clone, Copy)]
pub struct ConstantStorage {
    value: i64,
}

impl ConstantStorage {
    pub fn new(value: Option<Timestamp>) -> Self {
        Self {
            value: nanos_or_null(value),
        }
    }

    pub fn from_raw(value: i64) -> Self {
        Self { value }
    }
}

impl NanosStorage for ConstantStorage {
    #[inline]
    fn get_raw(&self, _row_key: u64) -> i64 {
        self.value
    }

    fn fill_raw(&self, rows: &RowKeyChunk, dest: &mut LongChunk, _prev: bool) -> Result<()> {
        dest.prepare(rows.len())?;
        for _ in 0..rows.len() {
            dest.push(self.value);
        }
        Ok(())
    }

    fn is_immutable(&self) -> bool {
        true
    }
}
