//! Memory-mapped column file.
//!
//! Layout (little endian):
//!
//! ```text
//! header       64 bytes   magic "NTKCOL1\0", version u16, header_len u16,
//!                         block_shift u32, row_count u64, block_count u64,
//!                         32 reserved bytes
//! block table  block_count x { crc32 u32, null_count u32 }
//! values       row_count x i64
//! validity     ceil(row_count / 8) bytes, bit set = value present
//! ```
//!
//! A block's checksum covers its value bytes followed by its validity bytes.
//! Block shifts are at least 3 so every block owns whole validity bytes.

use std::path::Path;

use crate::column::external::{BlockLoader, ExternalBlock};
use crate::config::MAX_SHIFT;
use crate::mmap::{MmapFile, ReadOnlyMmap};
use crate::time::Timestamp;
use crate::{Error, Result};

pub const MAGIC: [u8; 8] = *b"NTKCOL1\0";
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 64;
const TABLE_ENTRY_LEN: usize = 8;
const MIN_BLOCK_SHIFT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileHeader {
    block_shift: u32,
    row_count: u64,
    block_count: u64,
}

impl FileHeader {
    fn new(block_shift: u32, row_count: u64) -> Self {
        let block_len = 1_u64 << block_shift;
        Self {
            block_shift,
            row_count,
            block_count: row_count.div_ceil(block_len),
        }
    }

    fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..8].copy_from_slice(&MAGIC);
        buf[8..10].copy_from_slice(&VERSION.to_le_bytes());
        buf[10..12].copy_from_slice(&(HEADER_LEN as u16).to_le_bytes());
        buf[12..16].copy_from_slice(&self.block_shift.to_le_bytes());
        buf[16..24].copy_from_slice(&self.row_count.to_le_bytes());
        buf[24..32].copy_from_slice(&self.block_count.to_le_bytes());
        buf
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Corrupt("column file header truncated"));
        }
        if bytes[0..8] != MAGIC {
            return Err(Error::Corrupt("bad column file magic"));
        }
        if u16::from_le_bytes([bytes[8], bytes[9]]) != VERSION {
            return Err(Error::Corrupt("unsupported column file version"));
        }
        if u16::from_le_bytes([bytes[10], bytes[11]]) as usize != HEADER_LEN {
            return Err(Error::Corrupt("unexpected column file header length"));
        }
        let block_shift = read_u32(&bytes[12..16]);
        if !(MIN_BLOCK_SHIFT..=MAX_SHIFT).contains(&block_shift) {
            return Err(Error::Corrupt("column file block shift out of range"));
        }
        let header = Self::new(block_shift, read_u64(&bytes[16..24]));
        if header.block_count != read_u64(&bytes[24..32]) {
            return Err(Error::Corrupt("block count disagrees with row count"));
        }
        header.checked_file_len()?;
        Ok(header)
    }

    fn table_offset(&self) -> usize {
        HEADER_LEN
    }

    fn values_offset(&self) -> usize {
        HEADER_LEN + self.block_count as usize * TABLE_ENTRY_LEN
    }

    fn validity_offset(&self) -> usize {
        self.values_offset() + self.row_count as usize * 8
    }

    fn file_len(&self) -> usize {
        self.validity_offset() + (self.row_count as usize).div_ceil(8)
    }

    /// Total length with every step checked. The unchecked offsets above are
    /// only used once this has succeeded.
    fn checked_file_len(&self) -> Result<usize> {
        let overflow = || Error::Corrupt("column file length overflows");
        let rows = usize::try_from(self.row_count).map_err(|_| overflow())?;
        let blocks = usize::try_from(self.block_count).map_err(|_| overflow())?;
        blocks
            .checked_mul(TABLE_ENTRY_LEN)
            .and_then(|table| HEADER_LEN.checked_add(table))
            .and_then(|at| rows.checked_mul(8).and_then(|values| at.checked_add(values)))
            .and_then(|at| at.checked_add(rows.div_ceil(8)))
            .ok_or_else(overflow)
    }

    /// First row and row count of a block.
    fn block_rows(&self, index: usize) -> (usize, usize) {
        let block_len = 1_usize << self.block_shift;
        let first = index * block_len;
        (first, block_len.min(self.row_count as usize - first))
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

fn block_crc(values: &[u8], validity: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(values);
    hasher.update(validity);
    hasher.finalize()
}

/// Write `values` as a column file with blocks of `1 << block_shift` rows.
pub fn write_column_file(
    path: &Path,
    values: &[Option<Timestamp>],
    block_shift: u32,
) -> Result<()> {
    if !(MIN_BLOCK_SHIFT..=MAX_SHIFT).contains(&block_shift) {
        return Err(Error::InvalidArgument(format!(
            "block shift {block_shift} outside {MIN_BLOCK_SHIFT}..={MAX_SHIFT}"
        )));
    }
    let header = FileHeader::new(block_shift, values.len() as u64);
    let mut file = MmapFile::create(path, header.checked_file_len()?)?;
    file.range_mut(0, HEADER_LEN)?
        .copy_from_slice(&header.to_bytes());

    let values_at = header.values_offset();
    let validity_at = header.validity_offset();
    {
        let out = file.range_mut(values_at, values.len() * 8)?;
        for (slot, value) in out.chunks_exact_mut(8).zip(values) {
            // Masked rows are stored as zero.
            let raw = value.map_or(0, Timestamp::nanos);
            slot.copy_from_slice(&raw.to_le_bytes());
        }
    }
    {
        let bits = file.range_mut(validity_at, values.len().div_ceil(8))?;
        for (i, value) in values.iter().enumerate() {
            if value.is_some() {
                bits[i / 8] |= 1 << (i % 8);
            }
        }
    }

    for index in 0..header.block_count as usize {
        let (first, len) = header.block_rows(index);
        let nulls = values[first..first + len].iter().filter(|v| v.is_none()).count();
        let crc = {
            let bytes = file.as_slice();
            let value_bytes = &bytes[values_at + first * 8..values_at + (first + len) * 8];
            let bit_bytes =
                &bytes[validity_at + first / 8..validity_at + (first + len).div_ceil(8)];
            block_crc(value_bytes, bit_bytes)
        };
        let entry =
            file.range_mut(header.table_offset() + index * TABLE_ENTRY_LEN, TABLE_ENTRY_LEN)?;
        entry[0..4].copy_from_slice(&crc.to_le_bytes());
        entry[4..8].copy_from_slice(&(nulls as u32).to_le_bytes());
    }

    file.sync()?;
    log::debug!(
        "wrote column file {} ({} rows, {} blocks)",
        path.display(),
        header.row_count,
        header.block_count
    );
    Ok(())
}

/// Raw longs convenience for [`write_column_file`]; the sentinel becomes a masked row.
pub fn write_raw_column_file(path: &Path, values: &[i64], block_shift: u32) -> Result<()> {
    let typed: Vec<Option<Timestamp>> = values.iter().map(|&v| Timestamp::from_nanos(v)).collect();
    write_column_file(path, &typed, block_shift)
}

/// Loads blocks from a mapped column file, verifying each block's checksum.
pub struct MmapBlockLoader {
    map: ReadOnlyMmap,
    header: FileHeader,
}

impl MmapBlockLoader {
    pub fn open(path: &Path) -> Result<Self> {
        let map = ReadOnlyMmap::open(path)?;
        let header = FileHeader::from_bytes(map.range(0, HEADER_LEN)?)?;
        if map.len() < header.file_len() {
            return Err(Error::Corrupt("column file truncated"));
        }
        log::debug!(
            "opened column file {} ({} rows, block shift {})",
            path.display(),
            header.row_count,
            header.block_shift
        );
        Ok(Self { map, header })
    }

    pub fn block_shift(&self) -> u32 {
        self.header.block_shift
    }
}

impl BlockLoader for MmapBlockLoader {
    fn row_count(&self) -> u64 {
        self.header.row_count
    }

    fn block_count(&self) -> usize {
        self.header.block_count as usize
    }

    fn locate(&self, row_key: u64) -> Option<(usize, usize)> {
        if row_key >= self.header.row_count {
            return None;
        }
        let shift = self.header.block_shift;
        let index = usize::try_from(row_key >> shift).ok()?;
        Some((index, (row_key & ((1 << shift) - 1)) as usize))
    }

    fn load_block(&self, index: usize) -> Result<ExternalBlock> {
        if index >= self.block_count() {
            return Err(Error::InvalidArgument(format!(
                "block {index} out of range ({} blocks)",
                self.block_count()
            )));
        }
        let entry = self
            .map
            .range(self.header.table_offset() + index * TABLE_ENTRY_LEN, TABLE_ENTRY_LEN)?;
        let expected_crc = read_u32(&entry[0..4]);
        let expected_nulls = read_u32(&entry[4..8]) as usize;

        let (first, len) = self.header.block_rows(index);
        let value_bytes = self.map.range(self.header.values_offset() + first * 8, len * 8)?;
        let bit_bytes = self
            .map
            .range(self.header.validity_offset() + first / 8, len.div_ceil(8))?;
        if block_crc(value_bytes, bit_bytes) != expected_crc {
            return Err(Error::Corrupt("column block crc mismatch"));
        }

        let values = value_bytes.chunks_exact(8).map(|b| read_u64(b) as i64).collect();
        let block = ExternalBlock::new(values, Some(bit_bytes.to_vec()))?;
        if block.null_count() != expected_nulls {
            return Err(Error::Corrupt("column block null count mismatch"));
        }
        Ok(block)
    }
}
