use std::fs::{File, OpenOptions};
use std::path::Path;

use memmap2::{Mmap, MmapMut, MmapOptions};

use crate::{Error, Result};

fn checked_range(offset: usize, len: usize, total: usize) -> Result<std::ops::Range<usize>> {
    let end = offset.checked_add(len).ok_or(Error::Corrupt("range overflow"))?;
    if end > total {
        return Err(Error::Corrupt("range out of bounds"));
    }
    Ok(offset..end)
}

/// Writable mapping of a freshly created file.
pub struct MmapFile {
    file: File,
    map: MmapMut,
    len: usize,
}

impl MmapFile {
    pub fn create(path: &Path, len: usize) -> Result<Self> {
        if len == 0 {
            return Err(Error::InvalidArgument("mmap length must be non-zero".into()));
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.set_len(len as u64)?;
        // SAFETY: the file was just created and sized by us; no other mapping exists.
        let map = unsafe { MmapOptions::new().len(len).map_mut(&file)? };
        Ok(Self { file, map, len })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.map
    }

    pub fn range_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8]> {
        let range = checked_range(offset, len, self.len)?;
        Ok(&mut self.map[range])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Flush the mapping and the file metadata to disk.
    pub fn sync(&self) -> Result<()> {
        self.map.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

/// Read-only mapping of an existing file.
pub struct ReadOnlyMmap {
    map: Mmap,
}

impl ReadOnlyMmap {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;
        if len == 0 {
            return Err(Error::Corrupt("mapped file is empty"));
        }
        // SAFETY: mapped read-only; callers must not truncate the file while it is open.
        let map = unsafe { MmapOptions::new().len(len).map(&file)? };
        Ok(Self { map })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.map
    }

    pub fn range(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let range = checked_range(offset, len, self.map.len())?;
        Ok(&self.map[range])
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_map_read_only() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("col.ntk");

        let mut file = MmapFile::create(&path, 16).expect("create");
        file.range_mut(8, 8)
            .expect("range")
            .copy_from_slice(&42_i64.to_le_bytes());
        file.sync().expect("sync");
        drop(file);

        let map = ReadOnlyMmap::open(&path).expect("open");
        assert_eq!(map.len(), 16);
        assert_eq!(map.range(8, 8).expect("range"), &42_i64.to_le_bytes());
        assert!(matches!(map.range(12, 8), Err(Error::Corrupt(_))));
        assert!(matches!(map.range(usize::MAX, 2), Err(Error::Corrupt(_))));
    }

    #[test]
    fn zero_length_is_rejected() {
        let dir = tempdir().expect("tempdir");
        assert!(MmapFile::create(&dir.path().join("empty"), 0).is_err());
        std::fs::write(dir.path().join("empty2"), b"").expect("write");
        assert!(ReadOnlyMmap::open(&dir.path().join("empty2")).is_err());
    }
}
