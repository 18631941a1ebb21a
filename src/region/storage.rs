use std::fmt;
use std::sync::Arc;

use crate::chunk::{LongChunk, RowKeyChunk};
use crate::column::NanosStorage;
use crate::config::NanotickConfig;
use crate::region::{Region, RegionFactory, RegionShape, RegionTable};
use crate::time::NULL_NANOS;
use crate::Result;

/// Read-only storage that delegates each row key to its region.
///
/// Values stay raw; the typed view converts. Keys in missing regions read null.
pub struct RegionedStorage<R: ?Sized> {
    table: RegionTable<R>,
}

impl<R: ?Sized> fmt::Debug for RegionedStorage<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionedStorage")
            .field("table", &self.table)
            .finish()
    }
}

impl<R: Region + ?Sized + 'static> RegionedStorage<R> {
    pub fn new(table: RegionTable<R>) -> Self {
        Self { table }
    }

    pub fn from_config(
        config: &NanotickConfig,
        max_regions: usize,
        factory: RegionFactory<R>,
    ) -> Result<Self> {
        let shape = RegionShape::new(config.region_shift)?;
        Ok(Self::new(RegionTable::new(shape, max_regions, factory)))
    }

    pub fn table(&self) -> &RegionTable<R> {
        &self.table
    }

    fn region_of(&self, row_key: u64) -> Option<(&Arc<R>, usize)> {
        let shape = self.table.shape();
        self.table
            .region(shape.region_index(row_key))
            .map(|region| (region, shape.offset(row_key)))
    }
}

impl<R: Region + ?Sized + 'static> NanosStorage for RegionedStorage<R> {
    #[inline]
    fn get_raw(&self, row_key: u64) -> i64 {
        self.region_of(row_key)
            .map_or(NULL_NANOS, |(region, offset)| region.get_long(offset))
    }

    #[inline]
    fn get_prev_raw(&self, row_key: u64) -> i64 {
        self.region_of(row_key)
            .map_or(NULL_NANOS, |(region, offset)| region.get_prev_long(offset))
    }

    fn fill_raw(&self, rows: &RowKeyChunk, dest: &mut LongChunk, prev: bool) -> Result<()> {
        dest.prepare(rows.len())?;
        let shape = self.table.shape();
        // Row keys are usually clustered; resolve each run's region once.
        let mut current: Option<(u64, Option<&Arc<R>>)> = None;
        for key in rows {
            let index = shape.region_index(key);
            let region = match current {
                Some((i, region)) if i == index => region,
                _ => {
                    let region = self.table.region(index);
                    current = Some((index, region));
                    region
                }
            };
            let offset = shape.offset(key);
            dest.push(match region {
                Some(r) if prev => r.get_prev_long(offset),
                Some(r) => r.get_long(offset),
                None => NULL_NANOS,
            });
        }
        Ok(())
    }

    fn is_immutable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{LongSource, TimestampColumn, TimestampSource};
    use crate::region::ArrayRegion;
    use crate::time::Timestamp;

    fn storage() -> RegionedStorage<dyn Region> {
        let config = NanotickConfig::default();
        RegionedStorage::from_config(
            &config,
            4,
            Box::new(|index| {
                (index == 1).then(|| {
                    let mut values = vec![NULL_NANOS; 4_465];
                    values[4_464] = 1_700_000_000_000_000_000;
                    Arc::new(ArrayRegion::new(values)) as Arc<dyn Region>
                })
            }),
        )
        .expect("storage")
    }

    #[test]
    fn reads_delegate_to_region_offsets() {
        let storage = storage();
        assert_eq!(storage.get_raw(70_000), 1_700_000_000_000_000_000);
        assert_eq!(storage.get_raw(69_999), NULL_NANOS);
        assert_eq!(storage.get_raw(5), NULL_NANOS);
        assert_eq!(storage.get_raw(u64::MAX), NULL_NANOS);
        assert_eq!(storage.get_prev_raw(70_000), 1_700_000_000_000_000_000);
    }

    #[test]
    fn views_share_regioned_storage() {
        let typed = Arc::new(TimestampColumn::from_storage(storage()).expect("typed"));
        assert_eq!(
            typed.get(70_000),
            Timestamp::from_nanos(1_700_000_000_000_000_000)
        );
        let long = typed.as_long().expect("long");
        assert_eq!(long.get_long(70_000), 1_700_000_000_000_000_000);

        let mut rows = RowKeyChunk::with_capacity(3);
        for key in [0, 70_000, 70_001] {
            rows.push(key);
        }
        let mut dest = LongChunk::with_capacity(3);
        long.fill_chunk(&rows, &mut dest).expect("fill");
        assert_eq!(
            dest.as_slice(),
            &[NULL_NANOS, 1_700_000_000_000_000_000, NULL_NANOS]
        );
        assert_eq!(long.storage().table().resolved_count(), 2);
    }
}
