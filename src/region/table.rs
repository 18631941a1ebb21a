use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::region::RegionShape;

/// Builds the region at an index, or `None` when it has no data.
pub type RegionFactory<R> = Box<dyn Fn(u64) -> Option<Arc<R>> + Send + Sync>;

/// Lazily resolved regions, bounded by `max_regions`.
///
/// Each slot is resolved at most once; later readers see the published
/// region without locking. Indices at or past `max_regions` have no region.
pub struct RegionTable<R: ?Sized> {
    shape: RegionShape,
    slots: Box<[OnceLock<Option<Arc<R>>>]>,
    factory: RegionFactory<R>,
}

impl<R: ?Sized> RegionTable<R> {
    pub fn new(shape: RegionShape, max_regions: usize, factory: RegionFactory<R>) -> Self {
        let slots = (0..max_regions).map(|_| OnceLock::new()).collect();
        Self {
            shape,
            slots,
            factory,
        }
    }

    /// Regions known up front; later indices have none.
    pub fn from_regions(shape: RegionShape, regions: Vec<Arc<R>>) -> Self
    where
        R: 'static,
    {
        let slots: Box<[OnceLock<Option<Arc<R>>>]> = regions
            .into_iter()
            .map(|region| OnceLock::from(Some(region)))
            .collect();
        Self {
            shape,
            slots,
            factory: Box::new(|_| None),
        }
    }

    pub fn shape(&self) -> RegionShape {
        self.shape
    }

    pub fn max_regions(&self) -> usize {
        self.slots.len()
    }

    /// The region at `index`, resolving it on first access.
    pub fn region(&self, index: u64) -> Option<&Arc<R>> {
        let slot = self.slots.get(usize::try_from(index).ok()?)?;
        slot.get_or_init(|| {
            let region = (self.factory)(index);
            log::debug!(
                "resolved region {index} ({})",
                if region.is_some() { "present" } else { "absent" }
            );
            region
        })
        .as_ref()
    }

    /// Whether `index` has been resolved, without resolving it.
    pub fn is_resolved(&self, index: u64) -> bool {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.slots.get(i))
            .is_some_and(|slot| slot.get().is_some())
    }

    pub fn resolved_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.get().is_some()).count()
    }
}

impl<R: ?Sized> fmt::Debug for RegionTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionTable")
            .field("shape", &self.shape)
            .field("max_regions", &self.slots.len())
            .field("resolved", &self.resolved_count())
            .finish()
    }
}
