//! Ordered row-key sets stored as disjoint ascending inclusive ranges.
//!
//! # Design
//!
//! A [`RowSet`] keeps its keys as `[first, last]` ranges that are sorted,
//! disjoint and never adjacent (touching ranges are merged). A prefix count
//! per range gives O(log n) positional access, which the sorted filter path
//! uses to binary search by position.

use std::fmt;

use crate::chunk::RowKeyChunk;
use crate::{Error, Result};

/// Largest usable row key; `u64::MAX` is reserved so a set's size fits a `u64`.
pub const MAX_ROW_KEY: u64 = u64::MAX - 1;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    ranges: Vec<(u64, u64)>,
    /// Number of keys before each range.
    starts: Vec<u64>,
    size: u64,
}

impl RowSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// All keys in `[first, last]`. Empty when `first > last`; `last` is
    /// clamped to [`MAX_ROW_KEY`].
    pub fn from_range(first: u64, last: u64) -> Self {
        if first > last {
            return Self::empty();
        }
        Self::from_normalized(vec![(first, last)])
    }

    /// Build from keys in any order; duplicates collapse.
    pub fn from_unsorted(keys: impl IntoIterator<Item = u64>) -> Self {
        let mut keys: Vec<u64> = keys.into_iter().collect();
        keys.sort_unstable();
        keys.dedup();
        let mut builder = RowSetBuilder::new();
        for key in keys {
            builder.push_key_unchecked(key);
        }
        builder.build()
    }

    /// Keys above [`MAX_ROW_KEY`] are dropped, so the size always fits a `u64`.
    fn from_normalized(mut ranges: Vec<(u64, u64)>) -> Self {
        ranges.retain_mut(|range| {
            range.1 = range.1.min(MAX_ROW_KEY);
            range.0 <= range.1
        });
        let mut starts = Vec::with_capacity(ranges.len());
        let mut size = 0_u64;
        for &(first, last) in &ranges {
            starts.push(size);
            // Disjoint ranges within [0, MAX_ROW_KEY] hold at most u64::MAX keys.
            size += last - first + 1;
        }
        Self {
            ranges,
            starts,
            size,
        }
    }

    fn normalize(mut ranges: Vec<(u64, u64)>) -> Self {
        ranges.sort_unstable();
        let mut merged: Vec<(u64, u64)> = Vec::with_capacity(ranges.len());
        for (first, last) in ranges {
            match merged.last_mut() {
                Some(prev) if first <= prev.1.saturating_add(1) => prev.1 = prev.1.max(last),
                _ => merged.push((first, last)),
            }
        }
        Self::from_normalized(merged)
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn first_key(&self) -> Option<u64> {
        self.ranges.first().map(|r| r.0)
    }

    pub fn last_key(&self) -> Option<u64> {
        self.ranges.last().map(|r| r.1)
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn ranges(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.ranges.iter().copied()
    }

    pub fn contains(&self, key: u64) -> bool {
        self.find(key).is_some()
    }

    /// Key at `position` in ascending order.
    pub fn get(&self, position: u64) -> Option<u64> {
        if position >= self.size {
            return None;
        }
        let idx = self.starts.partition_point(|&s| s <= position) - 1;
        Some(self.ranges[idx].0 + (position - self.starts[idx]))
    }

    /// Position of `key`, if present.
    pub fn find(&self, key: u64) -> Option<u64> {
        let idx = self.ranges.partition_point(|r| r.1 < key);
        let &(first, _) = self.ranges.get(idx)?;
        (first <= key).then(|| self.starts[idx] + (key - first))
    }

    /// Keys at positions `[start, end)`; `end` is clamped to the size.
    pub fn sub_set_by_position_range(&self, start: u64, end: u64) -> RowSet {
        let end = end.min(self.size);
        if start >= end {
            return RowSet::empty();
        }
        let first_idx = self.starts.partition_point(|&s| s <= start) - 1;
        let mut out = Vec::new();
        for idx in first_idx..self.ranges.len() {
            let range_start_pos = self.starts[idx];
            if range_start_pos >= end {
                break;
            }
            let (first, last) = self.ranges[idx];
            let lo = first + start.saturating_sub(range_start_pos);
            let hi = if end - range_start_pos <= last - first {
                first + (end - range_start_pos) - 1
            } else {
                last
            };
            out.push((lo, hi));
        }
        Self::from_normalized(out)
    }

    pub fn insert_range(&mut self, first: u64, last: u64) {
        if first > last {
            return;
        }
        let mut ranges = std::mem::take(&mut self.ranges);
        ranges.push((first, last));
        *self = Self::normalize(ranges);
    }

    pub fn insert(&mut self, key: u64) {
        self.insert_range(key, key);
    }

    pub fn remove_range(&mut self, first: u64, last: u64) {
        if first > last || self.is_empty() {
            return;
        }
        let mut out = Vec::with_capacity(self.ranges.len() + 1);
        for &(a, b) in &self.ranges {
            if b < first || a > last {
                out.push((a, b));
                continue;
            }
            if a < first {
                out.push((a, first - 1));
            }
            if b > last {
                out.push((last + 1, b));
            }
        }
        *self = Self::from_normalized(out);
    }

    pub fn union(&self, other: &RowSet) -> RowSet {
        let mut ranges = self.ranges.clone();
        ranges.extend_from_slice(&other.ranges);
        Self::normalize(ranges)
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            ranges: &self.ranges,
            front: (0, self.ranges.first().map_or(0, |r| r.0)),
            back: (
                self.ranges.len().saturating_sub(1),
                self.ranges.last().map_or(0, |r| r.1),
            ),
            remaining: self.size,
        }
    }

    /// Batches of at most `batch` keys, in order.
    pub fn chunks(&self, batch: usize) -> Chunks<'_> {
        Chunks {
            iter: self.iter(),
            batch: batch.max(1),
        }
    }
}

impl fmt::Debug for RowSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RowSet{")?;
        for (i, (first, last)) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if first == last {
                write!(f, "{first}")?;
            } else {
                write!(f, "{first}-{last}")?;
            }
        }
        f.write_str("}")
    }
}

impl FromIterator<u64> for RowSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        RowSet::from_unsorted(iter)
    }
}

impl<'a> IntoIterator for &'a RowSet {
    type Item = u64;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Forward and reverse iteration over the keys of a [`RowSet`].
pub struct Iter<'a> {
    ranges: &'a [(u64, u64)],
    front: (usize, u64),
    back: (usize, u64),
    remaining: u64,
}

impl Iterator for Iter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let (idx, key) = self.front;
        if key == self.ranges[idx].1 {
            if let Some(next) = self.ranges.get(idx + 1) {
                self.front = (idx + 1, next.0);
            }
        } else {
            self.front.1 = key + 1;
        }
        Some(key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<u64> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let (idx, key) = self.back;
        if key == self.ranges[idx].0 {
            if idx > 0 {
                self.back = (idx - 1, self.ranges[idx - 1].1);
            }
        } else {
            self.back.1 = key - 1;
        }
        Some(key)
    }
}

impl ExactSizeIterator for Iter<'_> {}

/// Batch iterator returned by [`RowSet::chunks`].
pub struct Chunks<'a> {
    iter: Iter<'a>,
    batch: usize,
}

impl Chunks<'_> {
    /// Refill `dest` with the next batch. Returns `false` once exhausted.
    pub fn next_into(&mut self, dest: &mut RowKeyChunk) -> Result<bool> {
        let n = self.batch.min(self.iter.len());
        if n == 0 {
            dest.clear();
            return Ok(false);
        }
        dest.prepare(n)?;
        for key in self.iter.by_ref().take(n) {
            dest.push(key);
        }
        Ok(true)
    }
}

/// Appends keys or ranges in ascending order.
#[derive(Debug, Default)]
pub struct RowSetBuilder {
    ranges: Vec<(u64, u64)>,
}

impl RowSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_key_unchecked(&mut self, key: u64) {
        match self.ranges.last_mut() {
            Some(last) if last.1.checked_add(1) == Some(key) => last.1 = key,
            _ => self.ranges.push((key, key)),
        }
    }

    pub fn append_key(&mut self, key: u64) -> Result<()> {
        self.append_range(key, key)
    }

    pub fn append_range(&mut self, first: u64, last: u64) -> Result<()> {
        if first > last {
            return Err(Error::InvalidArgument(format!("empty range [{first}, {last}]")));
        }
        match self.ranges.last_mut() {
            Some(prev) if first <= prev.1 => Err(Error::InvalidArgument(format!(
                "row key {first} is not after {}",
                prev.1
            ))),
            Some(prev) if first == prev.1 + 1 => {
                prev.1 = last;
                Ok(())
            }
            _ => {
                self.ranges.push((first, last));
                Ok(())
            }
        }
    }

    pub fn build(self) -> RowSet {
        RowSet::from_normalized(self.ranges)
    }
}

/// A row set that also remembers its contents at the start of the cycle.
#[derive(Debug, Clone, Default)]
pub struct TrackingRowSet {
    current: RowSet,
    prev: RowSet,
}

impl TrackingRowSet {
    pub fn new(initial: RowSet) -> Self {
        Self {
            prev: initial.clone(),
            current: initial,
        }
    }

    pub fn current(&self) -> &RowSet {
        &self.current
    }

    /// Contents as of the last [`TrackingRowSet::finish_cycle`].
    pub fn prev(&self) -> &RowSet {
        &self.prev
    }

    pub fn insert_range(&mut self, first: u64, last: u64) {
        self.current.insert_range(first, last);
    }

    pub fn remove_range(&mut self, first: u64, last: u64) {
        self.current.remove_range(first, last);
    }

    pub fn finish_cycle(&mut self) {
        self.prev = self.current.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rs(keys: &[u64]) -> RowSet {
        keys.iter().copied().collect()
    }

    #[test]
    fn keys_collapse_into_ranges() {
        let set = rs(&[9, 1, 2, 3, 7, 8, 3]);
        assert_eq!(set.size(), 6);
        assert_eq!(set.range_count(), 2);
        assert_eq!(format!("{set:?}"), "RowSet{1-3,7-9}");
        assert_eq!(set.first_key(), Some(1));
        assert_eq!(set.last_key(), Some(9));
    }

    #[test]
    fn whole_key_space_is_clamped_not_overflowed() {
        let all = RowSet::from_range(0, u64::MAX);
        assert_eq!(all.size(), u64::MAX);
        assert_eq!(all.last_key(), Some(MAX_ROW_KEY));
        assert!(!all.contains(u64::MAX));
        assert_eq!(all.get(u64::MAX - 1), Some(MAX_ROW_KEY));

        assert!(RowSet::from_range(u64::MAX, u64::MAX).is_empty());
        let mut set = rs(&[3]);
        set.insert_range(MAX_ROW_KEY, u64::MAX);
        assert_eq!(set.size(), 2);
    }

    #[test]
    fn forward_and_reverse_iteration() {
        let set = rs(&[1, 2, 5, 9, 10]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 2, 5, 9, 10]);
        assert_eq!(set.iter().rev().collect::<Vec<_>>(), vec![10, 9, 5, 2, 1]);

        let mut it = set.iter();
        assert_eq!(it.next(), Some(1));
        assert_eq!(it.next_back(), Some(10));
        assert_eq!(it.len(), 3);
        assert_eq!(it.collect::<Vec<_>>(), vec![2, 5, 9]);
        assert_eq!(RowSet::empty().iter().next_back(), None);
    }

    #[test]
    fn positional_access() {
        let set = rs(&[10, 11, 12, 20, 30, 31]);
        assert_eq!(set.get(0), Some(10));
        assert_eq!(set.get(3), Some(20));
        assert_eq!(set.get(5), Some(31));
        assert_eq!(set.get(6), None);
        assert_eq!(set.find(30), Some(4));
        assert_eq!(set.find(13), None);
        assert!(set.contains(11));
    }

    #[test]
    fn sub_set_by_position() {
        let set = rs(&[10, 11, 12, 20, 30, 31]);
        assert_eq!(set.sub_set_by_position_range(1, 5), rs(&[11, 12, 20, 30]));
        assert_eq!(set.sub_set_by_position_range(3, 100), rs(&[20, 30, 31]));
        assert_eq!(set.sub_set_by_position_range(2, 3), rs(&[12]));
        assert!(set.sub_set_by_position_range(4, 4).is_empty());
        assert_eq!(set.sub_set_by_position_range(0, 6), set);
    }

    #[test]
    fn insert_and_remove() {
        let mut set = RowSet::from_range(0, 9);
        set.remove_range(3, 5);
        assert_eq!(set, rs(&[0, 1, 2, 6, 7, 8, 9]));
        set.insert_range(4, 4);
        set.insert(3);
        assert_eq!(set.range_count(), 2);
        set.insert_range(5, 5);
        assert_eq!(set, RowSet::from_range(0, 9));
        set.insert(u64::MAX);
        assert_eq!(set.last_key(), Some(u64::MAX));
        assert_eq!(set.union(&rs(&[10])).range_count(), 2);
    }

    #[test]
    fn builder_requires_ascending_keys() {
        let mut builder = RowSetBuilder::new();
        builder.append_key(1).expect("first");
        builder.append_range(2, 4).expect("adjacent");
        builder.append_key(8).expect("gap");
        assert!(builder.append_key(8).is_err());
        assert!(builder.append_range(9, 7).is_err());
        let set = builder.build();
        assert_eq!(set, rs(&[1, 2, 3, 4, 8]));
    }

    #[test]
    fn chunks_cover_every_key_once() {
        let set = RowSet::from_range(0, 9);
        let mut chunks = set.chunks(4);
        let mut dest = RowKeyChunk::with_capacity(4);
        let mut sizes = Vec::new();
        let mut seen = Vec::new();
        while chunks.next_into(&mut dest).expect("fits") {
            sizes.push(dest.len());
            seen.extend(dest.iter());
        }
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn tracking_keeps_the_previous_cycle() {
        let mut tracking = TrackingRowSet::new(RowSet::from_range(0, 4));
        tracking.insert_range(5, 6);
        tracking.remove_range(0, 0);
        assert_eq!(tracking.current(), &RowSet::from_range(1, 6));
        assert_eq!(tracking.prev(), &RowSet::from_range(0, 4));
        tracking.finish_cycle();
        assert_eq!(tracking.prev(), &RowSet::from_range(1, 6));
    }
}
