//! Bounded, reusable batch buffers for vectorised column access.

use crate::time::Timestamp;
use crate::{Error, Result};

/// A fixed-capacity buffer refilled once per batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk<T> {
    data: Vec<T>,
    capacity: usize,
}

/// Raw nanosecond values; nulls are [`crate::time::NULL_NANOS`].
pub type LongChunk = Chunk<i64>;
/// Typed timestamps; nulls are `None`.
pub type TimestampChunk = Chunk<Option<Timestamp>>;
/// Row keys of one batch.
pub type RowKeyChunk = Chunk<u64>;

impl<T: Copy> Chunk<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Clear the chunk and check that `n` values will fit.
    pub fn prepare(&mut self, n: usize) -> Result<()> {
        if n > self.capacity {
            return Err(Error::InvalidArgument(format!(
                "chunk of capacity {} cannot hold {n} values",
                self.capacity
            )));
        }
        self.data.clear();
        Ok(())
    }

    /// Append a value. Callers size the batch with [`Chunk::prepare`] first.
    #[inline]
    pub fn push(&mut self, value: T) {
        debug_assert!(self.data.len() < self.capacity, "chunk overfilled");
        self.data.push(value);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.data.get(index).copied()
    }

    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, T>> {
        self.data.iter().copied()
    }
}

impl<'a, T: Copy> IntoIterator for &'a Chunk<T> {
    type Item = T;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_bounds_the_batch() {
        let mut chunk = LongChunk::with_capacity(2);
        chunk.prepare(2).expect("fits");
        chunk.push(1);
        chunk.push(2);
        assert!(chunk.is_full());
        assert_eq!(chunk.as_slice(), &[1, 2]);

        chunk.prepare(1).expect("fits");
        assert!(chunk.is_empty());
        assert!(matches!(chunk.prepare(3), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn iterates_by_value() {
        let mut chunk = RowKeyChunk::with_capacity(4);
        chunk.prepare(3).expect("fits");
        for key in [3, 5, 7] {
            chunk.push(key);
        }
        let keys: Vec<u64> = (&chunk).into_iter().collect();
        assert_eq!(keys, vec![3, 5, 7]);
        assert_eq!(chunk.get(1), Some(5));
        assert_eq!(chunk.get(3), None);
    }
}
