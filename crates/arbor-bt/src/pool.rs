//! Recycled backing storage for root slots.

use std::collections::HashMap;

use parking_lot::Mutex;

pub const DEFAULT_MAX_PER_BUCKET: usize = 10;

/// A pool of empty vectors bucketed by capacity.
///
/// Trees rent a larger vector when their root storage grows and give the old one back, as well
/// as their final storage on dispose. Each bucket keeps at most `max_per_bucket` vectors.
pub struct BufferPool<T> {
    buckets: Mutex<HashMap<usize, Vec<Vec<T>>>>,
    max_per_bucket: usize,
}

impl<T> Default for BufferPool<T> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PER_BUCKET)
    }
}

impl<T> BufferPool<T> {
    pub fn new(max_per_bucket: usize) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            max_per_bucket,
        }
    }

    /// An empty vector with room for at least `capacity` elements.
    pub fn rent(&self, capacity: usize) -> Vec<T> {
        let reused = self
            .buckets
            .lock()
            .get_mut(&capacity)
            .and_then(|bucket| bucket.pop());
        match reused {
            Some(buffer) => buffer,
            None => Vec::with_capacity(capacity),
        }
    }

    /// Clear `buffer` and keep it for a later `rent` of the same capacity.
    pub fn give_back(&self, mut buffer: Vec<T>) {
        buffer.clear();
        let capacity = buffer.capacity();
        if capacity == 0 {
            return;
        }
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(capacity).or_default();
        if bucket.len() < self.max_per_bucket {
            bucket.push(buffer);
        }
    }

    /// Buffers currently held, across all buckets.
    pub fn pooled(&self) -> usize {
        self.buckets.lock().values().map(Vec::len).sum()
    }
}

impl<T> std::fmt::Debug for BufferPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("pooled", &self.pooled())
            .field("max_per_bucket", &self.max_per_bucket)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returned_buffers_are_reused_by_capacity() {
        let pool: BufferPool<u32> = BufferPool::default();
        let mut buffer = pool.rent(12);
        buffer.extend([1, 2, 3]);
        let capacity = buffer.capacity();
        pool.give_back(buffer);
        assert_eq!(pool.pooled(), 1);

        let again = pool.rent(capacity);
        assert!(again.is_empty());
        assert_eq!(again.capacity(), capacity);
        assert_eq!(pool.pooled(), 0);
    }

    #[test]
    fn buckets_are_bounded() {
        let pool: BufferPool<u8> = BufferPool::new(2);
        for _ in 0..5 {
            pool.give_back(Vec::with_capacity(4));
        }
        assert_eq!(pool.pooled(), 2);
    }
}
