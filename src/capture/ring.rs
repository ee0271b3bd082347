//! Fixed-capacity circular buffer
//!
//! Backs the persisted log mirrors. Appends are O(1); once full, each
//! append evicts the oldest entry.

use std::collections::VecDeque;

/// Bounded FIFO that drops its oldest entry when full
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Build a buffer from existing entries, keeping only the newest `capacity`
    pub fn from_vec(capacity: usize, items: Vec<T>) -> Self {
        let mut ring = Self::new(capacity);
        ring.extend(items);
        ring
    }

    /// Append an entry, returning the evicted one if the buffer was full
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }

        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T> Extend<T> for RingBuffer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_full() {
        let mut ring = RingBuffer::new(3);
        assert!(ring.is_empty());

        assert_eq!(ring.push(1), None);
        assert_eq!(ring.push(2), None);
        assert_eq!(ring.push(3), None);
        assert_eq!(ring.len(), 3);

        assert_eq!(ring.push(4), Some(1));
        assert_eq!(ring.iter().cloned().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_keeps_most_recent_in_order() {
        let mut ring = RingBuffer::new(100);
        ring.extend(0..250);

        let items = ring.iter().cloned().collect::<Vec<_>>();
        assert_eq!(items.len(), 100);
        assert_eq!(items.first(), Some(&150));
        assert_eq!(items.last(), Some(&249));
        assert!(items.windows(2).all(|w| w[0] + 1 == w[1]));
    }

    #[test]
    fn test_from_vec_truncates_oldest() {
        let ring = RingBuffer::from_vec(2, vec!["a", "b", "c"]);
        assert_eq!(ring.iter().cloned().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut ring = RingBuffer::new(0);
        assert_eq!(ring.push(7), Some(7));
        assert!(ring.is_empty());
    }
}
