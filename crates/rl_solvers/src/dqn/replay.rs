//! Bounded experience replay.

use rand::Rng;
use std::collections::VecDeque;

/// A FIFO buffer of past experiences with a fixed capacity.
///
/// Pushing into a full buffer evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct ReplayBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> ReplayBuffer<T> {
    /// Creates an empty buffer. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            // Large capacities fill up lazily.
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Appends `item`, returning the evicted entry if the buffer was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Picks an entry uniformly.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&T> {
        if self.items.is_empty() {
            return None;
        }
        self.items.get(rng.random_range(0..self.items.len()))
    }

    /// Entry `index`, oldest first.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Iterates oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fifo_eviction() {
        let mut buffer = ReplayBuffer::new(3);
        assert_eq!(buffer.push(1), None);
        assert_eq!(buffer.push(2), None);
        assert_eq!(buffer.push(3), None);
        assert!(buffer.is_full());

        assert_eq!(buffer.push(4), Some(1));
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut buffer = ReplayBuffer::new(5);
        for i in 0..100 {
            buffer.push(i);
            assert!(buffer.len() <= 5);
        }
        assert_eq!(buffer.get(0), Some(&95));
    }

    #[test]
    fn test_sample() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut buffer = ReplayBuffer::new(4);
        assert!(buffer.sample(&mut rng).is_none());

        buffer.push("a");
        buffer.push("b");
        for _ in 0..20 {
            let s = *buffer.sample(&mut rng).unwrap();
            assert!(s == "a" || s == "b");
        }
    }

    #[test]
    fn test_clear_and_zero_capacity() {
        let mut buffer = ReplayBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.push(1);
        buffer.push(2);
        assert_eq!(buffer.len(), 1);
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
