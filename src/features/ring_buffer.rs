//! Fixed-capacity history buffer shared by the feature aggregator and the
//! windowed policies.

use std::collections::VecDeque;

/// Bounded FIFO: pushing onto a full buffer evicts the oldest element.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer. A capacity of zero is raised to one.
    ///
    /// Storage grows with use up to `capacity`; nothing is reserved up front.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append `item`, returning the evicted element if the buffer was full.
    pub fn push(&mut self, item: T) -> Option<T> {
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

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest retained element.
    pub fn oldest(&self) -> Option<&T> {
        self.items.front()
    }

    /// Most recently pushed element.
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }
}

impl<T: Copy, const N: usize> RingBuffer<[T; N]> {
    /// Concatenate the buffered rows in temporal order.
    pub fn flatten(&self) -> Vec<T> {
        self.items.iter().flat_map(|row| row.iter().copied()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_on_overflow() {
        let mut buf = RingBuffer::new(3);
        assert_eq!(buf.push(1), None);
        assert_eq!(buf.push(2), None);
        assert_eq!(buf.push(3), None);
        assert!(buf.is_full());

        assert_eq!(buf.push(4), Some(1));
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.oldest(), Some(&2));
        assert_eq!(buf.latest(), Some(&4));
        assert_eq!(buf.push(5), Some(2));
        assert_eq!(buf.oldest(), Some(&3));
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut buf = RingBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        buf.push("a");
        assert_eq!(buf.push("b"), Some("a"));
        assert_eq!(buf.latest(), Some(&"b"));
    }

    #[test]
    fn test_flatten_keeps_temporal_order() {
        let mut buf = RingBuffer::new(2);
        buf.push([1.0, 2.0]);
        buf.push([3.0, 4.0]);
        buf.push([5.0, 6.0]);

        assert_eq!(buf.flatten(), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_large_capacity_allocates_lazily() {
        let mut buf = RingBuffer::new(2_000_000_000);
        buf.push([1.0; 4]);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.capacity(), 2_000_000_000);
        assert!(!buf.is_full());
    }
}
