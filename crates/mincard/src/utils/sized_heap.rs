//! A helper struct for maintaining the `k` nearest candidates of a query.

use std::collections::BinaryHeap;

use super::DistItem;

/// A max-heap of `(distance, point)` pairs with a fixed capacity `k`.
///
/// Pushing onto a full heap keeps the `k` smallest pairs, so after any
/// sequence of pushes the heap holds the `k` nearest candidates seen so far.
/// Pairs are ordered by distance with ties broken by point index, which
/// keeps the retained set deterministic.
#[derive(Debug)]
pub(crate) struct SizedHeap {
    /// The heap of items.
    heap: BinaryHeap<DistItem>,
    /// The maximum size of the heap.
    k: usize,
}

impl SizedHeap {
    /// Creates a new `SizedHeap` holding at most `k` items.
    pub fn new(k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(k + 1),
            k,
        }
    }

    /// Pushes an item onto the heap, maintaining the max size.
    pub fn push(&mut self, item: DistItem) {
        if self.heap.len() < self.k {
            self.heap.push(item);
        } else if let Some(&top) = self.heap.peek() {
            if item < top {
                self.heap.pop();
                self.heap.push(item);
            }
        }
    }

    /// Whether the heap has reached its capacity.
    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    /// The largest retained item, if any.
    pub fn worst(&self) -> Option<DistItem> {
        self.heap.peek().copied()
    }

    /// Consumes the heap and returns its items sorted by ascending distance,
    /// ties by ascending point index.
    pub fn into_sorted(self) -> Vec<DistItem> {
        self.heap.into_sorted_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_the_k_nearest() {
        let mut heap = SizedHeap::new(2);
        for item in [DistItem(3.0, 0), DistItem(1.0, 1), DistItem(2.0, 2), DistItem(0.5, 3)] {
            heap.push(item);
        }
        assert!(heap.is_full());
        let sorted = heap.into_sorted();
        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].1, 3);
        assert_eq!(sorted[1].1, 1);
    }

    #[test]
    fn equal_distances_prefer_smaller_indices() {
        let mut heap = SizedHeap::new(2);
        for index in [4, 2, 9, 0] {
            heap.push(DistItem(1.0, index));
        }
        let kept = heap.into_sorted().iter().map(|item| item.1).collect::<Vec<_>>();
        assert_eq!(kept, vec![0, 2]);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut heap = SizedHeap::new(0);
        heap.push(DistItem(1.0, 0));
        assert!(heap.is_full());
        assert!(heap.into_sorted().is_empty());
    }
}
