//! A bounded binary heap with stable handles.

use std::ops::Sub;

use super::arena::{Arena, Handle};

/// A heap item.
#[derive(Debug)]
struct Item<P, V> {
    /// The priority, higher values are evicted first.
    priority: P,
    /// The stored value.
    value: V,
    /// The position of this item in the heap vector.
    position: usize,
}

/// A max-heap keyed by priority, addressable by handle and bounded in size.
///
/// The item with the numerically highest priority sits at the top and is the
/// one evicted when a push would exceed `max_size`. Lower priorities are
/// therefore "stickier".
#[derive(Debug)]
pub struct IndexedPriorityQueue<P, V> {
    /// The item storage.
    items: Arena<Item<P, V>>,
    /// Slot indexes in heap order.
    heap: Vec<usize>,
    /// The maximum number of items.
    max_size: usize,
}

impl<P, V> IndexedPriorityQueue<P, V>
where
    P: Copy + Ord + Sub<Output = P>,
{
    /// Create an empty queue holding at most `max_size` items.
    ///
    /// # Panics
    /// Panics if `max_size` is zero.
    #[inline]
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "a bounded priority queue needs room for one item");
        Self {
            items: Arena::with_capacity(max_size),
            heap: Vec::with_capacity(max_size),
            max_size,
        }
    }

    /// Insert `value` with `priority`.
    ///
    /// If the queue is full, the item with the highest priority is evicted
    /// first and its value is returned alongside the new handle.
    #[inline]
    pub fn push_bounded(&mut self, priority: P, value: V) -> (Handle, Option<V>) {
        let evicted = if self.heap.len() >= self.max_size {
            self.pop()
        } else {
            None
        };

        let position = self.heap.len();
        let handle = self.items.insert(Item {
            priority,
            value,
            position,
        });
        self.heap.push(handle.index());
        self.sift_up(position);
        (handle, evicted)
    }

    /// Remove and return the value with the highest priority.
    #[inline]
    pub fn pop(&mut self) -> Option<V> {
        if self.heap.is_empty() {
            return None;
        }
        self.remove_at(0)
    }

    /// Lower the priority of the item behind `handle` by `delta`.
    ///
    /// Returns `false` if the handle is stale.
    #[inline]
    pub fn decrease_priority(&mut self, handle: Handle, delta: P) -> bool {
        let Some(item) = self.items.get_mut(handle) else {
            return false;
        };
        item.priority = item.priority - delta;
        let position = item.position;
        self.sift_down(position);
        true
    }

    /// Remove the item behind `handle` and return its value.
    #[inline]
    pub fn remove(&mut self, handle: Handle) -> Option<V> {
        let position = self.items.get(handle)?.position;
        self.remove_at(position)
    }

    /// The item with the highest priority.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> Option<(P, &V)> {
        let index = *self.heap.first()?;
        let item = self.items.at(index);
        Some((item.priority, &item.value))
    }

    /// The value behind `handle`.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&V> {
        self.items.get(handle).map(|item| &item.value)
    }

    /// The value behind `handle`, mutably.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut V> {
        self.items.get_mut(handle).map(|item| &mut item.value)
    }

    /// The priority of the item behind `handle`.
    #[inline]
    #[must_use]
    pub fn priority(&self, handle: Handle) -> Option<P> {
        self.items.get(handle).map(|item| item.priority)
    }

    /// The number of items.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the queue holds no item.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The maximum number of items.
    #[inline]
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Remove the item at heap `position`, restoring the heap order.
    fn remove_at(&mut self, position: usize) -> Option<V> {
        let last = self.heap.len().checked_sub(1)?;
        self.swap(position, last);
        let index = self.heap.pop()?;
        if position < self.heap.len() {
            self.sift_up(position);
            self.sift_down(position);
        }
        self.items.take(index).map(|item| item.value)
    }

    /// The priority of the item at heap `position`.
    fn priority_at(&self, position: usize) -> P {
        let index = self
            .heap
            .get(position)
            .unwrap_or_else(|| panic!("heap position {position} is out of range"));
        self.items.at(*index).priority
    }

    /// Swap two heap positions and fix the back references.
    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        for position in [a, b] {
            if let Some(&index) = self.heap.get(position) {
                self.items.at_mut(index).position = position;
            }
        }
    }

    /// Move the item at `position` towards the top while it outranks its parent.
    fn sift_up(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / 2;
            if self.priority_at(position) <= self.priority_at(parent) {
                break;
            }
            self.swap(position, parent);
            position = parent;
        }
    }

    /// Move the item at `position` towards the leaves while a child outranks it.
    fn sift_down(&mut self, mut position: usize) {
        let len = self.heap.len();
        loop {
            let left = position.wrapping_mul(2).wrapping_add(1);
            let right = left.wrapping_add(1);
            let mut largest = position;
            if left < len && self.priority_at(left) > self.priority_at(largest) {
                largest = left;
            }
            if right < len && self.priority_at(right) > self.priority_at(largest) {
                largest = right;
            }
            if largest == position {
                break;
            }
            self.swap(position, largest);
            position = largest;
        }
    }
}

#[cfg(test)]
#[allow(clippy::default_numeric_fallback, clippy::unwrap_used)]
mod tests {
    use super::IndexedPriorityQueue;

    #[test]
    fn test_bounded_push_evicts_highest() {
        let mut queue = IndexedPriorityQueue::<i64, &str>::new(3);
        assert_eq!(queue.push_bounded(-3, "a").1, None);
        assert_eq!(queue.push_bounded(-1, "b").1, None);
        assert_eq!(queue.push_bounded(-2, "c").1, None);
        assert_eq!(queue.peek(), Some((-1, &"b")));

        let (handle, evicted) = queue.push_bounded(-5, "d");
        assert_eq!(evicted, Some("b"));
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.get(handle), Some(&"d"));
        assert_eq!(queue.peek(), Some((-2, &"c")));
    }

    #[test]
    fn test_decrease_priority() {
        let mut queue = IndexedPriorityQueue::<i64, i32>::new(4);
        let (first, _) = queue.push_bounded(-1, 1);
        let (second, _) = queue.push_bounded(-1, 2);
        let (third, _) = queue.push_bounded(-1, 3);

        assert!(queue.decrease_priority(first, 2));
        assert!(queue.decrease_priority(third, 1));
        assert_eq!(queue.priority(first), Some(-3));
        assert_eq!(queue.priority(third), Some(-2));

        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), None);
        assert!(!queue.decrease_priority(second, 1));
    }

    #[test]
    fn test_remove_by_handle() {
        let mut queue = IndexedPriorityQueue::<i64, i32>::new(8);
        let handles: Vec<_> = (0..8)
            .map(|value| queue.push_bounded(i64::from(value % 3), value).0)
            .collect();

        assert_eq!(queue.remove(handles[4]), Some(4));
        assert_eq!(queue.remove(handles[4]), None);
        assert_eq!(queue.remove(handles[0]), Some(0));
        *queue.get_mut(handles[7]).unwrap() = 70;
        assert_eq!(queue.len(), 6);

        // Priorities: 1 -> 1, 2 -> 2, 3 -> 0, 5 -> 2, 6 -> 0, 7 -> 1
        let mut popped = Vec::new();
        while let Some(priority) = queue.peek().map(|(priority, _)| priority) {
            let value = queue.pop().unwrap();
            popped.push((priority, value));
        }
        let priorities: Vec<i64> = popped.iter().map(|&(priority, _)| priority).collect();
        assert_eq!(priorities, vec![2, 2, 1, 1, 0, 0]);
        assert!(popped.contains(&(1, 70)));
        assert!(queue.is_empty());
    }

    #[test]
    #[should_panic(expected = "room for one item")]
    fn test_zero_size() {
        let _queue = IndexedPriorityQueue::<i64, ()>::new(0);
    }
}
