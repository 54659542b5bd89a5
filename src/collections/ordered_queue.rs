//! A doubly linked queue with stable handles.

use super::arena::{Arena, Handle};

/// A node of the queue, linked by raw slot indexes.
#[derive(Debug)]
struct Node<T> {
    /// The stored value.
    value: T,
    /// The slot of the previous (older) node.
    prev: Option<usize>,
    /// The slot of the next (newer) node.
    next: Option<usize>,
}

/// A FIFO-ordered sequence supporting O(1) removal and relocation by handle.
///
/// Values are pushed to the back and popped from the front, so the front is
/// always the oldest value. `move_to_back` turns the queue into a recency list.
#[derive(Debug)]
pub struct OrderedQueue<T> {
    /// The node storage.
    nodes: Arena<Node<T>>,
    /// The oldest node.
    head: Option<usize>,
    /// The newest node.
    tail: Option<usize>,
}

impl<T> Default for OrderedQueue<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OrderedQueue<T> {
    /// Create an empty queue.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Arena::default(),
            head: None,
            tail: None,
        }
    }

    /// Create an empty queue with room for `capacity` values.
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    /// Append `value` to the back and return its handle.
    #[inline]
    pub fn push_back(&mut self, value: T) -> Handle {
        let handle = self.nodes.insert(Node {
            value,
            prev: None,
            next: None,
        });
        self.attach_back(handle.index());
        handle
    }

    /// Remove and return the front value.
    #[inline]
    pub fn pop_front(&mut self) -> Option<T> {
        let index = self.head?;
        self.detach(index);
        self.nodes.take(index).map(|node| node.value)
    }

    /// Remove the value behind `handle`.
    ///
    /// Returns `None` if the handle is stale.
    #[inline]
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        if !self.nodes.contains(handle) {
            return None;
        }
        self.detach(handle.index());
        self.nodes.remove(handle).map(|node| node.value)
    }

    /// Move the value behind `handle` to the back.
    ///
    /// Returns `false` if the handle is stale.
    #[inline]
    pub fn move_to_back(&mut self, handle: Handle) -> bool {
        if !self.nodes.contains(handle) {
            return false;
        }
        let index = handle.index();
        if self.tail != Some(index) {
            self.detach(index);
            self.attach_back(index);
        }
        true
    }

    /// The front (oldest) value.
    #[inline]
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.head.map(|index| &self.nodes.at(index).value)
    }

    /// The handle of the front value.
    #[inline]
    #[must_use]
    pub fn front_handle(&self) -> Option<Handle> {
        self.head.and_then(|index| self.nodes.handle_at(index))
    }

    /// The back (newest) value.
    #[inline]
    #[must_use]
    pub fn back(&self) -> Option<&T> {
        self.tail.map(|index| &self.nodes.at(index).value)
    }

    /// The value behind `handle`.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.nodes.get(handle).map(|node| &node.value)
    }

    /// The value behind `handle`, mutably.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.nodes.get_mut(handle).map(|node| &mut node.value)
    }

    /// The number of values in the queue.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the queue holds no value.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Iterate from front to back.
    #[inline]
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            queue: self,
            next: self.head,
        }
    }

    /// Link a detached node at the back.
    fn attach_back(&mut self, index: usize) {
        let old_tail = self.tail;
        {
            let node = self.nodes.at_mut(index);
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(tail) => self.nodes.at_mut(tail).next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
    }

    /// Unlink a node from its neighbours, leaving it in the arena.
    fn detach(&mut self, index: usize) {
        let (prev, next) = {
            let node = self.nodes.at_mut(index);
            (node.prev.take(), node.next.take())
        };
        match prev {
            Some(prev) => self.nodes.at_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes.at_mut(next).prev = prev,
            None => self.tail = prev,
        }
    }
}

/// Front-to-back iterator over an [`OrderedQueue`].
#[derive(Debug)]
pub struct Iter<'a, T> {
    /// The iterated queue.
    queue: &'a OrderedQueue<T>,
    /// The slot to yield next.
    next: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next?;
        let node = self.queue.nodes.at(index);
        self.next = node.next;
        Some(&node.value)
    }
}

impl<'a, T> IntoIterator for &'a OrderedQueue<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::default_numeric_fallback, clippy::unwrap_used)]
mod tests {
    use super::OrderedQueue;

    /// Create a queue `1 -> 2 -> 3` and return the handles in order.
    fn create_queue() -> (OrderedQueue<i32>, Vec<super::Handle>) {
        let mut queue = OrderedQueue::new();
        let handles = vec![queue.push_back(1), queue.push_back(2), queue.push_back(3)];
        (queue, handles)
    }

    fn contents(queue: &OrderedQueue<i32>) -> Vec<i32> {
        queue.iter().copied().collect()
    }

    #[test]
    fn test_push_pop() {
        let (mut queue, _) = create_queue();
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.front(), Some(&1));
        assert_eq!(queue.back(), Some(&3));

        assert_eq!(queue.pop_front(), Some(1));
        assert_eq!(queue.pop_front(), Some(2));
        assert_eq!(queue.pop_front(), Some(3));
        assert_eq!(queue.pop_front(), None);
        assert!(queue.is_empty());
        assert_eq!(queue.back(), None);
    }

    #[test]
    fn test_move_to_back() {
        let (mut queue, handles) = create_queue();

        assert!(queue.move_to_back(handles[0]));
        assert_eq!(contents(&queue), vec![2, 3, 1]);

        // Moving the tail is a no-op.
        assert!(queue.move_to_back(handles[0]));
        assert_eq!(contents(&queue), vec![2, 3, 1]);

        assert!(queue.move_to_back(handles[2]));
        assert_eq!(contents(&queue), vec![2, 1, 3]);
        assert_eq!(queue.front_handle(), Some(handles[1]));
    }

    #[test]
    fn test_remove_middle_and_ends() {
        let (mut queue, handles) = create_queue();

        assert_eq!(queue.remove(handles[1]), Some(2));
        assert_eq!(contents(&queue), vec![1, 3]);
        assert_eq!(queue.remove(handles[0]), Some(1));
        assert_eq!(contents(&queue), vec![3]);
        assert_eq!(queue.remove(handles[2]), Some(3));
        assert!(queue.is_empty());
        assert_eq!(queue.front_handle(), None);
    }

    #[test]
    fn test_stale_handle() {
        let (mut queue, handles) = create_queue();

        assert_eq!(queue.pop_front(), Some(1));
        // The freed slot is reused by the next push.
        let reused = queue.push_back(4);
        assert_eq!(reused.index(), handles[0].index());

        assert_eq!(queue.get(handles[0]), None);
        assert_eq!(queue.remove(handles[0]), None);
        assert!(!queue.move_to_back(handles[0]));
        assert_eq!(contents(&queue), vec![2, 3, 4]);
    }

    #[test]
    fn test_get_mut() {
        let (mut queue, handles) = create_queue();
        *queue.get_mut(handles[1]).unwrap() = 20;
        assert_eq!(queue.get(handles[1]), Some(&20));
        let collected: Vec<i32> = (&queue).into_iter().copied().collect();
        assert_eq!(collected, vec![1, 20, 3]);
    }
}
