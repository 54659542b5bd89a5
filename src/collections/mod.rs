//! Handle-addressable collections the replacement policies are built on.

mod arena;
mod ordered_queue;
mod priority_queue;

pub use arena::Handle;
pub use ordered_queue::{Iter, OrderedQueue};
pub use priority_queue::IndexedPriorityQueue;
