//! A slot arena addressed by generation-checked handles.

use slab::Slab;

/// A stable reference to a value stored in one of the collections.
///
/// A handle stays valid until the value it points to is removed. Once removed,
/// the slot may be reused, but the old handle will never resolve to the new
/// occupant because every insertion is issued a fresh generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    /// The index of the slot in the arena.
    index: usize,
    /// The generation of the slot when this handle was issued.
    generation: u64,
}

impl Handle {
    /// The slot index of this handle.
    #[must_use]
    pub(crate) fn index(self) -> usize {
        self.index
    }
}

/// A single slot of the arena.
#[derive(Debug)]
struct Slot<T> {
    /// The generation issued when the slot was filled.
    generation: u64,
    /// The occupant.
    value: T,
}

/// A slab of reusable slots.
#[derive(Debug)]
pub(crate) struct Arena<T> {
    /// Occupied slots, vacant ones are recycled by the slab.
    slots: Slab<Slot<T>>,
    /// The generation handed to the next inserted value.
    next_generation: u64,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Slab::new(),
            next_generation: 0,
        }
    }
}

impl<T> Arena<T> {
    /// Create an arena with room for `capacity` values.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Slab::with_capacity(capacity),
            next_generation: 0,
        }
    }

    /// Store `value` and return its handle.
    pub(crate) fn insert(&mut self, value: T) -> Handle {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        let index = self.slots.insert(Slot { generation, value });
        Handle { index, generation }
    }

    /// Whether `handle` still refers to a live value.
    pub(crate) fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Resolve a handle.
    pub(crate) fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index)
            .filter(|slot| slot.generation == handle.generation)
            .map(|slot| &slot.value)
    }

    /// Resolve a handle mutably.
    pub(crate) fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index)
            .filter(|slot| slot.generation == handle.generation)
            .map(|slot| &mut slot.value)
    }

    /// Remove the value behind `handle`, invalidating the handle.
    pub(crate) fn remove(&mut self, handle: Handle) -> Option<T> {
        if !self.contains(handle) {
            return None;
        }
        self.take(handle.index)
    }

    /// The live value at a raw slot index.
    ///
    /// Internal links of the collections are raw indexes into live slots, so a
    /// missing value here is a broken link.
    pub(crate) fn at(&self, index: usize) -> &T {
        self.slots
            .get(index)
            .map(|slot| &slot.value)
            .unwrap_or_else(|| panic!("dangling link to vacant slot {index}"))
    }

    /// The live value at a raw slot index, mutably.
    pub(crate) fn at_mut(&mut self, index: usize) -> &mut T {
        self.slots
            .get_mut(index)
            .map(|slot| &mut slot.value)
            .unwrap_or_else(|| panic!("dangling link to vacant slot {index}"))
    }

    /// The handle currently issued for the live slot at `index`.
    pub(crate) fn handle_at(&self, index: usize) -> Option<Handle> {
        self.slots.get(index).map(|slot| Handle {
            index,
            generation: slot.generation,
        })
    }

    /// Vacate the slot at a raw index and return its value.
    pub(crate) fn take(&mut self, index: usize) -> Option<T> {
        self.slots.try_remove(index).map(|slot| slot.value)
    }

    /// The number of live values.
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}
