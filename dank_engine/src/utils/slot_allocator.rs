use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Allocates and recycles dense `u32` binding slots in a table of fixed
/// capacity.
///
/// Always hands out the lowest free index, so the set of live slots stays
/// packed at the front of a binding table even as textures come and go.
///
/// # Example
///
/// ```ignore
/// let mut slots = SlotAllocator::with_capacity(3);
/// let a = slots.alloc();  // Some(0)
/// let b = slots.alloc();  // Some(1)
/// let c = slots.alloc();  // Some(2)
/// slots.alloc();          // None, table full
/// slots.free(2);
/// slots.free(0);
/// slots.alloc();          // Some(0), lowest free first
/// ```
pub struct SlotAllocator {
    free_list: BinaryHeap<Reverse<u32>>,
    next_id: u32,
    len: u32,
    capacity: u32,
}

impl SlotAllocator {
    /// Create an empty allocator for a table of `capacity` slots
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            free_list: BinaryHeap::new(),
            next_id: 0,
            len: 0,
            capacity,
        }
    }

    /// Allocate the lowest available slot index, `None` when every slot
    /// of the table is taken
    pub fn alloc(&mut self) -> Option<u32> {
        let id = match self.free_list.pop() {
            Some(Reverse(id)) => id,
            None if self.next_id < self.capacity => {
                self.next_id += 1;
                self.next_id - 1
            }
            None => return None,
        };
        self.len += 1;
        Some(id)
    }

    /// Return a slot index to the pool for reuse
    pub fn free(&mut self, id: u32) {
        debug_assert!(id < self.next_id, "freeing an unallocated slot: {}", id);
        self.len -= 1;
        self.free_list.push(Reverse(id));
    }

    /// Highest index ever allocated + 1
    pub fn high_water_mark(&self) -> u32 {
        self.next_id
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of currently allocated slots
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// Forget every allocation
    pub fn reset(&mut self) {
        self.free_list.clear();
        self.next_id = 0;
        self.len = 0;
    }
}

#[cfg(test)]
#[path = "slot_allocator_tests.rs"]
mod tests;
