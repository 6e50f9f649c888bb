use super::*;

// ============================================================================
// ALLOCATION
// ============================================================================

#[test]
fn test_slots_are_handed_out_in_order() {
    let mut slots = SlotAllocator::with_capacity(8);
    assert!(slots.is_empty());
    assert_eq!(slots.alloc(), Some(0));
    assert_eq!(slots.alloc(), Some(1));
    assert_eq!(slots.alloc(), Some(2));
    assert_eq!(slots.len(), 3);
}

#[test]
fn test_full_table_refuses_allocation() {
    let mut slots = SlotAllocator::with_capacity(2);
    slots.alloc();
    slots.alloc();

    assert!(slots.is_full());
    assert_eq!(slots.alloc(), None);
    assert_eq!(slots.len(), 2);
}

#[test]
fn test_zero_capacity_never_allocates() {
    let mut slots = SlotAllocator::with_capacity(0);
    assert_eq!(slots.alloc(), None);
    assert!(slots.is_empty());
}

// ============================================================================
// RECYCLING
// ============================================================================

#[test]
fn test_lowest_free_slot_first() {
    let mut slots = SlotAllocator::with_capacity(8);
    for _ in 0..3 {
        slots.alloc();
    }
    slots.free(2);
    slots.free(0);

    assert_eq!(slots.alloc(), Some(0));
    assert_eq!(slots.alloc(), Some(2));
    assert_eq!(slots.alloc(), Some(3));
}

#[test]
fn test_freed_slot_reusable_when_full() {
    let mut slots = SlotAllocator::with_capacity(3);
    for _ in 0..3 {
        slots.alloc();
    }
    slots.free(1);

    assert_eq!(slots.alloc(), Some(1));
    assert_eq!(slots.alloc(), None);
    assert_eq!(slots.high_water_mark(), 3);
}

#[test]
fn test_churn_stays_dense() {
    let mut slots = SlotAllocator::with_capacity(128);
    let taken: Vec<u32> = (0..8).filter_map(|_| slots.alloc()).collect();
    for slot in taken.iter().filter(|s| *s % 2 == 0) {
        slots.free(*slot);
    }
    let refill: Vec<u32> = (0..4).filter_map(|_| slots.alloc()).collect();
    assert_eq!(refill, vec![0, 2, 4, 6]);
    assert_eq!(slots.high_water_mark(), 8);
}

#[test]
fn test_reset_restarts_at_zero() {
    let mut slots = SlotAllocator::with_capacity(4);
    slots.alloc();
    slots.alloc();
    slots.reset();

    assert!(slots.is_empty());
    assert_eq!(slots.capacity(), 4);
    assert_eq!(slots.alloc(), Some(0));
}
