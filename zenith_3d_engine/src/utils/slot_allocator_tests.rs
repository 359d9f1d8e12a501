use super::*;
use std::collections::HashSet;

// ============================================================================
// Basic allocation tests
// ============================================================================

#[test]
fn test_sequential_add() {
    let mut alloc = SlotAllocator::new(8);
    assert_eq!(alloc.add('a'), Some(0));
    assert_eq!(alloc.add('b'), Some(1));
    assert_eq!(alloc.add('c'), Some(2));
    assert_eq!(alloc.len(), 3);
}

#[test]
fn test_new_is_empty() {
    let alloc: SlotAllocator<u64> = SlotAllocator::new(4);
    assert!(alloc.is_empty());
    assert_eq!(alloc.len(), 0);
    assert_eq!(alloc.capacity(), 4);
    assert_eq!(alloc.high_water_mark(), 0);
}

#[test]
fn test_add_existing_key_returns_same_slot() {
    let mut alloc = SlotAllocator::new(4);
    assert_eq!(alloc.add(10u32), Some(0));
    assert_eq!(alloc.add(10u32), Some(0));
    assert_eq!(alloc.len(), 1);
}

// ============================================================================
// Capacity tests
// ============================================================================

#[test]
fn test_add_on_full_returns_none() {
    let mut alloc = SlotAllocator::new(2);
    alloc.add(1u32);
    alloc.add(2u32);
    assert!(alloc.is_full());
    assert_eq!(alloc.add(3u32), None);
    assert!(!alloc.contains(3u32));
}

#[test]
fn test_full_pool_rejects_fifth_and_keeps_first_four() {
    let mut alloc = SlotAllocator::new(4);
    for key in 0..4u32 {
        assert_eq!(alloc.add(key), Some(key));
    }

    assert_eq!(alloc.add(99u32), None);

    for key in 0..4u32 {
        assert_eq!(alloc.slot_of(key), Some(key));
        assert_eq!(alloc.key_at(key), Some(key));
    }
    assert_eq!(alloc.len(), 4);
}

// ============================================================================
// Remove and recycle tests
// ============================================================================

#[test]
fn test_remove_then_add_reuses_slot() {
    let mut alloc = SlotAllocator::new(4);
    alloc.add('a');
    alloc.add('b');
    assert_eq!(alloc.remove('a'), Some(0));
    assert_eq!(alloc.add('c'), Some(0));
    assert_eq!(alloc.slot_of('b'), Some(1));
}

#[test]
fn test_lowest_free_slot_preferred() {
    let mut alloc = SlotAllocator::new(8);
    for key in 0..5u32 {
        alloc.add(key);
    }
    alloc.remove(3u32);
    alloc.remove(1u32);
    alloc.remove(4u32);

    assert_eq!(alloc.add(10u32), Some(1));
    assert_eq!(alloc.add(11u32), Some(3));
    assert_eq!(alloc.add(12u32), Some(4));
    assert_eq!(alloc.add(13u32), Some(5));
}

#[test]
fn test_remove_unknown_key_is_noop() {
    let mut alloc = SlotAllocator::new(2);
    alloc.add(1u32);
    assert_eq!(alloc.remove(7u32), None);
    assert_eq!(alloc.len(), 1);
}

#[test]
fn test_high_water_mark_never_decreases() {
    let mut alloc = SlotAllocator::new(8);
    alloc.add(0u32);
    alloc.add(1u32);
    alloc.remove(0u32);
    alloc.remove(1u32);
    assert_eq!(alloc.high_water_mark(), 2);

    alloc.add(2u32);
    assert_eq!(alloc.high_water_mark(), 2);
}

// ============================================================================
// Iteration tests
// ============================================================================

#[test]
fn test_iter_ascending_slots() {
    let mut alloc = SlotAllocator::new(4);
    alloc.add('x');
    alloc.add('y');
    alloc.add('z');
    alloc.remove('y');

    let live: Vec<(u32, char)> = alloc.iter().collect();
    assert_eq!(live, vec![(0, 'x'), (2, 'z')]);
}

#[test]
fn test_for_each_removal_not_revisited() {
    let mut alloc = SlotAllocator::new(8);
    for key in 0..4u32 {
        alloc.add(key);
    }

    let mut visited = Vec::new();
    alloc.for_each(|slot, key| {
        visited.push(slot);
        if key == 1 { SlotVisit::Remove } else { SlotVisit::Keep }
    });

    assert_eq!(visited, vec![0, 1, 2, 3]);
    assert!(!alloc.contains(1u32));
    assert_eq!(alloc.len(), 3);

    let mut second = Vec::new();
    alloc.for_each(|slot, _| {
        second.push(slot);
        SlotVisit::Keep
    });
    assert_eq!(second, vec![0, 2, 3]);
}

#[test]
fn test_clear_resets_pool() {
    let mut alloc = SlotAllocator::new(2);
    alloc.add(1u32);
    alloc.add(2u32);
    alloc.clear();
    assert!(alloc.is_empty());
    assert_eq!(alloc.add(3u32), Some(0));
}

// ============================================================================
// Stress / pattern tests
// ============================================================================

#[test]
fn test_random_sequences_keep_slots_unique_and_bounded() {
    const CAPACITY: u32 = 16;
    let mut alloc = SlotAllocator::new(CAPACITY);
    let mut live: HashSet<u32> = HashSet::new();

    // Small LCG so the sequence is reproducible
    let mut state: u64 = 0x2545_F491_4F6C_DD1D;
    let mut next = || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (state >> 33) as u32
    };

    for _ in 0..2000 {
        let key = next() % 40;
        if next() % 3 == 0 {
            let freed = alloc.remove(key);
            assert_eq!(freed.is_some(), live.remove(&key));
        } else {
            let before_full = alloc.is_full();
            match alloc.add(key) {
                Some(slot) => {
                    assert!(slot < CAPACITY);
                    live.insert(key);
                }
                None => {
                    assert!(before_full);
                    assert!(!live.contains(&key));
                }
            }
        }

        let slots: Vec<u32> = alloc.iter().map(|(slot, _)| slot).collect();
        let unique: HashSet<u32> = slots.iter().copied().collect();
        assert_eq!(slots.len(), unique.len(), "duplicate slot in pool");
        assert_eq!(slots.len() as u32, alloc.len());
        assert!(alloc.len() <= CAPACITY);
        for (slot, key) in alloc.iter() {
            assert_eq!(alloc.slot_of(key), Some(slot));
        }
    }
}
