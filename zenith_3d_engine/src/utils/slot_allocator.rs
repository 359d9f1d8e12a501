use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::hash::Hash;
use rustc_hash::FxHashMap;

/// Visitor verdict for `SlotAllocator::for_each`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotVisit {
    /// Leave the element in place
    Keep,
    /// Release the element's slot; it is not visited again
    Remove,
}

/// Assigns stable `u32` slots to keys from a fixed-capacity pool.
///
/// Each live key owns exactly one slot in `[0, capacity)`. Released slots
/// are recycled lowest-first so GPU arrays stay densely packed at the
/// front. The key→slot map is non-owning: the allocator never touches
/// what the key refers to.
///
/// # Example
///
/// ```ignore
/// let mut alloc = SlotAllocator::new(2);
/// let a = alloc.add(light_a);   // Some(0)
/// let b = alloc.add(light_b);   // Some(1)
/// let c = alloc.add(light_c);   // None (full)
/// alloc.remove(light_a);        // 0 is free again
/// let d = alloc.add(light_c);   // Some(0)
/// ```
pub struct SlotAllocator<K> {
    slots: Vec<Option<K>>,
    lookup: FxHashMap<K, u32>,
    free_list: BinaryHeap<Reverse<u32>>,
    next_id: u32,
    capacity: u32,
}

impl<K: Copy + Eq + Hash> SlotAllocator<K> {
    /// Create an empty allocator holding at most `capacity` keys
    pub fn new(capacity: u32) -> Self {
        Self {
            slots: Vec::new(),
            lookup: FxHashMap::default(),
            free_list: BinaryHeap::new(),
            next_id: 0,
            capacity,
        }
    }

    /// Assign a slot to `key`.
    ///
    /// Returns the existing slot when `key` is already live, and `None`
    /// when the pool is full (the pool is left untouched).
    pub fn add(&mut self, key: K) -> Option<u32> {
        if let Some(&slot) = self.lookup.get(&key) {
            return Some(slot);
        }

        let slot = match self.free_list.pop() {
            Some(Reverse(slot)) => slot,
            None if self.next_id < self.capacity => {
                let id = self.next_id;
                self.next_id += 1;
                self.slots.push(None);
                id
            }
            None => return None,
        };

        self.slots[slot as usize] = Some(key);
        self.lookup.insert(key, slot);
        Some(slot)
    }

    /// Release the slot held by `key`, returning it
    pub fn remove(&mut self, key: K) -> Option<u32> {
        let slot = self.lookup.remove(&key)?;
        self.release(slot);
        Some(slot)
    }

    fn release(&mut self, slot: u32) {
        self.slots[slot as usize] = None;
        self.free_list.push(Reverse(slot));
    }

    /// Visit every live `(slot, key)` in ascending slot order.
    ///
    /// Returning `SlotVisit::Remove` releases the visited element
    /// immediately; the freed slot is not revisited during this pass.
    pub fn for_each<F>(&mut self, mut visitor: F)
    where
        F: FnMut(u32, K) -> SlotVisit,
    {
        for slot in 0..self.next_id {
            let key = match self.slots[slot as usize] {
                Some(key) => key,
                None => continue,
            };
            if visitor(slot, key) == SlotVisit::Remove {
                self.lookup.remove(&key);
                self.release(slot);
            }
        }
    }

    /// Iterate live `(slot, key)` pairs in ascending slot order
    pub fn iter(&self) -> impl Iterator<Item = (u32, K)> + '_ {
        self.slots.iter()
            .enumerate()
            .filter_map(|(slot, key)| key.map(|k| (slot as u32, k)))
    }

    /// Slot currently held by `key`
    pub fn slot_of(&self, key: K) -> Option<u32> {
        self.lookup.get(&key).copied()
    }

    /// Key currently holding `slot`
    pub fn key_at(&self, slot: u32) -> Option<K> {
        self.slots.get(slot as usize).copied().flatten()
    }

    /// Whether `key` holds a slot
    pub fn contains(&self, key: K) -> bool {
        self.lookup.contains_key(&key)
    }

    /// Highest index ever allocated + 1.
    ///
    /// Draws and scans never need to look past this index.
    pub fn high_water_mark(&self) -> u32 {
        self.next_id
    }

    /// Number of live slots
    pub fn len(&self) -> u32 {
        self.lookup.len() as u32
    }

    /// Whether no slots are live
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Maximum number of live slots
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Whether the next `add` of a new key would fail
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Release every slot
    pub fn clear(&mut self) {
        self.slots.clear();
        self.lookup.clear();
        self.free_list.clear();
        self.next_id = 0;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "slot_allocator_tests.rs"]
mod tests;
