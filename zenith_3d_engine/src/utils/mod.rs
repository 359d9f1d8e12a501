//! Small engine-wide utilities

mod slot_allocator;

pub use slot_allocator::{SlotAllocator, SlotVisit};
