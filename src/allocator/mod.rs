//! Allocator strategies - algorithms that carve memory into blocks
//!
//! Design: Three interchangeable strategies behind one trait:
//! 1. Linear (bump) allocation over an area, reclaimed only by reset/rewind
//! 2. Pool allocation of fixed-size elements from an intrusive free list
//! 3. Heap passthrough to the platform aligned allocator
//!
//! Strategies hold no lock. Synchronization is the Pond's job.

pub mod align;
mod bump;
mod heap;
pub mod platform;
mod pool;


pub use bump::LinearAllocator;
pub use heap::HeapAllocator;
pub use pool::{FreeList, PoolAllocator};

use core::ptr::NonNull;

/// Strictest fundamental alignment, the default for untyped allocations
pub const MAX_ALIGN: usize = 16;

/// Common contract of every allocation strategy
pub trait Allocator {
    /// Allocate `size` bytes whose address is aligned after skipping `extra` bytes
    ///
    /// Returns `None` when the strategy is exhausted.
    fn alloc(&mut self, size: usize, alignment: usize, extra: usize) -> Option<NonNull<u8>>;

    /// Return a block
    ///
    /// # Safety
    /// `ptr` must come from `alloc` on this allocator and must not be used
    /// afterwards. `size` is the size it was allocated with.
    unsafe fn free(&mut self, ptr: NonNull<u8>, size: usize);

    /// Reclaim everything the strategy can reclaim in bulk
    fn reset(&mut self);

    /// Roll back to an earlier checkpoint obtained from `current`
    fn rewind(&mut self, ptr: NonNull<u8>) {
        let _ = ptr;
        debug_assert!(false, "allocator does not support rewind");
    }

    /// Checkpoint for `rewind`, or the next block to be handed out
    fn current(&self) -> Option<NonNull<u8>> {
        None
    }

    /// Bytes currently handed out
    fn size(&self) -> usize;

    /// Bytes the strategy can hand out without asking the platform
    fn capacity(&self) -> usize;
}
