//! Heap passthrough - every block straight from the platform

use super::platform::{aligned_alloc, aligned_free};
use super::Allocator;
use core::ptr::NonNull;

/// Stateless allocator delegating to the platform aligned allocate/free pair
///
/// Keeps no bookkeeping: `size()` and `capacity()` are always zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl HeapAllocator {
    pub const fn new() -> Self {
        Self
    }
}

impl Allocator for HeapAllocator {
    #[inline]
    fn alloc(&mut self, size: usize, alignment: usize, extra: usize) -> Option<NonNull<u8>> {
        debug_assert!(extra == 0, "heap allocator does not support an extra offset");
        aligned_alloc(size, alignment)
    }

    #[inline]
    unsafe fn free(&mut self, ptr: NonNull<u8>, _size: usize) {
        aligned_free(ptr);
    }

    #[inline]
    fn reset(&mut self) {}

    #[inline]
    fn size(&self) -> usize {
        0
    }

    #[inline]
    fn capacity(&self) -> usize {
        0
    }
}
