//! Linear (bump) allocation - O(1) fast path, bulk reclamation only
//!
//! Design: A cursor offset into a fixed region. Individual blocks are never
//! freed; `reset` or `rewind` reclaim space. Suited to scope-bounded work
//! whose results die before the next reset.

use super::align::align_ptr_with_offset;
use super::Allocator;
use crate::area::Area;
use core::ptr::{self, NonNull};

/// Bump allocator state - region start, size and cursor
pub struct LinearAllocator {
    begin: *mut u8,
    size: usize,
    cursor: usize,
}

impl LinearAllocator {
    /// Create empty allocator (every allocation fails)
    #[inline]
    pub const fn new() -> Self {
        Self {
            begin: ptr::null_mut(),
            size: 0,
            cursor: 0,
        }
    }

    /// Allocate from the whole of `area`
    ///
    /// The area must outlive the allocator; a Pond guarantees this by owning both.
    pub fn from_area<A: Area + ?Sized>(area: &A) -> Self {
        Self {
            begin: area.begin(),
            size: area.size(),
            cursor: 0,
        }
    }

    /// Allocate from `[begin, end)`
    ///
    /// # Safety
    /// The region must be valid for writes for as long as the allocator is used.
    pub unsafe fn from_bounds(begin: *mut u8, end: *mut u8) -> Self {
        debug_assert!(begin <= end, "invalid arena bounds");
        Self {
            begin,
            size: (end as usize) - (begin as usize),
            cursor: 0,
        }
    }

    /// Start of the region
    #[inline]
    pub fn base(&self) -> *mut u8 {
        self.begin
    }

    /// Remaining capacity in the region
    #[inline]
    pub fn remaining(&self) -> usize {
        self.size.saturating_sub(self.cursor)
    }

    #[inline(always)]
    fn cursor_ptr(&self) -> *mut u8 {
        self.begin.wrapping_add(self.cursor)
    }

    #[inline(always)]
    fn end_addr(&self) -> usize {
        self.begin as usize + self.size
    }
}

impl Default for LinearAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Allocator for LinearAllocator {
    /// Fast path: bump pointer allocation
    ///
    /// Returns None if the region is exhausted; the cursor is left untouched.
    #[inline(always)]
    fn alloc(&mut self, size: usize, alignment: usize, extra: usize) -> Option<NonNull<u8>> {
        if self.begin.is_null() {
            return None;
        }

        let p = align_ptr_with_offset(self.cursor_ptr(), alignment, extra);
        let new_end = (p as usize).checked_add(size)?;

        // Branch-free cursor update
        let success = new_end <= self.end_addr();
        let advanced = new_end.wrapping_sub(self.begin as usize);
        self.cursor = if success { advanced } else { self.cursor };

        if success {
            NonNull::new(p)
        } else {
            None
        }
    }

    /// Individual blocks are never reclaimed
    #[inline]
    unsafe fn free(&mut self, _ptr: NonNull<u8>, _size: usize) {}

    #[inline]
    fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Roll the cursor back to a checkpoint in `[begin, current]`
    fn rewind(&mut self, ptr: NonNull<u8>) {
        let addr = ptr.as_ptr() as usize;
        debug_assert!(
            addr >= self.begin as usize && addr <= self.cursor_ptr() as usize,
            "rewind target outside [begin, current]"
        );
        self.cursor = addr.wrapping_sub(self.begin as usize);
    }

    #[inline]
    fn current(&self) -> Option<NonNull<u8>> {
        NonNull::new(self.cursor_ptr())
    }

    #[inline]
    fn size(&self) -> usize {
        self.cursor
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.size
    }
}

// Bounds are plain addresses; the Pond serializes every mutation
unsafe impl Send for LinearAllocator {}
