//! Areas - contiguous memory regions handed to allocator strategies
//!
//! Design: An area only answers "where does the region start and end".
//! Ownership is the only thing that differs between variants:
//! 1. `HeapArea` owns its block and frees it on drop
//! 2. `StaticArea` borrows memory owned elsewhere
//! 3. `NullArea` is the zero-capacity placeholder for unpooled strategies

use crate::allocator::MAX_ALIGN;
use core::marker::PhantomData;
use core::ptr;
use std::alloc::{alloc, dealloc, Layout};

/// A contiguous region `[begin, end)`
pub trait Area {
    fn begin(&self) -> *mut u8;

    fn end(&self) -> *mut u8;

    #[inline]
    fn size(&self) -> usize {
        (self.end() as usize) - (self.begin() as usize)
    }

    /// Whether `p` lies inside the region
    #[inline]
    fn contains(&self, p: *const u8) -> bool {
        let addr = p as usize;
        addr >= self.begin() as usize && addr < self.end() as usize
    }
}

/// Heap-owned area, sole owner of its block
pub struct HeapArea {
    start: *mut u8,
    layout: Layout,
}

impl HeapArea {
    /// Allocate `size` bytes from the system
    ///
    /// Allocation failure yields an empty area; callers check `size() == 0`.
    pub fn new(size: usize) -> Self {
        if size == 0 {
            return Self::default();
        }

        let Ok(layout) = Layout::from_size_align(size, MAX_ALIGN) else {
            return Self::default();
        };

        let start = unsafe { alloc(layout) };
        if start.is_null() {
            tracing::warn!(
                event = "area_alloc_failed",
                size_bytes = size,
                "Heap area allocation failed, using empty area"
            );
            return Self::default();
        }

        Self { start, layout }
    }
}

impl Default for HeapArea {
    fn default() -> Self {
        Self {
            start: ptr::null_mut(),
            layout: Layout::new::<()>(),
        }
    }
}

impl Area for HeapArea {
    #[inline]
    fn begin(&self) -> *mut u8 {
        self.start
    }

    #[inline]
    fn end(&self) -> *mut u8 {
        self.start.wrapping_add(self.layout.size())
    }
}

impl Drop for HeapArea {
    fn drop(&mut self) {
        if !self.start.is_null() {
            unsafe {
                dealloc(self.start, self.layout);
            }
        }
    }
}

// The block is exclusively owned and never reallocated
unsafe impl Send for HeapArea {}
unsafe impl Sync for HeapArea {}

/// Borrowed area over memory owned elsewhere, never frees
///
/// One area per borrow. It cannot be duplicated, so no two Ponds carve the
/// same bytes:
///
/// ```compile_fail
/// use pond_mem::StaticArea;
///
/// let mut bytes = [0u8; 64];
/// let area = StaticArea::from_slice(&mut bytes);
/// let twin = area;
/// let _ = (area, twin);
/// ```
pub struct StaticArea<'a> {
    begin: *mut u8,
    end: *mut u8,
    _marker: PhantomData<&'a mut [u8]>,
}

impl<'a> StaticArea<'a> {
    /// Wrap a mutable slice for the duration of the borrow
    pub fn from_slice(bytes: &'a mut [u8]) -> Self {
        let range = bytes.as_mut_ptr_range();
        Self {
            begin: range.start,
            end: range.end,
            _marker: PhantomData,
        }
    }

    /// Wrap an externally owned region
    ///
    /// # Safety
    /// `[begin, end)` must be valid for reads and writes for `'a`, and
    /// `begin <= end`.
    pub unsafe fn from_raw_parts(begin: *mut u8, end: *mut u8) -> Self {
        debug_assert!(begin <= end, "invalid area bounds");
        Self {
            begin,
            end,
            _marker: PhantomData,
        }
    }
}

impl Default for StaticArea<'_> {
    fn default() -> Self {
        Self {
            begin: ptr::null_mut(),
            end: ptr::null_mut(),
            _marker: PhantomData,
        }
    }
}

impl Area for StaticArea<'_> {
    #[inline]
    fn begin(&self) -> *mut u8 {
        self.begin
    }

    #[inline]
    fn end(&self) -> *mut u8 {
        self.end
    }
}

unsafe impl Send for StaticArea<'_> {}
unsafe impl Sync for StaticArea<'_> {}

/// Zero-capacity placeholder
#[derive(Debug, Clone, Copy, Default)]
pub struct NullArea;

impl Area for NullArea {
    #[inline]
    fn begin(&self) -> *mut u8 {
        ptr::null_mut()
    }

    #[inline]
    fn end(&self) -> *mut u8 {
        ptr::null_mut()
    }

    #[inline]
    fn size(&self) -> usize {
        0
    }
}
