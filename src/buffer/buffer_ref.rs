//! Shared storage behind a ByteBuffer, one block of the global pool

use crate::allocator::MAX_ALIGN;
use crate::logging::log_buffer_copy;
use crate::memory_pool;
use core::ptr::{self, NonNull};
use core::slice;
use std::alloc::{handle_alloc_error, Layout};

/// A zeroed block owned until drop, capacity as rewritten by the pool
pub(crate) struct BufferRef {
    ptr: NonNull<u8>,
    capacity: usize,
}

impl BufferRef {
    /// At least `size` zeroed bytes
    pub(crate) fn new(size: usize) -> Self {
        let (ptr, capacity) = Self::block(size);
        Self { ptr, capacity }
    }

    fn block(size: usize) -> (NonNull<u8>, usize) {
        let mut capacity = size;
        match memory_pool::alloc(&mut capacity) {
            Some(ptr) => (ptr, capacity),
            None => handle_alloc_error(
                Layout::from_size_align(capacity, MAX_ALIGN).unwrap_or_else(|_| Layout::new::<u8>()),
            ),
        }
    }

    /// Move to a block of at least `size` bytes, keeping the contents
    pub(crate) fn grow(&mut self, size: usize) {
        if size <= self.capacity {
            return;
        }

        let (ptr, capacity) = Self::block(size);
        unsafe {
            ptr::copy_nonoverlapping(self.ptr.as_ptr(), ptr.as_ptr(), self.capacity);
            memory_pool::free(Some(self.ptr), self.capacity);
        }
        self.ptr = ptr;
        self.capacity = capacity;
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.capacity) }
    }

    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.capacity) }
    }
}

/// Fresh block of the same capacity holding the same bytes
impl Clone for BufferRef {
    fn clone(&self) -> Self {
        log_buffer_copy(self.capacity);
        let copy = Self::new(self.capacity);
        unsafe { ptr::copy_nonoverlapping(self.ptr.as_ptr(), copy.ptr.as_ptr(), self.capacity) };
        copy
    }
}

impl Drop for BufferRef {
    fn drop(&mut self) {
        unsafe { memory_pool::free(Some(self.ptr), self.capacity) };
    }
}

// Sole owner of its block; shared access is read-only
unsafe impl Send for BufferRef {}
unsafe impl Sync for BufferRef {}
