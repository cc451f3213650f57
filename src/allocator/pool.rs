//! Pool allocation - fixed-size elements from an intrusive free list
//!
//! Design: A free slot stores the pointer to the next free slot in its own
//! first bytes. Once popped, the slot belongs entirely to the caller.
//! - Pre-seeded slots are carved from an area in address order
//! - An empty list grows one node at a time from the platform
//! - `reset` returns platform nodes and keeps area nodes
//!
//! Blocks still held by callers when the pool is dropped are leaked.

use super::align::align_ptr_with_offset;
use super::platform::{aligned_alloc, aligned_free};
use super::Allocator;
use crate::area::Area;
use crate::logging::{log_fallback_node, log_pool_reset};
use core::mem;
use core::ptr::{self, NonNull};

#[cfg(debug_assertions)]
use std::collections::HashSet;

#[repr(C)]
struct Node {
    next: *mut Node,
}

/// Intrusive singly-linked free list of fixed-size elements
pub struct FreeList {
    element_size: usize,
    alignment: usize,
    head: *mut Node,
    area_begin: usize,
    area_end: usize,
    alloc_count: usize,
    /// Outstanding blocks, so double frees trip an assertion in debug builds
    #[cfg(debug_assertions)]
    live: HashSet<usize>,
}

impl FreeList {
    /// Empty list; every element comes from the platform
    pub fn new(element_size: usize, alignment: usize) -> Self {
        assert!(
            element_size >= mem::size_of::<*mut u8>(),
            "element size must hold at least a pointer"
        );
        debug_assert!(alignment.is_power_of_two(), "alignment must be power of 2");

        Self {
            element_size,
            alignment: alignment.max(mem::align_of::<Node>()),
            head: ptr::null_mut(),
            area_begin: 0,
            area_end: 0,
            alloc_count: 0,
            #[cfg(debug_assertions)]
            live: HashSet::new(),
        }
    }

    /// List pre-seeded with every slot that fits in `[begin, end)`
    ///
    /// # Safety
    /// The region must be valid for writes while the list is alive.
    pub unsafe fn with_region(
        begin: *mut u8,
        end: *mut u8,
        element_size: usize,
        alignment: usize,
        offset: usize,
    ) -> Self {
        let mut list = Self::new(element_size, alignment);
        list.area_begin = begin as usize;
        list.area_end = end as usize;
        list.head = Self::carve(begin, end, element_size, list.alignment, offset);
        list
    }

    /// Slice the region into equal aligned slots chained in address order
    unsafe fn carve(
        begin: *mut u8,
        end: *mut u8,
        element_size: usize,
        alignment: usize,
        offset: usize,
    ) -> *mut Node {
        if begin.is_null() || begin >= end {
            return ptr::null_mut();
        }

        let first = align_ptr_with_offset(begin, alignment, offset);
        let second = align_ptr_with_offset(first.wrapping_add(element_size), alignment, offset);
        let stride = (second as usize) - (first as usize);

        if first as usize >= end as usize {
            return ptr::null_mut();
        }
        let count = ((end as usize) - (first as usize)) / stride;
        if count == 0 {
            return ptr::null_mut();
        }

        for i in 0..count {
            let node = first.add(i * stride) as *mut Node;
            let next = if i + 1 < count {
                first.add((i + 1) * stride) as *mut Node
            } else {
                ptr::null_mut()
            };
            node.write(Node { next });
        }

        debug_assert!(first as usize + count * stride <= end as usize);
        first as *mut Node
    }

    /// Take the head node, growing from the platform when empty
    pub fn pop(&mut self) -> Option<NonNull<u8>> {
        let node = match NonNull::new(self.head) {
            Some(head) => {
                self.head = unsafe { (*head.as_ptr()).next };
                head.cast::<u8>()
            }
            None => {
                let node = aligned_alloc(self.element_size, self.alignment)?;
                log_fallback_node(self.element_size, node.as_ptr());
                node
            }
        };

        self.alloc_count += 1;

        #[cfg(debug_assertions)]
        self.live.insert(node.as_ptr() as usize);

        Some(node)
    }

    /// Push a block back onto the head (LIFO reuse)
    ///
    /// # Safety
    /// `p` must have come from `pop` on this list and not been pushed since.
    pub unsafe fn push(&mut self, p: NonNull<u8>) {
        #[cfg(debug_assertions)]
        debug_assert!(
            self.live.remove(&(p.as_ptr() as usize)),
            "double free or foreign pointer pushed to free list"
        );
        debug_assert!(self.alloc_count > 0, "free list allocation count underflow");

        let node = p.cast::<Node>().as_ptr();
        node.write(Node { next: self.head });
        self.head = node;
        self.alloc_count = self.alloc_count.wrapping_sub(1);
    }

    /// Head of the free list
    #[inline]
    pub fn first(&self) -> Option<NonNull<u8>> {
        NonNull::new(self.head as *mut u8)
    }

    /// Release free nodes outside the seeded region, keep the rest
    ///
    /// Returns `(released, retained)` node counts.
    pub fn clear(&mut self) -> (usize, usize) {
        let mut released = 0;
        let mut retained = 0;

        let mut kept_head: *mut Node = ptr::null_mut();
        let mut kept_tail: *mut Node = ptr::null_mut();

        let mut cur = self.head;
        while !cur.is_null() {
            unsafe {
                let next = (*cur).next;

                if self.owns(cur as *const u8) {
                    (*cur).next = ptr::null_mut();
                    if kept_tail.is_null() {
                        kept_head = cur;
                    } else {
                        (*kept_tail).next = cur;
                    }
                    kept_tail = cur;
                    retained += 1;
                } else {
                    aligned_free(NonNull::new_unchecked(cur as *mut u8));
                    released += 1;
                }

                cur = next;
            }
        }

        self.head = kept_head;
        (released, retained)
    }

    /// Whether `p` lies in the seeded region
    #[inline]
    fn owns(&self, p: *const u8) -> bool {
        let addr = p as usize;
        addr >= self.area_begin && addr < self.area_end
    }

    /// Number of nodes currently on the list
    pub fn free_count(&self) -> usize {
        let mut count = 0;
        let mut cur = self.head;
        while !cur.is_null() {
            count += 1;
            cur = unsafe { (*cur).next };
        }
        count
    }

    /// Number of blocks handed out
    #[inline]
    pub fn alloc_count(&self) -> usize {
        self.alloc_count
    }

    #[inline]
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Bytes handed out
    #[inline]
    pub fn size(&self) -> usize {
        self.alloc_count * self.element_size
    }

    /// Bytes on the free list plus bytes handed out
    pub fn capacity(&self) -> usize {
        self.free_count() * self.element_size + self.size()
    }
}

impl Drop for FreeList {
    fn drop(&mut self) {
        self.clear();
    }
}

// Nodes are reached only through &mut self; the Pond serializes access
unsafe impl Send for FreeList {}

/// Fixed-size block allocator over a free list
///
/// Only requests up to `element_size` with at most the pool's alignment and
/// exactly the pool's offset are valid (checked in debug builds).
pub struct PoolAllocator {
    free_list: FreeList,
    offset: usize,
}

impl PoolAllocator {
    /// Pool with no pre-seeded slots
    pub fn new(element_size: usize, alignment: usize) -> Self {
        Self {
            free_list: FreeList::new(element_size, alignment),
            offset: 0,
        }
    }

    /// Pool pre-seeded from `area`
    pub fn from_area<A: Area + ?Sized>(area: &A, element_size: usize, alignment: usize) -> Self {
        Self::from_area_with_offset(area, element_size, alignment, 0)
    }

    /// Pool pre-seeded from `area`, aligning each slot after skipping `offset` bytes
    pub fn from_area_with_offset<A: Area + ?Sized>(
        area: &A,
        element_size: usize,
        alignment: usize,
        offset: usize,
    ) -> Self {
        let free_list =
            unsafe { FreeList::with_region(area.begin(), area.end(), element_size, alignment, offset) };
        Self { free_list, offset }
    }

    /// Pool sized and aligned for `T`
    pub fn for_type<T>() -> Self {
        Self::new(
            mem::size_of::<T>().max(mem::size_of::<*mut u8>()),
            mem::align_of::<T>(),
        )
    }

    #[inline]
    pub fn element_size(&self) -> usize {
        self.free_list.element_size()
    }

    #[inline]
    pub fn alignment(&self) -> usize {
        self.free_list.alignment()
    }

    /// Number of blocks handed out
    #[inline]
    pub fn alloc_count(&self) -> usize {
        self.free_list.alloc_count()
    }

    /// Number of blocks ready for reuse
    #[inline]
    pub fn free_count(&self) -> usize {
        self.free_list.free_count()
    }
}

impl Allocator for PoolAllocator {
    #[inline]
    fn alloc(&mut self, size: usize, alignment: usize, extra: usize) -> Option<NonNull<u8>> {
        debug_assert!(size <= self.element_size(), "request exceeds pool element size");
        debug_assert!(alignment <= self.alignment(), "request exceeds pool alignment");
        debug_assert!(extra == self.offset, "request offset differs from pool offset");
        self.free_list.pop()
    }

    #[inline]
    unsafe fn free(&mut self, ptr: NonNull<u8>, _size: usize) {
        self.free_list.push(ptr);
    }

    fn reset(&mut self) {
        let (released, retained) = self.free_list.clear();
        log_pool_reset(released, retained);
    }

    #[inline]
    fn current(&self) -> Option<NonNull<u8>> {
        self.free_list.first()
    }

    #[inline]
    fn size(&self) -> usize {
        self.free_list.size()
    }

    fn capacity(&self) -> usize {
        self.free_list.capacity()
    }
}
