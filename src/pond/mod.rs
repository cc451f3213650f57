//! Pond - one area, one allocator strategy and one locking policy
//!
//! Design: The three policies are type parameters, so a Pond is a single
//! composed type with no dynamic dispatch:
//! 1. The area owns (or borrows) the memory
//! 2. The allocator carves it, and may fall back to the platform
//! 3. The lock serializes every allocator access
//!
//! Typed helpers construct values in place and hand out owning handles that
//! return their block to this Pond when released.

mod adapter;
mod handle;


pub use adapter::PondAllocator;
pub use handle::{Deallocate, PondArc, PondBox, RawAllocate};

use crate::allocator::{Allocator, HeapAllocator, MAX_ALIGN};
use crate::area::{Area, HeapArea, NullArea};
use crate::error::AllocError;
use crate::lock::{LockingPolicy, NoLock};
use crate::logging::log_pond_created;
use core::cell::UnsafeCell;
use core::fmt;
use core::mem;
use core::ptr::{self, NonNull};
use handle::ArcInner;

/// Unsynchronized heap passthrough
pub type HeapPond = Pond<HeapAllocator, NoLock, NullArea>;

/// Area + allocator + lock facade
///
/// Not `Clone`: an allocator cannot be duplicated. Moving is fine since the
/// allocator only refers to the area's memory, never to the area value.
pub struct Pond<Al, L = NoLock, A = HeapArea> {
    // Dropped before the area: a free list walks area-resident nodes on drop
    allocator: UnsafeCell<Al>,
    area: A,
    lock: L,
    name: &'static str,
}

impl<Al, L, A> Pond<Al, L, A>
where
    Al: Allocator,
    L: LockingPolicy,
    A: Area,
{
    /// Pond over a default area with a default allocator
    pub fn new(name: &'static str) -> Self
    where
        Al: Default,
        A: Default,
    {
        Self::with_area(name, A::default(), |_| Al::default())
    }

    /// Pond over `area`, the allocator built from it
    pub fn with_area(name: &'static str, area: A, build: impl FnOnce(&A) -> Al) -> Self {
        let allocator = build(&area);
        log_pond_created(name, area.size());

        Self {
            allocator: UnsafeCell::new(allocator),
            area,
            lock: L::default(),
            name,
        }
    }

    /// Allocate memory of the given size and alignment
    ///
    /// What is acceptable depends on the allocator strategy; exhaustion
    /// returns `None`.
    #[inline]
    pub fn alloc(&self, size: usize, alignment: usize, extra: usize) -> Option<NonNull<u8>> {
        let _guard = self.lock.guard();
        unsafe { (*self.allocator.get()).alloc(size, alignment, extra) }
    }

    /// Allocate with the strictest fundamental alignment
    #[inline]
    pub fn alloc_default(&self, size: usize) -> Option<NonNull<u8>> {
        self.alloc(size, MAX_ALIGN, 0)
    }

    /// `alloc` with exhaustion as a typed error
    pub fn try_alloc(
        &self,
        size: usize,
        alignment: usize,
        extra: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        if !alignment.is_power_of_two() {
            return Err(AllocError::InvalidLayout { size, alignment });
        }
        self.alloc(size, alignment, extra)
            .ok_or(AllocError::Exhausted { size, alignment })
    }

    /// Allocate an array of `count` values
    ///
    /// Restricted to `Copy` types: untyped `free` never runs destructors.
    pub fn alloc_array<T: Copy>(&self, count: usize) -> Option<NonNull<T>> {
        let size = mem::size_of::<T>().checked_mul(count)?;
        self.alloc(size, mem::align_of::<T>(), 0).map(NonNull::cast)
    }

    /// Release memory; `None` is a no-op
    ///
    /// # Safety
    /// `ptr` must come from this Pond and must not be used afterwards.
    #[inline]
    pub unsafe fn free(&self, ptr: Option<NonNull<u8>>) {
        self.free_sized(ptr, 0);
    }

    /// Release memory of a known size; `None` is a no-op
    ///
    /// # Safety
    /// `ptr` must come from this Pond and must not be used afterwards.
    #[inline]
    pub unsafe fn free_sized(&self, ptr: Option<NonNull<u8>>, size: usize) {
        if let Some(ptr) = ptr {
            let _guard = self.lock.guard();
            (*self.allocator.get()).free(ptr, size);
        }
    }

    /// Reset the allocator
    ///
    /// Bump allocators rewind to the start; pool allocators give unused
    /// platform nodes back.
    pub fn reset(&self) {
        let _guard = self.lock.guard();
        unsafe { (*self.allocator.get()).reset() }
    }

    /// Roll a bump allocator back to a checkpoint from `current`
    pub fn rewind(&self, ptr: NonNull<u8>) {
        let _guard = self.lock.guard();
        unsafe { (*self.allocator.get()).rewind(ptr) }
    }

    /// Current checkpoint (bump) or next free block (pool)
    pub fn current(&self) -> Option<NonNull<u8>> {
        let _guard = self.lock.guard();
        unsafe { (*self.allocator.get()).current() }
    }

    pub fn size(&self) -> usize {
        let _guard = self.lock.guard();
        unsafe { (*self.allocator.get()).size() }
    }

    pub fn capacity(&self) -> usize {
        let _guard = self.lock.guard();
        unsafe { (*self.allocator.get()).capacity() }
    }

    /// Run `f` against the allocator while the lock is held
    pub fn with_allocator<R>(&self, f: impl FnOnce(&Al) -> R) -> R {
        let _guard = self.lock.guard();
        f(unsafe { &*self.allocator.get() })
    }

    /// Allocate and construct a value in place
    ///
    /// On exhaustion `value` is dropped and `None` returned. The result must
    /// be released with `destroy` on this Pond.
    pub fn make<T>(&self, value: T) -> Option<NonNull<T>> {
        let ptr = self.alloc(mem::size_of::<T>(), mem::align_of::<T>(), 0)?.cast::<T>();
        unsafe { ptr.as_ptr().write(value) };
        Some(ptr)
    }

    /// Drop a value built by `make` and release its block
    ///
    /// # Safety
    /// `ptr` must come from `make` on this Pond and not have been destroyed.
    pub unsafe fn destroy<T>(&self, ptr: NonNull<T>) {
        ptr::drop_in_place(ptr.as_ptr());
        self.free_sized(Some(ptr.cast()), mem::size_of::<T>());
    }

    /// Construct a value owned by a unique handle bound to this Pond
    pub fn make_unique<T>(&self, value: T) -> Option<PondBox<'_, T, Self>> {
        let ptr = self.make(value)?;
        Some(unsafe { PondBox::from_raw(ptr, self) })
    }

    /// Construct a value owned by a reference-counted handle bound to this Pond
    pub fn make_shared<T>(&self, value: T) -> Option<PondArc<'_, T, Self>> {
        let inner = self.make(ArcInner::new(value))?;
        Some(unsafe { PondArc::from_inner(inner, self) })
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn area(&self) -> &A {
        &self.area
    }

    /// Exclusive access to the allocator, no locking needed
    #[inline]
    pub fn allocator_mut(&mut self) -> &mut Al {
        self.allocator.get_mut()
    }
}

impl<Al, L> Pond<Al, L, HeapArea>
where
    Al: Allocator,
    L: LockingPolicy,
{
    /// Pond over a freshly allocated heap area of `size` bytes
    pub fn with_capacity(name: &'static str, size: usize, build: impl FnOnce(&HeapArea) -> Al) -> Self {
        Self::with_area(name, HeapArea::new(size), build)
    }
}

impl<Al, L, A> Deallocate for Pond<Al, L, A>
where
    Al: Allocator,
    L: LockingPolicy,
    A: Area,
{
    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        self.free_sized(Some(ptr), size);
    }
}

impl<Al, L, A> RawAllocate for Pond<Al, L, A>
where
    Al: Allocator,
    L: LockingPolicy,
    A: Area,
{
    #[inline]
    fn allocate(&self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
        self.alloc(size, alignment, 0)
    }
}

impl<Al, L, A> fmt::Debug for Pond<Al, L, A>
where
    Al: Allocator,
    L: LockingPolicy,
    A: Area,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pond")
            .field("name", &self.name)
            .field("area_size", &self.area.size())
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .finish()
    }
}

// Every access to the allocator goes through the lock, so sharing is sound
// exactly when the lock policy itself is Sync
unsafe impl<Al: Send, L: LockingPolicy + Sync, A: Sync> Sync for Pond<Al, L, A> {}
