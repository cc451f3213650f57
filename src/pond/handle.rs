//! Owning handles whose release returns the block to the originating Pond
//!
//! The deleter is the borrowed Pond itself, so a handle can never outlive the
//! memory it points into.

use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};
use core::sync::atomic::{self, AtomicUsize, Ordering};

/// Something a block can be handed back to
pub trait Deallocate {
    /// # Safety
    /// `ptr` must have been allocated by `self` and not released since.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize);
}

/// Something that hands out raw blocks
pub trait RawAllocate: Deallocate {
    fn allocate(&self, size: usize, alignment: usize) -> Option<NonNull<u8>>;
}

/// Unique owner of a value living in a Pond
pub struct PondBox<'p, T, P: Deallocate + ?Sized> {
    ptr: NonNull<T>,
    pond: &'p P,
    _owns: PhantomData<T>,
}

impl<'p, T, P: Deallocate + ?Sized> PondBox<'p, T, P> {
    /// # Safety
    /// `ptr` must hold an initialized `T` in a block of `pond` that nothing
    /// else releases.
    pub(crate) unsafe fn from_raw(ptr: NonNull<T>, pond: &'p P) -> Self {
        Self {
            ptr,
            pond,
            _owns: PhantomData,
        }
    }

    /// The Pond this value is returned to
    #[inline]
    pub fn pond(this: &Self) -> &'p P {
        this.pond
    }

    #[inline]
    pub fn as_ptr(this: &Self) -> NonNull<T> {
        this.ptr
    }
}

impl<T, P: Deallocate + ?Sized> Deref for PondBox<'_, T, P> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T, P: Deallocate + ?Sized> DerefMut for PondBox<'_, T, P> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { self.ptr.as_mut() }
    }
}

impl<T, P: Deallocate + ?Sized> Drop for PondBox<'_, T, P> {
    fn drop(&mut self) {
        unsafe {
            ptr::drop_in_place(self.ptr.as_ptr());
            self.pond.deallocate(self.ptr.cast(), mem::size_of::<T>());
        }
    }
}

impl<T: fmt::Debug, P: Deallocate + ?Sized> fmt::Debug for PondBox<'_, T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

unsafe impl<T: Send, P: Deallocate + Sync + ?Sized> Send for PondBox<'_, T, P> {}
unsafe impl<T: Sync, P: Deallocate + Sync + ?Sized> Sync for PondBox<'_, T, P> {}

/// Count and value share one Pond block
pub(crate) struct ArcInner<T> {
    strong: AtomicUsize,
    value: T,
}

impl<T> ArcInner<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            strong: AtomicUsize::new(1),
            value,
        }
    }
}

/// Shared owner of a value living in a Pond
///
/// The last handle to drop destroys the value and releases the block.
pub struct PondArc<'p, T, P: Deallocate + ?Sized> {
    inner: NonNull<ArcInner<T>>,
    pond: &'p P,
    _owns: PhantomData<ArcInner<T>>,
}

impl<'p, T, P: Deallocate + ?Sized> PondArc<'p, T, P> {
    /// # Safety
    /// `inner` must be a freshly constructed block of `pond` with a count of one.
    pub(crate) unsafe fn from_inner(inner: NonNull<ArcInner<T>>, pond: &'p P) -> Self {
        Self {
            inner,
            pond,
            _owns: PhantomData,
        }
    }

    #[inline]
    fn inner(&self) -> &ArcInner<T> {
        unsafe { self.inner.as_ref() }
    }

    /// Number of live handles
    #[inline]
    pub fn strong_count(this: &Self) -> usize {
        this.inner().strong.load(Ordering::Acquire)
    }

    /// Whether both handles share one allocation
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.inner == other.inner
    }

    /// Mutable access when this is the only handle
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        if this.inner().strong.load(Ordering::Acquire) == 1 {
            Some(unsafe { &mut (*this.inner.as_ptr()).value })
        } else {
            None
        }
    }

    #[inline]
    pub fn pond(this: &Self) -> &'p P {
        this.pond
    }
}

impl<T, P: Deallocate + ?Sized> Clone for PondArc<'_, T, P> {
    fn clone(&self) -> Self {
        let old = self.inner().strong.fetch_add(1, Ordering::Relaxed);
        debug_assert!(old > 0, "cloned a released handle");
        if old > isize::MAX as usize {
            std::process::abort();
        }

        Self {
            inner: self.inner,
            pond: self.pond,
            _owns: PhantomData,
        }
    }
}

impl<T, P: Deallocate + ?Sized> Deref for PondArc<'_, T, P> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.inner().value
    }
}

impl<T, P: Deallocate + ?Sized> Drop for PondArc<'_, T, P> {
    fn drop(&mut self) {
        if self.inner().strong.fetch_sub(1, Ordering::Release) != 1 {
            return;
        }

        // Synchronize with every prior release before tearing down
        atomic::fence(Ordering::Acquire);

        unsafe {
            ptr::drop_in_place(self.inner.as_ptr());
            self.pond
                .deallocate(self.inner.cast(), mem::size_of::<ArcInner<T>>());
        }
    }
}

impl<T: fmt::Debug, P: Deallocate + ?Sized> fmt::Debug for PondArc<'_, T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

unsafe impl<T: Send + Sync, P: Deallocate + Sync + ?Sized> Send for PondArc<'_, T, P> {}
unsafe impl<T: Send + Sync, P: Deallocate + Sync + ?Sized> Sync for PondArc<'_, T, P> {}
