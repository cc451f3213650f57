//! Typed allocation handle over a Pond for container-style callers

use super::handle::RawAllocate;
use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr::{self, NonNull};

/// Allocates arrays of `T` from a borrowed Pond
///
/// Two adapters compare equal when they draw from the same Pond, so memory
/// from one may be released through the other.
pub struct PondAllocator<'p, T, P: RawAllocate + ?Sized> {
    pond: &'p P,
    _marker: PhantomData<fn() -> T>,
}

impl<'p, T, P: RawAllocate + ?Sized> PondAllocator<'p, T, P> {
    pub fn new(pond: &'p P) -> Self {
        Self {
            pond,
            _marker: PhantomData,
        }
    }

    /// Uninitialized storage for `n` values
    pub fn allocate(&self, n: usize) -> Option<NonNull<T>> {
        let size = mem::size_of::<T>().checked_mul(n)?;
        self.pond
            .allocate(size, mem::align_of::<T>())
            .map(NonNull::cast)
    }

    /// # Safety
    /// `ptr` must come from `allocate(n)` on an equal adapter.
    pub unsafe fn deallocate(&self, ptr: NonNull<T>, n: usize) {
        self.pond.deallocate(ptr.cast(), mem::size_of::<T>() * n);
    }

    /// Same Pond, different element type
    pub fn rebind<U>(&self) -> PondAllocator<'p, U, P> {
        PondAllocator::new(self.pond)
    }

    #[inline]
    pub fn pond(&self) -> &'p P {
        self.pond
    }
}

impl<T, P: RawAllocate + ?Sized> Clone for PondAllocator<'_, T, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, P: RawAllocate + ?Sized> Copy for PondAllocator<'_, T, P> {}

impl<T, U, P: RawAllocate + ?Sized> PartialEq<PondAllocator<'_, U, P>> for PondAllocator<'_, T, P> {
    fn eq(&self, other: &PondAllocator<'_, U, P>) -> bool {
        ptr::eq(
            self.pond as *const P as *const (),
            other.pond as *const P as *const (),
        )
    }
}

impl<T, P: RawAllocate + ?Sized> fmt::Debug for PondAllocator<'_, T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PondAllocator")
            .field("element", &core::any::type_name::<T>())
            .field("pond", &(self.pond as *const P as *const ()))
            .finish()
    }
}
