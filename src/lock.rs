//! Locking policies - synchronization strategies injected into a Pond
//!
//! Design: A policy is a raw lock with no data attached. The Pond decides
//! what the lock protects and holds a `LockGuard` for every mutation, so the
//! lock is released on all exit paths, including early returns.
//!
//! - `NoLock`: no synchronization, `!Sync`, single-owner Ponds only
//! - `MutexLock`: blocking mutex (parking_lot)
//! - `SpinLock`: busy-wait on an atomic flag
//! - `RwLock`: read/write lock (parking_lot)

use core::cell::Cell;
use core::fmt;
use core::hint;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, Ordering};
use parking_lot::lock_api::{RawMutex as _, RawRwLock as _};

/// Exclusive lock contract
pub trait LockingPolicy: Default {
    /// Block (or spin) until the lock is held
    fn lock(&self);

    /// Take the lock if it is free
    fn try_lock(&self) -> bool;

    /// Release the lock
    ///
    /// # Safety
    /// Must only be called by the holder of the lock.
    unsafe fn unlock(&self);

    /// Scoped exclusive acquisition
    #[inline]
    fn guard(&self) -> LockGuard<'_, Self>
    where
        Self: Sized,
    {
        self.lock();
        LockGuard { lock: self }
    }

    #[inline]
    fn try_guard(&self) -> Option<LockGuard<'_, Self>>
    where
        Self: Sized,
    {
        self.try_lock().then(|| LockGuard { lock: self })
    }
}

/// Shared (read) side of a read/write policy
pub trait SharedLockingPolicy: LockingPolicy {
    fn lock_shared(&self);

    fn try_lock_shared(&self) -> bool;

    /// # Safety
    /// Must only be called by a holder of a shared lock.
    unsafe fn unlock_shared(&self);

    /// Scoped shared acquisition
    #[inline]
    fn read_guard(&self) -> ReadGuard<'_, Self>
    where
        Self: Sized,
    {
        self.lock_shared();
        ReadGuard { lock: self }
    }
}

/// Releases an exclusive lock on drop
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a, L: LockingPolicy> {
    lock: &'a L,
}

impl<L: LockingPolicy> Drop for LockGuard<'_, L> {
    #[inline]
    fn drop(&mut self) {
        unsafe { self.lock.unlock() }
    }
}

/// Releases a shared lock on drop
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ReadGuard<'a, L: SharedLockingPolicy> {
    lock: &'a L,
}

impl<L: SharedLockingPolicy> Drop for ReadGuard<'_, L> {
    #[inline]
    fn drop(&mut self) {
        unsafe { self.lock.unlock_shared() }
    }
}

// ============================================================================
// Policies
// ============================================================================

/// No synchronization at all
///
/// Not `Sync`: a Pond using it can move between threads but never be shared.
#[derive(Default)]
pub struct NoLock {
    _not_sync: PhantomData<Cell<()>>,
}

impl LockingPolicy for NoLock {
    #[inline(always)]
    fn lock(&self) {}

    #[inline(always)]
    fn try_lock(&self) -> bool {
        true
    }

    #[inline(always)]
    unsafe fn unlock(&self) {}
}

impl SharedLockingPolicy for NoLock {
    #[inline(always)]
    fn lock_shared(&self) {}

    #[inline(always)]
    fn try_lock_shared(&self) -> bool {
        true
    }

    #[inline(always)]
    unsafe fn unlock_shared(&self) {}
}

impl fmt::Debug for NoLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NoLock")
    }
}

/// Blocking mutex
pub struct MutexLock {
    raw: parking_lot::RawMutex,
}

impl Default for MutexLock {
    fn default() -> Self {
        Self {
            raw: parking_lot::RawMutex::INIT,
        }
    }
}

impl LockingPolicy for MutexLock {
    #[inline]
    fn lock(&self) {
        self.raw.lock();
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.raw.try_lock()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.raw.unlock();
    }
}

impl fmt::Debug for MutexLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexLock")
            .field("locked", &self.raw.is_locked())
            .finish()
    }
}

/// Busy-waiting lock for very short critical sections
#[derive(Default)]
pub struct SpinLock {
    locked: AtomicBool,
}

impl LockingPolicy for SpinLock {
    #[inline]
    fn lock(&self) {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // Spin on a plain load to keep the cache line shared
            while self.locked.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

impl fmt::Debug for SpinLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinLock")
            .field("locked", &self.locked.load(Ordering::Relaxed))
            .finish()
    }
}

/// Read/write lock; the exclusive side satisfies `LockingPolicy`
pub struct RwLock {
    raw: parking_lot::RawRwLock,
}

impl Default for RwLock {
    fn default() -> Self {
        Self {
            raw: parking_lot::RawRwLock::INIT,
        }
    }
}

impl LockingPolicy for RwLock {
    #[inline]
    fn lock(&self) {
        self.raw.lock_exclusive();
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.raw.try_lock_exclusive()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.raw.unlock_exclusive();
    }
}

impl SharedLockingPolicy for RwLock {
    #[inline]
    fn lock_shared(&self) {
        self.raw.lock_shared();
    }

    #[inline]
    fn try_lock_shared(&self) -> bool {
        self.raw.try_lock_shared()
    }

    #[inline]
    unsafe fn unlock_shared(&self) {
        self.raw.unlock_shared();
    }
}

impl fmt::Debug for RwLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RwLock")
            .field("locked", &self.raw.is_locked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::UnsafeCell;
    use std::sync::Arc;
    use std::thread;

    struct Guarded<L> {
        lock: L,
        value: UnsafeCell<u64>,
    }

    unsafe impl<L: Sync> Sync for Guarded<L> {}

    fn hammer<L: LockingPolicy + Send + Sync + 'static>() -> u64 {
        let shared = Arc::new(Guarded {
            lock: L::default(),
            value: UnsafeCell::new(0),
        });

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        let _guard = shared.lock.guard();
                        unsafe { *shared.value.get() += 1 };
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("worker panicked");
        }

        let _guard = shared.lock.guard();
        unsafe { *shared.value.get() }
    }

    #[test]
    fn mutex_excludes_concurrent_writers() {
        assert_eq!(hammer::<MutexLock>(), 40_000);
    }

    #[test]
    fn spinlock_excludes_concurrent_writers() {
        assert_eq!(hammer::<SpinLock>(), 40_000);
    }

    #[test]
    fn rwlock_excludes_concurrent_writers() {
        assert_eq!(hammer::<RwLock>(), 40_000);
    }

    #[test]
    fn guard_releases_on_drop() {
        let lock = MutexLock::default();
        {
            let _guard = lock.guard();
            assert!(!lock.try_lock());
        }
        assert!(lock.try_lock());
        unsafe { lock.unlock() };
    }

    #[test]
    fn spin_try_guard_fails_while_held() {
        let lock = SpinLock::default();
        let guard = lock.try_guard().expect("free lock");
        assert!(lock.try_guard().is_none());
        drop(guard);
        assert!(lock.try_guard().is_some());
    }

    #[test]
    fn rwlock_allows_many_readers_but_no_writer() {
        let lock = RwLock::default();
        let first = lock.read_guard();
        assert!(lock.try_lock_shared());
        unsafe { lock.unlock_shared() };
        assert!(!lock.try_lock());
        drop(first);
        assert!(lock.try_lock());
        unsafe { lock.unlock() };
    }

    #[test]
    fn nolock_never_blocks() {
        let lock = NoLock::default();
        let _a = lock.guard();
        let _b = lock.guard();
        assert!(lock.try_lock());
    }
}
