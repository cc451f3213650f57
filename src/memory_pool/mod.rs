//! Global size-classed memory pool
//!
//! Design: Three Ponds selected by request size:
//! 1. Small class (default 8 KiB elements, 32 pre-seeded) under a mutex
//! 2. Medium class (default 64 KiB elements, 16 pre-seeded) under a mutex
//! 3. Anything larger goes straight to the platform, exact size
//!
//! `alloc` rewrites the caller's size to the class size so the same number
//! routes `free` back to the right Pond. Blocks are zero-filled. An atomic
//! counter tracks live bytes.
//!
//! The process-wide instance is created lazily and never dropped.

#[cfg(test)]
mod tests;

use crate::allocator::PoolAllocator;
use crate::area::HeapArea;
use crate::config::PoolConfig;
use crate::error::{ConfigError, Result};
use crate::lock::MutexLock;
use crate::logging::{log_allocation, log_deallocation, log_gc_complete};
use crate::pond::{HeapPond, Pond};
use core::ptr::{self, NonNull};
use core::sync::atomic::{AtomicU64, Ordering};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::time::Instant;

type FixedPond = Pond<PoolAllocator, MutexLock, HeapArea>;

/// Which Pond serves a request of a given size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeClass {
    Small,
    Medium,
    Heap,
}

impl SizeClass {
    #[inline]
    pub fn of(size: usize, config: &PoolConfig) -> Self {
        if size <= config.small_element_size {
            SizeClass::Small
        } else if size <= config.medium_element_size {
            SizeClass::Medium
        } else {
            SizeClass::Heap
        }
    }
}

/// Snapshot of pool usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Live bytes handed out across all classes
    pub allocated_bytes: u64,
    pub pool_capacity: u64,
    pub pool_size: u64,
    pub small_capacity: u64,
    pub medium_capacity: u64,
}

pub struct GlobalMemoryPool {
    heap: HeapPond,
    small: FixedPond,
    medium: FixedPond,
    allocated: AtomicU64,
    config: PoolConfig,
}

impl GlobalMemoryPool {
    /// Pool with the given size classes
    ///
    /// An invalid config is reported and replaced by the defaults.
    pub fn new(config: PoolConfig) -> Self {
        Self::try_new(config).unwrap_or_else(|error| {
            tracing::warn!(
                event = "pool_config_error",
                error = %error,
                "Falling back to default pool config"
            );
            Self::build(PoolConfig::default())
        })
    }

    pub fn try_new(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PoolConfig) -> Self {
        let alignment = config.alignment;
        let (small_size, medium_size) = (config.small_element_size, config.medium_element_size);

        let small = Pond::with_capacity("GlobalPoolSmall", config.small_area_size(), |area| {
            PoolAllocator::from_area(area, small_size, alignment)
        });
        let medium = Pond::with_capacity("GlobalPoolMedium", config.medium_area_size(), |area| {
            PoolAllocator::from_area(area, medium_size, alignment)
        });

        Self {
            heap: Pond::new("GlobalHeap"),
            small,
            medium,
            allocated: AtomicU64::new(0),
            config,
        }
    }

    /// Allocate at least `*size` zeroed bytes
    ///
    /// `*size` is rewritten to the class size on every call, successful or
    /// not. Pass that value back to `free`.
    pub fn alloc(&self, size: &mut usize) -> Option<NonNull<u8>> {
        let alignment = self.config.alignment;

        let ptr = match SizeClass::of(*size, &self.config) {
            SizeClass::Small => {
                *size = self.config.small_element_size;
                self.small.alloc(*size, alignment, 0)
            }
            SizeClass::Medium => {
                *size = self.config.medium_element_size;
                self.medium.alloc(*size, alignment, 0)
            }
            SizeClass::Heap => self.heap.alloc(*size, alignment, 0),
        }?;

        unsafe { ptr::write_bytes(ptr.as_ptr(), 0, *size) };
        self.allocated.fetch_add(*size as u64, Ordering::Relaxed);
        log_allocation(*size, ptr.as_ptr());

        Some(ptr)
    }

    /// Return a block; `None` or a zero size is a no-op
    ///
    /// # Safety
    /// `ptr` must come from `alloc` on this pool, and `size` must be the value
    /// `alloc` wrote back.
    pub unsafe fn free(&self, ptr: Option<NonNull<u8>>, size: usize) {
        let Some(ptr) = ptr else { return };
        if size == 0 {
            return;
        }

        let class = SizeClass::of(size, &self.config);
        debug_assert!(
            match class {
                SizeClass::Small => size == self.config.small_element_size,
                SizeClass::Medium => size == self.config.medium_element_size,
                SizeClass::Heap => true,
            },
            "free size must be the size reported by alloc"
        );

        match class {
            SizeClass::Small => self.small.free_sized(Some(ptr), size),
            SizeClass::Medium => self.medium.free_sized(Some(ptr), size),
            SizeClass::Heap => self.heap.free_sized(Some(ptr), size),
        }

        self.allocated.fetch_sub(size as u64, Ordering::Relaxed);
        log_deallocation(size, ptr.as_ptr());
    }

    /// Give unused platform nodes of both pools back; live blocks are untouched
    pub fn gc(&self) {
        let start = Instant::now();
        let before = self.pool_capacity();

        self.small.reset();
        self.medium.reset();

        log_gc_complete(
            start.elapsed().as_micros() as u64,
            before,
            self.pool_capacity(),
        );
    }

    /// Live bytes handed out
    #[inline]
    pub fn allocated_size(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Bytes both pools hold, in use or free
    pub fn pool_capacity(&self) -> u64 {
        (self.small.capacity() + self.medium.capacity()) as u64
    }

    /// Bytes both pools have handed out
    pub fn pool_size(&self) -> u64 {
        (self.small.size() + self.medium.size()) as u64
    }

    pub fn stats(&self) -> PoolStats {
        let small_capacity = self.small.capacity() as u64;
        let medium_capacity = self.medium.capacity() as u64;

        PoolStats {
            allocated_bytes: self.allocated_size(),
            pool_capacity: small_capacity + medium_capacity,
            pool_size: self.pool_size(),
            small_capacity,
            medium_capacity,
        }
    }

    #[inline]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

impl Default for GlobalMemoryPool {
    fn default() -> Self {
        Self::build(PoolConfig::default())
    }
}

// SAFETY: the heap Pond has no lock but its allocator is stateless and the
// platform allocate/free pair is thread-safe. The fixed Ponds use a mutex and
// the counter is atomic.
unsafe impl Sync for GlobalMemoryPool {}

// ============================================================================
// Process-wide instance
// ============================================================================

static GLOBAL: OnceCell<GlobalMemoryPool> = OnceCell::new();

/// Install the process-wide pool with `config`
///
/// Fails once the pool exists, whether installed here or created on first use.
pub fn configure(config: PoolConfig) -> Result<()> {
    let pool = GlobalMemoryPool::try_new(config)?;
    GLOBAL
        .set(pool)
        .map_err(|_| ConfigError::Invalid("global memory pool is already initialized".into()))
}

/// The process-wide pool, configured from `POND_POOL_CONFIG` on first use
pub fn global() -> &'static GlobalMemoryPool {
    GLOBAL.get_or_init(|| GlobalMemoryPool::new(PoolConfig::from_env()))
}

/// Allocate from the process-wide pool, see `GlobalMemoryPool::alloc`
#[inline]
pub fn alloc(size: &mut usize) -> Option<NonNull<u8>> {
    global().alloc(size)
}

/// Return a block to the process-wide pool
///
/// # Safety
/// See `GlobalMemoryPool::free`.
#[inline]
pub unsafe fn free(ptr: Option<NonNull<u8>>, size: usize) {
    global().free(ptr, size);
}

pub fn gc() {
    global().gc();
}

pub fn allocated_size() -> u64 {
    global().allocated_size()
}

pub fn pool_capacity() -> u64 {
    global().pool_capacity()
}

pub fn pool_size() -> u64 {
    global().pool_size()
}

pub fn stats() -> PoolStats {
    global().stats()
}
