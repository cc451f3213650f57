//! Global memory pool tests
//!
//! Each test builds its own pool so live-byte counters never interfere.

use super::*;
use proptest::prelude::*;

const S: usize = 8 * 1024;
const M: usize = 64 * 1024;

fn pool() -> GlobalMemoryPool {
    GlobalMemoryPool::new(PoolConfig::default())
}

/// Allocate `n` bytes and hand back the block with its rewritten size
fn take(pool: &GlobalMemoryPool, n: usize) -> (NonNull<u8>, usize) {
    let mut size = n;
    let ptr = pool.alloc(&mut size).expect("pool alloc");
    (ptr, size)
}

#[test]
fn requests_route_to_size_classes() {
    let pool = pool();

    for (request, expected) in [(1, S), (S, S), (S + 1, M), (M, M), (M + 1, M + 1)] {
        let (ptr, size) = take(&pool, request);
        assert_eq!(size, expected, "request of {request} bytes");
        unsafe { pool.free(Some(ptr), size) };
    }

    assert_eq!(pool.allocated_size(), 0);
}

#[test]
fn size_class_boundaries() {
    let config = PoolConfig::default();

    assert_eq!(SizeClass::of(0, &config), SizeClass::Small);
    assert_eq!(SizeClass::of(S, &config), SizeClass::Small);
    assert_eq!(SizeClass::of(S + 1, &config), SizeClass::Medium);
    assert_eq!(SizeClass::of(M, &config), SizeClass::Medium);
    assert_eq!(SizeClass::of(M + 1, &config), SizeClass::Heap);
}

#[test]
fn rewritten_size_is_stable() {
    let pool = pool();

    for request in [100, 20_000, 100_000] {
        let (first, size) = take(&pool, request);
        let (second, again) = take(&pool, size);
        assert_eq!(size, again);

        unsafe {
            pool.free(Some(first), size);
            pool.free(Some(second), again);
        }
    }
}

#[test]
fn blocks_are_zeroed_on_reuse() {
    let pool = pool();

    let (ptr, size) = take(&pool, 1000);
    unsafe {
        ptr::write_bytes(ptr.as_ptr(), 0xAB, size);
        pool.free(Some(ptr), size);
    }

    let (reused, size) = take(&pool, 1000);
    assert_eq!(reused, ptr);

    let bytes = unsafe { core::slice::from_raw_parts(reused.as_ptr(), size) };
    assert!(bytes.iter().all(|&b| b == 0));
    unsafe { pool.free(Some(reused), size) };
}

#[test]
fn heap_blocks_are_zeroed_and_exact() {
    let pool = pool();
    let (ptr, size) = take(&pool, M + 123);

    assert_eq!(size, M + 123);
    let bytes = unsafe { core::slice::from_raw_parts(ptr.as_ptr(), size) };
    assert!(bytes.iter().all(|&b| b == 0));

    assert_eq!(pool.allocated_size(), (M + 123) as u64);
    unsafe { pool.free(Some(ptr), size) };
    assert_eq!(pool.allocated_size(), 0);
}

#[test]
fn counter_tracks_live_bytes() {
    let pool = pool();

    let (a, a_size) = take(&pool, 10);
    let (b, b_size) = take(&pool, 10_000);
    assert_eq!(pool.allocated_size(), (S + M) as u64);
    assert_eq!(pool.pool_size(), (S + M) as u64);

    unsafe { pool.free(Some(a), a_size) };
    assert_eq!(pool.allocated_size(), M as u64);

    unsafe { pool.free(Some(b), b_size) };
    assert_eq!(pool.allocated_size(), 0);
    assert_eq!(pool.pool_size(), 0);
}

#[test]
fn free_ignores_null_and_zero_size() {
    let pool = pool();
    let (ptr, size) = take(&pool, 10);

    unsafe {
        pool.free(None, size);
        pool.free(Some(ptr), 0);
    }
    assert_eq!(pool.allocated_size(), S as u64);

    unsafe { pool.free(Some(ptr), size) };
    assert_eq!(pool.allocated_size(), 0);
}

#[test]
fn initial_capacity_matches_preseeded_areas() {
    let pool = pool();
    let stats = pool.stats();

    assert_eq!(stats.small_capacity, 32 * S as u64);
    assert_eq!(stats.medium_capacity, 16 * M as u64);
    assert_eq!(stats.pool_capacity, pool.pool_capacity());
    assert_eq!(stats.pool_size, 0);
    assert_eq!(stats.allocated_bytes, 0);
}

#[test]
fn gc_trims_fallback_node_back_to_preseeded_capacity() {
    let pool = pool();

    let blocks: Vec<_> = (0..33).map(|_| take(&pool, 8000)).collect();
    assert!(blocks.iter().all(|&(_, size)| size == S));
    assert_eq!(pool.stats().small_capacity, 33 * S as u64);
    assert_eq!(pool.allocated_size(), 33 * S as u64);

    for (ptr, size) in blocks {
        unsafe { pool.free(Some(ptr), size) };
    }
    assert_eq!(pool.stats().small_capacity, 33 * S as u64);

    pool.gc();

    let stats = pool.stats();
    assert_eq!(stats.small_capacity, 262_144);
    assert_eq!(stats.pool_capacity, 262_144 + 16 * M as u64);
    assert_eq!(stats.allocated_bytes, 0);
}

#[test]
fn gc_never_reclaims_live_blocks() {
    let pool = pool();
    let blocks: Vec<_> = (0..34).map(|_| take(&pool, 1)).collect();

    pool.gc();
    assert_eq!(pool.pool_size(), 34 * S as u64);
    assert_eq!(pool.stats().small_capacity, 34 * S as u64);

    for (ptr, size) in blocks {
        unsafe { pool.free(Some(ptr), size) };
    }
    pool.gc();
    assert_eq!(pool.stats().small_capacity, 32 * S as u64);
}

#[test]
fn custom_size_classes_are_honoured() {
    let config = PoolConfig {
        small_element_size: 256,
        small_preallocated: 4,
        medium_element_size: 4096,
        medium_preallocated: 2,
        ..PoolConfig::default()
    };
    let pool = GlobalMemoryPool::try_new(config).expect("valid config");

    let (ptr, size) = take(&pool, 200);
    assert_eq!(size, 256);
    assert_eq!(pool.pool_capacity(), 4 * 256 + 2 * 4096);
    unsafe { pool.free(Some(ptr), size) };
}

#[test]
fn invalid_config_is_rejected_or_replaced() {
    let config = PoolConfig {
        small_element_size: 4096,
        medium_element_size: 1024,
        ..PoolConfig::default()
    };

    assert!(GlobalMemoryPool::try_new(config.clone()).is_err());
    assert_eq!(GlobalMemoryPool::new(config).config(), &PoolConfig::default());
}

#[test]
fn overflowing_preallocation_falls_back_to_defaults() {
    let config = PoolConfig {
        small_preallocated: usize::MAX / 2,
        ..PoolConfig::default()
    };

    assert!(GlobalMemoryPool::try_new(config.clone()).is_err());
    let pool = GlobalMemoryPool::new(config);
    assert_eq!(pool.config(), &PoolConfig::default());
    assert_eq!(pool.stats().small_capacity, 32 * S as u64);
}

#[test]
fn concurrent_alloc_free_balances_counter() {
    let pool = pool();

    std::thread::scope(|scope| {
        for t in 0..4usize {
            let pool = &pool;
            scope.spawn(move || {
                for i in 0..200usize {
                    let request = [64, 9000, 70_000][(t + i) % 3];
                    let (ptr, size) = take(pool, request);
                    unsafe {
                        ptr.as_ptr().write(t as u8);
                        pool.free(Some(ptr), size);
                    }
                }
            });
        }
    });

    assert_eq!(pool.allocated_size(), 0);
    assert_eq!(pool.pool_size(), 0);
}

#[test]
fn global_instance_is_shared() {
    let a = global() as *const GlobalMemoryPool;
    let b = global() as *const GlobalMemoryPool;
    assert_eq!(a, b);
    assert!(configure(PoolConfig::default()).is_err());
}

proptest! {
    #[test]
    fn rewritten_size_covers_request(request in 0usize..200_000) {
        let pool = pool();
        let (ptr, size) = take(&pool, request);

        prop_assert!(size >= request);
        prop_assert_eq!(ptr.as_ptr() as usize % pool.config().alignment, 0);
        unsafe { pool.free(Some(ptr), size) };
        prop_assert_eq!(pool.allocated_size(), 0);
    }
}
