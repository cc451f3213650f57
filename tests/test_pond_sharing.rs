use pond_mem::{
    Area, LinearAllocator, MutexLock, NoLock, Pond, PondArc, PoolAllocator, SpinLock, StaticArea,
    MAX_ALIGN,
};
use std::collections::HashSet;
use std::sync::Mutex;
use std::thread;

#[test]
fn test_pool_blocks_never_alias_across_threads() {
    let pond: Pond<PoolAllocator, MutexLock> = Pond::with_capacity("shared", 64 * 32, |area| {
        PoolAllocator::from_area(area, 64, MAX_ALIGN)
    });
    let seen = Mutex::new(HashSet::new());

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let blocks: Vec<_> = (0..16)
                    .map(|_| pond.alloc(64, MAX_ALIGN, 0).expect("alloc"))
                    .collect();

                let mut seen = seen.lock().expect("poisoned");
                for p in &blocks {
                    assert!(seen.insert(p.as_ptr() as usize), "block handed out twice");
                }
            });
        }
    });

    // 128 live blocks: 32 from the area, the rest from the platform
    assert_eq!(pond.size(), 128 * 64);
    assert_eq!(seen.lock().expect("poisoned").len(), 128);
}

#[test]
fn test_shared_handle_outlives_clones_on_other_threads() {
    let pond: Pond<PoolAllocator, SpinLock> = Pond::with_capacity("arc", 128 * 4, |area| {
        PoolAllocator::from_area(area, 128, MAX_ALIGN)
    });

    let text = pond
        .make_shared(String::from("pond"))
        .expect("make_shared");

    let lengths: Vec<usize> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let text = text.clone();
                scope.spawn(move || text.len())
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect()
    });

    assert_eq!(lengths, vec![4; 4]);
    assert_eq!(PondArc::strong_count(&text), 1);
    drop(text);
    assert_eq!(pond.size(), 0);
}

#[test]
fn test_scratch_pond_over_stack_memory() {
    let mut scratch = [0u8; 512];
    let pond: Pond<LinearAllocator, NoLock, StaticArea<'_>> = Pond::with_area(
        "scratch",
        StaticArea::from_slice(&mut scratch),
        LinearAllocator::from_area,
    );

    let mark = pond.current().expect("checkpoint");
    for round in 0..10u32 {
        let values = pond.alloc_array::<u32>(64).expect("array");
        assert!(pond.area().contains(values.as_ptr().cast::<u8>()));
        unsafe { values.as_ptr().write(round) };
        pond.rewind(mark);
    }

    assert_eq!(pond.size(), 0);
    assert!(pond.alloc_array::<u32>(129).is_none());
}
