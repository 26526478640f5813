use std::{ptr, rc::Rc};

use blockpool::{AllocError, BPPlatform, Configuration, Pool, PoolAllocator, PoolConfig, PoolError, Properties};

struct Tiny;

impl Configuration for Tiny {
    const NAME: &'static str = "tiny";
    const ELEMENTS_PER_BLOCK: usize = 10;
    const CAPACITY_BLOCKS: usize = 8;
}

#[test]
fn block_count_formula() {
    let allocator = PoolAllocator::<u16, Tiny>::new().expect("Created");

    //  Blocks of 20 bytes.
    for &(count, blocks) in &[(1, 1), (10, 1), (11, 2), (20, 2), (21, 3), (80, 8)] {
        let pointer = allocator.allocate(count).expect("Allocated");

        assert_eq!(blocks, allocator.pool().outstanding_blocks(), "count: {}", count);

        allocator.deallocate(pointer, count);

        assert_eq!(0, allocator.pool().outstanding_blocks(), "count: {}", count);
    }
}

#[test]
fn allocate_zero_leaves_pool_untouched() {
    let allocator = PoolAllocator::<u64, Tiny>::new().expect("Created");

    let before = allocator.pool().stats();

    assert_eq!(Ok(ptr::null_mut()), allocator.allocate(0));

    assert_eq!(before, allocator.pool().stats());
}

#[test]
fn capacity_boundary() {
    let allocator = PoolAllocator::<u32, Tiny>::new().expect("Created");

    //  Exactly at the boundary.
    let all = allocator.allocate(80).expect("Allocated");
    allocator.deallocate(all, 80);

    //  One element past it.
    let error = allocator.allocate(81).expect_err("Exhausted");

    assert_eq!(
        AllocError::OutOfMemory {
            count: 81,
            element_size: 4,
            source: PoolError::CapacityExceeded {
                pool: "tiny",
                requested_blocks: 9,
                outstanding_blocks: 0,
                capacity_blocks: 8,
            },
        },
        error);
}

#[test]
fn fragmentation_is_reported() {
    let allocator = PoolAllocator::<u8, Tiny>::new().expect("Created");

    let runs: Vec<_> = (0..8).map(|_| allocator.allocate(10).expect("Allocated")).collect();

    for (index, run) in runs.iter().enumerate() {
        if index % 2 == 0 {
            allocator.deallocate(*run, 10);
        }
    }

    //  4 blocks free, none adjacent.
    let error = allocator.allocate(20).expect_err("Fragmented");

    match error {
        AllocError::OutOfMemory { source: PoolError::Fragmented { requested_blocks, free_blocks, .. }, .. } => {
            assert_eq!(2, requested_blocks);
            assert_eq!(4, free_blocks);
        },
        _ => panic!("Unexpected error: {}", error),
    }

    for (index, run) in runs.iter().enumerate() {
        if index % 2 == 1 {
            allocator.deallocate(*run, 10);
        }
    }
}

#[test]
fn live_allocations_are_disjoint() {
    let allocator = PoolAllocator::<u32, Tiny>::new().expect("Created");

    //  8 blocks in total, the whole capacity.
    let counts = [3, 15, 1, 22, 10];

    let mut runs: Vec<_> = counts.iter().map(|&count| {
        let pointer = allocator.allocate(count).expect("Allocated");

        for i in 0..count {
            unsafe { pointer.add(i).write(count as u32) };
        }

        (pointer, count)
    }).collect();

    runs.sort_by_key(|(pointer, _)| *pointer as usize);

    for window in runs.windows(2) {
        let (first, count) = window[0];
        let end = first as usize + allocator.bytes_for(count).expect("Sized");

        assert!(end <= window[1].0 as usize, "{:x} > {:p}", end, window[1].0);
    }

    for (pointer, count) in runs {
        assert!((0..count).all(|i| unsafe { pointer.add(i).read() } == count as u32));

        allocator.deallocate(pointer, count);
    }

    assert_eq!(0, allocator.pool().outstanding_blocks());
}

#[test]
fn rebind_shares_nothing() {
    let allocator = PoolAllocator::<u8, Tiny>::new().expect("Created");
    let rebound = allocator.rebind::<u64>().expect("Rebound");

    let all = allocator.allocate(80).expect("Allocated");

    //  The rebound pool is unaffected by the exhaustion of the original.
    let other = rebound.allocate(80).expect("Allocated");

    assert!(!allocator.pool().contains(other as *const u8));
    assert!(!rebound.pool().contains(all));

    rebound.deallocate(other, 80);
    allocator.deallocate(all, 80);
}

#[test]
fn parent_serves_whole_requests() {
    let config = Properties::<Tiny>::pool_config_of::<u64>();
    let parent = Rc::new(Pool::new(config, None, BPPlatform::default()).expect("Created"));

    let allocator = PoolAllocator::<u32, Tiny>::with_parent(parent.clone()).expect("Created");

    let local = allocator.allocate(70).expect("Allocated");

    //  The child has a single block left; the request of 2 blocks goes to the parent, whole.
    let delegated = allocator.allocate(20).expect("Delegated");

    assert!(parent.contains(delegated as *const u8));
    assert_eq!(7, allocator.pool().outstanding_blocks());
    assert_eq!(1, parent.outstanding_blocks());

    allocator.deallocate(delegated, 20);

    assert_eq!(0, parent.outstanding_blocks());
    assert_eq!(7, allocator.pool().outstanding_blocks());

    allocator.deallocate(local, 70);
}

#[test]
fn parent_exhaustion_is_reported() {
    let config = PoolConfig::new("parent", 40, 8).with_alignment(4);
    let parent = Rc::new(Pool::new(config, None, BPPlatform::default()).expect("Created"));

    let allocator = PoolAllocator::<u32, Tiny>::with_parent(parent).expect("Created");

    let error = allocator.allocate(81).expect_err("Exhausted");

    match error {
        AllocError::OutOfMemory { source: PoolError::CapacityExceeded { pool, .. }, .. } => assert_eq!("parent", pool),
        _ => panic!("Unexpected error: {}", error),
    }
}

#[test]
fn double_free_is_reported() {
    let allocator = PoolAllocator::<u32, Tiny>::new().expect("Created");

    let pointer = allocator.allocate(10).expect("Allocated");
    allocator.deallocate(pointer, 10);

    let bytes = allocator.bytes_for(10).expect("Sized");
    let error = allocator.pool().try_deallocate(pointer as *mut u8, bytes).expect_err("Invalid");

    assert!(matches!(error, PoolError::InvalidRelease { blocks: 1, .. }), "{}", error);
}
