//! Test helpers for the Pool.

use alloc::alloc::{alloc, dealloc};
use core::{
    alloc::Layout,
    cell::Cell,
    ptr::NonNull,
};

use crate::{Platform, Pool, PoolConfig};

/// Test Platform
///
/// Serves regions from the global allocator, counting the live ones.
#[derive(Default)]
pub(crate) struct TestPlatform {
    live: Cell<usize>,
    exhausted: Cell<bool>,
}

impl TestPlatform {
    //  Returns the number of regions allocated and not yet deallocated.
    pub(crate) fn live_regions(&self) -> usize { self.live.get() }

    //  Fails all further allocations.
    pub(crate) fn exhaust(&self) { self.exhausted.set(true); }
}

impl Platform for TestPlatform {
    unsafe fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        assert_ne!(0, layout.size());

        if self.exhausted.get() {
            return None;
        }

        let pointer = NonNull::new(alloc(layout))?;
        self.live.set(self.live.get() + 1);

        Some(pointer)
    }

    unsafe fn deallocate(&self, pointer: NonNull<u8>, layout: Layout) {
        assert!(self.live.get() > 0);

        dealloc(pointer.as_ptr(), layout);
        self.live.set(self.live.get() - 1);
    }
}

//  Creates a Pool named "test", with an alignment of 1.
pub(crate) fn test_pool(platform: &TestPlatform, block_size: usize, capacity_blocks: usize) -> Pool<&TestPlatform> {
    Pool::new(PoolConfig::new("test", block_size, capacity_blocks), None, platform).unwrap()
}
