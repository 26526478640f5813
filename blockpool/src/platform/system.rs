//! Implementation of the Platform trait on top of the system heap.

use std::{
    alloc::{GlobalAlloc, Layout, System},
    ptr::NonNull,
};

use blockpool_core::Platform;

/// Implementation of the Platform trait, via `std::alloc::System`.
///
/// The region is committed eagerly, as the system heap offers no way to reserve address space only.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemPlatform;

impl SystemPlatform {
    /// Creates an instance.
    pub const fn new() -> Self { Self }
}

impl Platform for SystemPlatform {
    unsafe fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() > 0);

        NonNull::new(System.alloc(layout))
    }

    unsafe fn deallocate(&self, pointer: NonNull<u8>, layout: Layout) {
        System.dealloc(pointer.as_ptr(), layout);
    }
}
