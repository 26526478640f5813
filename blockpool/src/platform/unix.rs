//! Implementation of the Platform trait on top of anonymous memory mappings.

use std::{alloc::Layout, ptr};

use blockpool_core::Platform;

/// Implementation of the Platform trait, via `mmap`.
///
/// The region is only reserved: pages are committed by the OS on first touch, so that a pool dimensioned for its worst
/// case only costs what it actually uses.
#[derive(Clone, Copy, Debug, Default)]
pub struct MmapPlatform;

impl MmapPlatform {
    /// Creates an instance.
    pub const fn new() -> Self { Self }
}

impl Platform for MmapPlatform {
    unsafe fn allocate(&self, layout: Layout) -> Option<ptr::NonNull<u8>> {
        debug_assert!(layout.size() > 0);

        let page_size = page_size();
        let size = round_up(layout.size(), page_size)?;

        let candidate = if layout.align() <= page_size {
            mmap_allocate(size)
        } else {
            mmap_over(size, layout.align())
        };

        debug_assert!(candidate.map_or(true, |pointer| pointer.as_ptr() as usize % layout.align() == 0),
            "Incorrect alignment of allocation: {:?} for {:?}", candidate, layout);

        candidate
    }

    unsafe fn deallocate(&self, pointer: ptr::NonNull<u8>, layout: Layout) {
        //  The size was rounded the same way at allocation, hence cannot overflow.
        let size = round_up(layout.size(), page_size()).unwrap_or(layout.size());

        munmap_deallocate(pointer.as_ptr(), size);
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
const MAP_NORESERVE: libc::c_int = libc::MAP_NORESERVE;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
const MAP_NORESERVE: libc::c_int = 0;

fn page_size() -> usize {
    //  Safety:
    //  -   `_SC_PAGESIZE` is always a valid name.
    let result = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

    if result > 0 { result as usize } else { 4096 }
}

fn round_up(size: usize, page_size: usize) -> Option<usize> {
    debug_assert!(page_size.is_power_of_two());

    size.checked_add(page_size - 1).map(|size| size & !(page_size - 1))
}

//  Allocates `size` bytes, aligned on `alignment`.
//
//  Ensures the alignment is met by over-allocating then trimming front and back.
fn mmap_over(size: usize, alignment: usize) -> Option<ptr::NonNull<u8>> {
    let over_size = size.checked_add(alignment)?;
    let front_pointer = mmap_allocate(over_size)?;

    let misalignment = (front_pointer.as_ptr() as usize) % alignment;
    let front_size = if misalignment == 0 { 0 } else { alignment - misalignment };
    let back_size = alignment - front_size;

    debug_assert!(front_size + size + back_size == over_size,
        "{} + {} + {} != {}", front_size, size, back_size, over_size);

    //  Safety:
    //  -   `front_size` is less than `over_size`, hence the result is within the mapped area.
    let aligned_pointer = unsafe { front_pointer.as_ptr().add(front_size) };

    //  Safety:
    //  -   `front_size + size` is at most `over_size`, hence the result is within the mapped area, or at its end.
    let back_pointer = unsafe { aligned_pointer.add(size) };

    if front_size > 0 {
        //  Safety:
        //  -   `[front_pointer, front_pointer + front_size)` is mapped, and not in use.
        unsafe { munmap_deallocate(front_pointer.as_ptr(), front_size) };
    }

    if back_size > 0 {
        //  Safety:
        //  -   `[back_pointer, back_pointer + back_size)` is mapped, and not in use.
        unsafe { munmap_deallocate(back_pointer, back_size) };
    }

    ptr::NonNull::new(aligned_pointer)
}

//  Wrapper around `mmap`.
//
//  Returns a pointer to `size` bytes of memory, aligned on the page size.
fn mmap_allocate(size: usize) -> Option<ptr::NonNull<u8>> {
    let length = size;
    let prot = libc::PROT_READ | libc::PROT_WRITE;
    let flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | MAP_NORESERVE;

    //  No specific address hint.
    let addr = ptr::null_mut();
    //  When used in conjunction with MAP_ANONYMOUS, fd is mandated to be -1 on some implementations.
    let fd = -1;
    //  When used in conjunction with MAP_ANONYMOUS, offset is mandated to be 0 on some implementations.
    let offset = 0;

    //  Safety:
    //  -   `addr`, `fd`, and `offset` are suitable for MAP_ANONYMOUS.
    let result = unsafe { libc::mmap(addr, length, prot, flags, fd, offset) };

    let result = if result != libc::MAP_FAILED { result as *mut u8 } else { ptr::null_mut() };
    ptr::NonNull::new(result)
}

//  Wrapper around `munmap`.
//
//  #   Panics
//
//  If `munmap` returns a non-0 result.
//
//  #   Safety
//
//  -   Assumes that `addr` points to a `mmap`ed area of at least `size` bytes.
//  -   Assumes that the range `[addr, addr + size)` is no longer in use.
unsafe fn munmap_deallocate(addr: *mut u8, size: usize) {
    let result = libc::munmap(addr as *mut libc::c_void, size);
    assert!(result == 0, "Could not munmap {:x}, {}: {}", addr as usize, size, result);
}
