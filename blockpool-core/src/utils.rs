//! A collection of utilities.

/// Returns whether the pointer is sufficiently aligned for the given alignment.
///
/// `alignment` is expected to be a power of 2.
pub(crate) fn is_sufficiently_aligned_for(ptr: *const u8, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());

    (ptr as usize) & (alignment - 1) == 0
}

/// Returns the number of `unit`-sized chunks needed to cover `n`, that is `ceil(n / unit)`.
///
/// `unit` is expected to be non-zero.
pub(crate) const fn div_ceil(n: usize, unit: usize) -> usize {
    n / unit + (n % unit != 0) as usize
}

#[cfg(test)]
mod tests {

use super::*;

#[test]
fn is_sufficiently_aligned_for() {
    fn is_aligned_for(ptr: usize, alignment: usize) -> bool {
        super::is_sufficiently_aligned_for(ptr as *const u8, alignment)
    }

    assert!(is_aligned_for(1, 1));
    assert!(is_aligned_for(3, 1));

    assert!(!is_aligned_for(1, 2));
    assert!(is_aligned_for(2, 2));
    assert!(!is_aligned_for(3, 2));

    assert!(!is_aligned_for(4, 8));
    assert!(is_aligned_for(4096, 4096));
    assert!(!is_aligned_for(4096 + 8, 4096));
}

#[test]
fn div_ceil() {
    assert_eq!(0, super::div_ceil(0, 400));
    assert_eq!(1, super::div_ceil(1, 400));
    assert_eq!(1, super::div_ceil(400, 400));
    assert_eq!(2, super::div_ceil(401, 400));
    assert_eq!(2500, super::div_ceil(1_000_000, 400));
    assert_eq!(usize::MAX, super::div_ceil(usize::MAX, 1));
    assert_eq!(usize::MAX / 2 + 1, super::div_ceil(usize::MAX, 2));
}

}
