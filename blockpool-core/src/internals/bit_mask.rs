//! A bit mask representing the occupation (or not) of the blocks of a pool.
//!
//! Bit `i` is set when block `i` belongs to a live run. The bits of the last word beyond the capacity are set at
//! construction and never released, so that scans never report them as free.

use alloc::{boxed::Box, vec::Vec};
use core::{cell::Cell, cmp, iter};

pub(crate) struct BitMask {
    words: Box<[Cell<u64>]>,
    capacity: usize,
}

impl BitMask {
    const BITS: usize = 64;

    /// Creates a bit mask of `capacity` free bits.
    pub(crate) fn new(capacity: usize) -> Self {
        let number_words = (capacity + Self::BITS - 1) / Self::BITS;

        let words: Vec<Cell<u64>> = (0..number_words).map(|_| Cell::new(0)).collect();

        let tail = capacity % Self::BITS;

        if tail != 0 {
            words[number_words - 1].set(!Self::low(tail));
        }

        Self { words: words.into_boxed_slice(), capacity }
    }

    /// Returns the lowest index at which `number` consecutive bits are free, if any.
    pub(crate) fn find_free(&self, number: usize) -> Option<usize> {
        debug_assert!(number > 0);

        if number > self.capacity {
            return None;
        }

        let mut index = 0;

        while let Some(start) = self.next_free(index) {
            let end = self.next_claimed(start).unwrap_or(self.capacity);

            if end - start >= number {
                return Some(start);
            }

            index = end;
        }

        None
    }

    /// Returns whether all bits in `[index, index + number)` are free.
    ///
    /// A range extending past the capacity is never free.
    pub(crate) fn is_free(&self, index: usize, number: usize) -> bool {
        if !self.in_bounds(index, number) {
            return false;
        }

        Self::masks(index, number).all(|(word, mask)| self.words[word].get() & mask == 0)
    }

    /// Returns whether all bits in `[index, index + number)` are claimed.
    pub(crate) fn is_claimed(&self, index: usize, number: usize) -> bool {
        if !self.in_bounds(index, number) {
            return false;
        }

        Self::masks(index, number).all(|(word, mask)| self.words[word].get() & mask == mask)
    }

    /// Claims all bits in `[index, index + number)`.
    ///
    /// The bits are expected to be free.
    pub(crate) fn claim(&self, index: usize, number: usize) {
        debug_assert!(self.is_free(index, number), "claim({}, {}) of non-free bits", index, number);

        for (word, mask) in Self::masks(index, number) {
            let cell = &self.words[word];
            cell.set(cell.get() | mask);
        }
    }

    /// Releases all bits in `[index, index + number)`.
    ///
    /// The bits are expected to be claimed.
    pub(crate) fn release(&self, index: usize, number: usize) {
        debug_assert!(self.is_claimed(index, number), "release({}, {}) of non-claimed bits", index, number);

        for (word, mask) in Self::masks(index, number) {
            let cell = &self.words[word];
            cell.set(cell.get() & !mask);
        }
    }

    //  Internal: Returns the index of the first free bit at or after `from`.
    fn next_free(&self, from: usize) -> Option<usize> {
        self.next_matching(from, |word| !word)
    }

    //  Internal: Returns the index of the first claimed bit at or after `from`.
    fn next_claimed(&self, from: usize) -> Option<usize> {
        self.next_matching(from, |word| word)
    }

    //  Internal: Returns the index of the first set bit of `transform(word)`, scanning from `from` onwards.
    fn next_matching(&self, from: usize, transform: impl Fn(u64) -> u64) -> Option<usize> {
        if from >= self.capacity {
            return None;
        }

        let mut word = from / Self::BITS;
        let mut candidates = transform(self.words[word].get()) & (u64::MAX << (from % Self::BITS));

        loop {
            if candidates != 0 {
                let index = word * Self::BITS + candidates.trailing_zeros() as usize;
                return if index < self.capacity { Some(index) } else { None };
            }

            word += 1;

            if word == self.words.len() {
                return None;
            }

            candidates = transform(self.words[word].get());
        }
    }

    fn in_bounds(&self, index: usize, number: usize) -> bool {
        index.checked_add(number).map_or(false, |end| end <= self.capacity)
    }

    //  Internal: Splits `[index, index + number)` into (word index, mask within word) pairs.
    fn masks(index: usize, number: usize) -> impl Iterator<Item = (usize, u64)> {
        let end = index + number;
        let mut current = index;

        iter::from_fn(move || {
            if current >= end {
                return None;
            }

            let bit = current % Self::BITS;
            let span = cmp::min(Self::BITS - bit, end - current);
            let item = (current / Self::BITS, Self::low(span) << bit);

            current += span;

            Some(item)
        })
    }

    //  Internal: Computes a mask with the `number` low bits set, and all others unset.
    fn low(number: usize) -> u64 {
        debug_assert!(number <= Self::BITS);

        if number == Self::BITS {
            u64::MAX
        } else {
            (1u64 << number) - 1
        }
    }
}

#[cfg(test)]
fn load_words(bitmask: &BitMask) -> Vec<u64> { bitmask.words.iter().map(Cell::get).collect() }

#[cfg(test)]
mod tests {

use alloc::vec;

use super::*;

#[test]
fn bit_mask_new() {
    fn new(capacity: usize) -> Vec<u64> { load_words(&BitMask::new(capacity)) }

    assert_eq!(Vec::<u64>::new(), new(0));
    assert_eq!(vec!(!1u64), new(1));
    assert_eq!(vec!(!0xFFu64), new(8));
    assert_eq!(vec!(0), new(64));
    assert_eq!(vec!(0, !0x7u64), new(67));
    assert_eq!(vec!(0, 0), new(128));
}

#[test]
fn bit_mask_claim_release() {
    //  Claims `[index, index + number)` on a fresh mask of `capacity` bits, returns the words.
    fn claim(capacity: usize, index: usize, number: usize) -> Vec<u64> {
        let bitmask = BitMask::new(capacity);
        bitmask.claim(index, number);
        load_words(&bitmask)
    }

    assert_eq!(vec!(0b1), claim(64, 0, 1));
    assert_eq!(vec!(0b1110), claim(64, 1, 3));
    assert_eq!(vec!(u64::MAX), claim(64, 0, 64));
    assert_eq!(vec!(1u64 << 63, 0b11), claim(128, 63, 3));
    assert_eq!(vec!(u64::MAX << 32, u64::MAX, 0b1), claim(192, 32, 97));

    let bitmask = BitMask::new(128);
    bitmask.claim(60, 10);
    bitmask.release(62, 4);

    assert_eq!(vec!(0b11u64 << 60, 0b111100), load_words(&bitmask));
}

#[test]
fn bit_mask_is_free_is_claimed() {
    let bitmask = BitMask::new(100);
    bitmask.claim(10, 5);

    assert!(bitmask.is_free(0, 10));
    assert!(!bitmask.is_free(0, 11));
    assert!(bitmask.is_claimed(10, 5));
    assert!(!bitmask.is_claimed(10, 6));
    assert!(!bitmask.is_claimed(9, 2));
    assert!(bitmask.is_free(15, 85));

    //  Out of bounds ranges are neither.
    assert!(!bitmask.is_free(15, 86));
    assert!(!bitmask.is_claimed(99, 2));
    assert!(!bitmask.is_free(usize::MAX, 2));
}

#[test]
fn bit_mask_find_free() {
    //  Claims each of `claimed` on a fresh mask of `capacity` bits, then searches for `number` free bits.
    fn find(capacity: usize, claimed: &[(usize, usize)], number: usize) -> Option<usize> {
        let bitmask = BitMask::new(capacity);

        for &(index, n) in claimed {
            bitmask.claim(index, n);
        }

        bitmask.find_free(number)
    }

    assert_eq!(Some(0), find(10, &[], 1));
    assert_eq!(Some(0), find(10, &[], 10));
    assert_eq!(None, find(10, &[], 11));
    assert_eq!(Some(3), find(10, &[(0, 3)], 7));
    assert_eq!(None, find(10, &[(0, 3)], 8));
    assert_eq!(Some(5), find(10, &[(0, 3), (4, 1)], 2));
    assert_eq!(Some(3), find(10, &[(0, 3), (4, 1)], 1));

    //  Runs spanning word boundaries.
    assert_eq!(Some(60), find(200, &[(0, 60), (70, 1)], 10));
    assert_eq!(Some(71), find(200, &[(0, 60), (70, 1)], 11));
    assert_eq!(Some(64), find(200, &[(0, 64), (192, 8)], 128));
    assert_eq!(None, find(200, &[(0, 64), (192, 8)], 129));

    //  Padding bits are never considered free.
    assert_eq!(None, find(65, &[(0, 64)], 2));
    assert_eq!(Some(64), find(65, &[(0, 64)], 1));
}

} // mod tests
