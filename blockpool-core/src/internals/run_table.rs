//! A mapping of how many blocks each live run spans.
//!
//! For a given run spanning blocks [M, N), the length N - M is registered at index M in the table. A length of 0
//! means that no run starts at that index, which is the initial state of every entry.

use alloc::{boxed::Box, vec::Vec};
use core::cell::Cell;

pub(crate) struct RunTable(Box<[Cell<u32>]>);

impl RunTable {
    /// Creates a table for `capacity` blocks, with no run registered.
    ///
    /// `capacity` is expected to fit within `u32`.
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity <= u32::MAX as usize);

        let entries: Vec<Cell<u32>> = (0..capacity).map(|_| Cell::new(0)).collect();

        Self(entries.into_boxed_slice())
    }

    /// Returns the length of the run starting at `index`, or 0 if none does.
    pub(crate) fn get(&self, index: usize) -> usize {
        self.0.get(index).map_or(0, |entry| entry.get() as usize)
    }

    /// Registers a run of `number` blocks starting at `index`.
    pub(crate) fn set(&self, index: usize, number: usize) {
        debug_assert!(number > 0 && number <= u32::MAX as usize, "index: {}, number: {}", index, number);

        self.0[index].set(number as u32);
    }

    /// Unregisters the run starting at `index`.
    pub(crate) fn unset(&self, index: usize) {
        debug_assert!(self.get(index) > 0, "no run at {}", index);

        self.0[index].set(0);
    }

    /// Returns the number of registered runs.
    pub(crate) fn live_runs(&self) -> usize { self.0.iter().filter(|entry| entry.get() > 0).count() }
}

// mod tests
