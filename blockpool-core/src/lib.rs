#![no_std]

#![deny(missing_docs)]

//! Building blocks for a fixed-block memory pool.
//!
//! blockpool-core contains the allocation engine, leaving it up to the user to decide where memory comes from:
//! -   A platform trait, used to reserve the backing region of a pool.
//! -   A `Pool`, carving its region into fixed-size blocks, and serving each request as a run of contiguous blocks
//!     within a fixed capacity.
//! -   A configuration trait, dimensioning pools per element type.

extern crate alloc;

#[cfg(test)]
extern crate std;

mod api;
mod internals;
mod utils;

#[cfg(test)]
mod test;

pub use api::*;
