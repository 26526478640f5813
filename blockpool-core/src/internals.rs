//! The internals of blockpool-core.
//!
//! The internals provide the block bookkeeping: which blocks are claimed, and how long each live run is.

pub(crate) mod bit_mask;
pub(crate) mod run_table;
