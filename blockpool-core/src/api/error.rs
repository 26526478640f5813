//! Errors reported by a pool.
//!
//! Exhaustion (`CapacityExceeded`, `Fragmented`) is recoverable: the caller may retry with a smaller request or give
//! up. `InvalidRelease` signals corrupted bookkeeping on the caller's side: `Pool::deallocate` panics with it, and only
//! `Pool::try_deallocate` hands it back as a value.

use thiserror::Error;

/// Error
///
/// Every variant carries the name of the pool which reported it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Serving the request would push the number of outstanding blocks above the capacity.
    #[error("pool '{pool}': {requested_blocks} blocks requested, {outstanding_blocks} of {capacity_blocks} outstanding")]
    CapacityExceeded {
        /// Name of the pool.
        pool: &'static str,
        /// Number of blocks the request needs.
        requested_blocks: usize,
        /// Number of blocks already allocated.
        outstanding_blocks: usize,
        /// Maximum number of blocks the pool may have outstanding.
        capacity_blocks: usize,
    },

    /// Enough blocks are free, but not contiguously.
    #[error("pool '{pool}': no run of {requested_blocks} contiguous blocks among {free_blocks} free")]
    Fragmented {
        /// Name of the pool.
        pool: &'static str,
        /// Number of blocks the request needs.
        requested_blocks: usize,
        /// Number of free blocks, scattered.
        free_blocks: usize,
    },

    /// The released address and size do not match a live run of the pool.
    #[error("pool '{pool}': release of {blocks} blocks at {address:#x} does not match a live run")]
    InvalidRelease {
        /// Name of the pool.
        pool: &'static str,
        /// Address being released.
        address: usize,
        /// Number of blocks computed from the released size.
        blocks: usize,
    },

    /// The pool parameters are inconsistent.
    #[error("pool '{pool}': invalid configuration, {reason}")]
    InvalidConfiguration {
        /// Name of the pool.
        pool: &'static str,
        /// What is wrong.
        reason: &'static str,
    },

    /// The size of the backing region overflows.
    #[error("pool '{pool}': region size overflows")]
    SizeOverflow {
        /// Name of the pool.
        pool: &'static str,
    },

    /// The platform could not provide the backing region.
    #[error("pool '{pool}': platform cannot provide {bytes} bytes")]
    PlatformExhausted {
        /// Name of the pool.
        pool: &'static str,
        /// Size of the region requested.
        bytes: usize,
    },
}

impl PoolError {
    /// Returns whether the error is a recoverable exhaustion of the pool, as opposed to a misuse.
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, PoolError::CapacityExceeded { .. } | PoolError::Fragmented { .. })
    }

    /// Returns the name of the pool which reported the error.
    pub fn pool(&self) -> &'static str {
        match self {
            PoolError::CapacityExceeded { pool, .. }
            | PoolError::Fragmented { pool, .. }
            | PoolError::InvalidRelease { pool, .. }
            | PoolError::InvalidConfiguration { pool, .. }
            | PoolError::SizeOverflow { pool }
            | PoolError::PlatformExhausted { pool, .. } => *pool,
        }
    }
}
