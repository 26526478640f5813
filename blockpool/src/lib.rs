#![deny(missing_docs)]

//! A Fixed-Block Memory Pool, behind a container allocator adaptor.
//!
//! The type `PoolAllocator` serves element-count requests out of a `Pool` it exclusively owns, rounding each request
//! up to a whole number of fixed-size blocks. The type `PoolVec` is a growable array whose storage lives in such a
//! pool, and which grows in place whenever the blocks following its storage are free.
//!
//! #   Warning
//!
//! A pool has a fixed capacity, decided at construction: exceeding it is reported as an allocation failure, rather
//! than obtaining more memory from the OS.

mod allocator;
mod platform;
mod vec;

pub use allocator::{AllocError, PoolAllocator};
pub use platform::{BPConfiguration, BPPlatform, SystemPlatform};
pub use vec::PoolVec;

#[cfg(unix)]
pub use platform::MmapPlatform;

pub use blockpool_core::{Configuration, Platform, Pool, PoolConfig, PoolError, PoolStats, Properties};
