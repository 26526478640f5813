//! Abstraction over OS differences.

use blockpool_core::Configuration;

mod system;

#[cfg(unix)]
mod unix;

pub use system::SystemPlatform;

#[cfg(unix)]
pub use unix::MmapPlatform;

/// The platform used by `PoolAllocator`: anonymous memory mappings on unix, the system heap elsewhere.
#[cfg(unix)]
pub type BPPlatform = MmapPlatform;

/// The platform used by `PoolAllocator`: anonymous memory mappings on unix, the system heap elsewhere.
#[cfg(not(unix))]
pub type BPPlatform = SystemPlatform;

/// Default configuration of `PoolAllocator`.
///
/// Blocks of 100 elements, and at most 10,000 blocks outstanding per pool.
#[derive(Debug, Default)]
pub struct BPConfiguration;

impl Configuration for BPConfiguration {
    const NAME: &'static str = "blockpool";

    const ELEMENTS_PER_BLOCK: usize = 100;

    const CAPACITY_BLOCKS: usize = 10_000;
}
