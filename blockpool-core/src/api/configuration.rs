//! The configuration of blockpool-core.
//!
//! A pool is dimensioned once, at construction, by a `PoolConfig`: the size of a block, the maximum number of blocks
//! outstanding at any time, and the alignment of the backing region.
//!
//! Adaptors dimension their pools per element type; the `Configuration` trait captures the type-independent part of
//! this sizing, and `Properties` derives the `PoolConfig` for a given element type.

use core::{alloc::Layout, cmp, marker, mem};

use crate::PoolError;

/// Configuration
///
/// The Configuration instance fixes how pools are dimensioned for each element type.
pub trait Configuration {
    /// Diagnostic name given to the pools.
    const NAME: &'static str;

    /// The number of elements fitting in a single block.
    ///
    /// The block size of a pool for elements of type `T` is `ELEMENTS_PER_BLOCK * size_of::<T>()`.
    const ELEMENTS_PER_BLOCK: usize;

    /// The maximum number of blocks a pool may have outstanding.
    const CAPACITY_BLOCKS: usize;
}

/// Properties
///
/// Properties of a given Configuration.
///
/// Work-around for the inability to implement static methods directly on a trait.
pub struct Properties<C>(marker::PhantomData<C>);

impl<C> Properties<C>
    where
        C: Configuration
{
    /// Returns the size of an element of type `T`, as accounted for by the pool.
    ///
    /// Zero-sized types are accounted for as their alignment, so that blocks never have a zero size.
    pub fn element_size_of<T>() -> usize {
        let size = mem::size_of::<T>();

        if size == 0 { mem::align_of::<T>() } else { size }
    }

    /// Returns the size of a block for elements of type `T`.
    ///
    /// Saturates on overflow, which `PoolConfig::region_layout` then reports.
    pub fn block_size_of<T>() -> usize { Self::element_size_of::<T>().saturating_mul(C::ELEMENTS_PER_BLOCK) }

    /// Returns the configuration of a pool for elements of type `T`.
    pub fn pool_config_of<T>() -> PoolConfig {
        PoolConfig::new(C::NAME, Self::block_size_of::<T>(), C::CAPACITY_BLOCKS)
            .with_alignment(mem::align_of::<T>())
    }
}

/// PoolConfig
///
/// All parameters are fixed at construction of the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Diagnostic label, without behavioral effect.
    pub name: &'static str,
    /// Size of a block, in bytes.
    pub block_size: usize,
    /// Maximum number of blocks outstanding simultaneously.
    pub capacity_blocks: usize,
    /// Alignment of the backing region, hence of every block.
    pub alignment: usize,
}

impl PoolConfig {
    /// Creates a configuration, with an alignment of 1.
    pub const fn new(name: &'static str, block_size: usize, capacity_blocks: usize) -> Self {
        Self { name, block_size, capacity_blocks, alignment: 1 }
    }

    /// Returns a copy of the configuration with the given alignment.
    pub const fn with_alignment(self, alignment: usize) -> Self { Self { alignment, ..self } }

    /// Returns the size of the backing region, in bytes.
    pub fn region_size(&self) -> Option<usize> { self.block_size.checked_mul(self.capacity_blocks) }

    /// Validates the configuration, and returns the layout of the backing region.
    ///
    /// #   Errors
    ///
    /// -   `InvalidConfiguration` if the block size or capacity is 0, the capacity exceeds `u32::MAX` blocks, the
    ///     alignment is not a power of 2, or the block size is not a multiple of the alignment.
    /// -   `SizeOverflow` if the region size does not fit a `Layout`.
    pub fn region_layout(&self) -> Result<Layout, PoolError> {
        let invalid = |reason| PoolError::InvalidConfiguration { pool: self.name, reason };

        if self.block_size == 0 {
            return Err(invalid("block size is 0"));
        }

        if self.capacity_blocks == 0 {
            return Err(invalid("capacity is 0"));
        }

        if self.capacity_blocks > u32::MAX as usize {
            return Err(invalid("capacity exceeds u32::MAX blocks"));
        }

        if !self.alignment.is_power_of_two() {
            return Err(invalid("alignment is not a power of 2"));
        }

        if self.block_size % self.alignment != 0 {
            return Err(invalid("block size is not a multiple of the alignment"));
        }

        let overflow = || PoolError::SizeOverflow { pool: self.name };

        let size = self.region_size().ok_or_else(overflow)?;

        //  Platforms hand out regions aligned on at least a word.
        let align = cmp::max(self.alignment, mem::align_of::<usize>());

        Layout::from_size_align(size, align).map_err(|_| overflow())
    }
}
