//! The container allocator adaptor.
//!
//! A `PoolAllocator<T, C>` owns a pool dimensioned for elements of type `T` by the configuration `C`, and translates
//! element-count requests into block-granular byte requests against it.

use std::{
    fmt,
    marker::PhantomData,
    mem,
    ptr::{self, NonNull},
    rc::Rc,
};

use blockpool_core::{Configuration, Pool, PoolError, Properties};
use log::debug;
use thiserror::Error;

use crate::{BPConfiguration, BPPlatform};

/// Errors reported by `PoolAllocator`, and the containers built on top of it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AllocError {
    /// The pool, and its ancestors if any, cannot serve the request.
    #[error("out of memory: cannot allocate {count} elements of {element_size} bytes")]
    OutOfMemory {
        /// Number of elements requested.
        count: usize,
        /// Size of an element, in bytes.
        element_size: usize,
        /// The reason the pool gave.
        source: PoolError,
    },
    /// The size of the request, in bytes, overflows.
    #[error("capacity overflow: {count} elements")]
    CapacityOverflow {
        /// Number of elements requested.
        count: usize,
    },
    /// The pool could not be created.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl AllocError {
    /// Returns whether the error is a transient exhaustion of the pool, rather than a misuse.
    pub fn is_out_of_memory(&self) -> bool { matches!(self, AllocError::OutOfMemory { .. }) }
}

/// Allocator adaptor over a `Pool` exclusively owned by this instance.
///
/// The pool is created eagerly, with a block size of `C::ELEMENTS_PER_BLOCK` elements of `T`, and is released with
/// the adaptor. Each adaptor, including those obtained by `rebind` or `try_clone`, owns a distinct pool.
pub struct PoolAllocator<T, C = BPConfiguration>
    where
        C: Configuration,
{
    pool: Pool<BPPlatform>,
    _marker: PhantomData<(*const T, *const C)>,
}

impl<T, C> PoolAllocator<T, C>
    where
        C: Configuration,
{
    /// Creates an instance, with its own pool.
    ///
    /// #   Errors
    ///
    /// Returns `AllocError::Pool` if the pool cannot be dimensioned for `T`, or the platform cannot provide its region.
    pub fn new() -> Result<Self, AllocError> { Self::create(None) }

    /// Creates an instance, with its own pool chained to `parent`.
    ///
    /// Requests the pool cannot serve are forwarded, whole, to `parent`.
    ///
    /// #   Errors
    ///
    /// Returns `AllocError::Pool` if the pool cannot be created, or if `parent` is not aligned enough for `T`.
    pub fn with_parent(parent: Rc<Pool<BPPlatform>>) -> Result<Self, AllocError> {
        if parent.config().alignment < mem::align_of::<T>() {
            let reason = "parent alignment is below the element alignment";
            return Err(PoolError::InvalidConfiguration { pool: parent.name(), reason }.into());
        }

        Self::create(Some(parent))
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &Pool<BPPlatform> { &self.pool }

    /// Returns the largest number of elements a single allocation from the pool itself can hold.
    ///
    /// Returns `usize::MAX` if `T` is zero-sized.
    pub fn max_count(&self) -> usize {
        match mem::size_of::<T>() {
            0 => usize::MAX,
            size => self.pool.config().region_size().unwrap_or(usize::MAX) / size,
        }
    }

    /// Returns the number of bytes requested from the pool for `count` elements.
    ///
    /// This is the size of `count` elements, rounded up to a whole number of blocks.
    ///
    /// #   Errors
    ///
    /// Returns `CapacityOverflow` if the size overflows, or exceeds `isize::MAX`.
    pub fn bytes_for(&self, count: usize) -> Result<usize, AllocError> {
        let overflow = AllocError::CapacityOverflow { count };

        let bytes = count.checked_mul(mem::size_of::<T>()).ok_or_else(|| overflow.clone())?;

        if bytes > isize::MAX as usize {
            return Err(overflow);
        }

        self.pool.blocks_for(bytes).checked_mul(self.pool.block_size()).ok_or(overflow)
    }

    /// Allocates storage for `count` elements.
    ///
    /// Returns a null pointer if `count` is 0, without consulting the pool, and a dangling pointer if `T` is
    /// zero-sized.
    ///
    /// #   Errors
    ///
    /// -   `CapacityOverflow` if the size of the request overflows.
    /// -   `OutOfMemory` if neither the pool nor its ancestors can serve the request.
    pub fn allocate(&self, count: usize) -> Result<*mut T, AllocError> {
        if count == 0 {
            return Ok(ptr::null_mut());
        }

        if mem::size_of::<T>() == 0 {
            return Ok(NonNull::dangling().as_ptr());
        }

        let bytes = self.bytes_for(count)?;

        self.pool.allocate(bytes)
            .map(|pointer| pointer as *mut T)
            .map_err(|source| AllocError::OutOfMemory { count, element_size: mem::size_of::<T>(), source })
    }

    /// Deallocates the storage at `pointer`, previously allocated for `count` elements.
    ///
    /// Does nothing if `pointer` is null, or `T` is zero-sized.
    ///
    /// #   Panics
    ///
    /// If `pointer` and `count` do not designate a live allocation of this instance.
    pub fn deallocate(&self, pointer: *mut T, count: usize) {
        if pointer.is_null() || mem::size_of::<T>() == 0 {
            return;
        }

        //  A count whose size overflows was never allocated, which the pool reports.
        let bytes = self.bytes_for(count).unwrap_or(usize::MAX);

        self.pool.deallocate(pointer as *mut u8, bytes);
    }

    /// Grows the storage at `pointer` from `old_count` to `new_count` elements, without moving it.
    ///
    /// Returns whether the storage now holds `new_count` elements; on `false` it is left untouched.
    ///
    /// #   Panics
    ///
    /// If `pointer` and `old_count` do not designate a live allocation of this instance.
    pub fn grow_in_place(&self, pointer: *mut T, old_count: usize, new_count: usize) -> bool {
        debug_assert!(old_count <= new_count, "{} > {}", old_count, new_count);

        self.resize_in_place(pointer, old_count, new_count)
    }

    /// Shrinks the storage at `pointer` from `old_count` to `new_count` elements, without moving it.
    ///
    /// Returns whether the storage now holds `new_count` elements; on `false` it is left untouched. Shrinking to 0
    /// elements is never done in place: deallocate instead.
    ///
    /// #   Panics
    ///
    /// If `pointer` and `old_count` do not designate a live allocation of this instance.
    pub fn shrink_in_place(&self, pointer: *mut T, old_count: usize, new_count: usize) -> bool {
        debug_assert!(old_count >= new_count, "{} < {}", old_count, new_count);

        self.resize_in_place(pointer, old_count, new_count)
    }

    /// Creates an adaptor for elements of type `U`, with its own pool sized for `U`.
    ///
    /// The new adaptor shares the parent of this one, if any, and nothing else.
    ///
    /// #   Errors
    ///
    /// Returns `AllocError::Pool` if the pool cannot be created.
    pub fn rebind<U>(&self) -> Result<PoolAllocator<U, C>, AllocError> {
        match self.pool.parent() {
            Some(parent) => PoolAllocator::with_parent(parent.clone()),
            None => PoolAllocator::new(),
        }
    }

    /// Creates an adaptor for elements of type `T`, with its own pool.
    ///
    /// #   Errors
    ///
    /// Returns `AllocError::Pool` if the pool cannot be created.
    pub fn try_clone(&self) -> Result<Self, AllocError> { self.rebind::<T>() }

    fn create(parent: Option<Rc<Pool<BPPlatform>>>) -> Result<Self, AllocError> {
        let config = Properties::<C>::pool_config_of::<T>();
        let pool = Pool::new(config, parent, BPPlatform::default())?;

        debug!("pool '{}': adaptor for {} ({} bytes per element)",
            pool.name(), std::any::type_name::<T>(), Properties::<C>::element_size_of::<T>());

        Ok(Self { pool, _marker: PhantomData })
    }

    fn resize_in_place(&self, pointer: *mut T, old_count: usize, new_count: usize) -> bool {
        if mem::size_of::<T>() == 0 {
            return !pointer.is_null();
        }

        let old_bytes = self.bytes_for(old_count).unwrap_or(usize::MAX);

        match self.bytes_for(new_count) {
            Ok(new_bytes) => self.pool.resize_in_place(pointer as *mut u8, old_bytes, new_bytes),
            Err(_) => false,
        }
    }
}

impl<T, C> fmt::Debug for PoolAllocator<T, C>
    where
        C: Configuration,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("element", &std::any::type_name::<T>())
            .field("pool", &self.pool)
            .finish()
    }
}
