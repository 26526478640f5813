//! Pool
//!
//! A Pool carves a single backing region, obtained from the `Platform` at construction, into `capacity_blocks`
//! blocks of `block_size` bytes. Each allocation is served as a run of contiguous blocks, so that the caller receives
//! a single contiguous buffer.
//!
//! All accounting is done in blocks: a request for `bytes` bytes consumes `ceil(bytes / block_size)` blocks, and the
//! same computation is performed on release, hence the caller must release with the size it allocated with.
//!
//! A Pool may be chained to a parent Pool. Whenever the Pool cannot serve a request, be it for lack of capacity or
//! lack of contiguous free blocks, the _whole_ request is forwarded to the parent; releases of addresses outside the
//! Pool's region are forwarded likewise.
//!
//! #   Thread Safety
//!
//! A Pool is neither `Send` nor `Sync`: its bookkeeping lives in `Cell`s, and is meant to be mutated from a single
//! thread.

use alloc::rc::Rc;
use core::{alloc::Layout, cell::Cell, cmp, fmt, ptr::{self, NonNull}};

use log::{debug, error, trace, warn};

use crate::{Platform, PoolConfig, PoolError};
use crate::internals::{bit_mask::BitMask, run_table::RunTable};
use crate::utils;

/// A fixed-capacity pool of fixed-size blocks.
pub struct Pool<P>
    where
        P: Platform,
{
    config: PoolConfig,
    region: NonNull<u8>,
    layout: Layout,
    blocks: BitMask,
    runs: RunTable,
    counters: Counters,
    parent: Option<Rc<Pool<P>>>,
    platform: P,
}

impl<P> Pool<P>
    where
        P: Platform,
{
    /// Creates a Pool, reserving its backing region from `platform`.
    ///
    /// #   Errors
    ///
    /// -   `InvalidConfiguration` or `SizeOverflow` if `config` is invalid, see `PoolConfig::region_layout`.
    /// -   `PlatformExhausted` if `platform` cannot provide the region.
    pub fn new(config: PoolConfig, parent: Option<Rc<Pool<P>>>, platform: P) -> Result<Self, PoolError> {
        let layout = config.region_layout()?;

        //  Safety:
        //  -   `layout.size()` is non-zero, as both block size and capacity are.
        let region = unsafe { platform.allocate(layout) }
            .ok_or(PoolError::PlatformExhausted { pool: config.name, bytes: layout.size() })?;

        debug_assert!(utils::is_sufficiently_aligned_for(region.as_ptr(), layout.align()),
            "{:p} not {}-aligned", region.as_ptr(), layout.align());

        debug!("pool '{}': reserved {} blocks of {} bytes at {:p}",
            config.name, config.capacity_blocks, config.block_size, region.as_ptr());

        let blocks = BitMask::new(config.capacity_blocks);
        let runs = RunTable::new(config.capacity_blocks);
        let counters = Counters::default();

        Ok(Self { config, region, layout, blocks, runs, counters, parent, platform })
    }

    /// Returns the diagnostic name.
    pub fn name(&self) -> &'static str { self.config.name }

    /// Returns the configuration the Pool was created with.
    pub fn config(&self) -> &PoolConfig { &self.config }

    /// Returns the size of a block, in bytes.
    pub fn block_size(&self) -> usize { self.config.block_size }

    /// Returns the maximum number of blocks outstanding at once.
    pub fn capacity_blocks(&self) -> usize { self.config.capacity_blocks }

    /// Returns the number of blocks currently allocated.
    ///
    /// Requests delegated to the parent are not included.
    pub fn outstanding_blocks(&self) -> usize { self.counters.outstanding.get() }

    /// Returns the number of blocks currently free.
    pub fn free_blocks(&self) -> usize { self.capacity_blocks() - self.outstanding_blocks() }

    /// Returns the parent, if any.
    pub fn parent(&self) -> Option<&Rc<Pool<P>>> { self.parent.as_ref() }

    /// Returns a reference to the platform.
    pub fn platform(&self) -> &P { &self.platform }

    /// Returns the number of blocks consumed by a request of `bytes` bytes.
    pub fn blocks_for(&self, bytes: usize) -> usize { utils::div_ceil(bytes, self.config.block_size) }

    /// Returns whether `address` lies within the backing region of this Pool, ignoring its parent.
    pub fn contains(&self, address: *const u8) -> bool {
        let begin = self.region.as_ptr() as usize;
        let address = address as usize;

        address >= begin && address - begin < self.layout.size()
    }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            block_size: self.block_size(),
            capacity_blocks: self.capacity_blocks(),
            outstanding_blocks: self.outstanding_blocks(),
            peak_blocks: self.counters.peak.get(),
            live_runs: self.runs.live_runs(),
            allocations: self.counters.allocations.get(),
            deallocations: self.counters.deallocations.get(),
            delegations: self.counters.delegations.get(),
        }
    }

    /// Allocates a run of blocks covering at least `bytes` bytes.
    ///
    /// Returns a null pointer, without touching the Pool, if `bytes` is 0.
    ///
    /// The returned pointer, if not null, is aligned on `config().alignment` and valid for reads and writes of
    /// `blocks_for(bytes) * block_size()` bytes, until released.
    ///
    /// #   Errors
    ///
    /// If the request cannot be served, and there is no parent, returns:
    ///
    /// -   `CapacityExceeded` if it would push the outstanding blocks above the capacity.
    /// -   `Fragmented` if there is no run of free blocks long enough.
    ///
    /// If there is a parent, the whole request is forwarded to it, and its result returned.
    pub fn allocate(&self, bytes: usize) -> Result<*mut u8, PoolError> {
        if bytes == 0 {
            return Ok(ptr::null_mut());
        }

        let number = self.blocks_for(bytes);

        match self.claim_run(number) {
            Ok(index) => {
                let address = self.address_of(index);

                trace!("pool '{}': allocated {} blocks at {:p} (index {})", self.name(), number, address, index);

                Ok(address)
            },
            Err(error) => self.delegate_allocate(bytes, error),
        }
    }

    /// Deallocates the run at `address`, previously allocated with `bytes` bytes.
    ///
    /// Does nothing if `address` is null.
    ///
    /// #   Panics
    ///
    /// If `address` and `bytes` do not designate a live run of this Pool, or of its ancestors. The bookkeeping of the
    /// caller is corrupted, and continuing could hand out the same blocks twice.
    pub fn deallocate(&self, address: *mut u8, bytes: usize) {
        if let Err(error) = self.try_deallocate(address, bytes) {
            error!("{}", error);
            panic!("{}", error);
        }
    }

    /// Deallocates the run at `address`, previously allocated with `bytes` bytes.
    ///
    /// Does nothing if `address` is null.
    ///
    /// #   Errors
    ///
    /// Returns `InvalidRelease`, leaving the Pool untouched, if `address` and `bytes` do not designate a live run of
    /// this Pool, or of its ancestors.
    pub fn try_deallocate(&self, address: *mut u8, bytes: usize) -> Result<(), PoolError> {
        if address.is_null() {
            return Ok(());
        }

        let number = self.blocks_for(bytes);

        if !self.contains(address) {
            return match &self.parent {
                Some(parent) => parent.try_deallocate(address, bytes),
                None => Err(self.invalid_release(address, number)),
            };
        }

        let index = self.live_run_at(address, number)?;

        self.blocks.release(index, number);
        self.runs.unset(index);
        self.counters.on_release(number);
        self.counters.deallocations.set(self.counters.deallocations.get() + 1);

        trace!("pool '{}': deallocated {} blocks at {:p} (index {})", self.name(), number, address, index);

        Ok(())
    }

    /// Resizes the run at `address` from `old_bytes` to `new_bytes`, without moving it.
    ///
    /// Shrinking releases the tail blocks of the run. Growing claims the blocks directly following the run, if they
    /// are free and the capacity allows it. Returns whether the run now covers `new_bytes` bytes; on `false` the run is
    /// left untouched.
    ///
    /// A null `address`, or a `new_bytes` of 0, is never resized in place.
    ///
    /// #   Panics
    ///
    /// If `address` and `old_bytes` do not designate a live run of this Pool, or of its ancestors.
    pub fn resize_in_place(&self, address: *mut u8, old_bytes: usize, new_bytes: usize) -> bool {
        match self.try_resize_in_place(address, old_bytes, new_bytes) {
            Ok(resized) => resized,
            Err(error) => {
                error!("{}", error);
                panic!("{}", error);
            },
        }
    }

    //  Internal; resizes in place, reporting invalid runs as errors.
    fn try_resize_in_place(&self, address: *mut u8, old_bytes: usize, new_bytes: usize) -> Result<bool, PoolError> {
        if address.is_null() || new_bytes == 0 {
            return Ok(false);
        }

        if !self.contains(address) {
            return match &self.parent {
                Some(parent) => parent.try_resize_in_place(address, old_bytes, new_bytes),
                None => Err(self.invalid_release(address, self.blocks_for(old_bytes))),
            };
        }

        let old = self.blocks_for(old_bytes);
        let new = self.blocks_for(new_bytes);

        let index = self.live_run_at(address, old)?;

        match new.cmp(&old) {
            cmp::Ordering::Equal => Ok(true),
            cmp::Ordering::Less => {
                self.blocks.release(index + new, old - new);
                self.runs.set(index, new);
                self.counters.on_release(old - new);

                trace!("pool '{}': shrunk run at {:p} from {} to {} blocks", self.name(), address, old, new);

                Ok(true)
            },
            cmp::Ordering::Greater => {
                let extra = new - old;

                if extra > self.free_blocks() || !self.blocks.is_free(index + old, extra) {
                    return Ok(false);
                }

                self.blocks.claim(index + old, extra);
                self.runs.set(index, new);
                self.counters.on_claim(extra);

                trace!("pool '{}': grew run at {:p} from {} to {} blocks", self.name(), address, old, new);

                Ok(true)
            },
        }
    }

    //  Internal; claims a run of `number` blocks, returns the index of its first block.
    fn claim_run(&self, number: usize) -> Result<usize, PoolError> {
        debug_assert!(number > 0);

        let outstanding = self.outstanding_blocks();

        if number > self.free_blocks() {
            return Err(PoolError::CapacityExceeded {
                pool: self.name(),
                requested_blocks: number,
                outstanding_blocks: outstanding,
                capacity_blocks: self.capacity_blocks(),
            });
        }

        let index = self.blocks.find_free(number).ok_or(PoolError::Fragmented {
            pool: self.name(),
            requested_blocks: number,
            free_blocks: self.free_blocks(),
        })?;

        self.blocks.claim(index, number);
        self.runs.set(index, number);
        self.counters.on_claim(number);
        self.counters.allocations.set(self.counters.allocations.get() + 1);

        Ok(index)
    }

    //  Internal; forwards the whole request to the parent, if any, or reports `error`.
    #[cold]
    fn delegate_allocate(&self, bytes: usize, error: PoolError) -> Result<*mut u8, PoolError> {
        let parent = match &self.parent {
            Some(parent) => parent,
            None => return Err(error),
        };

        warn!("{}; delegating {} bytes to pool '{}'", error, bytes, parent.name());

        let address = parent.allocate(bytes)?;

        self.counters.delegations.set(self.counters.delegations.get() + 1);

        Ok(address)
    }

    //  Internal; returns the index of the run of `number` blocks starting at `address`.
    //
    //  Assumes that `address` lies within the region.
    fn live_run_at(&self, address: *mut u8, number: usize) -> Result<usize, PoolError> {
        debug_assert!(self.contains(address));

        let offset = address as usize - self.region.as_ptr() as usize;

        if offset % self.block_size() != 0 {
            return Err(self.invalid_release(address, number));
        }

        let index = offset / self.block_size();

        if number == 0 || self.runs.get(index) != number {
            return Err(self.invalid_release(address, number));
        }

        debug_assert!(self.blocks.is_claimed(index, number), "run at {} of {} blocks not claimed", index, number);

        Ok(index)
    }

    fn invalid_release(&self, address: *mut u8, number: usize) -> PoolError {
        PoolError::InvalidRelease { pool: self.name(), address: address as usize, blocks: number }
    }

    fn address_of(&self, index: usize) -> *mut u8 {
        debug_assert!(index < self.capacity_blocks());

        //  Safety:
        //  -   `index` is within the capacity, hence the result is within the region.
        unsafe { self.region.as_ptr().add(index * self.block_size()) }
    }
}

impl<P> Drop for Pool<P>
    where
        P: Platform,
{
    fn drop(&mut self) {
        let outstanding = self.outstanding_blocks();

        if outstanding > 0 {
            error!("pool '{}': dropped with {} blocks still allocated in {} runs",
                self.name(), outstanding, self.runs.live_runs());

            //  The leaked runs may still be referenced, hence the region is not handed back.
            if cfg!(debug_assertions) {
                panic!("pool '{}': leaked {} blocks", self.name(), outstanding);
            }

            return;
        }

        debug!("pool '{}': releasing region at {:p} (peak: {} blocks)",
            self.name(), self.region.as_ptr(), self.counters.peak.get());

        //  Safety:
        //  -   `self.region` was allocated by `self.platform`, with `self.layout`.
        //  -   No run is live, hence the region is no longer referenced.
        unsafe { self.platform.deallocate(self.region, self.layout) };
    }
}

impl<P> fmt::Debug for Pool<P>
    where
        P: Platform,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.name())
            .field("block_size", &self.block_size())
            .field("capacity_blocks", &self.capacity_blocks())
            .field("outstanding_blocks", &self.outstanding_blocks())
            .field("region", &self.region)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

/// PoolStats
///
/// A snapshot of the counters of a Pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Size of a block, in bytes.
    pub block_size: usize,
    /// Maximum number of blocks outstanding at once.
    pub capacity_blocks: usize,
    /// Number of blocks currently allocated.
    pub outstanding_blocks: usize,
    /// Highest number of blocks allocated at once.
    pub peak_blocks: usize,
    /// Number of runs currently allocated.
    pub live_runs: usize,
    /// Number of allocations served by the Pool itself.
    pub allocations: usize,
    /// Number of deallocations of runs of the Pool itself.
    pub deallocations: usize,
    /// Number of allocations forwarded to the parent.
    pub delegations: usize,
}

//
//  Implementation Details
//

#[derive(Default)]
struct Counters {
    outstanding: Cell<usize>,
    peak: Cell<usize>,
    allocations: Cell<usize>,
    deallocations: Cell<usize>,
    delegations: Cell<usize>,
}

impl Counters {
    fn on_claim(&self, number: usize) {
        let outstanding = self.outstanding.get() + number;

        self.outstanding.set(outstanding);
        self.peak.set(cmp::max(self.peak.get(), outstanding));
    }

    fn on_release(&self, number: usize) {
        debug_assert!(number <= self.outstanding.get());

        self.outstanding.set(self.outstanding.get() - number);
    }
}

// mod tests
