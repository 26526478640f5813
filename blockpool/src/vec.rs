//! A resizable array, whose storage lives in a `PoolAllocator`.

use std::{
    cmp, fmt, mem,
    ops::{Deref, DerefMut},
    ptr::{self, NonNull},
    slice,
};

use log::trace;

use blockpool_core::Configuration;

use crate::{AllocError, BPConfiguration, PoolAllocator};

/// A contiguous growable array, backed by its own `PoolAllocator`.
///
/// Growth first attempts to extend the storage in place, which the pool allows whenever the blocks following it are
/// free; only then does it fall back to allocate, move, and release.
pub struct PoolVec<T, C = BPConfiguration>
    where
        C: Configuration,
{
    //  Dangling while no storage is allocated.
    pointer: NonNull<T>,
    capacity: usize,
    length: usize,
    allocator: PoolAllocator<T, C>,
}

impl<T, C> PoolVec<T, C>
    where
        C: Configuration,
{
    const MINIMUM_CAPACITY: usize = 4;

    /// Creates an empty array, with its own allocator.
    ///
    /// No storage is allocated until elements are pushed.
    ///
    /// #   Errors
    ///
    /// Returns `AllocError::Pool` if the allocator cannot be created.
    pub fn new() -> Result<Self, AllocError> { Ok(Self::new_in(PoolAllocator::new()?)) }

    /// Creates an empty array, using `allocator`.
    pub fn new_in(allocator: PoolAllocator<T, C>) -> Self {
        let capacity = if mem::size_of::<T>() == 0 { usize::MAX } else { 0 };

        Self { pointer: NonNull::dangling(), capacity, length: 0, allocator }
    }

    /// Creates an empty array, with its own allocator, and storage for at least `capacity` elements.
    ///
    /// #   Errors
    ///
    /// -   `AllocError::Pool` if the allocator cannot be created.
    /// -   `OutOfMemory` or `CapacityOverflow` if the storage cannot be allocated.
    pub fn with_capacity(capacity: usize) -> Result<Self, AllocError> {
        let mut result = Self::new()?;
        result.try_reserve_exact(capacity)?;
        Ok(result)
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize { self.length }

    /// Returns whether the array is empty.
    pub fn is_empty(&self) -> bool { self.length == 0 }

    /// Returns the number of elements the array can hold without reallocating.
    pub fn capacity(&self) -> usize { self.capacity }

    /// Returns the allocator.
    pub fn allocator(&self) -> &PoolAllocator<T, C> { &self.allocator }

    /// Returns a pointer to the first element.
    pub fn as_ptr(&self) -> *const T { self.pointer.as_ptr() }

    /// Returns the elements, as a slice.
    pub fn as_slice(&self) -> &[T] {
        //  Safety:
        //  -   `pointer` is non-null and aligned, even when dangling.
        //  -   The first `length` elements are initialized.
        unsafe { slice::from_raw_parts(self.pointer.as_ptr(), self.length) }
    }

    /// Returns the elements, as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        //  Safety:
        //  -   `pointer` is non-null and aligned, even when dangling.
        //  -   The first `length` elements are initialized.
        unsafe { slice::from_raw_parts_mut(self.pointer.as_ptr(), self.length) }
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// The capacity is at least doubled, up to what the pool can hold at most. Should the pool be unable to serve the
    /// doubled capacity, exactly the required capacity is reserved instead.
    ///
    /// #   Errors
    ///
    /// Returns `OutOfMemory` or `CapacityOverflow` if the storage cannot be grown. The array is left untouched.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        let required = self.required(additional)?;

        if required <= self.capacity {
            return Ok(());
        }

        let doubled = cmp::min(self.capacity.saturating_mul(2), self.allocator.max_count());
        let amortized = cmp::max(cmp::max(required, doubled), Self::MINIMUM_CAPACITY);

        match self.grow_to(amortized) {
            Err(error) if amortized > required && error.is_out_of_memory() => self.grow_to(required),
            result => result,
        }
    }

    /// Reserves capacity for exactly `additional` more elements.
    ///
    /// #   Errors
    ///
    /// Returns `OutOfMemory` or `CapacityOverflow` if the storage cannot be grown. The array is left untouched.
    pub fn try_reserve_exact(&mut self, additional: usize) -> Result<(), AllocError> {
        let required = self.required(additional)?;

        if required <= self.capacity {
            return Ok(());
        }

        self.grow_to(required)
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// #   Panics
    ///
    /// If the storage cannot be grown.
    pub fn reserve(&mut self, additional: usize) {
        if let Err(error) = self.try_reserve(additional) {
            panic!("{}", error);
        }
    }

    /// Appends `value`.
    ///
    /// #   Errors
    ///
    /// Returns `OutOfMemory` or `CapacityOverflow` if the storage cannot be grown, dropping `value`.
    pub fn try_push(&mut self, value: T) -> Result<(), AllocError> {
        if self.length == self.capacity {
            self.try_reserve(1)?;
        }

        //  Safety:
        //  -   `length < capacity`, hence the slot is within the storage, and uninitialized.
        unsafe { self.pointer.as_ptr().add(self.length).write(value) };

        self.length += 1;

        Ok(())
    }

    /// Appends `value`.
    ///
    /// #   Panics
    ///
    /// If the storage cannot be grown.
    pub fn push(&mut self, value: T) {
        if let Err(error) = self.try_push(value) {
            panic!("{}", error);
        }
    }

    /// Removes the last element, and returns it, if any.
    pub fn pop(&mut self) -> Option<T> {
        if self.length == 0 {
            return None;
        }

        self.length -= 1;

        //  Safety:
        //  -   The slot at `length` was initialized, and is no longer considered so.
        Some(unsafe { self.pointer.as_ptr().add(self.length).read() })
    }

    /// Shortens the array to `length` elements, dropping the others.
    ///
    /// Does nothing if the array is no longer than `length`.
    pub fn truncate(&mut self, length: usize) {
        if length >= self.length {
            return;
        }

        let tail = self.length - length;

        //  Set first, so that a panicking destructor leaks rather than double-drops.
        self.length = length;

        //  Safety:
        //  -   The `tail` elements following `length` are initialized, and no longer considered so.
        unsafe { ptr::drop_in_place(slice::from_raw_parts_mut(self.pointer.as_ptr().add(length), tail)) };
    }

    /// Removes all elements, keeping the storage.
    pub fn clear(&mut self) { self.truncate(0); }

    /// Shrinks the storage to fit the current number of elements, as closely as the block granularity permits.
    ///
    /// Shrinking is done in place whenever possible; failure to reallocate leaves the storage as is.
    pub fn shrink_to_fit(&mut self) {
        if mem::size_of::<T>() == 0 || self.capacity == self.length {
            return;
        }

        if self.length == 0 {
            self.release();
            return;
        }

        if self.allocator.shrink_in_place(self.pointer.as_ptr(), self.capacity, self.length) {
            trace!("shrunk in place from {} to {} elements", self.capacity, self.length);
            self.capacity = self.length;
            return;
        }

        //  Ignored: shrinking is a best effort.
        let _ = self.reallocate(self.length);
    }

    //  Internal; returns the capacity required for `additional` more elements.
    fn required(&self, additional: usize) -> Result<usize, AllocError> {
        self.length.checked_add(additional).ok_or(AllocError::CapacityOverflow { count: usize::MAX })
    }

    //  Internal; grows the storage to `capacity` elements, in place if possible.
    fn grow_to(&mut self, capacity: usize) -> Result<(), AllocError> {
        debug_assert!(capacity > self.capacity);

        if self.capacity > 0 && self.allocator.grow_in_place(self.pointer.as_ptr(), self.capacity, capacity) {
            trace!("grown in place from {} to {} elements", self.capacity, capacity);
            self.capacity = capacity;
            return Ok(());
        }

        self.reallocate(capacity)
    }

    //  Internal; moves the elements to fresh storage of `capacity` elements, then releases the former.
    fn reallocate(&mut self, capacity: usize) -> Result<(), AllocError> {
        debug_assert!(capacity >= self.length);
        debug_assert!(capacity > 0);

        let pointer = self.allocator.allocate(capacity)?;

        //  Safety:
        //  -   `allocate` returns a non-null pointer for a non-zero `capacity`.
        let pointer = unsafe { NonNull::new_unchecked(pointer) };

        //  Safety:
        //  -   The first `length` elements of the former storage are initialized.
        //  -   The new storage holds at least `length` elements, and is disjoint from the former.
        unsafe { ptr::copy_nonoverlapping(self.pointer.as_ptr(), pointer.as_ptr(), self.length) };

        trace!("reallocated from {} to {} elements", self.capacity, capacity);

        if self.capacity > 0 {
            self.allocator.deallocate(self.pointer.as_ptr(), self.capacity);
        }

        self.pointer = pointer;
        self.capacity = capacity;

        Ok(())
    }

    //  Internal; releases the storage, which must hold no element.
    fn release(&mut self) {
        debug_assert!(self.length == 0);

        if mem::size_of::<T>() == 0 || self.capacity == 0 {
            return;
        }

        self.allocator.deallocate(self.pointer.as_ptr(), self.capacity);

        self.pointer = NonNull::dangling();
        self.capacity = 0;
    }
}

impl<T, C> Drop for PoolVec<T, C>
    where
        C: Configuration,
{
    fn drop(&mut self) {
        //  Releases the storage even if the destructor of an element panics.
        struct Release<'a, T, C>(&'a mut PoolVec<T, C>)
            where
                C: Configuration;

        impl<'a, T, C> Drop for Release<'a, T, C>
            where
                C: Configuration,
        {
            fn drop(&mut self) {
                self.0.length = 0;
                self.0.release();
            }
        }

        let guard = Release(self);
        guard.0.clear();
    }
}

impl<T, C> Deref for PoolVec<T, C>
    where
        C: Configuration,
{
    type Target = [T];

    fn deref(&self) -> &[T] { self.as_slice() }
}

impl<T, C> DerefMut for PoolVec<T, C>
    where
        C: Configuration,
{
    fn deref_mut(&mut self) -> &mut [T] { self.as_mut_slice() }
}

impl<'a, T, C> IntoIterator for &'a PoolVec<T, C>
    where
        C: Configuration,
{
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter { self.as_slice().iter() }
}

impl<'a, T, C> IntoIterator for &'a mut PoolVec<T, C>
    where
        C: Configuration,
{
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter { self.as_mut_slice().iter_mut() }
}

impl<T, C> Extend<T> for PoolVec<T, C>
    where
        C: Configuration,
{
    fn extend<I>(&mut self, iter: I)
        where
            I: IntoIterator<Item = T>,
    {
        let iter = iter.into_iter();

        self.reserve(iter.size_hint().0);

        for value in iter {
            self.push(value);
        }
    }
}

impl<T, C> Clone for PoolVec<T, C>
    where
        T: Clone,
        C: Configuration,
{
    /// Clones the elements into a fresh array, with a fresh allocator.
    ///
    /// #   Panics
    ///
    /// If the allocator cannot be created, or the storage allocated.
    fn clone(&self) -> Self {
        let allocator = match self.allocator.try_clone() {
            Ok(allocator) => allocator,
            Err(error) => panic!("{}", error),
        };

        let mut result = Self::new_in(allocator);
        result.extend(self.iter().cloned());
        result
    }
}

impl<T, C> PartialEq for PoolVec<T, C>
    where
        T: PartialEq,
        C: Configuration,
{
    fn eq(&self, other: &Self) -> bool { self.as_slice() == other.as_slice() }
}

impl<T, C> fmt::Debug for PoolVec<T, C>
    where
        T: fmt::Debug,
        C: Configuration,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.debug_list().entries(self.iter()).finish() }
}
