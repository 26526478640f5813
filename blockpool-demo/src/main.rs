//! Fills a pool-backed array with 0..999,999, then times binary searches through it.
//!
//! Log verbosity is controlled by `RUST_LOG`, for example `RUST_LOG=blockpool_core=debug`.

use std::time::{Duration, Instant};

use anyhow::Result;
use log::*;

use blockpool::PoolVec;

const NUMBER_ELEMENTS: i32 = 1_000_000;

const TARGETS: [i32; 2] = [543_210, NUMBER_ELEMENTS];

fn main() -> Result<()> {
    pretty_env_logger::init();

    let data = fill(NUMBER_ELEMENTS)?;

    info!("filled {} elements; pool: {:?}", data.len(), data.allocator().pool().stats());

    for &target in &TARGETS {
        let (index, elapsed) = timed(|| search(&data, target));

        match index {
            Some(index) => println!("Element {} found at index {}", target, index),
            None => println!("Element {} not found", target),
        }

        println!("Search took {} microseconds", elapsed.as_micros());
    }

    Ok(())
}

//  Creates an array holding `0..count`.
//
//  The storage is reserved upfront, although the pool would grow it in place anyway.
fn fill(count: i32) -> Result<PoolVec<i32>> {
    let mut data = PoolVec::new()?;
    data.try_reserve(count.max(0) as usize)?;

    for i in 0..count {
        data.try_push(i)?;
    }

    Ok(data)
}

//  Returns the index of `target` in the sorted `data`, if present.
fn search(data: &[i32], target: i32) -> Option<usize> { data.binary_search(&target).ok() }

fn timed<R>(function: impl FnOnce() -> R) -> (R, Duration) {
    let start = Instant::now();
    let result = function();

    (result, start.elapsed())
}

#[cfg(test)]
mod tests {

use super::*;

#[test]
fn fill_search() {
    let data = fill(NUMBER_ELEMENTS).unwrap();

    assert_eq!(NUMBER_ELEMENTS as usize, data.len());
    assert_eq!(Some(543_210), search(&data, 543_210));
    assert_eq!(Some(0), search(&data, 0));
    assert_eq!(Some(999_999), search(&data, 999_999));
    assert_eq!(None, search(&data, NUMBER_ELEMENTS));
    assert_eq!(None, search(&data, -1));
}

#[test]
fn fill_beyond_capacity() {
    //  The default pool holds exactly 1,000,000 elements of 4 bytes.
    let error = fill(NUMBER_ELEMENTS + 1).map(|_| ()).unwrap_err();

    assert!(error.to_string().contains("out of memory"), "{}", error);
}

#[test]
fn search_empty() {
    let data = fill(0).unwrap();

    assert_eq!(None, search(&data, 0));
}

#[test]
fn timed_returns_result() {
    let (result, elapsed) = timed(|| 42);

    assert_eq!(42, result);
    assert!(elapsed < Duration::from_secs(60));
}

}
