use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use blockpool::PoolVec;

const NUMBER_ELEMENTS: i32 = 1_000_000;

//  Single-Allocation Round-Trip.
//
//  This benchmark repeatedly creates an array with a small capacity, then drops it.
//
//  For the pool, this includes reserving then releasing the backing region of the pool.
fn single_allocation_round_trip(c: &mut Criterion) {
    fn bencher<T: Vector>(name: &'static str, c: &mut Criterion) {
        c.bench_function(name, |b| b.iter(|| {
            let _ = black_box(T::with_capacity(32));
        }));
    }

    bencher::<SysVec>("SA Round-trip - sys", c);

    bencher::<BPVec>("SA Round-trip - pool", c);
}

criterion_group!(
    single_allocation,
    single_allocation_round_trip
);

//  Push Growth.
//
//  This benchmark pushes 1M elements into an initially empty array.
//
//  The pool grows the array in place, whereas the system allocator may need to move it.
fn push_growth(c: &mut Criterion) {
    fn bencher<T: Vector>(name: &'static str, c: &mut Criterion) {
        c.bench_function(name, |b| b.iter_with_large_drop(|| {
            let mut vector = T::with_capacity(0);

            for i in 0..NUMBER_ELEMENTS {
                vector.push(i);
            }

            black_box(vector)
        }));
    }

    bencher::<SysVec>("Push 1M - sys", c);

    bencher::<BPVec>("Push 1M - pool", c);
}

//  Binary Search.
//
//  This benchmark searches a sorted array of 1M elements, once for a present element and once for an absent one.
fn binary_search(c: &mut Criterion) {
    fn bencher<T: Vector>(name: &'static str, c: &mut Criterion) {
        c.bench_function(name, |b| b.iter_batched_ref(
            || {
                let mut vector = T::with_capacity(NUMBER_ELEMENTS as usize);

                for i in 0..NUMBER_ELEMENTS {
                    vector.push(i);
                }

                vector
            },
            |vector| {
                let found = vector.as_slice().binary_search(black_box(&543_210));
                let missing = vector.as_slice().binary_search(black_box(&NUMBER_ELEMENTS));

                black_box((found, missing))
            },
            BatchSize::LargeInput,
        ));
    }

    bencher::<SysVec>("Search 1M - sys", c);

    bencher::<BPVec>("Search 1M - pool", c);
}

criterion_group!(
    full_array,
    push_growth,
    binary_search
);

criterion_main!(
    single_allocation,
    full_array
);

//
//  Implementation Details
//

trait Vector: Sized {
    fn with_capacity(capacity: usize) -> Self;

    fn push(&mut self, value: i32);

    fn as_slice(&self) -> &[i32];
}

type SysVec = Vec<i32>;

impl Vector for SysVec {
    fn with_capacity(capacity: usize) -> SysVec { SysVec::with_capacity(capacity) }

    fn push(&mut self, value: i32) { SysVec::push(self, value) }

    fn as_slice(&self) -> &[i32] { SysVec::as_slice(self) }
}

type BPVec = PoolVec<i32>;

impl Vector for BPVec {
    fn with_capacity(capacity: usize) -> BPVec { BPVec::with_capacity(capacity).expect("Allocated") }

    fn push(&mut self, value: i32) { BPVec::push(self, value) }

    fn as_slice(&self) -> &[i32] { BPVec::as_slice(self) }
}
