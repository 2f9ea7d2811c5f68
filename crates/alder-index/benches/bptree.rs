//! B+ tree index benchmarks.
//!
//! Benchmarks for:
//! - sequential and random inserts
//! - point lookups
//! - range scans

use alder_common::types::{Key, PageId, RecordId, RecordPointer};
use alder_index::bptree::BPlusTree;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn pointer(key: Key) -> RecordPointer {
    RecordPointer::new(PageId::new(key as u64), RecordId::new(key as u64))
}

fn sequential_keys(count: usize) -> Vec<Key> {
    (0..count as Key).collect()
}

fn shuffled_keys(count: usize) -> Vec<Key> {
    let mut keys = sequential_keys(count);
    let mut rng = StdRng::seed_from_u64(42);
    keys.shuffle(&mut rng);
    keys
}

fn build_tree(keys: &[Key]) -> BPlusTree {
    let mut tree: BPlusTree = BPlusTree::new();
    for &key in keys {
        tree.insert(key, pointer(key)).unwrap();
    }
    tree
}

fn bench_insert_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("bptree/insert_sequential");

    for size in [1_000, 10_000, 50_000] {
        let keys = sequential_keys(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let tree = build_tree(&keys);
                black_box(tree.len())
            });
        });
    }

    group.finish();
}

fn bench_insert_random(c: &mut Criterion) {
    let mut group = c.benchmark_group("bptree/insert_random");

    for size in [1_000, 10_000, 50_000] {
        let keys = shuffled_keys(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let tree = build_tree(&keys);
                black_box(tree.len())
            });
        });
    }

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("bptree/get");

    let keys = shuffled_keys(10_000);
    let tree = build_tree(&keys);

    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_function(BenchmarkId::from_parameter(keys.len()), |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for &key in &keys {
                if tree.get(key).unwrap().is_some() {
                    hits += 1;
                }
            }
            black_box(hits)
        });
    });

    group.finish();
}

fn bench_range_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("bptree/range_scan");

    let tree = build_tree(&sequential_keys(50_000));

    for width in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| {
                let result = tree.range_scan(20_000, 20_000 + width as Key - 1).unwrap();
                black_box(result.len())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_sequential,
    bench_insert_random,
    bench_get,
    bench_range_scan
);
criterion_main!(benches);
