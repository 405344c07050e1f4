use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::collections::BTreeMap;
use std::hint::black_box;

use gtree::{AvlTree, BTree, Comparator, RedBlackTree};

const N: usize = 10_000;

fn ordered_keys(n: usize) -> Vec<i64> {
    (0..n as i64).collect()
}

fn random_keys(n: usize) -> Vec<i64> {
    // Simple LCG for a deterministic pseudo-random sequence
    let mut keys = Vec::with_capacity(n);
    let mut x: u64 = 12345;
    for _ in 0..n {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
        keys.push((x >> 33) as i64);
    }
    keys
}

fn sum(walk: impl FnOnce(&mut dyn FnMut(&i64, &i64) -> bool)) -> i64 {
    let mut total = 0_i64;
    walk(&mut |_, value| {
        total = total.wrapping_add(*value);
        true
    });
    total
}

/// Runs `$body` once per engine, binding a fresh tree to `$tree`.
macro_rules! per_engine {
    ($group:expr, $label:expr, |$tree:ident| $body:expr) => {
        $group.bench_function(BenchmarkId::new("AvlTree", $label), |b| {
            b.iter(|| {
                let $tree = AvlTree::new(Comparator::natural());
                $body
            });
        });
        $group.bench_function(BenchmarkId::new("BTree(m=8)", $label), |b| {
            b.iter(|| {
                let $tree = BTree::new(8, Comparator::natural());
                $body
            });
        });
        $group.bench_function(BenchmarkId::new("RedBlackTree", $label), |b| {
            b.iter(|| {
                let $tree = RedBlackTree::new(Comparator::natural());
                $body
            });
        });
    };
}

fn bench_insert_ordered(c: &mut Criterion) {
    let keys = ordered_keys(N);
    let mut group = c.benchmark_group("insert_ordered");

    per_engine!(group, N, |tree| {
        for &key in &keys {
            tree.set(key, key);
        }
        tree
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut map = BTreeMap::new();
            for &key in &keys {
                map.insert(key, key);
            }
            map
        });
    });

    group.finish();
}

fn bench_insert_random(c: &mut Criterion) {
    let keys = random_keys(N);
    let mut group = c.benchmark_group("insert_random");

    per_engine!(group, N, |tree| {
        tree.sets(keys.iter().map(|&key| (key, key)));
        tree
    });

    group.finish();
}

fn bench_get_random(c: &mut Criterion) {
    let keys = random_keys(N);
    let mut group = c.benchmark_group("get_random");

    let avl = AvlTree::new_from(Comparator::natural(), keys.iter().map(|&key| (key, key)), false);
    let btree = BTree::new_from(8, Comparator::natural(), keys.iter().map(|&key| (key, key)), false);
    let red_black = RedBlackTree::new_from(Comparator::natural(), keys.iter().map(|&key| (key, key)), false);

    group.bench_function(BenchmarkId::new("AvlTree", N), |b| {
        b.iter(|| keys.iter().filter_map(|key| avl.get(black_box(key))).count());
    });
    group.bench_function(BenchmarkId::new("BTree(m=8)", N), |b| {
        b.iter(|| keys.iter().filter_map(|key| btree.get(black_box(key))).count());
    });
    group.bench_function(BenchmarkId::new("RedBlackTree", N), |b| {
        b.iter(|| keys.iter().filter_map(|key| red_black.get(black_box(key))).count());
    });

    group.finish();
}

fn bench_insert_remove_random(c: &mut Criterion) {
    let keys = random_keys(N);
    let mut group = c.benchmark_group("insert_remove_random");

    per_engine!(group, N, |tree| {
        tree.sets(keys.iter().map(|&key| (key, key)));
        for key in &keys {
            tree.remove(key);
        }
        tree
    });

    group.finish();
}

fn bench_iterate(c: &mut Criterion) {
    let keys = random_keys(N);
    let mut group = c.benchmark_group("iterate_asc");

    let avl = AvlTree::new_from(Comparator::natural(), keys.iter().map(|&key| (key, key)), false);
    let btree = BTree::new_from(8, Comparator::natural(), keys.iter().map(|&key| (key, key)), false);
    let red_black = RedBlackTree::new_from(Comparator::natural(), keys.iter().map(|&key| (key, key)), false);

    group.bench_function(BenchmarkId::new("AvlTree", N), |b| {
        b.iter(|| sum(|f| avl.iterator_asc(f)));
    });
    group.bench_function(BenchmarkId::new("BTree(m=8)", N), |b| {
        b.iter(|| sum(|f| btree.iterator_asc(f)));
    });
    group.bench_function(BenchmarkId::new("RedBlackTree", N), |b| {
        b.iter(|| sum(|f| red_black.iterator_asc(f)));
    });

    group.finish();
}

fn bench_safe_overhead(c: &mut Criterion) {
    let keys = random_keys(N);
    let mut group = c.benchmark_group("safe_flag_get");

    for safe in [false, true] {
        let tree = AvlTree::new_from(Comparator::natural(), keys.iter().map(|&key| (key, key)), safe);
        group.bench_function(BenchmarkId::new("AvlTree", if safe { "safe" } else { "unsafe" }), |b| {
            b.iter(|| keys.iter().filter(|key| tree.contains(black_box(*key))).count());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_ordered,
    bench_insert_random,
    bench_get_random,
    bench_insert_remove_random,
    bench_iterate,
    bench_safe_overhead,
);
criterion_main!(benches);
