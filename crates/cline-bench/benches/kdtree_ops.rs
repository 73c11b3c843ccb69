//! Criterion micro-benchmarks for k-d tree construction and queries.

use cline_bench::scattered_subpop;
use cline_kdtree::KdTree;
use cline_space::{Periodicity, PositionSnapshot, Spatiality};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn snapshot(n: usize, periodic: bool) -> PositionSnapshot {
    let sp = scattered_subpop(n, 100.0);
    let periodicity = if periodic {
        Periodicity {
            x: true,
            y: true,
            z: false,
        }
    } else {
        Periodicity::NONE
    };
    PositionSnapshot::capture(Spatiality::Xy, periodicity, &sp).unwrap()
}

/// Benchmark: build a tree over 10K individuals.
fn bench_build_10k(c: &mut Criterion) {
    let snap = snapshot(10_000, false);

    c.bench_function("kdtree_build_10k", |b| {
        b.iter(|| {
            let tree = KdTree::build(&snap, [false; 3]);
            black_box(&tree);
        });
    });
}

/// Benchmark: build with two periodic dimensions (9x replication).
fn bench_build_periodic_10k(c: &mut Criterion) {
    let snap = snapshot(10_000, true);

    c.bench_function("kdtree_build_periodic_10k", |b| {
        b.iter(|| {
            let tree = KdTree::build(&snap, [true, true, false]);
            black_box(&tree);
        });
    });
}

/// Benchmark: radius visits from every individual of a 10K tree.
fn bench_radius_visits_10k(c: &mut Criterion) {
    let snap = snapshot(10_000, false);
    let tree = KdTree::build(&snap, [false; 3]);

    c.bench_function("kdtree_radius_visits_10k", |b| {
        b.iter(|| {
            let mut touched = 0usize;
            for i in 0..snap.count() {
                tree.visit_within(snap.point(i), 25.0, Some(i), &mut |hit| {
                    touched += hit.individual;
                });
            }
            black_box(touched);
        });
    });
}

criterion_group!(
    benches,
    bench_build_10k,
    bench_build_periodic_10k,
    bench_radius_visits_10k
);
criterion_main!(benches);
