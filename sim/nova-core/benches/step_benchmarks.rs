//! Benchmarks for the simulation step.
//!
//! Run with: cargo bench -p nova-core

#![allow(
    missing_docs,
    clippy::unwrap_used,
    clippy::cast_precision_loss,
    clippy::cast_lossless
)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nalgebra::Vector2;
use rand::{Rng, SeedableRng};

use nova_core::{
    BroadPhaseAlgorithm, RigidBody, RigidBodyInit, Shape, ShgConfig, Space, SpaceSettings,
};

const DT: f64 = 1.0 / 60.0;

fn add_ground(space: &mut Space, width: f64) {
    let ground = RigidBody::with_shape(
        RigidBodyInit::fixed(Vector2::new(width / 2.0, -1.0)),
        Shape::rect(width, 2.0, Vector2::zeros()).unwrap(),
    )
    .unwrap();
    space.add_body(ground).unwrap();
}

/// A triangular pyramid of unit boxes resting on static ground.
fn pyramid(base: usize) -> Space {
    let mut space = Space::with_settings(SpaceSettings::default()).unwrap();
    add_ground(&mut space, base as f64 * 2.0 + 10.0);

    for row in 0..base {
        let count = base - row;
        for i in 0..count {
            let x = 5.0 + row as f64 * 0.5 + i as f64 * 1.05;
            let y = 0.5 + row as f64 * 1.0;
            let body = RigidBody::with_shape(
                RigidBodyInit::dynamic(Vector2::new(x, y)),
                Shape::rect(1.0, 1.0, Vector2::zeros()).unwrap(),
            )
            .unwrap();
            space.add_body(body).unwrap();
        }
    }
    space
}

/// `n` circles scattered over a box, falling onto the ground.
fn many_circles(n: usize, algorithm: BroadPhaseAlgorithm) -> Space {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let mut space = Space::new();
    space.set_broadphase_algorithm(algorithm);
    add_ground(&mut space, 128.0);

    for _ in 0..n {
        let position = Vector2::new(rng.gen_range(2.0..126.0), rng.gen_range(1.0..70.0));
        let radius = rng.gen_range(0.2..0.6);
        let body = RigidBody::with_shape(
            RigidBodyInit::dynamic(position),
            Shape::circle(Vector2::zeros(), radius).unwrap(),
        )
        .unwrap();
        space.add_body(body).unwrap();
    }
    space
}

fn bench_pyramid(c: &mut Criterion) {
    let mut group = c.benchmark_group("pyramid");
    group.sample_size(20);

    for base in [10, 20, 30] {
        let bodies = base * (base + 1) / 2;
        group.throughput(Throughput::Elements(bodies as u64));
        group.bench_with_input(BenchmarkId::new("step", format!("{bodies}_boxes")), &base, |b, &base| {
            let mut space = pyramid(base);
            b.iter(|| {
                space.step(black_box(DT));
            });
        });
    }
    group.finish();
}

fn bench_many_circles(c: &mut Criterion) {
    let mut group = c.benchmark_group("many_circles");
    group.sample_size(20);

    let algorithms = [
        ("brute_force", BroadPhaseAlgorithm::BruteForce),
        ("shg", BroadPhaseAlgorithm::SpatialHashGrid),
        ("bvh", BroadPhaseAlgorithm::Bvh),
    ];
    for n in [250, 1000] {
        group.throughput(Throughput::Elements(n as u64));
        for (name, algorithm) in algorithms {
            if algorithm == BroadPhaseAlgorithm::BruteForce && n > 250 {
                continue;
            }
            group.bench_with_input(BenchmarkId::new(name, n), &n, |b, &n| {
                let mut space = many_circles(n, algorithm);
                b.iter(|| {
                    space.step(black_box(DT));
                });
            });
        }
    }
    group.finish();
}

fn bench_shg_multithreaded(c: &mut Criterion) {
    let mut group = c.benchmark_group("shg_threads");
    group.sample_size(20);

    for threads in [1, 0] {
        let label = if threads == 1 { "sequential" } else { "parallel" };
        group.bench_function(label, |b| {
            let mut space = many_circles(1000, BroadPhaseAlgorithm::SpatialHashGrid);
            space
                .set_broadphase_config(nova_core::BroadPhaseConfig::default().with_shg(ShgConfig::default()))
                .unwrap();
            space.set_multithreading(threads);
            b.iter(|| {
                space.step(black_box(DT));
            });
        });
    }
    group.finish();
}

fn bench_batch_integration(c: &mut Criterion) {
    let mut group = c.benchmark_group("integration");
    group.sample_size(20);

    for batch in [false, true] {
        let label = if batch { "batched" } else { "scalar" };
        group.bench_function(label, |b| {
            let mut space = many_circles(1000, BroadPhaseAlgorithm::SpatialHashGrid);
            space.set_batch_integration(batch);
            b.iter(|| {
                space.step(black_box(DT));
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_pyramid,
    bench_many_circles,
    bench_shg_multithreaded,
    bench_batch_integration,
);
criterion_main!(benches);
