//! Every broad-phase algorithm must report the same candidate pairs.

use nalgebra::Vector2;
use nova_broadphase::{
    BroadPhase, BroadPhaseAlgorithm, BroadPhasePair, BroadPhaseProxy, BruteForce, Bvh, BvhConfig,
    ShgConfig, SpatialHashGrid,
};
use nova_core::{Aabb, BodyId, CollisionFilter, Space};
use rand::{Rng, SeedableRng};

use crate::common::{add_ground, circle, run};

/// Random boxes inside the default grid bounds. The smallest half extent is
/// 0.5, so a 0.9 cell is smaller than every AABB.
fn scatter(n: usize, seed: u64) -> Vec<BroadPhaseProxy> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let center = Vector2::new(rng.gen_range(2.0..40.0), rng.gen_range(2.0..30.0));
            let half = Vector2::new(rng.gen_range(0.5..2.0), rng.gen_range(0.5..2.0));
            BroadPhaseProxy::new(BodyId(i as u64 + 1), Aabb::from_center(center, half))
                .with_static(rng.gen_bool(0.1))
                .with_sleeping(rng.gen_bool(0.2))
        })
        .collect()
}

fn sorted(mut pairs: Vec<BroadPhasePair>) -> Vec<BroadPhasePair> {
    pairs.sort_unstable();
    pairs.dedup();
    pairs
}

fn fine_grid() -> SpatialHashGrid {
    SpatialHashGrid::new(ShgConfig::new(Aabb::from_bounds(0.0, 0.0, 128.0, 72.0), 0.9)).unwrap()
}

#[test]
fn test_shg_and_bvh_match_brute_force() {
    for seed in [1, 2, 3] {
        let proxies = scatter(300, seed);
        for sleeping in [false, true] {
            let expected = sorted(BruteForce::new().find_candidate_pairs(&proxies, sleeping));
            let shg = sorted(fine_grid().find_candidate_pairs(&proxies, sleeping));
            let bvh = sorted(
                Bvh::new(BvhConfig::default())
                    .unwrap()
                    .find_candidate_pairs(&proxies, sleeping),
            );
            assert!(!expected.is_empty());
            assert_eq!(shg, expected, "SHG differs for seed {seed}");
            assert_eq!(bvh, expected, "BVH differs for seed {seed}");
        }
    }
}

#[test]
fn test_parallel_shg_matches_sequential() {
    let proxies = scatter(500, 9);
    let sequential = sorted(fine_grid().find_candidate_pairs(&proxies, false));
    let parallel = sorted(fine_grid().with_slabs(4).find_candidate_pairs(&proxies, false));
    assert_eq!(parallel, sequential);
}

#[test]
fn test_bvh_leaf_size_does_not_change_pairs() {
    let proxies = scatter(200, 5);
    let expected = sorted(BruteForce::new().find_candidate_pairs(&proxies, false));
    for leaf_threshold in [1, 4, 16] {
        let mut bvh = Bvh::new(BvhConfig { leaf_threshold }).unwrap();
        assert_eq!(sorted(bvh.find_candidate_pairs(&proxies, false)), expected);
    }
}

#[test]
fn test_filters_are_honoured_by_every_algorithm() {
    let aabb = Aabb::from_center(Vector2::new(10.0, 10.0), Vector2::new(1.0, 1.0));
    let grouped = CollisionFilter::default().with_group(7);
    let proxies = vec![
        BroadPhaseProxy::new(BodyId(1), aabb).with_filter(grouped),
        BroadPhaseProxy::new(BodyId(2), aabb).with_filter(grouped),
        BroadPhaseProxy::new(BodyId(3), aabb),
    ];
    let expected = vec![BroadPhasePair::new(0, 2), BroadPhasePair::new(1, 2)];

    assert_eq!(sorted(BruteForce::new().find_candidate_pairs(&proxies, false)), expected);
    assert_eq!(sorted(fine_grid().find_candidate_pairs(&proxies, false)), expected);
    let mut bvh = Bvh::new(BvhConfig::default()).unwrap();
    assert_eq!(sorted(bvh.find_candidate_pairs(&proxies, false)), expected);
}

#[test]
fn test_space_results_do_not_depend_on_algorithm() {
    let build = |algorithm: BroadPhaseAlgorithm| {
        let mut space = Space::new();
        space.set_broadphase_algorithm(algorithm);
        add_ground(&mut space, 60.0);
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for _ in 0..60 {
            let position = Vector2::new(rng.gen_range(2.0..50.0), rng.gen_range(1.0..20.0));
            space.add_body(circle(position, 0.5)).unwrap();
        }
        // The ground straddles x = 0; shift the whole scene inside the grid
        for body in space.bodies_mut() {
            let p = body.position();
            body.set_position(Vector2::new(p.x + 30.0, p.y + 5.0));
        }
        run(&mut space, 30);
        space
    };

    let reference = build(BroadPhaseAlgorithm::BruteForce);
    for algorithm in [BroadPhaseAlgorithm::SpatialHashGrid, BroadPhaseAlgorithm::Bvh] {
        let space = build(algorithm);
        assert_eq!(space.contact_count(), reference.contact_count(), "{algorithm:?}");
        for (a, b) in space.bodies().iter().zip(reference.bodies()) {
            approx::assert_relative_eq!(a.position(), b.position(), epsilon = 1e-9);
        }
    }
}
