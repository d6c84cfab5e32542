//! Quadratic reference broad phase.

use crate::detector::BroadPhase;
use crate::proxy::{is_candidate, BroadPhasePair, BroadPhaseProxy};

/// Tests every pair of proxies.
///
/// Fine for a few dozen bodies and used as the reference the other
/// strategies are checked against.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForce;

impl BruteForce {
    /// Create a brute-force broad phase.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BroadPhase for BruteForce {
    fn find_candidate_pairs(
        &mut self,
        proxies: &[BroadPhaseProxy],
        sleeping: bool,
    ) -> Vec<BroadPhasePair> {
        let mut pairs = Vec::new();
        for (i, a) in proxies.iter().enumerate() {
            for (j, b) in proxies.iter().enumerate().skip(i + 1) {
                if is_candidate(a, b, sleeping) {
                    pairs.push(BroadPhasePair { a: i, b: j });
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use nalgebra::Vector2;
    use nova_types::{Aabb, BodyId};

    fn boxed(id: u64, x: f64, y: f64) -> BroadPhaseProxy {
        BroadPhaseProxy::new(
            BodyId(id),
            Aabb::from_center(Vector2::new(x, y), Vector2::new(1.0, 1.0)),
        )
    }

    #[test]
    fn test_finds_overlapping_pair() {
        let proxies = [boxed(1, 0.0, 0.0), boxed(2, 1.5, 0.0), boxed(3, 10.0, 0.0)];
        let pairs = BruteForce::new().find_candidate_pairs(&proxies, false);
        assert_eq!(pairs, vec![BroadPhasePair { a: 0, b: 1 }]);
    }

    #[test]
    fn test_static_ground_pairs_with_dynamic() {
        let ground = BroadPhaseProxy::new(BodyId(1), Aabb::from_bounds(-50.0, -1.0, 50.0, 0.0))
            .with_static(true);
        let wall = BroadPhaseProxy::new(BodyId(2), Aabb::from_bounds(-51.0, -1.0, -49.0, 10.0))
            .with_static(true);
        let ball = boxed(3, 0.0, 0.5);

        let pairs = BruteForce::new().find_candidate_pairs(&[ground, wall, ball], false);
        assert_eq!(pairs, vec![BroadPhasePair { a: 0, b: 2 }]);
    }

    #[test]
    fn test_empty() {
        assert!(BruteForce::new().find_candidate_pairs(&[], false).is_empty());
    }
}
