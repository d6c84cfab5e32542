//! The view of a body the broad phase works on.

use nalgebra::Vector2;
use nova_types::{Aabb, BodyId, CollisionFilter};

/// Everything the broad phase needs to know about one body.
///
/// Proxies are built by the space once per step; pair results refer back to
/// them by slice index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BroadPhaseProxy {
    /// Body id, used for order-independent pair keys.
    pub id: BodyId,
    /// World bounds of the whole body.
    pub aabb: Aabb,
    /// Center of mass, used to assign bodies to parallel slabs.
    pub position: Vector2<f64>,
    /// Linear speed.
    pub speed: f64,
    /// Collision filter.
    pub filter: CollisionFilter,
    /// Whether the body is static.
    pub is_static: bool,
    /// Whether the body is asleep.
    pub is_sleeping: bool,
    /// Whether the body takes part in collision detection.
    pub collision_enabled: bool,
}

impl BroadPhaseProxy {
    /// A dynamic, awake, unfiltered proxy. Mostly useful in tests.
    #[must_use]
    pub fn new(id: BodyId, aabb: Aabb) -> Self {
        Self {
            id,
            aabb,
            position: aabb.center(),
            speed: 0.0,
            filter: CollisionFilter::default(),
            is_static: false,
            is_sleeping: false,
            collision_enabled: true,
        }
    }

    /// Mark the proxy static.
    #[must_use]
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// Mark the proxy asleep.
    #[must_use]
    pub fn with_sleeping(mut self, is_sleeping: bool) -> Self {
        self.is_sleeping = is_sleeping;
        self
    }

    /// Set the collision filter.
    #[must_use]
    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the linear speed.
    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }
}

/// A candidate pair, as indices into the proxy slice with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BroadPhasePair {
    /// Lower proxy index.
    pub a: usize,
    /// Higher proxy index.
    pub b: usize,
}

impl BroadPhasePair {
    /// Build a pair with its indices ordered.
    #[must_use]
    pub fn new(i: usize, j: usize) -> Self {
        if i < j {
            Self { a: i, b: j }
        } else {
            Self { a: j, b: i }
        }
    }
}

/// Cheap rejection applied before any geometric test.
///
/// Returns true if the pair can never collide this step.
#[must_use]
pub fn early_out(a: &BroadPhaseProxy, b: &BroadPhaseProxy, sleeping: bool) -> bool {
    if a.id == b.id {
        return true;
    }
    if !a.collision_enabled || !b.collision_enabled {
        return true;
    }
    if a.is_static && b.is_static {
        return true;
    }
    if sleeping {
        if a.is_sleeping && b.is_sleeping {
            return true;
        }
        if (a.is_sleeping && b.is_static) || (b.is_sleeping && a.is_static) {
            return true;
        }
    }
    !a.filter.should_collide(&b.filter)
}

/// Full candidate test: early-outs, then strict AABB overlap.
#[inline]
#[must_use]
pub fn is_candidate(a: &BroadPhaseProxy, b: &BroadPhaseProxy, sleeping: bool) -> bool {
    !early_out(a, b, sleeping) && a.aabb.overlaps(&b.aabb)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn unit(id: u64, x: f64) -> BroadPhaseProxy {
        BroadPhaseProxy::new(
            BodyId(id),
            Aabb::from_center(Vector2::new(x, 0.0), Vector2::new(0.5, 0.5)),
        )
    }

    #[test]
    fn test_same_body_is_rejected() {
        let a = unit(1, 0.0);
        assert!(early_out(&a, &a, false));
    }

    #[test]
    fn test_static_pairs_rejected() {
        let a = unit(1, 0.0).with_static(true);
        let b = unit(2, 0.2).with_static(true);
        assert!(early_out(&a, &b, false));
        assert!(!early_out(&a, &unit(3, 0.2), false));
    }

    #[test]
    fn test_sleeping_rules_only_apply_when_enabled() {
        let a = unit(1, 0.0).with_sleeping(true);
        let b = unit(2, 0.2).with_sleeping(true);
        let ground = unit(3, 0.0).with_static(true);

        assert!(early_out(&a, &b, true));
        assert!(early_out(&a, &ground, true));
        assert!(!early_out(&a, &b, false));
        assert!(!early_out(&a, &unit(4, 0.1), true));
    }

    #[test]
    fn test_collision_disabled() {
        let mut a = unit(1, 0.0);
        a.collision_enabled = false;
        assert!(early_out(&a, &unit(2, 0.2), false));
    }

    #[test]
    fn test_filters() {
        let a = unit(1, 0.0).with_filter(CollisionFilter::default().with_group(7));
        let b = unit(2, 0.2).with_filter(CollisionFilter::default().with_group(7));
        assert!(early_out(&a, &b, false));

        let c = unit(3, 0.0).with_filter(CollisionFilter::new(0, 0b01, 0b01));
        let d = unit(4, 0.2).with_filter(CollisionFilter::new(0, 0b10, 0b11));
        // d accepts c, but c does not accept d
        assert!(early_out(&c, &d, false));
    }

    #[test]
    fn test_candidate_requires_overlap() {
        assert!(is_candidate(&unit(1, 0.0), &unit(2, 0.9), false));
        // Touching edges are not an overlap
        assert!(!is_candidate(&unit(1, 0.0), &unit(2, 1.0), false));
    }

    #[test]
    fn test_pair_is_ordered() {
        assert_eq!(BroadPhasePair::new(5, 2), BroadPhasePair { a: 2, b: 5 });
    }
}
