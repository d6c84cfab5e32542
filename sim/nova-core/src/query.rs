//! Spatial queries against the bodies of a space.

use nalgebra::Vector2;
use nova_types::{Aabb, BodyId, ShapeId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::space::Space;

/// A ray intersection with one shape.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RayHit {
    /// Body owning the shape.
    pub body: BodyId,
    /// Shape that was hit.
    pub shape: ShapeId,
    /// World-space hit point.
    pub point: Vector2<f64>,
    /// Surface normal at the hit point.
    pub normal: Vector2<f64>,
    /// Position along the ray in `[0, 1]`.
    pub fraction: f64,
}

impl Space {
    /// Cast the segment `from → to` against every shape.
    ///
    /// Returns at most `capacity` hits, nearest first. Rays starting inside a
    /// shape do not hit it.
    pub fn cast_ray(
        &mut self,
        from: Vector2<f64>,
        to: Vector2<f64>,
        capacity: usize,
    ) -> Vec<RayHit> {
        let mut hits = Vec::new();
        if capacity == 0 {
            return hits;
        }

        for body in &mut self.bodies {
            if body.aabb().segment_entry(from, to).is_none() {
                continue;
            }
            body.sync_transform();
            for shape in body.shapes() {
                if let Some(hit) = shape.cast_ray(from, to) {
                    hits.push(RayHit {
                        body: body.id(),
                        shape: shape.id(),
                        point: hit.point,
                        normal: hit.normal,
                        fraction: hit.fraction,
                    });
                }
            }
        }

        hits.sort_by(|a, b| a.fraction.total_cmp(&b.fraction));
        hits.truncate(capacity);
        hits
    }

    /// Bodies whose bounds overlap `aabb`, in insertion order.
    #[must_use]
    pub fn query_aabb(&self, aabb: &Aabb) -> Vec<BodyId> {
        self.bodies
            .iter()
            .filter(|b| b.aabb().overlaps(aabb))
            .map(|b| b.id())
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use approx::assert_relative_eq;
    use nova_body::{RigidBody, RigidBodyInit};
    use nova_shape::Shape;

    use super::*;

    fn circle_at(space: &mut Space, x: f64, y: f64, r: f64) -> BodyId {
        let body = RigidBody::with_shape(
            RigidBodyInit::fixed(Vector2::new(x, y)),
            Shape::circle(Vector2::zeros(), r).unwrap(),
        )
        .unwrap();
        space.add_body(body).unwrap()
    }

    #[test]
    fn test_ray_hits_circle_front() {
        let mut space = Space::new();
        let id = circle_at(&mut space, 50.0, 0.0, 1.0);

        let hits = space.cast_ray(Vector2::zeros(), Vector2::new(100.0, 0.0), 8);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].body, id);
        assert_relative_eq!(hits[0].point.x, 49.0, epsilon = 1e-9);
        assert_relative_eq!(hits[0].normal, Vector2::new(-1.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(hits[0].fraction, 0.49, epsilon = 1e-9);
    }

    #[test]
    fn test_ray_hits_sorted_and_capped() {
        let mut space = Space::new();
        let far = circle_at(&mut space, 30.0, 0.0, 1.0);
        let near = circle_at(&mut space, 10.0, 0.0, 1.0);
        circle_at(&mut space, 20.0, 5.0, 1.0);

        let hits = space.cast_ray(Vector2::zeros(), Vector2::new(100.0, 0.0), 8);
        let order: Vec<_> = hits.iter().map(|h| h.body).collect();
        assert_eq!(order, vec![near, far]);

        let capped = space.cast_ray(Vector2::zeros(), Vector2::new(100.0, 0.0), 1);
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].body, near);
        assert!(space.cast_ray(Vector2::zeros(), Vector2::new(100.0, 0.0), 0).is_empty());
    }

    #[test]
    fn test_ray_sees_moved_body() {
        let mut space = Space::new();
        let id = circle_at(&mut space, 50.0, 0.0, 1.0);
        space
            .body_mut(id)
            .unwrap()
            .set_position(Vector2::new(50.0, 10.0));
        assert!(space
            .cast_ray(Vector2::zeros(), Vector2::new(100.0, 0.0), 4)
            .is_empty());
    }

    #[test]
    fn test_query_aabb() {
        let mut space = Space::new();
        let a = circle_at(&mut space, 0.0, 0.0, 1.0);
        let b = circle_at(&mut space, 5.0, 0.0, 1.0);
        circle_at(&mut space, 20.0, 0.0, 1.0);

        let found = space.query_aabb(&Aabb::from_bounds(-0.5, -0.5, 4.5, 0.5));
        assert_eq!(found, vec![a, b]);
        assert!(space
            .query_aabb(&Aabb::from_bounds(100.0, 100.0, 101.0, 101.0))
            .is_empty());
    }
}
