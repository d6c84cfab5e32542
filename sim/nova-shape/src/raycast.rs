//! Segment casts against world-space shapes.

use nalgebra::Vector2;

use crate::shape::{Shape, ShapeKind};

/// Intersection of a segment with a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeRayHit {
    /// World-space hit point.
    pub point: Vector2<f64>,
    /// Outward surface normal at the hit point.
    pub normal: Vector2<f64>,
    /// Position along the segment in `[0, 1]`.
    pub fraction: f64,
}

impl Shape {
    /// Cast the segment `from → to` against the cached world geometry.
    ///
    /// Segments starting inside the shape report no hit.
    #[must_use]
    pub fn cast_ray(&self, from: Vector2<f64>, to: Vector2<f64>) -> Option<ShapeRayHit> {
        match self.kind() {
            ShapeKind::Circle(c) => {
                ray_circle(from, to, c.world_center(), c.radius)
            }
            ShapeKind::Polygon(p) => ray_polygon(from, to, p.world_vertices(), p.world_normals()),
        }
    }
}

fn ray_circle(
    from: Vector2<f64>,
    to: Vector2<f64>,
    center: Vector2<f64>,
    radius: f64,
) -> Option<ShapeRayHit> {
    let d = to - from;
    let f = from - center;
    let a = d.norm_squared();
    let c = f.norm_squared() - radius * radius;
    if a == 0.0 || c < 0.0 {
        return None;
    }
    let b = 2.0 * f.dot(&d);
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / (2.0 * a);
    if !(0.0..=1.0).contains(&t) {
        return None;
    }
    let point = from + d * t;
    let normal = (point - center) / radius;
    Some(ShapeRayHit {
        point,
        normal,
        fraction: t,
    })
}

fn ray_polygon(
    from: Vector2<f64>,
    to: Vector2<f64>,
    vertices: &[Vector2<f64>],
    normals: &[Vector2<f64>],
) -> Option<ShapeRayHit> {
    let d = to - from;
    let mut lower = 0.0;
    let mut upper = 1.0;
    let mut entry_edge = None;

    for (v, n) in vertices.iter().zip(normals) {
        // from + t*d is inside edge i's half-plane while n·(v - p) >= 0
        let numerator = n.dot(&(v - from));
        let denominator = n.dot(&d);

        if denominator == 0.0 {
            if numerator < 0.0 {
                return None;
            }
        } else if denominator < 0.0 && numerator < lower * denominator {
            lower = numerator / denominator;
            entry_edge = Some(*n);
        } else if denominator > 0.0 && numerator < upper * denominator {
            upper = numerator / denominator;
        }

        if upper < lower {
            return None;
        }
    }

    entry_edge.map(|normal| ShapeRayHit {
        point: from + d * lower,
        normal,
        fraction: lower,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nova_types::Transform;

    #[test]
    fn test_ray_hits_circle_front() {
        let mut c = Shape::circle(Vector2::zeros(), 1.0).unwrap();
        c.transform(&Transform::new(Vector2::new(50.0, 0.0), 0.0));

        let hit = c
            .cast_ray(Vector2::new(0.0, 0.0), Vector2::new(100.0, 0.0))
            .unwrap();
        assert_relative_eq!(hit.point, Vector2::new(49.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(hit.normal, Vector2::new(-1.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(hit.fraction, 0.49, epsilon = 1e-12);
    }

    #[test]
    fn test_ray_misses_circle() {
        let mut c = Shape::circle(Vector2::zeros(), 1.0).unwrap();
        c.transform(&Transform::new(Vector2::new(50.0, 5.0), 0.0));
        assert!(c
            .cast_ray(Vector2::new(0.0, 0.0), Vector2::new(100.0, 0.0))
            .is_none());
        // Too short to reach it
        c.transform(&Transform::new(Vector2::new(50.0, 0.0), 0.0));
        assert!(c
            .cast_ray(Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0))
            .is_none());
    }

    #[test]
    fn test_ray_hits_box_face() {
        let mut b = Shape::rect(2.0, 2.0, Vector2::zeros()).unwrap();
        b.transform(&Transform::new(Vector2::new(5.0, 0.0), 0.0));
        let hit = b
            .cast_ray(Vector2::new(0.0, 0.5), Vector2::new(10.0, 0.5))
            .unwrap();
        assert_relative_eq!(hit.point, Vector2::new(4.0, 0.5), epsilon = 1e-12);
        assert_relative_eq!(hit.normal, Vector2::new(-1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_ray_from_inside_box_reports_nothing() {
        let mut b = Shape::rect(2.0, 2.0, Vector2::zeros()).unwrap();
        b.transform(&Transform::identity());
        assert!(b
            .cast_ray(Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0))
            .is_none());
    }
}
