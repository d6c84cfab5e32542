//! The shape sum type and its factories.

use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::Vector2;
use nova_types::constants::POLYGON_MAX_VERTICES;
use nova_types::math::rotate;
use nova_types::{Aabb, PhysicsError, Result, ShapeId, Transform};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::circle::Circle;
use crate::polygon::{centroid, convex_hull, Polygon};

static NEXT_SHAPE_ID: AtomicU64 = AtomicU64::new(1);

fn next_shape_id() -> ShapeId {
    ShapeId(NEXT_SHAPE_ID.fetch_add(1, Ordering::Relaxed))
}

/// Mass contribution of a single shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassInfo {
    /// Mass (density × area).
    pub mass: f64,
    /// Moment of inertia about [`MassInfo::centroid`].
    pub inertia: f64,
    /// Centroid relative to the body origin.
    pub centroid: Vector2<f64>,
}

/// Geometry of a shape.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShapeKind {
    /// A circle.
    Circle(Circle),
    /// A convex polygon.
    Polygon(Polygon),
}

/// A collision shape owned by a rigid body.
///
/// Each shape carries a process-unique [`ShapeId`] used to key persistent
/// contacts. World-space geometry is cached and refreshed by
/// [`Shape::transform`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Shape {
    id: ShapeId,
    kind: ShapeKind,
}

impl Shape {
    /// Create a circle shape.
    pub fn circle(center: Vector2<f64>, radius: f64) -> Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(PhysicsError::invalid_geometry(format!(
                "circle radius must be positive and finite, got {radius}"
            )));
        }
        if !center.x.is_finite() || !center.y.is_finite() {
            return Err(PhysicsError::invalid_geometry("circle center is not finite"));
        }
        Ok(Self {
            id: next_shape_id(),
            kind: ShapeKind::Circle(Circle::new(center, radius)),
        })
    }

    /// Create a convex polygon shape, offsetting every vertex by `offset`.
    pub fn polygon(vertices: &[Vector2<f64>], offset: Vector2<f64>) -> Result<Self> {
        Ok(Self {
            id: next_shape_id(),
            kind: ShapeKind::Polygon(Polygon::new(vertices, offset)?),
        })
    }

    /// Create an axis-aligned rectangle centered on `offset`.
    pub fn rect(width: f64, height: f64, offset: Vector2<f64>) -> Result<Self> {
        if !(width > 0.0 && height > 0.0) {
            return Err(PhysicsError::invalid_geometry(format!(
                "rectangle size must be positive, got {width}x{height}"
            )));
        }
        let w = width * 0.5;
        let h = height * 0.5;
        let vertices = [
            Vector2::new(-w, -h),
            Vector2::new(w, -h),
            Vector2::new(w, h),
            Vector2::new(-w, h),
        ];
        Self::polygon(&vertices, offset)
    }

    /// Create a regular polygon with `n` vertices on a circle of `radius`.
    pub fn ngon(n: usize, radius: f64, offset: Vector2<f64>) -> Result<Self> {
        if n < 3 {
            return Err(PhysicsError::invalid_geometry(
                "cannot create a polygon shape with fewer than 3 vertices",
            ));
        }
        if n > POLYGON_MAX_VERTICES {
            return Err(PhysicsError::invalid_geometry(format!(
                "too many polygon vertices ({n} > {POLYGON_MAX_VERTICES})"
            )));
        }
        let step = std::f64::consts::TAU / n as f64;
        let arm = Vector2::new(radius, 0.0);
        let vertices: Vec<_> = (0..n).map(|i| rotate(arm, step * i as f64)).collect();
        Self::polygon(&vertices, offset)
    }

    /// Create a polygon from the convex hull of `points`.
    ///
    /// With `center` set the hull is first translated so its centroid sits
    /// at the local origin.
    pub fn convex_hull(points: &[Vector2<f64>], offset: Vector2<f64>, center: bool) -> Result<Self> {
        if points.len() < 3 {
            return Err(PhysicsError::invalid_geometry(
                "cannot create a polygon shape with fewer than 3 vertices",
            ));
        }
        let mut hull = convex_hull(points);
        if center && hull.len() >= 3 {
            let c = centroid(&hull);
            for v in &mut hull {
                *v -= c;
            }
        }
        Self::polygon(&hull, offset)
    }

    /// The shape's id.
    #[must_use]
    pub fn id(&self) -> ShapeId {
        self.id
    }

    /// The shape's geometry.
    #[must_use]
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// The circle, if this is one.
    #[must_use]
    pub fn as_circle(&self) -> Option<&Circle> {
        match &self.kind {
            ShapeKind::Circle(c) => Some(c),
            ShapeKind::Polygon(_) => None,
        }
    }

    /// The polygon, if this is one.
    #[must_use]
    pub fn as_polygon(&self) -> Option<&Polygon> {
        match &self.kind {
            ShapeKind::Polygon(p) => Some(p),
            ShapeKind::Circle(_) => None,
        }
    }

    /// Mass, inertia about the shape centroid, and the centroid.
    #[must_use]
    pub fn compute_mass(&self, density: f64) -> MassInfo {
        match &self.kind {
            ShapeKind::Circle(c) => {
                let mass = density * c.area();
                MassInfo {
                    mass,
                    inertia: c.inertia(mass),
                    centroid: c.center,
                }
            }
            ShapeKind::Polygon(p) => {
                let (mass, inertia, centroid) = p.mass_properties(density);
                MassInfo {
                    mass,
                    inertia,
                    centroid,
                }
            }
        }
    }

    /// World bounds under `xform`.
    #[must_use]
    pub fn aabb(&self, xform: &Transform) -> Aabb {
        match &self.kind {
            ShapeKind::Circle(c) => {
                let center = xform.apply(c.center);
                Aabb::from_center(center, Vector2::new(c.radius, c.radius))
            }
            ShapeKind::Polygon(p) => {
                Aabb::from_points(p.vertices().iter().map(|v| xform.apply(*v)))
                    .unwrap_or_default()
            }
        }
    }

    /// Bounds of the cached world geometry.
    #[must_use]
    pub fn world_aabb(&self) -> Aabb {
        match &self.kind {
            ShapeKind::Circle(c) => {
                Aabb::from_center(c.world_center(), Vector2::new(c.radius, c.radius))
            }
            ShapeKind::Polygon(p) => {
                Aabb::from_points(p.world_vertices().iter().copied()).unwrap_or_default()
            }
        }
    }

    /// Refresh the cached world geometry.
    pub fn transform(&mut self, xform: &Transform) {
        match &mut self.kind {
            ShapeKind::Circle(c) => c.transform(xform),
            ShapeKind::Polygon(p) => p.transform(xform),
        }
    }

    /// Interval covered by the world shape projected onto unit `axis`.
    #[must_use]
    pub fn project(&self, axis: Vector2<f64>) -> (f64, f64) {
        match &self.kind {
            ShapeKind::Circle(c) => c.project(axis),
            ShapeKind::Polygon(p) => p.project(axis),
        }
    }
}
