//! 2D vector helpers and rigid transforms.
//!
//! Everything here operates on [`nalgebra::Vector2<f64>`]. The free
//! functions cover the few 2D-specific products nalgebra does not name
//! (scalar cross, perpendiculars) plus the effective-mass and
//! relative-velocity formulas shared by every velocity constraint.

use nalgebra::Vector2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tolerance used by [`nearly_eq`] (half a millimetre).
pub const NEARLY_EQUAL_THRESHOLD: f64 = 0.0005;

/// 2D cross product `a.x * b.y - a.y * b.x`.
#[inline]
#[must_use]
pub fn cross(a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Cross product of a scalar (angular velocity) and a vector: `s × v`.
#[inline]
#[must_use]
pub fn cross_sv(s: f64, v: Vector2<f64>) -> Vector2<f64> {
    Vector2::new(-s * v.y, s * v.x)
}

/// Counter-clockwise perpendicular `(-y, x)`.
#[inline]
#[must_use]
pub fn perp(v: Vector2<f64>) -> Vector2<f64> {
    Vector2::new(-v.y, v.x)
}

/// Clockwise perpendicular `(y, -x)`.
///
/// For a counter-clockwise polygon edge this points outward.
#[inline]
#[must_use]
pub fn perpr(v: Vector2<f64>) -> Vector2<f64> {
    Vector2::new(v.y, -v.x)
}

/// Rotate `v` by `angle` radians.
#[inline]
#[must_use]
pub fn rotate(v: Vector2<f64>, angle: f64) -> Vector2<f64> {
    let (s, c) = angle.sin_cos();
    Vector2::new(c * v.x - s * v.y, s * v.x + c * v.y)
}

/// Normalize `v`, or return `fallback` when `v` has zero length.
#[inline]
#[must_use]
pub fn normalize_or(v: Vector2<f64>, fallback: Vector2<f64>) -> Vector2<f64> {
    let len2 = v.norm_squared();
    if len2 == 0.0 {
        fallback
    } else {
        v / len2.sqrt()
    }
}

/// Normalize `v`, or return zero when `v` has zero length.
#[inline]
#[must_use]
pub fn normalize_or_zero(v: Vector2<f64>) -> Vector2<f64> {
    normalize_or(v, Vector2::zeros())
}

/// Check two scalars for equality within [`NEARLY_EQUAL_THRESHOLD`].
#[inline]
#[must_use]
pub fn nearly_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < NEARLY_EQUAL_THRESHOLD
}

/// Check two vectors for component-wise equality within [`NEARLY_EQUAL_THRESHOLD`].
#[inline]
#[must_use]
pub fn nearly_eq_vec(a: Vector2<f64>, b: Vector2<f64>) -> bool {
    nearly_eq(a.x, b.x) && nearly_eq(a.y, b.y)
}

/// Inverse effective mass `K` of a point constraint along `normal`.
///
/// `ra` and `rb` are the lever arms from each body's center of mass to the
/// contact/anchor point. Infinite-mass sides contribute zero.
#[inline]
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn calc_mass_k(
    normal: Vector2<f64>,
    ra: Vector2<f64>,
    rb: Vector2<f64>,
    invmass_a: f64,
    invmass_b: f64,
    invinertia_a: f64,
    invinertia_b: f64,
) -> f64 {
    let rn_a = cross(ra, normal);
    let rn_b = cross(rb, normal);
    invmass_a + invmass_b + rn_a * rn_a * invinertia_a + rn_b * rn_b * invinertia_b
}

/// Velocity of B's anchor point relative to A's anchor point.
#[inline]
#[must_use]
pub fn relative_velocity(
    linear_a: Vector2<f64>,
    angular_a: f64,
    ra: Vector2<f64>,
    linear_b: Vector2<f64>,
    angular_b: f64,
    rb: Vector2<f64>,
) -> Vector2<f64> {
    let va = linear_a + cross_sv(angular_a, ra);
    let vb = linear_b + cross_sv(angular_b, rb);
    vb - va
}

/// Closest point on segment `[a, b]` to `p` and the squared distance to it.
#[must_use]
pub fn closest_point_on_segment(
    p: Vector2<f64>,
    a: Vector2<f64>,
    b: Vector2<f64>,
) -> (Vector2<f64>, f64) {
    let ab = b - a;
    let len2 = ab.norm_squared();
    let closest = if len2 == 0.0 {
        a
    } else {
        let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
        a + ab * t
    };
    (closest, (p - closest).norm_squared())
}

/// Position and rotation of a body frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transform {
    /// Translation in world space.
    pub position: Vector2<f64>,
    /// Rotation in radians.
    pub angle: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// Create a transform.
    #[must_use]
    pub fn new(position: Vector2<f64>, angle: f64) -> Self {
        Self { position, angle }
    }

    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            position: Vector2::zeros(),
            angle: 0.0,
        }
    }

    /// Map a local point into world space.
    #[must_use]
    pub fn apply(&self, local: Vector2<f64>) -> Vector2<f64> {
        self.position + rotate(local, self.angle)
    }

    /// Map a world point into local space.
    #[must_use]
    pub fn apply_inverse(&self, world: Vector2<f64>) -> Vector2<f64> {
        rotate(world - self.position, -self.angle)
    }

    /// Rotate a local direction into world space.
    #[must_use]
    pub fn rotate(&self, local: Vector2<f64>) -> Vector2<f64> {
        rotate(local, self.angle)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_cross_products() {
        let a = Vector2::new(1.0, 0.0);
        let b = Vector2::new(0.0, 1.0);
        assert_eq!(cross(a, b), 1.0);
        assert_eq!(cross(b, a), -1.0);

        // ω × r for ω = 2 around +Z, r = +X gives +Y * 2
        let v = cross_sv(2.0, a);
        assert_relative_eq!(v, Vector2::new(0.0, 2.0));
    }

    #[test]
    fn test_perpendiculars() {
        let v = Vector2::new(1.0, 0.0);
        assert_eq!(perp(v), Vector2::new(0.0, 1.0));
        assert_eq!(perpr(v), Vector2::new(0.0, -1.0));
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let v = rotate(Vector2::new(1.0, 0.0), FRAC_PI_2);
        assert_relative_eq!(v, Vector2::new(0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_fallback() {
        let up = Vector2::new(0.0, 1.0);
        assert_eq!(normalize_or(Vector2::zeros(), up), up);
        assert_relative_eq!(
            normalize_or(Vector2::new(3.0, 4.0), up),
            Vector2::new(0.6, 0.8)
        );
        assert_eq!(normalize_or_zero(Vector2::zeros()), Vector2::zeros());
    }

    #[test]
    fn test_mass_k_point_masses() {
        let n = Vector2::new(1.0, 0.0);
        let k = calc_mass_k(n, Vector2::zeros(), Vector2::zeros(), 0.5, 0.25, 1.0, 1.0);
        assert_relative_eq!(k, 0.75);

        // A lever arm perpendicular to the normal adds rotational terms
        let r = Vector2::new(0.0, 2.0);
        let k = calc_mass_k(n, r, Vector2::zeros(), 1.0, 0.0, 0.5, 0.0);
        assert_relative_eq!(k, 1.0 + 4.0 * 0.5);
    }

    #[test]
    fn test_relative_velocity() {
        let rv = relative_velocity(
            Vector2::new(1.0, 0.0),
            0.0,
            Vector2::zeros(),
            Vector2::new(3.0, 0.0),
            1.0,
            Vector2::new(1.0, 0.0),
        );
        assert_relative_eq!(rv, Vector2::new(2.0, 1.0));
    }

    #[test]
    fn test_closest_point_on_segment() {
        let (p, d2) = closest_point_on_segment(
            Vector2::new(0.5, 1.0),
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
        );
        assert_relative_eq!(p, Vector2::new(0.5, 0.0));
        assert_relative_eq!(d2, 1.0);

        // Beyond the end clamps to the endpoint
        let (p, _) = closest_point_on_segment(
            Vector2::new(3.0, 0.0),
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
        );
        assert_relative_eq!(p, Vector2::new(1.0, 0.0));
    }

    #[test]
    fn test_transform_roundtrip_point() {
        let xf = Transform::new(Vector2::new(2.0, -1.0), 0.7);
        let local = Vector2::new(0.3, 1.2);
        let world = xf.apply(local);
        assert_relative_eq!(xf.apply_inverse(world), local, epsilon = 1e-12);
    }
}
