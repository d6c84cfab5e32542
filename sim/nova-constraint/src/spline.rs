//! Spline path joint.
//!
//! Constrains an anchor on one body to a Catmull-Rom path through a list of
//! control points. Every presolve finds the closest point on the path (coarse
//! sampling, then golden-section refinement on the best segment) and solves a
//! point constraint toward it.

use nalgebra::Vector2;
use nova_body::RigidBody;
use nova_types::constants::{SPLINE_MAX_CONTROL_POINTS, SPLINE_SAMPLES, SPLINE_TOLERANCE};
use nova_types::{math::normalize_or_zero, PhysicsError, Result, SpaceSettings};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bodies::{inverse_or_zero, local_anchor, world_anchor, BodyPair};

/// `1 / phi`.
const INV_PHI: f64 = 0.618_033_988_749_894_8;

/// Fewest control points a path accepts.
pub const SPLINE_MIN_CONTROL_POINTS: usize = 4;

/// Parameters for a [`SplineConstraint`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SplineConstraintInit {
    /// World-space anchor on the body.
    pub anchor: Vector2<f64>,
    /// Largest force the joint can exert.
    pub max_force: f64,
    /// Path control points; empty leaves the joint inactive until set.
    pub control_points: Vec<Vector2<f64>>,
}

impl Default for SplineConstraintInit {
    fn default() -> Self {
        Self {
            anchor: Vector2::zeros(),
            max_force: f64::INFINITY,
            control_points: Vec::new(),
        }
    }
}

impl SplineConstraintInit {
    /// Anchor at a world point with the given path.
    #[must_use]
    pub fn new(anchor: Vector2<f64>, control_points: Vec<Vector2<f64>>) -> Self {
        Self {
            anchor,
            control_points,
            ..Default::default()
        }
    }
}

/// Catmull-Rom point for parameter `t` in `[0, 1]` between `p1` and `p2`.
#[must_use]
pub fn catmull_rom(
    p0: Vector2<f64>,
    p1: Vector2<f64>,
    p2: Vector2<f64>,
    p3: Vector2<f64>,
    t: f64,
) -> Vector2<f64> {
    let t2 = t * t;
    let t3 = t2 * t;
    (p1 * 2.0
        + (p2 - p0) * t
        + (p0 * 2.0 - p1 * 5.0 + p2 * 4.0 - p3) * t2
        + (-p0 + p1 * 3.0 - p2 * 3.0 + p3) * t3)
        * 0.5
}

/// Golden-section search for the segment parameter closest to `point`.
fn closest_parameter(segment: &[Vector2<f64>], point: Vector2<f64>, tolerance: f64) -> f64 {
    let eval = |t| catmull_rom(segment[0], segment[1], segment[2], segment[3], t);
    let mut a = 0.0;
    let mut b = 1.0;
    let mut t1 = b - (b - a) * INV_PHI;
    let mut t2 = a + (b - a) * INV_PHI;
    while (b - a) > tolerance {
        if (eval(t1) - point).norm_squared() < (eval(t2) - point).norm_squared() {
            b = t2;
        } else {
            a = t1;
        }
        t1 = b - (b - a) * INV_PHI;
        t2 = a + (b - a) * INV_PHI;
    }
    (a + b) * 0.5
}

/// Closest point on the Catmull-Rom path through `controls`.
///
/// Returns `None` for fewer than four control points.
#[must_use]
pub fn spline_closest_point(controls: &[Vector2<f64>], point: Vector2<f64>, tolerance: f64) -> Option<Vector2<f64>> {
    if controls.len() < SPLINE_MIN_CONTROL_POINTS {
        return None;
    }
    let segments = controls.len() - 3;
    let samples = (SPLINE_SAMPLES / segments).max(2);

    let mut best_segment = 0;
    let mut best_dist = f64::INFINITY;
    for (i, window) in controls.windows(4).enumerate() {
        for j in 0..samples {
            let t = j as f64 / (samples - 1) as f64;
            let p = catmull_rom(window[0], window[1], window[2], window[3], t);
            let dist = (p - point).norm_squared();
            if dist < best_dist {
                best_dist = dist;
                best_segment = i;
            }
        }
    }

    let segment = &controls[best_segment..best_segment + 4];
    let t = closest_parameter(segment, point, tolerance);
    Some(catmull_rom(segment[0], segment[1], segment[2], segment[3], t))
}

/// Spline path joint.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SplineConstraint {
    anchor: Vector2<f64>,
    anchor_a: Vector2<f64>,
    max_force: f64,
    controls: Vec<Vector2<f64>>,
    tolerance: f64,

    ra: Vector2<f64>,
    target: Vector2<f64>,
    normal: Vector2<f64>,
    bias: f64,
    mass: f64,
    impulse: f64,
    max_impulse: f64,
}

impl SplineConstraint {
    /// Attach `body` at the init's world anchor.
    pub fn new(body: &RigidBody, init: SplineConstraintInit) -> Result<Self> {
        if init.max_force.is_nan() || init.max_force < 0.0 {
            return Err(PhysicsError::invalid_parameter(
                "max_force",
                format!("must be non-negative, got {}", init.max_force),
            ));
        }
        let mut constraint = Self {
            anchor: init.anchor,
            anchor_a: local_anchor(Some(body), init.anchor),
            max_force: init.max_force,
            controls: Vec::new(),
            tolerance: SPLINE_TOLERANCE,
            ra: Vector2::zeros(),
            target: Vector2::zeros(),
            normal: Vector2::zeros(),
            bias: 0.0,
            mass: 0.0,
            impulse: 0.0,
            max_impulse: 0.0,
        };
        if !init.control_points.is_empty() {
            constraint.set_control_points(&init.control_points)?;
        }
        Ok(constraint)
    }

    /// World anchor given at creation or by [`Self::set_anchor`].
    #[must_use]
    pub fn anchor(&self) -> Vector2<f64> {
        self.anchor
    }

    /// Reattach at a world point for the body's current pose.
    pub fn set_anchor(&mut self, body: &RigidBody, anchor: Vector2<f64>) {
        self.anchor = anchor;
        self.anchor_a = local_anchor(Some(body), anchor);
    }

    /// Largest joint force.
    #[must_use]
    pub fn max_force(&self) -> f64 {
        self.max_force
    }

    /// Change the force limit.
    pub fn set_max_force(&mut self, max_force: f64) -> Result<()> {
        if max_force.is_nan() || max_force < 0.0 {
            return Err(PhysicsError::invalid_parameter(
                "max_force",
                format!("must be non-negative, got {max_force}"),
            ));
        }
        self.max_force = max_force;
        Ok(())
    }

    /// Path control points.
    #[must_use]
    pub fn control_points(&self) -> &[Vector2<f64>] {
        &self.controls
    }

    /// Replace the path.
    pub fn set_control_points(&mut self, points: &[Vector2<f64>]) -> Result<()> {
        if points.len() < SPLINE_MIN_CONTROL_POINTS {
            return Err(PhysicsError::InsufficientControlPoints(points.len()));
        }
        if points.len() > SPLINE_MAX_CONTROL_POINTS {
            return Err(PhysicsError::TooManyControlPoints {
                got: points.len(),
                max: SPLINE_MAX_CONTROL_POINTS,
            });
        }
        self.controls = points.to_vec();
        Ok(())
    }

    /// Golden-section search tolerance.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Change the search tolerance.
    pub fn set_tolerance(&mut self, tolerance: f64) -> Result<()> {
        if !(tolerance > 0.0 && tolerance < 1.0) {
            return Err(PhysicsError::invalid_parameter(
                "tolerance",
                format!("must be in (0, 1), got {tolerance}"),
            ));
        }
        self.tolerance = tolerance;
        Ok(())
    }

    /// Closest point on the path to `point`.
    #[must_use]
    pub fn closest_point(&self, point: Vector2<f64>) -> Option<Vector2<f64>> {
        spline_closest_point(&self.controls, point, self.tolerance)
    }

    /// Path point the last presolve pulled toward.
    #[must_use]
    pub fn target(&self) -> Vector2<f64> {
        self.target
    }

    /// World position of the body anchor.
    #[must_use]
    pub fn anchor_position(&self, body: &RigidBody) -> Vector2<f64> {
        world_anchor(Some(body), self.anchor_a).1
    }

    pub(crate) fn presolve(&mut self, bodies: &BodyPair<'_>, settings: &SpaceSettings, dt: f64, inv_dt: f64) {
        let (ra, pa) = world_anchor(bodies.a(), self.anchor_a);
        self.ra = ra;

        let Some(target) = self.closest_point(pa) else {
            self.normal = Vector2::zeros();
            return;
        };
        self.target = target;

        let delta = target - pa;
        self.normal = normalize_or_zero(delta);
        self.bias = settings.baumgarte * inv_dt * delta.norm();
        self.mass = inverse_or_zero(bodies.mass_k(self.normal, ra, Vector2::zeros()));
        self.max_impulse = self.max_force * dt;
    }

    pub(crate) fn warmstart(&mut self, bodies: &mut BodyPair<'_>, settings: &SpaceSettings) {
        if settings.warmstarting {
            bodies.apply_impulse(self.normal * self.impulse, self.ra, Vector2::zeros());
        } else {
            self.impulse = 0.0;
        }
    }

    pub(crate) fn solve(&mut self, bodies: &mut BodyPair<'_>) {
        if self.normal == Vector2::zeros() {
            return;
        }
        let vn = bodies.relative_velocity(self.ra, Vector2::zeros()).dot(&self.normal);
        let lambda = -(self.bias + vn) * self.mass;

        let previous = self.impulse;
        self.impulse = (previous + lambda).clamp(-self.max_impulse, self.max_impulse);
        let applied = self.impulse - previous;

        bodies.apply_impulse(self.normal * applied, self.ra, Vector2::zeros());
    }
}
