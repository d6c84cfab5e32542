//! Hinge (revolute) joint.
//!
//! Pins a shared world anchor on both bodies and optionally limits their
//! relative rotation. The reference angle is captured at creation, so limits
//! are measured from the initial relative pose.

use std::f64::consts::FRAC_PI_2;

use nalgebra::{Matrix2, Vector2};
use nova_body::RigidBody;
use nova_types::{PhysicsError, Result, SpaceSettings};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bodies::{inverse_or_zero, local_anchor, world_anchor, BodyPair};

/// Parameters for a [`HingeConstraint`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HingeConstraintInit {
    /// Pivot in world space.
    pub anchor: Vector2<f64>,
    /// Enforce the angular limits.
    pub enable_limits: bool,
    /// Lower bound of the relative angle.
    pub lower_limit: f64,
    /// Upper bound of the relative angle.
    pub upper_limit: f64,
    /// Largest force the pivot can exert.
    pub max_force: f64,
}

impl Default for HingeConstraintInit {
    fn default() -> Self {
        Self {
            anchor: Vector2::zeros(),
            enable_limits: false,
            lower_limit: -FRAC_PI_2,
            upper_limit: FRAC_PI_2,
            max_force: f64::INFINITY,
        }
    }
}

impl HingeConstraintInit {
    /// Hinge about a world point.
    #[must_use]
    pub fn new(anchor: Vector2<f64>) -> Self {
        Self {
            anchor,
            ..Default::default()
        }
    }

    /// Enable limits on the relative angle.
    #[must_use]
    pub fn with_limits(mut self, lower: f64, upper: f64) -> Self {
        self.enable_limits = true;
        self.lower_limit = lower;
        self.upper_limit = upper;
        self
    }

    /// Limit the pivot force.
    #[must_use]
    pub fn with_max_force(mut self, max_force: f64) -> Self {
        self.max_force = max_force;
        self
    }
}

/// Hinge joint.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HingeConstraint {
    anchor: Vector2<f64>,
    anchor_a: Vector2<f64>,
    anchor_b: Vector2<f64>,
    reference_angle: f64,
    enable_limits: bool,
    lower_limit: f64,
    upper_limit: f64,
    max_force: f64,

    ra: Vector2<f64>,
    rb: Vector2<f64>,
    angle: f64,
    bias: Vector2<f64>,
    mass: Matrix2<f64>,
    axial_mass: f64,
    impulse: Vector2<f64>,
    max_impulse: f64,
    lower_impulse: f64,
    upper_impulse: f64,
}

impl HingeConstraint {
    /// Create a hinge between the bodies as they are posed now.
    pub fn new(a: Option<&RigidBody>, b: Option<&RigidBody>, init: HingeConstraintInit) -> Result<Self> {
        if a.is_none() && b.is_none() {
            return Err(PhysicsError::BothBodiesNull);
        }
        validate_limits(init.lower_limit, init.upper_limit)?;
        if init.max_force.is_nan() || init.max_force < 0.0 {
            return Err(PhysicsError::invalid_parameter(
                "max_force",
                format!("must be non-negative, got {}", init.max_force),
            ));
        }

        let angle_a = a.map_or(0.0, RigidBody::angle);
        let angle_b = b.map_or(0.0, RigidBody::angle);

        Ok(Self {
            anchor: init.anchor,
            anchor_a: local_anchor(a, init.anchor),
            anchor_b: local_anchor(b, init.anchor),
            reference_angle: angle_b - angle_a,
            enable_limits: init.enable_limits,
            lower_limit: init.lower_limit,
            upper_limit: init.upper_limit,
            max_force: init.max_force,
            ra: Vector2::zeros(),
            rb: Vector2::zeros(),
            angle: 0.0,
            bias: Vector2::zeros(),
            mass: Matrix2::zeros(),
            axial_mass: 0.0,
            impulse: Vector2::zeros(),
            max_impulse: 0.0,
            lower_impulse: 0.0,
            upper_impulse: 0.0,
        })
    }

    /// World pivot given at creation.
    #[must_use]
    pub fn anchor(&self) -> Vector2<f64> {
        self.anchor
    }

    /// Move the pivot to a new world point for the bodies' current poses.
    pub fn set_anchor(&mut self, a: Option<&RigidBody>, b: Option<&RigidBody>, anchor: Vector2<f64>) {
        self.anchor = anchor;
        self.anchor_a = local_anchor(a, anchor);
        self.anchor_b = local_anchor(b, anchor);
    }

    /// Relative angle at creation.
    #[must_use]
    pub fn reference_angle(&self) -> f64 {
        self.reference_angle
    }

    /// Relative angle measured from the reference, as of the last presolve.
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Whether limits are enforced.
    #[must_use]
    pub fn limits_enabled(&self) -> bool {
        self.enable_limits
    }

    /// Toggle limits.
    pub fn set_limits_enabled(&mut self, enabled: bool) {
        self.enable_limits = enabled;
    }

    /// Lower angular limit.
    #[must_use]
    pub fn lower_limit(&self) -> f64 {
        self.lower_limit
    }

    /// Upper angular limit.
    #[must_use]
    pub fn upper_limit(&self) -> f64 {
        self.upper_limit
    }

    /// Change both limits.
    pub fn set_limits(&mut self, lower: f64, upper: f64) -> Result<()> {
        validate_limits(lower, upper)?;
        self.lower_limit = lower;
        self.upper_limit = upper;
        Ok(())
    }

    /// Largest pivot force.
    #[must_use]
    pub fn max_force(&self) -> f64 {
        self.max_force
    }

    /// Change the pivot force limit.
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

    /// Accumulated pivot impulse.
    #[must_use]
    pub fn impulse(&self) -> Vector2<f64> {
        self.impulse
    }

    /// Distance between the two bodies' copies of the pivot.
    #[must_use]
    pub fn pivot_error(&self, a: Option<&RigidBody>, b: Option<&RigidBody>) -> f64 {
        let (_, pa) = world_anchor(a, self.anchor_a);
        let (_, pb) = world_anchor(b, self.anchor_b);
        (pb - pa).norm()
    }

    pub(crate) fn presolve(&mut self, bodies: &BodyPair<'_>, settings: &SpaceSettings, dt: f64, inv_dt: f64) {
        let (ra, pa) = world_anchor(bodies.a(), self.anchor_a);
        let (rb, pb) = world_anchor(bodies.b(), self.anchor_b);
        self.ra = ra;
        self.rb = rb;

        self.bias = (pb - pa) * (settings.baumgarte * inv_dt);

        let (ma, mb) = bodies.inverse_masses();
        let (ia, ib) = bodies.inverse_inertias();
        let k = Matrix2::new(
            ma + mb + ia * ra.y * ra.y + ib * rb.y * rb.y,
            -ia * ra.x * ra.y - ib * rb.x * rb.y,
            -ia * ra.x * ra.y - ib * rb.x * rb.y,
            ma + mb + ia * ra.x * ra.x + ib * rb.x * rb.x,
        );
        self.mass = k.try_inverse().unwrap_or_else(Matrix2::zeros);

        self.max_impulse = self.max_force * dt;
        self.axial_mass = inverse_or_zero(ia + ib);
        self.angle = bodies.relative_angle() - self.reference_angle;

        if !self.enable_limits {
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }
    }

    pub(crate) fn warmstart(&mut self, bodies: &mut BodyPair<'_>, settings: &SpaceSettings) {
        if settings.warmstarting {
            bodies.apply_impulse(self.impulse, self.ra, self.rb);
            bodies.apply_angular_impulse(self.lower_impulse - self.upper_impulse);
        } else {
            self.impulse = Vector2::zeros();
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }
    }

    pub(crate) fn solve(&mut self, bodies: &mut BodyPair<'_>, settings: &SpaceSettings, inv_dt: f64) {
        if self.enable_limits {
            // Lower: angle >= lower_limit
            let c = self.angle - self.lower_limit;
            let bias = limit_bias(c, settings.baumgarte, inv_dt);
            let wr = bodies.relative_angular_velocity();
            let lambda = -self.axial_mass * (wr + bias);
            let previous = self.lower_impulse;
            self.lower_impulse = (previous + lambda).max(0.0);
            bodies.apply_angular_impulse(self.lower_impulse - previous);

            // Upper: angle <= upper_limit
            let c = self.upper_limit - self.angle;
            let bias = limit_bias(c, settings.baumgarte, inv_dt);
            let wr = -bodies.relative_angular_velocity();
            let lambda = -self.axial_mass * (wr + bias);
            let previous = self.upper_impulse;
            self.upper_impulse = (previous + lambda).max(0.0);
            bodies.apply_angular_impulse(-(self.upper_impulse - previous));
        }

        let cdot = bodies.relative_velocity(self.ra, self.rb);
        let lambda = -(self.mass * (cdot + self.bias));

        let previous = self.impulse;
        let mut total = previous + lambda;
        let magnitude = total.norm();
        if magnitude > self.max_impulse && magnitude > 0.0 {
            total *= self.max_impulse / magnitude;
        }
        self.impulse = total;

        bodies.apply_impulse(total - previous, self.ra, self.rb);
    }
}

/// Speculative when inside the limit, Baumgarte when past it.
fn limit_bias(c: f64, baumgarte: f64, inv_dt: f64) -> f64 {
    if c > 0.0 {
        c * inv_dt
    } else {
        baumgarte * c * inv_dt
    }
}

fn validate_limits(lower: f64, upper: f64) -> Result<()> {
    if lower.is_nan() || upper.is_nan() || lower > upper {
        return Err(PhysicsError::invalid_parameter(
            "limits",
            format!("lower limit {lower} must not exceed upper limit {upper}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nova_body::RigidBodyInit;
    use nova_shape::Shape;
    use std::f64::consts::FRAC_PI_4;

    const DT: f64 = 1.0 / 60.0;

    fn plank(x: f64, y: f64) -> RigidBody {
        RigidBody::with_shape(
            RigidBodyInit::dynamic(Vector2::new(x, y)),
            Shape::rect(2.0, 0.2, Vector2::zeros()).unwrap(),
        )
        .unwrap()
    }

    fn step(
        joint: &mut HingeConstraint,
        a: Option<&mut RigidBody>,
        b: Option<&mut RigidBody>,
        settings: &SpaceSettings,
    ) {
        let mut bodies = BodyPair::new(a, b);
        joint.presolve(&bodies, settings, DT, 1.0 / DT);
        joint.warmstart(&mut bodies, settings);
        for _ in 0..settings.constraint_iterations {
            joint.solve(&mut bodies, settings, 1.0 / DT);
        }
        if let Some(a) = bodies.a_mut() {
            a.integrate_velocities(DT);
        }
        if let Some(b) = bodies.b_mut() {
            b.integrate_velocities(DT);
        }
    }

    #[test]
    fn test_defaults() {
        let init = HingeConstraintInit::default();
        assert!(!init.enable_limits);
        assert_eq!(init.lower_limit, -FRAC_PI_2);
        assert_eq!(init.upper_limit, FRAC_PI_2);
        assert!(init.max_force.is_infinite());
    }

    #[test]
    fn test_requires_a_body() {
        let err = HingeConstraint::new(None, None, HingeConstraintInit::default()).unwrap_err();
        assert_eq!(err, PhysicsError::BothBodiesNull);
        assert!(err.is_construction_error());
    }

    #[test]
    fn test_inverted_limits_rejected() {
        let b = plank(0.0, 0.0);
        let init = HingeConstraintInit::default().with_limits(1.0, -1.0);
        assert!(HingeConstraint::new(None, Some(&b), init).is_err());
    }

    #[test]
    fn test_reference_angle_captured() {
        let a = RigidBody::with_shape(
            RigidBodyInit::dynamic(Vector2::zeros()).with_angle(0.3),
            Shape::circle(Vector2::zeros(), 0.5).unwrap(),
        )
        .unwrap();
        let b = RigidBody::with_shape(
            RigidBodyInit::dynamic(Vector2::new(1.0, 0.0)).with_angle(1.0),
            Shape::circle(Vector2::zeros(), 0.5).unwrap(),
        )
        .unwrap();
        let hinge = HingeConstraint::new(Some(&a), Some(&b), HingeConstraintInit::new(Vector2::new(0.5, 0.0))).unwrap();
        assert_relative_eq!(hinge.reference_angle(), 0.7);
        assert_relative_eq!(hinge.pivot_error(Some(&a), Some(&b)), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pivot_holds_under_gravity() {
        let settings = SpaceSettings::default();
        let mut b = plank(1.0, 0.0);
        let pivot = Vector2::new(0.0, 0.0);
        let mut hinge = HingeConstraint::new(None, Some(&b), HingeConstraintInit::new(pivot)).unwrap();

        for _ in 0..240 {
            b.integrate_accelerations(settings.gravity, 0.0, 0.0, DT);
            step(&mut hinge, None, Some(&mut b), &settings);
        }
        assert!(hinge.pivot_error(None, Some(&b)) < 0.05);
        assert!(b.position().y < 0.0);
    }

    #[test]
    fn test_limits_hold_against_torque() {
        let settings = SpaceSettings::default().zero_gravity();
        let ground = RigidBody::with_shape(
            RigidBodyInit::fixed(Vector2::zeros()),
            Shape::rect(1.0, 1.0, Vector2::zeros()).unwrap(),
        )
        .unwrap();
        let mut b = plank(1.0, 0.0);
        let init = HingeConstraintInit::new(Vector2::zeros()).with_limits(-FRAC_PI_4, FRAC_PI_4);
        let mut hinge = HingeConstraint::new(Some(&ground), Some(&b), init).unwrap();

        let mut ground = ground;
        for _ in 0..600 {
            b.apply_torque(50.0);
            b.integrate_accelerations(settings.gravity, 0.0, 0.0, DT);
            step(&mut hinge, Some(&mut ground), Some(&mut b), &settings);
        }
        let angle = b.angle();
        assert!(angle <= FRAC_PI_4 + 0.05, "angle {angle}");
        assert!(angle >= -FRAC_PI_4 - 0.05, "angle {angle}");
        assert!(angle > FRAC_PI_4 - 0.1, "torque should drive it to the upper stop");
    }

    #[test]
    fn test_disabled_limits_allow_free_spin() {
        let settings = SpaceSettings::default().zero_gravity();
        let mut b = plank(1.0, 0.0);
        let mut hinge = HingeConstraint::new(None, Some(&b), HingeConstraintInit::new(Vector2::zeros())).unwrap();
        for _ in 0..300 {
            b.apply_torque(5.0);
            b.integrate_accelerations(settings.gravity, 0.0, 0.0, DT);
            step(&mut hinge, None, Some(&mut b), &settings);
        }
        assert!(b.angle() > FRAC_PI_2);
    }
}
