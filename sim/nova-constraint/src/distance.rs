//! Distance joint.
//!
//! Keeps two anchor points a fixed distance apart. In spring mode the rigid
//! Baumgarte correction is replaced by a soft constraint tuned with a
//! frequency and damping ratio.

use nalgebra::Vector2;
use nova_body::RigidBody;
use nova_types::{math::normalize_or_zero, PhysicsError, Result, SpaceSettings};
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bodies::{inverse_or_zero, world_anchor, BodyPair};

/// Parameters for a [`DistanceConstraint`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DistanceConstraintInit {
    /// Anchor on A, relative to its center of mass (world point if A is absent).
    pub anchor_a: Vector2<f64>,
    /// Anchor on B, relative to its center of mass (world point if B is absent).
    pub anchor_b: Vector2<f64>,
    /// Target distance between the anchors.
    pub length: f64,
    /// Largest force the joint can exert.
    pub max_force: f64,
    /// Use the soft spring formulation.
    pub spring: bool,
    /// Spring frequency in hertz.
    pub hertz: f64,
    /// Spring damping ratio.
    pub damping: f64,
}

impl Default for DistanceConstraintInit {
    fn default() -> Self {
        Self {
            anchor_a: Vector2::zeros(),
            anchor_b: Vector2::zeros(),
            length: 1.0,
            max_force: f64::INFINITY,
            spring: false,
            hertz: 3.0,
            damping: 0.3,
        }
    }
}

impl DistanceConstraintInit {
    /// Rigid joint of the given length.
    #[must_use]
    pub fn new(length: f64) -> Self {
        Self {
            length,
            ..Default::default()
        }
    }

    /// Set both anchors.
    #[must_use]
    pub fn with_anchors(mut self, anchor_a: Vector2<f64>, anchor_b: Vector2<f64>) -> Self {
        self.anchor_a = anchor_a;
        self.anchor_b = anchor_b;
        self
    }

    /// Switch to spring mode.
    #[must_use]
    pub fn with_spring(mut self, hertz: f64, damping: f64) -> Self {
        self.spring = true;
        self.hertz = hertz;
        self.damping = damping;
        self
    }

    /// Limit the joint force.
    #[must_use]
    pub fn with_max_force(mut self, max_force: f64) -> Self {
        self.max_force = max_force;
        self
    }
}

/// Distance joint between two bodies (or a body and the world).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DistanceConstraint {
    anchor_a: Vector2<f64>,
    anchor_b: Vector2<f64>,
    length: f64,
    max_force: f64,
    spring: bool,
    hertz: f64,
    damping: f64,

    ra: Vector2<f64>,
    rb: Vector2<f64>,
    normal: Vector2<f64>,
    bias: f64,
    mass: f64,
    impulse: f64,
    max_impulse: f64,
    bias_rate: f64,
    mass_coeff: f64,
    impulse_coeff: f64,
}

impl DistanceConstraint {
    /// Create a distance joint.
    pub fn new(init: DistanceConstraintInit) -> Result<Self> {
        validate_length(init.length)?;
        validate_max_force(init.max_force)?;
        if init.spring && init.hertz <= 0.0 {
            warn!(hertz = init.hertz, "spring distance constraint with non-positive frequency");
        }
        Ok(Self {
            anchor_a: init.anchor_a,
            anchor_b: init.anchor_b,
            length: init.length,
            max_force: init.max_force,
            spring: init.spring,
            hertz: init.hertz,
            damping: init.damping,
            ra: Vector2::zeros(),
            rb: Vector2::zeros(),
            normal: Vector2::zeros(),
            bias: 0.0,
            mass: 0.0,
            impulse: 0.0,
            max_impulse: 0.0,
            bias_rate: 1.0,
            mass_coeff: 1.0,
            impulse_coeff: 0.0,
        })
    }

    /// Target distance.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Change the target distance.
    pub fn set_length(&mut self, length: f64) -> Result<()> {
        validate_length(length)?;
        self.length = length;
        Ok(())
    }

    /// Anchor on A.
    #[must_use]
    pub fn anchor_a(&self) -> Vector2<f64> {
        self.anchor_a
    }

    /// Move the anchor on A.
    pub fn set_anchor_a(&mut self, anchor: Vector2<f64>) {
        self.anchor_a = anchor;
    }

    /// Anchor on B.
    #[must_use]
    pub fn anchor_b(&self) -> Vector2<f64> {
        self.anchor_b
    }

    /// Move the anchor on B.
    pub fn set_anchor_b(&mut self, anchor: Vector2<f64>) {
        self.anchor_b = anchor;
    }

    /// Largest force the joint can exert.
    #[must_use]
    pub fn max_force(&self) -> f64 {
        self.max_force
    }

    /// Change the force limit.
    pub fn set_max_force(&mut self, max_force: f64) -> Result<()> {
        validate_max_force(max_force)?;
        self.max_force = max_force;
        Ok(())
    }

    /// Whether spring mode is on.
    #[must_use]
    pub fn spring(&self) -> bool {
        self.spring
    }

    /// Toggle spring mode.
    pub fn set_spring(&mut self, spring: bool) {
        self.spring = spring;
    }

    /// Spring frequency.
    #[must_use]
    pub fn hertz(&self) -> f64 {
        self.hertz
    }

    /// Change the spring frequency.
    pub fn set_hertz(&mut self, hertz: f64) {
        if self.spring && hertz <= 0.0 {
            warn!(hertz, "spring distance constraint with non-positive frequency");
        }
        self.hertz = hertz;
    }

    /// Spring damping ratio.
    #[must_use]
    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Change the spring damping ratio.
    pub fn set_damping(&mut self, damping: f64) {
        self.damping = damping;
    }

    /// Accumulated impulse from the last solve.
    #[must_use]
    pub fn impulse(&self) -> f64 {
        self.impulse
    }

    /// Current anchor distance for the given bodies.
    #[must_use]
    pub fn current_length(&self, a: Option<&RigidBody>, b: Option<&RigidBody>) -> f64 {
        let (_, pa) = world_anchor(a, self.anchor_a);
        let (_, pb) = world_anchor(b, self.anchor_b);
        (pb - pa).norm()
    }

    pub(crate) fn presolve(&mut self, bodies: &BodyPair<'_>, settings: &SpaceSettings, dt: f64, inv_dt: f64) {
        let (ra, pa) = world_anchor(bodies.a(), self.anchor_a);
        let (rb, pb) = world_anchor(bodies.b(), self.anchor_b);
        self.ra = ra;
        self.rb = rb;

        let delta = pb - pa;
        self.normal = normalize_or_zero(delta);
        let offset = delta.norm() - self.length;

        self.mass = inverse_or_zero(bodies.mass_k(self.normal, ra, rb));
        self.max_impulse = self.max_force * dt;

        if self.spring {
            let zeta = self.damping;
            let omega = 2.0 * std::f64::consts::PI * self.hertz;
            let a1 = 2.0 * zeta + omega * dt;
            let a2 = dt * omega * a1;
            let a3 = 1.0 / (1.0 + a2);
            self.bias_rate = if a1 > 0.0 { omega / a1 } else { 0.0 };
            self.mass_coeff = a2 * a3;
            self.impulse_coeff = a3;
            self.bias = offset * self.bias_rate;
        } else {
            self.bias_rate = 1.0;
            self.mass_coeff = 1.0;
            self.impulse_coeff = 0.0;
            self.bias = settings.baumgarte * inv_dt * offset;
        }
    }

    pub(crate) fn warmstart(&mut self, bodies: &mut BodyPair<'_>, settings: &SpaceSettings) {
        if settings.warmstarting {
            bodies.apply_impulse(self.normal * self.impulse, self.ra, self.rb);
        } else {
            self.impulse = 0.0;
        }
    }

    pub(crate) fn solve(&mut self, bodies: &mut BodyPair<'_>) {
        let vn = bodies.relative_velocity(self.ra, self.rb).dot(&self.normal);

        let lambda = -self.mass_coeff * self.mass * (vn + self.bias) - self.impulse_coeff * self.impulse;

        let previous = self.impulse;
        self.impulse = (previous + lambda).clamp(-self.max_impulse, self.max_impulse);
        let applied = self.impulse - previous;

        bodies.apply_impulse(self.normal * applied, self.ra, self.rb);
    }
}

fn validate_length(length: f64) -> Result<()> {
    if length.is_nan() || length < 0.0 {
        return Err(PhysicsError::invalid_parameter(
            "length",
            format!("distance constraint length can't be negative, got {length}"),
        ));
    }
    Ok(())
}

fn validate_max_force(max_force: f64) -> Result<()> {
    if max_force.is_nan() || max_force < 0.0 {
        return Err(PhysicsError::invalid_parameter(
            "max_force",
            format!("must be non-negative, got {max_force}"),
        ));
    }
    Ok(())
}
