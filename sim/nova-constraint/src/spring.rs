//! Damped spring.
//!
//! Unlike the other joints the spring holds no accumulated impulse: presolve
//! applies the Hooke force for the whole step as one impulse, and each solve
//! iteration bleeds off a fraction of the relative velocity along the spring
//! axis.

use nalgebra::Vector2;
use nova_types::{math::normalize_or_zero, PhysicsError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bodies::{inverse_or_zero, world_anchor, BodyPair};

/// Parameters for a [`SpringConstraint`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpringConstraintInit {
    /// Anchor on A, relative to its center of mass (world point if A is absent).
    pub anchor_a: Vector2<f64>,
    /// Anchor on B, relative to its center of mass (world point if B is absent).
    pub anchor_b: Vector2<f64>,
    /// Rest length.
    pub length: f64,
    /// Hooke stiffness.
    pub stiffness: f64,
    /// Velocity damping rate.
    pub damping: f64,
}

impl Default for SpringConstraintInit {
    fn default() -> Self {
        Self {
            anchor_a: Vector2::zeros(),
            anchor_b: Vector2::zeros(),
            length: 1.0,
            stiffness: 10.0,
            damping: 1.0,
        }
    }
}

impl SpringConstraintInit {
    /// Spring with the given rest length, stiffness and damping.
    #[must_use]
    pub fn new(length: f64, stiffness: f64, damping: f64) -> Self {
        Self {
            length,
            stiffness,
            damping,
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
}

/// Damped spring between two bodies (or a body and the world).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpringConstraint {
    anchor_a: Vector2<f64>,
    anchor_b: Vector2<f64>,
    length: f64,
    stiffness: f64,
    damping: f64,

    ra: Vector2<f64>,
    rb: Vector2<f64>,
    normal: Vector2<f64>,
    mass: f64,
    target_velocity: f64,
    damping_bias: f64,
    impulse: f64,
}

impl SpringConstraint {
    /// Create a spring.
    pub fn new(init: SpringConstraintInit) -> Result<Self> {
        validate_non_negative("length", init.length)?;
        validate_non_negative("stiffness", init.stiffness)?;
        validate_non_negative("damping", init.damping)?;
        Ok(Self {
            anchor_a: init.anchor_a,
            anchor_b: init.anchor_b,
            length: init.length,
            stiffness: init.stiffness,
            damping: init.damping,
            ra: Vector2::zeros(),
            rb: Vector2::zeros(),
            normal: Vector2::zeros(),
            mass: 0.0,
            target_velocity: 0.0,
            damping_bias: 0.0,
            impulse: 0.0,
        })
    }

    /// Rest length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Change the rest length.
    pub fn set_length(&mut self, length: f64) -> Result<()> {
        validate_non_negative("length", length)?;
        self.length = length;
        Ok(())
    }

    /// Hooke stiffness.
    #[must_use]
    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    /// Change the stiffness.
    pub fn set_stiffness(&mut self, stiffness: f64) -> Result<()> {
        validate_non_negative("stiffness", stiffness)?;
        self.stiffness = stiffness;
        Ok(())
    }

    /// Damping rate.
    #[must_use]
    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Change the damping rate.
    pub fn set_damping(&mut self, damping: f64) -> Result<()> {
        validate_non_negative("damping", damping)?;
        self.damping = damping;
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

    /// Total impulse applied during the last step.
    #[must_use]
    pub fn impulse(&self) -> f64 {
        self.impulse
    }

    /// Applies the spring force for the step.
    pub(crate) fn presolve(&mut self, bodies: &mut BodyPair<'_>, dt: f64) {
        let (ra, pa) = world_anchor(bodies.a(), self.anchor_a);
        let (rb, pb) = world_anchor(bodies.b(), self.anchor_b);
        self.ra = ra;
        self.rb = rb;

        let delta = pb - pa;
        self.normal = normalize_or_zero(delta);
        let distance = delta.norm();

        let mass_k = bodies.mass_k(self.normal, ra, rb);
        self.mass = inverse_or_zero(mass_k);
        self.target_velocity = 0.0;
        self.damping_bias = 1.0 - (-self.damping * dt * mass_k).exp();

        let force = (self.length - distance) * self.stiffness;
        self.impulse = force * dt;
        bodies.apply_impulse(self.normal * self.impulse, ra, rb);
    }

    pub(crate) fn solve(&mut self, bodies: &mut BodyPair<'_>) {
        let vn = bodies.relative_velocity(self.ra, self.rb).dot(&self.normal);

        let damped = (self.target_velocity - vn) * self.damping_bias;
        self.target_velocity = vn + damped;

        let lambda = damped * self.mass;
        self.impulse += lambda;
        bodies.apply_impulse(self.normal * lambda, self.ra, self.rb);
    }
}

fn validate_non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_nan() || value < 0.0 {
        return Err(PhysicsError::invalid_parameter(
            name,
            format!("must be non-negative, got {value}"),
        ));
    }
    Ok(())
}
