//! Global simulation settings.
//!
//! [`SpaceSettings`] bundles every knob the step pipeline reads: gravity,
//! solver iteration counts, position correction, damping, coefficient mixing,
//! sleeping thresholds and the kill bounds.

use nalgebra::Vector2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;
use crate::constants::{CORRECTION_SLOP, GRAV_EARTH};
use crate::error::PhysicsError;
use crate::material::CoefficientMix;
use crate::Result;

/// How penetration is removed from contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ContactPositionCorrection {
    /// Feed the penetration back into the velocity solve as a bias.
    #[default]
    Baumgarte,
    /// Non-linear Gauss-Seidel: correct positions directly after velocity
    /// integration, leaving velocities untouched.
    Ngs,
}

/// Settings read by every simulation step.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpaceSettings {
    /// Gravitational acceleration (Y up).
    pub gravity: Vector2<f64>,
    /// Fraction of the position error corrected per step.
    pub baumgarte: f64,
    /// Penetration allowed before correction starts.
    pub penetration_slop: f64,
    /// Contact position correction scheme.
    pub contact_position_correction: ContactPositionCorrection,
    /// Contact velocity iterations.
    pub velocity_iterations: usize,
    /// NGS position iterations (ignored with Baumgarte correction).
    pub position_iterations: usize,
    /// Joint constraint iterations.
    pub constraint_iterations: usize,
    /// Number of sub-steps each call to `step` is divided into.
    pub substeps: usize,
    /// Global linear damping exponent.
    pub linear_damping: f64,
    /// Global angular damping exponent.
    pub angular_damping: f64,
    /// Reapply last step's accumulated impulses before iterating.
    pub warmstarting: bool,
    /// Restitution mixing rule.
    pub restitution_mix: CoefficientMix,
    /// Friction mixing rule.
    pub friction_mix: CoefficientMix,
    /// Put low-energy bodies to sleep.
    pub sleeping: bool,
    /// Motion energy below which a body accumulates sleep time.
    pub sleep_energy_threshold: f64,
    /// Motion energy of a neighbour above which a sleeping body wakes.
    pub wake_energy_threshold: f64,
    /// Frames a body must stay below the sleep threshold before sleeping.
    pub sleep_timer_threshold: u32,
    /// Frames a separated contact pair is kept for warm starting.
    pub collision_persistence: u32,
    /// Approach speed above which restitution is applied.
    pub restitution_velocity_threshold: f64,
    /// Largest position correction one NGS iteration may apply.
    pub max_linear_correction: f64,
    /// Bodies whose position leaves this box are removed.
    pub kill_bounds: Option<Aabb>,
}

impl Default for SpaceSettings {
    fn default() -> Self {
        let sleep_energy_threshold = 0.02;
        Self {
            gravity: Vector2::new(0.0, -GRAV_EARTH),
            baumgarte: 0.2,
            penetration_slop: CORRECTION_SLOP,
            contact_position_correction: ContactPositionCorrection::Baumgarte,
            velocity_iterations: 8,
            position_iterations: 4,
            constraint_iterations: 5,
            substeps: 1,
            linear_damping: 0.0005,
            angular_damping: 0.0005,
            warmstarting: true,
            restitution_mix: CoefficientMix::Sqrt,
            friction_mix: CoefficientMix::Sqrt,
            sleeping: false,
            sleep_energy_threshold,
            wake_energy_threshold: sleep_energy_threshold / 1.3,
            sleep_timer_threshold: 60,
            collision_persistence: 1,
            restitution_velocity_threshold: 1.0,
            max_linear_correction: 0.2,
            kill_bounds: Some(Aabb::from_bounds(-1e4, -1e4, 1e4, 1e4)),
        }
    }
}

impl SpaceSettings {
    /// Settings for interactive use: few iterations, sleeping on.
    #[must_use]
    pub fn realtime() -> Self {
        Self {
            velocity_iterations: 6,
            position_iterations: 2,
            constraint_iterations: 4,
            sleeping: true,
            ..Default::default()
        }
    }

    /// Settings favouring stability: NGS correction, more iterations and
    /// two sub-steps.
    #[must_use]
    pub fn high_accuracy() -> Self {
        Self {
            contact_position_correction: ContactPositionCorrection::Ngs,
            velocity_iterations: 20,
            position_iterations: 10,
            constraint_iterations: 15,
            substeps: 2,
            ..Default::default()
        }
    }

    /// Cheapest usable settings.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            velocity_iterations: 4,
            position_iterations: 1,
            constraint_iterations: 2,
            warmstarting: true,
            sleeping: true,
            ..Default::default()
        }
    }

    /// Set gravity.
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vector2<f64>) -> Self {
        self.gravity = gravity;
        self
    }

    /// Disable gravity.
    #[must_use]
    pub fn zero_gravity(mut self) -> Self {
        self.gravity = Vector2::zeros();
        self
    }

    /// Set the contact position correction scheme.
    #[must_use]
    pub fn with_position_correction(mut self, correction: ContactPositionCorrection) -> Self {
        self.contact_position_correction = correction;
        self
    }

    /// Set contact velocity, position and joint iterations at once.
    #[must_use]
    pub fn with_iterations(mut self, velocity: usize, position: usize, constraint: usize) -> Self {
        self.velocity_iterations = velocity;
        self.position_iterations = position;
        self.constraint_iterations = constraint;
        self
    }

    /// Set the number of sub-steps.
    #[must_use]
    pub fn with_substeps(mut self, substeps: usize) -> Self {
        self.substeps = substeps;
        self
    }

    /// Enable or disable sleeping.
    #[must_use]
    pub fn with_sleeping(mut self, sleeping: bool) -> Self {
        self.sleeping = sleeping;
        self
    }

    /// Enable or disable warm starting.
    #[must_use]
    pub fn with_warmstarting(mut self, warmstarting: bool) -> Self {
        self.warmstarting = warmstarting;
        self
    }

    /// Set or clear the kill bounds.
    #[must_use]
    pub fn with_kill_bounds(mut self, bounds: Option<Aabb>) -> Self {
        self.kill_bounds = bounds;
        self
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        if !self.gravity.x.is_finite() || !self.gravity.y.is_finite() {
            return Err(PhysicsError::invalid_parameter("gravity", "must be finite"));
        }
        if !(0.0..=1.0).contains(&self.baumgarte) {
            return Err(PhysicsError::invalid_parameter(
                "baumgarte",
                format!("must be in [0, 1], got {}", self.baumgarte),
            ));
        }
        if !self.penetration_slop.is_finite() || self.penetration_slop < 0.0 {
            return Err(PhysicsError::invalid_parameter(
                "penetration_slop",
                "must be finite and non-negative",
            ));
        }
        if self.substeps == 0 {
            return Err(PhysicsError::invalid_parameter(
                "substeps",
                "must be at least 1",
            ));
        }
        if self.linear_damping < 0.0 || self.angular_damping < 0.0 {
            return Err(PhysicsError::invalid_parameter(
                "damping",
                "must be non-negative",
            ));
        }
        if self.sleep_energy_threshold < 0.0 || self.wake_energy_threshold < 0.0 {
            return Err(PhysicsError::invalid_parameter(
                "sleep_energy_threshold",
                "energy thresholds must be non-negative",
            ));
        }
        if self.max_linear_correction <= 0.0 {
            return Err(PhysicsError::invalid_parameter(
                "max_linear_correction",
                "must be positive",
            ));
        }
        if let Some(bounds) = &self.kill_bounds {
            if bounds.min.x >= bounds.max.x || bounds.min.y >= bounds.max.y {
                return Err(PhysicsError::invalid_parameter(
                    "kill_bounds",
                    "min corner must be below max corner",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_settings() {
        let s = SpaceSettings::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.gravity.y, -GRAV_EARTH);
        assert_eq!(s.contact_position_correction, ContactPositionCorrection::Baumgarte);
        assert!(s.warmstarting);
        assert!(!s.sleeping);
        assert_relative_eq!(s.wake_energy_threshold, 0.02 / 1.3);
    }

    #[test]
    fn test_presets_validate() {
        assert!(SpaceSettings::realtime().validate().is_ok());
        assert!(SpaceSettings::high_accuracy().validate().is_ok());
        assert!(SpaceSettings::fast().validate().is_ok());
        assert_eq!(
            SpaceSettings::high_accuracy().contact_position_correction,
            ContactPositionCorrection::Ngs
        );
    }

    #[test]
    fn test_invalid_settings() {
        assert!(SpaceSettings::default().with_substeps(0).validate().is_err());

        let mut s = SpaceSettings::default();
        s.baumgarte = 1.5;
        assert!(s.validate().is_err());

        let s = SpaceSettings::default()
            .with_kill_bounds(Some(Aabb::from_bounds(1.0, 1.0, -1.0, 2.0)));
        assert!(s.validate().is_err());

        let s = SpaceSettings::default().with_gravity(Vector2::new(f64::NAN, 0.0));
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_builders() {
        let s = SpaceSettings::default()
            .zero_gravity()
            .with_iterations(10, 3, 7)
            .with_sleeping(true)
            .with_warmstarting(false);
        assert_eq!(s.gravity, Vector2::zeros());
        assert_eq!(s.velocity_iterations, 10);
        assert_eq!(s.position_iterations, 3);
        assert_eq!(s.constraint_iterations, 7);
        assert!(s.sleeping);
        assert!(!s.warmstarting);
    }
}
