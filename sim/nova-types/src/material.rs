//! Surface materials and coefficient mixing.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::{COR_CARDBOARD, COR_GLASS, COR_STEEL, COR_WOOD};
use crate::constants::{DENSITY_CARDBOARD, DENSITY_GLASS, DENSITY_STEEL, DENSITY_WOOD};
use crate::error::PhysicsError;
use crate::Result;

/// Density, restitution and friction of a body.
///
/// Restitution is conceptually in `[0, 1]` but is not clamped; values above
/// one inject energy on impact.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Material {
    /// Mass per unit area.
    pub density: f64,
    /// Coefficient of restitution.
    pub restitution: f64,
    /// Coefficient of friction.
    pub friction: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self::BASIC
    }
}

impl Material {
    /// Unit density with moderate friction and no bounce.
    pub const BASIC: Self = Self {
        density: 1.0,
        restitution: 0.1,
        friction: 0.4,
    };

    /// Steel.
    pub const STEEL: Self = Self {
        density: DENSITY_STEEL,
        restitution: COR_STEEL,
        friction: 0.35,
    };

    /// Wood.
    pub const WOOD: Self = Self {
        density: DENSITY_WOOD,
        restitution: COR_WOOD,
        friction: 0.5,
    };

    /// Glass.
    pub const GLASS: Self = Self {
        density: DENSITY_GLASS,
        restitution: COR_GLASS,
        friction: 0.2,
    };

    /// Ice.
    pub const ICE: Self = Self {
        density: 0.92,
        restitution: 0.05,
        friction: 0.02,
    };

    /// Cardboard.
    pub const CARDBOARD: Self = Self {
        density: DENSITY_CARDBOARD,
        restitution: COR_CARDBOARD,
        friction: 0.55,
    };

    /// Create a material.
    #[must_use]
    pub const fn new(density: f64, restitution: f64, friction: f64) -> Self {
        Self {
            density,
            restitution,
            friction,
        }
    }

    /// Set density.
    #[must_use]
    pub const fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    /// Set restitution.
    #[must_use]
    pub const fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set friction.
    #[must_use]
    pub const fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    /// Reject NaN, negative density and negative friction.
    pub fn validate(&self) -> Result<()> {
        if !self.density.is_finite() || self.density < 0.0 {
            return Err(PhysicsError::invalid_parameter(
                "density",
                format!("must be finite and non-negative, got {}", self.density),
            ));
        }
        if !self.friction.is_finite() || self.friction < 0.0 {
            return Err(PhysicsError::invalid_parameter(
                "friction",
                format!("must be finite and non-negative, got {}", self.friction),
            ));
        }
        if !self.restitution.is_finite() {
            return Err(PhysicsError::invalid_parameter(
                "restitution",
                "must be finite",
            ));
        }
        Ok(())
    }
}

/// Rule for combining a per-body coefficient into a per-contact one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoefficientMix {
    /// `(a + b) / 2`
    Average,
    /// `a * b`
    Multiply,
    /// `sqrt(a * b)`
    #[default]
    Sqrt,
    /// `min(a, b)`
    Min,
    /// `max(a, b)`
    Max,
}

impl CoefficientMix {
    /// Combine two coefficients.
    #[must_use]
    pub fn mix(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Average => (a + b) * 0.5,
            Self::Multiply => a * b,
            Self::Sqrt => (a * b).sqrt(),
            Self::Min => a.min(b),
            Self::Max => a.max(b),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mix_rules() {
        assert_relative_eq!(CoefficientMix::Average.mix(0.2, 0.4), 0.3);
        assert_relative_eq!(CoefficientMix::Multiply.mix(0.5, 0.4), 0.2);
        assert_relative_eq!(CoefficientMix::Sqrt.mix(0.25, 1.0), 0.5);
        assert_eq!(CoefficientMix::Min.mix(0.25, 1.0), 0.25);
        assert_eq!(CoefficientMix::Max.mix(0.25, 1.0), 1.0);
    }

    #[test]
    fn test_mix_is_symmetric() {
        for rule in [
            CoefficientMix::Average,
            CoefficientMix::Multiply,
            CoefficientMix::Sqrt,
            CoefficientMix::Min,
            CoefficientMix::Max,
        ] {
            assert_relative_eq!(rule.mix(0.3, 0.9), rule.mix(0.9, 0.3));
        }
    }

    #[test]
    fn test_material_validation() {
        assert!(Material::default().validate().is_ok());
        assert!(Material::STEEL.validate().is_ok());
        assert!(Material::new(-1.0, 0.0, 0.0).validate().is_err());
        assert!(Material::new(1.0, 0.0, -0.1).validate().is_err());
        assert!(Material::new(1.0, f64::NAN, 0.1).validate().is_err());
    }

    #[test]
    fn test_material_builders() {
        let m = Material::BASIC.with_density(2.0).with_friction(0.0);
        assert_eq!(m.density, 2.0);
        assert_eq!(m.friction, 0.0);
        assert_eq!(m.restitution, Material::BASIC.restitution);
    }
}
