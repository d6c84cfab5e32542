//! Body initializers.

use nalgebra::Vector2;
use nova_types::{CollisionFilter, Material};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Whether a body is simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RigidBodyType {
    /// Infinite mass, never moves.
    Static,
    /// Finite mass, fully simulated.
    #[default]
    Dynamic,
}

/// Everything needed to create a [`RigidBody`](crate::RigidBody).
///
/// The shape list always starts empty; shapes are added afterwards.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBodyInit {
    /// Static or dynamic.
    pub body_type: RigidBodyType,
    /// Body origin in world space.
    pub origin: Vector2<f64>,
    /// Rotation in radians.
    pub angle: f64,
    /// Initial linear velocity.
    pub linear_velocity: Vector2<f64>,
    /// Initial angular velocity.
    pub angular_velocity: f64,
    /// Surface material.
    pub material: Material,
    /// Multiplier on the space's gravity.
    pub gravity_scale: f64,
    /// Multiplier on the global linear damping.
    pub linear_damping_scale: f64,
    /// Multiplier on the global angular damping.
    pub angular_damping_scale: f64,
    /// Collision filter.
    pub filter: CollisionFilter,
    /// Whether the body takes part in collision detection at all.
    pub collision_enabled: bool,
    /// Opaque value for the caller.
    pub user_data: u64,
}

impl Default for RigidBodyInit {
    fn default() -> Self {
        Self {
            body_type: RigidBodyType::Dynamic,
            origin: Vector2::zeros(),
            angle: 0.0,
            linear_velocity: Vector2::zeros(),
            angular_velocity: 0.0,
            material: Material::BASIC,
            gravity_scale: 1.0,
            linear_damping_scale: 1.0,
            angular_damping_scale: 1.0,
            filter: CollisionFilter::default(),
            collision_enabled: true,
            user_data: 0,
        }
    }
}

impl RigidBodyInit {
    /// A dynamic body at `origin`.
    #[must_use]
    pub fn dynamic(origin: Vector2<f64>) -> Self {
        Self {
            origin,
            ..Default::default()
        }
    }

    /// A static body at `origin`.
    #[must_use]
    pub fn fixed(origin: Vector2<f64>) -> Self {
        Self {
            body_type: RigidBodyType::Static,
            origin,
            ..Default::default()
        }
    }

    /// Set the rotation.
    #[must_use]
    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    /// Set the initial velocities.
    #[must_use]
    pub fn with_velocity(mut self, linear: Vector2<f64>, angular: f64) -> Self {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
        self
    }

    /// Set the material.
    #[must_use]
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Set the gravity scale.
    #[must_use]
    pub fn with_gravity_scale(mut self, scale: f64) -> Self {
        self.gravity_scale = scale;
        self
    }

    /// Set both damping scales.
    #[must_use]
    pub fn with_damping_scales(mut self, linear: f64, angular: f64) -> Self {
        self.linear_damping_scale = linear;
        self.angular_damping_scale = angular;
        self
    }

    /// Set the collision filter.
    #[must_use]
    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set user data.
    #[must_use]
    pub fn with_user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }
}
