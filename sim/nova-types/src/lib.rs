//! Core types for the Nova 2D physics engine.
//!
//! This crate provides the foundational data shared by every other crate in
//! the workspace:
//!
//! - [`math`] - 2D vector products, rotations, [`Transform`], effective mass
//! - [`Aabb`] - Axis-aligned bounding boxes
//! - [`BodyId`], [`ShapeId`], [`ConstraintId`] - Identifiers
//! - [`Material`], [`CoefficientMix`] - Surface properties and mixing rules
//! - [`CollisionFilter`] - Group/category/mask pair filtering
//! - [`SpaceSettings`] - Gravity, solver iterations, damping, sleeping
//! - [`PhysicsError`] - Construction and validation errors
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: up
//! - Angles are counter-clockwise radians
//!
//! Vectors are [`nalgebra::Vector2<f64>`] throughout.
//!
//! # Example
//!
//! ```
//! use nova_types::{math, Aabb, SpaceSettings};
//! use nalgebra::Vector2;
//!
//! let a = Aabb::from_center(Vector2::new(0.0, 0.0), Vector2::new(1.0, 1.0));
//! let b = Aabb::from_center(Vector2::new(1.5, 0.0), Vector2::new(1.0, 1.0));
//! assert!(a.overlaps(&b));
//!
//! let v = math::rotate(Vector2::new(1.0, 0.0), std::f64::consts::FRAC_PI_2);
//! assert!((v.y - 1.0).abs() < 1e-12);
//!
//! assert!(SpaceSettings::default().validate().is_ok());
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::cast_precision_loss,       // usize to f64 is fine for counts
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod aabb;
pub mod constants;
mod error;
mod filter;
mod ids;
mod material;
pub mod math;
mod settings;

pub use aabb::{Aabb, Axis};
pub use error::PhysicsError;
pub use filter::CollisionFilter;
pub use ids::{pair_key, BodyId, ConstraintId, ShapeId};
pub use material::{CoefficientMix, Material};
pub use math::Transform;
pub use settings::{ContactPositionCorrection, SpaceSettings};

// Re-export math types for convenience
pub use nalgebra::Vector2;

/// Result type for physics operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;
