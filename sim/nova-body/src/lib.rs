//! Rigid bodies for the Nova 2D physics engine.
//!
//! A [`RigidBody`] owns a list of [`Shape`](nova_shape::Shape)s and derives
//! its mass, inertia and center of mass from them. It carries velocities,
//! force accumulators, a material, collision filter and sleep state.
//!
//! # Pose
//!
//! - `origin` is the point shapes are defined against
//! - `position` is the world center of mass, `origin + rotate(com, angle)`
//!
//! Forces and impulses act about the center of mass.
//!
//! # Integration
//!
//! Integration is semi-implicit Euler, split in two halves so the solver can
//! run in between:
//!
//! 1. [`RigidBody::integrate_accelerations`] - forces and gravity into
//!    velocity, then exponential damping
//! 2. [`RigidBody::integrate_velocities`] - velocity into pose, clear forces
//!
//! # Example
//!
//! ```
//! use nova_body::{RigidBody, RigidBodyInit};
//! use nova_shape::Shape;
//! use nalgebra::Vector2;
//!
//! let mut body = RigidBody::with_shape(
//!     RigidBodyInit::dynamic(Vector2::new(0.0, 10.0)),
//!     Shape::circle(Vector2::zeros(), 0.5).unwrap(),
//! )
//! .unwrap();
//!
//! body.integrate_accelerations(Vector2::new(0.0, -9.81), 0.0, 0.0, 1.0 / 60.0);
//! body.integrate_velocities(1.0 / 60.0);
//! assert!(body.position().y < 10.0);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::missing_errors_doc,
    clippy::neg_cmp_op_on_partial_ord
)]

mod body;
mod init;
mod slice;

pub use body::RigidBody;
pub use init::{RigidBodyInit, RigidBodyType};
pub use slice::pair_mut;

/// Result type for body construction and mutation.
pub use nova_types::Result;
