//! Joints for the Nova 2D physics engine.
//!
//! # Joint Kinds
//!
//! | Kind | Holds | Solver |
//! |------|-------|--------|
//! | [`DistanceConstraint`] | anchor separation | accumulated impulse, rigid or soft |
//! | [`HingeConstraint`] | shared pivot, optional angle limits | 2x2 point block plus one-sided limits |
//! | [`SpringConstraint`] | Hooke force with damping | direct impulse, no accumulation |
//! | [`SplineConstraint`] | anchor on a Catmull-Rom path | point constraint to the closest path point |
//!
//! Every joint goes through the same contract each step: `presolve`, then
//! `warmstart`, then `solve` once per constraint iteration. Either endpoint
//! may be absent, in which case that side is an immovable world anchor.
//!
//! # Example
//!
//! ```
//! use nalgebra::Vector2;
//! use nova_body::{RigidBody, RigidBodyInit};
//! use nova_constraint::{BodyPair, Constraint, DistanceConstraintInit};
//! use nova_shape::Shape;
//! use nova_types::SpaceSettings;
//!
//! let circle = || Shape::circle(Vector2::zeros(), 0.5).unwrap();
//! let mut a = RigidBody::with_shape(RigidBodyInit::dynamic(Vector2::zeros()), circle()).unwrap();
//! let mut b = RigidBody::with_shape(RigidBodyInit::dynamic(Vector2::new(3.0, 0.0)), circle()).unwrap();
//!
//! let mut joint = Constraint::distance(Some(&a), Some(&b), DistanceConstraintInit::new(2.0)).unwrap();
//!
//! let settings = SpaceSettings::default();
//! let mut bodies = BodyPair::new(Some(&mut a), Some(&mut b));
//! joint.presolve(&mut bodies, &settings, 1.0 / 60.0, 60.0);
//! joint.warmstart(&mut bodies, &settings);
//! joint.solve(&mut bodies, &settings, 60.0);
//! assert!(b.linear_velocity().x < 0.0);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::neg_cmp_op_on_partial_ord
)]

mod bodies;
mod constraint;
mod distance;
mod hinge;
mod spline;
mod spring;

pub use bodies::BodyPair;
pub use constraint::{Constraint, ConstraintKind};
pub use distance::{DistanceConstraint, DistanceConstraintInit};
pub use hinge::{HingeConstraint, HingeConstraintInit};
pub use spline::{
    catmull_rom, spline_closest_point, SplineConstraint, SplineConstraintInit,
    SPLINE_MIN_CONTROL_POINTS,
};
pub use spring::{SpringConstraint, SpringConstraintInit};

/// Result type for joint construction and setters.
pub use nova_types::Result;
