//! Narrow phase, persistent contacts and the contact solver.
//!
//! # Pipeline
//!
//! | Stage | Entry point | Output |
//! |-------|-------------|--------|
//! | Narrow phase | [`collide_shapes`] | [`Collision`] with up to two points |
//! | Persistence | [`ContactManager`] | [`PersistentContactPair`]s and [`ContactEvent`]s |
//! | Solver | [`presolve`], [`warmstart`], [`solve_velocity`], [`solve_position`] | body impulses |
//!
//! Contact points carry a [`FeatureId`] built from the edges and vertices
//! that produced them, so accumulated impulses follow a point across frames
//! even as the manifold changes.
//!
//! # Example
//!
//! ```
//! use nalgebra::Vector2;
//! use nova_contact::collide_shapes;
//! use nova_shape::Shape;
//! use nova_types::Transform;
//!
//! let mut a = Shape::circle(Vector2::zeros(), 1.0).unwrap();
//! let mut b = Shape::circle(Vector2::zeros(), 1.0).unwrap();
//! a.transform(&Transform::identity());
//! b.transform(&Transform::new(Vector2::new(1.5, 0.0), 0.0));
//!
//! let collision = collide_shapes(&a, &b);
//! assert!(collision.collision);
//! assert!((collision.depth - 0.5).abs() < 1e-12);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::cast_precision_loss,
    clippy::neg_cmp_op_on_partial_ord
)]

mod collision;
mod contact;
mod manager;
mod solver;

pub use collision::{
    collide_circle_x_circle, collide_polygon_x_circle, collide_polygon_x_polygon,
    collide_shapes, Collision, ContactPoint, FeatureId,
};
pub use contact::{
    Contact, ContactPairIds, ContactSolverInfo, ContactState, PersistentContactPair,
};
pub use manager::{ContactEvent, ContactEventKind, ContactManager};
pub use solver::{presolve, solve_position, solve_velocity, warmstart};
