//! The Nova 2D physics engine.
//!
//! This crate ties the lower layers together into a [`Space`]: it owns the
//! bodies, joints and persistent contacts of one simulation and advances them
//! with [`Space::step`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Space                              │
//! │  Owns: bodies, constraints, contacts, broad phase, settings │
//! │  Step: integrate → pairs → contacts → solve → integrate     │
//! └──────┬──────────────┬───────────────┬──────────────┬────────┘
//!        │              │               │              │
//!        ▼              ▼               ▼              ▼
//!  nova-broadphase  nova-contact  nova-constraint  nova-simd
//!        │              │               │              │
//!        └──────────────┴───────┬───────┴──────────────┘
//!                               ▼
//!               nova-body → nova-shape → nova-types
//! ```
//!
//! # Quick Start
//!
//! ```
//! use nalgebra::Vector2;
//! use nova_core::{RigidBody, RigidBodyInit, Shape, Space};
//!
//! let mut space = Space::new();
//!
//! let ground = RigidBody::with_shape(
//!     RigidBodyInit::fixed(Vector2::new(0.0, -1.0)),
//!     Shape::rect(20.0, 2.0, Vector2::zeros()).unwrap(),
//! )
//! .unwrap();
//! space.add_body(ground).unwrap();
//!
//! let ball = RigidBody::with_shape(
//!     RigidBodyInit::dynamic(Vector2::new(0.0, 5.0)),
//!     Shape::circle(Vector2::zeros(), 0.5).unwrap(),
//! )
//! .unwrap();
//! let ball = space.add_body(ball).unwrap();
//!
//! for _ in 0..300 {
//!     space.step(1.0 / 60.0);
//! }
//! let y = space.body(ball).unwrap().position().y;
//! assert!((y - 0.5).abs() < 0.1);
//! ```
//!
//! # Events
//!
//! Register a [`ContactListener`] to observe contacts as they are added,
//! persisted and removed. Listeners cannot mutate the space directly; they
//! push bodies onto a [`RemovalQueue`], which is applied once the step ends.
//!
//! # Queries
//!
//! | Query | Returns |
//! |-------|---------|
//! | [`Space::cast_ray`] | up to `capacity` [`RayHit`]s, nearest first |
//! | [`Space::query_aabb`] | ids of bodies whose bounds overlap a box |
//! | [`Space::next_body`] / [`Space::next_constraint`] | cursor iteration |
//! | [`Space::stats`] | per-phase [`StepStats`] of the last step |

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc
)]

mod listener;
mod query;
mod space;
mod step;

pub use listener::{ContactListener, RemovalQueue};
pub use query::RayHit;
pub use space::Space;
pub use step::StepStats;

// Re-export the types a caller needs to build a scene
pub use nova_body::{RigidBody, RigidBodyInit, RigidBodyType};
pub use nova_broadphase::{BroadPhaseAlgorithm, BroadPhaseConfig, BvhConfig, ShgConfig};
pub use nova_constraint::{
    Constraint, ConstraintKind, DistanceConstraintInit, HingeConstraintInit, SplineConstraintInit,
    SpringConstraintInit,
};
pub use nova_contact::{ContactEvent, ContactEventKind};
pub use nova_shape::Shape;
pub use nova_types::{
    Aabb, BodyId, CoefficientMix, CollisionFilter, ConstraintId, ContactPositionCorrection,
    Material, PhysicsError, Result, ShapeId, SpaceSettings,
};
