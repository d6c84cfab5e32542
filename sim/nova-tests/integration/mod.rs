//! Integration tests for the nova-* crates.
//!
//! These tests drive the full pipeline through a `Space`:
//! - narrow-phase symmetry across shape orders
//! - agreement between broad-phase algorithms
//! - resting contact, energy and warm starting
//! - joints under load
//! - ray casts and AABB queries
//! - sleeping and waking
//! - contact listener events and deferred removal

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::cast_precision_loss
)]

pub mod common;

mod broadphase_equivalence;
mod collision_symmetry;
mod joints;
mod listener_events;
mod raycast;
mod resting_contact;
mod sleeping;
