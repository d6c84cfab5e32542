//! Broad-phase collision detection for the Nova 2D physics engine.
//!
//! The broad phase reduces the all-pairs problem to a small set of candidate
//! body pairs whose AABBs overlap. It works on [`BroadPhaseProxy`] values,
//! a flat per-body summary built by the space each step, and returns
//! [`BroadPhasePair`]s indexing into that slice.
//!
//! # Strategies
//!
//! | Strategy | Cost | Notes |
//! |----------|------|-------|
//! | [`BruteForce`] | O(n²) | Reference implementation |
//! | [`SpatialHashGrid`] | ~O(n) | Default; optional rayon slabs |
//! | [`Bvh`] | O(n log n) | Rebuilt every step |
//!
//! All strategies apply the same [`early_out`] rules and the same strict
//! AABB overlap test, so for a given input they return the same pair set.
//!
//! # Example
//!
//! ```
//! use nova_broadphase::{BroadPhaseDetector, BroadPhaseProxy};
//! use nova_types::{Aabb, BodyId};
//! use nalgebra::Vector2;
//!
//! let proxies = [
//!     BroadPhaseProxy::new(BodyId(1), Aabb::from_center(Vector2::new(5.0, 5.0), Vector2::new(1.0, 1.0))),
//!     BroadPhaseProxy::new(BodyId(2), Aabb::from_center(Vector2::new(6.5, 5.0), Vector2::new(1.0, 1.0))),
//! ];
//!
//! let mut detector = BroadPhaseDetector::default();
//! let pairs = detector.find_candidate_pairs(&proxies, false);
//! assert_eq!(pairs.len(), 1);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::neg_cmp_op_on_partial_ord
)]

mod brute_force;
mod bvh;
mod detector;
mod proxy;
mod shg;

pub use brute_force::BruteForce;
pub use bvh::{Bvh, BvhConfig};
pub use detector::{BroadPhase, BroadPhaseAlgorithm, BroadPhaseConfig, BroadPhaseDetector};
pub use proxy::{early_out, is_candidate, BroadPhasePair, BroadPhaseProxy};
pub use shg::{ShgConfig, SpatialHashGrid};

/// Result type for broad-phase construction.
pub use nova_types::Result;
