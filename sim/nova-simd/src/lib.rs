//! Batched integration kernels for Nova Physics.
//!
//! The integrators in the space touch every awake body twice per substep.
//! This crate provides a Structure-of-Arrays path for those loops: bodies are
//! gathered four at a time into [`Vec2x4`] lanes, processed with straight-line
//! per-lane arithmetic the compiler can vectorize, and written back.
//!
//! # Layout
//!
//! | Type / function | Purpose |
//! |-----------------|---------|
//! | [`Vec2x4`] | Four 2D vectors as separate x/y lanes |
//! | [`batch_integrate_accelerations`] | Forces, gravity, damping into velocities |
//! | [`batch_integrate_velocities`] | Velocities into poses |
//!
//! Both batch passes agree with the scalar per-body integrators, which also
//! handle the tail that does not fill a full batch.
//!
//! # Example
//!
//! ```
//! use nalgebra::Vector2;
//! use nova_simd::Vec2x4;
//!
//! let a = Vec2x4::splat(Vector2::new(1.0, 2.0));
//! let b = a.scale(2.0);
//! assert_eq!(b.get(3), Vector2::new(2.0, 4.0));
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic, missing_docs)]
#![allow(
    clippy::needless_range_loop,
    clippy::suboptimal_flops,
    clippy::missing_const_for_fn
)]

mod batch_ops;
mod vec2x4;

pub use batch_ops::{batch_integrate_accelerations, batch_integrate_velocities};
pub use vec2x4::{mul_add_scalar, mul_scalar, Vec2x4};
