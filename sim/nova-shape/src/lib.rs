//! Collision shapes for the Nova 2D physics engine.
//!
//! A [`Shape`] is either a [`Circle`] or a convex [`Polygon`]. Shapes are
//! defined relative to their owning body's origin and cache their
//! world-space geometry, which the body refreshes whenever its pose changes.
//!
//! # Mass
//!
//! [`Shape::compute_mass`] returns the mass, the moment of inertia about the
//! shape's own centroid, and that centroid. Bodies combine several shapes
//! with the parallel axis theorem.
//!
//! # Example
//!
//! ```
//! use nova_shape::Shape;
//! use nalgebra::Vector2;
//!
//! let boxy = Shape::rect(2.0, 1.0, Vector2::zeros()).unwrap();
//! let mass = boxy.compute_mass(1.0);
//! assert!((mass.mass - 2.0).abs() < 1e-12);
//!
//! // Polygons need between 3 and POLYGON_MAX_VERTICES vertices
//! assert!(Shape::ngon(2, 1.0, Vector2::zeros()).is_err());
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::len_without_is_empty
)]

mod circle;
mod polygon;
mod raycast;
mod shape;

pub use circle::Circle;
pub use polygon::{centroid, convex_hull, signed_area, Polygon, VertexList};
pub use raycast::ShapeRayHit;
pub use shape::{MassInfo, Shape, ShapeKind};
