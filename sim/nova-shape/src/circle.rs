//! Circle shape.

use nalgebra::Vector2;
use nova_types::Transform;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A circle with a local center offset.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Circle {
    /// Center relative to the body origin.
    pub center: Vector2<f64>,
    /// Radius.
    pub radius: f64,
    /// Cached world-space center.
    pub(crate) xcenter: Vector2<f64>,
}

impl Circle {
    pub(crate) fn new(center: Vector2<f64>, radius: f64) -> Self {
        Self {
            center,
            radius,
            xcenter: center,
        }
    }

    /// World-space center as of the last transform.
    #[must_use]
    pub fn world_center(&self) -> Vector2<f64> {
        self.xcenter
    }

    /// Area `π r²`.
    #[must_use]
    pub fn area(&self) -> f64 {
        std::f64::consts::PI * self.radius * self.radius
    }

    /// Moment of inertia about the circle's own center.
    #[must_use]
    pub fn inertia(&self, mass: f64) -> f64 {
        0.5 * mass * self.radius * self.radius
    }

    pub(crate) fn transform(&mut self, xform: &Transform) {
        self.xcenter = xform.apply(self.center);
    }

    /// Interval covered by the circle when projected onto `axis`.
    #[must_use]
    pub fn project(&self, axis: Vector2<f64>) -> (f64, f64) {
        let c = self.xcenter.dot(&axis);
        (c - self.radius, c + self.radius)
    }
}
