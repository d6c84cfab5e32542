//! Axis-aligned bounding boxes.

use nalgebra::Vector2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    /// X axis.
    X,
    /// Y axis.
    Y,
}

impl Axis {
    /// Component index of this axis.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
        }
    }
}

/// An axis-aligned bounding box.
///
/// Overlap is strict: boxes that only share an edge do not overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vector2<f64>,
    /// Maximum corner.
    pub max: Vector2<f64>,
}

impl Aabb {
    /// Create a new AABB from minimum and maximum corners.
    #[must_use]
    pub const fn new(min: Vector2<f64>, max: Vector2<f64>) -> Self {
        Self { min, max }
    }

    /// Create an AABB from its four bounds.
    #[must_use]
    pub fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min: Vector2::new(min_x, min_y),
            max: Vector2::new(max_x, max_y),
        }
    }

    /// Create an AABB centered at a point with the given half-extents.
    #[must_use]
    pub fn from_center(center: Vector2<f64>, half_extents: Vector2<f64>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest AABB containing every point, or `None` for an empty iterator.
    #[must_use]
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vector2<f64>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Self::new(first, first);
        for p in iter {
            aabb.min = aabb.min.inf(&p);
            aabb.max = aabb.max.sup(&p);
        }
        Some(aabb)
    }

    /// Check if this AABB overlaps with another AABB.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        !(self.max.x <= other.min.x
            || other.max.x <= self.min.x
            || self.max.y <= other.min.y
            || other.max.y <= self.min.y)
    }

    /// Check if a point lies inside or on the boundary.
    #[must_use]
    pub fn contains_point(&self, point: Vector2<f64>) -> bool {
        self.min.x <= point.x
            && point.x <= self.max.x
            && self.min.y <= point.y
            && point.y <= self.max.y
    }

    /// Expand this AABB by a margin on all sides.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vector2::new(margin, margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Smallest AABB containing both boxes.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vector2<f64> {
        (self.min + self.max) * 0.5
    }

    /// Width and height.
    #[must_use]
    pub fn size(&self) -> Vector2<f64> {
        self.max - self.min
    }

    /// Get the extent (size) along a specific axis.
    #[must_use]
    pub fn extent(&self, axis: Axis) -> f64 {
        self.max[axis.index()] - self.min[axis.index()]
    }

    /// Axis with the larger extent (X on ties).
    #[must_use]
    pub fn longest_axis(&self) -> Axis {
        if self.extent(Axis::Y) > self.extent(Axis::X) {
            Axis::Y
        } else {
            Axis::X
        }
    }

    /// Area of the box.
    #[must_use]
    pub fn area(&self) -> f64 {
        let s = self.size();
        s.x * s.y
    }

    /// Parametric entry distance of the segment `from → to` into this box.
    ///
    /// Returns `Some(t)` with `t ∈ [0, 1]` if the segment touches the box.
    #[must_use]
    pub fn segment_entry(&self, from: Vector2<f64>, to: Vector2<f64>) -> Option<f64> {
        let dir = to - from;
        let mut t_min = 0.0_f64;
        let mut t_max = 1.0_f64;

        for i in 0..2 {
            if dir[i].abs() < f64::EPSILON {
                if from[i] < self.min[i] || from[i] > self.max[i] {
                    return None;
                }
            } else {
                let inv = 1.0 / dir[i];
                let mut t1 = (self.min[i] - from[i]) * inv;
                let mut t2 = (self.max[i] - from[i]) * inv;
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                t_min = t_min.max(t1);
                t_max = t_max.min(t2);
                if t_min > t_max {
                    return None;
                }
            }
        }
        Some(t_min)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Vector2::zeros(), Vector2::zeros())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_overlap_is_strict() {
        let a = Aabb::from_bounds(0.0, 0.0, 1.0, 1.0);
        let b = Aabb::from_bounds(0.5, 0.5, 2.0, 2.0);
        let touching = Aabb::from_bounds(1.0, 0.0, 2.0, 1.0);

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&touching));
    }

    #[test]
    fn test_contains_point_inclusive() {
        let a = Aabb::from_bounds(0.0, 0.0, 1.0, 1.0);
        assert!(a.contains_point(Vector2::new(1.0, 0.5)));
        assert!(!a.contains_point(Vector2::new(1.1, 0.5)));
    }

    #[test]
    fn test_merge_and_extent() {
        let a = Aabb::from_bounds(0.0, 0.0, 1.0, 1.0);
        let b = Aabb::from_bounds(-1.0, 0.5, 0.5, 3.0);
        let m = a.merged(&b);
        assert_eq!(m, Aabb::from_bounds(-1.0, 0.0, 1.0, 3.0));
        assert_eq!(m.extent(Axis::X), 2.0);
        assert_eq!(m.longest_axis(), Axis::Y);
        assert_relative_eq!(m.center(), Vector2::new(0.0, 1.5));
    }

    #[test]
    fn test_from_points() {
        let aabb = Aabb::from_points([
            Vector2::new(1.0, -2.0),
            Vector2::new(-3.0, 4.0),
            Vector2::new(0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(aabb, Aabb::from_bounds(-3.0, -2.0, 1.0, 4.0));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_segment_entry() {
        let a = Aabb::from_bounds(4.0, -1.0, 6.0, 1.0);
        let t = a
            .segment_entry(Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0))
            .unwrap();
        assert_relative_eq!(t, 0.4);

        assert!(a
            .segment_entry(Vector2::new(0.0, 2.0), Vector2::new(10.0, 2.0))
            .is_none());
        assert!(a
            .segment_entry(Vector2::new(0.0, 0.0), Vector2::new(3.0, 0.0))
            .is_none());
    }
}
