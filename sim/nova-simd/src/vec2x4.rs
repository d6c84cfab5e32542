//! 4-wide 2D vector batch in Structure-of-Arrays layout.

use nalgebra::Vector2;

/// Four 2D vectors stored as separate x and y lanes.
///
/// The lane arrays are laid out so the compiler can keep each component in a
/// single 256-bit register when AVX is available.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C, align(32))]
pub struct Vec2x4 {
    /// X components.
    pub xs: [f64; 4],
    /// Y components.
    pub ys: [f64; 4],
}

impl Default for Vec2x4 {
    fn default() -> Self {
        Self::zeros()
    }
}

impl Vec2x4 {
    /// All-zero batch.
    #[inline]
    #[must_use]
    pub const fn zeros() -> Self {
        Self {
            xs: [0.0; 4],
            ys: [0.0; 4],
        }
    }

    /// Build from four vectors.
    #[inline]
    #[must_use]
    pub fn from_vectors(vectors: [Vector2<f64>; 4]) -> Self {
        Self {
            xs: [vectors[0].x, vectors[1].x, vectors[2].x, vectors[3].x],
            ys: [vectors[0].y, vectors[1].y, vectors[2].y, vectors[3].y],
        }
    }

    /// Build from the first four entries of a slice.
    ///
    /// The slice must hold at least four vectors.
    #[inline]
    #[must_use]
    pub fn from_slice(vectors: &[Vector2<f64>]) -> Self {
        debug_assert!(vectors.len() >= 4, "Vec2x4::from_slice needs 4 vectors");
        Self {
            xs: [vectors[0].x, vectors[1].x, vectors[2].x, vectors[3].x],
            ys: [vectors[0].y, vectors[1].y, vectors[2].y, vectors[3].y],
        }
    }

    /// Build from up to four vectors, zero-padding the missing lanes.
    #[inline]
    #[must_use]
    pub fn from_slice_padded(vectors: &[Vector2<f64>]) -> Self {
        let mut out = Self::zeros();
        for (i, v) in vectors.iter().take(4).enumerate() {
            out.xs[i] = v.x;
            out.ys[i] = v.y;
        }
        out
    }

    /// The same vector in every lane.
    #[inline]
    #[must_use]
    pub fn splat(v: Vector2<f64>) -> Self {
        Self {
            xs: [v.x; 4],
            ys: [v.y; 4],
        }
    }

    /// Extract one lane.
    #[inline]
    #[must_use]
    pub fn get(&self, lane: usize) -> Vector2<f64> {
        Vector2::new(self.xs[lane], self.ys[lane])
    }

    /// Write one lane.
    #[inline]
    pub fn set(&mut self, lane: usize, v: Vector2<f64>) {
        self.xs[lane] = v.x;
        self.ys[lane] = v.y;
    }

    /// Unpack into four vectors.
    #[inline]
    #[must_use]
    pub fn to_vectors(&self) -> [Vector2<f64>; 4] {
        [self.get(0), self.get(1), self.get(2), self.get(3)]
    }

    /// Per-lane dot product with a single direction.
    #[inline]
    #[must_use]
    pub fn dot(&self, direction: &Vector2<f64>) -> [f64; 4] {
        [
            self.xs[0] * direction.x + self.ys[0] * direction.y,
            self.xs[1] * direction.x + self.ys[1] * direction.y,
            self.xs[2] * direction.x + self.ys[2] * direction.y,
            self.xs[3] * direction.x + self.ys[3] * direction.y,
        ]
    }

    /// Per-lane squared length.
    #[inline]
    #[must_use]
    pub fn norm_squared(&self) -> [f64; 4] {
        [
            self.xs[0] * self.xs[0] + self.ys[0] * self.ys[0],
            self.xs[1] * self.xs[1] + self.ys[1] * self.ys[1],
            self.xs[2] * self.xs[2] + self.ys[2] * self.ys[2],
            self.xs[3] * self.xs[3] + self.ys[3] * self.ys[3],
        ]
    }

    /// Lane-wise sum.
    #[inline]
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self {
            xs: [
                self.xs[0] + other.xs[0],
                self.xs[1] + other.xs[1],
                self.xs[2] + other.xs[2],
                self.xs[3] + other.xs[3],
            ],
            ys: [
                self.ys[0] + other.ys[0],
                self.ys[1] + other.ys[1],
                self.ys[2] + other.ys[2],
                self.ys[3] + other.ys[3],
            ],
        }
    }

    /// Lane-wise difference.
    #[inline]
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        Self {
            xs: [
                self.xs[0] - other.xs[0],
                self.xs[1] - other.xs[1],
                self.xs[2] - other.xs[2],
                self.xs[3] - other.xs[3],
            ],
            ys: [
                self.ys[0] - other.ys[0],
                self.ys[1] - other.ys[1],
                self.ys[2] - other.ys[2],
                self.ys[3] - other.ys[3],
            ],
        }
    }

    /// Scale every lane by the same factor.
    #[inline]
    #[must_use]
    pub fn scale(&self, s: f64) -> Self {
        Self {
            xs: [self.xs[0] * s, self.xs[1] * s, self.xs[2] * s, self.xs[3] * s],
            ys: [self.ys[0] * s, self.ys[1] * s, self.ys[2] * s, self.ys[3] * s],
        }
    }

    /// Scale each lane by its own factor.
    #[inline]
    #[must_use]
    pub fn scale_each(&self, s: [f64; 4]) -> Self {
        Self {
            xs: [
                self.xs[0] * s[0],
                self.xs[1] * s[1],
                self.xs[2] * s[2],
                self.xs[3] * s[3],
            ],
            ys: [
                self.ys[0] * s[0],
                self.ys[1] * s[1],
                self.ys[2] * s[2],
                self.ys[3] * s[3],
            ],
        }
    }

    /// `self + other * s` per lane.
    #[inline]
    #[must_use]
    pub fn mul_add(&self, other: &Self, s: f64) -> Self {
        Self {
            xs: [
                self.xs[0] + other.xs[0] * s,
                self.xs[1] + other.xs[1] * s,
                self.xs[2] + other.xs[2] * s,
                self.xs[3] + other.xs[3] * s,
            ],
            ys: [
                self.ys[0] + other.ys[0] * s,
                self.ys[1] + other.ys[1] * s,
                self.ys[2] + other.ys[2] * s,
                self.ys[3] + other.ys[3] * s,
            ],
        }
    }
}

/// Lane-wise `a + b * s` on scalar batches.
#[inline]
#[must_use]
pub fn mul_add_scalar(a: [f64; 4], b: [f64; 4], s: f64) -> [f64; 4] {
    [a[0] + b[0] * s, a[1] + b[1] * s, a[2] + b[2] * s, a[3] + b[3] * s]
}

/// Lane-wise product on scalar batches.
#[inline]
#[must_use]
pub fn mul_scalar(a: [f64; 4], b: [f64; 4]) -> [f64; 4] {
    [a[0] * b[0], a[1] * b[1], a[2] * b[2], a[3] * b[3]]
}
