//! Convex polygon shape and polygon geometry helpers.

use nalgebra::Vector2;
use nova_types::constants::POLYGON_MAX_VERTICES;
use nova_types::math::{cross, normalize_or_zero, perpr};
use nova_types::{PhysicsError, Result, Transform};
use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Edges shorter than this have no usable normal
const MIN_EDGE_LENGTH_SQ: f64 = 1e-18;

/// Inline storage for polygon vertices.
pub type VertexList = SmallVec<[Vector2<f64>; 8]>;

/// A convex polygon with counter-clockwise winding.
///
/// Local vertices are relative to the body origin. Edge `i` runs from
/// vertex `i` to vertex `i + 1` and `normals[i]` is its outward unit normal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Polygon {
    vertices: VertexList,
    normals: VertexList,
    xvertices: VertexList,
    xnormals: VertexList,
}

impl Polygon {
    /// Build a polygon from a vertex loop, adding `offset` to every vertex.
    ///
    /// Clockwise input is reversed. Fails if the count is outside
    /// `[3, POLYGON_MAX_VERTICES]`, an edge has (near) zero length, the area
    /// is zero or the loop is not convex.
    pub(crate) fn new(vertices: &[Vector2<f64>], offset: Vector2<f64>) -> Result<Self> {
        let n = vertices.len();
        if n < 3 {
            return Err(PhysicsError::invalid_geometry(format!(
                "polygon needs at least 3 vertices, got {n}"
            )));
        }
        if n > POLYGON_MAX_VERTICES {
            return Err(PhysicsError::invalid_geometry(format!(
                "polygon supports at most {POLYGON_MAX_VERTICES} vertices, got {n}"
            )));
        }
        if vertices.iter().any(|v| !v.x.is_finite() || !v.y.is_finite()) {
            return Err(PhysicsError::invalid_geometry("polygon vertex is not finite"));
        }

        let mut local: VertexList = vertices.iter().map(|v| v + offset).collect();
        let short_edge =
            (0..n).find(|&i| (local[(i + 1) % n] - local[i]).norm_squared() <= MIN_EDGE_LENGTH_SQ);
        if let Some(i) = short_edge {
            return Err(PhysicsError::invalid_geometry(format!(
                "polygon edge {i} has zero length"
            )));
        }
        let area = signed_area(&local);
        if area.abs() <= f64::EPSILON {
            return Err(PhysicsError::invalid_geometry("polygon has zero area"));
        }
        if area < 0.0 {
            local.reverse();
        }
        if !is_convex(&local) {
            return Err(PhysicsError::invalid_geometry("polygon is not convex"));
        }

        let normals = edge_normals(&local);
        Ok(Self {
            xvertices: local.clone(),
            xnormals: normals.clone(),
            vertices: local,
            normals,
        })
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Always false; polygons have at least three vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Local-space vertices.
    #[must_use]
    pub fn vertices(&self) -> &[Vector2<f64>] {
        &self.vertices
    }

    /// Local-space outward edge normals.
    #[must_use]
    pub fn normals(&self) -> &[Vector2<f64>] {
        &self.normals
    }

    /// World-space vertices as of the last transform.
    #[must_use]
    pub fn world_vertices(&self) -> &[Vector2<f64>] {
        &self.xvertices
    }

    /// World-space edge normals as of the last transform.
    #[must_use]
    pub fn world_normals(&self) -> &[Vector2<f64>] {
        &self.xnormals
    }

    /// Shoelace area.
    #[must_use]
    pub fn area(&self) -> f64 {
        signed_area(&self.vertices)
    }

    /// Area centroid in local space.
    #[must_use]
    pub fn centroid(&self) -> Vector2<f64> {
        centroid(&self.vertices)
    }

    /// Mass, inertia about the centroid, and centroid for a given density.
    #[must_use]
    pub fn mass_properties(&self, density: f64) -> (f64, f64, Vector2<f64>) {
        // Integrate over triangles fanned from the first vertex to keep the
        // numbers small, then shift the second moment to the centroid.
        let origin = self.vertices[0];
        let mut area = 0.0;
        let mut center = Vector2::zeros();
        let mut second_moment = 0.0;

        let n = self.vertices.len();
        for i in 1..n - 1 {
            let e1 = self.vertices[i] - origin;
            let e2 = self.vertices[i + 1] - origin;
            let d = cross(e1, e2);
            let tri_area = 0.5 * d;
            area += tri_area;
            center += (e1 + e2) * (tri_area / 3.0);

            let intx2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
            let inty2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
            second_moment += (0.25 / 3.0 * d) * (intx2 + inty2);
        }

        let mass = density * area;
        center /= area;
        let inertia = density * second_moment - mass * center.norm_squared();
        (mass, inertia, origin + center)
    }

    pub(crate) fn transform(&mut self, xform: &Transform) {
        for (x, v) in self.xvertices.iter_mut().zip(&self.vertices) {
            *x = xform.apply(*v);
        }
        for (x, n) in self.xnormals.iter_mut().zip(&self.normals) {
            *x = xform.rotate(*n);
        }
    }

    /// Interval covered by the world-space polygon projected onto `axis`.
    #[must_use]
    pub fn project(&self, axis: Vector2<f64>) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in &self.xvertices {
            let p = v.dot(&axis);
            min = min.min(p);
            max = max.max(p);
        }
        (min, max)
    }

    /// Index of the world vertex furthest along `direction`.
    #[must_use]
    pub fn support(&self, direction: Vector2<f64>) -> usize {
        let mut best = 0;
        let mut best_dot = f64::NEG_INFINITY;
        for (i, v) in self.xvertices.iter().enumerate() {
            let d = v.dot(&direction);
            if d > best_dot {
                best_dot = d;
                best = i;
            }
        }
        best
    }
}

/// Signed shoelace area; positive for counter-clockwise loops.
#[must_use]
pub fn signed_area(vertices: &[Vector2<f64>]) -> f64 {
    let n = vertices.len();
    let mut sum = 0.0;
    for i in 0..n {
        sum += cross(vertices[i], vertices[(i + 1) % n]);
    }
    sum * 0.5
}

/// Area centroid of a simple polygon.
#[must_use]
pub fn centroid(vertices: &[Vector2<f64>]) -> Vector2<f64> {
    let n = vertices.len();
    let area = signed_area(vertices);
    if area.abs() <= f64::EPSILON {
        let sum: Vector2<f64> = vertices.iter().sum();
        return sum / n.max(1) as f64;
    }
    let mut c = Vector2::zeros();
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        c += (a + b) * cross(a, b);
    }
    c / (6.0 * area)
}

fn is_convex(ccw: &[Vector2<f64>]) -> bool {
    let n = ccw.len();
    (0..n).all(|i| {
        let a = ccw[i];
        let b = ccw[(i + 1) % n];
        let c = ccw[(i + 2) % n];
        cross(b - a, c - b) >= -1e-12
    })
}

fn edge_normals(ccw: &[Vector2<f64>]) -> VertexList {
    let n = ccw.len();
    (0..n)
        .map(|i| normalize_or_zero(perpr(ccw[(i + 1) % n] - ccw[i])))
        .collect()
}

/// Convex hull of a point cloud in counter-clockwise order.
///
/// Uses the monotone chain algorithm; collinear points are dropped.
#[must_use]
pub fn convex_hull(points: &[Vector2<f64>]) -> Vec<Vector2<f64>> {
    let mut pts: Vec<Vector2<f64>> = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<Vector2<f64>> = Vec::with_capacity(pts.len() * 2);
    for &p in &pts {
        while hull.len() >= 2 && turn(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && turn(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

fn turn(o: Vector2<f64>, a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    cross(a - o, b - o)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> Vec<Vector2<f64>> {
        vec![
            Vector2::new(-0.5, -0.5),
            Vector2::new(0.5, -0.5),
            Vector2::new(0.5, 0.5),
            Vector2::new(-0.5, 0.5),
        ]
    }

    #[test]
    fn test_vertex_count_limits() {
        let two = [Vector2::zeros(), Vector2::new(1.0, 0.0)];
        assert!(Polygon::new(&two, Vector2::zeros()).is_err());

        let many: Vec<_> = (0..POLYGON_MAX_VERTICES + 1)
            .map(|i| {
                let a = i as f64 / (POLYGON_MAX_VERTICES + 1) as f64 * std::f64::consts::TAU;
                Vector2::new(a.cos(), a.sin())
            })
            .collect();
        assert!(Polygon::new(&many, Vector2::zeros()).is_err());
    }

    #[test]
    fn test_clockwise_input_is_reversed() {
        let mut cw = unit_square();
        cw.reverse();
        let poly = Polygon::new(&cw, Vector2::zeros()).unwrap();
        assert!(poly.area() > 0.0);
    }

    #[test]
    fn test_non_convex_rejected() {
        let dart = [
            Vector2::new(0.0, 0.0),
            Vector2::new(2.0, 0.0),
            Vector2::new(0.5, 0.5),
            Vector2::new(0.0, 2.0),
        ];
        assert!(Polygon::new(&dart, Vector2::zeros()).is_err());
    }

    #[test]
    fn test_duplicate_vertex_rejected() {
        let doubled = [
            Vector2::new(-1.0, -1.0),
            Vector2::new(1.0, -1.0),
            Vector2::new(1.0, -1.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(-1.0, 1.0),
        ];
        let err = Polygon::new(&doubled, Vector2::zeros()).unwrap_err();
        assert!(err.is_construction_error());

        // Closing the loop by repeating the first vertex is also degenerate
        let mut closed = unit_square();
        closed.push(closed[0]);
        assert!(Polygon::new(&closed, Vector2::zeros()).is_err());
    }

    #[test]
    fn test_outward_normals() {
        let poly = Polygon::new(&unit_square(), Vector2::zeros()).unwrap();
        assert_relative_eq!(poly.normals()[0], Vector2::new(0.0, -1.0));
        assert_relative_eq!(poly.normals()[1], Vector2::new(1.0, 0.0));
        assert_relative_eq!(poly.normals()[2], Vector2::new(0.0, 1.0));
        assert_relative_eq!(poly.normals()[3], Vector2::new(-1.0, 0.0));
    }

    #[test]
    fn test_square_mass_properties() {
        let poly = Polygon::new(&unit_square(), Vector2::new(2.0, 1.0)).unwrap();
        let (mass, inertia, c) = poly.mass_properties(3.0);
        assert_relative_eq!(mass, 3.0, epsilon = 1e-12);
        // m (w² + h²) / 12 about the centroid, independent of offset
        assert_relative_eq!(inertia, 3.0 * 2.0 / 12.0, epsilon = 1e-12);
        assert_relative_eq!(c, Vector2::new(2.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_centroid_of_triangle() {
        let tri = [
            Vector2::new(0.0, 0.0),
            Vector2::new(3.0, 0.0),
            Vector2::new(0.0, 3.0),
        ];
        assert_relative_eq!(centroid(&tri), Vector2::new(1.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_convex_hull_drops_interior_points() {
        let mut points = unit_square();
        points.push(Vector2::new(0.0, 0.0));
        points.push(Vector2::new(0.1, -0.2));
        points.push(Vector2::new(0.5, 0.0)); // collinear with an edge
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!(signed_area(&hull) > 0.0);
        assert_relative_eq!(signed_area(&hull), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_projection_and_support() {
        let mut poly = Polygon::new(&unit_square(), Vector2::zeros()).unwrap();
        poly.transform(&Transform::new(Vector2::new(10.0, 0.0), 0.0));
        let (min, max) = poly.project(Vector2::new(1.0, 0.0));
        assert_relative_eq!(min, 9.5);
        assert_relative_eq!(max, 10.5);

        let i = poly.support(Vector2::new(1.0, 1.0));
        assert_relative_eq!(poly.world_vertices()[i], Vector2::new(10.5, 0.5));
    }
}
