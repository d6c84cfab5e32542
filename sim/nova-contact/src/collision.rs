//! Narrow-phase collision tests between world-space shapes.
//!
//! Every test reads the shapes' cached world geometry, so callers must have
//! run [`Shape::transform`] for the current pose. Normals always point from
//! the first shape toward the second.

use nalgebra::Vector2;
use nova_shape::{Circle, Polygon, Shape, ShapeKind};
use nova_types::math::{closest_point_on_segment, normalize_or};
use smallvec::SmallVec;

/// Identifies the geometric role of a contact point across frames.
///
/// Built from the edge and vertex indices that produced the point.
pub type FeatureId = u32;

/// A contact point produced by the narrow phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// World-space contact position.
    pub position: Vector2<f64>,
    /// Signed distance along the normal; negative when penetrating.
    pub separation: f64,
    /// Feature id for warm-start matching.
    pub id: FeatureId,
}

/// Result of a narrow-phase test.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Collision {
    /// Whether the shapes penetrate.
    pub collision: bool,
    /// Unit normal from the first shape to the second.
    pub normal: Vector2<f64>,
    /// Penetration depth (positive when colliding).
    pub depth: f64,
    /// Up to two contact points.
    pub points: SmallVec<[ContactPoint; 2]>,
}

impl Collision {
    /// A non-colliding result.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// The same collision seen from the other shape.
    #[must_use]
    pub fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self
    }
}

/// Incident feature code of a point created by clipping against side plane
/// `side` (0 at the reference edge start, 1 at its end). Vertex codes are
/// plain indices below `POLYGON_MAX_VERTICES`, so the two never collide.
fn clip_feature(side: usize, incident_edge: usize) -> usize {
    0x40 | (side << 4) | (incident_edge & 0x0f)
}

#[allow(clippy::cast_possible_truncation)]
fn feature_id(reference: usize, incident: usize, flip: bool) -> FeatureId {
    let id = (reference as u32 & 0xff) | ((incident as u32 & 0xff) << 8);
    if flip {
        id | 1 << 16
    } else {
        id
    }
}

/// Circle against circle.
///
/// Coincident centers get the normal `+Y`. The single contact point is the
/// midpoint of the two surface points along the normal.
#[must_use]
pub fn collide_circle_x_circle(a: &Circle, b: &Circle) -> Collision {
    let ca = a.world_center();
    let cb = b.world_center();
    let delta = cb - ca;
    let radii = a.radius + b.radius;
    let dist2 = delta.norm_squared();

    if dist2 >= radii * radii {
        return Collision::none();
    }

    let dist = dist2.sqrt();
    let normal = normalize_or(delta, Vector2::y());
    let depth = radii - dist;

    let surface_a = ca + normal * a.radius;
    let surface_b = cb - normal * b.radius;

    let mut points = SmallVec::new();
    points.push(ContactPoint {
        position: (surface_a + surface_b) * 0.5,
        separation: -depth,
        id: 0,
    });

    Collision {
        collision: true,
        normal,
        depth,
        points,
    }
}

/// Polygon against circle.
///
/// Separating axis test over the polygon's edge normals plus the axis from
/// the circle center to the closest polygon vertex. The normal points from
/// the polygon toward the circle; the contact point is the closest point on
/// the polygon boundary to the circle center.
#[must_use]
pub fn collide_polygon_x_circle(polygon: &Polygon, circle: &Circle) -> Collision {
    let center = circle.world_center();
    let vertices = polygon.world_vertices();
    let normals = polygon.world_normals();

    let mut min_depth = f64::INFINITY;
    let mut best_axis = Vector2::y();

    let mut test_axis = |axis: Vector2<f64>| -> bool {
        let (pmin, pmax) = polygon.project(axis);
        let (cmin, cmax) = circle.project(axis);
        let overlap = (pmax - cmin).min(cmax - pmin);
        if overlap <= 0.0 {
            return false;
        }
        if overlap < min_depth {
            min_depth = overlap;
            best_axis = axis;
        }
        true
    };

    for normal in normals {
        if !test_axis(*normal) {
            return Collision::none();
        }
    }

    let closest_vertex = vertices
        .iter()
        .copied()
        .min_by(|p, q| {
            (p - center)
                .norm_squared()
                .total_cmp(&(q - center).norm_squared())
        })
        .unwrap_or(center);
    let vertex_axis = closest_vertex - center;
    if vertex_axis.norm_squared() > 0.0 && !test_axis(vertex_axis.normalize()) {
        return Collision::none();
    }

    // Orient from polygon toward circle
    let poly_center = vertices.iter().sum::<Vector2<f64>>() / vertices.len().max(1) as f64;
    let mut normal = best_axis;
    if (center - poly_center).dot(&normal) < 0.0 {
        normal = -normal;
    }

    let n = vertices.len();
    let mut best_edge = 0;
    let mut best_point = center;
    let mut best_dist2 = f64::INFINITY;
    for i in 0..n {
        let (point, dist2) = closest_point_on_segment(center, vertices[i], vertices[(i + 1) % n]);
        if dist2 < best_dist2 {
            best_dist2 = dist2;
            best_point = point;
            best_edge = i;
        }
    }

    let mut points = SmallVec::new();
    points.push(ContactPoint {
        position: best_point,
        separation: -min_depth,
        id: FeatureId::try_from(best_edge).unwrap_or(FeatureId::MAX),
    });

    Collision {
        collision: true,
        normal,
        depth: min_depth,
        points,
    }
}

/// Largest separation of `b` from any face of `a`, with that face's index.
fn find_max_separation(a: &Polygon, b: &Polygon) -> (usize, f64) {
    let va = a.world_vertices();
    let na = a.world_normals();
    let vb = b.world_vertices();

    let mut best_edge = 0;
    let mut max_sep = f64::NEG_INFINITY;
    for (i, (n, v)) in na.iter().zip(va).enumerate() {
        let sep = vb
            .iter()
            .map(|p| n.dot(&(p - v)))
            .fold(f64::INFINITY, f64::min);
        if sep > max_sep {
            max_sep = sep;
            best_edge = i;
        }
    }
    (best_edge, max_sep)
}

/// Relative tolerance for switching the reference face to B.
const RELATIVE_TOL: f64 = 0.95;
/// Absolute tolerance for switching the reference face to B.
const ABSOLUTE_TOL: f64 = 0.01;

/// Polygon against polygon.
///
/// Finds the least-penetrating face of each polygon and uses the better one
/// as the reference face, preferring A unless B is clearly better. The most
/// anti-parallel face of the other polygon is clipped against the reference
/// face's side planes; surviving points below the reference face become the
/// manifold.
#[must_use]
pub fn collide_polygon_x_polygon(a: &Polygon, b: &Polygon) -> Collision {
    let (edge_a, sep_a) = find_max_separation(a, b);
    if sep_a > 0.0 {
        return Collision::none();
    }
    let (edge_b, sep_b) = find_max_separation(b, a);
    if sep_b > 0.0 {
        return Collision::none();
    }

    let (reference, incident, ref_edge, flip) = if sep_b > RELATIVE_TOL * sep_a + ABSOLUTE_TOL {
        (b, a, edge_b, true)
    } else {
        (a, b, edge_a, false)
    };

    let rv = reference.world_vertices();
    let rn = reference.world_normals();
    let iv = incident.world_vertices();
    let inn = incident.world_normals();

    let ref_normal = rn[ref_edge];
    let v11 = rv[ref_edge];
    let v12 = rv[(ref_edge + 1) % rv.len()];

    // Incident edge: most anti-parallel to the reference normal
    let inc_edge = inn
        .iter()
        .enumerate()
        .min_by(|(_, p), (_, q)| p.dot(&ref_normal).total_cmp(&q.dot(&ref_normal)))
        .map_or(0, |(i, _)| i);
    let i1 = inc_edge;
    let i2 = (inc_edge + 1) % iv.len();

    let mut clip = [(iv[i1], i1), (iv[i2], i2)];

    let tangent = normalize_or(v12 - v11, Vector2::x());
    // Side planes: -t·p <= -t·v11 and t·p <= t·v12
    if !clip_segment(&mut clip, -tangent, -tangent.dot(&v11), clip_feature(0, inc_edge))
        || !clip_segment(&mut clip, tangent, tangent.dot(&v12), clip_feature(1, inc_edge))
    {
        return Collision::none();
    }

    let front = ref_normal.dot(&v11);
    let mut points: SmallVec<[ContactPoint; 2]> = SmallVec::new();
    for (v, vertex) in clip {
        let separation = ref_normal.dot(&v) - front;
        if separation <= 0.0 {
            points.push(ContactPoint {
                // Halfway between the incident point and the reference face
                position: v - ref_normal * (0.5 * separation),
                separation,
                id: feature_id(ref_edge, vertex, flip),
            });
        }
    }

    if points.is_empty() {
        return Collision::none();
    }

    let depth = -points.iter().map(|p| p.separation).sum::<f64>() / points.len() as f64;
    let normal = if flip { -ref_normal } else { ref_normal };

    Collision {
        collision: true,
        normal,
        depth,
        points,
    }
}

/// Clip a segment against the half-plane `normal·p <= offset`.
///
/// Returns false if the whole segment is outside. A clipped endpoint takes
/// the feature code `clipped`.
fn clip_segment(
    segment: &mut [(Vector2<f64>, usize); 2],
    normal: Vector2<f64>,
    offset: f64,
    clipped: usize,
) -> bool {
    let d0 = normal.dot(&segment[0].0) - offset;
    let d1 = normal.dot(&segment[1].0) - offset;

    if d0 > 0.0 && d1 > 0.0 {
        return false;
    }
    if d0 * d1 < 0.0 {
        let t = d0 / (d0 - d1);
        let p = segment[0].0 + (segment[1].0 - segment[0].0) * t;
        if d0 > 0.0 {
            segment[0] = (p, clipped);
        } else {
            segment[1] = (p, clipped);
        }
    }
    true
}

/// Dispatch on shape kinds.
///
/// The normal always points from `a` to `b`; for circle–polygon pairs the
/// polygon test runs with its roles swapped and the result is flipped.
#[must_use]
pub fn collide_shapes(a: &Shape, b: &Shape) -> Collision {
    match (a.kind(), b.kind()) {
        (ShapeKind::Circle(ca), ShapeKind::Circle(cb)) => collide_circle_x_circle(ca, cb),
        (ShapeKind::Polygon(pa), ShapeKind::Circle(cb)) => collide_polygon_x_circle(pa, cb),
        (ShapeKind::Circle(ca), ShapeKind::Polygon(pb)) => {
            collide_polygon_x_circle(pb, ca).flipped()
        }
        (ShapeKind::Polygon(pa), ShapeKind::Polygon(pb)) => collide_polygon_x_polygon(pa, pb),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nova_types::Transform;

    fn placed(mut shape: Shape, x: f64, y: f64, angle: f64) -> Shape {
        shape.transform(&Transform::new(Vector2::new(x, y), angle));
        shape
    }

    fn circle(x: f64, y: f64, r: f64) -> Shape {
        placed(Shape::circle(Vector2::zeros(), r).unwrap(), x, y, 0.0)
    }

    fn rect(x: f64, y: f64, w: f64, h: f64, angle: f64) -> Shape {
        placed(Shape::rect(w, h, Vector2::zeros()).unwrap(), x, y, angle)
    }

    // ========================================================================
    // Circle x circle
    // ========================================================================

    #[test]
    fn test_circle_circle_overlap() {
        let a = circle(0.0, 0.0, 1.0);
        let b = circle(1.5, 0.0, 1.0);
        let res = collide_shapes(&a, &b);
        assert!(res.collision);
        assert_relative_eq!(res.depth, 0.5, epsilon = 1e-12);
        assert_relative_eq!(res.normal, Vector2::new(1.0, 0.0), epsilon = 1e-12);
        assert_eq!(res.points.len(), 1);
        assert_relative_eq!(res.points[0].position, Vector2::new(0.75, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_circle_circle_coincident_defaults_to_up() {
        let res = collide_shapes(&circle(2.0, 2.0, 1.0), &circle(2.0, 2.0, 0.5));
        assert!(res.collision);
        assert_eq!(res.normal, Vector2::new(0.0, 1.0));
        assert_relative_eq!(res.depth, 1.5);
    }

    #[test]
    fn test_circle_circle_touching_is_not_collision() {
        assert!(!collide_shapes(&circle(0.0, 0.0, 1.0), &circle(2.0, 0.0, 1.0)).collision);
        assert!(!collide_shapes(&circle(0.0, 0.0, 1.0), &circle(5.0, 0.0, 1.0)).collision);
    }

    // ========================================================================
    // Polygon x circle
    // ========================================================================

    #[test]
    fn test_circle_resting_on_box() {
        let ground = rect(0.0, 0.0, 10.0, 2.0, 0.0);
        let ball = circle(0.0, 1.9, 1.0);
        let res = collide_shapes(&ground, &ball);
        assert!(res.collision);
        assert_relative_eq!(res.normal, Vector2::new(0.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(res.depth, 0.1, epsilon = 1e-12);
        assert_relative_eq!(res.points[0].position, Vector2::new(0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_circle_near_box_corner_separated() {
        let square = rect(0.0, 0.0, 2.0, 2.0, 0.0);
        // Inside both face slabs' reach but outside the corner radius
        let ball = circle(1.6, 1.6, 0.8);
        assert!(!collide_shapes(&square, &ball).collision);
    }

    #[test]
    fn test_circle_box_corner_contact() {
        let square = rect(0.0, 0.0, 2.0, 2.0, 0.0);
        let ball = circle(1.5, 1.5, 0.8);
        let res = collide_shapes(&square, &ball);
        assert!(res.collision);
        let diag = Vector2::new(1.0, 1.0).normalize();
        assert_relative_eq!(res.normal, diag, epsilon = 1e-12);
        assert_relative_eq!(res.points[0].position, Vector2::new(1.0, 1.0), epsilon = 1e-12);
    }

    // ========================================================================
    // Polygon x polygon
    // ========================================================================

    #[test]
    fn test_box_stack_two_points() {
        let ground = rect(0.0, 0.0, 10.0, 2.0, 0.0);
        let crate_box = rect(0.0, 1.9, 2.0, 2.0, 0.0);
        let res = collide_shapes(&ground, &crate_box);
        assert!(res.collision);
        assert_eq!(res.points.len(), 2);
        assert_relative_eq!(res.normal, Vector2::new(0.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(res.depth, 0.1, epsilon = 1e-12);
        for p in &res.points {
            assert_relative_eq!(p.separation, -0.1, epsilon = 1e-12);
            assert_relative_eq!(p.position.x.abs(), 1.0, epsilon = 1e-12);
        }
        assert_ne!(res.points[0].id, res.points[1].id);
    }

    #[test]
    fn test_separated_boxes() {
        let a = rect(0.0, 0.0, 2.0, 2.0, 0.0);
        let b = rect(2.5, 0.0, 2.0, 2.0, 0.0);
        assert!(!collide_shapes(&a, &b).collision);
    }

    #[test]
    fn test_rotated_box_on_corner() {
        let ground = rect(0.0, 0.0, 10.0, 2.0, 0.0);
        let h = 2.0_f64.sqrt();
        let diamond = rect(0.0, 1.0 + h - 0.05, 2.0, 2.0, std::f64::consts::FRAC_PI_4);
        let res = collide_shapes(&ground, &diamond);
        assert!(res.collision);
        assert_eq!(res.points.len(), 1);
        assert_relative_eq!(res.depth, 0.05, epsilon = 1e-9);
    }

    #[test]
    fn test_feature_ids_are_stable_under_small_motion() {
        let ground = rect(0.0, 0.0, 10.0, 2.0, 0.0);
        let r1 = collide_shapes(&ground, &rect(0.0, 1.9, 2.0, 2.0, 0.0));
        let r2 = collide_shapes(&ground, &rect(0.01, 1.91, 2.0, 2.0, 0.001));
        let ids1: Vec<_> = r1.points.iter().map(|p| p.id).collect();
        let mut ids2: Vec<_> = r2.points.iter().map(|p| p.id).collect();
        ids2.sort_unstable();
        let mut sorted1 = ids1.clone();
        sorted1.sort_unstable();
        assert_eq!(sorted1, ids2);
    }

    #[test]
    fn test_clipped_point_gets_new_feature_id() {
        let base = rect(0.0, 0.0, 1.0, 1.0, 0.0);

        // Narrow box fully on top: both points are incident vertices
        let centered = collide_shapes(&base, &rect(0.0, 0.95, 0.5, 1.0, 0.0));
        assert_eq!(centered.points.len(), 2);

        // Slide right so one incident vertex passes the reference side plane
        let slid = collide_shapes(&base, &rect(0.4, 0.95, 0.5, 1.0, 0.0));
        assert_eq!(slid.points.len(), 2);
        assert_ne!(slid.points[0].id, slid.points[1].id);

        let kept: Vec<_> = slid
            .points
            .iter()
            .filter(|p| centered.points.iter().any(|c| c.id == p.id))
            .collect();
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].position.x, 0.15, epsilon = 1e-12);

        let clipped = slid.points.iter().find(|p| p.id != kept[0].id).unwrap();
        assert_relative_eq!(clipped.position.x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_both_points_clipped_have_distinct_ids() {
        let base = rect(0.0, 0.0, 1.0, 1.0, 0.0);
        let wide = collide_shapes(&base, &rect(0.0, 0.95, 3.0, 1.0, 0.0));
        assert_eq!(wide.points.len(), 2);
        assert_ne!(wide.points[0].id, wide.points[1].id);
        for p in &wide.points {
            assert_relative_eq!(p.position.x.abs(), 0.5, epsilon = 1e-12);
        }
    }

    // ========================================================================
    // Symmetry
    // ========================================================================

    fn assert_symmetric(a: &Shape, b: &Shape) {
        let ab = collide_shapes(a, b);
        let ba = collide_shapes(b, a);
        assert_eq!(ab.collision, ba.collision);
        if ab.collision {
            assert_relative_eq!(ab.depth, ba.depth, epsilon = 1e-9);
            assert_relative_eq!(ab.normal, -ba.normal, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_symmetry() {
        assert_symmetric(&circle(0.0, 0.0, 1.0), &circle(1.2, 0.7, 0.9));
        assert_symmetric(&rect(0.0, 0.0, 4.0, 1.0, 0.0), &circle(0.3, 0.9, 0.5));
        assert_symmetric(&rect(0.0, 0.0, 10.0, 2.0, 0.0), &rect(0.5, 1.8, 2.0, 2.0, 0.0));
    }
}
