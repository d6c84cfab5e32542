//! `collide(A, B)` and `collide(B, A)` must agree up to orientation.

use approx::assert_relative_eq;
use nalgebra::Vector2;
use nova_contact::{collide_shapes, Collision};
use nova_shape::Shape;
use nova_types::Transform;
use rand::{Rng, SeedableRng};

const EPS: f64 = 1e-9;

fn placed(mut shape: Shape, x: f64, y: f64, angle: f64) -> Shape {
    shape.transform(&Transform::new(Vector2::new(x, y), angle));
    shape
}

fn assert_symmetric(ab: &Collision, ba: &Collision) {
    assert_eq!(ab.collision, ba.collision);
    if !ab.collision {
        return;
    }
    assert_relative_eq!(ab.depth, ba.depth, epsilon = EPS);
    assert_relative_eq!(ab.normal, -ba.normal, epsilon = EPS);
    assert_eq!(ab.points.len(), ba.points.len());
}

#[test]
fn test_circle_pairs_are_symmetric() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(11);
    let mut hits = 0;
    for _ in 0..500 {
        let a = placed(
            Shape::circle(Vector2::zeros(), rng.gen_range(0.2..2.0)).unwrap(),
            rng.gen_range(-2.0..2.0),
            rng.gen_range(-2.0..2.0),
            0.0,
        );
        let b = placed(
            Shape::circle(Vector2::zeros(), rng.gen_range(0.2..2.0)).unwrap(),
            rng.gen_range(-2.0..2.0),
            rng.gen_range(-2.0..2.0),
            0.0,
        );
        let ab = collide_shapes(&a, &b);
        let ba = collide_shapes(&b, &a);
        assert_symmetric(&ab, &ba);
        hits += usize::from(ab.collision);
    }
    assert!(hits > 100, "too few overlapping samples: {hits}");
}

#[test]
fn test_polygon_circle_pairs_are_symmetric() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(23);
    let mut hits = 0;
    for _ in 0..500 {
        let polygon = placed(
            Shape::ngon(rng.gen_range(3..9), rng.gen_range(0.5..2.0), Vector2::zeros()).unwrap(),
            0.0,
            0.0,
            rng.gen_range(-3.0..3.0),
        );
        let circle = placed(
            Shape::circle(Vector2::zeros(), rng.gen_range(0.2..1.5)).unwrap(),
            rng.gen_range(-3.0..3.0),
            rng.gen_range(-3.0..3.0),
            0.0,
        );
        let ab = collide_shapes(&polygon, &circle);
        let ba = collide_shapes(&circle, &polygon);
        assert_symmetric(&ab, &ba);
        hits += usize::from(ab.collision);
    }
    assert!(hits > 100, "too few overlapping samples: {hits}");
}

#[test]
fn test_axis_aligned_box_pairs_are_symmetric() {
    let cases = [
        // (width_a, height_a, width_b, height_b, dx, dy)
        (2.0, 2.0, 2.0, 2.0, 1.5, 0.2),
        (4.0, 1.0, 1.0, 1.0, 0.3, 0.8),
        (1.0, 3.0, 2.0, 1.0, -1.2, 0.5),
        (10.0, 2.0, 1.0, 1.0, 2.0, 1.3),
        (1.0, 1.0, 1.0, 1.0, 0.0, -0.9),
    ];
    for (wa, ha, wb, hb, dx, dy) in cases {
        let a = placed(Shape::rect(wa, ha, Vector2::zeros()).unwrap(), 0.0, 0.0, 0.0);
        let b = placed(Shape::rect(wb, hb, Vector2::zeros()).unwrap(), dx, dy, 0.0);
        let ab = collide_shapes(&a, &b);
        let ba = collide_shapes(&b, &a);
        assert!(ab.collision, "case ({wa}, {ha}, {wb}, {hb}, {dx}, {dy})");
        assert_symmetric(&ab, &ba);
    }
}

#[test]
fn test_separated_shapes_never_collide_either_way() {
    let a = placed(Shape::rect(1.0, 1.0, Vector2::zeros()).unwrap(), 0.0, 0.0, 0.3);
    let b = placed(Shape::circle(Vector2::zeros(), 0.5).unwrap(), 3.0, 0.0, 0.0);
    let c = placed(Shape::ngon(5, 0.7, Vector2::zeros()).unwrap(), 0.0, 3.0, 1.0);
    for (x, y) in [(&a, &b), (&a, &c), (&b, &c)] {
        assert!(!collide_shapes(x, y).collision);
        assert!(!collide_shapes(y, x).collision);
    }
}
