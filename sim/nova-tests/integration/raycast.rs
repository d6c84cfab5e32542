//! Ray casts and box queries through a populated space.

use approx::assert_relative_eq;
use nalgebra::Vector2;
use nova_core::{Aabb, RigidBody, RigidBodyInit, Shape, Space};

fn fixed(space: &mut Space, position: Vector2<f64>, shape: Shape) -> nova_core::BodyId {
    space
        .add_body(RigidBody::with_shape(RigidBodyInit::fixed(position), shape).unwrap())
        .unwrap()
}

#[test]
fn test_ray_hits_circle_at_near_face() {
    let mut space = Space::new();
    let target = fixed(&mut space, Vector2::new(50.0, 0.0), Shape::circle(Vector2::zeros(), 1.0).unwrap());

    let hits = space.cast_ray(Vector2::zeros(), Vector2::new(100.0, 0.0), 16);
    assert_eq!(hits.len(), 1);
    let hit = hits[0];
    assert_eq!(hit.body, target);
    assert_relative_eq!(hit.point, Vector2::new(49.0, 0.0), epsilon = 1e-9);
    assert_relative_eq!(hit.normal, Vector2::new(-1.0, 0.0), epsilon = 1e-9);
    assert_relative_eq!(hit.fraction, 0.49, epsilon = 1e-9);
}

#[test]
fn test_ray_hits_rotated_box() {
    let mut space = Space::new();
    let id = fixed(&mut space, Vector2::new(10.0, 0.0), Shape::rect(2.0, 2.0, Vector2::zeros()).unwrap());
    space
        .body_mut(id)
        .unwrap()
        .set_angle(std::f64::consts::FRAC_PI_4);

    let hits = space.cast_ray(Vector2::new(0.0, 0.5), Vector2::new(20.0, 0.5), 4);
    assert_eq!(hits.len(), 1);
    // Diamond edge |x - 10| + |y| = sqrt(2)
    assert_relative_eq!(hits[0].point.x, 10.0 - (2.0_f64.sqrt() - 0.5), epsilon = 1e-9);
    assert_relative_eq!(hits[0].point.y, 0.5, epsilon = 1e-9);
    let half = std::f64::consts::FRAC_1_SQRT_2;
    assert_relative_eq!(hits[0].normal, Vector2::new(-half, half), epsilon = 1e-9);
}

#[test]
fn test_ray_reports_each_shape_nearest_first() {
    let mut space = Space::new();
    let mut body = RigidBody::new(RigidBodyInit::fixed(Vector2::new(20.0, 0.0))).unwrap();
    let far = body.add_shape(Shape::circle(Vector2::new(5.0, 0.0), 1.0).unwrap()).unwrap();
    let near = body.add_shape(Shape::rect(1.0, 1.0, Vector2::new(-5.0, 0.0)).unwrap()).unwrap();
    space.add_body(body).unwrap();
    fixed(&mut space, Vector2::new(60.0, 0.0), Shape::circle(Vector2::zeros(), 1.0).unwrap());

    let hits = space.cast_ray(Vector2::zeros(), Vector2::new(100.0, 0.0), 16);
    let shapes: Vec<_> = hits.iter().take(2).map(|h| h.shape).collect();
    assert_eq!(shapes, vec![near, far]);
    assert_eq!(hits.len(), 3);
    assert!(hits.windows(2).all(|w| w[0].fraction <= w[1].fraction));

    assert_eq!(space.cast_ray(Vector2::zeros(), Vector2::new(100.0, 0.0), 2).len(), 2);
}

#[test]
fn test_ray_misses_and_short_rays() {
    let mut space = Space::new();
    fixed(&mut space, Vector2::new(50.0, 0.0), Shape::circle(Vector2::zeros(), 1.0).unwrap());

    assert!(space.cast_ray(Vector2::new(0.0, 5.0), Vector2::new(100.0, 5.0), 4).is_empty());
    // Ends before the surface
    assert!(space.cast_ray(Vector2::zeros(), Vector2::new(48.0, 0.0), 4).is_empty());
    // Starts inside
    assert!(space.cast_ray(Vector2::new(50.0, 0.0), Vector2::new(100.0, 0.0), 4).is_empty());
}

#[test]
fn test_query_aabb_follows_simulation() {
    let mut space = Space::new();
    let ball = space
        .add_body(
            RigidBody::with_shape(
                RigidBodyInit::dynamic(Vector2::new(0.0, 10.0)),
                Shape::circle(Vector2::zeros(), 0.5).unwrap(),
            )
            .unwrap(),
        )
        .unwrap();
    let region = Aabb::from_bounds(-1.0, 9.0, 1.0, 11.0);
    assert_eq!(space.query_aabb(&region), vec![ball]);

    for _ in 0..60 {
        space.step(1.0 / 60.0);
    }
    assert!(space.query_aabb(&region).is_empty());
}
