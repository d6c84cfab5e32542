//! Joints under load: hinge limits, rigid distance, springs and splines.

use std::f64::consts::FRAC_PI_4;

use nalgebra::Vector2;
use nova_core::{
    Constraint, DistanceConstraintInit, HingeConstraintInit, RigidBody, RigidBodyInit, Shape,
    Space, SpaceSettings, SplineConstraintInit, SpringConstraintInit,
};

use crate::common::{boxed, circle, run, DT};

fn weightless() -> Space {
    Space::with_settings(SpaceSettings::default().zero_gravity()).unwrap()
}

fn distance_between(space: &Space, a: nova_core::BodyId, b: nova_core::BodyId) -> f64 {
    (space.body(b).unwrap().position() - space.body(a).unwrap().position()).norm()
}

// ============================================================================
// Hinge
// ============================================================================

#[test]
fn test_hinge_limit_holds_against_torque() {
    let mut space = weightless();
    let pivot = space
        .add_body(
            RigidBody::with_shape(
                RigidBodyInit::fixed(Vector2::zeros()),
                Shape::circle(Vector2::zeros(), 0.1).unwrap(),
            )
            .unwrap(),
        )
        .unwrap();
    let plank = space.add_body(boxed(Vector2::new(2.0, 0.0), 4.0, 0.2)).unwrap();

    let hinge = Constraint::hinge(
        space.body(pivot),
        space.body(plank),
        HingeConstraintInit::new(Vector2::zeros()).with_limits(-FRAC_PI_4, FRAC_PI_4),
    )
    .unwrap()
    .with_ignore_collision(true);
    let hinge = space.add_constraint(hinge).unwrap();

    for step in 1..=600 {
        space.body_mut(plank).unwrap().apply_torque(50.0);
        space.step(DT);

        if step == 300 || step == 600 {
            let body = space.body(plank).unwrap();
            assert!(
                body.angle().abs() <= FRAC_PI_4 + 0.08,
                "step {step}: angle {}",
                body.angle()
            );
            // The plank's left end stays on the pivot
            let end = body.position() - 2.0 * Vector2::new(body.angle().cos(), body.angle().sin());
            assert!(end.norm() < 0.05, "step {step}: pivot drifted to {end}");
        }
    }

    let joint = space.constraint(hinge).unwrap().as_hinge().unwrap();
    assert!(joint.angle() > FRAC_PI_4 - 0.1, "limit never reached: {}", joint.angle());
}

#[test]
fn test_hinge_without_limits_spins_freely() {
    let mut space = weightless();
    let pivot = space
        .add_body(
            RigidBody::with_shape(
                RigidBodyInit::fixed(Vector2::zeros()),
                Shape::circle(Vector2::zeros(), 0.1).unwrap(),
            )
            .unwrap(),
        )
        .unwrap();
    let plank = space.add_body(boxed(Vector2::new(2.0, 0.0), 4.0, 0.2)).unwrap();
    let hinge = Constraint::hinge(
        space.body(pivot),
        space.body(plank),
        HingeConstraintInit::new(Vector2::zeros()),
    )
    .unwrap()
    .with_ignore_collision(true);
    space.add_constraint(hinge).unwrap();

    for _ in 0..120 {
        space.body_mut(plank).unwrap().apply_torque(50.0);
        space.step(DT);
    }
    assert!(space.body(plank).unwrap().angular_velocity() > 5.0);
}

// ============================================================================
// Distance
// ============================================================================

#[test]
fn test_distance_joint_preserves_length() {
    let mut space = weightless();
    let a = space.add_body(circle(Vector2::zeros(), 0.25)).unwrap();
    let b = space.add_body(circle(Vector2::new(3.0, 0.0), 0.25)).unwrap();
    space
        .body_mut(a)
        .unwrap()
        .set_linear_velocity(Vector2::new(0.0, 2.0));
    space
        .body_mut(b)
        .unwrap()
        .set_linear_velocity(Vector2::new(0.0, -2.0));

    let joint = Constraint::distance(
        space.body(a),
        space.body(b),
        DistanceConstraintInit::new(3.0),
    )
    .unwrap();
    space.add_constraint(joint).unwrap();

    for step in 0..200 {
        space.step(DT);
        let length = distance_between(&space, a, b);
        assert!((length - 3.0).abs() < 0.05, "step {step}: length {length}");
    }
    // The pair spins instead of flying apart
    assert!(space.body(a).unwrap().linear_velocity().norm() > 1.0);
}

#[test]
fn test_distance_joint_to_world_makes_pendulum() {
    let mut space = Space::new();
    let bob = space.add_body(circle(Vector2::new(2.0, 0.0), 0.2)).unwrap();
    let joint = Constraint::distance(
        None,
        space.body(bob),
        DistanceConstraintInit::new(2.0),
    )
    .unwrap();
    space.add_constraint(joint).unwrap();

    run(&mut space, 240);
    let position = space.body(bob).unwrap().position();
    assert!((position.norm() - 2.0).abs() < 0.05, "bob at {position}");
}

// ============================================================================
// Spring
// ============================================================================

#[test]
fn test_spring_settles_at_rest_length() {
    let mut space = weightless();
    let a = space.add_body(circle(Vector2::zeros(), 0.5)).unwrap();
    let b = space.add_body(circle(Vector2::new(4.0, 0.0), 0.5)).unwrap();

    let spring = Constraint::spring(
        space.body(a),
        space.body(b),
        SpringConstraintInit::new(2.0, 10.0, 2.0),
    )
    .unwrap();
    space.add_constraint(spring).unwrap();

    run(&mut space, 60);
    assert!(distance_between(&space, a, b) < 4.0);

    run(&mut space, 540);
    let length = distance_between(&space, a, b);
    assert!((length - 2.0).abs() < 0.05, "length {length}");
    // Momentum stays zero, so the midpoint does not move
    let mid = (space.body(a).unwrap().position() + space.body(b).unwrap().position()) / 2.0;
    assert!((mid - Vector2::new(2.0, 0.0)).norm() < 1e-6);
}

// ============================================================================
// Spline
// ============================================================================

#[test]
fn test_spline_keeps_body_on_path() {
    let mut space = Space::new();
    let slider = space.add_body(circle(Vector2::zeros(), 0.25)).unwrap();
    space
        .body_mut(slider)
        .unwrap()
        .set_linear_velocity(Vector2::new(3.0, 0.0));

    let path = (-2..=2_i32)
        .map(|i| Vector2::new(5.0 * f64::from(i), 0.0))
        .collect();
    let joint = Constraint::spline(
        space.body(slider).unwrap(),
        SplineConstraintInit::new(Vector2::zeros(), path),
    )
    .unwrap();
    space.add_constraint(joint).unwrap();

    for step in 0..120 {
        space.step(DT);
        let y = space.body(slider).unwrap().position().y;
        assert!(y.abs() < 0.1, "step {step}: y = {y}");
    }
    assert!(space.body(slider).unwrap().position().x > 3.0);
}
