//! Bodies resting on static ground: settling, penetration, energy and warm
//! starting.

use nalgebra::Vector2;
use nova_core::{ContactPositionCorrection, Space, SpaceSettings};

use crate::common::{add_ground, boxed, circle, energy, init_tracing, run, DT};

#[test]
fn test_dropped_circle_comes_to_rest() {
    init_tracing();
    let mut space = Space::new();
    add_ground(&mut space, 40.0);
    let ball = space.add_body(circle(Vector2::new(0.0, 10.0), 0.5)).unwrap();
    let slop = space.settings().penetration_slop;

    run(&mut space, 200);

    let body = space.body(ball).unwrap();
    assert!(
        body.linear_velocity().y.abs() < 0.05,
        "still moving at {}",
        body.linear_velocity().y
    );
    let penetration = 0.5 - body.position().y;
    assert!(penetration <= slop + 1e-3, "penetration {penetration}");
    assert!(penetration > -0.01, "hovering at {}", body.position().y);
}

#[test]
fn test_resting_penetration_stays_below_slop() {
    let mut space = Space::new();
    add_ground(&mut space, 40.0);
    let ball = space.add_body(circle(Vector2::new(0.0, 10.0), 0.5)).unwrap();
    let slop = space.settings().penetration_slop;

    run(&mut space, 150);
    for _ in 0..200 {
        space.step(DT);
        let y = space.body(ball).unwrap().position().y;
        assert!(0.5 - y <= slop + 1e-3, "penetration {}", 0.5 - y);
    }
}

#[test]
fn test_resting_body_does_not_gain_energy() {
    let mut space = Space::new();
    add_ground(&mut space, 40.0);
    let ball = space.add_body(circle(Vector2::new(0.0, 0.5), 0.5)).unwrap();

    run(&mut space, 30);
    let mut previous = energy(&space, ball);
    for step in 0..500 {
        space.step(DT);
        let current = energy(&space, ball);
        assert!(
            current <= previous + 1e-6,
            "energy rose from {previous} to {current} at step {step}"
        );
        previous = current;
    }
    assert!(previous < 1e-6);
}

#[test]
fn test_warm_started_contact_converges_for_any_substeps() {
    for substeps in [1, 2, 4] {
        let settings = SpaceSettings::default()
            .with_substeps(substeps)
            .with_iterations(10, 4, 5)
            .with_warmstarting(true);
        let mut space = Space::with_settings(settings).unwrap();
        add_ground(&mut space, 40.0);
        let ball = space.add_body(circle(Vector2::new(0.0, 0.5), 0.5)).unwrap();

        run(&mut space, 120);
        let vy = space.body(ball).unwrap().linear_velocity().y;
        assert!(vy.abs() < 1e-3, "substeps {substeps}: vy = {vy}");
    }
}

#[test]
fn test_warm_start_carries_impulse_between_frames() {
    let mut space = Space::new();
    let ground = add_ground(&mut space, 40.0);
    let ball = space.add_body(circle(Vector2::new(0.0, 0.5), 0.5)).unwrap();
    run(&mut space, 60);

    let pair = &space.contacts().pairs()[0];
    assert!(pair.ids.involves_body(ground) && pair.ids.involves_body(ball));
    assert!(pair.contacts.iter().all(|c| c.is_persisted));
    // The accumulated impulse balances gravity over one step
    let mass = space.body(ball).unwrap().mass();
    let expected = mass * 9.81 * DT;
    let total = pair.total_normal_impulse();
    assert!((total - expected).abs() < 0.1 * expected, "impulse {total} vs {expected}");
}

#[test]
fn test_box_stack_stays_upright() {
    let mut space = Space::new();
    add_ground(&mut space, 40.0);
    let ids: Vec<_> = (0..3)
        .map(|i| {
            space
                .add_body(boxed(Vector2::new(0.0, 0.5 + f64::from(i)), 1.0, 1.0))
                .unwrap()
        })
        .collect();

    run(&mut space, 300);

    for (i, id) in ids.iter().enumerate() {
        let body = space.body(*id).unwrap();
        let expected_y = 0.5 + i as f64;
        assert!((body.position().y - expected_y).abs() < 0.15, "box {i} at {}", body.position());
        assert!(body.position().x.abs() < 0.1, "box {i} slid to {}", body.position().x);
        assert!(body.angle().abs() < 0.05, "box {i} tilted {}", body.angle());
    }
}

#[test]
fn test_ngs_stack_stays_upright() {
    let settings =
        SpaceSettings::default().with_position_correction(ContactPositionCorrection::Ngs);
    let mut space = Space::with_settings(settings).unwrap();
    add_ground(&mut space, 40.0);
    let block = space.add_body(boxed(Vector2::new(0.0, 0.5), 1.0, 1.0)).unwrap();

    run(&mut space, 300);
    let body = space.body(block).unwrap();
    assert!((body.position().y - 0.5).abs() < 0.1);
    assert!(body.angle().abs() < 0.05);
}
