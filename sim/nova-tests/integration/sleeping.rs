//! Resting bodies fall asleep and wake when something hits them.

use nalgebra::Vector2;
use nova_core::{Space, SpaceSettings};

use crate::common::{add_ground, circle, init_tracing, run, DT};

fn sleepy_scene() -> (Space, Vec<nova_core::BodyId>) {
    let mut space = Space::with_settings(SpaceSettings::default().with_sleeping(true)).unwrap();
    add_ground(&mut space, 40.0);
    let balls = [-4.0, 0.0, 4.0]
        .into_iter()
        .map(|x| space.add_body(circle(Vector2::new(x, 0.5), 0.5)).unwrap())
        .collect();
    (space, balls)
}

#[test]
fn test_resting_bodies_fall_asleep() {
    init_tracing();
    let (mut space, balls) = sleepy_scene();

    run(&mut space, 10);
    assert_eq!(space.broadphase_pair_count(), 3);
    assert!(balls.iter().all(|id| !space.body(*id).unwrap().is_sleeping()));

    run(&mut space, 190);
    for id in &balls {
        let body = space.body(*id).unwrap();
        assert!(body.is_sleeping(), "{id} still awake");
        assert_eq!(body.linear_velocity(), Vector2::zeros());
    }
    // Sleeping bodies resting on static ground drop out of the broad phase
    assert_eq!(space.broadphase_pair_count(), 0);
    assert_eq!(space.contacts().active_count(), 0);

    // And stay put without support
    let heights: Vec<f64> = balls.iter().map(|id| space.body(*id).unwrap().position().y).collect();
    run(&mut space, 60);
    for (id, y) in balls.iter().zip(heights) {
        assert_eq!(space.body(*id).unwrap().position().y, y);
    }
}

#[test]
fn test_falling_body_wakes_sleeper() {
    let (mut space, balls) = sleepy_scene();
    run(&mut space, 200);
    assert!(space.body(balls[1]).unwrap().is_sleeping());

    space.add_body(circle(Vector2::new(0.0, 5.0), 0.5)).unwrap();
    let mut woke = false;
    for _ in 0..90 {
        space.step(DT);
        woke |= !space.body(balls[1]).unwrap().is_sleeping();
        // Bodies out of reach keep sleeping
        assert!(space.body(balls[0]).unwrap().is_sleeping());
        assert!(space.body(balls[2]).unwrap().is_sleeping());
    }
    assert!(woke, "struck body never woke");
}

#[test]
fn test_sleeping_disabled_keeps_bodies_awake() {
    let mut space = Space::new();
    add_ground(&mut space, 40.0);
    let ball = space.add_body(circle(Vector2::new(0.0, 0.5), 0.5)).unwrap();

    run(&mut space, 300);
    assert!(!space.body(ball).unwrap().is_sleeping());
    assert_eq!(space.broadphase_pair_count(), 1);
}
