//! Contact listener callbacks and deferred removal.

use std::sync::Arc;

use nalgebra::Vector2;
use nova_core::{BodyId, ContactEvent, ContactEventKind, ContactListener, RemovalQueue, Space};
use parking_lot::Mutex;

use crate::common::{add_ground, circle, init_tracing, run, DT};

/// Records every event it sees.
#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<ContactEvent>>>,
}

impl Recorder {
    fn kinds(&self) -> Vec<ContactEventKind> {
        self.events.lock().iter().map(|e| e.kind).collect()
    }

    fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ContactListener for Recorder {
    fn on_contact_added(&mut self, event: &ContactEvent, _removals: &mut RemovalQueue) {
        self.events.lock().push(*event);
    }

    fn on_contact_persisted(&mut self, event: &ContactEvent, _removals: &mut RemovalQueue) {
        self.events.lock().push(*event);
    }

    fn on_contact_removed(&mut self, event: &ContactEvent, _removals: &mut RemovalQueue) {
        self.events.lock().push(*event);
    }
}

/// Removes `target` the first time it touches anything.
struct Destroyer {
    target: BodyId,
    fired: Arc<Mutex<usize>>,
}

impl ContactListener for Destroyer {
    fn on_contact_added(&mut self, event: &ContactEvent, removals: &mut RemovalQueue) {
        if event.body_a == self.target || event.body_b == self.target {
            *self.fired.lock() += 1;
            removals.push(self.target);
        }
    }
}

#[test]
fn test_added_then_persisted() {
    init_tracing();
    let mut space = Space::new();
    let ground = add_ground(&mut space, 40.0);
    let ball = space.add_body(circle(Vector2::new(0.0, 2.0), 0.5)).unwrap();
    let recorder = Recorder::default();
    space.set_contact_listener(recorder.clone());

    run(&mut space, 120);

    let events = recorder.events.lock().clone();
    let first = events.first().expect("no contact reported");
    assert_eq!(first.kind, ContactEventKind::Added);
    assert!([first.body_a, first.body_b].contains(&ground));
    assert!([first.body_a, first.body_b].contains(&ball));
    assert!(first.normal.norm() > 0.99);

    let last = events.last().unwrap();
    assert_eq!(last.kind, ContactEventKind::Persisted);
    assert!(last.normal_impulse > 0.0);
}

#[test]
fn test_removed_when_bodies_separate() {
    let mut space = Space::new();
    add_ground(&mut space, 40.0);
    let ball = space.add_body(circle(Vector2::new(0.0, 0.5), 0.5)).unwrap();
    let recorder = Recorder::default();
    space.set_contact_listener(recorder.clone());

    run(&mut space, 30);
    assert!(recorder.kinds().contains(&ContactEventKind::Persisted));
    recorder.clear();

    space
        .body_mut(ball)
        .unwrap()
        .set_linear_velocity(Vector2::new(0.0, 10.0));
    run(&mut space, 10);

    let kinds = recorder.kinds();
    assert!(kinds.contains(&ContactEventKind::Removed), "got {kinds:?}");
    assert!(!kinds.contains(&ContactEventKind::Added));
    assert_eq!(space.contacts().active_count(), 0);
}

#[test]
fn test_listener_removal_is_deferred_to_end_of_step() {
    let mut space = Space::new();
    add_ground(&mut space, 40.0);
    let doomed = space.add_body(circle(Vector2::new(0.0, 2.0), 0.5)).unwrap();
    let bystander = space.add_body(circle(Vector2::new(5.0, 0.5), 0.5)).unwrap();
    let fired = Arc::new(Mutex::new(0));
    space.set_contact_listener(Destroyer {
        target: doomed,
        fired: Arc::clone(&fired),
    });

    for _ in 0..120 {
        space.step(DT);
        if !space.contains_body(doomed) {
            break;
        }
    }

    assert!(!space.contains_body(doomed));
    assert_eq!(*fired.lock(), 1);
    assert!(space.contains_body(bystander));
    assert!(space
        .contacts()
        .pairs()
        .iter()
        .all(|p| !p.ids.involves_body(doomed)));

    // The bystander keeps simulating normally
    run(&mut space, 30);
    assert!((space.body(bystander).unwrap().position().y - 0.5).abs() < 0.05);
}

#[test]
fn test_queue_removal_from_caller() {
    let mut space = Space::new();
    let ball = space.add_body(circle(Vector2::new(0.0, 2.0), 0.5)).unwrap();
    space.queue_removal(ball);
    assert!(space.contains_body(ball));

    space.step(DT);
    assert!(!space.contains_body(ball));
    assert_eq!(space.body_count(), 0);
}

#[test]
fn test_take_listener_stops_events() {
    let mut space = Space::new();
    add_ground(&mut space, 40.0);
    space.add_body(circle(Vector2::new(0.0, 0.5), 0.5)).unwrap();
    let recorder = Recorder::default();
    space.set_contact_listener(recorder.clone());

    run(&mut space, 5);
    assert!(!recorder.kinds().is_empty());
    assert!(space.take_contact_listener().is_some());
    recorder.clear();

    run(&mut space, 5);
    assert!(recorder.kinds().is_empty());
}
