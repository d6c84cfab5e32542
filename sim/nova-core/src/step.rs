//! The simulation step.
//!
//! One call to [`Space::step`] runs the whole pipeline `substeps` times with
//! `dt / substeps`:
//!
//! 1. integrate forces and gravity into velocities
//! 2. broad phase over body AABBs
//! 3. narrow phase and persistent contact update
//! 4. contact listener callbacks
//! 5. presolve and warm start of contacts and joints
//! 6. velocity iterations (joints, then contacts)
//! 7. integrate velocities into poses, remove bodies outside the kill bounds
//! 8. NGS position correction, when selected
//! 9. sleeping
//!
//! Removals queued by the listener are applied once the last substep is done.
//! The step never fails; a non-positive or non-finite `dt` is ignored.

use std::time::{Duration, Instant};

use hashbrown::HashSet;
use nova_broadphase::BroadPhaseProxy;
use nova_contact::{
    collide_shapes, presolve, solve_position, solve_velocity, warmstart, ContactEventKind,
    ContactPairIds,
};
use nova_types::{pair_key, BodyId, ContactPositionCorrection};
use tracing::{debug, info, trace, warn};

use crate::space::{bodies_by_id, constraint_bodies, Space};

/// Per-phase timings and counts of the last [`Space::step`].
///
/// Durations are summed over substeps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepStats {
    /// Force and gravity integration.
    pub integrate_accelerations: Duration,
    /// Broad phase, including proxy construction.
    pub broadphase: Duration,
    /// Narrow phase and contact bookkeeping.
    pub narrowphase: Duration,
    /// Presolve and warm start.
    pub presolve: Duration,
    /// Velocity iterations.
    pub solve_velocity: Duration,
    /// Pose integration and kill bounds.
    pub integrate_velocities: Duration,
    /// NGS position iterations.
    pub solve_position: Duration,
    /// Sleeping pass.
    pub sleeping: Duration,
    /// Whole step.
    pub total: Duration,
    /// Candidate pairs from the last substep's broad phase.
    pub broadphase_pairs: usize,
    /// Persistent pairs touching this step.
    pub active_contacts: usize,
    /// Bodies removed by the kill bounds.
    pub killed_bodies: usize,
}

impl Space {
    /// Advance the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        if !(dt.is_finite() && dt > 0.0) {
            warn!(dt, "ignoring step with invalid dt");
            return;
        }

        let start = Instant::now();
        self.stats = StepStats::default();

        let substeps = self.settings.substeps.max(1);
        let sub_dt = dt / substeps as f64;
        for _ in 0..substeps {
            self.substep(sub_dt);
        }

        self.flush_removals();

        self.time += dt;
        self.step_count += 1;
        self.stats.total = start.elapsed();
        trace!(
            bodies = self.bodies.len(),
            pairs = self.stats.broadphase_pairs,
            contacts = self.stats.active_contacts,
            "step finished"
        );
    }

    fn substep(&mut self, dt: f64) {
        let inv_dt = 1.0 / dt;
        self.purge_removed_shapes();

        let t = Instant::now();
        self.integrate_accelerations(dt);
        self.stats.integrate_accelerations += t.elapsed();

        let t = Instant::now();
        let candidates = self.find_pairs();
        self.stats.broadphase += t.elapsed();

        let t = Instant::now();
        self.narrowphase(&candidates, dt);
        self.dispatch_events();
        self.stats.narrowphase += t.elapsed();

        let t = Instant::now();
        self.prepare_solvers(dt, inv_dt);
        self.stats.presolve += t.elapsed();

        let t = Instant::now();
        self.solve_velocities(inv_dt);
        self.stats.solve_velocity += t.elapsed();

        let t = Instant::now();
        self.integrate_velocities(dt);
        self.apply_kill_bounds();
        self.stats.integrate_velocities += t.elapsed();

        if self.settings.contact_position_correction == ContactPositionCorrection::Ngs {
            let t = Instant::now();
            self.solve_positions();
            self.stats.solve_position += t.elapsed();
        }

        let t = Instant::now();
        self.update_sleeping(dt);
        self.stats.sleeping += t.elapsed();
    }

    // ========================================================================
    // Integration
    // ========================================================================

    fn integrate_accelerations(&mut self, dt: f64) {
        let s = &self.settings;
        if self.batch_integration {
            nova_simd::batch_integrate_accelerations(
                &mut self.bodies,
                s.gravity,
                s.linear_damping,
                s.angular_damping,
                dt,
            );
            return;
        }
        for body in self.bodies.iter_mut().filter(|b| !b.is_sleeping()) {
            body.integrate_accelerations(s.gravity, s.linear_damping, s.angular_damping, dt);
        }
    }

    fn integrate_velocities(&mut self, dt: f64) {
        if self.batch_integration {
            nova_simd::batch_integrate_velocities(&mut self.bodies, dt);
            return;
        }
        for body in self.bodies.iter_mut().filter(|b| !b.is_sleeping()) {
            body.integrate_velocities(dt);
        }
    }

    fn apply_kill_bounds(&mut self) {
        let Some(bounds) = self.settings.kill_bounds else {
            return;
        };
        let doomed: Vec<BodyId> = self
            .bodies
            .iter()
            .filter(|b| !bounds.contains_point(b.position()))
            .map(|b| b.id())
            .collect();

        for id in doomed {
            if let Ok(body) = self.remove_body(id) {
                info!(%id, position = ?body.position(), "body left the kill bounds");
                self.stats.killed_bodies += 1;
            }
        }
    }

    // ========================================================================
    // Collision detection
    // ========================================================================

    fn find_pairs(&mut self) -> Vec<nova_broadphase::BroadPhasePair> {
        let proxies: Vec<BroadPhaseProxy> = self
            .bodies
            .iter_mut()
            .map(|body| {
                body.sync_transform();
                BroadPhaseProxy {
                    id: body.id(),
                    aabb: body.aabb(),
                    position: body.position(),
                    speed: body.linear_velocity().norm(),
                    filter: body.filter(),
                    is_static: body.is_static(),
                    is_sleeping: body.is_sleeping(),
                    collision_enabled: body.collision_enabled(),
                }
            })
            .collect();

        let pairs = self
            .broadphase
            .find_candidate_pairs(&proxies, self.settings.sleeping);
        self.stats.broadphase_pairs = pairs.len();
        pairs
    }

    fn narrowphase(&mut self, candidates: &[nova_broadphase::BroadPhasePair], dt: f64) {
        let ignored: HashSet<(u64, u64)> = self
            .constraints
            .iter()
            .filter(|c| c.ignore_collision())
            .filter_map(|c| Some(pair_key(c.body_a()?.raw(), c.body_b()?.raw())))
            .collect();

        let sleeping = self.settings.sleeping;
        let wake_threshold = self.settings.wake_energy_threshold;
        let mut to_wake = Vec::new();

        self.contacts.begin_pass();
        for pair in candidates {
            let (a, b) = (&self.bodies[pair.a], &self.bodies[pair.b]);
            if ignored.contains(&pair_key(a.id().raw(), b.id().raw())) {
                continue;
            }

            let mut touching = false;
            for shape_a in a.shapes() {
                for shape_b in b.shapes() {
                    if !shape_a.world_aabb().overlaps(&shape_b.world_aabb()) {
                        continue;
                    }
                    let collision = collide_shapes(shape_a, shape_b);
                    if !collision.collision {
                        continue;
                    }
                    touching = true;
                    let ids = ContactPairIds {
                        body_a: a.id(),
                        body_b: b.id(),
                        shape_a: shape_a.id(),
                        shape_b: shape_b.id(),
                    };
                    self.contacts
                        .upsert(ids, &collision, a.position(), b.position());
                }
            }

            if touching && sleeping {
                let energetic = |body: &nova_body::RigidBody| {
                    !body.is_static() && !body.is_sleeping() && body.motion_energy(dt) > wake_threshold
                };
                if a.is_sleeping() && energetic(b) {
                    to_wake.push(pair.a);
                }
                if b.is_sleeping() && energetic(a) {
                    to_wake.push(pair.b);
                }
            }
        }
        self.contacts.end_pass();

        for i in to_wake {
            let body = &mut self.bodies[i];
            if body.is_sleeping() {
                body.wake_up();
                debug!(id = %body.id(), "body woken by contact");
            }
        }

        self.stats.active_contacts = self.contacts.active_count();
    }

    fn dispatch_events(&mut self) {
        let events = self.contacts.drain_events();
        let Some(listener) = self.listener.as_mut() else {
            return;
        };
        for event in &events {
            match event.kind {
                ContactEventKind::Added => listener.on_contact_added(event, &mut self.removals),
                ContactEventKind::Persisted => {
                    listener.on_contact_persisted(event, &mut self.removals);
                }
                ContactEventKind::Removed => listener.on_contact_removed(event, &mut self.removals),
            }
        }
    }

    // ========================================================================
    // Solver
    // ========================================================================

    fn prepare_solvers(&mut self, dt: f64, inv_dt: f64) {
        let settings = &self.settings;

        for pair in self.contacts.pairs_mut().iter_mut().filter(|p| p.is_active()) {
            let (a, b) = (pair.ids.body_a, pair.ids.body_b);
            if let Some((a, b)) = bodies_by_id(&mut self.bodies, &self.body_index, a, b) {
                presolve(pair, a, b, settings, inv_dt);
                warmstart(pair, a, b, settings);
            }
        }

        for constraint in &mut self.constraints {
            if let Some(mut bodies) = constraint_bodies(&mut self.bodies, &self.body_index, constraint) {
                constraint.presolve(&mut bodies, settings, dt, inv_dt);
                constraint.warmstart(&mut bodies, settings);
            }
        }
    }

    fn solve_velocities(&mut self, inv_dt: f64) {
        let settings = &self.settings;
        let iterations = settings.velocity_iterations.max(settings.constraint_iterations);

        for i in 0..iterations {
            if i < settings.constraint_iterations {
                for constraint in &mut self.constraints {
                    if let Some(mut bodies) =
                        constraint_bodies(&mut self.bodies, &self.body_index, constraint)
                    {
                        constraint.solve(&mut bodies, settings, inv_dt);
                    }
                }
            }

            if i < settings.velocity_iterations {
                for pair in self.contacts.pairs_mut().iter_mut().filter(|p| p.is_active()) {
                    let (a, b) = (pair.ids.body_a, pair.ids.body_b);
                    if let Some((a, b)) = bodies_by_id(&mut self.bodies, &self.body_index, a, b) {
                        solve_velocity(pair, a, b);
                    }
                }
            }
        }
    }

    fn solve_positions(&mut self) {
        let settings = &self.settings;
        for _ in 0..settings.position_iterations {
            for pair in self.contacts.pairs().iter().filter(|p| p.is_active()) {
                let (a, b) = (pair.ids.body_a, pair.ids.body_b);
                if let Some((a, b)) = bodies_by_id(&mut self.bodies, &self.body_index, a, b) {
                    solve_position(pair, a, b, settings);
                }
            }
        }
    }

    // ========================================================================
    // Sleeping
    // ========================================================================

    fn update_sleeping(&mut self, dt: f64) {
        let settings = &self.settings;

        if !settings.sleeping {
            for body in self.bodies.iter_mut().filter(|b| b.is_sleeping()) {
                body.wake_up();
            }
            return;
        }

        for body in self.bodies.iter_mut().filter(|b| !b.is_static()) {
            let energy = body.motion_energy(dt);

            if body.is_sleeping() {
                // Impulses from awake neighbours land on sleeping bodies too
                if energy > settings.wake_energy_threshold {
                    body.wake_up();
                    debug!(id = %body.id(), energy, "body woken");
                } else {
                    body.reset_velocities();
                }
                continue;
            }

            let resting = energy < settings.sleep_energy_threshold;
            if body.tick_sleep_timer(resting, settings.sleep_timer_threshold) {
                body.put_to_sleep();
                debug!(id = %body.id(), "body fell asleep");
            }
        }
    }
}
