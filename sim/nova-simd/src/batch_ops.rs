//! Batched integration passes over rigid bodies.
//!
//! Awake dynamic bodies are gathered four at a time into [`Vec2x4`] lanes,
//! integrated, and scattered back. Leftover bodies fall through to the scalar
//! per-body path, so both routes give the same result.

use nalgebra::Vector2;
use nova_body::RigidBody;

use crate::vec2x4::{mul_add_scalar, mul_scalar, Vec2x4};

/// Indices of bodies that take part in integration.
fn awake_dynamic(bodies: &[RigidBody]) -> Vec<usize> {
    bodies
        .iter()
        .enumerate()
        .filter(|(_, b)| !b.is_static() && !b.is_sleeping())
        .map(|(i, _)| i)
        .collect()
}

// =============================================================================
// Accelerations
// =============================================================================

/// Integrate forces, gravity and damping into velocities.
///
/// Static bodies have their velocities reset; sleeping bodies are skipped.
/// Equivalent to calling [`RigidBody::integrate_accelerations`] on each
/// awake body.
pub fn batch_integrate_accelerations(
    bodies: &mut [RigidBody],
    gravity: Vector2<f64>,
    linear_damping: f64,
    angular_damping: f64,
    dt: f64,
) {
    for body in bodies.iter_mut().filter(|b| b.is_static()) {
        body.reset_velocities();
    }

    let active = awake_dynamic(bodies);
    let mut chunks = active.chunks_exact(4);

    for chunk in &mut chunks {
        let mut velocity = Vec2x4::zeros();
        let mut force_term = Vec2x4::zeros();
        let mut gravity_scale = [0.0; 4];
        let mut angular = [0.0; 4];
        let mut angular_accel = [0.0; 4];
        let mut linear_factor = [0.0; 4];
        let mut angular_factor = [0.0; 4];

        for (lane, &i) in chunk.iter().enumerate() {
            let b = &bodies[i];
            velocity.set(lane, b.linear_velocity());
            force_term.set(lane, b.force() * b.invmass());
            gravity_scale[lane] = b.gravity_scale();
            angular[lane] = b.angular_velocity();
            angular_accel[lane] = b.torque() * b.invinertia();
            linear_factor[lane] = b.linear_damping_factor(linear_damping);
            angular_factor[lane] = b.angular_damping_factor(angular_damping);
        }

        let accel = force_term.add(&Vec2x4::splat(gravity).scale_each(gravity_scale));
        let velocity = velocity.mul_add(&accel, dt).scale_each(linear_factor);
        let angular = mul_scalar(mul_add_scalar(angular, angular_accel, dt), angular_factor);

        for (lane, &i) in chunk.iter().enumerate() {
            let b = &mut bodies[i];
            let (position, angle) = (b.position(), b.angle());
            b.store_integrated(velocity.get(lane), angular[lane], position, angle);
        }
    }

    for &i in chunks.remainder() {
        bodies[i].integrate_accelerations(gravity, linear_damping, angular_damping, dt);
    }
}

// =============================================================================
// Velocities
// =============================================================================

/// Advance poses by the current velocities and clear accumulated forces.
///
/// Equivalent to calling [`RigidBody::integrate_velocities`] on each awake
/// body.
pub fn batch_integrate_velocities(bodies: &mut [RigidBody], dt: f64) {
    for body in bodies.iter_mut().filter(|b| b.is_static()) {
        body.reset_velocities();
    }

    let active = awake_dynamic(bodies);
    let mut chunks = active.chunks_exact(4);

    for chunk in &mut chunks {
        let mut position = Vec2x4::zeros();
        let mut velocity = Vec2x4::zeros();
        let mut angle = [0.0; 4];
        let mut angular = [0.0; 4];

        for (lane, &i) in chunk.iter().enumerate() {
            let b = &bodies[i];
            position.set(lane, b.position());
            velocity.set(lane, b.linear_velocity());
            angle[lane] = b.angle();
            angular[lane] = b.angular_velocity();
        }

        let position = position.mul_add(&velocity, dt);
        let angle = mul_add_scalar(angle, angular, dt);

        for (lane, &i) in chunk.iter().enumerate() {
            let b = &mut bodies[i];
            b.store_integrated(velocity.get(lane), angular[lane], position.get(lane), angle[lane]);
            b.clear_forces();
        }
    }

    for &i in chunks.remainder() {
        bodies[i].integrate_velocities(dt);
    }
}
