//! Sequential-impulse contact solver.
//!
//! Per step: [`presolve`] every active pair, [`warmstart`], then repeat
//! [`solve_velocity`] for the configured number of iterations. With
//! [`ContactPositionCorrection::Ngs`] the step runs [`solve_position`] after
//! velocities have been integrated into poses.
//!
//! Each function works on one pair and the two bodies it references; the
//! caller resolves the bodies and keeps the argument order `a`, `b`
//! consistent with the pair's ids.

use nalgebra::Vector2;
use nova_body::RigidBody;
use nova_types::math::{calc_mass_k, perpr, relative_velocity, rotate};
use nova_types::{ContactPositionCorrection, SpaceSettings};

use crate::contact::PersistentContactPair;

fn inverse_or_zero(k: f64) -> f64 {
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

/// Prepare a pair for the velocity iterations.
///
/// Mixes the materials, computes effective masses, the restitution bias and,
/// for Baumgarte correction, the position bias. Also records the anchors the
/// NGS pass needs.
pub fn presolve(
    pair: &mut PersistentContactPair,
    a: &RigidBody,
    b: &RigidBody,
    settings: &SpaceSettings,
    inv_dt: f64,
) {
    let normal = pair.normal;
    let tangent = perpr(normal);

    pair.restitution = settings
        .restitution_mix
        .mix(a.material().restitution, b.material().restitution);
    pair.friction = settings
        .friction_mix
        .mix(a.material().friction, b.material().friction);

    let baumgarte = settings.contact_position_correction == ContactPositionCorrection::Baumgarte;

    for contact in &mut pair.contacts {
        if contact.separation > 0.0 {
            continue;
        }
        let ra = contact.anchor_a;
        let rb = contact.anchor_b;
        let info = &mut contact.solver_info;

        info.mass_normal = inverse_or_zero(calc_mass_k(
            normal,
            ra,
            rb,
            a.invmass(),
            b.invmass(),
            a.invinertia(),
            b.invinertia(),
        ));
        info.mass_tangent = inverse_or_zero(calc_mass_k(
            tangent,
            ra,
            rb,
            a.invmass(),
            b.invmass(),
            a.invinertia(),
            b.invinertia(),
        ));

        let rv = relative_velocity(
            a.linear_velocity(),
            a.angular_velocity(),
            ra,
            b.linear_velocity(),
            b.angular_velocity(),
            rb,
        );
        let vn = rv.dot(&normal);

        info.velocity_bias = 0.0;
        if vn < -settings.restitution_velocity_threshold {
            info.velocity_bias = pair.restitution * vn;
        }

        info.position_bias = 0.0;
        if baumgarte {
            info.position_bias = settings.baumgarte
                * inv_dt
                * (contact.separation + settings.penetration_slop).min(0.0);
            // Restitution already pushes harder than the correction would
            if info.velocity_bias < info.position_bias {
                info.velocity_bias -= info.position_bias;
            }
        }

        info.local_anchor_a = rotate(ra, -a.angle());
        info.local_anchor_b = rotate(rb, -b.angle());
        let gap = ((b.position() + rb) - (a.position() + ra)).dot(&normal);
        info.adjusted_separation = contact.separation - gap;
    }
}

/// Reapply last frame's accumulated impulses, or zero them.
///
/// Only persisted points are warm started; new points always start at zero.
pub fn warmstart(
    pair: &mut PersistentContactPair,
    a: &mut RigidBody,
    b: &mut RigidBody,
    settings: &SpaceSettings,
) {
    let normal = pair.normal;
    let tangent = perpr(normal);

    for contact in &mut pair.contacts {
        let info = &mut contact.solver_info;
        if !settings.warmstarting || !contact.is_persisted {
            info.normal_impulse = 0.0;
            info.tangent_impulse = 0.0;
            continue;
        }
        if contact.separation > 0.0 {
            continue;
        }

        let impulse = normal * info.normal_impulse + tangent * info.tangent_impulse;
        a.apply_impulse(-impulse, contact.anchor_a);
        b.apply_impulse(impulse, contact.anchor_b);
    }
}

/// One velocity iteration: friction for every point, then the normal.
///
/// The accumulated friction impulse stays within the Coulomb box
/// `[-mu * jn, mu * jn]`; the accumulated normal impulse never pulls.
pub fn solve_velocity(pair: &mut PersistentContactPair, a: &mut RigidBody, b: &mut RigidBody) {
    let normal = pair.normal;
    let tangent = perpr(normal);
    let friction = pair.friction;

    let velocity = |a: &RigidBody, b: &RigidBody, ra: Vector2<f64>, rb: Vector2<f64>| {
        relative_velocity(
            a.linear_velocity(),
            a.angular_velocity(),
            ra,
            b.linear_velocity(),
            b.angular_velocity(),
            rb,
        )
    };

    if friction > 0.0 {
        for contact in &mut pair.contacts {
            if contact.separation > 0.0 {
                continue;
            }
            let (ra, rb) = (contact.anchor_a, contact.anchor_b);
            let info = &mut contact.solver_info;

            let rv = velocity(a, b, ra, rb);
            let lambda = -rv.dot(&tangent) * info.mass_tangent;

            let max_friction = info.normal_impulse * friction;
            let previous = info.tangent_impulse;
            info.tangent_impulse = (previous + lambda).clamp(-max_friction, max_friction);
            let applied = info.tangent_impulse - previous;

            let impulse = tangent * applied;
            a.apply_impulse(-impulse, ra);
            b.apply_impulse(impulse, rb);
        }
    }

    for contact in &mut pair.contacts {
        if contact.separation > 0.0 {
            continue;
        }
        let (ra, rb) = (contact.anchor_a, contact.anchor_b);
        let info = &mut contact.solver_info;

        let rv = velocity(a, b, ra, rb);
        let vn = rv.dot(&normal);
        let lambda = -(vn + info.velocity_bias + info.position_bias) * info.mass_normal;

        let previous = info.normal_impulse;
        info.normal_impulse = (previous + lambda).max(0.0);
        let applied = info.normal_impulse - previous;

        let impulse = normal * applied;
        a.apply_impulse(-impulse, ra);
        b.apply_impulse(impulse, rb);
    }
}

/// One NGS iteration: push the bodies apart along the normal without
/// touching their velocities.
///
/// The separation is re-derived from the bodies' current poses using the
/// anchors recorded by [`presolve`]. Each correction is clamped to
/// `max_linear_correction`.
pub fn solve_position(
    pair: &PersistentContactPair,
    a: &mut RigidBody,
    b: &mut RigidBody,
    settings: &SpaceSettings,
) {
    let normal = pair.normal;

    for contact in &pair.contacts {
        let info = &contact.solver_info;
        let ra = rotate(info.local_anchor_a, a.angle());
        let rb = rotate(info.local_anchor_b, b.angle());

        let gap = ((b.position() + rb) - (a.position() + ra)).dot(&normal);
        let separation = gap + info.adjusted_separation;

        let correction = (settings.baumgarte * (separation + settings.penetration_slop))
            .clamp(-settings.max_linear_correction, 0.0);
        if correction >= 0.0 {
            continue;
        }

        let k = calc_mass_k(
            normal,
            ra,
            rb,
            a.invmass(),
            b.invmass(),
            a.invinertia(),
            b.invinertia(),
        );
        let impulse = normal * (-correction * inverse_or_zero(k));

        a.apply_pseudo_impulse(-impulse, ra);
        b.apply_pseudo_impulse(impulse, rb);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::collision::{Collision, ContactPoint};
    use crate::contact::{ContactPairIds, ContactState};
    use crate::manager::ContactManager;
    use approx::assert_relative_eq;
    use nova_body::RigidBodyInit;
    use nova_shape::Shape;
    use nova_types::{BodyId, Material, ShapeId};
    use smallvec::smallvec;

    const DT: f64 = 1.0 / 60.0;

    fn ground() -> RigidBody {
        let mut body = RigidBody::with_shape(
            RigidBodyInit::fixed(Vector2::zeros()),
            Shape::rect(10.0, 2.0, Vector2::zeros()).unwrap(),
        )
        .unwrap();
        body.set_id(BodyId(1));
        body
    }

    fn ball(y: f64, vy: f64, material: Material) -> RigidBody {
        let mut body = RigidBody::with_shape(
            RigidBodyInit::dynamic(Vector2::new(0.0, y)).with_material(material),
            Shape::circle(Vector2::zeros(), 1.0).unwrap(),
        )
        .unwrap();
        body.set_id(BodyId(2));
        body.set_linear_velocity(Vector2::new(0.0, vy));
        body
    }

    /// A pair with one contact at the top of the ground.
    fn pair_for(a: &RigidBody, b: &RigidBody, separation: f64) -> PersistentContactPair {
        let mut manager = ContactManager::new(1);
        let point = Vector2::new(0.0, 1.0);
        let collision = Collision {
            collision: true,
            normal: Vector2::y(),
            depth: -separation,
            points: smallvec![ContactPoint {
                position: point,
                separation,
                id: 0,
            }],
        };
        let ids = ContactPairIds {
            body_a: a.id(),
            body_b: b.id(),
            shape_a: ShapeId(100),
            shape_b: ShapeId(200),
        };
        manager.begin_pass();
        manager.upsert(ids, &collision, a.position(), b.position());
        manager.end_pass();
        manager.pairs()[0].clone()
    }

    fn run(pair: &mut PersistentContactPair, a: &mut RigidBody, b: &mut RigidBody, s: &SpaceSettings) {
        presolve(pair, a, b, s, 1.0 / DT);
        warmstart(pair, a, b, s);
        for _ in 0..s.velocity_iterations {
            solve_velocity(pair, a, b);
        }
    }

    #[test]
    fn test_normal_impulse_stops_approach() {
        let settings = SpaceSettings::default();
        let mut g = ground();
        let mut b = ball(1.99, -0.5, Material::BASIC.with_restitution(0.0));
        let mut pair = pair_for(&g, &b, -0.01);

        run(&mut pair, &mut g, &mut b, &settings);
        assert!(b.linear_velocity().y >= -1e-9);
        assert!(pair.contacts[0].solver_info.normal_impulse > 0.0);
        assert_eq!(g.linear_velocity(), Vector2::zeros());
    }

    #[test]
    fn test_restitution_bounce() {
        let settings = SpaceSettings::default().with_position_correction(ContactPositionCorrection::Ngs);
        let mut g = ground();
        let mut b = ball(1.99, -5.0, Material::BASIC.with_restitution(1.0));
        let mut pair = pair_for(&g, &b, -0.01);

        run(&mut pair, &mut g, &mut b, &settings);
        // sqrt mixing of 1.0 with the ground's restitution
        let e = pair.restitution;
        assert_relative_eq!(b.linear_velocity().y, 5.0 * e, epsilon = 1e-9);
    }

    #[test]
    fn test_slow_contact_gets_no_restitution() {
        let settings = SpaceSettings::default().with_position_correction(ContactPositionCorrection::Ngs);
        let mut g = ground();
        let mut b = ball(1.99, -0.5, Material::BASIC.with_restitution(1.0));
        let mut pair = pair_for(&g, &b, -0.01);

        run(&mut pair, &mut g, &mut b, &settings);
        assert_relative_eq!(b.linear_velocity().y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_friction_is_bounded_by_coulomb_cone() {
        let settings = SpaceSettings::default();
        let mut g = ground();
        let mut b = ball(1.99, -1.0, Material::BASIC.with_friction(0.5).with_restitution(0.0));
        b.set_linear_velocity(Vector2::new(10.0, -1.0));
        let mut pair = pair_for(&g, &b, -0.01);

        run(&mut pair, &mut g, &mut b, &settings);
        let info = pair.contacts[0].solver_info;
        assert!(info.tangent_impulse.abs() <= info.normal_impulse * pair.friction + 1e-12);
        assert!(b.linear_velocity().x < 10.0);
    }

    #[test]
    fn test_frictionless_keeps_tangent_velocity() {
        let settings = SpaceSettings::default();
        let mut g = ground();
        let mut b = ball(1.99, -1.0, Material::BASIC.with_friction(0.0));
        b.set_linear_velocity(Vector2::new(3.0, -1.0));
        let mut pair = pair_for(&g, &b, -0.01);

        run(&mut pair, &mut g, &mut b, &settings);
        assert_relative_eq!(b.linear_velocity().x, 3.0, epsilon = 1e-12);
        assert_eq!(pair.contacts[0].solver_info.tangent_impulse, 0.0);
    }

    #[test]
    fn test_baumgarte_bias_only_beyond_slop() {
        let settings = SpaceSettings::default();
        let g = ground();
        let b = ball(1.99, 0.0, Material::BASIC);

        let mut shallow = pair_for(&g, &b, -0.01);
        presolve(&mut shallow, &g, &b, &settings, 1.0 / DT);
        assert_eq!(shallow.contacts[0].solver_info.position_bias, 0.0);

        let mut deep = pair_for(&g, &b, -0.25);
        presolve(&mut deep, &g, &b, &settings, 1.0 / DT);
        let expected = settings.baumgarte / DT * (-0.25 + settings.penetration_slop);
        assert_relative_eq!(deep.contacts[0].solver_info.position_bias, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_warmstart_disabled_zeroes_accumulators() {
        let settings = SpaceSettings::default().with_warmstarting(false);
        let mut g = ground();
        let mut b = ball(1.99, 0.0, Material::BASIC);
        let mut pair = pair_for(&g, &b, -0.01);
        pair.contacts[0].is_persisted = true;
        pair.contacts[0].solver_info.normal_impulse = 4.0;
        pair.state = ContactState::Normal;

        presolve(&mut pair, &g, &b, &settings, 1.0 / DT);
        warmstart(&mut pair, &mut g, &mut b, &settings);
        assert_eq!(pair.contacts[0].solver_info.normal_impulse, 0.0);
        assert_eq!(b.linear_velocity(), Vector2::zeros());
    }

    #[test]
    fn test_warmstart_applies_persisted_impulse() {
        let settings = SpaceSettings::default();
        let mut g = ground();
        let mut b = ball(1.99, 0.0, Material::BASIC);
        let mut pair = pair_for(&g, &b, -0.01);
        pair.contacts[0].is_persisted = true;
        pair.contacts[0].solver_info.normal_impulse = 2.0;

        warmstart(&mut pair, &mut g, &mut b, &settings);
        assert_relative_eq!(b.linear_velocity().y, 2.0 * b.invmass(), epsilon = 1e-12);
    }

    #[test]
    fn test_ngs_pushes_out_without_velocity() {
        let settings = SpaceSettings::default().with_position_correction(ContactPositionCorrection::Ngs);
        let mut g = ground();
        let mut b = ball(1.7, 0.0, Material::BASIC);
        let mut pair = pair_for(&g, &b, -0.3);

        presolve(&mut pair, &g, &b, &settings, 1.0 / DT);
        assert_eq!(pair.contacts[0].solver_info.position_bias, 0.0);

        let before = b.position().y;
        for _ in 0..settings.position_iterations {
            solve_position(&pair, &mut g, &mut b, &settings);
        }
        assert!(b.position().y > before);
        assert!(b.position().y <= 2.0);
        assert_eq!(b.linear_velocity(), Vector2::zeros());
        assert_eq!(g.position(), Vector2::zeros());
    }
}
