//! Access to the (possibly absent) bodies of a constraint.
//!
//! An absent side acts as a fixed world anchor: zero inverse mass and
//! inertia, zero velocity, and impulses aimed at it are dropped.

use nalgebra::Vector2;
use nova_body::{pair_mut, RigidBody};
use nova_types::math::{calc_mass_k, relative_velocity, rotate};

/// Mutable borrows of the two bodies a constraint connects.
#[derive(Debug)]
pub struct BodyPair<'a> {
    a: Option<&'a mut RigidBody>,
    b: Option<&'a mut RigidBody>,
}

impl<'a> BodyPair<'a> {
    /// Wrap two optional bodies.
    #[must_use]
    pub fn new(a: Option<&'a mut RigidBody>, b: Option<&'a mut RigidBody>) -> Self {
        Self { a, b }
    }

    /// Borrow bodies by index from a slice.
    ///
    /// Returns `None` when both indices are absent, equal, or out of bounds.
    pub fn from_slice(bodies: &'a mut [RigidBody], a: Option<usize>, b: Option<usize>) -> Option<Self> {
        match (a, b) {
            (Some(i), Some(j)) => {
                let (a, b) = pair_mut(bodies, i, j)?;
                Some(Self::new(Some(a), Some(b)))
            }
            (Some(i), None) => Some(Self::new(Some(bodies.get_mut(i)?), None)),
            (None, Some(j)) => Some(Self::new(None, Some(bodies.get_mut(j)?))),
            (None, None) => None,
        }
    }

    /// First body, if any.
    #[must_use]
    pub fn a(&self) -> Option<&RigidBody> {
        self.a.as_deref()
    }

    /// Second body, if any.
    #[must_use]
    pub fn b(&self) -> Option<&RigidBody> {
        self.b.as_deref()
    }

    /// First body, mutably.
    pub fn a_mut(&mut self) -> Option<&mut RigidBody> {
        self.a.as_deref_mut()
    }

    /// Second body, mutably.
    pub fn b_mut(&mut self) -> Option<&mut RigidBody> {
        self.b.as_deref_mut()
    }

    pub(crate) fn mass_k(&self, normal: Vector2<f64>, ra: Vector2<f64>, rb: Vector2<f64>) -> f64 {
        let (ma, ia) = inverse_mass(self.a());
        let (mb, ib) = inverse_mass(self.b());
        calc_mass_k(normal, ra, rb, ma, mb, ia, ib)
    }

    pub(crate) fn inverse_inertias(&self) -> (f64, f64) {
        (inverse_mass(self.a()).1, inverse_mass(self.b()).1)
    }

    pub(crate) fn inverse_masses(&self) -> (f64, f64) {
        (inverse_mass(self.a()).0, inverse_mass(self.b()).0)
    }

    pub(crate) fn relative_velocity(&self, ra: Vector2<f64>, rb: Vector2<f64>) -> Vector2<f64> {
        let (va, wa) = velocity(self.a());
        let (vb, wb) = velocity(self.b());
        relative_velocity(va, wa, ra, vb, wb, rb)
    }

    /// `w_b - w_a`.
    pub(crate) fn relative_angular_velocity(&self) -> f64 {
        velocity(self.b()).1 - velocity(self.a()).1
    }

    /// `angle_b - angle_a`, absent bodies counting as zero.
    pub(crate) fn relative_angle(&self) -> f64 {
        self.b().map_or(0.0, RigidBody::angle) - self.a().map_or(0.0, RigidBody::angle)
    }

    /// Apply `-impulse` to A at `ra` and `+impulse` to B at `rb`.
    pub(crate) fn apply_impulse(&mut self, impulse: Vector2<f64>, ra: Vector2<f64>, rb: Vector2<f64>) {
        if let Some(a) = self.a_mut() {
            a.apply_impulse(-impulse, ra);
        }
        if let Some(b) = self.b_mut() {
            b.apply_impulse(impulse, rb);
        }
    }

    /// Apply `-impulse` to A's spin and `+impulse` to B's.
    pub(crate) fn apply_angular_impulse(&mut self, impulse: f64) {
        if let Some(a) = self.a_mut() {
            a.apply_angular_impulse(-impulse);
        }
        if let Some(b) = self.b_mut() {
            b.apply_angular_impulse(impulse);
        }
    }
}

fn inverse_mass(body: Option<&RigidBody>) -> (f64, f64) {
    body.map_or((0.0, 0.0), |b| (b.invmass(), b.invinertia()))
}

fn velocity(body: Option<&RigidBody>) -> (Vector2<f64>, f64) {
    body.map_or((Vector2::zeros(), 0.0), |b| {
        (b.linear_velocity(), b.angular_velocity())
    })
}

/// Lever arm and world position of an anchor.
///
/// With a body, `local` is relative to its center of mass in its local
/// frame. Without one, `local` already is the world point and the lever arm
/// is zero.
pub(crate) fn world_anchor(body: Option<&RigidBody>, local: Vector2<f64>) -> (Vector2<f64>, Vector2<f64>) {
    match body {
        Some(body) => {
            let r = rotate(local, body.angle());
            (r, body.position() + r)
        }
        None => (Vector2::zeros(), local),
    }
}

/// Inverse of [`world_anchor`]: express a world point relative to `body`.
pub(crate) fn local_anchor(body: Option<&RigidBody>, world: Vector2<f64>) -> Vector2<f64> {
    match body {
        Some(body) => rotate(world - body.position(), -body.angle()),
        None => world,
    }
}

pub(crate) fn inverse_or_zero(k: f64) -> f64 {
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nova_body::RigidBodyInit;
    use nova_shape::Shape;

    fn body(x: f64, angle: f64) -> RigidBody {
        RigidBody::with_shape(
            RigidBodyInit::dynamic(Vector2::new(x, 0.0)).with_angle(angle),
            Shape::circle(Vector2::zeros(), 0.5).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_from_slice() {
        let mut bodies = vec![body(0.0, 0.0), body(1.0, 0.0), body(2.0, 0.0)];
        let pair = BodyPair::from_slice(&mut bodies, Some(2), None).unwrap();
        assert_eq!(pair.a().unwrap().position().x, 2.0);
        assert!(pair.b().is_none());

        let pair = BodyPair::from_slice(&mut bodies, Some(1), Some(0)).unwrap();
        assert_eq!(pair.a().unwrap().position().x, 1.0);
        assert_eq!(pair.b().unwrap().position().x, 0.0);

        assert!(BodyPair::from_slice(&mut bodies, None, None).is_none());
        assert!(BodyPair::from_slice(&mut bodies, Some(1), Some(1)).is_none());
        assert!(BodyPair::from_slice(&mut bodies, Some(5), None).is_none());
    }

    #[test]
    fn test_anchor_round_trip() {
        let b = body(3.0, 0.7);
        let world = Vector2::new(4.0, 1.0);
        let local = local_anchor(Some(&b), world);
        let (r, p) = world_anchor(Some(&b), local);
        assert_relative_eq!(p, world, epsilon = 1e-12);
        assert_relative_eq!(r, world - b.position(), epsilon = 1e-12);

        let (r, p) = world_anchor(None, world);
        assert_eq!(r, Vector2::zeros());
        assert_eq!(p, world);
    }

    #[test]
    fn test_absent_side_ignores_impulses() {
        let mut b = body(0.0, 0.0);
        let mut pair = BodyPair::new(None, Some(&mut b));
        pair.apply_impulse(Vector2::new(1.0, 0.0), Vector2::zeros(), Vector2::zeros());
        pair.apply_angular_impulse(1.0);
        let inv = pair.inverse_masses();
        assert_eq!(inv.0, 0.0);
        assert!(b.linear_velocity().x > 0.0);
        assert!(b.angular_velocity() > 0.0);
    }
}
