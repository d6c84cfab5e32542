//! The closed set of joint kinds and their shared solver contract.

use nova_body::RigidBody;
use nova_types::{BodyId, ConstraintId, PhysicsError, Result, SpaceSettings};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bodies::BodyPair;
use crate::distance::{DistanceConstraint, DistanceConstraintInit};
use crate::hinge::{HingeConstraint, HingeConstraintInit};
use crate::spline::{SplineConstraint, SplineConstraintInit};
use crate::spring::{SpringConstraint, SpringConstraintInit};

/// Joint-specific state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConstraintKind {
    /// Fixed (or springy) distance between two anchors.
    Distance(DistanceConstraint),
    /// Shared pivot with optional angular limits.
    Hinge(HingeConstraint),
    /// Damped Hooke spring.
    Spring(SpringConstraint),
    /// Anchor constrained to a path.
    Spline(SplineConstraint),
}

/// A joint between two bodies, either of which may be the world.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Constraint {
    id: ConstraintId,
    body_a: Option<BodyId>,
    body_b: Option<BodyId>,
    ignore_collision: bool,
    kind: ConstraintKind,
}

fn endpoint_ids(a: Option<&RigidBody>, b: Option<&RigidBody>) -> Result<(Option<BodyId>, Option<BodyId>)> {
    if a.is_none() && b.is_none() {
        return Err(PhysicsError::BothBodiesNull);
    }
    Ok((a.map(RigidBody::id), b.map(RigidBody::id)))
}

impl Constraint {
    /// Distance joint.
    pub fn distance(a: Option<&RigidBody>, b: Option<&RigidBody>, init: DistanceConstraintInit) -> Result<Self> {
        let (body_a, body_b) = endpoint_ids(a, b)?;
        Ok(Self::from_parts(body_a, body_b, ConstraintKind::Distance(DistanceConstraint::new(init)?)))
    }

    /// Hinge joint about a world pivot.
    pub fn hinge(a: Option<&RigidBody>, b: Option<&RigidBody>, init: HingeConstraintInit) -> Result<Self> {
        let (body_a, body_b) = endpoint_ids(a, b)?;
        Ok(Self::from_parts(body_a, body_b, ConstraintKind::Hinge(HingeConstraint::new(a, b, init)?)))
    }

    /// Damped spring.
    pub fn spring(a: Option<&RigidBody>, b: Option<&RigidBody>, init: SpringConstraintInit) -> Result<Self> {
        let (body_a, body_b) = endpoint_ids(a, b)?;
        Ok(Self::from_parts(body_a, body_b, ConstraintKind::Spring(SpringConstraint::new(init)?)))
    }

    /// Path joint on a single body.
    pub fn spline(body: &RigidBody, init: SplineConstraintInit) -> Result<Self> {
        Ok(Self::from_parts(
            Some(body.id()),
            None,
            ConstraintKind::Spline(SplineConstraint::new(body, init)?),
        ))
    }

    fn from_parts(body_a: Option<BodyId>, body_b: Option<BodyId>, kind: ConstraintKind) -> Self {
        Self {
            id: ConstraintId::default(),
            body_a,
            body_b,
            ignore_collision: false,
            kind,
        }
    }

    /// Suppress contacts between the two bodies.
    #[must_use]
    pub fn with_ignore_collision(mut self, ignore: bool) -> Self {
        self.ignore_collision = ignore;
        self
    }

    /// Id assigned by the owning space.
    #[must_use]
    pub fn id(&self) -> ConstraintId {
        self.id
    }

    /// Assign the id. Called by the space on insertion.
    pub fn set_id(&mut self, id: ConstraintId) {
        self.id = id;
    }

    /// First body, `None` for the world.
    #[must_use]
    pub fn body_a(&self) -> Option<BodyId> {
        self.body_a
    }

    /// Second body, `None` for the world.
    #[must_use]
    pub fn body_b(&self) -> Option<BodyId> {
        self.body_b
    }

    /// Whether the joint references `body`.
    #[must_use]
    pub fn involves(&self, body: BodyId) -> bool {
        self.body_a == Some(body) || self.body_b == Some(body)
    }

    /// Whether contacts between the two bodies are skipped.
    #[must_use]
    pub fn ignore_collision(&self) -> bool {
        self.ignore_collision
    }

    /// Toggle contact suppression.
    pub fn set_ignore_collision(&mut self, ignore: bool) {
        self.ignore_collision = ignore;
    }

    /// Joint-specific state.
    #[must_use]
    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// Joint-specific state, mutably.
    pub fn kind_mut(&mut self) -> &mut ConstraintKind {
        &mut self.kind
    }

    /// The distance joint, if this is one.
    #[must_use]
    pub fn as_distance(&self) -> Option<&DistanceConstraint> {
        match &self.kind {
            ConstraintKind::Distance(c) => Some(c),
            _ => None,
        }
    }

    /// The distance joint, mutably.
    pub fn as_distance_mut(&mut self) -> Option<&mut DistanceConstraint> {
        match &mut self.kind {
            ConstraintKind::Distance(c) => Some(c),
            _ => None,
        }
    }

    /// The hinge joint, if this is one.
    #[must_use]
    pub fn as_hinge(&self) -> Option<&HingeConstraint> {
        match &self.kind {
            ConstraintKind::Hinge(c) => Some(c),
            _ => None,
        }
    }

    /// The hinge joint, mutably.
    pub fn as_hinge_mut(&mut self) -> Option<&mut HingeConstraint> {
        match &mut self.kind {
            ConstraintKind::Hinge(c) => Some(c),
            _ => None,
        }
    }

    /// The spring, if this is one.
    #[must_use]
    pub fn as_spring(&self) -> Option<&SpringConstraint> {
        match &self.kind {
            ConstraintKind::Spring(c) => Some(c),
            _ => None,
        }
    }

    /// The spring, mutably.
    pub fn as_spring_mut(&mut self) -> Option<&mut SpringConstraint> {
        match &mut self.kind {
            ConstraintKind::Spring(c) => Some(c),
            _ => None,
        }
    }

    /// The spline joint, if this is one.
    #[must_use]
    pub fn as_spline(&self) -> Option<&SplineConstraint> {
        match &self.kind {
            ConstraintKind::Spline(c) => Some(c),
            _ => None,
        }
    }

    /// The spline joint, mutably.
    pub fn as_spline_mut(&mut self) -> Option<&mut SplineConstraint> {
        match &mut self.kind {
            ConstraintKind::Spline(c) => Some(c),
            _ => None,
        }
    }

    /// Prepare for the iterations of this step.
    pub fn presolve(&mut self, bodies: &mut BodyPair<'_>, settings: &SpaceSettings, dt: f64, inv_dt: f64) {
        match &mut self.kind {
            ConstraintKind::Distance(c) => c.presolve(bodies, settings, dt, inv_dt),
            ConstraintKind::Hinge(c) => c.presolve(bodies, settings, dt, inv_dt),
            ConstraintKind::Spring(c) => c.presolve(bodies, dt),
            ConstraintKind::Spline(c) => c.presolve(bodies, settings, dt, inv_dt),
        }
    }

    /// Reapply (or reset) last step's accumulated impulse.
    pub fn warmstart(&mut self, bodies: &mut BodyPair<'_>, settings: &SpaceSettings) {
        match &mut self.kind {
            ConstraintKind::Distance(c) => c.warmstart(bodies, settings),
            ConstraintKind::Hinge(c) => c.warmstart(bodies, settings),
            ConstraintKind::Spring(_) => {}
            ConstraintKind::Spline(c) => c.warmstart(bodies, settings),
        }
    }

    /// One solver iteration.
    pub fn solve(&mut self, bodies: &mut BodyPair<'_>, settings: &SpaceSettings, inv_dt: f64) {
        match &mut self.kind {
            ConstraintKind::Distance(c) => c.solve(bodies),
            ConstraintKind::Hinge(c) => c.solve(bodies, settings, inv_dt),
            ConstraintKind::Spring(c) => c.solve(bodies),
            ConstraintKind::Spline(c) => c.solve(bodies),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use nalgebra::Vector2;
    use nova_body::RigidBodyInit;
    use nova_shape::Shape;

    fn body(id: u64, x: f64) -> RigidBody {
        let mut b = RigidBody::with_shape(
            RigidBodyInit::dynamic(Vector2::new(x, 0.0)),
            Shape::circle(Vector2::zeros(), 0.5).unwrap(),
        )
        .unwrap();
        b.set_id(BodyId(id));
        b
    }

    #[test]
    fn test_factories_record_endpoints() {
        let a = body(1, 0.0);
        let b = body(2, 2.0);

        let c = Constraint::distance(Some(&a), Some(&b), DistanceConstraintInit::new(2.0)).unwrap();
        assert_eq!(c.body_a(), Some(BodyId(1)));
        assert_eq!(c.body_b(), Some(BodyId(2)));
        assert!(c.involves(BodyId(2)));
        assert!(!c.involves(BodyId(3)));
        assert!(c.as_distance().is_some());
        assert!(c.as_hinge().is_none());

        let c = Constraint::hinge(None, Some(&b), HingeConstraintInit::new(Vector2::zeros())).unwrap();
        assert_eq!(c.body_a(), None);
        assert!(c.as_hinge().is_some());

        let c = Constraint::spline(&a, SplineConstraintInit::default()).unwrap();
        assert_eq!(c.body_b(), None);
        assert!(c.as_spline().is_some());
    }

    #[test]
    fn test_both_null_rejected() {
        for result in [
            Constraint::distance(None, None, DistanceConstraintInit::default()),
            Constraint::spring(None, None, SpringConstraintInit::default()),
            Constraint::hinge(None, None, HingeConstraintInit::default()),
        ] {
            assert_eq!(result.unwrap_err(), PhysicsError::BothBodiesNull);
        }
    }

    #[test]
    fn test_ignore_collision_flag() {
        let a = body(1, 0.0);
        let mut c = Constraint::spring(Some(&a), None, SpringConstraintInit::default())
            .unwrap()
            .with_ignore_collision(true);
        assert!(c.ignore_collision());
        c.set_ignore_collision(false);
        assert!(!c.ignore_collision());
    }

    #[test]
    fn test_dispatch_moves_bodies() {
        let settings = SpaceSettings::default();
        let mut a = body(1, 0.0);
        let mut b = body(2, 3.0);
        let mut c = Constraint::distance(Some(&a), Some(&b), DistanceConstraintInit::new(1.0)).unwrap();

        let mut pair = BodyPair::new(Some(&mut a), Some(&mut b));
        c.presolve(&mut pair, &settings, 1.0 / 60.0, 60.0);
        c.warmstart(&mut pair, &settings);
        c.solve(&mut pair, &settings, 60.0);
        assert!(a.linear_velocity().x > 0.0);
        assert!(b.linear_velocity().x < 0.0);
    }
}
