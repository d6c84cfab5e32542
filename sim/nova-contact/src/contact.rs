//! Persistent contact pairs and their per-point solver state.

use nalgebra::Vector2;
use nova_types::{pair_key, BodyId, ShapeId};
use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::collision::FeatureId;

/// Lifecycle of a persistent contact pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ContactState {
    /// Created (or revived from the cache) this frame.
    #[default]
    First,
    /// Touching for more than one frame.
    Normal,
    /// Not touching; kept around for warm starting until its lifetime runs out.
    Cached,
}

/// Solver scratch data for one contact point, rebuilt every presolve.
///
/// Only the accumulated impulses carry over between frames.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactSolverInfo {
    /// Accumulated normal impulse.
    pub normal_impulse: f64,
    /// Accumulated tangent (friction) impulse.
    pub tangent_impulse: f64,
    /// Effective mass along the normal.
    pub mass_normal: f64,
    /// Effective mass along the tangent.
    pub mass_tangent: f64,
    /// Restitution target velocity.
    pub velocity_bias: f64,
    /// Baumgarte correction velocity.
    pub position_bias: f64,
    /// Lever arm from body A's center of mass, in A's local frame.
    pub local_anchor_a: Vector2<f64>,
    /// Lever arm from body B's center of mass, in B's local frame.
    pub local_anchor_b: Vector2<f64>,
    /// Separation minus the anchor gap at presolve time (NGS).
    pub adjusted_separation: f64,
}

/// One point of a contact manifold.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Contact {
    /// Feature id matching this point to last frame's.
    pub id: FeatureId,
    /// World-space position.
    pub position: Vector2<f64>,
    /// Signed separation; negative when penetrating.
    pub separation: f64,
    /// Lever arm from body A's center of mass to the point.
    pub anchor_a: Vector2<f64>,
    /// Lever arm from body B's center of mass to the point.
    pub anchor_b: Vector2<f64>,
    /// Whether this point matched a point from the previous frame.
    pub is_persisted: bool,
    /// Solver state.
    pub solver_info: ContactSolverInfo,
}

/// Bodies and shapes involved in a contact pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactPairIds {
    /// First body.
    pub body_a: BodyId,
    /// Second body.
    pub body_b: BodyId,
    /// Shape on the first body.
    pub shape_a: ShapeId,
    /// Shape on the second body.
    pub shape_b: ShapeId,
}

impl ContactPairIds {
    /// Order-independent key of the shape pair.
    #[must_use]
    pub fn key(&self) -> (u64, u64) {
        pair_key(self.shape_a.raw(), self.shape_b.raw())
    }

    /// Whether either body is `body`.
    #[must_use]
    pub fn involves_body(&self, body: BodyId) -> bool {
        self.body_a == body || self.body_b == body
    }

    /// Whether either shape is `shape`.
    #[must_use]
    pub fn involves_shape(&self, shape: ShapeId) -> bool {
        self.shape_a == shape || self.shape_b == shape
    }
}

/// Contact manifold between two shapes, persisted across frames.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PersistentContactPair {
    /// Participants.
    pub ids: ContactPairIds,
    /// Unit normal from A to B.
    pub normal: Vector2<f64>,
    /// Up to two contact points.
    pub contacts: SmallVec<[Contact; 2]>,
    /// Lifecycle state.
    pub state: ContactState,
    /// Frames left before a cached pair is dropped.
    pub lifetime: u32,
    /// Mixed friction coefficient, set by presolve.
    pub friction: f64,
    /// Mixed restitution coefficient, set by presolve.
    pub restitution: f64,
    pub(crate) touched: bool,
}

impl PersistentContactPair {
    pub(crate) fn new(ids: ContactPairIds, lifetime: u32) -> Self {
        Self {
            ids,
            normal: Vector2::y(),
            contacts: SmallVec::new(),
            state: ContactState::First,
            lifetime,
            friction: 0.0,
            restitution: 0.0,
            touched: true,
        }
    }

    /// Order-independent key of the shape pair.
    #[must_use]
    pub fn key(&self) -> (u64, u64) {
        self.ids.key()
    }

    /// Whether the pair currently touches and should be solved.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state != ContactState::Cached && !self.contacts.is_empty()
    }

    /// Deepest penetration over the manifold (positive when overlapping).
    #[must_use]
    pub fn penetration(&self) -> f64 {
        self.contacts
            .iter()
            .map(|c| -c.separation)
            .fold(0.0, f64::max)
    }

    /// Sum of accumulated normal impulses.
    #[must_use]
    pub fn total_normal_impulse(&self) -> f64 {
        self.contacts
            .iter()
            .map(|c| c.solver_info.normal_impulse)
            .sum()
    }

    /// Contact point with the given feature id.
    #[must_use]
    pub fn contact(&self, id: FeatureId) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }
}
