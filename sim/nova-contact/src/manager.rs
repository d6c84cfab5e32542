//! Persistent contact storage and the per-frame contact state machine.
//!
//! A frame runs [`ContactManager::begin_pass`], one
//! [`ContactManager::upsert`] per colliding shape pair, then
//! [`ContactManager::end_pass`]. Pairs not refreshed during the pass move to
//! [`ContactState::Cached`] and are dropped once their lifetime runs out.
//!
//! Pairs live in a `Vec` indexed by a hash map, so iteration order depends
//! only on insertion and removal order.

use hashbrown::HashMap;
use nalgebra::Vector2;
use nova_types::{BodyId, ShapeId};
use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::collision::{Collision, FeatureId};
use crate::contact::{Contact, ContactPairIds, ContactState, PersistentContactPair};

/// What happened to a contact point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ContactEventKind {
    /// The point appeared this frame.
    Added,
    /// The point existed last frame and still does.
    Persisted,
    /// The point no longer exists.
    Removed,
}

/// A contact point change reported to listeners.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactEvent {
    /// Kind of change.
    pub kind: ContactEventKind,
    /// First body.
    pub body_a: BodyId,
    /// Second body.
    pub body_b: BodyId,
    /// Shape on the first body.
    pub shape_a: ShapeId,
    /// Shape on the second body.
    pub shape_b: ShapeId,
    /// Contact normal from A to B.
    pub normal: Vector2<f64>,
    /// World-space contact position.
    pub position: Vector2<f64>,
    /// Penetration depth (positive when overlapping).
    pub penetration: f64,
    /// Accumulated normal impulse carried by the point.
    pub normal_impulse: f64,
    /// Accumulated friction impulse carried by the point.
    pub tangent_impulse: f64,
    /// Feature id of the point.
    pub id: FeatureId,
}

impl ContactEvent {
    fn new(kind: ContactEventKind, pair: &PersistentContactPair, contact: &Contact) -> Self {
        Self {
            kind,
            body_a: pair.ids.body_a,
            body_b: pair.ids.body_b,
            shape_a: pair.ids.shape_a,
            shape_b: pair.ids.shape_b,
            normal: pair.normal,
            position: contact.position,
            penetration: -contact.separation,
            normal_impulse: contact.solver_info.normal_impulse,
            tangent_impulse: contact.solver_info.tangent_impulse,
            id: contact.id,
        }
    }
}

/// Owns every persistent contact pair of a space.
#[derive(Debug, Clone, Default)]
pub struct ContactManager {
    pairs: Vec<PersistentContactPair>,
    index: HashMap<(u64, u64), usize>,
    events: Vec<ContactEvent>,
    persistence: u32,
}

impl ContactManager {
    /// Create an empty manager keeping separated pairs for `persistence` frames.
    #[must_use]
    pub fn new(persistence: u32) -> Self {
        Self {
            persistence,
            ..Default::default()
        }
    }

    /// Frames a separated pair is kept.
    #[must_use]
    pub fn persistence(&self) -> u32 {
        self.persistence
    }

    /// Change how long separated pairs are kept.
    pub fn set_persistence(&mut self, persistence: u32) {
        self.persistence = persistence;
    }

    /// Number of stored pairs, cached ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no pairs are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of touching pairs.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.pairs.iter().filter(|p| p.is_active()).count()
    }

    /// All stored pairs.
    #[must_use]
    pub fn pairs(&self) -> &[PersistentContactPair] {
        &self.pairs
    }

    /// All stored pairs, mutably (for the solver).
    pub fn pairs_mut(&mut self) -> &mut [PersistentContactPair] {
        &mut self.pairs
    }

    /// Pair between two shapes, in either order.
    #[must_use]
    pub fn get(&self, shape_a: ShapeId, shape_b: ShapeId) -> Option<&PersistentContactPair> {
        let key = nova_types::pair_key(shape_a.raw(), shape_b.raw());
        self.index.get(&key).map(|&i| &self.pairs[i])
    }

    /// Start a narrow-phase pass.
    pub fn begin_pass(&mut self) {
        for pair in &mut self.pairs {
            pair.touched = false;
        }
    }

    /// Record a colliding shape pair.
    ///
    /// `com_a` and `com_b` are the bodies' world centers of mass, used to
    /// derive lever arms. Points whose feature id matches last frame's keep
    /// their accumulated impulses; others start from zero. A collision with
    /// no points is ignored.
    pub fn upsert(
        &mut self,
        ids: ContactPairIds,
        collision: &Collision,
        com_a: Vector2<f64>,
        com_b: Vector2<f64>,
    ) {
        if !collision.collision || collision.points.is_empty() {
            return;
        }

        let key = ids.key();
        let contacts = collision.points.iter().map(|p| Contact {
            id: p.id,
            position: p.position,
            separation: p.separation,
            anchor_a: p.position - com_a,
            anchor_b: p.position - com_b,
            ..Default::default()
        });

        let Some(&slot) = self.index.get(&key) else {
            let mut pair = PersistentContactPair::new(ids, self.persistence);
            pair.normal = collision.normal;
            pair.contacts.extend(contacts);
            for contact in &pair.contacts {
                self.events
                    .push(ContactEvent::new(ContactEventKind::Added, &pair, contact));
            }
            self.index.insert(key, self.pairs.len());
            self.pairs.push(pair);
            return;
        };

        let pair = &mut self.pairs[slot];
        let revived = pair.state == ContactState::Cached;
        // Feature ids are only meaningful for the same shape order
        let same_order = pair.ids.shape_a == ids.shape_a;

        let mut fresh: smallvec::SmallVec<[Contact; 2]> = contacts.collect();
        for contact in &mut fresh {
            let previous = pair
                .contacts
                .iter()
                .find(|old| same_order && old.id == contact.id);
            if let Some(old) = previous {
                contact.is_persisted = true;
                contact.solver_info.normal_impulse = old.solver_info.normal_impulse;
                contact.solver_info.tangent_impulse = old.solver_info.tangent_impulse;
            }
        }

        if !revived {
            for old in &pair.contacts {
                let survives = same_order && fresh.iter().any(|c| c.id == old.id);
                if !survives {
                    self.events
                        .push(ContactEvent::new(ContactEventKind::Removed, pair, old));
                }
            }
        }

        pair.ids = ids;
        pair.normal = collision.normal;
        pair.contacts = fresh;
        pair.touched = true;

        for contact in &pair.contacts {
            let kind = if contact.is_persisted && !revived {
                ContactEventKind::Persisted
            } else {
                ContactEventKind::Added
            };
            self.events.push(ContactEvent::new(kind, pair, contact));
        }

        match pair.state {
            ContactState::Cached => {
                pair.state = ContactState::First;
                pair.lifetime = self.persistence;
            }
            ContactState::First => pair.state = ContactState::Normal,
            ContactState::Normal => {}
        }
    }

    /// Finish a narrow-phase pass.
    ///
    /// Untouched pairs become cached, reporting their points as removed;
    /// cached pairs age and are deleted when their lifetime is spent.
    pub fn end_pass(&mut self) {
        let mut i = 0;
        while i < self.pairs.len() {
            let pair = &mut self.pairs[i];
            if pair.touched {
                i += 1;
                continue;
            }

            if pair.state != ContactState::Cached {
                pair.state = ContactState::Cached;
                pair.lifetime = self.persistence;
                for contact in &pair.contacts {
                    self.events
                        .push(ContactEvent::new(ContactEventKind::Removed, pair, contact));
                }
                i += 1;
            } else if pair.lifetime == 0 {
                self.remove_at(i);
            } else {
                pair.lifetime -= 1;
                i += 1;
            }
        }
        trace!(
            pairs = self.pairs.len(),
            events = self.events.len(),
            "contact pass finished"
        );
    }

    fn remove_at(&mut self, i: usize) -> PersistentContactPair {
        let pair = self.pairs.swap_remove(i);
        self.index.remove(&pair.key());
        if let Some(moved) = self.pairs.get(i) {
            self.index.insert(moved.key(), i);
        }
        pair
    }

    fn purge_where(&mut self, mut predicate: impl FnMut(&ContactPairIds) -> bool) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i < self.pairs.len() {
            if predicate(&self.pairs[i].ids) {
                self.remove_at(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
        removed
    }

    /// Remove every pair involving `body`. No events are emitted.
    pub fn purge_body(&mut self, body: BodyId) -> usize {
        let removed = self.purge_where(|ids| ids.involves_body(body));
        if removed > 0 {
            debug!(%body, removed, "purged contacts of body");
        }
        removed
    }

    /// Remove every pair involving `shape`. No events are emitted.
    pub fn purge_shape(&mut self, shape: ShapeId) -> usize {
        let removed = self.purge_where(|ids| ids.involves_shape(shape));
        if removed > 0 {
            debug!(%shape, removed, "purged contacts of shape");
        }
        removed
    }

    /// Remove every pair between the two bodies. No events are emitted.
    pub fn purge_between(&mut self, a: BodyId, b: BodyId) -> usize {
        self.purge_where(|ids| ids.involves_body(a) && ids.involves_body(b))
    }

    /// Take the events produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<ContactEvent> {
        std::mem::take(&mut self.events)
    }

    /// Events produced since the last drain.
    #[must_use]
    pub fn events(&self) -> &[ContactEvent] {
        &self.events
    }

    /// Drop every pair and pending event.
    pub fn clear(&mut self) {
        self.pairs.clear();
        self.index.clear();
        self.events.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::collision::ContactPoint;
    use smallvec::smallvec;

    fn ids(a: u64, b: u64) -> ContactPairIds {
        ContactPairIds {
            body_a: BodyId(a),
            body_b: BodyId(b),
            shape_a: ShapeId(a * 10),
            shape_b: ShapeId(b * 10),
        }
    }

    fn collision(point_ids: &[u32]) -> Collision {
        Collision {
            collision: true,
            normal: Vector2::y(),
            depth: 0.1,
            points: point_ids
                .iter()
                .map(|&id| ContactPoint {
                    position: Vector2::new(f64::from(id), 0.0),
                    separation: -0.1,
                    id,
                })
                .collect(),
        }
    }

    fn frame(manager: &mut ContactManager, touching: &[(ContactPairIds, Collision)]) {
        manager.begin_pass();
        for (ids, col) in touching {
            manager.upsert(*ids, col, Vector2::zeros(), Vector2::new(0.0, 1.0));
        }
        manager.end_pass();
    }

    fn kinds(manager: &mut ContactManager) -> Vec<ContactEventKind> {
        manager.drain_events().into_iter().map(|e| e.kind).collect()
    }

    // ========================================================================
    // State machine
    // ========================================================================

    #[test]
    fn test_new_pair_starts_first() {
        let mut m = ContactManager::new(1);
        frame(&mut m, &[(ids(1, 2), collision(&[0, 1]))]);
        assert_eq!(m.len(), 1);
        let pair = &m.pairs()[0];
        assert_eq!(pair.state, ContactState::First);
        assert!(pair.contacts.iter().all(|c| !c.is_persisted));
        assert!(pair
            .contacts
            .iter()
            .all(|c| c.solver_info.normal_impulse == 0.0));
        assert_eq!(kinds(&mut m), vec![ContactEventKind::Added; 2]);
    }

    #[test]
    fn test_first_then_normal() {
        let mut m = ContactManager::new(1);
        frame(&mut m, &[(ids(1, 2), collision(&[0]))]);
        frame(&mut m, &[(ids(1, 2), collision(&[0]))]);
        assert_eq!(m.pairs()[0].state, ContactState::Normal);
        frame(&mut m, &[(ids(1, 2), collision(&[0]))]);
        assert_eq!(m.pairs()[0].state, ContactState::Normal);
    }

    #[test]
    fn test_cached_lifetime_then_removed() {
        let mut m = ContactManager::new(1);
        frame(&mut m, &[(ids(1, 2), collision(&[0]))]);
        m.drain_events();

        frame(&mut m, &[]);
        assert_eq!(m.pairs()[0].state, ContactState::Cached);
        assert_eq!(kinds(&mut m), vec![ContactEventKind::Removed]);

        frame(&mut m, &[]);
        assert_eq!(m.len(), 1);
        assert_eq!(m.pairs()[0].lifetime, 0);

        frame(&mut m, &[]);
        assert!(m.is_empty());
        assert!(m.get(ShapeId(10), ShapeId(20)).is_none());
    }

    #[test]
    fn test_cached_pair_revives_as_first() {
        let mut m = ContactManager::new(2);
        frame(&mut m, &[(ids(1, 2), collision(&[0]))]);
        m.pairs_mut()[0].contacts[0].solver_info.normal_impulse = 3.0;
        frame(&mut m, &[]);
        assert_eq!(m.pairs()[0].state, ContactState::Cached);
        m.drain_events();

        frame(&mut m, &[(ids(1, 2), collision(&[0]))]);
        let pair = &m.pairs()[0];
        assert_eq!(pair.state, ContactState::First);
        assert_eq!(pair.lifetime, 2);
        assert!(pair.contacts[0].is_persisted);
        assert_eq!(pair.contacts[0].solver_info.normal_impulse, 3.0);
        assert_eq!(kinds(&mut m), vec![ContactEventKind::Added]);
    }

    // ========================================================================
    // Impulse carry-over
    // ========================================================================

    #[test]
    fn test_impulses_follow_feature_ids() {
        let mut m = ContactManager::new(1);
        frame(&mut m, &[(ids(1, 2), collision(&[4, 7]))]);
        for c in m.pairs_mut()[0].contacts.iter_mut() {
            c.solver_info.normal_impulse = f64::from(c.id);
            c.solver_info.tangent_impulse = -f64::from(c.id);
        }
        m.drain_events();

        frame(&mut m, &[(ids(1, 2), collision(&[7, 9]))]);
        let pair = &m.pairs()[0];
        let kept = pair.contact(7).unwrap();
        assert!(kept.is_persisted);
        assert_eq!(kept.solver_info.normal_impulse, 7.0);
        assert_eq!(kept.solver_info.tangent_impulse, -7.0);
        let new = pair.contact(9).unwrap();
        assert!(!new.is_persisted);
        assert_eq!(new.solver_info.normal_impulse, 0.0);

        let mut events = m.drain_events();
        events.sort_by_key(|e| e.id);
        let summary: Vec<_> = events.iter().map(|e| (e.id, e.kind)).collect();
        assert_eq!(
            summary,
            vec![
                (4, ContactEventKind::Removed),
                (7, ContactEventKind::Persisted),
                (9, ContactEventKind::Added),
            ]
        );
    }

    #[test]
    fn test_lever_arms_relative_to_com() {
        let mut m = ContactManager::new(1);
        m.begin_pass();
        let col = Collision {
            collision: true,
            normal: Vector2::x(),
            depth: 0.1,
            points: smallvec![ContactPoint {
                position: Vector2::new(1.0, 1.0),
                separation: -0.1,
                id: 0,
            }],
        };
        m.upsert(ids(1, 2), &col, Vector2::new(0.0, 1.0), Vector2::new(2.0, 1.0));
        m.end_pass();
        let c = &m.pairs()[0].contacts[0];
        assert_eq!(c.anchor_a, Vector2::new(1.0, 0.0));
        assert_eq!(c.anchor_b, Vector2::new(-1.0, 0.0));
    }

    #[test]
    fn test_non_colliding_is_ignored() {
        let mut m = ContactManager::new(1);
        frame(&mut m, &[(ids(1, 2), Collision::none())]);
        assert!(m.is_empty());
    }

    // ========================================================================
    // Purging
    // ========================================================================

    #[test]
    fn test_purge_body_keeps_index_consistent() {
        let mut m = ContactManager::new(1);
        frame(
            &mut m,
            &[
                (ids(1, 2), collision(&[0])),
                (ids(2, 3), collision(&[0])),
                (ids(3, 4), collision(&[0])),
            ],
        );
        m.drain_events();

        assert_eq!(m.purge_body(BodyId(1)), 1);
        assert_eq!(m.len(), 2);
        assert!(m.get(ShapeId(30), ShapeId(40)).is_some());
        assert!(m.get(ShapeId(20), ShapeId(30)).is_some());

        assert_eq!(m.purge_shape(ShapeId(30)), 2);
        assert!(m.is_empty());
        assert!(m.events().is_empty());
    }

    #[test]
    fn test_purge_between() {
        let mut m = ContactManager::new(1);
        frame(
            &mut m,
            &[(ids(1, 2), collision(&[0])), (ids(1, 3), collision(&[0]))],
        );
        assert_eq!(m.purge_between(BodyId(2), BodyId(1)), 1);
        assert!(m.get(ShapeId(10), ShapeId(30)).is_some());
    }
}
