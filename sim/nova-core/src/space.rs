//! The simulation container.
//!
//! A [`Space`] owns every body, constraint and persistent contact pair of a
//! simulation, plus the broad-phase state and settings. Bodies are stored in
//! insertion order; removal keeps the order of the survivors so contact pair
//! orientation stays stable from frame to frame.

use std::fmt;

use hashbrown::HashMap;
use nova_body::{pair_mut, RigidBody};
use nova_broadphase::{BroadPhaseAlgorithm, BroadPhaseConfig, BroadPhaseDetector};
use nova_constraint::{BodyPair, Constraint};
use nova_contact::ContactManager;
use nova_shape::Shape;
use nova_types::{BodyId, ConstraintId, PhysicsError, Result, ShapeId, SpaceSettings};
use tracing::{debug, info};

use crate::listener::{ContactListener, RemovalQueue};
use crate::step::StepStats;

/// Owns and simulates a set of rigid bodies and constraints.
///
/// # Example
///
/// ```
/// use nalgebra::Vector2;
/// use nova_body::{RigidBody, RigidBodyInit};
/// use nova_core::Space;
/// use nova_shape::Shape;
///
/// let mut space = Space::new();
/// let ball = RigidBody::with_shape(
///     RigidBodyInit::dynamic(Vector2::new(0.0, 10.0)),
///     Shape::circle(Vector2::zeros(), 0.5).unwrap(),
/// )
/// .unwrap();
/// let id = space.add_body(ball).unwrap();
///
/// for _ in 0..60 {
///     space.step(1.0 / 60.0);
/// }
/// assert!(space.body(id).unwrap().position().y < 10.0);
/// ```
pub struct Space {
    pub(crate) bodies: Vec<RigidBody>,
    pub(crate) body_index: HashMap<u64, usize>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) contacts: ContactManager,
    pub(crate) broadphase: BroadPhaseDetector,
    pub(crate) settings: SpaceSettings,
    pub(crate) listener: Option<Box<dyn ContactListener>>,
    pub(crate) removals: RemovalQueue,
    pub(crate) batch_integration: bool,
    pub(crate) stats: StepStats,
    next_body_id: u64,
    next_constraint_id: u64,
    pub(crate) time: f64,
    pub(crate) step_count: u64,
}

impl fmt::Debug for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Space")
            .field("bodies", &self.bodies.len())
            .field("constraints", &self.constraints.len())
            .field("contacts", &self.contacts.len())
            .field("algorithm", &self.broadphase.algorithm())
            .field("has_listener", &self.listener.is_some())
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}

impl Default for Space {
    fn default() -> Self {
        Self::new()
    }
}

impl Space {
    /// Create an empty space with default settings.
    #[must_use]
    pub fn new() -> Self {
        let settings = SpaceSettings::default();
        Self {
            bodies: Vec::new(),
            body_index: HashMap::new(),
            constraints: Vec::new(),
            contacts: ContactManager::new(settings.collision_persistence),
            broadphase: BroadPhaseDetector::default(),
            settings,
            listener: None,
            removals: RemovalQueue::default(),
            batch_integration: false,
            stats: StepStats::default(),
            next_body_id: 1,
            next_constraint_id: 1,
            time: 0.0,
            step_count: 0,
        }
    }

    /// Create an empty space with custom settings.
    pub fn with_settings(settings: SpaceSettings) -> Result<Self> {
        let mut space = Self::new();
        space.set_settings(settings)?;
        Ok(space)
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> &SpaceSettings {
        &self.settings
    }

    /// Replace the settings after validating them.
    pub fn set_settings(&mut self, settings: SpaceSettings) -> Result<()> {
        settings.validate()?;
        self.contacts.set_persistence(settings.collision_persistence);
        self.settings = settings;
        Ok(())
    }

    /// Set the gravity vector.
    pub fn set_gravity(&mut self, gravity: nalgebra::Vector2<f64>) -> Result<()> {
        if !gravity.x.is_finite() || !gravity.y.is_finite() {
            return Err(PhysicsError::invalid_parameter(
                "gravity",
                "gravity must be finite",
            ));
        }
        self.settings.gravity = gravity;
        Ok(())
    }

    /// Select the broad-phase algorithm.
    pub fn set_broadphase_algorithm(&mut self, algorithm: BroadPhaseAlgorithm) {
        self.broadphase.set_algorithm(algorithm);
    }

    /// Selected broad-phase algorithm.
    #[must_use]
    pub fn broadphase_algorithm(&self) -> BroadPhaseAlgorithm {
        self.broadphase.algorithm()
    }

    /// Replace the broad-phase configuration.
    pub fn set_broadphase_config(&mut self, config: BroadPhaseConfig) -> Result<()> {
        self.broadphase.set_config(config)
    }

    /// Spread spatial-hash-grid pair generation over worker threads.
    ///
    /// `0` uses every available worker, `1` runs sequentially.
    pub fn set_multithreading(&mut self, threads: usize) {
        self.broadphase.set_multithreading(threads);
    }

    /// Whether grid pair generation runs on several threads.
    #[must_use]
    pub fn is_multithreaded(&self) -> bool {
        self.broadphase.is_multithreaded()
    }

    /// Integrate awake bodies in four-wide batches.
    pub fn set_batch_integration(&mut self, enabled: bool) {
        self.batch_integration = enabled;
    }

    /// Whether batched integration is in use.
    #[must_use]
    pub fn batch_integration(&self) -> bool {
        self.batch_integration
    }

    // ========================================================================
    // Listener
    // ========================================================================

    /// Register the contact listener, replacing any previous one.
    pub fn set_contact_listener(&mut self, listener: impl ContactListener + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Unregister and return the contact listener.
    pub fn take_contact_listener(&mut self) -> Option<Box<dyn ContactListener>> {
        self.listener.take()
    }

    /// Queue a body for removal at the end of the next step.
    pub fn queue_removal(&mut self, body: BodyId) {
        self.removals.push(body);
    }

    // ========================================================================
    // Bodies
    // ========================================================================

    /// Add a body, assigning it a fresh id.
    ///
    /// Fails if a body with the same id already lives in this space or if
    /// the body's mass properties are invalid.
    pub fn add_body(&mut self, mut body: RigidBody) -> Result<BodyId> {
        let current = body.id();
        if current.raw() != 0 && self.body_index.contains_key(&current.raw()) {
            return Err(PhysicsError::BodyAlreadyInSpace(current.raw()));
        }
        body.validate_mass()?;

        let id = BodyId(self.next_body_id);
        self.next_body_id += 1;
        body.set_id(id);
        body.invalidate_transform();
        body.sync_transform();

        self.body_index.insert(id.raw(), self.bodies.len());
        self.bodies.push(body);
        info!(%id, bodies = self.bodies.len(), "body added");
        Ok(id)
    }

    /// Remove a body along with its contacts and every constraint that
    /// references it.
    pub fn remove_body(&mut self, id: BodyId) -> Result<RigidBody> {
        let index = self
            .body_index
            .get(&id.raw())
            .copied()
            .ok_or(PhysicsError::InvalidBodyId(id.raw()))?;

        let body = self.bodies.remove(index);
        self.reindex_bodies();
        self.contacts.purge_body(id);

        let before = self.constraints.len();
        self.constraints.retain(|c| !c.involves(id));
        let dropped = before - self.constraints.len();

        info!(%id, constraints = dropped, "body removed");
        Ok(body)
    }

    /// Remove a shape from a body, purging its contacts.
    pub fn remove_shape(&mut self, body: BodyId, shape: ShapeId) -> Result<Shape> {
        let owner = self
            .body_mut(body)
            .ok_or(PhysicsError::InvalidBodyId(body.raw()))?;
        let removed = owner.remove_shape(shape)?;
        owner.sync_transform();
        self.purge_removed_shapes();
        Ok(removed)
    }

    /// Drop contacts of shapes removed directly through [`RigidBody::remove_shape`].
    pub(crate) fn purge_removed_shapes(&mut self) {
        for body in self.bodies.iter_mut().filter(|b| b.has_removed_shapes()) {
            for shape in body.take_removed_shapes() {
                self.contacts.purge_shape(shape);
            }
        }
    }

    /// Add a shape to a body already in the space.
    pub fn add_shape(&mut self, body: BodyId, shape: Shape) -> Result<ShapeId> {
        let owner = self
            .body_mut(body)
            .ok_or(PhysicsError::InvalidBodyId(body.raw()))?;
        let id = owner.add_shape(shape)?;
        owner.sync_transform();
        Ok(id)
    }

    /// Look up a body.
    #[must_use]
    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.body_index.get(&id.raw()).map(|&i| &self.bodies[i])
    }

    /// Look up a body mutably.
    ///
    /// Do not change its id through this reference.
    #[must_use]
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        match self.body_index.get(&id.raw()) {
            Some(&i) => self.bodies.get_mut(i),
            None => None,
        }
    }

    /// Whether a body with this id is in the space.
    #[must_use]
    pub fn contains_body(&self, id: BodyId) -> bool {
        self.body_index.contains_key(&id.raw())
    }

    /// Every body in insertion order.
    #[must_use]
    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    /// Every body in insertion order, mutably.
    pub fn bodies_mut(&mut self) -> impl Iterator<Item = &mut RigidBody> {
        self.bodies.iter_mut()
    }

    /// Cursor-style body iteration.
    ///
    /// Start with `cursor = 0`; each call returns the body at the cursor and
    /// advances it. Reset the cursor after adding or removing bodies.
    pub fn next_body(&self, cursor: &mut usize) -> Option<&RigidBody> {
        let body = self.bodies.get(*cursor)?;
        *cursor += 1;
        Some(body)
    }

    /// Number of bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub(crate) fn reindex_bodies(&mut self) {
        self.body_index.clear();
        for (i, body) in self.bodies.iter().enumerate() {
            self.body_index.insert(body.id().raw(), i);
        }
    }

    // ========================================================================
    // Constraints
    // ========================================================================

    /// Add a constraint, assigning it a fresh id.
    ///
    /// Every body the constraint references must already be in the space.
    pub fn add_constraint(&mut self, mut constraint: Constraint) -> Result<ConstraintId> {
        for body in [constraint.body_a(), constraint.body_b()].into_iter().flatten() {
            if !self.contains_body(body) {
                return Err(PhysicsError::InvalidBodyId(body.raw()));
            }
        }

        let id = ConstraintId(self.next_constraint_id);
        self.next_constraint_id += 1;
        constraint.set_id(id);

        if let (Some(a), Some(b)) = (constraint.body_a(), constraint.body_b()) {
            if constraint.ignore_collision() {
                self.contacts.purge_between(a, b);
            }
        }
        for body in [constraint.body_a(), constraint.body_b()].into_iter().flatten() {
            if let Some(body) = self.body_mut(body) {
                body.wake_up();
            }
        }

        self.constraints.push(constraint);
        info!(%id, constraints = self.constraints.len(), "constraint added");
        Ok(id)
    }

    /// Remove a constraint.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> Result<Constraint> {
        let index = self
            .constraints
            .iter()
            .position(|c| c.id() == id)
            .ok_or(PhysicsError::InvalidConstraintId(id.raw()))?;
        let constraint = self.constraints.remove(index);
        info!(%id, "constraint removed");
        Ok(constraint)
    }

    /// Look up a constraint.
    #[must_use]
    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.id() == id)
    }

    /// Look up a constraint mutably.
    #[must_use]
    pub fn constraint_mut(&mut self, id: ConstraintId) -> Option<&mut Constraint> {
        self.constraints.iter_mut().find(|c| c.id() == id)
    }

    /// Every constraint in insertion order.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Cursor-style constraint iteration, see [`next_body`](Self::next_body).
    pub fn next_constraint(&self, cursor: &mut usize) -> Option<&Constraint> {
        let constraint = self.constraints.get(*cursor)?;
        *cursor += 1;
        Some(constraint)
    }

    /// Number of constraints.
    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    // ========================================================================
    // Contacts and statistics
    // ========================================================================

    /// Persistent contact storage.
    #[must_use]
    pub fn contacts(&self) -> &ContactManager {
        &self.contacts
    }

    /// Number of persistent contact pairs, cached ones included.
    #[must_use]
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Candidate pairs found by the last broad-phase pass.
    #[must_use]
    pub fn broadphase_pair_count(&self) -> usize {
        self.broadphase.last_pair_count()
    }

    /// Timings and counts of the last step.
    #[must_use]
    pub fn stats(&self) -> &StepStats {
        &self.stats
    }

    /// Simulated time in seconds.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of completed steps.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    // ========================================================================
    // Clearing
    // ========================================================================

    /// Remove every body, constraint and contact.
    ///
    /// With `free_all` the removed items are dropped and empty vectors are
    /// returned; otherwise ownership passes back to the caller.
    pub fn clear(&mut self, free_all: bool) -> (Vec<RigidBody>, Vec<Constraint>) {
        let bodies = std::mem::take(&mut self.bodies);
        let constraints = std::mem::take(&mut self.constraints);
        self.body_index.clear();
        self.contacts.clear();
        self.removals.clear();
        info!(
            bodies = bodies.len(),
            constraints = constraints.len(),
            free_all,
            "space cleared"
        );
        if free_all {
            (Vec::new(), Vec::new())
        } else {
            (bodies, constraints)
        }
    }

    /// Apply queued removals.
    pub(crate) fn flush_removals(&mut self) {
        for id in self.removals.take() {
            if self.remove_body(id).is_err() {
                debug!(%id, "queued body was already removed");
            }
        }
    }
}

/// Index of a body, if present.
pub(crate) fn lookup(index: &HashMap<u64, usize>, id: BodyId) -> Option<usize> {
    index.get(&id.raw()).copied()
}

/// Mutable references to two bodies by id, in argument order.
pub(crate) fn bodies_by_id<'a>(
    bodies: &'a mut [RigidBody],
    index: &HashMap<u64, usize>,
    a: BodyId,
    b: BodyId,
) -> Option<(&'a mut RigidBody, &'a mut RigidBody)> {
    pair_mut(bodies, lookup(index, a)?, lookup(index, b)?)
}

/// Borrow the endpoints of a constraint.
///
/// Returns `None` while a referenced body is missing.
pub(crate) fn constraint_bodies<'a>(
    bodies: &'a mut [RigidBody],
    index: &HashMap<u64, usize>,
    constraint: &Constraint,
) -> Option<BodyPair<'a>> {
    let a = match constraint.body_a() {
        Some(id) => Some(lookup(index, id)?),
        None => None,
    };
    let b = match constraint.body_b() {
        Some(id) => Some(lookup(index, id)?),
        None => None,
    };
    BodyPair::from_slice(bodies, a, b)
}
