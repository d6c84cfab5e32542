//! The rigid body entity.

use nalgebra::Vector2;
use nova_shape::Shape;
use nova_types::math::{cross, cross_sv, rotate};
use nova_types::{
    Aabb, BodyId, CollisionFilter, Material, PhysicsError, Result, ShapeId, Transform,
};
use tracing::warn;

use crate::init::{RigidBodyInit, RigidBodyType};

/// Base of the per-step exponential velocity decay.
const DAMPING_BASE: f64 = 0.99;

/// A rigid body composed of one or more shapes.
///
/// The body pose is stored twice: `origin` is the reference point shapes are
/// defined against, `position` is the world center of mass. Integration
/// advances `position` and derives `origin` from it.
#[derive(Debug, Clone)]
pub struct RigidBody {
    id: BodyId,
    body_type: RigidBodyType,

    origin: Vector2<f64>,
    position: Vector2<f64>,
    angle: f64,

    linear_velocity: Vector2<f64>,
    angular_velocity: f64,
    force: Vector2<f64>,
    torque: f64,

    mass: f64,
    invmass: f64,
    inertia: f64,
    invinertia: f64,
    com: Vector2<f64>,

    material: Material,
    gravity_scale: f64,
    linear_damping_scale: f64,
    angular_damping_scale: f64,
    filter: CollisionFilter,
    collision_enabled: bool,

    is_sleeping: bool,
    sleep_timer: u32,

    shapes: Vec<Shape>,
    removed_shapes: Vec<ShapeId>,
    cached_aabb: Option<Aabb>,
    transform_dirty: bool,

    /// Opaque value for the caller.
    pub user_data: u64,
}

impl RigidBody {
    /// Create a body with no shapes.
    ///
    /// Dynamic bodies have no mass until a shape is added.
    pub fn new(init: RigidBodyInit) -> Result<Self> {
        init.material.validate()?;
        if !init.origin.x.is_finite() || !init.origin.y.is_finite() || !init.angle.is_finite() {
            return Err(PhysicsError::invalid_parameter(
                "origin",
                "body pose must be finite",
            ));
        }

        Ok(Self {
            id: BodyId(0),
            body_type: init.body_type,
            origin: init.origin,
            position: init.origin,
            angle: init.angle,
            linear_velocity: init.linear_velocity,
            angular_velocity: init.angular_velocity,
            force: Vector2::zeros(),
            torque: 0.0,
            mass: 0.0,
            invmass: 0.0,
            inertia: 0.0,
            invinertia: 0.0,
            com: Vector2::zeros(),
            material: init.material,
            gravity_scale: init.gravity_scale,
            linear_damping_scale: init.linear_damping_scale,
            angular_damping_scale: init.angular_damping_scale,
            filter: init.filter,
            collision_enabled: init.collision_enabled,
            is_sleeping: false,
            sleep_timer: 0,
            shapes: Vec::new(),
            removed_shapes: Vec::new(),
            cached_aabb: None,
            transform_dirty: true,
            user_data: init.user_data,
        })
    }

    /// Convenience: create a body and add one shape.
    pub fn with_shape(init: RigidBodyInit, shape: Shape) -> Result<Self> {
        let mut body = Self::new(init)?;
        body.add_shape(shape)?;
        Ok(body)
    }

    // ========================================================================
    // Identity and kind
    // ========================================================================

    /// The body's id (zero until added to a space).
    #[must_use]
    pub fn id(&self) -> BodyId {
        self.id
    }

    /// Assign the id. Called by the owning space.
    pub fn set_id(&mut self, id: BodyId) {
        self.id = id;
    }

    /// Static or dynamic.
    #[must_use]
    pub fn body_type(&self) -> RigidBodyType {
        self.body_type
    }

    /// Shorthand for `body_type() == Static`.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.body_type == RigidBodyType::Static
    }

    /// Change the body type, recomputing mass properties.
    pub fn set_body_type(&mut self, body_type: RigidBodyType) -> Result<()> {
        let previous = self.body_type;
        self.body_type = body_type;
        if let Err(e) = self.recompute_mass() {
            self.body_type = previous;
            self.recompute_mass()?;
            return Err(e);
        }
        if self.is_static() {
            self.reset_velocities();
        }
        Ok(())
    }

    // ========================================================================
    // Shapes and mass
    // ========================================================================

    /// Shapes owned by this body.
    #[must_use]
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Look up an owned shape.
    #[must_use]
    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    /// Add a shape and recompute mass properties.
    ///
    /// The shape is rolled back if the result would be a degenerate
    /// dynamic body.
    pub fn add_shape(&mut self, shape: Shape) -> Result<ShapeId> {
        let id = shape.id();
        self.shapes.push(shape);
        if let Err(e) = self.recompute_mass() {
            self.shapes.pop();
            // The previous shape set was valid or empty; restore it
            let _ = self.recompute_mass();
            return Err(e);
        }
        self.invalidate_transform();
        Ok(id)
    }

    /// Remove a shape and recompute mass properties.
    ///
    /// Removing the last shape of a dynamic body fails with
    /// [`PhysicsError::DegenerateMass`] and leaves the body unchanged.
    ///
    /// The removed id is remembered until [`Self::take_removed_shapes`] so a
    /// space holding this body can drop contacts that reference it.
    pub fn remove_shape(&mut self, id: ShapeId) -> Result<Shape> {
        let index = self
            .shapes
            .iter()
            .position(|s| s.id() == id)
            .ok_or(PhysicsError::InvalidShapeId(id.raw()))?;
        let shape = self.shapes.remove(index);
        if let Err(e) = self.recompute_mass() {
            self.shapes.insert(index, shape);
            self.recompute_mass()?;
            return Err(e);
        }
        self.removed_shapes.push(id);
        self.invalidate_transform();
        Ok(shape)
    }

    /// Shapes removed since the last call, oldest first.
    pub fn take_removed_shapes(&mut self) -> Vec<ShapeId> {
        std::mem::take(&mut self.removed_shapes)
    }

    /// Whether shapes were removed since the last [`Self::take_removed_shapes`].
    #[must_use]
    pub fn has_removed_shapes(&self) -> bool {
        !self.removed_shapes.is_empty()
    }

    /// Recompute mass, inertia and center of mass from the shape list.
    ///
    /// Idempotent: calling it twice gives the same values.
    pub fn recompute_mass(&mut self) -> Result<()> {
        let density = self.material.density;
        let infos: Vec<_> = self.shapes.iter().map(|s| s.compute_mass(density)).collect();

        let mass: f64 = infos.iter().map(|m| m.mass).sum();
        let com = if mass > 0.0 {
            infos.iter().map(|m| m.centroid * m.mass).sum::<Vector2<f64>>() / mass
        } else {
            Vector2::zeros()
        };
        let inertia: f64 = infos
            .iter()
            .map(|m| m.inertia + m.mass * (m.centroid - com).norm_squared())
            .sum();

        match self.body_type {
            RigidBodyType::Static => {
                self.mass = mass;
                self.inertia = inertia;
                self.invmass = 0.0;
                self.invinertia = 0.0;
            }
            RigidBodyType::Dynamic => {
                if !self.shapes.is_empty() && !(mass > 0.0 && mass.is_finite()) {
                    return Err(PhysicsError::DegenerateMass {
                        body_id: self.id.raw(),
                        mass,
                    });
                }
                if self.shapes.is_empty() {
                    self.mass = 0.0;
                    self.invmass = 0.0;
                    self.inertia = 0.0;
                    self.invinertia = 0.0;
                } else {
                    self.mass = mass;
                    self.invmass = 1.0 / mass;
                    self.inertia = inertia;
                    if inertia > 0.0 {
                        self.invinertia = 1.0 / inertia;
                    } else {
                        warn!(body = %self.id, "dynamic body has zero inertia");
                        self.invinertia = 0.0;
                    }
                }
            }
        }

        self.com = com;
        self.position = self.origin + rotate(com, self.angle);
        Ok(())
    }

    /// Check that a dynamic body has usable mass.
    pub fn validate_mass(&self) -> Result<()> {
        if self.body_type == RigidBodyType::Dynamic && !(self.mass > 0.0) {
            return Err(PhysicsError::DegenerateMass {
                body_id: self.id.raw(),
                mass: self.mass,
            });
        }
        Ok(())
    }

    /// Total mass.
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Inverse mass (zero for static bodies).
    #[must_use]
    pub fn invmass(&self) -> f64 {
        self.invmass
    }

    /// Moment of inertia about the center of mass.
    #[must_use]
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Inverse inertia (zero for static bodies).
    #[must_use]
    pub fn invinertia(&self) -> f64 {
        self.invinertia
    }

    /// Override the mass, keeping the center of mass.
    pub fn set_mass(&mut self, mass: f64) -> Result<()> {
        if self.is_static() {
            return Ok(());
        }
        if !(mass > 0.0 && mass.is_finite()) {
            return Err(PhysicsError::DegenerateMass {
                body_id: self.id.raw(),
                mass,
            });
        }
        self.mass = mass;
        self.invmass = 1.0 / mass;
        Ok(())
    }

    /// Override the inertia. Zero inertia locks rotation.
    pub fn set_inertia(&mut self, inertia: f64) -> Result<()> {
        if self.is_static() {
            return Ok(());
        }
        if !(inertia >= 0.0 && inertia.is_finite()) {
            return Err(PhysicsError::invalid_parameter(
                "inertia",
                format!("must be finite and non-negative, got {inertia}"),
            ));
        }
        self.inertia = inertia;
        self.invinertia = if inertia > 0.0 { 1.0 / inertia } else { 0.0 };
        Ok(())
    }

    /// Local center of mass relative to the origin.
    #[must_use]
    pub fn local_com(&self) -> Vector2<f64> {
        self.com
    }

    // ========================================================================
    // Pose and velocity
    // ========================================================================

    /// Reference point shapes are defined against.
    #[must_use]
    pub fn origin(&self) -> Vector2<f64> {
        self.origin
    }

    /// World center of mass.
    #[must_use]
    pub fn position(&self) -> Vector2<f64> {
        self.position
    }

    /// Rotation in radians.
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Transform mapping shape-local points to world space.
    #[must_use]
    pub fn transform(&self) -> Transform {
        Transform::new(self.origin, self.angle)
    }

    /// Move the origin.
    pub fn set_origin(&mut self, origin: Vector2<f64>) {
        self.origin = origin;
        self.position = origin + rotate(self.com, self.angle);
        self.invalidate_transform();
    }

    /// Move the center of mass.
    pub fn set_position(&mut self, position: Vector2<f64>) {
        self.position = position;
        self.origin = position - rotate(self.com, self.angle);
        self.invalidate_transform();
    }

    /// Rotate about the center of mass.
    pub fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
        self.origin = self.position - rotate(self.com, angle);
        self.invalidate_transform();
    }

    /// Linear velocity of the center of mass.
    #[must_use]
    pub fn linear_velocity(&self) -> Vector2<f64> {
        self.linear_velocity
    }

    /// Angular velocity.
    #[must_use]
    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    /// Set the linear velocity. Ignored for static bodies.
    pub fn set_linear_velocity(&mut self, velocity: Vector2<f64>) {
        if !self.is_static() {
            self.linear_velocity = velocity;
        }
    }

    /// Set the angular velocity. Ignored for static bodies.
    pub fn set_angular_velocity(&mut self, velocity: f64) {
        if !self.is_static() {
            self.angular_velocity = velocity;
        }
    }

    /// Velocity of a world point attached to this body.
    #[must_use]
    pub fn velocity_at_point(&self, point: Vector2<f64>) -> Vector2<f64> {
        self.linear_velocity + cross_sv(self.angular_velocity, point - self.position)
    }

    /// Zero both velocities.
    pub fn reset_velocities(&mut self) {
        self.linear_velocity = Vector2::zeros();
        self.angular_velocity = 0.0;
    }

    // ========================================================================
    // Material, filtering, damping
    // ========================================================================

    /// Surface material.
    #[must_use]
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Replace the material, recomputing mass if the density changed.
    pub fn set_material(&mut self, material: Material) -> Result<()> {
        material.validate()?;
        let previous = self.material;
        self.material = material;
        if (previous.density - material.density).abs() > 0.0 {
            if let Err(e) = self.recompute_mass() {
                self.material = previous;
                self.recompute_mass()?;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Collision filter.
    #[must_use]
    pub fn filter(&self) -> CollisionFilter {
        self.filter
    }

    /// Replace the collision filter.
    pub fn set_filter(&mut self, filter: CollisionFilter) {
        self.filter = filter;
    }

    /// Whether collision detection is enabled.
    #[must_use]
    pub fn collision_enabled(&self) -> bool {
        self.collision_enabled
    }

    /// Enable or disable collision detection.
    pub fn set_collision_enabled(&mut self, enabled: bool) {
        self.collision_enabled = enabled;
    }

    /// Gravity multiplier.
    #[must_use]
    pub fn gravity_scale(&self) -> f64 {
        self.gravity_scale
    }

    /// Set the gravity multiplier.
    pub fn set_gravity_scale(&mut self, scale: f64) {
        self.gravity_scale = scale;
    }

    /// Linear and angular damping multipliers.
    #[must_use]
    pub fn damping_scales(&self) -> (f64, f64) {
        (self.linear_damping_scale, self.angular_damping_scale)
    }

    /// Set the damping multipliers.
    pub fn set_damping_scales(&mut self, linear: f64, angular: f64) {
        self.linear_damping_scale = linear;
        self.angular_damping_scale = angular;
    }

    // ========================================================================
    // Forces and impulses
    // ========================================================================

    /// Accumulated force this step.
    #[must_use]
    pub fn force(&self) -> Vector2<f64> {
        self.force
    }

    /// Accumulated torque this step.
    #[must_use]
    pub fn torque(&self) -> f64 {
        self.torque
    }

    /// Apply a force at the center of mass.
    pub fn apply_force(&mut self, force: Vector2<f64>) {
        if self.is_static() {
            return;
        }
        self.force += force;
        self.wake_if_pushed(force.norm_squared());
    }

    /// Apply a force at a world point, inducing a torque.
    pub fn apply_force_at(&mut self, force: Vector2<f64>, point: Vector2<f64>) {
        if self.is_static() {
            return;
        }
        self.force += force;
        self.torque += cross(point - self.position, force);
        self.wake_if_pushed(force.norm_squared());
    }

    /// Apply a torque.
    pub fn apply_torque(&mut self, torque: f64) {
        if self.is_static() {
            return;
        }
        self.torque += torque;
        self.wake_if_pushed(torque * torque);
    }

    /// Apply an impulse at lever arm `r` from the center of mass.
    #[inline]
    pub fn apply_impulse(&mut self, impulse: Vector2<f64>, r: Vector2<f64>) {
        if self.is_static() {
            return;
        }
        self.linear_velocity += impulse * self.invmass;
        self.angular_velocity += cross(r, impulse) * self.invinertia;
    }

    /// Apply an impulse at a world point.
    pub fn apply_impulse_at(&mut self, impulse: Vector2<f64>, point: Vector2<f64>) {
        let r = point - self.position;
        self.apply_impulse(impulse, r);
        self.wake_if_pushed(impulse.norm_squared());
    }

    /// Apply an angular impulse.
    #[inline]
    pub fn apply_angular_impulse(&mut self, impulse: f64) {
        if self.is_static() {
            return;
        }
        self.angular_velocity += impulse * self.invinertia;
    }

    /// Move the body directly by a position-level impulse at lever arm `r`.
    ///
    /// Velocities are untouched; used by position correction.
    #[inline]
    pub fn apply_pseudo_impulse(&mut self, impulse: Vector2<f64>, r: Vector2<f64>) {
        if self.is_static() {
            return;
        }
        self.position += impulse * self.invmass;
        self.angle += cross(r, impulse) * self.invinertia;
        self.origin = self.position - rotate(self.com, self.angle);
        self.invalidate_transform();
    }

    /// Clear accumulated force and torque.
    pub fn clear_forces(&mut self) {
        self.force = Vector2::zeros();
        self.torque = 0.0;
    }

    fn wake_if_pushed(&mut self, magnitude2: f64) {
        if self.is_sleeping && magnitude2 > 1e-20 {
            self.wake_up();
        }
    }

    // ========================================================================
    // Integration
    // ========================================================================

    /// Semi-implicit Euler velocity update with exponential damping.
    ///
    /// `linear_damping` and `angular_damping` are the global exponents;
    /// the per-body scales multiply them.
    pub fn integrate_accelerations(
        &mut self,
        gravity: Vector2<f64>,
        linear_damping: f64,
        angular_damping: f64,
        dt: f64,
    ) {
        if self.is_static() {
            self.reset_velocities();
            return;
        }

        self.linear_velocity += (self.force * self.invmass + gravity * self.gravity_scale) * dt;
        self.angular_velocity += self.torque * self.invinertia * dt;

        self.linear_velocity *= self.linear_damping_factor(linear_damping);
        self.angular_velocity *= self.angular_damping_factor(angular_damping);
    }

    /// Per-step linear velocity decay factor.
    #[must_use]
    pub fn linear_damping_factor(&self, linear_damping: f64) -> f64 {
        DAMPING_BASE.powf(self.linear_damping_scale * linear_damping)
    }

    /// Per-step angular velocity decay factor.
    #[must_use]
    pub fn angular_damping_factor(&self, angular_damping: f64) -> f64 {
        DAMPING_BASE.powf(self.angular_damping_scale * angular_damping)
    }

    /// Advance the pose by the current velocities and clear forces.
    pub fn integrate_velocities(&mut self, dt: f64) {
        if self.is_static() {
            self.reset_velocities();
            return;
        }
        self.position += self.linear_velocity * dt;
        self.angle += self.angular_velocity * dt;
        self.origin = self.position - rotate(self.com, self.angle);
        self.clear_forces();
        self.invalidate_transform();
    }

    /// Overwrite velocities and pose from a batched integration pass.
    pub fn store_integrated(
        &mut self,
        linear_velocity: Vector2<f64>,
        angular_velocity: f64,
        position: Vector2<f64>,
        angle: f64,
    ) {
        if self.is_static() {
            self.reset_velocities();
            return;
        }
        self.linear_velocity = linear_velocity;
        self.angular_velocity = angular_velocity;
        if position != self.position || angle != self.angle {
            self.position = position;
            self.angle = angle;
            self.origin = self.position - rotate(self.com, self.angle);
            self.invalidate_transform();
        }
    }

    // ========================================================================
    // Bounds and transform cache
    // ========================================================================

    /// Mark cached world geometry and bounds stale.
    pub fn invalidate_transform(&mut self) {
        self.transform_dirty = true;
        self.cached_aabb = None;
    }

    /// Whether cached world geometry is stale.
    #[must_use]
    pub fn is_transform_dirty(&self) -> bool {
        self.transform_dirty
    }

    /// Refresh world-space shape geometry and the cached AABB if stale.
    pub fn sync_transform(&mut self) {
        if !self.transform_dirty {
            return;
        }
        let xform = self.transform();
        for shape in &mut self.shapes {
            shape.transform(&xform);
        }
        self.cached_aabb = Some(self.compute_aabb());
        self.transform_dirty = false;
    }

    /// Union of all shapes' world bounds.
    ///
    /// Served from the cache when the pose has not changed since the last
    /// [`sync_transform`](Self::sync_transform).
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        self.cached_aabb.unwrap_or_else(|| self.compute_aabb())
    }

    fn compute_aabb(&self) -> Aabb {
        let xform = self.transform();
        let mut shapes = self.shapes.iter();
        match shapes.next() {
            Some(first) => shapes.fold(first.aabb(&xform), |acc, s| acc.merged(&s.aabb(&xform))),
            None => Aabb::new(self.position, self.position),
        }
    }

    // ========================================================================
    // Energy and sleeping
    // ========================================================================

    /// Linear kinetic energy `½ m |v|²`.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        if self.is_static() {
            return 0.0;
        }
        0.5 * self.mass * self.linear_velocity.norm_squared()
    }

    /// Rotational kinetic energy `½ I ω²`.
    #[must_use]
    pub fn rotational_energy(&self) -> f64 {
        if self.is_static() {
            return 0.0;
        }
        0.5 * self.inertia * self.angular_velocity * self.angular_velocity
    }

    /// Mass-independent motion measure used for sleeping: `(|v|² + ω²) dt`.
    #[must_use]
    pub fn motion_energy(&self, dt: f64) -> f64 {
        (self.linear_velocity.norm_squared() + self.angular_velocity * self.angular_velocity) * dt
    }

    /// Whether the body is asleep.
    #[must_use]
    pub fn is_sleeping(&self) -> bool {
        self.is_sleeping
    }

    /// Frames spent below the sleep threshold.
    #[must_use]
    pub fn sleep_timer(&self) -> u32 {
        self.sleep_timer
    }

    /// Advance or decay the sleep timer; returns true when it passes `limit`.
    pub fn tick_sleep_timer(&mut self, resting: bool, limit: u32) -> bool {
        if resting {
            self.sleep_timer = self.sleep_timer.saturating_add(1);
            self.sleep_timer > limit
        } else {
            self.sleep_timer = self.sleep_timer.saturating_sub(1);
            false
        }
    }

    /// Put the body to sleep, zeroing velocities and forces.
    pub fn put_to_sleep(&mut self) {
        if self.is_static() {
            return;
        }
        self.is_sleeping = true;
        self.sleep_timer = 0;
        self.reset_velocities();
        self.clear_forces();
    }

    /// Wake the body.
    pub fn wake_up(&mut self) {
        self.is_sleeping = false;
        self.sleep_timer = 0;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn ball(origin: Vector2<f64>) -> RigidBody {
        RigidBody::with_shape(
            RigidBodyInit::dynamic(origin),
            Shape::circle(Vector2::zeros(), 1.0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_mass_is_sum_of_shapes() {
        let mut body = RigidBody::new(RigidBodyInit::dynamic(Vector2::zeros())).unwrap();
        body.add_shape(Shape::rect(1.0, 1.0, Vector2::new(-1.0, 0.0)).unwrap())
            .unwrap();
        body.add_shape(Shape::rect(1.0, 1.0, Vector2::new(1.0, 0.0)).unwrap())
            .unwrap();

        assert_relative_eq!(body.mass(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(body.local_com(), Vector2::zeros(), epsilon = 1e-12);
        // Two unit squares 1 away from the COM: 2 * (1/6 + 1)
        assert_relative_eq!(body.inertia(), 2.0 * (1.0 / 6.0 + 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_recompute_mass_is_idempotent() {
        let mut body = ball(Vector2::zeros());
        body.add_shape(Shape::rect(2.0, 0.5, Vector2::new(0.0, 2.0)).unwrap())
            .unwrap();
        let (m, i, c) = (body.mass(), body.inertia(), body.local_com());
        body.recompute_mass().unwrap();
        assert_eq!(body.mass(), m);
        assert_eq!(body.inertia(), i);
        assert_eq!(body.local_com(), c);
    }

    #[test]
    fn test_add_then_remove_restores_mass() {
        let mut body = ball(Vector2::zeros());
        let before = (body.mass(), body.inertia());
        let id = body
            .add_shape(Shape::rect(2.0, 0.5, Vector2::new(0.0, 2.0)).unwrap())
            .unwrap();
        assert!(body.mass() > before.0);
        body.remove_shape(id).unwrap();
        assert_relative_eq!(body.mass(), before.0, epsilon = 1e-12);
        assert_relative_eq!(body.inertia(), before.1, epsilon = 1e-12);

        assert!(body.has_removed_shapes());
        assert_eq!(body.take_removed_shapes(), vec![id]);
        assert!(!body.has_removed_shapes());
    }

    #[test]
    fn test_removing_last_shape_of_dynamic_body_fails() {
        let mut body = ball(Vector2::zeros());
        let id = body.shapes()[0].id();
        let err = body.remove_shape(id).unwrap_err();
        assert!(matches!(err, PhysicsError::DegenerateMass { .. }));
        assert_eq!(body.shapes().len(), 1);
        assert!(!body.has_removed_shapes());
        assert!(body.mass() > 0.0);
    }

    #[test]
    fn test_zero_density_shape_rejected() {
        let init = RigidBodyInit::dynamic(Vector2::zeros())
            .with_material(Material::BASIC.with_density(0.0));
        let mut body = RigidBody::new(init).unwrap();
        let err = body
            .add_shape(Shape::circle(Vector2::zeros(), 1.0).unwrap())
            .unwrap_err();
        assert!(matches!(err, PhysicsError::DegenerateMass { .. }));
        assert!(body.shapes().is_empty());
    }

    #[test]
    fn test_static_body_has_zero_inverse_mass() {
        let body = RigidBody::with_shape(
            RigidBodyInit::fixed(Vector2::zeros()),
            Shape::rect(10.0, 1.0, Vector2::zeros()).unwrap(),
        )
        .unwrap();
        assert_eq!(body.invmass(), 0.0);
        assert_eq!(body.invinertia(), 0.0);
    }

    #[test]
    fn test_static_ignores_forces_and_impulses() {
        let mut body = RigidBody::with_shape(
            RigidBodyInit::fixed(Vector2::zeros()),
            Shape::rect(10.0, 1.0, Vector2::zeros()).unwrap(),
        )
        .unwrap();
        body.apply_force(Vector2::new(100.0, 0.0));
        body.apply_impulse_at(Vector2::new(10.0, 10.0), Vector2::new(1.0, 0.0));
        body.integrate_accelerations(Vector2::new(0.0, -9.81), 0.0, 0.0, 1.0 / 60.0);
        body.integrate_velocities(1.0 / 60.0);
        assert_eq!(body.linear_velocity(), Vector2::zeros());
        assert_eq!(body.position(), Vector2::zeros());
    }

    #[test]
    fn test_force_at_point_induces_torque() {
        let mut body = ball(Vector2::zeros());
        body.apply_force_at(Vector2::new(0.0, 2.0), Vector2::new(1.0, 0.0));
        assert_eq!(body.force(), Vector2::new(0.0, 2.0));
        assert_relative_eq!(body.torque(), 2.0);
    }

    #[test]
    fn test_semi_implicit_euler() {
        let mut body = ball(Vector2::new(0.0, 10.0));
        let dt = 0.1;
        body.integrate_accelerations(Vector2::new(0.0, -10.0), 0.0, 0.0, dt);
        assert_relative_eq!(body.linear_velocity(), Vector2::new(0.0, -1.0));
        body.integrate_velocities(dt);
        // Position uses the updated velocity
        assert_relative_eq!(body.position(), Vector2::new(0.0, 9.9), epsilon = 1e-12);
        assert_eq!(body.force(), Vector2::zeros());
    }

    #[test]
    fn test_damping_decays_velocity() {
        let mut body = ball(Vector2::zeros());
        body.set_linear_velocity(Vector2::new(1.0, 0.0));
        body.set_angular_velocity(1.0);
        body.integrate_accelerations(Vector2::zeros(), 1.0, 2.0, 1.0 / 60.0);
        assert_relative_eq!(body.linear_velocity().x, 0.99);
        assert_relative_eq!(body.angular_velocity(), 0.99 * 0.99);
    }

    #[test]
    fn test_position_tracks_offset_center_of_mass() {
        let mut body = RigidBody::with_shape(
            RigidBodyInit::dynamic(Vector2::new(1.0, 1.0)),
            Shape::circle(Vector2::new(1.0, 0.0), 0.5).unwrap(),
        )
        .unwrap();
        assert_relative_eq!(body.position(), Vector2::new(2.0, 1.0));

        body.set_angle(PI / 2.0);
        // Rotates about the center of mass; the origin swings around it
        assert_relative_eq!(body.position(), Vector2::new(2.0, 1.0));
        assert_relative_eq!(body.origin(), Vector2::new(2.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_aabb_cache_invalidation() {
        let mut body = ball(Vector2::zeros());
        body.sync_transform();
        assert!(!body.is_transform_dirty());
        let before = body.aabb();

        body.set_origin(Vector2::new(5.0, 0.0));
        assert!(body.is_transform_dirty());
        assert_relative_eq!(body.aabb().center(), Vector2::new(5.0, 0.0));
        assert_ne!(body.aabb(), before);
    }

    #[test]
    fn test_energy() {
        let mut body = ball(Vector2::zeros());
        body.set_linear_velocity(Vector2::new(2.0, 0.0));
        body.set_angular_velocity(-3.0);
        assert_relative_eq!(body.kinetic_energy(), 0.5 * body.mass() * 4.0);
        assert_relative_eq!(body.rotational_energy(), 0.5 * body.inertia() * 9.0);
        assert!(body.rotational_energy() > 0.0);
    }

    #[test]
    fn test_sleep_and_wake() {
        let mut body = ball(Vector2::zeros());
        body.set_linear_velocity(Vector2::new(1.0, 0.0));
        body.put_to_sleep();
        assert!(body.is_sleeping());
        assert_eq!(body.linear_velocity(), Vector2::zeros());

        body.apply_force(Vector2::new(1.0, 0.0));
        assert!(!body.is_sleeping());
    }

    #[test]
    fn test_sleep_timer() {
        let mut body = ball(Vector2::zeros());
        assert!(!body.tick_sleep_timer(true, 2));
        assert!(!body.tick_sleep_timer(true, 2));
        assert!(body.tick_sleep_timer(true, 2));
        assert!(!body.tick_sleep_timer(false, 2));
        assert_eq!(body.sleep_timer(), 2);
    }

    #[test]
    fn test_pseudo_impulse_moves_without_velocity() {
        let mut body = ball(Vector2::zeros());
        let m = body.mass();
        body.apply_pseudo_impulse(Vector2::new(m, 0.0), Vector2::zeros());
        assert_relative_eq!(body.position(), Vector2::new(1.0, 0.0));
        assert_eq!(body.linear_velocity(), Vector2::zeros());
    }
}
