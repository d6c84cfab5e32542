//! Scene builders shared by the scenarios.

use nalgebra::Vector2;
use nova_core::{BodyId, Material, RigidBody, RigidBodyInit, Shape, Space};

/// Fixed step used by every scenario.
pub const DT: f64 = 1.0 / 60.0;

/// Install a test-friendly subscriber. Set `RUST_LOG` to see output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Material with no bounce.
pub fn inelastic() -> Material {
    Material::BASIC.with_restitution(0.0)
}

/// A static box whose top face lies on `y = 0`.
pub fn add_ground(space: &mut Space, width: f64) -> BodyId {
    let ground = RigidBody::with_shape(
        RigidBodyInit::fixed(Vector2::new(0.0, -1.0)).with_material(inelastic()),
        Shape::rect(width, 2.0, Vector2::zeros()).unwrap(),
    )
    .unwrap();
    space.add_body(ground).unwrap()
}

/// A dynamic circle.
pub fn circle(position: Vector2<f64>, radius: f64) -> RigidBody {
    RigidBody::with_shape(
        RigidBodyInit::dynamic(position).with_material(inelastic()),
        Shape::circle(Vector2::zeros(), radius).unwrap(),
    )
    .unwrap()
}

/// A dynamic box.
pub fn boxed(position: Vector2<f64>, width: f64, height: f64) -> RigidBody {
    RigidBody::with_shape(
        RigidBodyInit::dynamic(position).with_material(inelastic()),
        Shape::rect(width, height, Vector2::zeros()).unwrap(),
    )
    .unwrap()
}

/// Step `n` times at [`DT`].
pub fn run(space: &mut Space, n: usize) {
    for _ in 0..n {
        space.step(DT);
    }
}

/// Linear plus rotational kinetic energy of one body.
pub fn energy(space: &Space, id: BodyId) -> f64 {
    let body = space.body(id).unwrap();
    body.kinetic_energy() + body.rotational_energy()
}
