//! # impel2d
//!
//! **Real-Time 2D Physics for Game Hosts**
//!
//! A sequential-impulse rigid-body engine with warm starting and soft
//! (spring-damper) contact constraints, plus pressure-based soft bodies,
//! consumed as a computation library across a narrow struct-based
//! boundary. The host owns rendering, input, and assets; this crate owns
//! the simulation.
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | **Rigid bodies** | Static / kinematic / dynamic circles and oriented boxes |
//! | **Broadphase** | Dynamic AABB tree with fat bounds and rotation balancing |
//! | **Narrow phase** | Circle–circle, SAT box–box, circle–box manifolds |
//! | **Solver** | Sequential impulses, warm starting, soft contacts, decoupled position correction |
//! | **Soft bodies** | Verlet rings with distance constraints and internal pressure |
//! | **Particles** | Bounded emitter with a parallel cull/projection pass (`parallel` feature) |
//! | **Raycasts** | Nearest-hit segment queries against all bodies |
//!
//! ## Units
//!
//! All positions and velocities are `f32` in a Y-up, pixel-scaled
//! convention (~100 px per meter); the default gravity is
//! `(0, -981)` px/s².
//!
//! ## Quick Start
//!
//! ```
//! use impel2d::prelude::*;
//!
//! let mut world = PhysicsWorld::with_capacity(64);
//!
//! let _ground = world
//!     .create_body(&BodyDef::static_box(Vec2::new(0.0, -10.0), Vec2::new(200.0, 10.0)))
//!     .unwrap();
//! let ball = world
//!     .create_body(&BodyDef::dynamic_circle(Vec2::new(0.0, 100.0), 5.0))
//!     .unwrap();
//!
//! for _ in 0..60 {
//!     world.step(1.0 / 60.0);
//! }
//!
//! let pos = world.position(ball).unwrap();
//! assert!(pos.y < 100.0);
//! ```

pub mod aabb;
pub mod body;
pub mod broadphase;
pub mod contact_cache;
pub mod error;
#[cfg(feature = "ffi")]
pub mod ffi;
pub mod filter;
pub mod material;
pub mod math;
pub mod narrowphase;
pub mod particles;
pub mod raycast;
pub mod sleep;
pub mod softbody;
pub mod solver;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aabb::Aabb;
    pub use crate::body::{BodyDef, BodyKind, RigidBody, Shape};
    pub use crate::broadphase::{Broadphase, BroadphasePair, DynamicAabbTree};
    pub use crate::error::PhysicsError;
    pub use crate::filter::CollisionFilter;
    pub use crate::material::Material;
    pub use crate::math::Vec2;
    pub use crate::narrowphase::Manifold;
    pub use crate::particles::ParticleEmitter;
    pub use crate::raycast::RayHit;
    pub use crate::softbody::SoftBody;
    pub use crate::solver::{JointSolver, Softness};
    pub use crate::world::{PhysicsConfig, PhysicsWorld, StepCounters};
}

// Re-export main types at crate root
pub use prelude::*;
