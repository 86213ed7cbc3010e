//! Rigid Body Store Types
//!
//! Bodies live in a dense, world-owned array; a body's id is its index and
//! stays valid for the lifetime of the world (bodies are never removed in
//! this design). Mass and inertia are derived from kind and shape at
//! creation; shape dimensions never change afterwards.

use crate::aabb::Aabb;
use crate::filter::CollisionFilter;
use crate::material::Material;
use crate::math::{Rot, Vec2};

/// How a body participates in the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BodyKind {
    /// Never moves; infinite mass
    Static = 0,
    /// Moved by velocity writes from the host, pushes dynamic bodies
    Kinematic = 1,
    /// Fully simulated (gravity, forces, impulses)
    Dynamic = 2,
}

/// Collision shape of a rigid body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// Circle centered on the body position
    Circle {
        /// Radius in world units (pixels)
        radius: f32,
    },
    /// Oriented box centered on the body position
    Box {
        /// Half width / half height
        half_extents: Vec2,
    },
}

impl Shape {
    /// Rotational inertia for this shape at the given mass.
    ///
    /// Circle: `m·r²/2`. Box: `m·(w² + h²)/12` with full extents.
    #[must_use]
    pub fn inertia(&self, mass: f32) -> f32 {
        match *self {
            Shape::Circle { radius } => 0.5 * mass * radius * radius,
            Shape::Box { half_extents } => {
                let w = 2.0 * half_extents.x;
                let h = 2.0 * half_extents.y;
                mass * (w * w + h * h) / 12.0
            }
        }
    }
}

/// Creation parameters for a rigid body.
#[derive(Clone, Copy, Debug)]
pub struct BodyDef {
    /// Simulation kind
    pub kind: BodyKind,
    /// Collision shape
    pub shape: Shape,
    /// Initial position
    pub position: Vec2,
    /// Initial rotation (radians, counter-clockwise)
    pub rotation: f32,
    /// Surface material
    pub material: Material,
    /// Collision filter bits
    pub filter: CollisionFilter,
    /// Sensor bodies detect contacts but generate no collision response
    pub is_sensor: bool,
    /// Reserved flag for continuous collision detection; not exercised
    /// by the solver
    pub is_bullet: bool,
}

impl BodyDef {
    /// Dynamic circle at `position`.
    #[must_use]
    pub fn dynamic_circle(position: Vec2, radius: f32) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            shape: Shape::Circle { radius },
            position,
            ..Self::default()
        }
    }

    /// Dynamic box at `position`.
    #[must_use]
    pub fn dynamic_box(position: Vec2, half_extents: Vec2) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            shape: Shape::Box { half_extents },
            position,
            ..Self::default()
        }
    }

    /// Static box at `position` (floors, walls).
    #[must_use]
    pub fn static_box(position: Vec2, half_extents: Vec2) -> Self {
        Self {
            kind: BodyKind::Static,
            shape: Shape::Box { half_extents },
            position,
            ..Self::default()
        }
    }

    /// Static circle at `position`.
    #[must_use]
    pub fn static_circle(position: Vec2, radius: f32) -> Self {
        Self {
            kind: BodyKind::Static,
            shape: Shape::Circle { radius },
            position,
            ..Self::default()
        }
    }
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            kind: BodyKind::Dynamic,
            shape: Shape::Circle { radius: 0.5 },
            position: Vec2::ZERO,
            rotation: 0.0,
            material: Material::default(),
            filter: CollisionFilter::DEFAULT,
            is_sensor: false,
            is_bullet: false,
        }
    }
}

/// A rigid body. New fields are appended, never inserted: foreign hosts
/// may map this layout directly.
#[derive(Clone, Copy, Debug)]
pub struct RigidBody {
    /// Stable id (= index in the world's body array)
    pub id: u32,
    /// Simulation kind
    pub kind: BodyKind,
    /// Collision shape
    pub shape: Shape,
    /// World-space position of the center
    pub position: Vec2,
    /// Rotation in radians
    pub rotation: f32,
    /// Linear velocity
    pub velocity: Vec2,
    /// Angular velocity (rad/s)
    pub angular_velocity: f32,
    /// Force accumulated for the current step
    pub force: Vec2,
    /// Torque accumulated for the current step
    pub torque: f32,
    /// Mass (0 for static)
    pub mass: f32,
    /// Inverse mass (0 for static)
    pub inv_mass: f32,
    /// Rotational inertia (0 for static)
    pub inertia: f32,
    /// Inverse rotational inertia (0 for static)
    pub inv_inertia: f32,
    /// Surface material
    pub material: Material,
    /// Collision filter bits
    pub filter: CollisionFilter,
    /// Sensor flag: detect without response
    pub is_sensor: bool,
    /// Reserved CCD flag, not exercised by the solver
    pub is_bullet: bool,
    /// Contacts recorded this step
    pub contact_count: u32,
    /// Seconds spent below the sleep thresholds
    pub sleep_time: f32,
    /// False while the body is asleep
    pub awake: bool,
    /// Broadphase proxy id
    pub(crate) proxy_id: u32,
}

impl RigidBody {
    /// Build a body from a definition. Static bodies get zero inverse
    /// mass and inverse inertia exactly; everything else gets unit mass
    /// with shape-derived inertia.
    #[must_use]
    pub fn from_def(id: u32, def: &BodyDef) -> Self {
        let (mass, inv_mass, inertia, inv_inertia) = if def.kind == BodyKind::Static {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let mass = 1.0;
            let inertia = def.shape.inertia(mass);
            (mass, 1.0 / mass, inertia, 1.0 / inertia)
        };

        Self {
            id,
            kind: def.kind,
            shape: def.shape,
            position: def.position,
            rotation: def.rotation,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            force: Vec2::ZERO,
            torque: 0.0,
            mass,
            inv_mass,
            inertia,
            inv_inertia,
            material: def.material,
            filter: def.filter,
            is_sensor: def.is_sensor,
            is_bullet: def.is_bullet,
            contact_count: 0,
            sleep_time: 0.0,
            awake: true,
            proxy_id: u32::MAX,
        }
    }

    /// True for static bodies.
    #[inline]
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.kind == BodyKind::Static
    }

    /// True for dynamic bodies.
    #[inline]
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }

    /// Cached rotation for repeated local-frame transforms.
    #[inline]
    #[must_use]
    pub fn rot(&self) -> Rot {
        Rot::from_angle(self.rotation)
    }

    /// Tight world-space bounding box for the current pose.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        match self.shape {
            Shape::Circle { radius } => {
                let r = Vec2::splat(radius);
                Aabb::new(self.position - r, self.position + r)
            }
            Shape::Box { half_extents } => {
                let rot = self.rot();
                // Extent of a rotated box along each axis is the absolute
                // rotation applied to the half extents
                let ex = half_extents.x * rot.cos.abs() + half_extents.y * rot.sin.abs();
                let ey = half_extents.x * rot.sin.abs() + half_extents.y * rot.cos.abs();
                let e = Vec2::new(ex, ey);
                Aabb::new(self.position - e, self.position + e)
            }
        }
    }

    /// Clear the sleep timer and mark the body awake.
    #[inline]
    pub fn wake(&mut self) {
        self.awake = true;
        self.sleep_time = 0.0;
    }

    /// Accumulate a force for this step and wake the body.
    #[inline]
    pub fn apply_force(&mut self, force: Vec2) {
        self.force += force;
        self.wake();
    }

    /// Accumulate a torque for this step and wake the body.
    #[inline]
    pub fn apply_torque(&mut self, torque: f32) {
        self.torque += torque;
        self.wake();
    }

    /// Overwrite the linear velocity and wake the body.
    #[inline]
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
        self.wake();
    }
}
