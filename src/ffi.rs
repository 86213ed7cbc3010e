//! C Foreign Function Interface
//!
//! A C-compatible boundary for foreign hosts (Flutter/Dart, game engines)
//! mirroring the crate's world operations. Structures here are `#[repr(C)]`
//! and their field order is part of the contract: new fields are appended,
//! never inserted, because hosts map this memory directly.
//!
//! # Safety
//!
//! All functions taking raw pointers require either a valid pointer from
//! `impel2d_world_create` or null; null worlds are no-ops returning
//! defaults. The caller owns the world lifecycle (create/destroy pairs).

use crate::body::{BodyDef, BodyKind, Shape};
use crate::filter::CollisionFilter;
use crate::math::Vec2;
use crate::world::{PhysicsConfig, PhysicsWorld};

/// ABI version reported by [`impel2d_version`]
const FFI_VERSION: i32 = 1;

/// Sentinel id returned when creation fails
const INVALID_ID: i32 = -1;

/// C-compatible raycast result.
#[repr(C)]
pub struct RawRayHit {
    /// Id of the hit body, -1 when nothing was hit
    pub body_id: i32,
    /// Hit point X
    pub x: f32,
    /// Hit point Y
    pub y: f32,
    /// Surface normal X
    pub normal_x: f32,
    /// Surface normal Y
    pub normal_y: f32,
    /// Fraction along the segment (0..1)
    pub fraction: f32,
    /// 1 on hit, 0 otherwise
    pub hit: i32,
}

impl RawRayHit {
    fn miss() -> Self {
        Self {
            body_id: INVALID_ID,
            x: 0.0,
            y: 0.0,
            normal_x: 0.0,
            normal_y: 0.0,
            fraction: 1.0,
            hit: 0,
        }
    }
}

/// Create a physics world sized for `max_bodies`.
///
/// Returns an owned pointer; release it with [`impel2d_world_destroy`].
#[no_mangle]
pub extern "C" fn impel2d_world_create(max_bodies: i32) -> *mut PhysicsWorld {
    let config = PhysicsConfig {
        max_bodies: max_bodies.max(0) as usize,
        ..PhysicsConfig::default()
    };
    Box::into_raw(Box::new(PhysicsWorld::new(config)))
}

/// Destroy a world created by [`impel2d_world_create`].
///
/// # Safety
///
/// `world` must be null or a pointer previously returned by
/// [`impel2d_world_create`] that has not been destroyed yet.
#[no_mangle]
pub unsafe extern "C" fn impel2d_world_destroy(world: *mut PhysicsWorld) {
    if !world.is_null() {
        drop(Box::from_raw(world));
    }
}

/// Advance the world by `dt` seconds. Null world or `dt <= 0` is a no-op.
///
/// # Safety
///
/// `world` must be null or a live world pointer.
#[no_mangle]
pub unsafe extern "C" fn impel2d_step(world: *mut PhysicsWorld, dt: f32) {
    if let Some(world) = world.as_mut() {
        world.step(dt);
    }
}

/// Create a body.
///
/// `kind`: 0 = static, 1 = kinematic, 2 = dynamic. `shape`: 0 = circle
/// (radius = min(w, h) / 2), 1 = box (w × h full extents). Returns the
/// body id or -1 at capacity / on invalid arguments.
///
/// # Safety
///
/// `world` must be null or a live world pointer.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn impel2d_create_body(
    world: *mut PhysicsWorld,
    kind: i32,
    shape: i32,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    rotation: f32,
    category_bits: u32,
    mask_bits: u32,
) -> i32 {
    let world = match world.as_mut() {
        Some(world) => world,
        None => return INVALID_ID,
    };

    let kind = match kind {
        0 => BodyKind::Static,
        1 => BodyKind::Kinematic,
        2 => BodyKind::Dynamic,
        _ => return INVALID_ID,
    };
    let shape = match shape {
        0 => Shape::Circle {
            radius: w.min(h) / 2.0,
        },
        1 => Shape::Box {
            half_extents: Vec2::new(w / 2.0, h / 2.0),
        },
        _ => return INVALID_ID,
    };

    let def = BodyDef {
        kind,
        shape,
        position: Vec2::new(x, y),
        rotation,
        filter: CollisionFilter::new(category_bits, mask_bits),
        ..BodyDef::default()
    };

    match world.create_body(&def) {
        Ok(id) => id as i32,
        Err(_) => INVALID_ID,
    }
}

/// Accumulate a force on a body. Invalid ids are no-ops.
///
/// # Safety
///
/// `world` must be null or a live world pointer.
#[no_mangle]
pub unsafe extern "C" fn impel2d_apply_force(
    world: *mut PhysicsWorld,
    body_id: i32,
    fx: f32,
    fy: f32,
) {
    if let Some(world) = world.as_mut() {
        if body_id >= 0 {
            world.apply_force(body_id as usize, Vec2::new(fx, fy));
        }
    }
}

/// Accumulate a torque on a body. Invalid ids are no-ops.
///
/// # Safety
///
/// `world` must be null or a live world pointer.
#[no_mangle]
pub unsafe extern "C" fn impel2d_apply_torque(world: *mut PhysicsWorld, body_id: i32, torque: f32) {
    if let Some(world) = world.as_mut() {
        if body_id >= 0 {
            world.apply_torque(body_id as usize, torque);
        }
    }
}

/// Overwrite a body's linear velocity. Invalid ids are no-ops.
///
/// # Safety
///
/// `world` must be null or a live world pointer.
#[no_mangle]
pub unsafe extern "C" fn impel2d_set_body_velocity(
    world: *mut PhysicsWorld,
    body_id: i32,
    vx: f32,
    vy: f32,
) {
    if let Some(world) = world.as_mut() {
        if body_id >= 0 {
            world.set_velocity(body_id as usize, Vec2::new(vx, vy));
        }
    }
}

/// Read a body position into `out_x` / `out_y`. Invalid ids leave the
/// outputs untouched.
///
/// # Safety
///
/// `world` must be null or a live world pointer; `out_x` and `out_y`
/// must be valid writable pointers.
#[no_mangle]
pub unsafe extern "C" fn impel2d_get_body_position(
    world: *const PhysicsWorld,
    body_id: i32,
    out_x: *mut f32,
    out_y: *mut f32,
) {
    let world = match world.as_ref() {
        Some(world) => world,
        None => return,
    };
    if body_id < 0 || out_x.is_null() || out_y.is_null() {
        return;
    }
    if let Some(position) = world.position(body_id as usize) {
        *out_x = position.x;
        *out_y = position.y;
    }
}

/// Cast a segment and return the nearest hit.
///
/// # Safety
///
/// `world` must be null or a live world pointer.
#[no_mangle]
pub unsafe extern "C" fn impel2d_ray_cast(
    world: *const PhysicsWorld,
    start_x: f32,
    start_y: f32,
    end_x: f32,
    end_y: f32,
) -> RawRayHit {
    let world = match world.as_ref() {
        Some(world) => world,
        None => return RawRayHit::miss(),
    };

    match world.raycast(Vec2::new(start_x, start_y), Vec2::new(end_x, end_y)) {
        Some(hit) => RawRayHit {
            body_id: hit.body as i32,
            x: hit.point.x,
            y: hit.point.y,
            normal_x: hit.normal.x,
            normal_y: hit.normal.y,
            fraction: hit.fraction,
            hit: 1,
        },
        None => RawRayHit::miss(),
    }
}

/// Create a soft body from parallel coordinate arrays of length
/// `point_count`. Returns the soft-body id or -1.
///
/// # Safety
///
/// `world` must be null or a live world pointer; `xs` and `ys` must point
/// to at least `point_count` readable floats.
#[no_mangle]
pub unsafe extern "C" fn impel2d_create_soft_body(
    world: *mut PhysicsWorld,
    point_count: i32,
    xs: *const f32,
    ys: *const f32,
    pressure: f32,
    stiffness: f32,
) -> i32 {
    let world = match world.as_mut() {
        Some(world) => world,
        None => return INVALID_ID,
    };
    if point_count < 3 || xs.is_null() || ys.is_null() {
        return INVALID_ID;
    }

    let n = point_count as usize;
    let xs = core::slice::from_raw_parts(xs, n);
    let ys = core::slice::from_raw_parts(ys, n);
    let ring: Vec<Vec2> = xs
        .iter()
        .zip(ys.iter())
        .map(|(&x, &y)| Vec2::new(x, y))
        .collect();

    match world.create_soft_body(&ring, pressure, stiffness) {
        Ok(id) => id as i32,
        Err(_) => INVALID_ID,
    }
}

/// Read a soft-body point into `out_x` / `out_y`. Invalid ids leave the
/// outputs untouched.
///
/// # Safety
///
/// `world` must be null or a live world pointer; `out_x` and `out_y`
/// must be valid writable pointers.
#[no_mangle]
pub unsafe extern "C" fn impel2d_get_soft_body_point(
    world: *const PhysicsWorld,
    soft_body_id: i32,
    point_index: i32,
    out_x: *mut f32,
    out_y: *mut f32,
) {
    let world = match world.as_ref() {
        Some(world) => world,
        None => return,
    };
    if soft_body_id < 0 || point_index < 0 || out_x.is_null() || out_y.is_null() {
        return;
    }
    if let Some(point) = world.soft_body_point(soft_body_id as usize, point_index as usize) {
        *out_x = point.x;
        *out_y = point.y;
    }
}

/// Teleport a soft-body point. Invalid ids are no-ops.
///
/// # Safety
///
/// `world` must be null or a live world pointer.
#[no_mangle]
pub unsafe extern "C" fn impel2d_set_soft_body_point(
    world: *mut PhysicsWorld,
    soft_body_id: i32,
    point_index: i32,
    x: f32,
    y: f32,
) {
    if let Some(world) = world.as_mut() {
        if soft_body_id >= 0 && point_index >= 0 {
            world.set_soft_body_point(
                soft_body_id as usize,
                point_index as usize,
                Vec2::new(x, y),
            );
        }
    }
}

/// ABI version of this library.
#[no_mangle]
pub extern "C" fn impel2d_version() -> i32 {
    FFI_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_lifecycle_and_body() {
        let world = impel2d_world_create(16);
        assert!(!world.is_null());

        unsafe {
            let ground = impel2d_create_body(
                world, 0, 1, 0.0, -10.0, 400.0, 20.0, 0.0, u32::MAX, u32::MAX,
            );
            assert_eq!(ground, 0);

            let ball =
                impel2d_create_body(world, 2, 0, 0.0, 50.0, 10.0, 10.0, 0.0, u32::MAX, u32::MAX);
            assert_eq!(ball, 1);

            for _ in 0..30 {
                impel2d_step(world, 1.0 / 60.0);
            }

            let (mut x, mut y) = (0.0_f32, 0.0_f32);
            impel2d_get_body_position(world, ball, &mut x, &mut y);
            assert!(y < 50.0, "Ball must have fallen, y = {y}");

            impel2d_world_destroy(world);
        }
    }

    #[test]
    fn test_invalid_inputs_return_sentinels() {
        unsafe {
            assert_eq!(
                impel2d_create_body(
                    core::ptr::null_mut(),
                    2,
                    0,
                    0.0,
                    0.0,
                    1.0,
                    1.0,
                    0.0,
                    1,
                    1
                ),
                INVALID_ID
            );

            let world = impel2d_world_create(1);
            // Unknown shape code
            assert_eq!(
                impel2d_create_body(world, 2, 9, 0.0, 0.0, 1.0, 1.0, 0.0, 1, 1),
                INVALID_ID
            );
            // Null world step and destroy are harmless
            impel2d_step(core::ptr::null_mut(), 1.0 / 60.0);
            impel2d_world_destroy(core::ptr::null_mut());
            impel2d_world_destroy(world);
        }
    }

    #[test]
    fn test_ray_cast_ffi() {
        let world = impel2d_world_create(4);
        unsafe {
            impel2d_create_body(world, 0, 0, 0.0, 0.0, 20.0, 20.0, 0.0, u32::MAX, u32::MAX);

            let hit = impel2d_ray_cast(world, -20.0, 0.0, 20.0, 0.0);
            assert_eq!(hit.hit, 1);
            assert_eq!(hit.body_id, 0);
            assert!((hit.fraction - 0.25).abs() < 1e-4);

            let miss = impel2d_ray_cast(world, -20.0, 50.0, 20.0, 50.0);
            assert_eq!(miss.hit, 0);
            assert_eq!(miss.body_id, INVALID_ID);

            impel2d_world_destroy(world);
        }
    }

    #[test]
    fn test_soft_body_ffi() {
        let world = impel2d_world_create(4);
        unsafe {
            let xs = [-5.0_f32, 5.0, 5.0, -5.0];
            let ys = [-5.0_f32, -5.0, 5.0, 5.0];
            let id = impel2d_create_soft_body(world, 4, xs.as_ptr(), ys.as_ptr(), 100.0, 0.5);
            assert_eq!(id, 0);

            impel2d_set_soft_body_point(world, id, 0, -6.0, -6.0);
            let (mut x, mut y) = (0.0_f32, 0.0_f32);
            impel2d_get_soft_body_point(world, id, 0, &mut x, &mut y);
            assert_eq!((x, y), (-6.0, -6.0));

            // Degenerate ring rejected
            assert_eq!(
                impel2d_create_soft_body(world, 2, xs.as_ptr(), ys.as_ptr(), 0.0, 0.5),
                INVALID_ID
            );

            impel2d_world_destroy(world);
        }
    }
}
