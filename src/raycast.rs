//! Ray Queries
//!
//! Segment raycasts against rigid bodies: analytic quadratic for circles,
//! a local-frame slab test for oriented boxes. `cast` scans all bodies and
//! returns the nearest hit with the fraction along the segment.

use crate::body::{RigidBody, Shape};
use crate::math::Vec2;

/// Result of a raycast: nearest body hit along the segment.
#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    /// Id of the hit body
    pub body: u32,
    /// World-space hit point
    pub point: Vec2,
    /// Surface normal at the hit point
    pub normal: Vec2,
    /// Fraction along the segment, 0.0 at `start` to 1.0 at `end`
    pub fraction: f32,
}

/// Intersect the segment `start + t·d, t ∈ [0, 1]` with a circle.
/// Returns fraction and outward normal of the nearest crossing.
fn ray_circle(start: Vec2, d: Vec2, center: Vec2, radius: f32) -> Option<(f32, Vec2)> {
    let f = start - center;

    let a = d.length_squared();
    let b = 2.0 * f.dot(d);
    let c = f.length_squared() - radius * radius;

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let t = (-b - discriminant.sqrt()) / (2.0 * a);
    if !(0.0..=1.0).contains(&t) {
        return None;
    }

    let hit = start + d * t;
    let dist = (hit - center).length();
    if dist <= 0.0 {
        return None;
    }
    Some((t, (hit - center) / dist))
}

/// Slab test against an axis-aligned box `[-half, half]` in local space.
fn ray_aabb(start: Vec2, d: Vec2, half: Vec2) -> Option<(f32, Vec2)> {
    let mut t_min = 0.0_f32;
    let mut t_max = 1.0_f32;
    let mut normal = Vec2::ZERO;

    for axis in 0..2 {
        let (s, dir, extent) = if axis == 0 {
            (start.x, d.x, half.x)
        } else {
            (start.y, d.y, half.y)
        };

        if dir.abs() < 1e-6 {
            if s < -extent || s > extent {
                return None;
            }
            continue;
        }

        let inv_d = 1.0 / dir;
        let mut t1 = (-extent - s) * inv_d;
        let mut t2 = (extent - s) * inv_d;
        let mut sign = 1.0;
        if t1 > t2 {
            core::mem::swap(&mut t1, &mut t2);
            sign = -1.0;
        }

        if t1 > t_min {
            t_min = t1;
            normal = if axis == 0 {
                Vec2::new(-sign, 0.0)
            } else {
                Vec2::new(0.0, -sign)
            };
        }
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }

    Some((t_min, normal))
}

/// Cast a segment against every body and return the nearest hit.
///
/// Degenerate zero-length segments hit nothing.
#[must_use]
pub fn cast(bodies: &[RigidBody], start: Vec2, end: Vec2) -> Option<RayHit> {
    let d = end - start;
    if d.length_squared() == 0.0 {
        return None;
    }

    let mut closest: Option<RayHit> = None;

    for body in bodies {
        let hit = match body.shape {
            Shape::Circle { radius } => ray_circle(start, d, body.position, radius),
            Shape::Box { half_extents } => {
                // Transform the segment into the box frame
                let rot = body.rot();
                let local_start = rot.apply_inv(start - body.position);
                let local_d = rot.apply_inv(d);

                ray_aabb(local_start, local_d, half_extents)
                    .map(|(t, local_normal)| (t, rot.apply(local_normal)))
            }
        };

        if let Some((fraction, normal)) = hit {
            let is_nearer = closest.map(|c| fraction < c.fraction).unwrap_or(true);
            if is_nearer {
                closest = Some(RayHit {
                    body: body.id,
                    point: start + d * fraction,
                    normal,
                    fraction,
                });
            }
        }
    }

    closest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyDef;

    fn approx(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_ray_hits_circle_front_face() {
        let bodies = vec![RigidBody::from_def(
            0,
            &BodyDef::static_circle(Vec2::ZERO, 10.0),
        )];

        let hit = cast(&bodies, Vec2::new(-20.0, 0.0), Vec2::new(20.0, 0.0))
            .expect("ray crosses the circle");
        assert_eq!(hit.body, 0);
        assert!(approx(hit.fraction, 0.25, 1e-5));
        assert!(approx(hit.point.x, -10.0, 1e-4));
        assert!(approx(hit.point.y, 0.0, 1e-4));
        assert!(approx(hit.normal.x, -1.0, 1e-5));
        assert!(approx(hit.normal.y, 0.0, 1e-5));
    }

    #[test]
    fn test_ray_misses() {
        let bodies = vec![RigidBody::from_def(
            0,
            &BodyDef::static_circle(Vec2::ZERO, 1.0),
        )];
        assert!(cast(&bodies, Vec2::new(-5.0, 3.0), Vec2::new(5.0, 3.0)).is_none());
    }

    #[test]
    fn test_ray_stops_short() {
        // Segment ends before reaching the circle
        let bodies = vec![RigidBody::from_def(
            0,
            &BodyDef::static_circle(Vec2::new(10.0, 0.0), 1.0),
        )];
        assert!(cast(&bodies, Vec2::ZERO, Vec2::new(5.0, 0.0)).is_none());
    }

    #[test]
    fn test_ray_hits_box_face() {
        let bodies = vec![RigidBody::from_def(
            0,
            &BodyDef::static_box(Vec2::ZERO, Vec2::new(2.0, 1.0)),
        )];

        let hit = cast(&bodies, Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0))
            .expect("ray crosses the box");
        assert!(approx(hit.point.x, -2.0, 1e-4));
        assert!(approx(hit.normal.x, -1.0, 1e-5));
    }

    #[test]
    fn test_ray_hits_rotated_box() {
        let mut def = BodyDef::static_box(Vec2::ZERO, Vec2::new(1.0, 1.0));
        def.rotation = core::f32::consts::FRAC_PI_4;
        let bodies = vec![RigidBody::from_def(0, &def)];

        // The rotated square extends to sqrt(2) along X
        let hit = cast(&bodies, Vec2::new(-10.0, 0.0), Vec2::new(0.0, 0.0))
            .expect("ray hits the rotated corner region");
        assert!(approx(hit.point.x, -(2.0_f32.sqrt()), 1e-3));
    }

    #[test]
    fn test_nearest_hit_wins() {
        let bodies = vec![
            RigidBody::from_def(0, &BodyDef::static_circle(Vec2::new(8.0, 0.0), 1.0)),
            RigidBody::from_def(1, &BodyDef::static_circle(Vec2::new(4.0, 0.0), 1.0)),
        ];
        let hit = cast(&bodies, Vec2::ZERO, Vec2::new(20.0, 0.0)).expect("hits both");
        assert_eq!(hit.body, 1, "Nearer body must win");
    }

    #[test]
    fn test_zero_length_segment() {
        let bodies = vec![RigidBody::from_def(
            0,
            &BodyDef::static_circle(Vec2::ZERO, 1.0),
        )];
        assert!(cast(&bodies, Vec2::ZERO, Vec2::ZERO).is_none());
    }
}
