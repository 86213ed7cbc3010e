//! Narrow-Phase Collision Detection
//!
//! Exact shape-pair tests producing a contact [`Manifold`]: circle–circle
//! by distance, box–box by a separating-axis test over the four face
//! normals, circle–box by closest-point clamping in the box frame.
//!
//! The manifold normal ALWAYS points from the first body toward the
//! second, for every shape ordering — both swap cases are resolved here so
//! callers never flip signs. Manifolds are produced fresh per query and
//! never cached: the solver re-evaluates them against corrected poses
//! during position iterations.

use crate::body::{RigidBody, Shape};
use crate::math::{Rot, Vec2};

/// Maximum contact points per manifold (two for face-to-face box contact)
pub const MAX_MANIFOLD_POINTS: usize = 2;

/// Tolerance when matching incident vertices against the reference
/// projection interval
const CONTACT_SLOP: f32 = 0.01;

/// Result of one narrow-phase query.
#[derive(Clone, Copy, Debug)]
pub struct Manifold {
    /// Contact normal, pointing from body A toward body B
    pub normal: Vec2,
    /// Penetration depth (positive = overlapping)
    pub penetration: f32,
    /// World-space contact points
    pub points: [Vec2; MAX_MANIFOLD_POINTS],
    /// Number of valid entries in `points` (1 or 2)
    pub point_count: usize,
}

impl Manifold {
    fn one(normal: Vec2, penetration: f32, point: Vec2) -> Self {
        Self {
            normal,
            penetration,
            points: [point, Vec2::ZERO],
            point_count: 1,
        }
    }

    /// Flip the manifold to the opposite body order.
    fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self
    }
}

/// Test two bodies for intersection.
///
/// Returns `None` when separated; otherwise a manifold whose normal points
/// from `a` toward `b`.
#[must_use]
pub fn collide(a: &RigidBody, b: &RigidBody) -> Option<Manifold> {
    match (a.shape, b.shape) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(a.position, ra, b.position, rb)
        }
        (Shape::Box { .. }, Shape::Box { .. }) => box_box(a, b),
        // circle_box reports the normal from the box toward the circle
        (Shape::Circle { .. }, Shape::Box { .. }) => circle_box(a, b).map(Manifold::flipped),
        (Shape::Box { .. }, Shape::Circle { .. }) => circle_box(b, a),
    }
}

/// Circle vs circle: direct distance test.
///
/// Coincident centers are an explicit edge case: the normal defaults to +Y
/// and the penetration to the first circle's radius, so two spawned-on-top
/// bodies separate deterministically instead of producing NaN.
fn circle_circle(pos_a: Vec2, radius_a: f32, pos_b: Vec2, radius_b: f32) -> Option<Manifold> {
    let d = pos_b - pos_a;
    let dist_sq = d.length_squared();
    let radius_sum = radius_a + radius_b;

    if dist_sq >= radius_sum * radius_sum {
        return None;
    }

    if dist_sq == 0.0 {
        return Some(Manifold::one(Vec2::Y, radius_a, pos_a));
    }

    let dist = dist_sq.sqrt();
    let normal = d / dist;
    Some(Manifold::one(
        normal,
        radius_sum - dist,
        pos_b - normal * radius_b,
    ))
}

/// World-space corners of an oriented box.
fn box_corners(position: Vec2, rot: Rot, half: Vec2) -> [Vec2; 4] {
    [
        position + rot.apply(Vec2::new(-half.x, -half.y)),
        position + rot.apply(Vec2::new(half.x, -half.y)),
        position + rot.apply(Vec2::new(half.x, half.y)),
        position + rot.apply(Vec2::new(-half.x, half.y)),
    ]
}

/// Projection interval of corners onto an axis.
fn project(corners: &[Vec2; 4], axis: Vec2) -> (f32, f32) {
    let mut min = axis.dot(corners[0]);
    let mut max = min;
    for corner in &corners[1..] {
        let p = axis.dot(*corner);
        min = min.min(p);
        max = max.max(p);
    }
    (min, max)
}

/// Oriented box vs oriented box via SAT over the four face normals.
///
/// The box owning the minimum-overlap axis becomes the reference; the
/// other box's vertices that fall within the reference projection (at
/// most two) become contacts, each pushed half the overlap along the
/// normal. Falls back to the incident center for degenerate vertex
/// contact.
fn box_box(a: &RigidBody, b: &RigidBody) -> Option<Manifold> {
    let (ha, hb) = match (a.shape, b.shape) {
        (Shape::Box { half_extents: ha }, Shape::Box { half_extents: hb }) => (ha, hb),
        _ => return None,
    };

    let rot_a = a.rot();
    let rot_b = b.rot();
    let corners_a = box_corners(a.position, rot_a, ha);
    let corners_b = box_corners(b.position, rot_b, hb);

    let axes = [
        rot_a.apply(Vec2::X),
        rot_a.apply(Vec2::Y),
        rot_b.apply(Vec2::X),
        rot_b.apply(Vec2::Y),
    ];

    let mut min_overlap = f32::MAX;
    let mut best_axis = Vec2::X;
    let mut a_is_reference = true;

    for (i, axis) in axes.iter().enumerate() {
        let (min_a, max_a) = project(&corners_a, *axis);
        let (min_b, max_b) = project(&corners_b, *axis);

        let overlap = max_a.min(max_b) - min_a.max(min_b);
        if overlap <= 0.0 {
            return None;
        }

        if overlap < min_overlap {
            min_overlap = overlap;
            best_axis = *axis;
            a_is_reference = i < 2;
        }
    }

    // Orient the normal from A toward B
    let d = b.position - a.position;
    if best_axis.dot(d) < 0.0 {
        best_axis = -best_axis;
    }

    let (ref_corners, inc_corners, inc_center) = if a_is_reference {
        (&corners_a, &corners_b, b.position)
    } else {
        (&corners_b, &corners_a, a.position)
    };

    let (ref_min, ref_max) = project(ref_corners, best_axis);

    let mut manifold = Manifold {
        normal: best_axis,
        penetration: min_overlap,
        points: [Vec2::ZERO; MAX_MANIFOLD_POINTS],
        point_count: 0,
    };

    for corner in inc_corners {
        let p = best_axis.dot(*corner);
        if p <= ref_max + CONTACT_SLOP && p >= ref_min - CONTACT_SLOP {
            manifold.points[manifold.point_count] = *corner + best_axis * (min_overlap * 0.5);
            manifold.point_count += 1;
            if manifold.point_count >= MAX_MANIFOLD_POINTS {
                break;
            }
        }
    }

    // Vertex-on-vertex contact can leave no qualifying corner
    if manifold.point_count == 0 {
        manifold.points[0] = inc_center;
        manifold.point_count = 1;
    }

    Some(manifold)
}

/// Circle vs oriented box via closest-point clamping in the box frame.
///
/// Returns the normal pointing from the BOX toward the CIRCLE; the
/// dispatcher re-orients it per argument order. A circle center inside the
/// box pushes out along the axis of least penetration rather than
/// producing a zero-length normal.
fn circle_box(circle: &RigidBody, boxy: &RigidBody) -> Option<Manifold> {
    let radius = match circle.shape {
        Shape::Circle { radius } => radius,
        _ => return None,
    };
    let half = match boxy.shape {
        Shape::Box { half_extents } => half_extents,
        _ => return None,
    };

    let rot = boxy.rot();
    let local = rot.apply_inv(circle.position - boxy.position);
    let closest = local.clamp(-half, half);
    let local_normal = local - closest;
    let dist_sq = local_normal.length_squared();

    let center_outside = local.x.abs() > half.x || local.y.abs() > half.y;
    if dist_sq > radius * radius && center_outside {
        return None;
    }

    let dist;
    let normal;
    if dist_sq > 1e-8 {
        dist = dist_sq.sqrt();
        normal = rot.apply(local_normal / dist);
    } else {
        // Center inside the box: exit along the shallowest face
        let dx = half.x - local.x.abs();
        let dy = half.y - local.y.abs();
        if dx < dy {
            normal = rot.apply(Vec2::new(local.x.signum(), 0.0));
            dist = -dx;
        } else {
            normal = rot.apply(Vec2::new(0.0, local.y.signum()));
            dist = -dy;
        }
    }

    Some(Manifold::one(
        normal,
        radius - dist,
        boxy.position + rot.apply(closest),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyDef, BodyKind};

    fn circle_at(x: f32, y: f32, r: f32) -> RigidBody {
        RigidBody::from_def(0, &BodyDef::dynamic_circle(Vec2::new(x, y), r))
    }

    fn box_at(x: f32, y: f32, hx: f32, hy: f32, rotation: f32) -> RigidBody {
        let mut def = BodyDef::dynamic_box(Vec2::new(x, y), Vec2::new(hx, hy));
        def.rotation = rotation;
        RigidBody::from_def(1, &def)
    }

    fn approx(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_circle_circle_penetration() {
        // r1 + r2 = 3, centers 2 apart => penetration 1
        let a = circle_at(0.0, 0.0, 1.0);
        let b = circle_at(2.0, 0.0, 2.0);
        let m = collide(&a, &b).expect("circles overlap");
        assert!(approx(m.penetration, 1.0, 1e-6));
        assert!(approx(m.normal.x, 1.0, 1e-6));
        assert_eq!(m.point_count, 1);
    }

    #[test]
    fn test_circle_circle_separated() {
        let a = circle_at(0.0, 0.0, 1.0);
        let b = circle_at(5.0, 0.0, 1.0);
        assert!(collide(&a, &b).is_none());
    }

    #[test]
    fn test_circle_circle_touching_is_separated() {
        // d == r1 + r2 exactly: colliding iff d < r1 + r2
        let a = circle_at(0.0, 0.0, 1.0);
        let b = circle_at(2.0, 0.0, 1.0);
        assert!(collide(&a, &b).is_none());
    }

    #[test]
    fn test_circle_circle_coincident_centers() {
        let a = circle_at(0.0, 0.0, 1.5);
        let b = circle_at(0.0, 0.0, 1.0);
        let m = collide(&a, &b).expect("coincident circles overlap");
        assert_eq!(m.normal, Vec2::Y, "Degenerate case uses +Y normal");
        assert!(approx(m.penetration, 1.5, 1e-6), "Penetration is A's radius");
    }

    #[test]
    fn test_box_box_face_contact_two_points() {
        // Axis-aligned boxes overlapping along Y by 0.5
        let a = box_at(0.0, 0.0, 2.0, 1.0, 0.0);
        let b = box_at(0.0, 1.5, 2.0, 1.0, 0.0);
        let m = collide(&a, &b).expect("boxes overlap");
        assert_eq!(m.point_count, 2, "Face contact yields two points");
        assert!(approx(m.penetration, 0.5, 1e-5));
        assert!(approx(m.normal.y, 1.0, 1e-5), "Normal points A toward B");
    }

    #[test]
    fn test_box_box_separated() {
        let a = box_at(0.0, 0.0, 1.0, 1.0, 0.0);
        let b = box_at(5.0, 0.0, 1.0, 1.0, 0.0);
        assert!(collide(&a, &b).is_none());
    }

    #[test]
    fn test_box_box_rotated_vertex_contact() {
        // 45-degree box resting corner-first on a flat box
        let a = box_at(0.0, 0.0, 2.0, 1.0, 0.0);
        let b = box_at(0.0, 2.3, 1.0, 1.0, core::f32::consts::FRAC_PI_4);
        let m = collide(&a, &b).expect("corner touches");
        assert!(m.point_count >= 1);
        assert!(m.normal.y > 0.9, "Contact normal is the flat box's top face");
    }

    #[test]
    fn test_circle_box_face() {
        let a = circle_at(0.0, 2.4, 1.0);
        let b = box_at(0.0, 0.0, 2.0, 1.5, 0.0);
        let m = collide(&a, &b).expect("circle touches box top");
        // A is the circle above the box: normal must point down toward B
        assert!(m.normal.y < -0.99);
        assert!(approx(m.penetration, 0.1, 1e-5));
    }

    #[test]
    fn test_circle_box_center_inside() {
        let a = circle_at(0.1, 0.0, 0.5);
        let b = box_at(0.0, 0.0, 2.0, 1.0, 0.0);
        let m = collide(&a, &b).expect("center inside always collides");
        // Shallowest exit at (0.1, 0) in a 2x1 half-extent box is the Y face
        assert!(m.normal.x.abs() < 1e-5);
        assert!(m.penetration > 0.5, "Inside case reports deep penetration");
    }

    #[test]
    fn test_normal_orientation_symmetry() {
        // collide(a, b) and collide(b, a) must disagree only in sign
        let circle = circle_at(0.0, 2.4, 1.0);
        let boxy = box_at(0.0, 0.0, 2.0, 1.5, 0.0);

        let ab = collide(&circle, &boxy).expect("overlap");
        let ba = collide(&boxy, &circle).expect("overlap");
        assert!(approx(ab.normal.x, -ba.normal.x, 1e-6));
        assert!(approx(ab.normal.y, -ba.normal.y, 1e-6));
        assert!(approx(ab.penetration, ba.penetration, 1e-6));

        let c1 = circle_at(0.0, 0.0, 1.0);
        let c2 = circle_at(1.5, 0.0, 1.0);
        let m12 = collide(&c1, &c2).expect("overlap");
        let m21 = collide(&c2, &c1).expect("overlap");
        assert!(approx(m12.normal.x, -m21.normal.x, 1e-6));
    }

    #[test]
    fn test_static_body_shapes_also_collide() {
        let mut def = BodyDef::static_box(Vec2::ZERO, Vec2::new(10.0, 1.0));
        def.kind = BodyKind::Static;
        let ground = RigidBody::from_def(0, &def);
        let ball = circle_at(0.0, 1.5, 1.0);
        assert!(collide(&ball, &ground).is_some());
    }
}
