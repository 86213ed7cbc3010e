//! Sequential-Impulse Contact Solver
//!
//! Builds one contact constraint per colliding pair per step, warm-starts
//! it from the previous step's impulses, runs fixed velocity iterations,
//! then removes residual penetration with a decoupled position pass.
//!
//! # Soft contacts
//!
//! Instead of a hard positional bias inside the velocity solve, contacts
//! use a spring-damper discretized implicitly from a frequency (Hz) and a
//! damping ratio. The soft bias intentionally leaves some penetration
//! behind, which the separate Baumgarte position pass removes — the two
//! passes are complementary, not redundant.
//!
//! # Ordering
//!
//! Per iteration, per constraint, per point: normal impulse first, then
//! friction clamped against that same iteration's normal impulse. This
//! ordering is required for convergence.

use crate::body::{BodyKind, RigidBody};
use crate::contact_cache::{ContactKey, ImpulseCache};
use crate::math::{cross, cross_sv, Vec2};
use crate::narrowphase::{self, Manifold, MAX_MANIFOLD_POINTS};
use crate::sleep::SleepConfig;

/// Spring-damper coefficients for soft contact constraints.
///
/// Derived from a contact frequency and damping ratio via the implicit
/// discretization `ω = 2π·hertz`, `a1 = 2ζ + hω`, `a2 = hω·a1`,
/// `a3 = 1/(1 + a2)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Softness {
    /// Bias velocity per unit separation: `ω / a1`
    pub bias_rate: f32,
    /// Impulse scale applied to the velocity error: `a2·a3`
    pub mass_scale: f32,
    /// Relaxation of the accumulated impulse: `a3`
    pub impulse_scale: f32,
}

impl Softness {
    /// Rigid contact: no bias, full mass, no relaxation. Penetration is
    /// then handled entirely by the Baumgarte position pass.
    pub const RIGID: Self = Self {
        bias_rate: 0.0,
        mass_scale: 1.0,
        impulse_scale: 0.0,
    };

    /// Compute coefficients for a timestep `h`. A `hertz` of zero
    /// disables softness.
    #[must_use]
    pub fn new(hertz: f32, damping_ratio: f32, h: f32) -> Self {
        if hertz <= 0.0 {
            return Self::RIGID;
        }

        let omega = 2.0 * core::f32::consts::PI * hertz;
        let a1 = 2.0 * damping_ratio + h * omega;
        let a2 = h * omega * a1;
        let a3 = 1.0 / (1.0 + a2);

        Self {
            bias_rate: omega / a1,
            mass_scale: a2 * a3,
            impulse_scale: a3,
        }
    }
}

/// One contact point within a constraint.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContactPoint {
    /// Contact point relative to body A's center
    pub anchor_a: Vec2,
    /// Contact point relative to body B's center
    pub anchor_b: Vec2,
    /// Separation at build time (negative penetration)
    pub base_separation: f32,
    /// Accumulated normal impulse, always >= 0
    pub normal_impulse: f32,
    /// Accumulated tangent impulse, clamped to the friction cone
    pub tangent_impulse: f32,
    /// Effective mass along the normal
    pub normal_mass: f32,
    /// Effective mass along the tangent
    pub tangent_mass: f32,
}

/// Velocity constraint for one colliding pair, rebuilt every step.
#[derive(Clone, Copy, Debug)]
pub struct ContactConstraint {
    /// Index of body A
    pub body_a: usize,
    /// Index of body B
    pub body_b: usize,
    /// Contact normal (A toward B)
    pub normal: Vec2,
    /// Combined friction (geometric mean of both materials)
    pub friction: f32,
    /// Combined restitution, zeroed below the approach-speed threshold
    pub restitution: f32,
    /// Soft constraint coefficients for this step
    pub softness: Softness,
    /// Contact points
    pub points: [ContactPoint; MAX_MANIFOLD_POINTS],
    /// Number of valid points
    pub point_count: usize,
}

impl ContactConstraint {
    /// Build a constraint from a fresh manifold.
    ///
    /// Effective masses are recomputed every step because the lever arms
    /// move with the bodies. Restitution only applies when the bodies
    /// approach faster than `restitution_threshold`, which keeps resting
    /// contacts from buzzing.
    #[must_use]
    pub fn new(
        bodies: &[RigidBody],
        body_a: usize,
        body_b: usize,
        manifold: &Manifold,
        softness: Softness,
        restitution_threshold: f32,
    ) -> Self {
        let a = &bodies[body_a];
        let b = &bodies[body_b];
        let normal = manifold.normal;
        let tangent = normal.perp();

        let relative_normal_velocity = (b.velocity - a.velocity).dot(normal);
        let restitution = if relative_normal_velocity < -restitution_threshold {
            a.material.combined_restitution(&b.material)
        } else {
            0.0
        };

        let mut constraint = Self {
            body_a,
            body_b,
            normal,
            friction: a.material.combined_friction(&b.material),
            restitution,
            softness,
            points: [ContactPoint::default(); MAX_MANIFOLD_POINTS],
            point_count: manifold.point_count,
        };

        for (i, point) in manifold.points[..manifold.point_count].iter().enumerate() {
            let ra = *point - a.position;
            let rb = *point - b.position;

            let ra_n = cross(ra, normal);
            let rb_n = cross(rb, normal);
            let k_normal = a.inv_mass
                + b.inv_mass
                + ra_n * ra_n * a.inv_inertia
                + rb_n * rb_n * b.inv_inertia;

            let ra_t = cross(ra, tangent);
            let rb_t = cross(rb, tangent);
            let k_tangent = a.inv_mass
                + b.inv_mass
                + ra_t * ra_t * a.inv_inertia
                + rb_t * rb_t * b.inv_inertia;

            constraint.points[i] = ContactPoint {
                anchor_a: ra,
                anchor_b: rb,
                base_separation: -manifold.penetration,
                normal_impulse: 0.0,
                tangent_impulse: 0.0,
                // Zero effective mass (static vs kinematic-free pair)
                // disables the point
                normal_mass: if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 },
                tangent_mass: if k_tangent > 0.0 { 1.0 / k_tangent } else { 0.0 },
            };
        }

        constraint
    }
}

/// Apply an impulse to both bodies of a constraint. Static bodies never
/// move; kinematic bodies carry finite mass and do respond.
#[inline]
fn apply_impulse(
    bodies: &mut [RigidBody],
    body_a: usize,
    body_b: usize,
    ra: Vec2,
    rb: Vec2,
    impulse: Vec2,
) {
    let a = &mut bodies[body_a];
    if a.kind != BodyKind::Static {
        a.velocity -= impulse * a.inv_mass;
        a.angular_velocity -= cross(ra, impulse) * a.inv_inertia;
    }
    let b = &mut bodies[body_b];
    if b.kind != BodyKind::Static {
        b.velocity += impulse * b.inv_mass;
        b.angular_velocity += cross(rb, impulse) * b.inv_inertia;
    }
}

/// Relative velocity of body B with respect to body A at a contact point.
#[inline]
fn relative_velocity(bodies: &[RigidBody], c: &ContactConstraint, p: &ContactPoint) -> Vec2 {
    let a = &bodies[c.body_a];
    let b = &bodies[c.body_b];
    (b.velocity + cross_sv(b.angular_velocity, p.anchor_b))
        - (a.velocity + cross_sv(a.angular_velocity, p.anchor_a))
}

/// Integrate forces into velocities and advance sleep timers.
///
/// Dynamic bodies gain `gravity + force·inv_mass` and `torque·inv_inertia`
/// scaled by `dt`, then a damping factor and a linear speed clamp for
/// stability. Kinematic bodies keep their host-written velocity untouched.
/// Accumulated force/torque reset to zero either way.
pub fn integrate_forces(
    bodies: &mut [RigidBody],
    gravity: Vec2,
    dt: f32,
    damping: f32,
    max_linear_velocity: f32,
    sleep: &SleepConfig,
) {
    for body in bodies.iter_mut() {
        if body.is_static() {
            continue;
        }

        sleep.advance(body, dt);
        if !body.awake {
            continue;
        }

        if body.is_dynamic() {
            body.velocity += (gravity + body.force * body.inv_mass) * dt;
            body.angular_velocity += body.torque * body.inv_inertia * dt;

            let speed_sq = body.velocity.length_squared();
            if speed_sq > max_linear_velocity * max_linear_velocity {
                body.velocity *= max_linear_velocity / speed_sq.sqrt();
            }

            body.velocity *= damping;
            body.angular_velocity *= damping;
        }

        body.force = Vec2::ZERO;
        body.torque = 0.0;
    }
}

/// Seed accumulated impulses from the previous step's cache and re-apply
/// them to the bodies before iterating.
pub fn warm_start(
    bodies: &mut [RigidBody],
    constraints: &mut [ContactConstraint],
    cache: &ImpulseCache,
) {
    for c in constraints.iter_mut() {
        let id_a = bodies[c.body_a].id;
        let id_b = bodies[c.body_b].id;
        let normal = c.normal;
        let tangent = normal.perp();

        for (j, p) in c.points[..c.point_count].iter_mut().enumerate() {
            let key = ContactKey::new(id_a, id_b, j as u8);
            match cache.get(key) {
                Some((normal_impulse, tangent_impulse)) => {
                    p.normal_impulse = normal_impulse;
                    p.tangent_impulse = tangent_impulse;

                    let impulse = normal * normal_impulse + tangent * tangent_impulse;
                    apply_impulse(bodies, c.body_a, c.body_b, p.anchor_a, p.anchor_b, impulse);
                }
                None => {
                    p.normal_impulse = 0.0;
                    p.tangent_impulse = 0.0;
                }
            }
        }
    }
}

/// True when a body can drive a constraint: awake and not static.
/// Static bodies never count as awake partners, so a body resting on
/// static ground is still allowed to fall asleep.
#[inline]
fn is_active(body: &RigidBody) -> bool {
    body.awake && body.kind != BodyKind::Static
}

/// One velocity iteration over all constraints.
///
/// A constraint with no active participant is skipped; an active partner
/// wakes a sleeping one, but an already-awake body's sleep timer is left
/// alone so resting contacts can still drift to sleep.
pub fn solve_velocity(bodies: &mut [RigidBody], constraints: &mut [ContactConstraint]) {
    for c in constraints.iter_mut() {
        if !is_active(&bodies[c.body_a]) && !is_active(&bodies[c.body_b]) {
            continue;
        }
        if !bodies[c.body_a].awake && !bodies[c.body_a].is_static() {
            bodies[c.body_a].wake();
        }
        if !bodies[c.body_b].awake && !bodies[c.body_b].is_static() {
            bodies[c.body_b].wake();
        }

        let normal = c.normal;
        let tangent = normal.perp();

        for j in 0..c.point_count {
            // Normal impulse with soft bias and restitution bounce
            let dv = relative_velocity(bodies, c, &c.points[j]);
            let vn = dv.dot(normal);

            let p = &mut c.points[j];
            let mut bias = c.softness.mass_scale * c.softness.bias_rate * p.base_separation;
            if c.restitution > 0.0 {
                bias -= c.restitution * vn;
            }

            let lambda = -p.normal_mass * (c.softness.mass_scale * vn + bias)
                - c.softness.impulse_scale * p.normal_impulse;

            // Clamp the ACCUMULATED impulse: contacts push, never pull
            let old_impulse = p.normal_impulse;
            p.normal_impulse = (old_impulse + lambda).max(0.0);
            let lambda = p.normal_impulse - old_impulse;

            let (anchor_a, anchor_b) = (p.anchor_a, p.anchor_b);
            apply_impulse(bodies, c.body_a, c.body_b, anchor_a, anchor_b, normal * lambda);

            // Friction from the post-normal-impulse relative velocity,
            // clamped to the friction cone of this iteration's normal
            // impulse
            let dv = relative_velocity(bodies, c, &c.points[j]);
            let p = &mut c.points[j];
            let lambda_t = -p.tangent_mass * dv.dot(tangent);
            let max_friction = c.friction * p.normal_impulse;

            let old_impulse = p.tangent_impulse;
            p.tangent_impulse = (old_impulse + lambda_t).clamp(-max_friction, max_friction);
            let lambda_t = p.tangent_impulse - old_impulse;

            let (anchor_a, anchor_b) = (p.anchor_a, p.anchor_b);
            apply_impulse(
                bodies,
                c.body_a,
                c.body_b,
                anchor_a,
                anchor_b,
                tangent * lambda_t,
            );
        }
    }
}

/// Persist solved impulses into the warm-start cache for the next step.
pub fn store_impulses(
    bodies: &[RigidBody],
    constraints: &[ContactConstraint],
    cache: &mut ImpulseCache,
) {
    for c in constraints {
        let id_a = bodies[c.body_a].id;
        let id_b = bodies[c.body_b].id;
        for (j, p) in c.points[..c.point_count].iter().enumerate() {
            let key = ContactKey::new(id_a, id_b, j as u8);
            cache.store(key, p.normal_impulse, p.tangent_impulse);
        }
    }
}

/// Advance poses by velocity. Static and sleeping bodies stay put.
pub fn integrate_positions(bodies: &mut [RigidBody], dt: f32) {
    for body in bodies.iter_mut() {
        if body.is_static() || !body.awake {
            continue;
        }
        body.position += body.velocity * dt;
        body.rotation += body.angular_velocity * dt;
    }
}

/// One position-correction iteration.
///
/// Narrow-phase is re-evaluated against the CURRENT (corrected) poses —
/// intentionally, every iteration — and remaining penetration beyond
/// `slop` is removed by a direct positional push distributed by inverse
/// mass, without touching velocities.
pub fn correct_positions(
    bodies: &mut [RigidBody],
    constraints: &[ContactConstraint],
    slop: f32,
    baumgarte: f32,
) {
    for c in constraints {
        if !is_active(&bodies[c.body_a]) && !is_active(&bodies[c.body_b]) {
            continue;
        }

        let manifold = match narrowphase::collide(&bodies[c.body_a], &bodies[c.body_b]) {
            Some(m) => m,
            None => continue,
        };

        let correction = (manifold.penetration - slop).max(0.0) * baumgarte;
        if correction <= 0.0 {
            continue;
        }

        let impulse_per_point = correction / manifold.point_count as f32;
        for point in &manifold.points[..manifold.point_count] {
            let ra = *point - bodies[c.body_a].position;
            let rb = *point - bodies[c.body_b].position;
            let ra_n = cross(ra, manifold.normal);
            let rb_n = cross(rb, manifold.normal);
            let k = bodies[c.body_a].inv_mass
                + bodies[c.body_b].inv_mass
                + ra_n * ra_n * bodies[c.body_a].inv_inertia
                + rb_n * rb_n * bodies[c.body_b].inv_inertia;
            if k <= 1e-6 {
                continue;
            }

            let impulse = manifold.normal * (impulse_per_point / k);

            let a = &mut bodies[c.body_a];
            if a.kind != BodyKind::Static {
                a.position -= impulse * a.inv_mass;
                a.rotation -= cross(ra, impulse) * a.inv_inertia;
            }
            let b = &mut bodies[c.body_b];
            if b.kind != BodyKind::Static {
                b.position += impulse * b.inv_mass;
                b.rotation += cross(rb, impulse) * b.inv_inertia;
            }
        }
    }
}

/// Velocity/position hooks for an external joint subsystem.
///
/// The solver invokes these at the same pipeline points the contact
/// constraints run; the default implementations do nothing, and this
/// crate ships no joints of its own.
pub trait JointSolver {
    /// Called once per step before the velocity iterations.
    fn init_velocity(&mut self, bodies: &mut [RigidBody], dt: f32) {
        let _ = (bodies, dt);
    }

    /// Called once per velocity iteration, after the contact pass.
    fn solve_velocity(&mut self, bodies: &mut [RigidBody]) {
        let _ = bodies;
    }

    /// Called once per position iteration, after the contact pass.
    fn solve_position(&mut self, bodies: &mut [RigidBody]) {
        let _ = bodies;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyDef;

    fn approx(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_softness_coefficients() {
        let h = 1.0 / 60.0;
        let s = Softness::new(30.0, 1.0, h);

        let omega = 2.0 * core::f32::consts::PI * 30.0;
        let a1 = 2.0 + h * omega;
        assert!(approx(s.bias_rate, omega / a1, 1e-3));
        // mass_scale = a2·a3 and impulse_scale = a3 always sum to 1
        assert!(approx(s.mass_scale + s.impulse_scale, 1.0, 1e-6));
        assert!(s.mass_scale > 0.9, "High-frequency contact is nearly rigid");
    }

    #[test]
    fn test_softness_zero_hertz_is_rigid() {
        let s = Softness::new(0.0, 1.0, 1.0 / 60.0);
        assert_eq!(s, Softness::RIGID);
        assert_eq!(s.mass_scale, 1.0);
        assert_eq!(s.impulse_scale, 0.0);
    }

    fn overlapping_circles(vy_b: f32) -> (Vec<RigidBody>, ContactConstraint) {
        let a = RigidBody::from_def(0, &BodyDef::dynamic_circle(Vec2::new(0.0, 0.0), 1.0));
        let mut b = RigidBody::from_def(1, &BodyDef::dynamic_circle(Vec2::new(0.0, 1.8), 1.0));
        b.velocity = Vec2::new(0.0, vy_b);
        let bodies = vec![a, b];

        let manifold = narrowphase::collide(&bodies[0], &bodies[1]).expect("overlap");
        let c = ContactConstraint::new(
            &bodies,
            0,
            1,
            &manifold,
            Softness::new(120.0, 1.0, 1.0 / 60.0),
            100.0,
        );
        (bodies, c)
    }

    #[test]
    fn test_normal_impulse_never_negative() {
        // Approaching bodies
        let (mut bodies, c) = overlapping_circles(-50.0);
        let mut constraints = [c];
        for _ in 0..8 {
            solve_velocity(&mut bodies, &mut constraints);
            for p in &constraints[0].points[..constraints[0].point_count] {
                assert!(p.normal_impulse >= 0.0);
            }
        }

        // Separating bodies: impulse clamps at zero instead of pulling
        let (mut bodies, c) = overlapping_circles(500.0);
        let mut constraints = [c];
        for _ in 0..8 {
            solve_velocity(&mut bodies, &mut constraints);
            for p in &constraints[0].points[..constraints[0].point_count] {
                assert!(p.normal_impulse >= 0.0);
            }
        }
    }

    #[test]
    fn test_friction_cone_clamp() {
        let (mut bodies, c) = overlapping_circles(-50.0);
        bodies[1].velocity.x = 30.0;
        let mut constraints = [c];

        for _ in 0..8 {
            solve_velocity(&mut bodies, &mut constraints);
            let c = &constraints[0];
            for p in &c.points[..c.point_count] {
                assert!(
                    p.tangent_impulse.abs() <= c.friction * p.normal_impulse + 1e-4,
                    "tangent {} exceeds cone {}",
                    p.tangent_impulse,
                    c.friction * p.normal_impulse
                );
            }
        }
    }

    #[test]
    fn test_restitution_gated_by_threshold() {
        // Slow approach: restitution suppressed
        let (bodies, c) = overlapping_circles(-10.0);
        assert_eq!(c.restitution, 0.0);
        drop(bodies);

        // Fast approach: restitution active
        let (bodies, c) = overlapping_circles(-500.0);
        assert!(c.restitution > 0.0);
        drop(bodies);
    }

    #[test]
    fn test_static_pair_has_zero_effective_mass() {
        let a = RigidBody::from_def(0, &BodyDef::static_circle(Vec2::new(0.0, 0.0), 1.0));
        let b = RigidBody::from_def(1, &BodyDef::static_circle(Vec2::new(0.0, 1.5), 1.0));
        let bodies = vec![a, b];
        let manifold = narrowphase::collide(&bodies[0], &bodies[1]).expect("overlap");
        let c = ContactConstraint::new(&bodies, 0, 1, &manifold, Softness::RIGID, 100.0);
        assert_eq!(c.points[0].normal_mass, 0.0, "Zero mass disables the point");
    }

    #[test]
    fn test_integrate_forces_applies_gravity() {
        let mut bodies = vec![RigidBody::from_def(
            0,
            &BodyDef::dynamic_circle(Vec2::ZERO, 1.0),
        )];
        let gravity = Vec2::new(0.0, -981.0);
        let dt = 1.0 / 60.0;
        integrate_forces(&mut bodies, gravity, dt, 1.0, 1e6, &SleepConfig::default());

        assert!(approx(bodies[0].velocity.y, -981.0 * dt, 1e-4));
        assert_eq!(bodies[0].position, Vec2::ZERO, "Forces do not move the pose");
    }

    #[test]
    fn test_integrate_forces_skips_kinematic_gravity() {
        let mut def = BodyDef::dynamic_circle(Vec2::ZERO, 1.0);
        def.kind = BodyKind::Kinematic;
        let mut bodies = vec![RigidBody::from_def(0, &def)];
        bodies[0].velocity = Vec2::new(5.0, 0.0);

        integrate_forces(
            &mut bodies,
            Vec2::new(0.0, -981.0),
            1.0 / 60.0,
            0.999,
            1e6,
            &SleepConfig::default(),
        );
        assert_eq!(
            bodies[0].velocity,
            Vec2::new(5.0, 0.0),
            "Kinematic velocity is host-owned"
        );
    }

    #[test]
    fn test_velocity_clamp() {
        let mut bodies = vec![RigidBody::from_def(
            0,
            &BodyDef::dynamic_circle(Vec2::ZERO, 1.0),
        )];
        bodies[0].velocity = Vec2::new(1e7, 0.0);
        integrate_forces(
            &mut bodies,
            Vec2::ZERO,
            1.0 / 60.0,
            1.0,
            1000.0,
            &SleepConfig::default(),
        );
        assert!(bodies[0].velocity.length() <= 1000.0 + 1e-3);
    }

    #[test]
    fn test_position_correction_reduces_penetration() {
        let mut bodies = vec![
            RigidBody::from_def(0, &BodyDef::static_box(Vec2::ZERO, Vec2::new(10.0, 1.0))),
            RigidBody::from_def(1, &BodyDef::dynamic_circle(Vec2::new(0.0, 1.5), 1.0)),
        ];
        let manifold = narrowphase::collide(&bodies[0], &bodies[1]).expect("overlap");
        let before = manifold.penetration;
        let constraints = [ContactConstraint::new(
            &bodies,
            0,
            1,
            &manifold,
            Softness::RIGID,
            100.0,
        )];

        for _ in 0..10 {
            correct_positions(&mut bodies, &constraints, 0.01, 0.2);
        }

        let after = narrowphase::collide(&bodies[0], &bodies[1])
            .map(|m| m.penetration)
            .unwrap_or(0.0);
        assert!(after < before, "Penetration must shrink: {after} < {before}");
    }

    #[test]
    fn test_warm_start_reapplies_cached_impulse() {
        let (mut bodies, c) = overlapping_circles(0.0);
        let mut constraints = [c];

        let mut cache = ImpulseCache::new();
        cache.begin_step();
        cache.store(ContactKey::new(0, 1, 0), 10.0, 0.0);

        let vy_before = bodies[1].velocity.y;
        warm_start(&mut bodies, &mut constraints, &cache);

        assert_eq!(constraints[0].points[0].normal_impulse, 10.0);
        assert!(
            bodies[1].velocity.y > vy_before,
            "Cached impulse pushes B along the normal"
        );
    }
}
