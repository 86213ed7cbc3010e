//! Pressure-Based Soft Bodies
//!
//! A soft body is a closed ring of Verlet points held together by distance
//! constraints (perimeter edges plus sparser interior cross supports) and
//! inflated toward a target enclosed area, approximating internal
//! pressure. This is a mass-spring model, not an energy-conserving
//! integrator; stability comes from the relaxation iteration count and
//! stiffness tuning.
//!
//! Soft bodies step inside the same per-frame pipeline as rigid bodies and
//! reuse the rigid shapes' closest-point tests for collision response, but
//! exchange no impulses with them: points are pushed out of penetration
//! and their Verlet velocity is damped to emulate friction.

use crate::aabb::Aabb;
use crate::body::{RigidBody, Shape};
use crate::error::PhysicsError;
use crate::math::Vec2;

/// Verlet integration damping applied to the implicit velocity
const VERLET_DAMPING: f32 = 0.99;

/// Relaxation passes per step
const RELAX_ITERATIONS: usize = 10;

/// Scale applied to `area deficit × pressure` when inflating
const PRESSURE_SCALE: f32 = 1e-5;

/// Collision radius given to each point against rigid shapes
const POINT_RADIUS: f32 = 2.0;

/// Interior cross supports are softer than the perimeter
const INTERIOR_STIFFNESS_SCALE: f32 = 0.1;

/// One Verlet point: implicit velocity is `position - prev_position`.
#[derive(Clone, Copy, Debug)]
pub struct SoftPoint {
    /// Current position
    pub position: Vec2,
    /// Position at the previous step
    pub prev_position: Vec2,
    /// Point mass (uniform across the ring)
    pub mass: f32,
}

/// Distance constraint between two points of the ring.
#[derive(Clone, Copy, Debug)]
pub struct SoftConstraint {
    /// First point index
    pub p1: usize,
    /// Second point index
    pub p2: usize,
    /// Rest length to relax toward
    pub rest_length: f32,
    /// Fraction of the error corrected per pass
    pub stiffness: f32,
}

/// A closed deformable ring, world-owned and sized once at creation.
#[derive(Clone, Debug)]
pub struct SoftBody {
    /// Stable id (= index in the world's soft body array)
    pub id: u32,
    /// Point ring in winding order
    pub points: Vec<SoftPoint>,
    /// Perimeter edges plus interior cross supports
    pub constraints: Vec<SoftConstraint>,
    /// Enclosed area the pressure term inflates toward
    pub target_area: f32,
    /// Internal pressure strength
    pub pressure: f32,
    /// Friction against rigid bodies
    pub friction: f32,
    /// Restitution against rigid bodies
    pub restitution: f32,
}

impl SoftBody {
    /// Build a soft body from a point ring.
    ///
    /// Creates one perimeter constraint per edge at full stiffness and
    /// `n/2` interior cross supports at a tenth of it. The target area is
    /// the ring's initial enclosed area.
    pub fn new(id: u32, ring: &[Vec2], pressure: f32, stiffness: f32) -> Result<Self, PhysicsError> {
        if ring.len() < 3 {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "soft body ring needs at least 3 points",
            });
        }

        let n = ring.len();
        let points = ring
            .iter()
            .map(|&p| SoftPoint {
                position: p,
                prev_position: p,
                mass: 1.0,
            })
            .collect();

        let mut constraints = Vec::with_capacity(n + n / 2);
        for i in 0..n {
            let j = (i + 1) % n;
            constraints.push(SoftConstraint {
                p1: i,
                p2: j,
                rest_length: ring[i].distance(ring[j]),
                stiffness,
            });
        }
        for i in 0..n / 2 {
            let j = (i + n / 2) % n;
            constraints.push(SoftConstraint {
                p1: i,
                p2: j,
                rest_length: ring[i].distance(ring[j]),
                stiffness: stiffness * INTERIOR_STIFFNESS_SCALE,
            });
        }

        Ok(Self {
            id,
            points,
            constraints,
            target_area: polygon_area(ring.iter().copied()),
            pressure,
            friction: 0.4,
            restitution: 0.2,
        })
    }

    /// Current enclosed area (shoelace).
    #[must_use]
    pub fn area(&self) -> f32 {
        polygon_area(self.points.iter().map(|p| p.position))
    }

    /// Read a point position.
    #[must_use]
    pub fn point(&self, index: usize) -> Option<Vec2> {
        self.points.get(index).map(|p| p.position)
    }

    /// Teleport a point, zeroing its implicit velocity so host-side
    /// dragging does not inject energy.
    pub fn set_point(&mut self, index: usize, position: Vec2) {
        if let Some(p) = self.points.get_mut(index) {
            p.position = position;
            p.prev_position = position;
        }
    }

    /// Advance the soft body by `dt`.
    ///
    /// Verlet integration, `RELAX_ITERATIONS` constraint/pressure passes,
    /// collision response against every rigid body, then a clamp to the
    /// world bounds. Returns the number of rigid contacts resolved.
    pub fn step(&mut self, gravity: Vec2, dt: f32, rigid_bodies: &[RigidBody], bounds: &Aabb) -> u32 {
        self.integrate(gravity, dt);

        for _ in 0..RELAX_ITERATIONS {
            self.relax_constraints();
            self.apply_pressure();
        }

        let contacts = self.collide_with_rigid_bodies(rigid_bodies);
        self.clamp_to_bounds(bounds);
        contacts
    }

    /// Verlet step: `new = pos + (pos - prev)·damping + g·dt²`.
    fn integrate(&mut self, gravity: Vec2, dt: f32) {
        for p in &mut self.points {
            let velocity = (p.position - p.prev_position) * VERLET_DAMPING;
            p.prev_position = p.position;
            p.position += velocity + gravity * (dt * dt);
        }
    }

    /// Pull every distance constraint toward its rest length, splitting
    /// the correction equally (points share mass).
    fn relax_constraints(&mut self) {
        for c in &self.constraints {
            let d = self.points[c.p2].position - self.points[c.p1].position;
            let dist = d.length();
            if dist < 1e-4 {
                continue;
            }

            let offset = d * (0.5 * (dist - c.rest_length) / dist * c.stiffness);
            self.points[c.p1].position += offset;
            self.points[c.p2].position -= offset;
        }
    }

    /// Push points along their outward vertex normals proportionally to
    /// the deficit against the target area.
    fn apply_pressure(&mut self) {
        let n = self.points.len();
        let area_deficit = self.target_area - self.area();
        let force = area_deficit * self.pressure * PRESSURE_SCALE;
        if force == 0.0 {
            return;
        }

        let positions: Vec<Vec2> = self.points.iter().map(|p| p.position).collect();
        for (i, p) in self.points.iter_mut().enumerate() {
            let prev = positions[(i + n - 1) % n];
            let next = positions[(i + 1) % n];

            // Vertex normal from the neighbor chord
            let normal = Vec2::new(next.y - prev.y, -(next.x - prev.x));
            let len = normal.length();
            if len > 1e-4 {
                p.position += normal / len * force;
            }
        }
    }

    /// Push points out of every rigid shape, damping the Verlet velocity
    /// along the way to emulate friction.
    fn collide_with_rigid_bodies(&mut self, rigid_bodies: &[RigidBody]) -> u32 {
        let mut contacts = 0;

        for body in rigid_bodies {
            for p in &mut self.points {
                match body.shape {
                    Shape::Circle { radius } => {
                        let d = p.position - body.position;
                        let r = radius + POINT_RADIUS;
                        let dist_sq = d.length_squared();
                        if dist_sq < r * r && dist_sq > 1e-8 {
                            let dist = dist_sq.sqrt();
                            p.position += d / dist * (r - dist);

                            // Bleed off a fraction of the implicit velocity
                            let velocity = p.position - p.prev_position;
                            p.prev_position += velocity * 0.1;
                            contacts += 1;
                        }
                    }
                    Shape::Box { half_extents } => {
                        let rot = body.rot();
                        let local = rot.apply_inv(p.position - body.position);
                        let reach = half_extents + Vec2::splat(POINT_RADIUS);

                        if local.x.abs() < reach.x && local.y.abs() < reach.y {
                            // Exit through the nearest face
                            let d_left = local.x + reach.x;
                            let d_right = reach.x - local.x;
                            let d_bottom = local.y + reach.y;
                            let d_top = reach.y - local.y;
                            let min_pen = d_left.min(d_right).min(d_bottom).min(d_top);

                            let local_normal = if min_pen == d_left {
                                Vec2::new(-1.0, 0.0)
                            } else if min_pen == d_right {
                                Vec2::new(1.0, 0.0)
                            } else if min_pen == d_bottom {
                                Vec2::new(0.0, -1.0)
                            } else {
                                Vec2::new(0.0, 1.0)
                            };

                            let normal = rot.apply(local_normal);
                            p.position += normal * min_pen;

                            // Tangential "sticking" friction: halve the
                            // implicit velocity
                            let velocity = p.position - p.prev_position;
                            p.prev_position = p.position - velocity * 0.5;
                            contacts += 1;
                        }
                    }
                }
            }
        }

        contacts
    }

    fn clamp_to_bounds(&mut self, bounds: &Aabb) {
        for p in &mut self.points {
            p.position = bounds.clamp_point(p.position);
        }
    }
}

/// Unsigned polygon area via the shoelace formula.
fn polygon_area(ring: impl Iterator<Item = Vec2> + Clone) -> f32 {
    let positions: Vec<Vec2> = ring.collect();
    let n = positions.len();
    let mut twice_area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += positions[i].x * positions[j].y - positions[j].x * positions[i].y;
    }
    (twice_area * 0.5).abs()
}
