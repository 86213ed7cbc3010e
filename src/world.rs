//! Physics World and Step Pipeline
//!
//! The world owns all body, constraint, soft-body, and cache storage; the
//! host reads poses between steps and mutates only through the documented
//! operations (apply force/torque, set velocity, create body). One `step`
//! executes the strict phase order:
//!
//! 1. soft bodies (independent, query rigid shapes only)
//! 2. broadphase refresh → candidate pairs
//! 3. narrow phase → contact constraints
//! 4. integrate forces (+ sleep policy)
//! 5. warm start → velocity iterations → impulse store
//! 6. integrate positions
//! 7. position correction iterations
//!
//! Velocity iterations are inherently sequential and never parallelized.
//! Per-step counters are collected along the way and traced once after the
//! step — nothing logs inside the hot loops.

use crate::aabb::Aabb;
use crate::body::{BodyDef, RigidBody};
use crate::broadphase::{Broadphase, BroadphasePair, DynamicAabbTree};
use crate::contact_cache::ImpulseCache;
use crate::error::PhysicsError;
use crate::filter::CollisionFilter;
use crate::math::Vec2;
use crate::narrowphase;
use crate::raycast::{self, RayHit};
use crate::sleep::SleepConfig;
use crate::softbody::SoftBody;
use crate::solver::{self, ContactConstraint, JointSolver, Softness};

/// Tuning knobs for a world. Defaults are the pixel-scale constants the
/// engine ships with: ~100 px per meter, Y-up.
#[derive(Clone, Copy, Debug)]
pub struct PhysicsConfig {
    /// Gravitational acceleration (px/s²)
    pub gravity: Vec2,
    /// Velocity solver iterations per step
    pub velocity_iterations: u32,
    /// Position correction iterations per step
    pub position_iterations: u32,
    /// Seed impulses from the previous step's solution
    pub warm_starting: bool,
    /// Contact spring frequency (Hz); 0 disables softness
    pub contact_hertz: f32,
    /// Contact damping ratio (1 = critical)
    pub contact_damping_ratio: f32,
    /// Minimum approach speed before restitution applies (px/s)
    pub restitution_threshold: f32,
    /// Linear speed clamp for stability (px/s)
    pub max_linear_velocity: f32,
    /// Multiplicative velocity damping per step
    pub velocity_damping: f32,
    /// Penetration tolerated without position correction (px)
    pub slop: f32,
    /// Fraction of remaining penetration removed per position iteration
    pub baumgarte: f32,
    /// Rigid body capacity
    pub max_bodies: usize,
    /// Soft body capacity
    pub max_soft_bodies: usize,
    /// Candidate-pair budget per body (total = max_bodies × this)
    pub pairs_per_body: usize,
    /// Constraint budget per body (total = max_bodies × this)
    pub constraints_per_body: usize,
    /// Sleep thresholds and duration
    pub sleep: SleepConfig,
    /// Soft-body points are clamped to this box
    pub world_bounds: Aabb,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.81 * 100.0),
            velocity_iterations: 8,
            position_iterations: 10,
            warm_starting: true,
            contact_hertz: 120.0,
            contact_damping_ratio: 1.0,
            restitution_threshold: 100.0,
            max_linear_velocity: 200_000.0,
            velocity_damping: 0.999,
            slop: 0.01,
            baumgarte: 0.2,
            max_bodies: 1024,
            max_soft_bodies: 32,
            pairs_per_body: 8,
            constraints_per_body: 4,
            sleep: SleepConfig::default(),
            world_bounds: Aabb::new(Vec2::splat(-1000.0), Vec2::splat(1000.0)),
        }
    }
}

/// Counters collected during one step; the opt-in observability surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepCounters {
    /// Candidate pairs surviving broadphase
    pub broadphase_pairs: usize,
    /// Pairs dropped by the pair budget (scene over capacity)
    pub pairs_dropped: usize,
    /// Pairs confirmed colliding by narrow phase
    pub contacts: usize,
    /// Contact constraints built
    pub constraints: usize,
    /// Constraints dropped by the constraint budget
    pub constraints_dropped: usize,
    /// Soft-body points pushed out of rigid bodies
    pub soft_contacts: u32,
    /// Bodies asleep at the end of the step
    pub sleeping_bodies: usize,
}

/// A simulation world.
pub struct PhysicsWorld {
    /// Tuning parameters (host-adjustable between steps)
    pub config: PhysicsConfig,
    bodies: Vec<RigidBody>,
    soft_bodies: Vec<SoftBody>,
    broadphase: Box<dyn Broadphase>,
    cache: ImpulseCache,
    joint_solver: Option<Box<dyn JointSolver>>,
    constraints: Vec<ContactConstraint>,
    pairs: Vec<BroadphasePair>,
    counters: StepCounters,
}

impl PhysicsWorld {
    /// Create a world with the given configuration and the default
    /// dynamic AABB tree broadphase.
    #[must_use]
    pub fn new(config: PhysicsConfig) -> Self {
        Self::with_broadphase(config, Box::new(DynamicAabbTree::new()))
    }

    /// Create a world sized for `max_bodies` rigid bodies.
    #[must_use]
    pub fn with_capacity(max_bodies: usize) -> Self {
        Self::new(PhysicsConfig {
            max_bodies,
            ..PhysicsConfig::default()
        })
    }

    /// Create a world with a custom broadphase implementation.
    #[must_use]
    pub fn with_broadphase(config: PhysicsConfig, broadphase: Box<dyn Broadphase>) -> Self {
        Self {
            bodies: Vec::with_capacity(config.max_bodies),
            soft_bodies: Vec::with_capacity(config.max_soft_bodies),
            broadphase,
            cache: ImpulseCache::new(),
            joint_solver: None,
            constraints: Vec::new(),
            pairs: Vec::new(),
            counters: StepCounters::default(),
            config,
        }
    }

    /// Install an external joint subsystem to be driven by the solver.
    pub fn set_joint_solver(&mut self, joints: Box<dyn JointSolver>) {
        self.joint_solver = Some(joints);
    }

    // ========================================================================
    // Host boundary — mutation operations
    // ========================================================================

    /// Create a rigid body. Fails when the world is at capacity; storage
    /// never grows mid-step.
    pub fn create_body(&mut self, def: &BodyDef) -> Result<usize, PhysicsError> {
        if self.bodies.len() >= self.config.max_bodies {
            return Err(PhysicsError::CapacityExceeded {
                resource: "bodies",
                limit: self.config.max_bodies,
            });
        }

        let id = self.bodies.len();
        let mut body = RigidBody::from_def(id as u32, def);
        body.proxy_id = self.broadphase.insert(body.aabb(), body.id);
        self.bodies.push(body);
        Ok(id)
    }

    /// Create a soft body from a point ring with the given pressure and
    /// perimeter stiffness.
    pub fn create_soft_body(
        &mut self,
        ring: &[Vec2],
        pressure: f32,
        stiffness: f32,
    ) -> Result<usize, PhysicsError> {
        if self.soft_bodies.len() >= self.config.max_soft_bodies {
            return Err(PhysicsError::CapacityExceeded {
                resource: "soft bodies",
                limit: self.config.max_soft_bodies,
            });
        }

        let id = self.soft_bodies.len();
        self.soft_bodies
            .push(SoftBody::new(id as u32, ring, pressure, stiffness)?);
        Ok(id)
    }

    /// Accumulate a force on a body; no-op on an invalid id.
    pub fn apply_force(&mut self, id: usize, force: Vec2) {
        if let Some(body) = self.bodies.get_mut(id) {
            body.apply_force(force);
        }
    }

    /// Accumulate a torque on a body; no-op on an invalid id.
    pub fn apply_torque(&mut self, id: usize, torque: f32) {
        if let Some(body) = self.bodies.get_mut(id) {
            body.apply_torque(torque);
        }
    }

    /// Overwrite a body's linear velocity; no-op on an invalid id.
    pub fn set_velocity(&mut self, id: usize, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(id) {
            body.set_velocity(velocity);
        }
    }

    /// Teleport a soft-body point; no-op on invalid ids.
    pub fn set_soft_body_point(&mut self, id: usize, point: usize, position: Vec2) {
        if let Some(soft_body) = self.soft_bodies.get_mut(id) {
            soft_body.set_point(point, position);
        }
    }

    // ========================================================================
    // Host boundary — queries
    // ========================================================================

    /// Read-only view of all rigid bodies.
    #[inline]
    #[must_use]
    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    /// Look up a rigid body by id.
    #[inline]
    #[must_use]
    pub fn body(&self, id: usize) -> Option<&RigidBody> {
        self.bodies.get(id)
    }

    /// A body's position, or `None` for an invalid id.
    #[inline]
    #[must_use]
    pub fn position(&self, id: usize) -> Option<Vec2> {
        self.bodies.get(id).map(|b| b.position)
    }

    /// Look up a soft body by id.
    #[inline]
    #[must_use]
    pub fn soft_body(&self, id: usize) -> Option<&SoftBody> {
        self.soft_bodies.get(id)
    }

    /// A soft-body point position, or `None` for invalid ids.
    #[must_use]
    pub fn soft_body_point(&self, id: usize, point: usize) -> Option<Vec2> {
        self.soft_bodies.get(id).and_then(|sb| sb.point(point))
    }

    /// Cast a segment against all rigid bodies; nearest hit wins.
    #[must_use]
    pub fn raycast(&self, start: Vec2, end: Vec2) -> Option<RayHit> {
        raycast::cast(&self.bodies, start, end)
    }

    /// Counters from the most recent step.
    #[inline]
    #[must_use]
    pub fn counters(&self) -> StepCounters {
        self.counters
    }

    // ========================================================================
    // Simulation
    // ========================================================================

    /// Advance the world by `dt` seconds.
    ///
    /// A non-positive (or NaN) `dt` is a no-op, as is a world with no
    /// active bodies.
    pub fn step(&mut self, dt: f32) {
        if !(dt > 0.0) {
            return;
        }

        self.counters = StepCounters::default();

        // Soft bodies run first; they only read rigid poses
        for soft_body in &mut self.soft_bodies {
            self.counters.soft_contacts +=
                soft_body.step(self.config.gravity, dt, &self.bodies, &self.config.world_bounds);
        }

        if self.bodies.is_empty() {
            return;
        }

        self.update_broadphase();
        self.build_constraints(dt);

        solver::integrate_forces(
            &mut self.bodies,
            self.config.gravity,
            dt,
            self.config.velocity_damping,
            self.config.max_linear_velocity,
            &self.config.sleep,
        );

        self.solve_velocity(dt);
        solver::integrate_positions(&mut self.bodies, dt);
        self.correct_positions();

        self.counters.sleeping_bodies = self.bodies.iter().filter(|b| !b.awake).count();

        tracing::trace!(
            pairs = self.counters.broadphase_pairs,
            pairs_dropped = self.counters.pairs_dropped,
            contacts = self.counters.contacts,
            constraints = self.counters.constraints,
            soft_contacts = self.counters.soft_contacts,
            sleeping = self.counters.sleeping_bodies,
            "step"
        );
    }

    /// Refresh non-static proxies and collect candidate pairs.
    fn update_broadphase(&mut self) {
        for body in &mut self.bodies {
            body.contact_count = 0;
            if body.is_static() {
                continue;
            }
            self.broadphase.update(body.proxy_id, body.aabb());
        }

        let max_pairs = self.config.max_bodies * self.config.pairs_per_body;
        self.counters.pairs_dropped = self.broadphase.query_pairs(&mut self.pairs, max_pairs);
        self.counters.broadphase_pairs = self.pairs.len();
    }

    /// Narrow-phase each candidate pair and build contact constraints.
    fn build_constraints(&mut self, dt: f32) {
        let softness = Softness::new(
            self.config.contact_hertz,
            self.config.contact_damping_ratio,
            dt,
        );
        let max_constraints = self.config.max_bodies * self.config.constraints_per_body;
        self.constraints.clear();

        for pair in &self.pairs {
            let (i, j) = (pair.a as usize, pair.b as usize);
            let (a, b) = (&self.bodies[i], &self.bodies[j]);

            if a.is_static() && b.is_static() {
                continue;
            }
            if !CollisionFilter::can_collide(&a.filter, &b.filter) {
                continue;
            }

            let manifold = match narrowphase::collide(a, b) {
                Some(m) => m,
                None => continue,
            };

            self.counters.contacts += 1;
            self.bodies[i].contact_count += 1;
            self.bodies[j].contact_count += 1;

            // Sensors observe, never respond
            if self.bodies[i].is_sensor || self.bodies[j].is_sensor {
                continue;
            }

            if self.constraints.len() >= max_constraints {
                self.counters.constraints_dropped += 1;
                continue;
            }

            self.constraints.push(ContactConstraint::new(
                &self.bodies,
                i,
                j,
                &manifold,
                softness,
                self.config.restitution_threshold,
            ));
        }

        self.counters.constraints = self.constraints.len();
    }

    /// Warm start, run the velocity iterations, persist impulses.
    fn solve_velocity(&mut self, dt: f32) {
        if let Some(joints) = self.joint_solver.as_mut() {
            joints.init_velocity(&mut self.bodies, dt);
        }

        self.cache.begin_step();

        if self.config.warm_starting {
            solver::warm_start(&mut self.bodies, &mut self.constraints, &self.cache);
        }

        for _ in 0..self.config.velocity_iterations {
            solver::solve_velocity(&mut self.bodies, &mut self.constraints);
            if let Some(joints) = self.joint_solver.as_mut() {
                joints.solve_velocity(&mut self.bodies);
            }
        }

        if self.config.warm_starting {
            solver::store_impulses(&self.bodies, &self.constraints, &mut self.cache);
        }

        self.cache.end_step();
    }

    /// Baumgarte position pass, re-running narrow phase each iteration.
    fn correct_positions(&mut self) {
        for _ in 0..self.config.position_iterations {
            solver::correct_positions(
                &mut self.bodies,
                &self.constraints,
                self.config.slop,
                self.config.baumgarte,
            );
            if let Some(joints) = self.joint_solver.as_mut() {
                joints.solve_position(&mut self.bodies);
            }
        }
    }
}
