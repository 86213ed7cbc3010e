//! Particle Emitter with Parallel Vertex Fill
//!
//! A bounded particle pool stepped by simple Euler integration, plus the
//! one sanctioned piece of parallelism in the crate: a read-only,
//! embarrassingly parallel two-pass projection of live particles into
//! host-owned vertex/color buffers.
//!
//! Pass 1 computes per-chunk visibility, a prefix sum assigns each chunk a
//! disjoint output range, and pass 2 writes screen-space triangles into
//! those ranges — no two workers ever touch the same output bytes, and a
//! join barrier completes before the buffers are handed back. With the
//! `parallel` feature disabled the same two passes run serially.

use glam::Vec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Chunk length for the two-pass fill
const CHUNK_SIZE: usize = 1024;

/// Below this particle count the parallel path is not worth the overhead
#[cfg(feature = "parallel")]
const PARALLEL_THRESHOLD: usize = 1000;

/// Vertex-buffer floats per particle: 3 corners × (x, y)
const FLOATS_PER_PARTICLE: usize = 6;

/// Color entries per particle: one per corner
const COLORS_PER_PARTICLE: usize = 3;

/// A single particle. Positions are 3-component so the host's camera
/// matrix can project them.
#[derive(Clone, Copy, Debug)]
pub struct Particle {
    /// World position
    pub position: Vec3,
    /// Linear velocity
    pub velocity: Vec3,
    /// Remaining life, 1.0 at spawn down to 0.0
    pub life: f32,
    /// Lifetime in seconds
    pub max_life: f32,
    /// Base size (scaled by remaining life when rendered)
    pub size: f32,
    /// Packed 0xAARRGGBB color; alpha is replaced by remaining life
    pub color: u32,
}

/// Bounded particle pool with gravity.
pub struct ParticleEmitter {
    particles: Vec<Particle>,
    max_particles: usize,
    /// Gravity applied to every particle
    pub gravity: Vec3,
}

impl ParticleEmitter {
    /// Create an emitter holding at most `max_particles`.
    #[must_use]
    pub fn new(max_particles: usize) -> Self {
        Self {
            particles: Vec::with_capacity(max_particles),
            max_particles,
            gravity: Vec3::ZERO,
        }
    }

    /// Spawn one particle. Returns false when the pool is full (the
    /// spawn is silently rejected, never grown).
    pub fn spawn(
        &mut self,
        position: Vec3,
        velocity: Vec3,
        max_life: f32,
        size: f32,
        color: u32,
    ) -> bool {
        if self.particles.len() >= self.max_particles {
            return false;
        }
        self.particles.push(Particle {
            position,
            velocity,
            life: 1.0,
            max_life,
            size,
            color,
        });
        true
    }

    /// Advance all particles by `dt`, removing the expired ones via
    /// swap-remove (order is not meaningful).
    pub fn update(&mut self, dt: f32) {
        let gravity = self.gravity;
        for i in (0..self.particles.len()).rev() {
            let p = &mut self.particles[i];
            p.position += p.velocity * dt;
            p.velocity += gravity * dt;
            p.life -= dt / p.max_life;

            if p.life <= 0.0 {
                self.particles.swap_remove(i);
            }
        }
    }

    /// Number of live particles.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// True when no particles are alive.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Read-only view of the live particles.
    #[inline]
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Project live particles through the column-major `camera` matrix
    /// into `vertices` (x, y pairs, 3 corners per particle) and `colors`
    /// (one per corner), culling particles behind the near plane.
    ///
    /// Returns the number of particles written. Output is capped by
    /// `max_render` and by the provided buffer sizes.
    pub fn fill_vertex_buffer(
        &self,
        camera: &[f32; 16],
        vertices: &mut [f32],
        colors: &mut [u32],
        max_render: usize,
    ) -> usize {
        let total = self
            .particles
            .len()
            .min(max_render)
            .min(vertices.len() / FLOATS_PER_PARTICLE)
            .min(colors.len() / COLORS_PER_PARTICLE);
        if total == 0 {
            return 0;
        }

        let ranges: Vec<(usize, usize)> = (0..total)
            .step_by(CHUNK_SIZE)
            .map(|start| (start, (start + CHUNK_SIZE).min(total)))
            .collect();

        // Pass 1: visibility per chunk
        let chunk_visible: Vec<Vec<usize>> = self.collect_visible(camera, &ranges, total);

        let total_visible: usize = chunk_visible.iter().map(Vec::len).sum();
        if total_visible == 0 {
            return 0;
        }

        // Prefix-sum offsets realized as disjoint sub-slices
        let mut jobs: Vec<(&[usize], &mut [f32], &mut [u32])> =
            Vec::with_capacity(chunk_visible.len());
        let mut vert_rest = &mut vertices[..total_visible * FLOATS_PER_PARTICLE];
        let mut color_rest = &mut colors[..total_visible * COLORS_PER_PARTICLE];
        for visible in &chunk_visible {
            let (vert_head, vert_tail) =
                core::mem::take(&mut vert_rest).split_at_mut(visible.len() * FLOATS_PER_PARTICLE);
            let (color_head, color_tail) =
                core::mem::take(&mut color_rest).split_at_mut(visible.len() * COLORS_PER_PARTICLE);
            vert_rest = vert_tail;
            color_rest = color_tail;
            jobs.push((visible.as_slice(), vert_head, color_head));
        }

        // Pass 2: projection into the disjoint ranges
        #[cfg(feature = "parallel")]
        {
            if total >= PARALLEL_THRESHOLD {
                jobs.par_iter_mut().for_each(|(visible, verts, cols)| {
                    self.write_chunk(camera, visible, verts, cols);
                });
                return total_visible;
            }
        }

        for (visible, verts, cols) in &mut jobs {
            self.write_chunk(camera, visible, verts, cols);
        }
        total_visible
    }

    /// Pass 1: indices of particles in each chunk with w >= 0.1.
    fn collect_visible(
        &self,
        camera: &[f32; 16],
        ranges: &[(usize, usize)],
        total: usize,
    ) -> Vec<Vec<usize>> {
        let scan = |&(start, end): &(usize, usize)| -> Vec<usize> {
            self.particles[start..end]
                .iter()
                .enumerate()
                .filter(|(_, p)| clip_w(camera, p.position) >= 0.1)
                .map(|(i, _)| start + i)
                .collect()
        };

        #[cfg(feature = "parallel")]
        {
            if total >= PARALLEL_THRESHOLD {
                return ranges.par_iter().map(scan).collect();
            }
        }
        let _ = total;

        ranges.iter().map(scan).collect()
    }

    /// Pass 2: write one chunk's visible particles into its output range.
    fn write_chunk(
        &self,
        camera: &[f32; 16],
        visible: &[usize],
        vertices: &mut [f32],
        colors: &mut [u32],
    ) {
        let mut v = 0;
        let mut c = 0;

        for &idx in visible {
            let p = &self.particles[idx];
            let pos = p.position;

            let w = clip_w(camera, pos);
            let inv_w = 1.0 / w;
            let screen_x =
                (pos.x * camera[0] + pos.y * camera[4] + pos.z * camera[8] + camera[12]) * inv_w;
            let screen_y =
                (pos.x * camera[1] + pos.y * camera[5] + pos.z * camera[9] + camera[13]) * inv_w;

            let half_size = (p.size * p.life * inv_w * 500.0).clamp(0.5, 50.0);

            vertices[v] = screen_x;
            vertices[v + 1] = screen_y - half_size;
            vertices[v + 2] = screen_x - half_size;
            vertices[v + 3] = screen_y + half_size;
            vertices[v + 4] = screen_x + half_size;
            vertices[v + 5] = screen_y + half_size;
            v += FLOATS_PER_PARTICLE;

            let alpha = (p.life * 255.0) as u32;
            let color = (p.color & 0x00FF_FFFF) | (alpha << 24);
            colors[c] = color;
            colors[c + 1] = color;
            colors[c + 2] = color;
            c += COLORS_PER_PARTICLE;
        }
    }
}

/// Clip-space w of a position under a column-major matrix.
#[inline]
fn clip_w(camera: &[f32; 16], pos: Vec3) -> f32 {
    pos.x * camera[3] + pos.y * camera[7] + pos.z * camera[11] + camera[15]
}
