//! 2D Math Helpers
//!
//! Thin extensions over [`glam::Vec2`] for the planar cross products and
//! rotations the solver needs. In 2D the cross product collapses to a
//! scalar (the z component of the embedded 3D cross), and angular
//! quantities are plain `f32` radians.

pub use glam::Vec2;

/// Scalar 2D cross product: `a.x * b.y - a.y * b.x`.
///
/// Equivalent to [`Vec2::perp_dot`]; kept as a free function so solver
/// code reads like the constraint math it implements.
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.perp_dot(b)
}

/// Cross product of a scalar (angular velocity) with a vector: `ω × r`.
///
/// Gives the tangential velocity of a point at offset `r` from the
/// rotation center.
#[inline]
pub fn cross_sv(s: f32, v: Vec2) -> Vec2 {
    Vec2::new(-s * v.y, s * v.x)
}

/// A 2D rotation stored as cached cosine/sine.
///
/// Box SAT and local-frame transforms evaluate the same rotation many
/// times per pair; caching the trig pair keeps that out of the inner loops.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rot {
    /// Cosine of the angle
    pub cos: f32,
    /// Sine of the angle
    pub sin: f32,
}

impl Rot {
    /// Identity rotation (angle 0)
    pub const IDENTITY: Self = Self { cos: 1.0, sin: 0.0 };

    /// Build from an angle in radians (counter-clockwise).
    #[inline]
    #[must_use]
    pub fn from_angle(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self { cos, sin }
    }

    /// Rotate a vector by this rotation.
    #[inline]
    #[must_use]
    pub fn apply(self, v: Vec2) -> Vec2 {
        Vec2::new(v.x * self.cos - v.y * self.sin, v.x * self.sin + v.y * self.cos)
    }

    /// Rotate a vector by the inverse of this rotation.
    #[inline]
    #[must_use]
    pub fn apply_inv(self, v: Vec2) -> Vec2 {
        Vec2::new(v.x * self.cos + v.y * self.sin, -v.x * self.sin + v.y * self.cos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_cross_scalar() {
        let a = Vec2::new(1.0, 0.0);
        let b = Vec2::new(0.0, 1.0);
        assert!(approx_eq(cross(a, b), 1.0));
        assert!(approx_eq(cross(b, a), -1.0));
    }

    #[test]
    fn test_cross_sv_tangential() {
        // Unit angular velocity at offset (1, 0) gives velocity (0, 1)
        let v = cross_sv(1.0, Vec2::new(1.0, 0.0));
        assert!(approx_eq(v.x, 0.0));
        assert!(approx_eq(v.y, 1.0));
    }

    #[test]
    fn test_rot_roundtrip() {
        let rot = Rot::from_angle(0.7);
        let v = Vec2::new(3.0, -2.0);
        let back = rot.apply_inv(rot.apply(v));
        assert!(approx_eq(back.x, v.x));
        assert!(approx_eq(back.y, v.y));
    }

    #[test]
    fn test_rot_quarter_turn() {
        let rot = Rot::from_angle(core::f32::consts::FRAC_PI_2);
        let v = rot.apply(Vec2::new(1.0, 0.0));
        assert!(approx_eq(v.x, 0.0));
        assert!(approx_eq(v.y, 1.0));
    }
}
