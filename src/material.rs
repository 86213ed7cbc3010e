//! Surface Materials and Pair Combine Rules
//!
//! Friction and restitution per body, combined per contact pair: friction
//! as the geometric mean of both surfaces (a slick surface dominates),
//! restitution as the max of both (the bouncier surface wins). Restitution
//! is additionally gated by a minimum approach speed in the solver so that
//! resting contacts do not buzz.

/// Surface properties of a rigid body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Coulomb friction coefficient (0 = ice, ~1 = rubber)
    pub friction: f32,
    /// Coefficient of restitution (0 = dead, 1 = perfectly elastic)
    pub restitution: f32,
}

impl Material {
    /// Create a new material.
    #[inline]
    #[must_use]
    pub const fn new(friction: f32, restitution: f32) -> Self {
        Self {
            friction,
            restitution,
        }
    }

    /// Combined friction for a contact pair: geometric mean.
    #[inline]
    #[must_use]
    pub fn combined_friction(&self, other: &Material) -> f32 {
        (self.friction * other.friction).sqrt()
    }

    /// Combined restitution for a contact pair: max of both surfaces.
    #[inline]
    #[must_use]
    pub fn combined_restitution(&self, other: &Material) -> f32 {
        self.restitution.max(other.restitution)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.4,
            restitution: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friction_geometric_mean() {
        let a = Material::new(0.9, 0.0);
        let b = Material::new(0.4, 0.0);
        let f = a.combined_friction(&b);
        assert!((f - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_ice_kills_friction() {
        let rubber = Material::new(1.0, 0.0);
        let ice = Material::new(0.0, 0.0);
        assert_eq!(rubber.combined_friction(&ice), 0.0);
    }

    #[test]
    fn test_restitution_max() {
        let dead = Material::new(0.4, 0.0);
        let bouncy = Material::new(0.4, 0.8);
        assert_eq!(dead.combined_restitution(&bouncy), 0.8);
        assert_eq!(bouncy.combined_restitution(&dead), 0.8);
    }
}
