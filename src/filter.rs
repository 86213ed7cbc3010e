//! Collision Filtering (Category/Mask System)
//!
//! Bitmask-based collision filtering for controlling which bodies can
//! interact.
//!
//! # Usage
//!
//! ```
//! use impel2d::filter::CollisionFilter;
//!
//! // Category 0 = player, category 1 = enemy, category 2 = projectile
//! let player = CollisionFilter::new(1 << 0, (1 << 1) | (1 << 2));
//! let enemy = CollisionFilter::new(1 << 1, (1 << 0) | (1 << 2));
//! assert!(CollisionFilter::can_collide(&player, &enemy));
//! ```

/// Collision filter using category/mask bitmasks.
///
/// Two bodies can collide iff:
///   `(a.category & b.mask) != 0 && (b.category & a.mask) != 0`
///
/// This provides fine-grained bidirectional control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CollisionFilter {
    /// Which category bit(s) this body belongs to
    pub category: u32,
    /// Which categories this body can collide with
    pub mask: u32,
}

impl CollisionFilter {
    /// Default filter: category 1, collides with everything
    pub const DEFAULT: Self = Self {
        category: 1,
        mask: u32::MAX,
    };

    /// Filter that collides with nothing
    pub const NONE: Self = Self {
        category: 0,
        mask: 0,
    };

    /// Create a new collision filter
    #[inline]
    pub const fn new(category: u32, mask: u32) -> Self {
        Self { category, mask }
    }

    /// Check if two filters allow collision
    #[inline]
    pub fn can_collide(a: &Self, b: &Self) -> bool {
        (a.category & b.mask) != 0 && (b.category & a.mask) != 0
    }
}

impl Default for CollisionFilter {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        let a = CollisionFilter::DEFAULT;
        let b = CollisionFilter::DEFAULT;
        assert!(CollisionFilter::can_collide(&a, &b));
    }

    #[test]
    fn test_none_filter() {
        let a = CollisionFilter::NONE;
        let b = CollisionFilter::DEFAULT;
        assert!(!CollisionFilter::can_collide(&a, &b));
    }

    #[test]
    fn test_one_way_mask_blocks() {
        // A wants to hit B, but B masks A out — bidirectional check fails
        let a = CollisionFilter::new(1 << 0, 1 << 1);
        let b = CollisionFilter::new(1 << 1, 0);
        assert!(!CollisionFilter::can_collide(&a, &b));
    }

    #[test]
    fn test_disjoint_categories() {
        let debris = CollisionFilter::new(1 << 4, 1 << 1);
        let ui_ghost = CollisionFilter::new(1 << 5, 1 << 5);
        assert!(!CollisionFilter::can_collide(&debris, &ui_ghost));
    }
}
