//! Cross-Step Impulse Cache (Warm Starting)
//!
//! Accumulated contact impulses survive from one step to the next, keyed
//! by canonical body pair plus contact point index. Re-applying them
//! before iterating amortizes solver convergence across frames — without
//! this, resting stacks visibly sink each frame before recovering.
//!
//! The cache is owned by its world (not process-global) and entries that
//! go unrefreshed for a few steps are evicted, so separated pairs do not
//! leak stale impulses back in on re-contact.

use std::collections::HashMap;

/// Canonical body pair: `a` is always the smaller id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PairKey {
    /// Smaller body id
    pub a: u32,
    /// Larger body id
    pub b: u32,
}

impl PairKey {
    /// Create a canonical pair key (order-insensitive).
    #[inline]
    #[must_use]
    pub fn new(a: u32, b: u32) -> Self {
        if a < b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }
}

/// Cache key: body pair plus contact point index within the manifold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContactKey {
    /// Canonical body pair
    pub pair: PairKey,
    /// Contact point index (0 or 1)
    pub point: u8,
}

impl ContactKey {
    /// Key for point `point` of the pair `(a, b)`.
    #[inline]
    #[must_use]
    pub fn new(a: u32, b: u32, point: u8) -> Self {
        Self {
            pair: PairKey::new(a, b),
            point,
        }
    }
}

/// Impulses solved on a previous step.
#[derive(Clone, Copy, Debug, Default)]
struct CachedImpulse {
    normal: f32,
    tangent: f32,
    /// Step number of the last refresh
    stamp: u32,
}

/// World-owned warm-start store.
pub struct ImpulseCache {
    entries: HashMap<ContactKey, CachedImpulse>,
    step: u32,
    /// Steps an entry may go unrefreshed before eviction
    pub max_stale_steps: u32,
}

impl ImpulseCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            step: 0,
            max_stale_steps: 3,
        }
    }

    /// Advance the step counter (call once at the start of each step).
    pub fn begin_step(&mut self) {
        self.step = self.step.wrapping_add(1);
    }

    /// Look up impulses for a contact point.
    #[inline]
    #[must_use]
    pub fn get(&self, key: ContactKey) -> Option<(f32, f32)> {
        self.entries.get(&key).map(|c| (c.normal, c.tangent))
    }

    /// Store solved impulses, refreshing the entry's staleness stamp.
    pub fn store(&mut self, key: ContactKey, normal: f32, tangent: f32) {
        self.entries.insert(
            key,
            CachedImpulse {
                normal,
                tangent,
                stamp: self.step,
            },
        );
    }

    /// Evict entries not refreshed within `max_stale_steps` (call once at
    /// the end of each step).
    pub fn end_step(&mut self) {
        let step = self.step;
        let max_stale = self.max_stale_steps;
        self.entries
            .retain(|_, c| step.wrapping_sub(c.stamp) <= max_stale);
    }

    /// Number of live entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no impulses are cached.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ImpulseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_canonical() {
        let k1 = PairKey::new(3, 7);
        let k2 = PairKey::new(7, 3);
        assert_eq!(k1, k2);
        assert_eq!(k1.a, 3);
        assert_eq!(k1.b, 7);
    }

    #[test]
    fn test_point_index_distinguishes() {
        let k0 = ContactKey::new(0, 1, 0);
        let k1 = ContactKey::new(0, 1, 1);
        assert_ne!(k0, k1);
    }

    #[test]
    fn test_store_and_get() {
        let mut cache = ImpulseCache::new();
        cache.begin_step();
        let key = ContactKey::new(2, 5, 0);
        cache.store(key, 12.5, -0.75);

        let (n, t) = cache.get(key).expect("entry present");
        assert_eq!(n, 12.5);
        assert_eq!(t, -0.75);

        // Same pair written in the reverse order resolves to the same slot
        let (n2, _) = cache.get(ContactKey::new(5, 2, 0)).expect("canonical");
        assert_eq!(n2, 12.5);
    }

    #[test]
    fn test_stale_entries_evicted() {
        let mut cache = ImpulseCache::new();
        cache.begin_step();
        cache.store(ContactKey::new(0, 1, 0), 1.0, 0.0);
        cache.end_step();

        // Entry survives max_stale_steps steps without refresh, then goes
        for _ in 0..cache.max_stale_steps {
            cache.begin_step();
            cache.end_step();
        }
        assert_eq!(cache.len(), 1);

        cache.begin_step();
        cache.end_step();
        assert!(cache.is_empty(), "Unrefreshed entry must be evicted");
    }

    #[test]
    fn test_refresh_keeps_entry_alive() {
        let mut cache = ImpulseCache::new();
        let key = ContactKey::new(0, 1, 0);

        for _ in 0..20 {
            cache.begin_step();
            cache.store(key, 1.0, 0.0);
            cache.end_step();
        }
        assert_eq!(cache.len(), 1);
    }
}
