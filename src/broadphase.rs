//! Broadphase Pair Generation
//!
//! A dynamic AABB tree (incremental BVH) producing deduplicated candidate
//! pairs from fattened body bounds in amortized sub-quadratic time.
//!
//! The capability is expressed as the [`Broadphase`] trait
//! (insert/update/remove/query-pairs) so the acceleration structure can be
//! swapped without touching the pipeline; the tree is the one live
//! implementation.
//!
//! # Tree discipline
//!
//! - **Fat AABBs**: proxies store bounds enlarged by a margin, so slow
//!   movers skip re-insertion until their tight bound escapes
//! - **SAH insertion**: new leaves pick the sibling minimizing perimeter
//!   growth
//! - **Rotations**: AVL-style balancing bounds query cost

use crate::aabb::Aabb;
use crate::math::Vec2;

/// Null node sentinel
pub const NULL_NODE: u32 = u32::MAX;

/// An unordered candidate pair in canonical (low, high) order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct BroadphasePair {
    /// Smaller body id
    pub a: u32,
    /// Larger body id
    pub b: u32,
}

impl BroadphasePair {
    /// Canonicalize two body ids into a pair (self-pairs are the caller's
    /// bug; debug-asserted).
    #[inline]
    #[must_use]
    pub fn new(a: u32, b: u32) -> Self {
        debug_assert_ne!(a, b);
        if a < b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }
}

/// Broadphase capability: maintain per-body proxies and enumerate
/// overlapping pairs.
pub trait Broadphase {
    /// Insert a proxy for `body` with the given tight bounds; returns the
    /// proxy id.
    fn insert(&mut self, aabb: Aabb, body: u32) -> u32;

    /// Update a proxy's tight bounds. Returns true if the proxy moved in
    /// the structure (its tight bound escaped the stored fat bound).
    fn update(&mut self, proxy_id: u32, aabb: Aabb) -> bool;

    /// Remove a proxy.
    fn remove(&mut self, proxy_id: u32);

    /// Collect all overlapping pairs into `out` (cleared first), in
    /// canonical order, deduplicated, truncated to `max_pairs`.
    /// Returns the number of pairs dropped by truncation.
    fn query_pairs(&self, out: &mut Vec<BroadphasePair>, max_pairs: usize) -> usize;
}

/// A node in the dynamic AABB tree
#[derive(Clone, Debug)]
struct TreeNode {
    /// Fat AABB (enlarged for movement prediction)
    aabb: Aabb,
    parent: u32,
    left: u32,
    right: u32,
    /// 0 for leaf, max(children) + 1 otherwise; -1 while on the free list
    height: i32,
    /// Body id for leaves
    body: u32,
    is_leaf: bool,
}

impl TreeNode {
    fn new_leaf(aabb: Aabb, body: u32) -> Self {
        Self {
            aabb,
            parent: NULL_NODE,
            left: NULL_NODE,
            right: NULL_NODE,
            height: 0,
            body,
            is_leaf: true,
        }
    }

    fn new_internal() -> Self {
        Self {
            aabb: Aabb::new(Vec2::ZERO, Vec2::ZERO),
            parent: NULL_NODE,
            left: NULL_NODE,
            right: NULL_NODE,
            height: 0,
            body: NULL_NODE,
            is_leaf: false,
        }
    }
}

/// Dynamic AABB tree broadphase.
pub struct DynamicAabbTree {
    nodes: Vec<TreeNode>,
    free_list: Vec<u32>,
    root: u32,
    /// AABB fattening margin (world units)
    pub margin: f32,
}

impl DynamicAabbTree {
    /// Default fat margin: a couple of pixels of temporal slack.
    pub const DEFAULT_MARGIN: f32 = 2.0;

    /// Create a new empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::with_margin(Self::DEFAULT_MARGIN)
    }

    /// Create a tree with a custom fat margin.
    #[must_use]
    pub fn with_margin(margin: f32) -> Self {
        Self {
            nodes: Vec::new(),
            free_list: Vec::new(),
            root: NULL_NODE,
            margin,
        }
    }

    /// Visit every leaf whose fat AABB overlaps `aabb`.
    pub fn query_callback<F: FnMut(u32)>(&self, aabb: &Aabb, mut callback: F) {
        if self.root == NULL_NODE {
            return;
        }

        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(node_id) = stack.pop() {
            if node_id == NULL_NODE {
                continue;
            }

            let node = &self.nodes[node_id as usize];
            if !node.aabb.intersects(aabb) {
                continue;
            }

            if node.is_leaf {
                callback(node.body);
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }
    }

    /// Number of active proxies (leaf nodes).
    #[must_use]
    pub fn proxy_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf && n.body != NULL_NODE)
            .count()
    }

    /// Tree height (0 for empty).
    #[must_use]
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            0
        } else {
            self.nodes[self.root as usize].height
        }
    }

    // =========== Internal methods ===========

    fn fatten(&self, aabb: Aabb) -> Aabb {
        aabb.fattened(self.margin)
    }

    fn alloc_node(&mut self) -> u32 {
        if let Some(id) = self.free_list.pop() {
            id
        } else {
            let id = self.nodes.len() as u32;
            self.nodes.push(TreeNode::new_internal());
            id
        }
    }

    fn free_node(&mut self, node_id: u32) {
        let node = &mut self.nodes[node_id as usize];
        node.height = -1;
        node.body = NULL_NODE;
        node.is_leaf = false;
        node.left = NULL_NODE;
        node.right = NULL_NODE;
        node.parent = NULL_NODE;
        self.free_list.push(node_id);
    }

    fn insert_leaf(&mut self, leaf: u32) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf as usize].parent = NULL_NODE;
            return;
        }

        // Descend to the best sibling by perimeter cost
        let leaf_aabb = self.nodes[leaf as usize].aabb;
        let mut sibling = self.root;

        while !self.nodes[sibling as usize].is_leaf {
            let left = self.nodes[sibling as usize].left;
            let right = self.nodes[sibling as usize].right;

            let area = self.nodes[sibling as usize].aabb.perimeter();
            let combined = leaf_aabb.union(&self.nodes[sibling as usize].aabb);
            let combined_area = combined.perimeter();

            let cost = 2.0 * combined_area;
            let inheritance_cost = 2.0 * (combined_area - area);

            let cost_left = self.child_insertion_cost(left, &leaf_aabb, inheritance_cost);
            let cost_right = self.child_insertion_cost(right, &leaf_aabb, inheritance_cost);

            if cost < cost_left && cost < cost_right {
                break;
            }

            sibling = if cost_left < cost_right { left } else { right };
        }

        // Splice a new parent above the chosen sibling
        let old_parent = self.nodes[sibling as usize].parent;
        let new_parent = self.alloc_node();
        self.nodes[new_parent as usize] = TreeNode::new_internal();
        self.nodes[new_parent as usize].parent = old_parent;
        self.nodes[new_parent as usize].aabb = leaf_aabb.union(&self.nodes[sibling as usize].aabb);
        self.nodes[new_parent as usize].height = self.nodes[sibling as usize].height + 1;

        if old_parent != NULL_NODE {
            if self.nodes[old_parent as usize].left == sibling {
                self.nodes[old_parent as usize].left = new_parent;
            } else {
                self.nodes[old_parent as usize].right = new_parent;
            }
        } else {
            self.root = new_parent;
        }

        self.nodes[new_parent as usize].left = sibling;
        self.nodes[new_parent as usize].right = leaf;
        self.nodes[sibling as usize].parent = new_parent;
        self.nodes[leaf as usize].parent = new_parent;

        self.fix_upwards(new_parent);
    }

    fn child_insertion_cost(&self, child: u32, leaf_aabb: &Aabb, inheritance: f32) -> f32 {
        let combined = leaf_aabb.union(&self.nodes[child as usize].aabb);
        if self.nodes[child as usize].is_leaf {
            combined.perimeter() + inheritance
        } else {
            let old_area = self.nodes[child as usize].aabb.perimeter();
            let new_area = combined.perimeter();
            (new_area - old_area) + inheritance
        }
    }

    fn remove_leaf(&mut self, leaf: u32) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[leaf as usize].parent;
        let grand_parent = self.nodes[parent as usize].parent;
        let sibling = if self.nodes[parent as usize].left == leaf {
            self.nodes[parent as usize].right
        } else {
            self.nodes[parent as usize].left
        };

        if grand_parent != NULL_NODE {
            if self.nodes[grand_parent as usize].left == parent {
                self.nodes[grand_parent as usize].left = sibling;
            } else {
                self.nodes[grand_parent as usize].right = sibling;
            }
            self.nodes[sibling as usize].parent = grand_parent;
            self.free_node(parent);

            self.fix_upwards(grand_parent);
        } else {
            self.root = sibling;
            self.nodes[sibling as usize].parent = NULL_NODE;
            self.free_node(parent);
        }
    }

    /// Walk from `start` to the root restoring heights, AABBs, and balance.
    fn fix_upwards(&mut self, start: u32) {
        let mut node_id = start;
        while node_id != NULL_NODE {
            node_id = self.balance(node_id);

            let left = self.nodes[node_id as usize].left;
            let right = self.nodes[node_id as usize].right;

            if left != NULL_NODE && right != NULL_NODE {
                let lh = self.nodes[left as usize].height;
                let rh = self.nodes[right as usize].height;
                self.nodes[node_id as usize].height = 1 + lh.max(rh);
                self.nodes[node_id as usize].aabb = self.nodes[left as usize]
                    .aabb
                    .union(&self.nodes[right as usize].aabb);
            }

            node_id = self.nodes[node_id as usize].parent;
        }
    }

    /// AVL-style rotation when children heights differ by more than one.
    fn balance(&mut self, node_id: u32) -> u32 {
        if self.nodes[node_id as usize].is_leaf || self.nodes[node_id as usize].height < 2 {
            return node_id;
        }

        let left = self.nodes[node_id as usize].left;
        let right = self.nodes[node_id as usize].right;

        let balance_factor = self.nodes[right as usize].height - self.nodes[left as usize].height;

        if balance_factor > 1 {
            self.rotate_up(node_id, right)
        } else if balance_factor < -1 {
            self.rotate_up(node_id, left)
        } else {
            node_id
        }
    }

    /// Promote `child` above `node_id`, moving the shorter grandchild down.
    ///
    /// BVH children are unordered, so a single rotation shape covers both
    /// the left-heavy and right-heavy cases.
    fn rotate_up(&mut self, node_id: u32, child: u32) -> u32 {
        let child_left = self.nodes[child as usize].left;
        let child_right = self.nodes[child as usize].right;
        let parent = self.nodes[node_id as usize].parent;
        let was_left_child = child == self.nodes[node_id as usize].left;

        // Child takes node's place under the parent
        self.nodes[child as usize].parent = parent;
        self.nodes[node_id as usize].parent = child;
        if parent != NULL_NODE {
            if self.nodes[parent as usize].left == node_id {
                self.nodes[parent as usize].left = child;
            } else {
                self.nodes[parent as usize].right = child;
            }
        } else {
            self.root = child;
        }

        // The taller grandchild stays on the child; the shorter replaces
        // the child's old slot on the node
        let cl_h = self.node_height(child_left);
        let cr_h = self.node_height(child_right);
        let (keep, demote) = if cl_h > cr_h {
            (child_left, child_right)
        } else {
            (child_right, child_left)
        };

        if was_left_child {
            self.nodes[child as usize].left = node_id;
            self.nodes[child as usize].right = keep;
            self.nodes[node_id as usize].left = demote;
        } else {
            self.nodes[child as usize].right = node_id;
            self.nodes[child as usize].left = keep;
            self.nodes[node_id as usize].right = demote;
        }
        if keep != NULL_NODE {
            self.nodes[keep as usize].parent = child;
        }
        if demote != NULL_NODE {
            self.nodes[demote as usize].parent = node_id;
        }

        self.refresh_node(node_id);
        self.refresh_node(child);

        child
    }

    fn node_height(&self, node_id: u32) -> i32 {
        if node_id == NULL_NODE {
            -1
        } else {
            self.nodes[node_id as usize].height
        }
    }

    fn refresh_node(&mut self, node_id: u32) {
        let left = self.nodes[node_id as usize].left;
        let right = self.nodes[node_id as usize].right;
        if left != NULL_NODE && right != NULL_NODE {
            self.nodes[node_id as usize].aabb = self.nodes[left as usize]
                .aabb
                .union(&self.nodes[right as usize].aabb);
            let lh = self.nodes[left as usize].height;
            let rh = self.nodes[right as usize].height;
            self.nodes[node_id as usize].height = 1 + lh.max(rh);
        }
    }

    fn collect_leaves(&self, node_id: u32, leaves: &mut Vec<u32>) {
        if node_id == NULL_NODE {
            return;
        }

        if self.nodes[node_id as usize].is_leaf {
            leaves.push(node_id);
        } else {
            self.collect_leaves(self.nodes[node_id as usize].left, leaves);
            self.collect_leaves(self.nodes[node_id as usize].right, leaves);
        }
    }
}

impl Broadphase for DynamicAabbTree {
    fn insert(&mut self, aabb: Aabb, body: u32) -> u32 {
        let fat_aabb = self.fatten(aabb);
        let node_id = self.alloc_node();

        self.nodes[node_id as usize] = TreeNode::new_leaf(fat_aabb, body);

        self.insert_leaf(node_id);
        node_id
    }

    fn update(&mut self, proxy_id: u32, aabb: Aabb) -> bool {
        if proxy_id as usize >= self.nodes.len() {
            return false;
        }

        // Still inside the fat bound: nothing to do
        if self.nodes[proxy_id as usize].aabb.contains(&aabb) {
            return false;
        }

        self.remove_leaf(proxy_id);
        self.nodes[proxy_id as usize].aabb = self.fatten(aabb);
        self.insert_leaf(proxy_id);
        true
    }

    fn remove(&mut self, proxy_id: u32) {
        if proxy_id as usize >= self.nodes.len() {
            return;
        }
        self.remove_leaf(proxy_id);
        self.free_node(proxy_id);
    }

    fn query_pairs(&self, out: &mut Vec<BroadphasePair>, max_pairs: usize) -> usize {
        out.clear();

        if self.root == NULL_NODE {
            return 0;
        }

        let mut leaves = Vec::new();
        self.collect_leaves(self.root, &mut leaves);

        // Each unordered pair is found exactly once via the a < b guard,
        // but sort + dedup keeps the output canonical regardless of tree
        // shape or traversal order.
        for &leaf_id in &leaves {
            let aabb = self.nodes[leaf_id as usize].aabb;
            let body_a = self.nodes[leaf_id as usize].body;

            self.query_callback(&aabb, |body_b| {
                if body_a < body_b {
                    out.push(BroadphasePair::new(body_a, body_b));
                }
            });
        }

        out.sort_unstable();
        out.dedup();

        if out.len() > max_pairs {
            let dropped = out.len() - max_pairs;
            out.truncate(max_pairs);
            dropped
        } else {
            0
        }
    }
}

impl Default for DynamicAabbTree {
    fn default() -> Self {
        Self::new()
    }
}
