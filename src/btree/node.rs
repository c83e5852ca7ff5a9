//! B-tree node and its local structural operations.
//!
//! A node owns its children outright; there are no parent links. Every
//! rebalancing step is therefore driven from the parent, which can see
//! both the child it is about to descend into and that child's siblings.
//! Deletion follows a "fix before you go deeper" discipline: a child is
//! topped up to at least `t` keys *before* the recursion enters it, so a
//! removal at the bottom can never leave an underflowed node behind.

use crate::error::{Result, TreeError};
use crate::types::BTreeConfig;
use serde::Serialize;
use std::mem;
use tracing::trace;

/// A single node of a [`BTree`](super::BTree)
///
/// A node with no children is a leaf. An internal node always has exactly
/// one more child than it has keys, and `children[i]` holds only keys that
/// sort strictly between `keys[i - 1]` and `keys[i]`.
#[derive(Debug, Clone)]
pub struct Node<K> {
    pub(crate) keys: Vec<K>,
    pub(crate) children: Vec<Node<K>>,
}

/// Read-only structural snapshot of a subtree, for visualization
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot<'a, K> {
    /// Whether this is a leaf node
    pub is_leaf: bool,
    /// Keys in this node
    pub keys: &'a [K],
    /// Child snapshots (empty for leaves)
    pub children: Vec<NodeSnapshot<'a, K>>,
}

impl<K> Node<K> {
    pub(crate) fn new_leaf() -> Self {
        Self {
            keys: Vec::new(),
            children: Vec::new(),
        }
    }

    /// A keyless internal node over a single child, used when the root grows.
    pub(crate) fn new_internal(child: Node<K>) -> Self {
        Self {
            keys: Vec::new(),
            children: vec![child],
        }
    }

    /// Keys stored in this node, ascending
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Child nodes (empty for leaves)
    pub fn children(&self) -> &[Node<K>] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of keys held directly by this node
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub(crate) fn is_full(&self, config: &BTreeConfig) -> bool {
        self.keys.len() == config.max_keys()
    }

    /// Smallest key in this subtree (leftmost descent)
    pub fn first(&self) -> Option<&K> {
        let mut node = self;
        while let Some(child) = node.children.first() {
            node = child;
        }
        node.keys.first()
    }

    /// Largest key in this subtree (rightmost descent)
    pub fn last(&self) -> Option<&K> {
        let mut node = self;
        while let Some(child) = node.children.last() {
            node = child;
        }
        node.keys.last()
    }

    /// In-order predecessor of `keys[idx]`: the rightmost key under `children[idx]`.
    pub fn predecessor(&self, idx: usize) -> Option<&K> {
        self.children.get(idx)?.last()
    }

    /// In-order successor of `keys[idx]`: the leftmost key under `children[idx + 1]`.
    pub fn successor(&self, idx: usize) -> Option<&K> {
        self.children.get(idx + 1)?.first()
    }

    /// Append every key of this subtree to `out` in ascending order.
    pub fn traverse<'a>(&'a self, out: &mut Vec<&'a K>) {
        for (idx, key) in self.keys.iter().enumerate() {
            if let Some(child) = self.children.get(idx) {
                child.traverse(out);
            }
            out.push(key);
        }
        if let Some(child) = self.children.get(self.keys.len()) {
            child.traverse(out);
        }
    }

    pub fn snapshot(&self) -> NodeSnapshot<'_, K> {
        NodeSnapshot {
            is_leaf: self.is_leaf(),
            keys: &self.keys,
            children: self.children.iter().map(Node::snapshot).collect(),
        }
    }

    /// Make sure `children[idx]` holds at least `t` keys before a deletion
    /// descends into it.
    ///
    /// Preference order: borrow from the left sibling, borrow from the right
    /// sibling, merge with the right sibling, merge with the left sibling
    /// (only when `idx` is the last child).
    pub(crate) fn fill(&mut self, idx: usize, t: usize) {
        if idx > 0 && self.children[idx - 1].keys.len() >= t {
            self.borrow_from_prev(idx);
        } else if idx < self.keys.len() && self.children[idx + 1].keys.len() >= t {
            self.borrow_from_next(idx);
        } else if idx < self.keys.len() {
            self.merge(idx);
        } else {
            self.merge(idx - 1);
        }
    }

    /// Rotate the last key of `children[idx - 1]` up through `keys[idx - 1]`
    /// and the old separator down to the front of `children[idx]`.
    pub(crate) fn borrow_from_prev(&mut self, idx: usize) {
        let (left, right) = self.children.split_at_mut(idx);
        let sibling = &mut left[idx - 1];
        let child = &mut right[0];

        debug_assert!(!sibling.keys.is_empty(), "left sibling has no key to lend");
        let borrowed = sibling.keys.remove(sibling.keys.len() - 1);
        let separator = mem::replace(&mut self.keys[idx - 1], borrowed);
        child.keys.insert(0, separator);

        // Internal siblings hand over their last child along with the key
        if let Some(grandchild) = sibling.children.pop() {
            child.children.insert(0, grandchild);
        }

        trace!(
            target: "btree_index::borrow",
            idx,
            direction = "prev",
            child_keys = child.keys.len(),
            sibling_keys = sibling.keys.len(),
            "borrowed key from left sibling"
        );
    }

    /// Mirror image of [`borrow_from_prev`](Self::borrow_from_prev): the first
    /// key of `children[idx + 1]` moves up, `keys[idx]` moves down to the end
    /// of `children[idx]`.
    pub(crate) fn borrow_from_next(&mut self, idx: usize) {
        let (left, right) = self.children.split_at_mut(idx + 1);
        let child = &mut left[idx];
        let sibling = &mut right[0];

        debug_assert!(!sibling.keys.is_empty(), "right sibling has no key to lend");
        let borrowed = sibling.keys.remove(0);
        let separator = mem::replace(&mut self.keys[idx], borrowed);
        child.keys.push(separator);

        if !sibling.is_leaf() {
            child.children.push(sibling.children.remove(0));
        }

        trace!(
            target: "btree_index::borrow",
            idx,
            direction = "next",
            child_keys = child.keys.len(),
            sibling_keys = sibling.keys.len(),
            "borrowed key from right sibling"
        );
    }

    /// Fuse `children[idx]`, `keys[idx]` and `children[idx + 1]` into a single
    /// node stored at `children[idx]`.
    pub(crate) fn merge(&mut self, idx: usize) {
        let sibling = self.children.remove(idx + 1);
        let separator = self.keys.remove(idx);

        let child = &mut self.children[idx];
        child.keys.push(separator);
        child.keys.extend(sibling.keys);
        child.children.extend(sibling.children);

        trace!(
            target: "btree_index::merge",
            idx,
            merged_keys = child.keys.len(),
            parent_keys = self.keys.len(),
            "merged child with right sibling"
        );
    }

    /// Remove the largest key of this subtree. The node must already hold at
    /// least `t` keys unless it is the root.
    pub(crate) fn pop_last(&mut self, t: usize) -> Option<K> {
        if self.is_leaf() {
            return self.keys.pop();
        }
        let mut idx = self.keys.len();
        if self.children[idx].keys.len() < t {
            self.fill(idx, t);
            idx = self.keys.len();
        }
        self.children[idx].pop_last(t)
    }

    /// Remove the smallest key of this subtree. Same precondition as
    /// [`pop_last`](Self::pop_last).
    pub(crate) fn pop_first(&mut self, t: usize) -> Option<K> {
        if self.is_leaf() {
            if self.keys.is_empty() {
                return None;
            }
            return Some(self.keys.remove(0));
        }
        if self.children[0].keys.len() < t {
            // Borrowing or merging keeps the leftmost subtree at index 0
            self.fill(0, t);
        }
        self.children[0].pop_first(t)
    }
}

impl<K: Ord> Node<K> {
    /// Index of the child whose range contains `key`.
    fn child_index(&self, key: &K) -> usize {
        self.keys.binary_search(key).unwrap_or_else(|idx| idx)
    }

    /// Find the node holding `key` in this subtree.
    pub fn search(&self, key: &K) -> Option<&Node<K>> {
        match self.keys.binary_search(key) {
            Ok(_) => Some(self),
            Err(_) if self.is_leaf() => None,
            Err(idx) => self.children[idx].search(key),
        }
    }

    /// Stored key equal to `key`, if any
    pub(crate) fn get(&self, key: &K) -> Option<&K> {
        let node = self.search(key)?;
        let idx = node.keys.binary_search(key).ok()?;
        node.keys.get(idx)
    }

    /// Swap an equal key in place, handing back the old one. Gives the key
    /// back untouched when no equal key exists.
    pub(crate) fn replace(&mut self, key: K) -> std::result::Result<K, K> {
        let mut node = self;
        loop {
            match node.keys.binary_search(&key) {
                Ok(idx) => return Ok(mem::replace(&mut node.keys[idx], key)),
                Err(_) if node.is_leaf() => return Err(key),
                Err(idx) => node = &mut node.children[idx],
            }
        }
    }

    /// Split the full child `children[idx]` around its median.
    ///
    /// The left half (`t - 1` keys) stays in place, the right half (`t - 1`
    /// keys, plus `t` children for internal nodes) moves to a new sibling at
    /// `children[idx + 1]`, and the median moves up into `keys[idx]`.
    pub(crate) fn split_child(&mut self, idx: usize, t: usize) {
        let child = &mut self.children[idx];
        let right_keys = child.keys.split_off(t);
        let right_children = if child.is_leaf() {
            Vec::new()
        } else {
            child.children.split_off(t)
        };
        let median = child.keys.remove(t - 1);

        self.keys.insert(idx, median);
        self.children.insert(
            idx + 1,
            Node {
                keys: right_keys,
                children: right_children,
            },
        );

        trace!(target: "btree_index::split", idx, half = t - 1, "split full child");
    }

    /// Insert `key` into the subtree rooted at this non-full node.
    ///
    /// Full children are split on the way down, so the leaf that finally
    /// receives the key always has room. The key must not already be present.
    pub(crate) fn insert_non_full(&mut self, key: K, config: &BTreeConfig) {
        let mut idx = self.child_index(&key);
        if self.is_leaf() {
            self.keys.insert(idx, key);
            return;
        }
        if self.children[idx].is_full(config) {
            self.split_child(idx, config.min_degree);
            if key > self.keys[idx] {
                idx += 1;
            }
        }
        self.children[idx].insert_non_full(key, config);
    }

    /// Remove `key` from this subtree, returning the stored key.
    ///
    /// Unless this node is the root, the caller guarantees it holds at least
    /// `t` keys.
    pub(crate) fn remove(&mut self, key: &K, t: usize) -> Option<K> {
        match self.keys.binary_search(key) {
            Ok(idx) if self.is_leaf() => Some(self.keys.remove(idx)),
            Ok(idx) => self.remove_from_internal(idx, key, t),
            Err(_) if self.is_leaf() => None,
            Err(mut idx) => {
                if self.children[idx].keys.len() < t {
                    self.fill(idx, t);
                    // fill may have merged this child into its left sibling
                    idx = self.child_index(key);
                }
                self.children[idx].remove(key, t)
            }
        }
    }

    fn remove_from_internal(&mut self, idx: usize, key: &K, t: usize) -> Option<K> {
        if self.children[idx].keys.len() >= t {
            let predecessor = self.children[idx].pop_last(t)?;
            trace!(target: "btree_index::remove", idx, "replaced separator with predecessor");
            Some(mem::replace(&mut self.keys[idx], predecessor))
        } else if self.children[idx + 1].keys.len() >= t {
            let successor = self.children[idx + 1].pop_first(t)?;
            trace!(target: "btree_index::remove", idx, "replaced separator with successor");
            Some(mem::replace(&mut self.keys[idx], successor))
        } else {
            self.merge(idx);
            self.children[idx].remove(key, t)
        }
    }

    /// Check the B-tree invariants for this subtree.
    ///
    /// `leaf_depth` records the depth of the first leaf reached; every other
    /// leaf must match it.
    pub(crate) fn validate(
        &self,
        config: &BTreeConfig,
        depth: usize,
        is_root: bool,
        leaf_depth: &mut Option<usize>,
    ) -> Result<()> {
        let count = self.keys.len();
        if count > config.max_keys() {
            return Err(TreeError::invariant(format!(
                "node at depth {} holds {} keys (max {})",
                depth,
                count,
                config.max_keys()
            )));
        }
        if !is_root && count < config.min_keys() {
            return Err(TreeError::invariant(format!(
                "node at depth {} holds {} keys (min {})",
                depth,
                count,
                config.min_keys()
            )));
        }
        if self.keys.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(TreeError::invariant(format!(
                "keys out of order in node at depth {}",
                depth
            )));
        }

        if self.is_leaf() {
            match *leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(expected) if expected != depth => {
                    return Err(TreeError::invariant(format!(
                        "leaf at depth {} but other leaves at depth {}",
                        depth, expected
                    )));
                }
                Some(_) => {}
            }
            return Ok(());
        }

        if self.children.len() != count + 1 {
            return Err(TreeError::invariant(format!(
                "node at depth {} has {} keys but {} children",
                depth,
                count,
                self.children.len()
            )));
        }
        if count == 0 {
            return Err(TreeError::invariant(format!(
                "internal node at depth {} has no keys",
                depth
            )));
        }

        for child in &self.children {
            child.validate(config, depth + 1, false, leaf_depth)?;
        }

        // Children are valid on their own; their extremes must sit inside
        // the separators around them.
        for (idx, key) in self.keys.iter().enumerate() {
            if self.predecessor(idx).is_some_and(|pred| pred >= key)
                || self.successor(idx).is_some_and(|succ| succ <= key)
            {
                return Err(TreeError::invariant(format!(
                    "separator {} at depth {} does not split its children",
                    idx, depth
                )));
            }
        }

        Ok(())
    }
}
