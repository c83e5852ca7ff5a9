//! B-tree core implementation.
//!
//! This module provides the main BTree struct with operations for:
//! - search / contains / get: Point lookups
//! - insert / replace: Insertions (set semantics, or overwrite)
//! - remove / take: Deletions with top-down rebalancing
//! - traverse / iter: Ascending dumps of every key
//!
//! The root is the only node allowed to hold fewer than `t - 1` keys, and
//! it is the only place the height changes: the tree grows by splitting a
//! full root under a fresh one, and shrinks when a merge drains the root
//! of its last key.

use super::cursor::Iter;
use super::node::{Node, NodeSnapshot};
use crate::error::{Result, TreeError};
use crate::types::BTreeConfig;
use serde::Serialize;
use std::mem;
use tracing::debug;

/// An in-memory B-tree of unique keys
#[derive(Debug, Clone)]
pub struct BTree<K> {
    /// Root node (an empty leaf when the tree is empty)
    root: Node<K>,
    /// Order parameters, fixed at construction
    config: BTreeConfig,
    /// Number of keys in the tree
    len: usize,
}

/// Tree statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeStats {
    /// Minimum degree `t`
    pub min_degree: usize,
    /// Number of levels (0 for an empty tree)
    pub height: usize,
    /// Total nodes, leaves included
    pub node_count: usize,
    /// Number of leaf nodes
    pub leaf_count: usize,
    /// Number of keys
    pub key_count: usize,
}

/// What a search did at one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SearchOutcome {
    /// The key sits at `index` in this node
    Found { index: usize },
    /// The search continued into `children[child]`
    Descend { child: usize },
    /// Reached a leaf without finding the key
    Absent,
}

/// One node visited by [`BTree::trace_search`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStep {
    pub depth: usize,
    pub key_count: usize,
    pub is_leaf: bool,
    pub outcome: SearchOutcome,
}

impl<K> BTree<K> {
    /// Create an empty tree with the given minimum degree
    pub fn new(min_degree: usize) -> Result<Self> {
        Self::with_config(BTreeConfig::new(min_degree))
    }

    /// Create an empty tree from a configuration
    ///
    /// Fails with [`TreeError::InvalidOrder`] when `min_degree` is outside
    /// `[MIN_DEGREE, MAX_DEGREE]`.
    pub fn with_config(config: BTreeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            root: Node::new_leaf(),
            config,
            len: 0,
        })
    }

    pub fn config(&self) -> BTreeConfig {
        self.config
    }

    pub fn min_degree(&self) -> usize {
        self.config.min_degree
    }

    /// Number of keys in the tree
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Root node, for read-only inspection
    pub fn root(&self) -> &Node<K> {
        &self.root
    }

    /// Number of levels; every leaf sits at this depth
    pub fn height(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let mut height = 1;
        let mut node = &self.root;
        while let Some(child) = node.children().first() {
            height += 1;
            node = child;
        }
        height
    }

    /// Smallest key
    pub fn first(&self) -> Option<&K> {
        self.root.first()
    }

    /// Largest key
    pub fn last(&self) -> Option<&K> {
        self.root.last()
    }

    /// Every key in ascending order
    pub fn traverse(&self) -> Vec<&K> {
        let mut keys = Vec::with_capacity(self.len);
        self.root.traverse(&mut keys);
        keys
    }

    /// Lazy ascending iterator over the keys
    pub fn iter(&self) -> Iter<'_, K> {
        Iter::new(&self.root, self.len)
    }

    /// Remove every key, keeping the configuration
    pub fn clear(&mut self) {
        self.root = Node::new_leaf();
        self.len = 0;
    }

    /// Remove and return the smallest key
    pub fn pop_first(&mut self) -> Option<K> {
        let key = self.root.pop_first(self.config.min_degree);
        self.finish_removal(key)
    }

    /// Remove and return the largest key
    pub fn pop_last(&mut self) -> Option<K> {
        let key = self.root.pop_last(self.config.min_degree);
        self.finish_removal(key)
    }

    /// Export the tree structure for visualization
    pub fn export(&self) -> NodeSnapshot<'_, K> {
        self.root.snapshot()
    }

    /// Get statistics about the tree
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            min_degree: self.config.min_degree,
            height: self.height(),
            node_count: 0,
            leaf_count: 0,
            key_count: 0,
        };
        if !self.is_empty() {
            count_nodes(&self.root, &mut stats);
        }
        stats
    }

    /// Shared bookkeeping after any removal: collapse a drained root and
    /// keep the length in step.
    fn finish_removal(&mut self, removed: Option<K>) -> Option<K> {
        // A merge below the root can empty it even when nothing was removed
        // (fill runs before the search knows the key is absent).
        self.collapse_root();
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    fn collapse_root(&mut self) {
        if !self.root.is_empty() || self.root.is_leaf() {
            return;
        }
        if let Some(child) = self.root.children.pop() {
            self.root = child;
            debug!(
                target: "btree_index::tree",
                height = self.height(),
                "root drained, tree shrank"
            );
        }
    }
}

impl<K: Ord> BTree<K> {
    /// Find the node holding `key`
    ///
    /// Returns `None` when the key is absent, including on an empty tree.
    pub fn search(&self, key: &K) -> Option<&Node<K>> {
        self.root.search(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.search(key).is_some()
    }

    /// The stored key equal to `key`
    pub fn get(&self, key: &K) -> Option<&K> {
        self.root.get(key)
    }

    /// Insert a key
    ///
    /// Returns `false`, leaving the tree untouched, when an equal key is
    /// already present.
    pub fn insert(&mut self, key: K) -> bool {
        if self.contains(&key) {
            return false;
        }
        self.insert_absent(key);
        true
    }

    /// Insert a key, overwriting an equal one if present
    ///
    /// Returns the key that was replaced.
    pub fn replace(&mut self, key: K) -> Option<K> {
        match self.root.replace(key) {
            Ok(old) => Some(old),
            Err(key) => {
                self.insert_absent(key);
                None
            }
        }
    }

    /// Remove a key
    ///
    /// Returns `true` if the key was present. Removing an absent key is a no-op.
    pub fn remove(&mut self, key: &K) -> bool {
        self.take(key).is_some()
    }

    /// Remove a key and hand back the stored one
    pub fn take(&mut self, key: &K) -> Option<K> {
        let removed = self.root.remove(key, self.config.min_degree);
        self.finish_removal(removed)
    }

    /// Trace the path a search for `key` takes from the root
    pub fn trace_search(&self, key: &K) -> Vec<SearchStep> {
        let mut steps = Vec::new();
        let mut node = &self.root;
        let mut depth = 0;
        loop {
            let outcome = match node.keys().binary_search(key) {
                Ok(index) => SearchOutcome::Found { index },
                Err(_) if node.is_leaf() => SearchOutcome::Absent,
                Err(child) => SearchOutcome::Descend { child },
            };
            steps.push(SearchStep {
                depth,
                key_count: node.len(),
                is_leaf: node.is_leaf(),
                outcome,
            });
            match outcome {
                SearchOutcome::Descend { child } => {
                    node = &node.children()[child];
                    depth += 1;
                }
                _ => return steps,
            }
        }
    }

    /// Check every structural invariant
    ///
    /// All leaves at one depth, key counts within `[t - 1, 2t - 1]` outside
    /// the root, keys strictly sorted and bracketed by their separators, and
    /// one more child than keys in each internal node.
    pub fn validate(&self) -> Result<()> {
        let mut leaf_depth = None;
        self.root
            .validate(&self.config, 0, true, &mut leaf_depth)?;

        let counted = self.iter().count();
        if counted != self.len {
            return Err(TreeError::invariant(format!(
                "tree reports {} keys but holds {}",
                self.len, counted
            )));
        }
        Ok(())
    }

    /// Insert a key known to be absent.
    fn insert_absent(&mut self, key: K) {
        if self.root.is_full(&self.config) {
            let old_root = mem::replace(&mut self.root, Node::new_leaf());
            self.root = Node::new_internal(old_root);
            self.root.split_child(0, self.config.min_degree);
            debug!(
                target: "btree_index::tree",
                height = self.height(),
                "root split, tree grew"
            );
        }
        self.root.insert_non_full(key, &self.config);
        self.len += 1;
    }
}

fn count_nodes<K>(node: &Node<K>, stats: &mut TreeStats) {
    stats.node_count += 1;
    stats.key_count += node.len();
    if node.is_leaf() {
        stats.leaf_count += 1;
    }
    for child in node.children() {
        count_nodes(child, stats);
    }
}

impl<K> Default for BTree<K> {
    fn default() -> Self {
        Self {
            root: Node::new_leaf(),
            config: BTreeConfig::default(),
            len: 0,
        }
    }
}

impl<K: Ord> Extend<K> for BTree<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: Ord> FromIterator<K> for BTree<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tree = Self::default();
        tree.extend(iter);
        tree
    }
}

impl<'a, K> IntoIterator for &'a BTree<K> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    const SCENARIO: [i32; 8] = [10, 20, 5, 6, 12, 30, 7, 17];

    fn scenario_tree() -> BTree<i32> {
        let mut tree = BTree::new(2).unwrap();
        for key in SCENARIO {
            assert!(tree.insert(key));
            tree.validate().unwrap();
        }
        tree
    }

    fn keys(tree: &BTree<i32>) -> Vec<i32> {
        tree.traverse().into_iter().copied().collect()
    }

    #[test]
    fn test_btree_rejects_small_order() {
        assert!(matches!(
            BTree::<i32>::new(1),
            Err(TreeError::InvalidOrder { min_degree: 1, min: 2, .. })
        ));
        assert!(BTree::<i32>::new(0).is_err());
        assert!(BTree::<i32>::new(2).is_ok());
        assert!(BTree::<i32>::new(usize::MAX).is_err());
    }

    #[test]
    fn test_btree_empty() -> Result<()> {
        let tree = BTree::<i32>::new(2)?;
        assert!(tree.search(&1).is_none());
        assert!(tree.traverse().is_empty());
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.first(), None);
        tree.validate()?;
        Ok(())
    }

    #[test]
    fn test_btree_scenario_insert() {
        let tree = scenario_tree();
        assert_eq!(keys(&tree), vec![5, 6, 7, 10, 12, 17, 20, 30]);
        assert_eq!(tree.len(), 8);
        assert_eq!(tree.height(), 2);
        // 10 is the median promoted by the first root split; 20 follows when
        // the right leaf [12, 20, 30] splits on the way to inserting 17.
        assert_eq!(tree.root().keys(), &[10, 20]);
    }

    #[test]
    fn test_btree_scenario_search() {
        let tree = scenario_tree();
        assert!(tree.search(&6).is_some_and(|node| node.keys().contains(&6)));
        assert!(tree.search(&99).is_none());
        assert_eq!(tree.get(&17), Some(&17));
        assert!(!tree.contains(&11));
    }

    #[test]
    fn test_btree_scenario_remove_one() -> Result<()> {
        let mut tree = scenario_tree();
        assert!(tree.remove(&6));
        assert_eq!(keys(&tree), vec![5, 7, 10, 12, 17, 20, 30]);
        tree.validate()
    }

    #[test]
    fn test_btree_scenario_remove_all() -> Result<()> {
        let orders: [[i32; 8]; 3] = [
            SCENARIO,
            [30, 20, 17, 12, 10, 7, 6, 5],
            [10, 5, 30, 6, 20, 7, 17, 12],
        ];
        for order in orders {
            let mut tree = scenario_tree();
            for key in order {
                assert!(tree.remove(&key), "failed to remove {}", key);
                tree.validate()?;
            }
            assert!(tree.traverse().is_empty());
            assert!(tree.is_empty());
            assert!(tree.root().is_leaf());
        }
        Ok(())
    }

    #[test]
    fn test_btree_remove_absent_is_noop() -> Result<()> {
        let mut tree = scenario_tree();
        let before = keys(&tree);
        assert!(!tree.remove(&99));
        assert!(!tree.remove(&11));
        assert_eq!(keys(&tree), before);
        assert_eq!(tree.len(), 8);
        tree.validate()?;

        let mut empty = BTree::<i32>::new(3)?;
        assert!(!empty.remove(&1));
        assert!(empty.is_empty());
        Ok(())
    }

    #[test]
    fn test_btree_grow_and_collapse() -> Result<()> {
        let mut tree = BTree::new(2)?;
        for key in 1..=3 {
            tree.insert(key);
        }
        assert_eq!(tree.height(), 1);

        tree.insert(4);
        assert_eq!(tree.height(), 2);
        assert_eq!(tree.root().keys(), &[2]);

        tree.remove(&1);
        assert_eq!(tree.root().keys(), &[3]);
        assert_eq!(tree.height(), 2);

        tree.remove(&2);
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.root().keys(), &[3, 4]);
        tree.validate()
    }

    #[test]
    fn test_btree_duplicate_insert_rejected() -> Result<()> {
        let mut tree = BTree::new(2)?;
        for key in [1, 2, 3] {
            tree.insert(key);
        }
        // A duplicate against a full root must not split it
        assert!(!tree.insert(2));
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.len(), 3);
        assert_eq!(keys(&tree), vec![1, 2, 3]);
        Ok(())
    }

    #[derive(Debug, Clone, Copy)]
    struct Entry {
        id: u32,
        label: &'static str,
    }

    impl PartialEq for Entry {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    impl Eq for Entry {}

    impl PartialOrd for Entry {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    impl Ord for Entry {
        fn cmp(&self, other: &Self) -> Ordering {
            self.id.cmp(&other.id)
        }
    }

    #[test]
    fn test_btree_replace() -> Result<()> {
        let mut tree = BTree::new(2)?;
        for id in 0..10 {
            tree.insert(Entry { id, label: "old" });
        }

        let old = tree.replace(Entry { id: 7, label: "new" });
        assert_eq!(old.map(|e| e.label), Some("old"));
        assert_eq!(tree.get(&Entry { id: 7, label: "" }).map(|e| e.label), Some("new"));
        assert_eq!(tree.len(), 10);

        assert!(tree.replace(Entry { id: 42, label: "fresh" }).is_none());
        assert_eq!(tree.len(), 11);
        tree.validate()
    }

    #[test]
    fn test_btree_take_returns_stored_key() -> Result<()> {
        let mut tree = BTree::new(2)?;
        tree.insert(Entry { id: 1, label: "stored" });
        let taken = tree.take(&Entry { id: 1, label: "probe" });
        assert_eq!(taken.map(|e| e.label), Some("stored"));
        assert!(tree.is_empty());
        Ok(())
    }

    #[test]
    fn test_btree_many_keys_across_orders() -> Result<()> {
        for t in 2..=5 {
            let mut tree = BTree::new(t)?;
            // 37 is coprime with 211, so this visits every key once
            for i in 0..211 {
                assert!(tree.insert((i * 37) % 211));
            }
            tree.validate()?;
            assert_eq!(keys(&tree), (0..211).collect::<Vec<_>>());

            for key in (0..211).filter(|k| k % 3 != 0) {
                assert!(tree.remove(&key));
                tree.validate()?;
            }
            let expected: Vec<i32> = (0..211).filter(|k| k % 3 == 0).collect();
            assert_eq!(keys(&tree), expected);
            assert_eq!(tree.len(), expected.len());
        }
        Ok(())
    }

    #[test]
    fn test_btree_pop_first_and_last() -> Result<()> {
        let mut tree: BTree<i32> = (1..=20).collect();
        assert_eq!(tree.pop_first(), Some(1));
        assert_eq!(tree.pop_last(), Some(20));
        assert_eq!(tree.first(), Some(&2));
        assert_eq!(tree.last(), Some(&19));
        tree.validate()?;

        while tree.pop_first().is_some() {
            tree.validate()?;
        }
        assert!(tree.is_empty());
        assert_eq!(tree.pop_last(), None);
        Ok(())
    }

    #[test]
    fn test_btree_stats() {
        let tree = scenario_tree();
        let stats = tree.stats();
        assert_eq!(
            stats,
            TreeStats {
                min_degree: 2,
                height: 2,
                node_count: 4,
                leaf_count: 3,
                key_count: 8,
            }
        );
        assert_eq!(BTree::<i32>::default().stats().node_count, 0);
    }

    #[test]
    fn test_btree_trace_search() {
        let tree = scenario_tree();

        let steps = tree.trace_search(&17);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].outcome, SearchOutcome::Descend { child: 1 });
        assert_eq!(steps[1].outcome, SearchOutcome::Found { index: 1 });
        assert!(steps[1].is_leaf);

        let steps = tree.trace_search(&99);
        assert_eq!(steps[0].outcome, SearchOutcome::Descend { child: 2 });
        assert_eq!(steps[1].outcome, SearchOutcome::Absent);

        let steps = tree.trace_search(&10);
        assert_eq!(steps, vec![SearchStep {
            depth: 0,
            key_count: 2,
            is_leaf: false,
            outcome: SearchOutcome::Found { index: 0 },
        }]);
    }

    #[test]
    fn test_btree_export() -> std::result::Result<(), serde_json::Error> {
        let tree = scenario_tree();
        let json = serde_json::to_value(tree.export())?;

        assert_eq!(json["isLeaf"], false);
        assert_eq!(json["keys"], serde_json::json!([10, 20]));
        assert_eq!(json["children"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["children"][0]["keys"], serde_json::json!([5, 6, 7]));
        Ok(())
    }

    #[test]
    fn test_btree_clear() {
        let mut tree = scenario_tree();
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.min_degree(), 2);
        assert!(tree.insert(1));
    }
}
