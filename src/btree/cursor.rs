//! B-tree cursor for iteration.
//!
//! The cursor walks the tree in ascending key order without collecting it
//! first. It maintains a stack of (node, key_index) pairs representing the
//! path from the root to the current position.

use super::node::Node;
use std::iter::FusedIterator;

/// Ascending iterator over the keys of a [`BTree`](super::BTree)
#[derive(Debug, Clone)]
pub struct Iter<'a, K> {
    /// Path to the current position; the index is the next key to yield
    stack: Vec<(&'a Node<K>, usize)>,
    /// Keys not yet yielded
    remaining: usize,
}

impl<'a, K> Iter<'a, K> {
    pub(crate) fn new(root: &'a Node<K>, len: usize) -> Self {
        let mut iter = Self {
            stack: Vec::new(),
            remaining: len,
        };
        iter.push_left_edge(root);
        iter
    }

    /// Push `node` and its leftmost descendants onto the stack
    fn push_left_edge(&mut self, mut node: &'a Node<K>) {
        loop {
            self.stack.push((node, 0));
            match node.children().first() {
                Some(child) => node = child,
                None => break,
            }
        }
    }
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (node, idx) = self.stack.last_mut()?;
            let node: &'a Node<K> = *node;

            if *idx < node.len() {
                let key = &node.keys()[*idx];
                *idx += 1;
                // Everything between this key and the next lives in children[idx]
                let next_child = *idx;
                if let Some(child) = node.children().get(next_child) {
                    self.push_left_edge(child);
                }
                self.remaining = self.remaining.saturating_sub(1);
                return Some(key);
            }

            self.stack.pop();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {}

impl<K> FusedIterator for Iter<'_, K> {}
