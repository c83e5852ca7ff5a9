//! B-tree implementation.
//!
//! This module provides an in-memory B-tree that supports:
//! - Point lookups (search)
//! - Insertions with top-down splitting (insert)
//! - Deletions with borrow/merge rebalancing (remove)
//! - Ascending traversal (traverse, iter)

mod cursor;
mod node;
mod tree;

pub use cursor::Iter;
pub use node::{Node, NodeSnapshot};
pub use tree::{BTree, SearchOutcome, SearchStep, TreeStats};
