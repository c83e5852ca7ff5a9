//! # BTree Index
//!
//! An in-memory, order-balanced multiway search tree: the indexing
//! primitive that sits beneath a database or file-system index.
//!
//! ## Architecture
//!
//! - **Types** (`types`): `BTreeConfig` and the order limits
//! - **Nodes** (`btree::Node`): split, merge, borrow and the
//!   predecessor/successor walks, all local to a node and its children
//! - **Tree** (`btree::BTree`): root growth on insert, root collapse on
//!   delete, and the public operations
//!
//! Every node other than the root holds between `t - 1` and `2t - 1` keys,
//! and all leaves sit at the same depth after every operation.
//!
//! ## Usage
//!
//! ```rust
//! use btree_index::{BTree, Result};
//!
//! # fn main() -> Result<()> {
//! let mut tree = BTree::new(2)?;
//! for key in [10, 20, 5, 6, 12, 30, 7, 17] {
//!     tree.insert(key);
//! }
//!
//! assert!(tree.search(&6).is_some());
//! assert!(tree.search(&99).is_none());
//!
//! tree.remove(&6);
//! assert_eq!(tree.traverse(), vec![&5, &7, &10, &12, &17, &20, &30]);
//! # Ok(())
//! # }
//! ```

pub mod btree;
pub mod error;
pub mod types;

pub use btree::{BTree, Iter, Node, NodeSnapshot, SearchOutcome, SearchStep, TreeStats};
pub use error::{Result, TreeError};
pub use types::{BTreeConfig, DEFAULT_MIN_DEGREE, MAX_DEGREE, MIN_DEGREE};
