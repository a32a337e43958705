//! # A copy-on-write B+ tree over fixed-size pages
//!
//! The node engine of [Build Your Own Database from Scratch (in Rust)](https://build-your-own.org/database/):
//! the page format, node split/merge algorithms, and a tree driver whose
//! every write produces a new root while old roots stay readable.
//!
//! Pages are owned by the host through the [`PageStore`] trait. [`InMemory`]
//! is a reference host.
//!
//! ## Example
//!
//! ```rust,no_run
//! # use byodb_btree::{InMemory, Result, Tree};
//! # fn main() -> Result<()> {
//! let store = InMemory::new();
//! let tree = Tree::create(&store)?;
//!
//! let new_tree = tree.insert(b"key", b"val")?;
//! assert_eq!(new_tree.get(b"key")?, Some(b"val".to_vec()));
//!
//! // The old root is a snapshot from before the insert.
//! assert_eq!(tree.get(b"key")?, None);
//!
//! for pair in new_tree.in_order_iter() {
//!     let (k, v) = pair?;
//!     println!("key: {k:?}, val: {v:?}");
//! }
//!
//! // Once nothing reads the old root, its pages can be dropped.
//! store.reclaim();
//! # Ok(())
//! # }
//! ```
mod core;

pub use crate::core::consts;
pub use crate::core::header::NodeType;
pub use crate::core::page::Page;
pub use crate::core::page_store::{InMemory, PageStore};
pub use crate::core::tree::{InOrder, Tree};

pub mod error {
    //! Errors returned by the tree and its hosts.
    pub use crate::core::error::{NodeError, PageError, TreeError};
}

/// A `Result` of a tree operation.
pub type Result<T> = std::result::Result<T, error::TreeError>;
