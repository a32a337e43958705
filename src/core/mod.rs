//! The `core` module contains the "core" data types and functions used for
//! manipulating the copy-on-write B+ tree.
//!
//! [`codec`] reads and writes the fields of a node inside a page, [`page`]
//! holds the bytes of a node while it is built and once it is written, and
//! [`page_store`] is the host capability the [`tree`] uses to reach pages.
pub mod consts;
pub mod error;
pub(crate) mod codec;
pub mod header;
pub mod page;
pub mod page_store;
pub(crate) mod tree;
