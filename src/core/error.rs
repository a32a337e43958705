//! Errors returned by functions in the [`crate::core`] module.

use std::io;

/// An error type for `mod tree`.
#[derive(thiserror::Error, Debug)]
pub enum TreeError {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),
    #[error("Page store error: {0}")]
    Page(#[from] PageError),
}

/// An error type for `mod node`.
#[derive(thiserror::Error, Debug)]
pub enum NodeError {
    #[error("Key size exceeds maximum limit: key length {0} exceeds MAX_KEY_SIZE")]
    MaxKeySize(usize), // usize is key length
    #[error("Value size exceeds maximum limit: value length {0} exceeds MAX_VALUE_SIZE")]
    MaxValueSize(usize), // usize is value length
    #[error("Unexpected node type: {0:#b}")]
    UnexpectedNodeType(u16), // u16 is the node type
    #[error("Index {i} is out of range for a node with {n} keys")]
    IndexOutOfRange { i: usize, n: usize },
    #[error("Bytes [{pos}, {pos} + {len}) are out of bounds of a {cap} byte buffer")]
    OutOfBounds { pos: usize, len: usize, cap: usize },
    #[error("Node of {0} bytes overflows PAGE_SIZE")]
    Overflow(usize), // usize is the node size
    #[error("Corrupt node: {0}")]
    Corrupt(String),
}

/// An error type for `mod page_store`, i.e. failures reported by the host.
#[derive(thiserror::Error, Debug)]
pub enum PageError {
    #[error("Page not found: {0}")]
    NotFound(u64),
    #[error("Page read error: {0}")]
    Read(String),
    #[error("Page write error: {0}")]
    Write(String),
    #[error(transparent)]
    IOError(#[from] io::Error),
}
