//! [`Page`] and [`PageBuf`] are the two ownership states of a node's bytes.
//!
//! A node is built inside a [`PageBuf`], an exclusively owned scratch buffer
//! twice the size of a page. It is allowed to overflow a page while it is
//! being built, since an overflowed node is split before it is ever written.
//! [`PageBuf::finish`] then freezes it into a [`Page`], which is immutable,
//! cheap to clone, and exactly [`PAGE_SIZE`] bytes long. Only [`Page`]s are
//! handed to a [`crate::PageStore`], so nothing can mutate a node after it
//! was written.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::core::codec;
use crate::core::consts::{PAGE_SIZE, SCRATCH_SIZE};
use crate::core::error::NodeError;
use crate::core::header::{self, NodeType};

type Result<T> = std::result::Result<T, NodeError>;

/// An immutable node page.
#[derive(Clone, PartialEq, Eq)]
pub struct Page {
    buf: Arc<[u8]>,
}

impl Page {
    /// Rebuilds a page from bytes previously obtained through
    /// [`Page::as_bytes`], e.g. after reading them back from disk.
    ///
    /// The bytes are validated, so a corrupt page is rejected here rather
    /// than trusted by the tree.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(NodeError::Corrupt(format!(
                "page is {} bytes instead of {PAGE_SIZE}",
                bytes.len()
            )));
        }
        codec::validate(bytes, PAGE_SIZE)?;
        Ok(Page { buf: bytes.into() })
    }

    /// Gets the raw `PAGE_SIZE` bytes of the page.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn node_type(&self) -> Result<NodeType> {
        header::get_node_type(&self.buf)
    }

    pub fn num_keys(&self) -> Result<usize> {
        header::get_num_keys(&self.buf)
    }

    /// Gets the `i`th key.
    pub fn key(&self, i: usize) -> Result<&[u8]> {
        codec::get_key(&self.buf, i)
    }

    /// Gets the `i`th value. Always empty for internal nodes.
    pub fn value(&self, i: usize) -> Result<&[u8]> {
        codec::get_value(&self.buf, i)
    }

    /// Gets the `i`th child page number. Always 0 for leaf nodes.
    pub fn child_page(&self, i: usize) -> Result<u64> {
        codec::get_child_pointer(&self.buf, i)
    }

    /// Gets the number of bytes actually used by the node.
    pub fn num_bytes(&self) -> Result<usize> {
        codec::get_num_bytes(&self.buf)
    }
}

impl Deref for Page {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl AsRef<[u8]> for Page {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("node_type", &self.node_type())
            .field("num_keys", &self.num_keys())
            .field("num_bytes", &self.num_bytes())
            .finish()
    }
}

/// A scratch buffer a node is built in.
pub(crate) struct PageBuf {
    buf: Box<[u8]>,
}

impl PageBuf {
    /// Creates a scratch buffer with its header set.
    pub fn new(node_type: NodeType, num_keys: usize) -> Result<Self> {
        let mut buf = vec![0u8; SCRATCH_SIZE].into_boxed_slice();
        header::set_header(&mut buf, node_type, num_keys)?;
        Ok(PageBuf { buf })
    }

    /// Creates a leaf without keys, i.e. the root of an empty tree.
    pub fn empty_leaf() -> Result<Self> {
        Self::new(NodeType::Leaf, 0)
    }

    pub fn node_type(&self) -> Result<NodeType> {
        header::get_node_type(&self.buf)
    }

    pub fn num_keys(&self) -> Result<usize> {
        header::get_num_keys(&self.buf)
    }

    pub fn num_bytes(&self) -> Result<usize> {
        codec::get_num_bytes(&self.buf)
    }

    /// Freezes the node into a page. Fails if the node overflows a page.
    pub fn finish(self) -> Result<Page> {
        let num_bytes = self.num_bytes()?;
        if num_bytes > PAGE_SIZE {
            return Err(NodeError::Overflow(num_bytes));
        }
        Ok(Page {
            buf: self.buf[..PAGE_SIZE].into(),
        })
    }
}

impl Deref for PageBuf {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for PageBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}
