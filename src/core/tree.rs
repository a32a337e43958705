//! A copy-on-write (COW) B+ tree is a variation of the standard B+ tree that
//! employs the copy-on-write technique for handling modifications. Instead of
//! directly updating the existing nodes in the tree when an insertion,
//! deletion, or update occurs, the COW approach creates a modified copy of the
//! node (or the path of nodes leading to the change). The original node
//! remains unchanged. This means that any other readers concurrently accessing
//! the tree will continue to see the consistent, older version of the data
//! until they reach a point where they would naturally access the newly
//! written parts.
//!
//! A write descends from the root to a leaf, builds the modified leaf in a
//! scratch buffer, and then rebuilds every ancestor on the way back up. Each
//! level hands its parent 1 to 3 freshly written pages, along with their
//! first keys, which replace the link to the old child. Only after the whole
//! new path (and root) has been written are the replaced pages handed back to
//! the [`PageStore`]. If anything fails midway, the pages written so far are
//! handed back instead, and the caller still holds the old root.

mod node;

use std::fmt;
use std::ops::{Bound, RangeBounds};

use crate::core::codec;
use crate::core::consts::{MAX_KEY_SIZE, MAX_VALUE_SIZE, MERGE_THRESHOLD};
use crate::core::error::{NodeError, TreeError};
use crate::core::header::NodeType;
use crate::core::page::{Page, PageBuf};
use crate::core::page_store::PageStore;
use node::internal::{self, ChildEntry};
use node::leaf::{self, Slot};

type Result<T> = std::result::Result<T, TreeError>;

/// A copy-on-write (COW) B+ Tree whose nodes live in a [`PageStore`].
///
/// A `Tree` is only a root page number plus a reference to its store, so it
/// is cheap to copy. Writes never touch the pages of `self`. They return a
/// new `Tree` instead, which leaves `self` as a readable snapshot until the
/// store reclaims its pages.
///
/// Writes are expected to be applied to the newest tree only. Writing to an
/// older snapshot would retire the same pages twice.
pub struct Tree<'s, S: PageStore> {
    store: &'s S,
    page_num: u64,
}

impl<S: PageStore> Clone for Tree<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: PageStore> Copy for Tree<'_, S> {}

impl<S: PageStore> fmt::Debug for Tree<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("page_num", &self.page_num)
            .finish_non_exhaustive()
    }
}

impl<'s, S: PageStore> Tree<'s, S> {
    /// Loads the root of the tree at a specified root page num.
    pub fn new(store: &'s S, page_num: u64) -> Self {
        Tree { store, page_num }
    }

    /// Creates an empty tree, whose root is an empty leaf.
    pub fn create(store: &'s S) -> Result<Self> {
        let page_num = store.write_page(PageBuf::empty_leaf()?.finish()?)?;
        Ok(Tree::new(store, page_num))
    }

    /// Gets the root page num.
    pub fn page_num(&self) -> u64 {
        self.page_num
    }

    /// Gets the value corresponding to the key.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if key.len() > MAX_KEY_SIZE {
            // Such a key could never have been inserted.
            return Ok(None);
        }
        let mut page = self.store.read_page(self.page_num)?;
        loop {
            match page.node_type()? {
                NodeType::Leaf => return Ok(leaf::get(&page, key)?.map(<[u8]>::to_vec)),
                NodeType::Internal => {
                    let i = internal::find(&page, key)?;
                    page = self.store.read_page(page.child_page(i)?)?;
                }
            }
        }
    }

    /// Inserts a key-value pair, or updates the value if the key already
    /// exists.
    pub fn insert(&self, key: &[u8], val: &[u8]) -> Result<Self> {
        if key.len() > MAX_KEY_SIZE {
            return Err(NodeError::MaxKeySize(key.len()).into());
        }
        if val.len() > MAX_VALUE_SIZE {
            return Err(NodeError::MaxValueSize(val.len()).into());
        }
        log::trace!(
            "insert {} byte key and {} byte value at root {}",
            key.len(),
            val.len(),
            self.page_num
        );
        let mut w = Writer::new(self.store);
        let result = w
            .insert_helper(self.page_num, key, val)
            .and_then(|updated| w.finish_root(updated));
        let page_num = w.settle(result)?;
        Ok(Tree::new(self.store, page_num))
    }

    /// Deletes a key and its value. Deleting an absent key is a no-op that
    /// returns the same tree.
    pub fn delete(&self, key: &[u8]) -> Result<Self> {
        if key.len() > MAX_KEY_SIZE {
            return Ok(*self);
        }
        log::trace!("delete {} byte key at root {}", key.len(), self.page_num);
        let mut w = Writer::new(self.store);
        let result = match w.delete_helper(self.page_num, key) {
            Ok(Some(updated)) => w.finish_root(updated),
            Ok(None) => Ok(self.page_num),
            Err(err) => Err(err),
        };
        let page_num = w.settle(result)?;
        Ok(Tree::new(self.store, page_num))
    }

    /// Iterates through the entire tree in-order.
    pub fn in_order_iter(&self) -> InOrder<'s, S> {
        self.range_iter(..)
    }

    /// Iterates through the tree in-order, bounded by `range`.
    pub fn range_iter<R: RangeBounds<[u8]>>(&self, range: R) -> InOrder<'s, S> {
        InOrder {
            store: self.store,
            seek: Some((self.page_num, range.start_bound().map(<[u8]>::to_vec))),
            stack: Vec::new(),
            end: range.end_bound().map(<[u8]>::to_vec),
        }
    }

    /// Gets the height of the tree. A lone root leaf has height 1.
    pub fn height(&self) -> Result<usize> {
        let mut height = 1;
        let mut page = self.store.read_page(self.page_num)?;
        while page.node_type()? == NodeType::Internal {
            page = self.store.read_page(page.child_page(0)?)?;
            height += 1;
        }
        Ok(height)
    }

    /// Counts the key-value pairs. This scans the entire tree.
    pub fn len(&self) -> Result<usize> {
        self.in_order_iter().try_fold(0, |n, item| item.map(|_| n + 1))
    }

    /// Whether the tree has no key-value pairs.
    pub fn is_empty(&self) -> Result<bool> {
        let root = self.store.read_page(self.page_num)?;
        Ok(root.num_keys()? == 0)
    }
}

/// The state of a single write: the pages it wrote, and the pages of the old
/// tree it replaced.
struct Writer<'s, S: PageStore> {
    store: &'s S,
    allocated: Vec<u64>,
    retired: Vec<u64>,
}

impl<'s, S: PageStore> Writer<'s, S> {
    fn new(store: &'s S) -> Self {
        Writer {
            store,
            allocated: Vec::new(),
            retired: Vec::new(),
        }
    }

    fn read(&self, page_num: u64) -> Result<Page> {
        Ok(self.store.read_page(page_num)?)
    }

    fn write(&mut self, page: Page) -> Result<u64> {
        let page_num = self.store.write_page(page)?;
        self.allocated.push(page_num);
        Ok(page_num)
    }

    fn retire(&mut self, page_num: u64) {
        self.retired.push(page_num);
    }

    /// Splits a node into pages, writes them, and returns the links a parent
    /// needs to reference them.
    fn write_split(&mut self, buf: PageBuf) -> Result<Vec<ChildEntry>> {
        let mut entries = Vec::with_capacity(3);
        for page in node::split(buf)? {
            let key = page.key(0)?.to_vec();
            let page_num = self.write(page)?;
            entries.push(ChildEntry { key, page_num });
        }
        Ok(entries)
    }

    /// Frees the replaced pages if the write succeeded, or the written pages
    /// if it failed.
    fn settle(self, result: Result<u64>) -> Result<u64> {
        match result {
            Ok(page_num) => {
                for retired in self.retired {
                    self.store.mark_free(retired);
                }
                Ok(page_num)
            }
            Err(err) => {
                log::warn!(
                    "aborting tree write, freeing {} written pages: {err}",
                    self.allocated.len()
                );
                for allocated in self.allocated {
                    self.store.mark_free(allocated);
                }
                Err(err)
            }
        }
    }

    /// This is a recursive implementation of `insert`.
    fn insert_helper(&mut self, page_num: u64, key: &[u8], val: &[u8]) -> Result<PageBuf> {
        let page = self.read(page_num)?;
        let updated = match page.node_type()? {
            NodeType::Leaf => leaf::upsert(&page, key, val)?,
            NodeType::Internal => {
                let i = internal::find(&page, key)?;
                let child = self.insert_helper(page.child_page(i)?, key, val)?;
                let entries = self.write_split(child)?;
                internal::replace_children(&page, i, 1, &entries)?
            }
        };
        self.retire(page_num);
        Ok(updated)
    }

    /// This is a recursive implementation of `delete`. Returns `None` if the
    /// key is absent, in which case nothing was written or retired.
    fn delete_helper(&mut self, page_num: u64, key: &[u8]) -> Result<Option<PageBuf>> {
        let page = self.read(page_num)?;
        let updated = match page.node_type()? {
            NodeType::Leaf => match leaf::find(&page, key)? {
                Slot::Found(i) => leaf::delete(&page, i)?,
                Slot::Vacant(_) => return Ok(None),
            },
            NodeType::Internal => {
                let i = internal::find(&page, key)?;
                let Some(child) = self.delete_helper(page.child_page(i)?, key)? else {
                    return Ok(None);
                };
                self.fix_child(&page, i, child)?
            }
        };
        self.retire(page_num);
        Ok(Some(updated))
    }

    /// Rebuilds `parent` around its updated `i`th child, dropping the child
    /// if it became empty, or merging it with a sibling if it underflowed.
    fn fix_child(&mut self, parent: &Page, i: usize, child: PageBuf) -> Result<PageBuf> {
        if child.num_keys()? == 0 {
            return Ok(internal::replace_children(parent, i, 1, &[])?);
        }
        if child.num_bytes()? >= MERGE_THRESHOLD || parent.num_keys()? < 2 {
            let entries = self.write_split(child)?;
            return Ok(internal::replace_children(parent, i, 1, &entries)?);
        }

        // Prefer the left sibling.
        let (start, combined) = if i > 0 {
            let sibling_num = parent.child_page(i - 1)?;
            let sibling = self.read(sibling_num)?;
            self.retire(sibling_num);
            (i - 1, node::concat(&sibling, &child)?)
        } else {
            let sibling_num = parent.child_page(1)?;
            let sibling = self.read(sibling_num)?;
            self.retire(sibling_num);
            (0, node::concat(&child, &sibling)?)
        };
        let entries = self.write_split(combined)?;
        if entries.len() == 1 {
            log::debug!("merged children {start} and {}", start + 1);
        } else {
            log::debug!("rebalanced children {start} and {}", start + 1);
        }
        Ok(internal::replace_children(parent, start, 2, &entries)?)
    }

    /// Writes the updated root, and returns the new root page num.
    fn finish_root(&mut self, updated: PageBuf) -> Result<u64> {
        let n = updated.num_keys()?;
        if n == 0 {
            return self.write(PageBuf::empty_leaf()?.finish()?);
        }
        if updated.node_type()? == NodeType::Internal && n == 1 {
            let mut page_num = codec::get_child_pointer(&updated, 0)?;
            loop {
                let page = self.read(page_num)?;
                if page.node_type()? != NodeType::Internal || page.num_keys()? != 1 {
                    break;
                }
                self.retire(page_num);
                page_num = page.child_page(0)?;
            }
            log::debug!("collapsed root into page {page_num}");
            return Ok(page_num);
        }

        let entries = self.write_split(updated)?;
        if let [entry] = entries.as_slice() {
            return Ok(entry.page_num);
        }
        log::debug!("root split into {} pages, growing the tree", entries.len());
        let root = internal::new_root(&entries)?.finish()?;
        self.write(root)
    }
}

/// An in-order iterator over a tree, yielding owned key-value pairs.
///
/// Each item is a `Result`, since every step may read a page from the store.
/// The iterator ends after the first error.
pub struct InOrder<'s, S: PageStore> {
    store: &'s S,
    // The root and start bound, until the first call to `next` seeks them.
    seek: Option<(u64, Bound<Vec<u8>>)>,
    stack: Vec<(Page, usize)>,
    end: Bound<Vec<u8>>,
}

impl<S: PageStore> InOrder<'_, S> {
    /// Descends to the first key within `start`, leaving the path on the
    /// stack.
    fn seek(&mut self, root: u64, start: &Bound<Vec<u8>>) -> Result<()> {
        let mut page = self.store.read_page(root)?;
        loop {
            match page.node_type()? {
                NodeType::Internal => {
                    let i = match start {
                        Bound::Included(key) | Bound::Excluded(key) => {
                            internal::find(&page, key)?
                        }
                        Bound::Unbounded => 0,
                    };
                    let child = self.store.read_page(page.child_page(i)?)?;
                    self.stack.push((page, i + 1));
                    page = child;
                }
                NodeType::Leaf => {
                    let i = match start {
                        Bound::Included(key) => match leaf::find(&page, key)? {
                            Slot::Found(i) | Slot::Vacant(i) => i,
                        },
                        Bound::Excluded(key) => match leaf::find(&page, key)? {
                            Slot::Found(i) => i + 1,
                            Slot::Vacant(i) => i,
                        },
                        Bound::Unbounded => 0,
                    };
                    self.stack.push((page, i));
                    return Ok(());
                }
            }
        }
    }

    fn advance(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        while let Some((page, i)) = self.stack.pop() {
            if i >= page.num_keys()? {
                continue;
            }
            match page.node_type()? {
                NodeType::Leaf => {
                    let key = page.key(i)?;
                    let past_end = match &self.end {
                        Bound::Included(end) => key > end.as_slice(),
                        Bound::Excluded(end) => key >= end.as_slice(),
                        Bound::Unbounded => false,
                    };
                    if past_end {
                        self.stack.clear();
                        return Ok(None);
                    }
                    let item = (key.to_vec(), page.value(i)?.to_vec());
                    self.stack.push((page, i + 1));
                    return Ok(Some(item));
                }
                NodeType::Internal => {
                    let child = self.store.read_page(page.child_page(i)?)?;
                    self.stack.push((page, i + 1));
                    self.stack.push((child, 0));
                }
            }
        }
        Ok(None)
    }
}

impl<S: PageStore> Iterator for InOrder<'_, S> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((root, start)) = self.seek.take() {
            if let Err(err) = self.seek(root, &start) {
                self.stack.clear();
                return Some(Err(err));
            }
        }
        match self.advance() {
            Ok(item) => item.map(Ok),
            Err(err) => {
                self.stack.clear();
                Some(Err(err))
            }
        }
    }
}
