//! An internal node maps each of its keys to a child page. The `i`th key is
//! the first key of the `i`th child's subtree.

use crate::core::codec;
use crate::core::error::NodeError;
use crate::core::header::{self, NodeType};
use crate::core::page::PageBuf;

type Result<T> = std::result::Result<T, NodeError>;

/// A child link to write into an internal node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub key: Vec<u8>,
    pub page_num: u64,
}

/// Finds the index of the child whose subtree covers `key`.
pub fn find(page: &[u8], key: &[u8]) -> Result<usize> {
    debug_assert_eq!(header::get_node_type(page)?, NodeType::Internal);
    codec::lookup_floor(page, key)
}

/// Replaces the `n_old` links starting at `i` with `entries`.
///
/// This covers every way a child changes: an updated child (1 for 1), a
/// split child (1 for 2 or 3), a merged pair (2 for 1), a rebalanced pair
/// (2 for 2), and an emptied child (1 for 0).
pub fn replace_children(
    old: &[u8],
    i: usize,
    n_old: usize,
    entries: &[ChildEntry],
) -> Result<PageBuf> {
    let n = header::get_num_keys(old)?;
    if i + n_old > n {
        return Err(NodeError::IndexOutOfRange { i: i + n_old, n });
    }
    let new_n = n - n_old + entries.len();
    let mut new = PageBuf::new(NodeType::Internal, new_n)?;
    codec::append_range(&mut new, old, 0, 0, i)?;
    for (j, entry) in entries.iter().enumerate() {
        codec::append_kv(&mut new, i + j, entry.page_num, &entry.key, &[])?;
    }
    codec::append_range(&mut new, old, i + entries.len(), i + n_old, n - i - n_old)?;
    Ok(new)
}

/// Creates a new root over the pages a former root split into.
pub fn new_root(entries: &[ChildEntry]) -> Result<PageBuf> {
    let mut new = PageBuf::new(NodeType::Internal, entries.len())?;
    for (i, entry) in entries.iter().enumerate() {
        codec::append_kv(&mut new, i, entry.page_num, &entry.key, &[])?;
    }
    Ok(new)
}

#[cfg(test)]
mod tests {
    use crate::core::page::Page;

    use super::*;

    fn entry(key: &[u8], page_num: u64) -> ChildEntry {
        ChildEntry {
            key: key.to_vec(),
            page_num,
        }
    }

    fn build(entries: &[ChildEntry]) -> Page {
        new_root(entries).unwrap().finish().unwrap()
    }

    fn links(page: &Page) -> Vec<(Vec<u8>, u64)> {
        (0..page.num_keys().unwrap())
            .map(|i| (page.key(i).unwrap().to_vec(), page.child_page(i).unwrap()))
            .collect()
    }

    #[test]
    fn parent_of_split() {
        let parent = build(&[entry(b"a", 1), entry(b"m", 2)]);
        assert_eq!(parent.node_type().unwrap(), NodeType::Internal);
        assert_eq!(links(&parent), vec![(b"a".to_vec(), 1), (b"m".to_vec(), 2)]);
        assert_eq!(parent.value(1).unwrap(), b"");
    }

    #[test]
    fn replace_children_update() {
        let old = build(&[entry(b"a", 1), entry(b"m", 2), entry(b"t", 3)]);
        let new = replace_children(&old, 1, 1, &[entry(b"m", 9)])
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(
            links(&new),
            vec![(b"a".to_vec(), 1), (b"m".to_vec(), 9), (b"t".to_vec(), 3)]
        );
    }

    #[test]
    fn replace_children_split() {
        let old = build(&[entry(b"a", 1), entry(b"m", 2)]);
        let new = replace_children(&old, 0, 1, &[entry(b"a", 5), entry(b"f", 6)])
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(
            links(&new),
            vec![(b"a".to_vec(), 5), (b"f".to_vec(), 6), (b"m".to_vec(), 2)]
        );
    }

    #[test]
    fn replace_children_merge() {
        let old = build(&[entry(b"a", 1), entry(b"m", 2), entry(b"t", 3)]);
        let new = replace_children(&old, 1, 2, &[entry(b"m", 7)])
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(links(&new), vec![(b"a".to_vec(), 1), (b"m".to_vec(), 7)]);
    }

    #[test]
    fn replace_children_remove() {
        let old = build(&[entry(b"a", 1), entry(b"m", 2)]);
        let new = replace_children(&old, 0, 1, &[]).unwrap().finish().unwrap();
        assert_eq!(links(&new), vec![(b"m".to_vec(), 2)]);
    }

    #[test]
    fn replace_children_out_of_range() {
        let old = build(&[entry(b"a", 1)]);
        assert!(matches!(
            replace_children(&old, 0, 2, &[]),
            Err(NodeError::IndexOutOfRange { i: 2, n: 1 })
        ));
    }

    #[test]
    fn find() {
        let node = build(&[entry(b"b", 1), entry(b"d", 2), entry(b"f", 3)]);
        assert_eq!(super::find(&node, b"a").unwrap(), 0);
        assert_eq!(super::find(&node, b"b").unwrap(), 0);
        assert_eq!(super::find(&node, b"c").unwrap(), 0);
        assert_eq!(super::find(&node, b"d").unwrap(), 1);
        assert_eq!(super::find(&node, b"e").unwrap(), 1);
        assert_eq!(super::find(&node, b"z").unwrap(), 2);
    }
}
