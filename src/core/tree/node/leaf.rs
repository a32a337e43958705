//! A leaf node holds a sub-range of key-value pairs of the B+ tree.
//! All key-values of the tree are stored in one or more leaf nodes.
//!
//! The tree is initialized as an empty leaf node.
//!
//! Every operation here builds a new node from the old one with
//! [`codec::append_range`], leaving the old node untouched.

use std::cmp::Ordering;

use crate::core::codec;
use crate::core::error::NodeError;
use crate::core::header::{self, NodeType};
use crate::core::page::PageBuf;

type Result<T> = std::result::Result<T, NodeError>;

/// Where a key lives, or would live, in a leaf.
#[derive(Debug, PartialEq, Eq)]
pub enum Slot {
    /// The key is the `i`th key.
    Found(usize),
    /// The key is absent, and would be inserted as the `i`th key.
    Vacant(usize),
}

/// Finds the slot of a key.
pub fn find(page: &[u8], key: &[u8]) -> Result<Slot> {
    debug_assert_eq!(header::get_node_type(page)?, NodeType::Leaf);
    if header::get_num_keys(page)? == 0 {
        return Ok(Slot::Vacant(0));
    }
    let i = codec::lookup_floor(page, key)?;
    Ok(match codec::get_key(page, i)?.cmp(key) {
        Ordering::Equal => Slot::Found(i),
        Ordering::Less => Slot::Vacant(i + 1),
        // Only when key is smaller than every key, i.e. i == 0.
        Ordering::Greater => Slot::Vacant(i),
    })
}

/// Gets the value corresponding to the queried key.
pub fn get<'a>(page: &'a [u8], key: &[u8]) -> Result<Option<&'a [u8]>> {
    match find(page, key)? {
        Slot::Found(i) => Ok(Some(codec::get_value(page, i)?)),
        Slot::Vacant(_) => Ok(None),
    }
}

/// Inserts the key-value pair, or updates the value if the key exists.
pub fn upsert(old: &[u8], key: &[u8], val: &[u8]) -> Result<PageBuf> {
    match find(old, key)? {
        Slot::Found(i) => update(old, i, key, val),
        Slot::Vacant(i) => insert(old, i, key, val),
    }
}

/// Inserts a key-value pair as the `i`th pair.
pub fn insert(old: &[u8], i: usize, key: &[u8], val: &[u8]) -> Result<PageBuf> {
    let n = header::get_num_keys(old)?;
    if i > n {
        return Err(NodeError::IndexOutOfRange { i, n: n + 1 });
    }
    let mut new = PageBuf::new(NodeType::Leaf, n + 1)?;
    codec::append_range(&mut new, old, 0, 0, i)?;
    codec::append_kv(&mut new, i, 0, key, val)?;
    codec::append_range(&mut new, old, i + 1, i, n - i)?;
    Ok(new)
}

/// Replaces the `i`th pair.
pub fn update(old: &[u8], i: usize, key: &[u8], val: &[u8]) -> Result<PageBuf> {
    let n = header::get_num_keys(old)?;
    if i >= n {
        return Err(NodeError::IndexOutOfRange { i, n });
    }
    let mut new = PageBuf::new(NodeType::Leaf, n)?;
    codec::append_range(&mut new, old, 0, 0, i)?;
    codec::append_kv(&mut new, i, 0, key, val)?;
    codec::append_range(&mut new, old, i + 1, i + 1, n - i - 1)?;
    Ok(new)
}

/// Removes the `i`th pair.
pub fn delete(old: &[u8], i: usize) -> Result<PageBuf> {
    let n = header::get_num_keys(old)?;
    if i >= n {
        return Err(NodeError::IndexOutOfRange { i, n });
    }
    let mut new = PageBuf::new(NodeType::Leaf, n - 1)?;
    codec::append_range(&mut new, old, 0, 0, i)?;
    codec::append_range(&mut new, old, i, i + 1, n - i - 1)?;
    Ok(new)
}

#[cfg(test)]
mod tests {
    use crate::core::consts::{MAX_KEY_SIZE, MAX_VALUE_SIZE, PAGE_SIZE};
    use crate::core::page::Page;

    use super::*;

    fn build(kvs: &[(&[u8], &[u8])]) -> Page {
        let mut b = PageBuf::new(NodeType::Leaf, kvs.len()).unwrap();
        for (i, (k, v)) in kvs.iter().enumerate() {
            codec::append_kv(&mut b, i, 0, k, v).unwrap();
        }
        b.finish().unwrap()
    }

    fn pairs(page: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        (0..header::get_num_keys(page).unwrap())
            .map(|i| {
                (
                    codec::get_key(page, i).unwrap().to_vec(),
                    codec::get_value(page, i).unwrap().to_vec(),
                )
            })
            .collect()
    }

    fn owned(kvs: &[(&[u8], &[u8])]) -> Vec<(Vec<u8>, Vec<u8>)> {
        kvs.iter().map(|(k, v)| (k.to_vec(), v.to_vec())).collect()
    }

    #[test]
    fn find_slots() {
        let leaf = build(&[(b"b", b"1"), (b"d", b"2")]);
        assert_eq!(find(&leaf, b"a").unwrap(), Slot::Vacant(0));
        assert_eq!(find(&leaf, b"b").unwrap(), Slot::Found(0));
        assert_eq!(find(&leaf, b"c").unwrap(), Slot::Vacant(1));
        assert_eq!(find(&leaf, b"d").unwrap(), Slot::Found(1));
        assert_eq!(find(&leaf, b"e").unwrap(), Slot::Vacant(2));
        assert_eq!(find(&build(&[]), b"a").unwrap(), Slot::Vacant(0));
    }

    #[test]
    fn test_find_some() {
        let leaf = build(&[(b"key", b"val")]);
        assert!(matches!(get(&leaf, b"key").unwrap(), Some(v) if v == b"val"));
    }

    #[test]
    fn test_find_none() {
        let leaf = build(&[]);
        assert!(get(&leaf, b"key").unwrap().is_none());
    }

    #[test]
    fn test_insert_intact() {
        let leaf = build(&[(b"a", b"1"), (b"c", b"3")]);
        let new = upsert(&leaf, b"b", b"2").unwrap().finish().unwrap();
        assert_eq!(
            pairs(&new),
            owned(&[(b"a", b"1"), (b"b", b"2"), (b"c", b"3")])
        );
        // The old leaf is untouched.
        assert_eq!(pairs(&leaf), owned(&[(b"a", b"1"), (b"c", b"3")]));
    }

    #[test]
    fn test_insert_at_ends() {
        let leaf = build(&[(b"b", b"2")]);
        let new = upsert(&leaf, b"a", b"1").unwrap().finish().unwrap();
        let new = upsert(&new, b"c", b"3").unwrap().finish().unwrap();
        assert_eq!(
            pairs(&new),
            owned(&[(b"a", b"1"), (b"b", b"2"), (b"c", b"3")])
        );
    }

    #[test]
    fn test_update_intact() {
        let leaf = build(&[(b"key1", b"val1"), (b"key2", b"val2")]);
        let new = upsert(&leaf, b"key1", b"val1_new").unwrap().finish().unwrap();
        assert_eq!(
            pairs(&new),
            owned(&[(b"key1", b"val1_new"), (b"key2", b"val2")])
        );
    }

    #[test]
    fn test_insert_overflow() {
        let leaf = build(&[(&[1; MAX_KEY_SIZE], &[1; MAX_VALUE_SIZE])]);
        let new = upsert(&leaf, &[2; MAX_KEY_SIZE], &[2; MAX_VALUE_SIZE]).unwrap();
        assert!(new.num_bytes().unwrap() > PAGE_SIZE);
        assert_eq!(new.num_keys().unwrap(), 2);
    }

    #[test]
    fn test_delete_intact() {
        let leaf = build(&[(b"key1", b"val1"), (b"key2", b"val2")]);
        let new = delete(&leaf, 0).unwrap().finish().unwrap();
        assert_eq!(pairs(&new), owned(&[(b"key2", b"val2")]));
    }

    #[test]
    fn test_delete_empty() {
        let leaf = build(&[(b"key", b"val")]);
        let new = delete(&leaf, 0).unwrap();
        assert_eq!(new.num_keys().unwrap(), 0);
    }

    #[test]
    fn test_out_of_range() {
        let leaf = build(&[(b"key", b"val")]);
        assert!(matches!(
            delete(&leaf, 1),
            Err(NodeError::IndexOutOfRange { i: 1, n: 1 })
        ));
        assert!(matches!(
            update(&leaf, 1, b"k", b"v"),
            Err(NodeError::IndexOutOfRange { i: 1, n: 1 })
        ));
        assert!(matches!(
            insert(&leaf, 2, b"k", b"v"),
            Err(NodeError::IndexOutOfRange { i: 2, n: 2 })
        ));
    }
}
