//! Algorithms over B+ tree nodes.
//!
//! # Node format
//!
//! Here is our node format. The 2nd row is the encoded field size in bytes.
//!
//! ```ignore
//! | type | nkeys |  pointers  |  offsets   | key-values | unused |
//! |  2B  |   2B  | nkeys × 8B | nkeys × 2B |     ...    |        |
//! ```
//!
//! The format starts with a 4-bytes header:
//!
//! * `type` is the node type (leaf or internal).
//! * `nkeys` is the number of keys (and the number of child pointers).
//!
//! Then an array of child pointers and the KV pairs follow. Leaf and internal
//! nodes share the same layout, so that one set of routines can copy entries
//! of either. Pointers of a leaf are unused, as are the values of an internal
//! node.
//!
//! Each KV pair is prefixed by its size. For internal nodes, the value size
//! is 0.
//!
//! ```ignore
//! | key_size | val_size | key | val |
//! |    2B    |    2B    | ... | ... |
//! ```
//!
//! The encoded KV pairs are concatenated. To find the `n`th KV pair, we would
//! have to read all previous pairs. This is avoided by storing the offset of
//! each KV pair. The offset of the first KV pair is always 0, so it's not
//! stored; the last offset is the end of the last pair, which gives the size
//! of the node.
//!
//! # A range is divided into subranges by keys
//!
//! Keys in an internal node indicate the range of each child. Each key
//! represents the start of the subrange of its child, e.g. node `["p", "q"]`
//! divides its range `[p, z)` into 2 subranges: `[p, q)` and `[q, z)`.
//! The 1st key of an internal node is redundant, because the range start is
//! inherited from the parent node; a lookup of a key smaller than it still
//! goes to the 1st child.
//!
//! # Splitting
//!
//! A modified node is first built in a scratch buffer that may overflow a
//! page. [`split`] then cuts it into pages. Because KV pairs vary in size,
//! the cut points are chosen by scanning the byte size of each prefix rather
//! than by counting keys. Two halves normally suffice; three are needed when
//! a large pair in the middle cannot go to either side.

pub(crate) mod internal;
pub(crate) mod leaf;

use crate::core::codec;
use crate::core::consts::PAGE_SIZE;
use crate::core::error::NodeError;
use crate::core::header;
use crate::core::page::{Page, PageBuf};

type Result<T> = std::result::Result<T, NodeError>;

/// Splits a (possibly overflowed) node into 1 to 3 pages, keeping entries
/// contiguous and in order.
pub fn split(node: PageBuf) -> Result<Vec<Page>> {
    let n = node.num_keys()?;
    let num_bytes = node.num_bytes()?;
    if num_bytes <= PAGE_SIZE {
        return Ok(vec![node.finish()?]);
    }

    let mut points = vec![0];
    split_points(&node, 0, n, &mut points)?;
    points.push(n);
    if points.len() > 3 {
        log::debug!(
            "split node of {num_bytes} bytes and {n} keys into {} pages",
            points.len() - 1
        );
    }
    debug_assert!(points.len() <= 4, "split into more than 3 pages");

    let node_type = node.node_type()?;
    points
        .windows(2)
        .map(|w| {
            let (start, end) = (w[0], w[1]);
            let mut page = PageBuf::new(node_type, end - start)?;
            codec::append_range(&mut page, &node, 0, start, end - start)?;
            page.finish()
        })
        .collect()
}

/// Finds the split points of entries `[start, end)` such that every part
/// fits in a page.
fn split_points(node: &[u8], start: usize, end: usize, points: &mut Vec<usize>) -> Result<()> {
    if codec::get_range_bytes(node, start, end)? <= PAGE_SIZE {
        return Ok(());
    }

    // Prefer the most balanced split into two.
    let mut best: Option<(usize, usize)> = None;
    for at in start + 1..end {
        let left = codec::get_range_bytes(node, start, at)?;
        let right = codec::get_range_bytes(node, at, end)?;
        if left > PAGE_SIZE {
            break;
        }
        if right > PAGE_SIZE {
            continue;
        }
        let skew = left.abs_diff(right);
        if best.is_none_or(|(_, best_skew)| skew < best_skew) {
            best = Some((at, skew));
        }
    }
    if let Some((at, _)) = best {
        points.push(at);
        return Ok(());
    }

    // Otherwise, fill the left page and split the rest.
    let mut at = start + 1;
    while at < end && codec::get_range_bytes(node, start, at + 1)? <= PAGE_SIZE {
        at += 1;
    }
    if at == end || codec::get_range_bytes(node, start, at)? > PAGE_SIZE {
        return Err(NodeError::Overflow(codec::get_range_bytes(node, start, at)?));
    }
    points.push(at);
    split_points(node, at, end, points)
}

/// Concatenates two sibling nodes of the same type into one scratch node,
/// which [`split`] turns into either a merged node, or two rebalanced ones.
pub fn concat(left: &[u8], right: &[u8]) -> Result<PageBuf> {
    let node_type = header::get_node_type(left)?;
    let right_type = header::get_node_type(right)?;
    if node_type != right_type {
        return Err(NodeError::UnexpectedNodeType(right_type as u16));
    }
    let (left_n, right_n) = (header::get_num_keys(left)?, header::get_num_keys(right)?);
    let mut node = PageBuf::new(node_type, left_n + right_n)?;
    codec::append_range(&mut node, left, 0, 0, left_n)?;
    codec::append_range(&mut node, right, left_n, 0, right_n)?;
    Ok(node)
}
