//! Byte-level accessors of the node format.
//!
//! ```ignore
//! | type | nkeys |  pointers  |  offsets   | key-values | unused |
//! |  2B  |   2B  | nkeys × 8B | nkeys × 2B |     ...    |        |
//! ```
//!
//! Leaf and internal nodes share this layout. Leaves leave their pointers
//! zeroed, and internal nodes store an empty value for every key.
//!
//! ```ignore
//! | key_size | val_size | key | val |
//! |    2B    |    2B    | ... | ... |
//! ```
//!
//! The offset of the 1st KV pair is always 0, so it's not stored. The `i`th
//! stored offset is the end of the `i`th KV pair (i.e. the start of the
//! `i+1`th), relative to the start of the key-values.
//!
//! All integers are little-endian. Every accessor is bounds-checked against
//! both the header and the buffer, so a corrupt page surfaces as an error
//! instead of a panic.

use std::cmp::Ordering;

use crate::core::consts::{HEADER_SIZE, KV_HEADER_SIZE, OFFSET_SIZE, POINTER_SIZE};
use crate::core::error::NodeError;
use crate::core::header;

type Result<T> = std::result::Result<T, NodeError>;

fn bytes(page: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    page.get(pos..pos + len).ok_or(NodeError::OutOfBounds {
        pos,
        len,
        cap: page.len(),
    })
}

fn bytes_mut(page: &mut [u8], pos: usize, len: usize) -> Result<&mut [u8]> {
    let cap = page.len();
    page.get_mut(pos..pos + len)
        .ok_or(NodeError::OutOfBounds { pos, len, cap })
}

fn read_u16(page: &[u8], pos: usize) -> Result<usize> {
    let b = bytes(page, pos, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]) as usize)
}

fn write_u16(page: &mut [u8], pos: usize, v: usize) -> Result<()> {
    let v = u16::try_from(v).map_err(|_| NodeError::Overflow(v))?;
    bytes_mut(page, pos, 2)?.copy_from_slice(&v.to_le_bytes());
    Ok(())
}

#[inline]
fn check_index(i: usize, n: usize) -> Result<()> {
    if i >= n {
        return Err(NodeError::IndexOutOfRange { i, n });
    }
    Ok(())
}

/// Position of the `i`th stored offset (`1 <= i <= n`).
#[inline]
fn offset_pos(n: usize, i: usize) -> usize {
    HEADER_SIZE + POINTER_SIZE * n + OFFSET_SIZE * (i - 1)
}

/// Gets the `i`th child pointer.
pub fn get_child_pointer(page: &[u8], i: usize) -> Result<u64> {
    check_index(i, header::get_num_keys(page)?)?;
    let mut b = [0u8; POINTER_SIZE];
    b.copy_from_slice(bytes(page, HEADER_SIZE + POINTER_SIZE * i, POINTER_SIZE)?);
    Ok(u64::from_le_bytes(b))
}

/// Sets the `i`th child pointer.
pub fn set_child_pointer(page: &mut [u8], i: usize, page_num: u64) -> Result<()> {
    check_index(i, header::get_num_keys(page)?)?;
    bytes_mut(page, HEADER_SIZE + POINTER_SIZE * i, POINTER_SIZE)?
        .copy_from_slice(&page_num.to_le_bytes());
    Ok(())
}

/// Gets the `i`th offset value. The 0th offset is always 0.
pub fn get_offset(page: &[u8], i: usize) -> Result<usize> {
    if i == 0 {
        return Ok(0);
    }
    let n = header::get_num_keys(page)?;
    check_index(i, n + 1)?;
    read_u16(page, offset_pos(n, i))
}

/// Sets the `i`th offset value, where `1 <= i <= nkeys`.
pub fn set_offset(page: &mut [u8], i: usize, offset: usize) -> Result<()> {
    let n = header::get_num_keys(page)?;
    if i == 0 {
        return Err(NodeError::IndexOutOfRange { i, n });
    }
    check_index(i, n + 1)?;
    write_u16(page, offset_pos(n, i), offset)
}

/// Gets the position of the `i`th KV pair. `i == nkeys` is allowed, and is
/// the position right past the last KV pair.
pub fn get_kv_pos(page: &[u8], i: usize) -> Result<usize> {
    let n = header::get_num_keys(page)?;
    check_index(i, n + 1)?;
    Ok(HEADER_SIZE + (POINTER_SIZE + OFFSET_SIZE) * n + get_offset(page, i)?)
}

/// Gets the `i`th key.
pub fn get_key(page: &[u8], i: usize) -> Result<&[u8]> {
    check_index(i, header::get_num_keys(page)?)?;
    let pos = get_kv_pos(page, i)?;
    let key_len = read_u16(page, pos)?;
    bytes(page, pos + KV_HEADER_SIZE, key_len)
}

/// Gets the `i`th value.
pub fn get_value(page: &[u8], i: usize) -> Result<&[u8]> {
    check_index(i, header::get_num_keys(page)?)?;
    let pos = get_kv_pos(page, i)?;
    let key_len = read_u16(page, pos)?;
    let val_len = read_u16(page, pos + 2)?;
    bytes(page, pos + KV_HEADER_SIZE + key_len, val_len)
}

/// Gets the number of bytes taken up by the node.
pub fn get_num_bytes(page: &[u8]) -> Result<usize> {
    get_kv_pos(page, header::get_num_keys(page)?)
}

/// Gets the number of bytes the entries `[start, end)` would take up as a
/// node of their own.
pub fn get_range_bytes(page: &[u8], start: usize, end: usize) -> Result<usize> {
    debug_assert!(start <= end);
    let (begin, finish) = (get_offset(page, start)?, get_offset(page, end)?);
    let kv_bytes = finish.checked_sub(begin).ok_or_else(|| {
        NodeError::Corrupt(format!("offset {end} = {finish} precedes offset {start} = {begin}"))
    })?;
    Ok(HEADER_SIZE + (POINTER_SIZE + OFFSET_SIZE) * (end - start) + kv_bytes)
}

/// Writes the `i`th entry and sets the `i+1`th offset to the end of it.
/// All entries before `i` must already be written.
pub fn append_kv(page: &mut [u8], i: usize, page_num: u64, key: &[u8], val: &[u8]) -> Result<()> {
    set_child_pointer(page, i, page_num)?;
    let pos = get_kv_pos(page, i)?;
    let kv = bytes_mut(page, pos, KV_HEADER_SIZE + key.len() + val.len())?;
    kv[0..2].copy_from_slice(&(key.len() as u16).to_le_bytes());
    kv[2..4].copy_from_slice(&(val.len() as u16).to_le_bytes());
    kv[KV_HEADER_SIZE..KV_HEADER_SIZE + key.len()].copy_from_slice(key);
    kv[KV_HEADER_SIZE + key.len()..].copy_from_slice(val);
    let next_offset = get_offset(page, i)? + KV_HEADER_SIZE + key.len() + val.len();
    set_offset(page, i + 1, next_offset)
}

/// Copies `n` entries of `src` starting at `src_start` into `dst` starting at
/// `dst_start`. All entries of `dst` before `dst_start` must already be
/// written.
pub fn append_range(
    dst: &mut [u8],
    src: &[u8],
    dst_start: usize,
    src_start: usize,
    n: usize,
) -> Result<()> {
    if n == 0 {
        return Ok(());
    }
    check_index(src_start + n - 1, header::get_num_keys(src)?)?;
    check_index(dst_start + n - 1, header::get_num_keys(dst)?)?;

    for i in 0..n {
        set_child_pointer(dst, dst_start + i, get_child_pointer(src, src_start + i)?)?;
    }

    let dst_begin = get_offset(dst, dst_start)?;
    let src_begin = get_offset(src, src_start)?;
    for i in 1..=n {
        let src_offset = get_offset(src, src_start + i)?;
        let rel = src_offset.checked_sub(src_begin).ok_or_else(|| {
            NodeError::Corrupt(format!("offset {src_offset} precedes offset {src_begin}"))
        })?;
        set_offset(dst, dst_start + i, dst_begin + rel)?;
    }

    let begin = get_kv_pos(src, src_start)?;
    let end = get_kv_pos(src, src_start + n)?;
    let kvs = bytes(src, begin, end - begin)?;
    let pos = get_kv_pos(dst, dst_start)?;
    bytes_mut(dst, pos, end - begin)?.copy_from_slice(kvs);
    Ok(())
}

/// Finds the largest index `i` such that `key(i) <= key`, or 0 if there is
/// none. An exact match always wins.
pub fn lookup_floor(page: &[u8], key: &[u8]) -> Result<usize> {
    let (mut lo, mut hi) = (0, header::get_num_keys(page)?);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match get_key(page, mid)?.cmp(key) {
            Ordering::Equal => return Ok(mid),
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
        }
    }
    Ok(lo.saturating_sub(1))
}

/// Checks that the header, offsets and KV pairs of a node are consistent,
/// that keys are strictly increasing, and that the node fits in `cap` bytes.
pub fn validate(page: &[u8], cap: usize) -> Result<()> {
    header::get_node_type(page)?;
    let n = header::get_num_keys(page)?;
    let num_bytes = get_num_bytes(page)?;
    if num_bytes > cap {
        return Err(NodeError::Overflow(num_bytes));
    }
    let mut prev_key: Option<&[u8]> = None;
    for i in 0..n {
        let (begin, end) = (get_offset(page, i)?, get_offset(page, i + 1)?);
        let pos = get_kv_pos(page, i)?;
        let kv_len = KV_HEADER_SIZE + read_u16(page, pos)? + read_u16(page, pos + 2)?;
        if end < begin || end - begin != kv_len {
            return Err(NodeError::Corrupt(format!(
                "KV pair {i} spans offsets [{begin}, {end}) but is {kv_len} bytes"
            )));
        }
        let key = get_key(page, i)?;
        if prev_key.is_some_and(|prev| prev >= key) {
            return Err(NodeError::Corrupt(format!("key {i} is out of order")));
        }
        prev_key = Some(key);
    }
    Ok(())
}
