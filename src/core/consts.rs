//! Constants related to memory page size and offsets.

/// Size of a B+ tree node page.
// 4KB
pub const PAGE_SIZE: usize = 4096;

/// The maximum allowed key size in a tree.
pub const MAX_KEY_SIZE: usize = 1000;
/// The maximum allowed value size in a tree.
pub const MAX_VALUE_SIZE: usize = 3000;

/// Size of the node header: `type` (2B) + `nkeys` (2B).
pub(crate) const HEADER_SIZE: usize = 4;
/// Size of a child pointer.
pub(crate) const POINTER_SIZE: usize = 8;
/// Size of a stored KV offset.
pub(crate) const OFFSET_SIZE: usize = 2;
/// Size of the `key_size` + `val_size` prefix of a KV pair.
pub(crate) const KV_HEADER_SIZE: usize = 4;

/// Capacity of the scratch buffer a node is built in before it is split
/// into pages.
pub(crate) const SCRATCH_SIZE: usize = 2 * PAGE_SIZE;

/// A node smaller than this after a delete is merged with (or rebalanced
/// against) a sibling.
pub(crate) const MERGE_THRESHOLD: usize = PAGE_SIZE / 2;

/// Bytes taken up by one entry of a node, excluding the header.
pub(crate) const fn entry_size(key_len: usize, val_len: usize) -> usize {
    POINTER_SIZE + OFFSET_SIZE + KV_HEADER_SIZE + key_len + val_len
}

const _: () = {
    assert!(SCRATCH_SIZE <= (1 << 16), "offsets are within 16 bits");
    assert!(
        HEADER_SIZE + entry_size(MAX_KEY_SIZE, MAX_VALUE_SIZE) < PAGE_SIZE,
        "a key-value pair of max size cannot fit into a node page"
    );
    assert!(
        PAGE_SIZE + entry_size(MAX_KEY_SIZE, MAX_VALUE_SIZE) <= SCRATCH_SIZE,
        "a full leaf plus a max size key-value pair cannot fit into scratch"
    );
    assert!(
        PAGE_SIZE + 3 * entry_size(MAX_KEY_SIZE, 0) <= SCRATCH_SIZE,
        "a full internal node plus 3 max size keys cannot fit into scratch"
    );
};
