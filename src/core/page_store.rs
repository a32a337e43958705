//! [`PageStore`] is the capability a host hands to a
//! [`crate::core::tree::Tree`] to dereference, allocate, and free pages.
//!
//! The store owns the mapping from page numbers to bytes. The tree never
//! mutates a page it has written: every modification allocates new pages,
//! and the pages it replaced are reported through [`PageStore::mark_free`].
//! A page marked free may still be reachable from an older root that some
//! reader holds, so it is up to the store to delay reusing it until no such
//! reader is left.

mod in_memory;

pub use in_memory::InMemory;

use crate::core::error::PageError;
use crate::core::page::Page;

/// A store of pages that backs a COW B+ Tree.
pub trait PageStore {
    /// Reads the page previously written at `page_num`.
    fn read_page(&self, page_num: u64) -> Result<Page, PageError>;

    /// Writes a page and returns its (fresh or reused) page number.
    fn write_page(&self, page: Page) -> Result<u64, PageError>;

    /// Marks a page as no longer reachable from the newest root.
    fn mark_free(&self, page_num: u64);
}
