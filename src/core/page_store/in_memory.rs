use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::core::error::PageError;
use crate::core::page::Page;
use crate::core::page_store::PageStore;

type Result<T> = std::result::Result<T, PageError>;

/// An in-memory store of pages. Backed by a hash map.
///
/// Freed pages are not dropped right away. They are kept pending until
/// [`InMemory::reclaim`] is called, which the owner does once no reader can
/// still traverse to them from an older root.
#[derive(Clone, Default)]
pub struct InMemory {
    state: Arc<Mutex<InMemoryState>>,
}

#[derive(Default)]
struct InMemoryState {
    counter: u64,
    pages: HashMap<u64, Page>,
    // Pages that were marked free but may still be read.
    pending: Vec<u64>,
}

impl InMemory {
    /// Creates a new in-memory page store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops all pages marked free so far and returns how many there were.
    pub fn reclaim(&self) -> usize {
        let mut guard = self.lock();
        let pending = std::mem::take(&mut guard.pending);
        for page_num in &pending {
            guard.pages.remove(page_num);
        }
        log::trace!("reclaimed {} pages", pending.len());
        pending.len()
    }

    /// Gets the number of stored pages, including ones pending reclamation.
    pub fn num_pages(&self) -> usize {
        self.lock().pages.len()
    }

    /// Gets the number of pages marked free but not yet reclaimed.
    pub fn num_pending(&self) -> usize {
        self.lock().pending.len()
    }
}

impl PageStore for InMemory {
    fn read_page(&self, page_num: u64) -> Result<Page> {
        self.lock()
            .pages
            .get(&page_num)
            .cloned()
            .ok_or(PageError::NotFound(page_num))
    }

    fn write_page(&self, page: Page) -> Result<u64> {
        let mut guard = self.lock();
        let page_num = guard.counter;
        guard.counter += 1;
        guard.pages.insert(page_num, page);
        Ok(page_num)
    }

    fn mark_free(&self, page_num: u64) {
        let mut guard = self.lock();
        debug_assert!(guard.pages.contains_key(&page_num));
        debug_assert!(!guard.pending.contains(&page_num), "double free");
        guard.pending.push(page_num);
    }
}

#[cfg(test)]
mod tests {
    use crate::core::header::NodeType;
    use crate::core::page::PageBuf;

    use super::*;

    #[test]
    fn functional_test() {
        let store = InMemory::new();
        assert!(
            matches!(store.read_page(0), Err(PageError::NotFound(0))),
            "page 0 should not yet exist"
        );
        let page = PageBuf::new(NodeType::Leaf, 0).unwrap().finish().unwrap();
        let page_num = store.write_page(page.clone()).unwrap();
        assert_eq!(store.read_page(page_num).unwrap(), page);
        assert_eq!(store.num_pages(), 1);

        // Freed pages stay readable until reclaimed.
        store.mark_free(page_num);
        assert_eq!(store.num_pending(), 1);
        assert_eq!(store.read_page(page_num).unwrap(), page);
        assert_eq!(store.reclaim(), 1);
        assert_eq!(store.num_pending(), 0);
        assert_eq!(store.num_pages(), 0);
        assert!(matches!(
            store.read_page(page_num),
            Err(PageError::NotFound(_))
        ));
    }

    #[test]
    fn page_nums_are_fresh() {
        let store = InMemory::new();
        let page = PageBuf::empty_leaf().unwrap().finish().unwrap();
        let a = store.write_page(page.clone()).unwrap();
        store.mark_free(a);
        store.reclaim();
        let b = store.write_page(page).unwrap();
        assert_ne!(a, b);
    }
}
