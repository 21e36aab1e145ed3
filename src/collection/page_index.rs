//! Page Index
//!
//! Directory of the pages a collection places documents into. Cloning copies
//! the entries only, never page contents, so a transaction can extend its
//! own copy while readers keep using the published one.
//!
//! ```text
//!  published:  [ A used=900 ][ B used=300 ]
//!  tx clone:   [ A used=900 ][ B used=700 ][ C used=200 ]   (private)
//! ```
//! Readers of the published index never look past `used`, so bytes the
//! clone writes beyond it stay invisible until the clone is published.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::storage::{Page, PageStore};

/// One page reserved for document placement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub offset: u64,
    pub size: u64,
    /// Bytes filled with document envelopes
    pub used: u64,
    /// Key of the first document placed in the page, 0 while empty
    pub first_key: u64,
}

impl IndexEntry {
    pub fn page(&self) -> Page {
        Page::new(self.offset, self.size)
    }

    /// Bytes still free in the page
    pub fn remaining(&self) -> u64 {
        self.size - self.used
    }
}

/// Ordered, copy-on-write page directory
#[derive(Clone)]
pub struct PageIndex {
    store: Arc<PageStore>,

    /// Smallest page requested for a new entry
    initial_page_size: u64,

    entries: Vec<IndexEntry>,
}

impl PageIndex {
    pub fn new(store: Arc<PageStore>, initial_page_size: u64) -> Self {
        Self {
            store,
            initial_page_size,
            entries: Vec::new(),
        }
    }

    /// Get an entry with room for `min_size` more bytes
    ///
    /// The last entry is reused while it has room; otherwise a page of at
    /// least `max(min_size, initial_page_size)` bytes is allocated and
    /// appended as a fresh entry.
    pub fn get_entry_for_insert(&mut self, min_size: u64) -> Result<&mut IndexEntry> {
        let fits = self
            .entries
            .last()
            .map_or(false, |entry| entry.used + min_size <= entry.size);

        if !fits {
            let page = self
                .store
                .allocate(min_size.max(self.initial_page_size))?;
            debug!(offset = page.offset, size = page.size, "reserved index page");
            self.entries.push(IndexEntry {
                offset: page.offset,
                size: page.size,
                used: 0,
                first_key: 0,
            });
        }

        let last = self.entries.len() - 1;
        Ok(&mut self.entries[last])
    }

    /// Find the entry whose key range covers `key`
    pub fn locate(&self, key: u64) -> Option<&IndexEntry> {
        let end = self
            .entries
            .partition_point(|entry| entry.first_key != 0 && entry.first_key <= key);
        end.checked_sub(1).map(|index| &self.entries[index])
    }

    /// Free the pages of entries appended after the first `base_len`
    ///
    /// Returns how many pages were released.
    pub fn release_new_pages(&self, base_len: usize) -> usize {
        let fresh = self.entries.get(base_len..).unwrap_or(&[]);
        for entry in fresh {
            self.store.free(entry.page());
        }
        fresh.len()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the bytes of document envelopes across all pages
    pub fn bytes_used(&self) -> u64 {
        self.entries.iter().map(|entry| entry.used).sum()
    }

    pub(crate) fn store(&self) -> &Arc<PageStore> {
        &self.store
    }
}

impl fmt::Debug for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageIndex")
            .field("initial_page_size", &self.initial_page_size)
            .field("entries", &self.entries)
            .finish()
    }
}
