//! Append-only document collection
//!
//! ## Commit protocol
//!
//! ```text
//!  Started
//!     │  clone published PageIndex
//!     ▼
//!  Key-Resolution ──(unsupported / non-monotonic key)──┐
//!     │                                                 │
//!     ▼                                                 ▼
//!  Placement ───────(I/O or capacity failure)──────► Rollback
//!     │                                                 │ free clone's new pages
//!     ▼                                                 │
//!  Commit: swap index pointer, publish last key         │
//!     │                                                 │
//!     └──────────────────► Done ◄──────────────────────┘
//! ```
//!
//! ## Concurrency:
//! - `commit_lock`: at most one transaction resolves keys and places
//!   documents at a time
//! - `page_index`: `ArcSwap`, so readers load the published index without
//!   ever waiting for a commit, and a commit publishes with one atomic store
//! - `last_key`: written only while holding `commit_lock`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, StrataError};
use crate::schema::Schema;
use crate::storage::PageStore;

use super::{DocumentKey, IdSequence, PageIndex, Snapshot, Transaction, DOC_HEADER_SIZE};

/// Append-only set of keyed documents with transactional inserts
pub struct AoCollection {
    schema: Schema,

    store: Arc<PageStore>,

    /// Source of keys for unassigned documents
    seq: Box<dyn IdSequence>,

    /// Published page index
    page_index: ArcSwap<PageIndex>,

    /// Highest committed key
    last_key: AtomicU64,

    /// Serializes commits
    commit_lock: Mutex<()>,

    /// Serializes sync barriers
    sync_lock: Mutex<()>,
}

impl AoCollection {
    /// Default minimum size of a document page
    pub const DEFAULT_INITIAL_INDEX_PAGE_SIZE: u64 = 65535;

    /// Create an empty collection in `store`
    pub fn new(schema: Schema, store: Arc<PageStore>, seq: Box<dyn IdSequence>) -> Self {
        Self::with_index_page_size(schema, store, seq, Self::DEFAULT_INITIAL_INDEX_PAGE_SIZE)
    }

    /// Create an empty collection whose document pages are at least
    /// `initial_page_size` bytes
    pub fn with_index_page_size(
        schema: Schema,
        store: Arc<PageStore>,
        seq: Box<dyn IdSequence>,
        initial_page_size: u64,
    ) -> Self {
        let index = PageIndex::new(Arc::clone(&store), initial_page_size);
        Self {
            schema,
            store,
            seq,
            page_index: ArcSwap::from_pointee(index),
            last_key: AtomicU64::new(0),
            commit_lock: Mutex::new(()),
            sync_lock: Mutex::new(()),
        }
    }

    /// Start an empty transaction against this collection
    pub fn begin_transaction(&self) -> Transaction {
        Transaction::new()
    }

    /// Commit every dirty document of `tx`, all or nothing
    ///
    /// Returns the keys of the written documents in transaction order. On
    /// error nothing is published: the index readers see and the last
    /// committed key are exactly as before the call.
    pub fn commit_transaction(&self, tx: Transaction) -> Result<Vec<u64>> {
        let _commit = self.commit_lock.lock();

        let base = self.page_index.load_full();
        let mut index = PageIndex::clone(&base);
        let mut last_key = self.last_key.load(Ordering::Acquire);

        match self.place_all(&tx, &mut index, &mut last_key) {
            Ok(keys) => {
                if keys.is_empty() {
                    return Ok(keys);
                }

                self.page_index.store(Arc::new(index));
                self.last_key.store(last_key, Ordering::Release);

                debug!(
                    collection = self.schema.name(),
                    documents = keys.len(),
                    last_key,
                    "committed transaction"
                );
                Ok(keys)
            }
            Err(err) => {
                let released = index.release_new_pages(base.len());
                warn!(
                    collection = self.schema.name(),
                    error = %err,
                    released_pages = released,
                    "rolled back transaction"
                );
                Err(err)
            }
        }
    }

    /// Commit a single document with an auto-assigned key
    pub fn insert(&self, data: impl Into<Bytes>) -> Result<u64> {
        let mut tx = self.begin_transaction();
        tx.insert(data);
        let keys = self.commit_transaction(tx)?;
        keys.first().copied().ok_or(StrataError::EmptyDocument)
    }

    /// Flush completed commits to storage
    ///
    /// Does not block commits or index reads.
    pub fn sync(&self) -> Result<()> {
        let _sync = self.sync_lock.lock();

        self.store.sync()?;

        debug!(collection = self.schema.name(), "synced collection");
        Ok(())
    }

    /// Capture the published index for reading
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.page_index.load_full())
    }

    /// Get the published page index
    pub fn page_index(&self) -> Arc<PageIndex> {
        self.page_index.load_full()
    }

    /// Get the highest committed key (0 if nothing has been committed)
    pub fn last_assigned_key(&self) -> u64 {
        self.last_key.load(Ordering::Acquire)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Resolve and place every dirty document into `index`
    fn place_all(
        &self,
        tx: &Transaction,
        index: &mut PageIndex,
        last_key: &mut u64,
    ) -> Result<Vec<u64>> {
        let mut keys = Vec::with_capacity(tx.len());

        for document in tx.dirty_documents() {
            let key = self.resolve_key(document.key(), *last_key)?;
            self.append_document(index, key, document.scratchpad())?;
            *last_key = key;
            keys.push(key);
        }

        Ok(keys)
    }

    /// Resolve the key to write `key` under; integer 0 means unassigned
    fn resolve_key(&self, key: &DocumentKey, last_key: u64) -> Result<u64> {
        let Some(key) = key.int_key() else {
            return Err(StrataError::UnsupportedKey(format!(
                "{:?} in append-only collection",
                key
            )));
        };

        if key == 0 {
            let next = self.seq.next(last_key);
            if next <= last_key {
                return Err(StrataError::InvalidSequence {
                    after: last_key,
                    next,
                });
            }
            return Ok(next);
        }

        if key <= last_key {
            return Err(StrataError::KeyNotMonotonic {
                key,
                last: last_key,
            });
        }
        Ok(key)
    }

    /// Write one envelope into the page chosen by `index`
    fn append_document(&self, index: &mut PageIndex, key: u64, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(StrataError::EmptyDocument);
        }

        let envelope_size = DOC_HEADER_SIZE + data.len() as u64;
        let entry = index.get_entry_for_insert(envelope_size)?;
        let page = self.store.get(entry.page())?;

        let mut header = [0u8; DOC_HEADER_SIZE as usize];
        header[0..8].copy_from_slice(&key.to_le_bytes());
        header[8..16].copy_from_slice(&(data.len() as u64).to_le_bytes());

        page.write_at(entry.used, &header)?;
        page.write_at(entry.used + DOC_HEADER_SIZE, data)?;

        if entry.first_key == 0 {
            entry.first_key = key;
        }
        entry.used += envelope_size;

        Ok(())
    }
}

impl Drop for AoCollection {
    fn drop(&mut self) {
        if let Err(err) = self.sync() {
            warn!(
                collection = self.schema.name(),
                error = %err,
                "failed to sync collection on drop"
            );
        }
    }
}
