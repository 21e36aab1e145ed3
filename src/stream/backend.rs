//! Stream Backend
//!
//! Resolves string keys to streams, minting a stream id the first time a key
//! is seen. Keys are never forgotten and ids are never reused.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::clock::Clock;
use crate::error::Result;
use crate::storage::PageStore;

use super::{Cursor, StreamRef};

/// Keyed store of independent append-only row streams
///
/// ## Concurrency:
/// - `registry`: one RwLock over both maps and the id counter; lookups share
///   the read lock, and creation re-checks under the write lock so two
///   threads can never mint two ids for one key
pub struct StreamBackend {
    store: Arc<PageStore>,
    clock: Arc<dyn Clock>,
    rows_per_page_hint: u64,
    registry: RwLock<StreamRegistry>,
}

#[derive(Default)]
struct StreamRegistry {
    /// key → stream id
    ids: HashMap<String, u64>,

    /// stream id → stream
    streams: HashMap<u64, Arc<StreamRef>>,

    /// Last id handed out (ids start at 1)
    max_stream_id: u64,
}

impl StreamBackend {
    pub fn new(store: Arc<PageStore>, clock: Arc<dyn Clock>, rows_per_page_hint: u64) -> Self {
        Self {
            store,
            clock,
            rows_per_page_hint,
            registry: RwLock::new(StreamRegistry::default()),
        }
    }

    /// Get an unpositioned cursor over the stream for `key`, creating the
    /// stream on first use
    pub fn get_cursor(&self, key: &str) -> Cursor {
        Cursor::new(self.stream_ref(key))
    }

    /// Get the stream for `key`, creating it on first use
    pub fn stream_ref(&self, key: &str) -> Arc<StreamRef> {
        {
            let registry = self.registry.read();
            if let Some(stream) = registry
                .ids
                .get(key)
                .and_then(|id| registry.streams.get(id))
            {
                return Arc::clone(stream);
            }
        }

        let mut registry = self.registry.write();

        // Another thread may have created it between the two locks
        if let Some(stream) = registry
            .ids
            .get(key)
            .and_then(|id| registry.streams.get(id))
        {
            return Arc::clone(stream);
        }

        registry.max_stream_id += 1;
        let stream_id = registry.max_stream_id;
        let stream = Arc::new(StreamRef::new(
            stream_id,
            key.to_string(),
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.rows_per_page_hint,
        ));

        registry.ids.insert(key.to_string(), stream_id);
        registry.streams.insert(stream_id, Arc::clone(&stream));
        debug!(stream_id, key, "created stream");

        stream
    }

    /// Append a row to the stream for `key`
    pub fn append_row(&self, key: &str, data: &[u8]) -> Result<u64> {
        self.stream_ref(key).append_row(data)
    }

    /// Get the id of an existing stream without creating it
    pub fn stream_id(&self, key: &str) -> Option<u64> {
        self.registry.read().ids.get(key).copied()
    }

    /// Get the number of streams created so far
    pub fn stream_count(&self) -> usize {
        self.registry.read().streams.len()
    }

    /// Get every stream key, ordered by stream id
    pub fn stream_keys(&self) -> Vec<String> {
        let registry = self.registry.read();
        let mut keys: Vec<(u64, String)> = registry
            .ids
            .iter()
            .map(|(key, &id)| (id, key.clone()))
            .collect();
        keys.sort_unstable();
        keys.into_iter().map(|(_, key)| key).collect()
    }
}
