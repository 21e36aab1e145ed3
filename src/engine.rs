//! Engine Module
//!
//! Opens the backing file and exposes both storage abstractions over it.
//!
//! ## Responsibilities
//! - Open (or create) the single backing file
//! - Route stream appends and cursors to the stream backend
//! - Create and hand out document collections by schema name
//! - Sync everything to storage on request and on close

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::clock::{Clock, WallClock};
use crate::collection::{AoCollection, IdSequence, MonotonicSequence};
use crate::config::Config;
use crate::error::{Result, StrataError};
use crate::schema::Schema;
use crate::storage::{PageStore, StoreStats};
use crate::stream::{Cursor, StreamBackend};

/// The storage engine
///
/// ## Concurrency Model
///
/// - **Streams**: appends to different streams run in parallel; appends to
///   one stream are serialized by that stream
/// - **Collections**: one commit at a time per collection; readers work on
///   snapshots and never wait for commits
/// - **Pages**: allocation and file growth are serialized inside the
///   page store
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Backing file shared by streams and collections
    store: Arc<PageStore>,

    /// Keyed row streams
    streams: StreamBackend,

    /// Open collections by schema name
    collections: RwLock<HashMap<String, Arc<AoCollection>>>,
}

impl Engine {
    /// Open or create an engine using the wall clock
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with_clock(config, Arc::new(WallClock))
    }

    /// Open or create an engine whose rows are stamped by `clock`
    pub fn open_with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = Arc::new(PageStore::open(&config)?);
        let streams = StreamBackend::new(Arc::clone(&store), clock, config.rows_per_page_hint);

        info!(path = %config.path.display(), "engine opened");

        Ok(Self {
            config,
            store,
            streams,
            collections: RwLock::new(HashMap::new()),
        })
    }

    // =========================================================================
    // Streams
    // =========================================================================

    /// Get an unpositioned cursor over the stream for `key`
    pub fn get_cursor(&self, key: &str) -> Cursor {
        self.streams.get_cursor(key)
    }

    /// Append a row to the stream for `key`, returning its timestamp
    pub fn append_row(&self, key: &str, data: &[u8]) -> Result<u64> {
        self.streams.append_row(key, data)
    }

    pub fn streams(&self) -> &StreamBackend {
        &self.streams
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// Get or create the collection named by `schema`, auto-assigning keys
    /// densely
    pub fn collection(&self, schema: Schema) -> Result<Arc<AoCollection>> {
        self.collection_with_sequence(schema, Box::new(MonotonicSequence))
    }

    /// Get or create the collection named by `schema`
    ///
    /// `seq` is only used when the collection is created. Reopening a name
    /// with a different schema definition fails.
    pub fn collection_with_sequence(
        &self,
        schema: Schema,
        seq: Box<dyn IdSequence>,
    ) -> Result<Arc<AoCollection>> {
        if let Some(existing) = self.collections.read().get(schema.name()) {
            return Self::check_schema(existing, &schema);
        }

        let mut collections = self.collections.write();
        if let Some(existing) = collections.get(schema.name()) {
            return Self::check_schema(existing, &schema);
        }

        let name = schema.name().to_string();
        let collection = Arc::new(AoCollection::with_index_page_size(
            schema,
            Arc::clone(&self.store),
            seq,
            self.config.index_initial_page_size,
        ));
        collections.insert(name.clone(), Arc::clone(&collection));
        info!(collection = %name, "created collection");

        Ok(collection)
    }

    /// Get the names of all open collections, sorted
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Flush every mapped page to storage
    pub fn sync(&self) -> Result<()> {
        self.store.sync()
    }

    /// Sync and close the engine
    pub fn close(self) -> Result<()> {
        self.sync()?;
        info!(path = %self.config.path.display(), "engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<PageStore> {
        &self.store
    }

    /// Snapshot the page store counters
    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    fn check_schema(existing: &Arc<AoCollection>, schema: &Schema) -> Result<Arc<AoCollection>> {
        if existing.schema() != schema {
            return Err(StrataError::CollectionExists(schema.name().to_string()));
        }
        Ok(Arc::clone(existing))
    }
}
