//! Stream Ref
//!
//! Append path of one stream: packs time-stamped rows into the stream's
//! pages, starting a new page when the current one is full.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::clock::Clock;
use crate::error::{Result, StrataError};
use crate::storage::{Page, PageStore};

use super::row::{RowHeader, ROW_HEADER_SIZE};

/// A page owned by a stream plus how much of it holds rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageAlloc {
    pub page: Page,
    /// Bytes of the page filled with rows
    pub used: u64,
    /// Timestamp of the first row in the page
    pub first_row_time: u64,
    /// Timestamp of the most recent row in the page
    pub last_row_time: u64,
    /// Latest timestamp of any row in the page; the clock may step back
    pub max_row_time: u64,
    /// Number of rows in the page
    pub rows: u64,
}

/// One append-only row stream
///
/// ## Concurrency:
/// - `pages`: Mutex held for a whole append, so appends to the same stream
///   are serialized while appends to other streams proceed independently
/// - Readers copy the page list under the same Mutex and then read without it
pub struct StreamRef {
    stream_id: u64,
    key: String,

    store: Arc<PageStore>,
    clock: Arc<dyn Clock>,

    /// New pages fit about this many rows of the triggering size
    rows_per_page_hint: u64,

    /// Page allocations in append order
    pages: Mutex<Vec<PageAlloc>>,
}

impl StreamRef {
    pub(crate) fn new(
        stream_id: u64,
        key: String,
        store: Arc<PageStore>,
        clock: Arc<dyn Clock>,
        rows_per_page_hint: u64,
    ) -> Self {
        Self {
            stream_id,
            key,
            store,
            clock,
            rows_per_page_hint,
            pages: Mutex::new(Vec::new()),
        }
    }

    /// Append a row stamped with the current time
    ///
    /// Returns the row's timestamp.
    pub fn append_row(&self, data: &[u8]) -> Result<u64> {
        let size = u32::try_from(data.len()).map_err(|_| {
            StrataError::Capacity(format!("row of {} bytes exceeds u32 size field", data.len()))
        })?;
        let row_size = ROW_HEADER_SIZE + data.len() as u64;

        let mut pages = self.pages.lock();
        let time = self.clock.unix_millis();

        let full = pages
            .last()
            .map_or(true, |alloc| alloc.used + row_size > alloc.page.size);

        if full {
            let page = self
                .store
                .allocate(row_size.saturating_mul(self.rows_per_page_hint))?;
            debug!(
                stream_id = self.stream_id,
                offset = page.offset,
                size = page.size,
                "started stream page"
            );
            pages.push(PageAlloc {
                page,
                used: 0,
                first_row_time: time,
                last_row_time: time,
                max_row_time: time,
                rows: 0,
            });
        }

        let last = pages.len() - 1;
        let alloc = &mut pages[last];

        let mapped = self.store.get(alloc.page)?;
        mapped.write_at(alloc.used, &RowHeader { time, size }.encode())?;
        mapped.write_at(alloc.used + ROW_HEADER_SIZE, data)?;

        if alloc.rows == 0 {
            alloc.first_row_time = time;
        }
        alloc.used += row_size;
        alloc.last_row_time = time;
        alloc.max_row_time = alloc.max_row_time.max(time);
        alloc.rows += 1;

        Ok(time)
    }

    /// Get the numeric stream identifier
    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    /// Get the string key the stream was created for
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Copy the current page allocations
    pub fn page_allocations(&self) -> Vec<PageAlloc> {
        self.pages.lock().clone()
    }

    /// Get the number of rows appended so far
    pub fn row_count(&self) -> u64 {
        self.pages.lock().iter().map(|alloc| alloc.rows).sum()
    }

    /// Get the bytes of row data (headers included) appended so far
    pub fn bytes_used(&self) -> u64 {
        self.pages.lock().iter().map(|alloc| alloc.used).sum()
    }

    pub(crate) fn store(&self) -> &Arc<PageStore> {
        &self.store
    }
}
