//! Stream Cursor
//!
//! Read path of a stream. Rows are visited in insertion order: page
//! allocation order first, then byte offset within the page.
//!
//! ## Visibility
//! Every seek copies the stream's page allocations. Until the next seek the
//! cursor only sees rows that existed at that moment; concurrent appends
//! never move or change them.
//!
//! ## States
//! ```text
//!  unpositioned ──seek_*──► on row ──next()──► on row ...
//!        ▲                                 │
//!        └──────── next() past last row ◄──┘
//! ```

use std::sync::Arc;

use bytes::Bytes;

use crate::error::{Result, StrataError};

use super::row::{Row, RowHeader, ROW_HEADER_SIZE};
use super::stream_ref::{PageAlloc, StreamRef};

/// Positioned reader over one stream
///
/// Cloning yields an independent cursor at the same position.
#[derive(Clone)]
pub struct Cursor {
    stream: Arc<StreamRef>,

    /// Page allocations captured by the last seek
    pages: Arc<Vec<PageAlloc>>,

    pos: Option<Position>,
}

#[derive(Debug, Clone, Copy)]
struct Position {
    /// Index into `pages`
    page: usize,
    /// Byte offset of the row header within the page
    offset: u64,
    /// 0-based row number within the stream
    ordinal: u64,
}

impl Cursor {
    pub(crate) fn new(stream: Arc<StreamRef>) -> Self {
        Self {
            stream,
            pages: Arc::new(Vec::new()),
            pos: None,
        }
    }

    // =========================================================================
    // Seeking
    // =========================================================================

    /// Position at the first row. Returns false if the stream is empty.
    pub fn seek_to_first(&mut self) -> Result<bool> {
        self.refresh();
        self.pos = self.next_non_empty(0).map(|page| Position {
            page,
            offset: 0,
            ordinal: 0,
        });
        Ok(self.pos.is_some())
    }

    /// Position at the last row. Returns false if the stream is empty.
    pub fn seek_to_last(&mut self) -> Result<bool> {
        self.refresh();
        let total = self.row_count();
        if total == 0 {
            return Ok(false);
        }
        self.seek_ordinal(total - 1)?;
        Ok(true)
    }

    /// Position at the row with 0-based index `position`
    ///
    /// Fails with `OutOfRange` and leaves the cursor unpositioned if the
    /// stream has no such row.
    pub fn seek_to(&mut self, position: u64) -> Result<()> {
        self.refresh();
        let rows = self.row_count();
        if position >= rows {
            self.pos = None;
            return Err(StrataError::OutOfRange { position, rows });
        }
        self.seek_ordinal(position)
    }

    /// Position at the first row, in insertion order, stamped at or after
    /// `time`. Returns false if there is none.
    ///
    /// Pages holding no row that late are skipped without being read.
    pub fn seek_to_time(&mut self, time: u64) -> Result<bool> {
        self.refresh();
        self.pos = None;

        let mut ordinal = 0;
        for (index, alloc) in self.pages.iter().enumerate() {
            if alloc.rows == 0 {
                continue;
            }
            if alloc.max_row_time < time {
                ordinal += alloc.rows;
                continue;
            }

            let mapped = self.stream.store().get(alloc.page)?;
            let mut offset = 0;
            while offset < alloc.used {
                let header = RowHeader::read(&mapped, offset)?;
                if header.time >= time {
                    self.pos = Some(Position {
                        page: index,
                        offset,
                        ordinal,
                    });
                    return Ok(true);
                }
                offset += header.row_size();
                ordinal += 1;
            }
        }

        Ok(false)
    }

    /// Advance to the next row
    ///
    /// Returns false, leaving the cursor unpositioned, when there is no
    /// further row.
    pub fn next(&mut self) -> Result<bool> {
        let Some(pos) = self.pos else {
            return Ok(false);
        };

        let alloc = self.pages[pos.page];
        let mapped = self.stream.store().get(alloc.page)?;
        let header = RowHeader::read(&mapped, pos.offset)?;
        let next_offset = pos.offset + header.row_size();

        self.pos = if next_offset < alloc.used {
            Some(Position {
                page: pos.page,
                offset: next_offset,
                ordinal: pos.ordinal + 1,
            })
        } else {
            self.next_non_empty(pos.page + 1).map(|page| Position {
                page,
                offset: 0,
                ordinal: pos.ordinal + 1,
            })
        };

        Ok(self.pos.is_some())
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Call `f` with the current row's payload and timestamp, without copying
    pub fn get_row<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&[u8], u64) -> R,
    {
        let pos = self.pos.ok_or(StrataError::InvalidCursor)?;
        let alloc = &self.pages[pos.page];

        let mapped = self.stream.store().get(alloc.page)?;
        let header = RowHeader::read(&mapped, pos.offset)?;
        let data = mapped.read_at(pos.offset + ROW_HEADER_SIZE, header.size as u64)?;

        Ok(f(data, header.time))
    }

    /// Copy out the current row
    pub fn read_row(&self) -> Result<Row> {
        self.get_row(|data, time| Row {
            time,
            data: Bytes::copy_from_slice(data),
        })
    }

    /// Append a row to the underlying stream
    ///
    /// The new row becomes visible to this cursor after its next seek.
    pub fn append_row(&self, data: &[u8]) -> Result<u64> {
        self.stream.append_row(data)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the 0-based index of the current row
    pub fn position(&self) -> Option<u64> {
        self.pos.map(|pos| pos.ordinal)
    }

    /// Whether the cursor is on a row
    pub fn is_valid(&self) -> bool {
        self.pos.is_some()
    }

    /// Get the number of rows visible to this cursor
    pub fn row_count(&self) -> u64 {
        self.pages.iter().map(|alloc| alloc.rows).sum()
    }

    pub fn stream_id(&self) -> u64 {
        self.stream.stream_id()
    }

    pub fn key(&self) -> &str {
        self.stream.key()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn refresh(&mut self) {
        self.pages = Arc::new(self.stream.page_allocations());
    }

    /// Index of the first page at or after `from` holding a row
    fn next_non_empty(&self, from: usize) -> Option<usize> {
        (from..self.pages.len()).find(|&index| self.pages[index].rows > 0)
    }

    /// Position at row `ordinal`, which must exist in the captured pages
    fn seek_ordinal(&mut self, ordinal: u64) -> Result<()> {
        let mut skipped = 0;
        for (index, alloc) in self.pages.iter().enumerate() {
            if ordinal >= skipped + alloc.rows {
                skipped += alloc.rows;
                continue;
            }

            let mapped = self.stream.store().get(alloc.page)?;
            let mut offset = 0;
            for _ in skipped..ordinal {
                offset += RowHeader::read(&mapped, offset)?.row_size();
            }

            self.pos = Some(Position {
                page: index,
                offset,
                ordinal,
            });
            return Ok(());
        }

        self.pos = None;
        Err(StrataError::OutOfRange {
            position: ordinal,
            rows: skipped,
        })
    }
}
