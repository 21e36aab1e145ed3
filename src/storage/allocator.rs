//! Page Allocator
//!
//! Hands out block-aligned pages from the logical end of the backing store
//! and recycles freed pages through a first-fit free list.

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Result, StrataError};

use super::Page;

/// Tracks the extent of the backing store as a sequence of page allocations
///
/// ## Concurrency:
/// - `state`: end-of-store offset and free list, behind one Mutex
/// - Every allocate/reuse/free holds the lock for its whole duration
pub struct PageAllocator {
    /// Alignment of every page size
    block_size: u64,

    state: Mutex<AllocatorState>,
}

struct AllocatorState {
    /// First byte past the last page ever allocated
    end_pos: u64,

    /// `(size, offset)` of freed pages, in the order they were freed
    freelist: Vec<(u64, u64)>,
}

impl PageAllocator {
    /// Create an allocator whose store ends at `end_pos`
    pub fn new(end_pos: u64, block_size: u64) -> Self {
        debug_assert!(block_size > 0);
        Self {
            block_size,
            state: Mutex::new(AllocatorState {
                end_pos,
                freelist: Vec::new(),
            }),
        }
    }

    /// Allocate a page of at least `min_size` bytes
    ///
    /// The size is rounded up to the next block boundary (a zero request
    /// still gets one block). A fitting free page is reused first; otherwise
    /// the page is appended at the end of the store.
    pub fn allocate(&self, min_size: u64) -> Result<Page> {
        let aligned = self.align(min_size.max(1))?;
        let mut state = self.state.lock();

        if let Some(page) = Self::take_free(&mut state, aligned) {
            debug!(offset = page.offset, size = page.size, requested = aligned, "reused free page");
            return Ok(page);
        }

        let offset = state.end_pos;
        state.end_pos = offset.checked_add(aligned).ok_or_else(|| {
            StrataError::Capacity(format!(
                "store end {} cannot grow by {} bytes",
                offset, aligned
            ))
        })?;

        debug!(offset, size = aligned, "allocated page");
        Ok(Page::new(offset, aligned))
    }

    /// Take the first free page of at least `min_size` bytes
    ///
    /// The page is returned with its recorded size, which may be larger than
    /// requested. Pages are never split.
    pub fn reuse(&self, min_size: u64) -> Option<Page> {
        let mut state = self.state.lock();
        Self::take_free(&mut state, min_size)
    }

    /// Return a page to the free list. Neighbouring free pages are not merged.
    pub fn free(&self, page: Page) {
        let mut state = self.state.lock();
        state.freelist.push((page.size, page.offset));
        debug!(offset = page.offset, size = page.size, "freed page");
    }

    /// Get the block size every page is aligned to
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Get the current end-of-store offset
    pub fn end_of_store(&self) -> u64 {
        self.state.lock().end_pos
    }

    /// Get the number of pages on the free list
    pub fn free_pages(&self) -> usize {
        self.state.lock().freelist.len()
    }

    /// Get the total bytes held by the free list
    pub fn free_bytes(&self) -> u64 {
        self.state.lock().freelist.iter().map(|(size, _)| size).sum()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn align(&self, size: u64) -> Result<u64> {
        let blocks = size
            .checked_add(self.block_size - 1)
            .ok_or_else(|| StrataError::Capacity(format!("page of {} bytes is too large", size)))?
            / self.block_size;
        Ok(blocks * self.block_size)
    }

    fn take_free(state: &mut AllocatorState, min_size: u64) -> Option<Page> {
        let pos = state
            .freelist
            .iter()
            .position(|&(size, _)| size >= min_size)?;
        let (size, offset) = state.freelist.remove(pos);
        Some(Page::new(offset, size))
    }
}
