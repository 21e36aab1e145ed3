//! Mapped-File Manager
//!
//! Owns one growable memory mapping of the backing file and hands out
//! reference-counted page views into it.
//!
//! ## Remapping
//!
//! When a page ends past the current mapping, a new, larger mapping is
//! created over a duplicated file handle and becomes current. Views taken
//! before the remap keep the old mapping alive through their `Arc`; the
//! last view to drop unmaps it and closes its file handle.
//!
//! ```text
//!   get(page 7) ──► mapping #2 (current) ◄── MappedPageRef
//!   get(page 1) ──► mapping #1 (superseded) ◄── MappedPageRef (still valid)
//! ```

use std::fs::File;
use std::ptr;
use std::slice;
use std::sync::Arc;

use memmap2::{MmapOptions, MmapRaw};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::config::MapFailurePolicy;
use crate::error::{Result, StrataError};

use super::Page;

/// One live memory mapping of (a prefix of) the backing file
pub struct MappedFile {
    // Field order matters: the map is unmapped before its handle closes
    map: MmapRaw,
    _file: File,
}

impl MappedFile {
    /// Get the number of mapped bytes
    pub fn len(&self) -> u64 {
        self.map.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.map.len() == 0
    }
}

/// Scoped view of one page through a mapping
///
/// Holds a strong reference on the mapping for as long as it lives. Do not
/// keep it past the operation that requested it: it pins the mapping even
/// after the file has been remapped.
pub struct MappedPageRef {
    page: Page,
    file: Arc<MappedFile>,
}

impl MappedPageRef {
    /// Get the page this view covers
    pub fn page(&self) -> Page {
        self.page
    }

    /// Borrow `len` bytes starting `offset` bytes into the page
    pub fn read_at(&self, offset: u64, len: u64) -> Result<&[u8]> {
        let start = self.check_bounds(offset, len)?;
        // SAFETY: check_bounds keeps the range inside the page and the page
        // inside the mapping, which stays mapped while `self.file` is held.
        // Writers never touch bytes below a page's published `used` mark,
        // which is the only region readers ask for.
        unsafe {
            Ok(slice::from_raw_parts(
                self.file.map.as_ptr().add(start),
                len as usize,
            ))
        }
    }

    /// Copy `bytes` into the page starting `offset` bytes in
    pub fn write_at(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let start = self.check_bounds(offset, bytes.len() as u64)?;
        // SAFETY: the range is bounds checked against the page and mapping.
        // Each byte range is written by a single holder of the stream's
        // append lock or the collection's commit lock.
        unsafe {
            ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self.file.map.as_mut_ptr().add(start),
                bytes.len(),
            );
        }
        Ok(())
    }

    /// Read a little-endian u64 at `offset`
    pub fn read_u64(&self, offset: u64) -> Result<u64> {
        let bytes = self.read_at(offset, 8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    /// Read a little-endian u32 at `offset`
    pub fn read_u32(&self, offset: u64) -> Result<u32> {
        let bytes = self.read_at(offset, 4)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(buf))
    }

    /// Get the size of the mapping backing this view
    pub fn mapped_size(&self) -> u64 {
        self.file.len()
    }

    /// Get the number of live references to the backing mapping
    pub fn mapping_refs(&self) -> usize {
        Arc::strong_count(&self.file)
    }

    fn check_bounds(&self, offset: u64, len: u64) -> Result<usize> {
        let out_of_bounds = || StrataError::OutOfBounds {
            offset,
            len,
            page_size: self.page.size,
        };
        let end = offset.checked_add(len).ok_or_else(out_of_bounds)?;
        if end > self.page.size {
            return Err(out_of_bounds());
        }
        Ok((self.page.offset + offset) as usize)
    }
}

/// Owns the backing file and its current mapping
///
/// ## Concurrency:
/// - `state`: file size and current mapping, behind one Mutex; file growth
///   and remapping decisions happen under it
/// - Mapping lifetimes are tracked by `Arc`, so releasing a view takes no lock
pub struct MmapPageManager {
    file: File,

    /// Mappings are sized to multiples of this
    growth_unit: u64,

    policy: MapFailurePolicy,

    state: Mutex<MmapState>,
}

struct MmapState {
    /// Bytes known to exist in the file
    file_size: u64,

    current: Option<Arc<MappedFile>>,

    remaps: u64,
}

impl MmapPageManager {
    /// Create a manager for `file`, whose current length is `file_size`
    pub fn new(file: File, file_size: u64, growth_unit: u64, policy: MapFailurePolicy) -> Self {
        Self {
            file,
            growth_unit: growth_unit.max(1),
            policy,
            state: Mutex::new(MmapState {
                file_size,
                current: None,
                remaps: 0,
            }),
        }
    }

    /// Get a view of `page`, growing the file and the mapping as needed
    ///
    /// The file is extended before the view is returned, so every byte of
    /// the page is backed by the file when it is touched.
    pub fn get(&self, page: Page) -> Result<MappedPageRef> {
        let last_byte = page.end();
        let mut state = self.state.lock();

        if last_byte > state.file_size {
            self.file.set_len(last_byte)?;
            debug!(from = state.file_size, to = last_byte, "extended backing file");
            state.file_size = last_byte;
        }

        let reusable = state
            .current
            .as_ref()
            .filter(|current| current.len() >= last_byte)
            .cloned();

        let mapping = match reusable {
            Some(current) => current,
            None => {
                let mapping = Arc::new(self.map(last_byte)?);
                // The superseded mapping is released here; views still
                // holding it keep it alive until they drop.
                state.current = Some(Arc::clone(&mapping));
                state.remaps += 1;
                mapping
            }
        };

        Ok(MappedPageRef {
            page,
            file: mapping,
        })
    }

    /// Flush dirty mapped pages and file data to storage
    pub fn sync(&self) -> Result<()> {
        let current = self.state.lock().current.clone();
        if let Some(mapping) = current {
            mapping.map.flush()?;
        }
        self.file.sync_data()?;
        Ok(())
    }

    /// Get the number of bytes known to exist in the backing file
    pub fn file_size(&self) -> u64 {
        self.state.lock().file_size
    }

    /// Get the size of the current mapping (0 before the first access)
    pub fn mapped_size(&self) -> u64 {
        self.state
            .lock()
            .current
            .as_ref()
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Get how many mappings have been created so far
    pub fn remap_count(&self) -> u64 {
        self.state.lock().remaps
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Map the file up to the growth unit boundary past `last_byte`
    fn map(&self, last_byte: u64) -> Result<MappedFile> {
        let units = last_byte
            .checked_add(self.growth_unit - 1)
            .map(|n| n / self.growth_unit)
            .ok_or_else(|| StrataError::Capacity(format!("cannot map {} bytes", last_byte)))?;
        let mmap_size = units * self.growth_unit;
        let len = usize::try_from(mmap_size).map_err(|_| {
            StrataError::Capacity(format!("mapping of {} bytes exceeds address space", mmap_size))
        })?;

        let mapped = self.file.try_clone().and_then(|fd| {
            let map = MmapOptions::new().len(len).map_raw(&fd)?;
            Ok(MappedFile { map, _file: fd })
        });

        match mapped {
            Ok(mapping) => {
                debug!(size = mmap_size, "mapped backing file");
                Ok(mapping)
            }
            Err(source) => match self.policy {
                MapFailurePolicy::Abort => {
                    error!(size = mmap_size, error = %source, "mmap() failed");
                    std::process::abort();
                }
                MapFailurePolicy::ReturnError => Err(StrataError::Map {
                    size: mmap_size,
                    source,
                }),
            },
        }
    }
}
