//! Page Store
//!
//! Opens the backing file and pairs the page allocator with the mapped-file
//! manager. Streams and collections share one store.

use std::fs::{File, Metadata, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Config;
use crate::error::{Result, StrataError};

use super::{MappedPageRef, MmapPageManager, Page, PageAllocator};

/// Block size used when the file system does not report one
pub const DEFAULT_BLOCK_SIZE: u64 = 4096;

/// A single backing file subdivided into block-aligned pages
pub struct PageStore {
    path: PathBuf,

    /// Logical extent and free list
    allocator: PageAllocator,

    /// Physical file and its mapping
    mmap: MmapPageManager,
}

/// Point-in-time counters of a page store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub block_size: u64,
    pub end_of_store: u64,
    pub file_size: u64,
    pub mapped_size: u64,
    pub free_pages: usize,
    pub free_bytes: u64,
    pub remaps: u64,
}

impl PageStore {
    /// Open or create the backing file named by `config.path`
    ///
    /// No page metadata is persisted, so pages are laid out from offset 0
    /// on every open.
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;

        let open_err = |source: std::io::Error| StrataError::Open {
            path: config.path.clone(),
            source,
        };

        let file = open_backing_file(&config.path).map_err(open_err)?;
        let metadata = file.metadata().map_err(open_err)?;
        let file_size = metadata.len();
        let block_size = config
            .block_size
            .unwrap_or_else(|| fs_block_size(&metadata));

        info!(
            path = %config.path.display(),
            file_size,
            block_size,
            "opened page store"
        );

        Ok(Self {
            path: config.path.clone(),
            allocator: PageAllocator::new(0, block_size),
            mmap: MmapPageManager::new(
                file,
                file_size,
                config.mmap_growth_unit,
                config.map_failure_policy,
            ),
        })
    }

    /// Allocate a page of at least `min_size` bytes
    pub fn allocate(&self, min_size: u64) -> Result<Page> {
        self.allocator.allocate(min_size)
    }

    /// Return a page to the free list
    pub fn free(&self, page: Page) {
        self.allocator.free(page)
    }

    /// Get a mapped view of a page
    pub fn get(&self, page: Page) -> Result<MappedPageRef> {
        self.mmap.get(page)
    }

    /// Flush mapped pages to storage
    pub fn sync(&self) -> Result<()> {
        self.mmap.sync()
    }

    pub fn allocator(&self) -> &PageAllocator {
        &self.allocator
    }

    pub fn mmap(&self) -> &MmapPageManager {
        &self.mmap
    }

    /// Get the backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn block_size(&self) -> u64 {
        self.allocator.block_size()
    }

    /// Snapshot the allocator and mapping counters
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            block_size: self.allocator.block_size(),
            end_of_store: self.allocator.end_of_store(),
            file_size: self.mmap.file_size(),
            mapped_size: self.mmap.mapped_size(),
            free_pages: self.allocator.free_pages(),
            free_bytes: self.allocator.free_bytes(),
            remaps: self.mmap.remap_count(),
        }
    }
}

// =============================================================================
// Private Helpers
// =============================================================================

fn open_backing_file(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path)
}

#[cfg(unix)]
fn fs_block_size(metadata: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    match metadata.blksize() {
        0 => DEFAULT_BLOCK_SIZE,
        size => size,
    }
}

#[cfg(not(unix))]
fn fs_block_size(_metadata: &Metadata) -> u64 {
    DEFAULT_BLOCK_SIZE
}
