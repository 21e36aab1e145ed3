//! Page descriptor
//!
//! A page names a block-aligned byte range of the backing file. It carries
//! no data; bytes are reached through a `MappedPageRef`.

/// A contiguous, block-aligned byte range within the backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Page {
    /// Byte offset of the first byte of the page
    pub offset: u64,
    /// Length in bytes, always a multiple of the block size
    pub size: u64,
}

impl Page {
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Offset one past the last byte of the page
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Whether two pages share at least one byte
    pub fn overlaps(&self, other: &Page) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}
