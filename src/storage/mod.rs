//! Storage Module
//!
//! Page-level access to the single backing file.
//!
//! ## Responsibilities
//! - Carve the file into block-aligned pages
//! - Recycle freed pages through a first-fit free list
//! - Grow the file and its memory mapping on demand
//! - Hand out reference-counted views into the mapping
//!
//! ## File Layout
//! ```text
//! ┌────────────┬────────────┬────────────┬─────────────────────┐
//! │  Page A    │  Page B    │  Page C    │   ...               │
//! │ (n blocks) │ (m blocks) │ (k blocks) │                     │
//! └────────────┴────────────┴────────────┴─────────────────────┘
//! 0                                      end_of_store
//! ```
//!
//! There is no file header, page header, or persisted free list: each page
//! holds only the rows or document envelopes written into it.

mod allocator;
mod mmap;
mod page;
mod store;

pub use allocator::PageAllocator;
pub use mmap::{MappedFile, MappedPageRef, MmapPageManager};
pub use page::Page;
pub use store::{PageStore, StoreStats, DEFAULT_BLOCK_SIZE};
