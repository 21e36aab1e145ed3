//! # Strata
//!
//! An embedded, page-oriented storage engine with:
//! - Append-only, per-key row streams of time-stamped records
//! - Append-only document collections with transactional, monotonically
//!   keyed inserts
//! - Copy-on-write page index for snapshot reads
//! - One growable, reference-counted memory mapping of a single file
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │        Stream Backend        │   │     Document Collection      │
//! │  key → stream id → StreamRef │   │ Transaction → commit / undo  │
//! │   Cursor (read) / append     │   │  PageIndex (copy-on-write)   │
//! └──────────────┬───────────────┘   └──────────────┬───────────────┘
//!                │                                  │
//!                └────────────────┬─────────────────┘
//!                                 ▼
//!                   ┌───────────────────────────┐
//!                   │        Page Store         │
//!                   │  PageAllocator (freelist) │
//!                   │  MmapPageManager (remap)  │
//!                   └─────────────┬─────────────┘
//!                                 ▼
//!                           backing file
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod clock;
pub mod schema;

pub mod storage;
pub mod stream;
pub mod collection;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StrataError, Result};
pub use config::Config;
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Strata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
