//! Collection Module
//!
//! Append-only document collections with transactional, monotonically keyed
//! inserts.
//!
//! ## Responsibilities
//! - Resolve document keys (auto-assigned or explicit, strictly increasing)
//! - Place documents into pages through a copy-on-write page index
//! - Publish a commit with a single index pointer swap, or roll it back
//! - Serve readers from immutable index snapshots
//!
//! ## Page Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Envelope 1                              │
//! │ ┌─────────┬──────────┬────────────────┐ │
//! │ │ Key (8) │ Size (8) │ Payload        │ │
//! │ └─────────┴──────────┴────────────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Envelope 2 ...                          │
//! └─────────────────────────────────────────┘
//! ```

mod ao_collection;
mod document;
mod key;
mod page_index;
mod sequence;
mod snapshot;
mod transaction;

pub use ao_collection::AoCollection;
pub use document::DocumentRef;
pub use key::DocumentKey;
pub use page_index::{IndexEntry, PageIndex};
pub use sequence::{IdSequence, MonotonicSequence, StepSequence};
pub use snapshot::Snapshot;
pub use transaction::Transaction;

/// Envelope header size: Key (8) + Size (8) = 16 bytes
pub const DOC_HEADER_SIZE: u64 = 16;
