//! Stream Module
//!
//! Append-only, per-key row streams.
//!
//! ## Responsibilities
//! - Map string keys to permanent stream ids
//! - Pack time-stamped rows into pages taken from the page allocator
//! - Read rows back in insertion order through cursors
//!
//! ## Page Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Row 1                                   │
//! │ ┌──────────┬──────────┬───────────────┐ │
//! │ │ Time (8) │ Size (4) │ Payload       │ │
//! │ └──────────┴──────────┴───────────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Row 2 ...                               │
//! ├─────────────────────────────────────────┤
//! │ unused tail (row that did not fit went  │
//! │ to the next page allocation)            │
//! └─────────────────────────────────────────┘
//! ```

mod backend;
mod cursor;
mod row;
mod stream_ref;

pub use backend::StreamBackend;
pub use cursor::Cursor;
pub use row::{Row, ROW_HEADER_SIZE};
pub use stream_ref::{PageAlloc, StreamRef};
