//! Row encoding
//!
//! ```text
//! ┌──────────┬──────────┬──────────────────┐
//! │ Time (8) │ Size (4) │ Payload (Size)   │
//! └──────────┴──────────┴──────────────────┘
//! ```
//! Little-endian, packed back to back within a page.

use bytes::Bytes;

use crate::error::Result;
use crate::storage::MappedPageRef;

/// Header size: Time (8) + Size (4) = 12 bytes
pub const ROW_HEADER_SIZE: u64 = 12;

/// An owned copy of one stream row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Milliseconds since the Unix epoch when the row was appended
    pub time: u64,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RowHeader {
    pub time: u64,
    pub size: u32,
}

impl RowHeader {
    pub fn encode(&self) -> [u8; ROW_HEADER_SIZE as usize] {
        let mut buf = [0u8; ROW_HEADER_SIZE as usize];
        buf[0..8].copy_from_slice(&self.time.to_le_bytes());
        buf[8..12].copy_from_slice(&self.size.to_le_bytes());
        buf
    }

    pub fn read(page: &MappedPageRef, offset: u64) -> Result<Self> {
        Ok(Self {
            time: page.read_u64(offset)?,
            size: page.read_u32(offset + 8)?,
        })
    }

    /// Bytes taken by the header plus payload
    pub fn row_size(&self) -> u64 {
        ROW_HEADER_SIZE + self.size as u64
    }
}
