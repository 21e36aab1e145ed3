//! Document refs
//!
//! A document ref is one pending write: a key (possibly unassigned), a dirty
//! flag, and the payload bytes to store.

use bytes::Bytes;
use serde::Serialize;

use crate::error::Result;

use super::DocumentKey;

/// A pending document write
#[derive(Debug, Clone)]
pub struct DocumentRef {
    key: DocumentKey,
    dirty: bool,
    scratchpad: Bytes,
}

impl DocumentRef {
    /// New dirty document whose key is assigned at commit
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            key: DocumentKey::Unassigned,
            dirty: true,
            scratchpad: data.into(),
        }
    }

    /// New dirty document with an explicit key
    pub fn with_key(key: impl Into<DocumentKey>, data: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            dirty: true,
            scratchpad: data.into(),
        }
    }

    /// New dirty document holding the bincode encoding of `value`
    pub fn encode<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::new(bincode::serialize(value)?))
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn set_key(&mut self, key: impl Into<DocumentKey>) {
        self.key = key.into();
    }

    /// Only dirty documents are written on commit
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Get the payload bytes
    pub fn scratchpad(&self) -> &[u8] {
        &self.scratchpad
    }

    /// Replace the payload and mark the document dirty
    pub fn set_scratchpad(&mut self, data: impl Into<Bytes>) {
        self.scratchpad = data.into();
        self.dirty = true;
    }
}
