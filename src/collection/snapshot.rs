//! Collection snapshots
//!
//! A snapshot holds one published page index. Commits that finish after it
//! was taken are invisible to it.

use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::storage::MappedPageRef;

use super::{IndexEntry, PageIndex, DOC_HEADER_SIZE};

/// Read-only view of a collection as of one commit
#[derive(Debug, Clone)]
pub struct Snapshot {
    index: Arc<PageIndex>,
}

impl Snapshot {
    pub(crate) fn new(index: Arc<PageIndex>) -> Self {
        Self { index }
    }

    /// Visit every document in key order until `f` returns false
    pub fn scan<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(u64, &[u8]) -> bool,
    {
        for entry in self.index.entries() {
            let page = self.index.store().get(entry.page())?;
            let mut offset = 0;
            while offset < entry.used {
                let (key, size) = read_envelope_header(&page, offset)?;
                let data = page.read_at(offset + DOC_HEADER_SIZE, size)?;
                if !f(key, data) {
                    return Ok(());
                }
                offset += DOC_HEADER_SIZE + size;
            }
        }
        Ok(())
    }

    /// Copy out the document stored under `key`
    pub fn get(&self, key: u64) -> Result<Option<Bytes>> {
        let Some(entry) = self.index.locate(key) else {
            return Ok(None);
        };
        self.find_in_page(entry, key)
    }

    /// Decode the bincode document stored under `key`
    pub fn get_decoded<T: DeserializeOwned>(&self, key: u64) -> Result<Option<T>> {
        match self.get(key)? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    /// Get every key, ascending
    pub fn keys(&self) -> Result<Vec<u64>> {
        let mut keys = Vec::new();
        self.scan(|key, _| {
            keys.push(key);
            true
        })?;
        Ok(keys)
    }

    pub fn document_count(&self) -> Result<u64> {
        let mut count = 0;
        self.scan(|_, _| {
            count += 1;
            true
        })?;
        Ok(count)
    }

    pub fn page_count(&self) -> usize {
        self.index.len()
    }

    /// Get the page index this snapshot reads
    pub fn index(&self) -> &PageIndex {
        &self.index
    }

    fn find_in_page(&self, entry: &IndexEntry, key: u64) -> Result<Option<Bytes>> {
        let page = self.index.store().get(entry.page())?;
        let mut offset = 0;
        while offset < entry.used {
            let (found, size) = read_envelope_header(&page, offset)?;
            if found == key {
                let data = page.read_at(offset + DOC_HEADER_SIZE, size)?;
                return Ok(Some(Bytes::copy_from_slice(data)));
            }
            if found > key {
                break;
            }
            offset += DOC_HEADER_SIZE + size;
        }
        Ok(None)
    }
}

/// Read `(key, size)` of the envelope at `offset`
fn read_envelope_header(page: &MappedPageRef, offset: u64) -> Result<(u64, u64)> {
    Ok((page.read_u64(offset)?, page.read_u64(offset + 8)?))
}
