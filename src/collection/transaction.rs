//! Transaction
//!
//! A batch of document refs committed or rolled back as a unit. A
//! transaction is consumed by `AoCollection::commit_transaction`.

use bytes::Bytes;

use super::{DocumentKey, DocumentRef};

/// Batch of pending document writes
#[derive(Debug, Default)]
pub struct Transaction {
    documents: Vec<DocumentRef>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a document ref
    pub fn attach(&mut self, document: DocumentRef) -> &mut Self {
        self.documents.push(document);
        self
    }

    /// Add a document whose key is assigned at commit
    pub fn insert(&mut self, data: impl Into<Bytes>) -> &mut Self {
        self.attach(DocumentRef::new(data))
    }

    /// Add a document with an explicit key
    pub fn insert_with_key(&mut self, key: impl Into<DocumentKey>, data: impl Into<Bytes>) -> &mut Self {
        self.attach(DocumentRef::with_key(key, data))
    }

    /// Get every attached document
    pub fn documents(&self) -> &[DocumentRef] {
        &self.documents
    }

    /// Get the documents that will be written on commit
    pub fn dirty_documents(&self) -> impl Iterator<Item = &DocumentRef> {
        self.documents.iter().filter(|doc| doc.is_dirty())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
