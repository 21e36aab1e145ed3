//! Collection schema handle
//!
//! Schemas are defined and validated outside the storage core. A collection
//! only keeps the value it was created with and hands it back to callers.

/// Opaque schema descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    definition: Vec<u8>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: Vec::new(),
        }
    }

    /// Attach the serialized definition produced by the schema layer
    pub fn with_definition(mut self, definition: impl Into<Vec<u8>>) -> Self {
        self.definition = definition.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &[u8] {
        &self.definition
    }
}
