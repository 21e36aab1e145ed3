//! Error types for Strata
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StrataError
pub type Result<T> = std::result::Result<T, StrataError>;

/// Unified error type for Strata operations
#[derive(Debug, Error)]
pub enum StrataError {
    // -------------------------------------------------------------------------
    // Resource Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open backing file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to map {size} bytes of the backing file: {source}")]
    Map {
        size: u64,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Key-Validity Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported key type: {0}")]
    UnsupportedKey(String),

    #[error("Keys must be monotonically increasing: {key} <= last committed key {last}")]
    KeyNotMonotonic { key: u64, last: u64 },

    #[error("Key sequence returned {next} which does not exceed {after}")]
    InvalidSequence { after: u64, next: u64 },

    // -------------------------------------------------------------------------
    // Capacity / Placement Errors
    // -------------------------------------------------------------------------
    #[error("Capacity exceeded: {0}")]
    Capacity(String),

    #[error("Cannot store an empty document")]
    EmptyDocument,

    #[error("Access of {len} bytes at offset {offset} exceeds page of {page_size} bytes")]
    OutOfBounds {
        offset: u64,
        len: u64,
        page_size: u64,
    },

    // -------------------------------------------------------------------------
    // Cursor Errors
    // -------------------------------------------------------------------------
    #[error("Position {position} out of range: stream has {rows} rows")]
    OutOfRange { position: u64, rows: u64 },

    #[error("Cursor is not positioned on a row")]
    InvalidCursor,

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Collection already open with a different schema: {0}")]
    CollectionExists(String),
}

impl StrataError {
    /// Errors caused by an invalid document key. These roll back the whole
    /// enclosing transaction.
    pub fn is_key_validity(&self) -> bool {
        matches!(
            self,
            StrataError::UnsupportedKey(_)
                | StrataError::KeyNotMonotonic { .. }
                | StrataError::InvalidSequence { .. }
        )
    }

    /// Errors raised by the backing file or its mapping.
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            StrataError::Io(_) | StrataError::Open { .. } | StrataError::Map { .. }
        )
    }
}

impl From<bincode::Error> for StrataError {
    fn from(err: bincode::Error) -> Self {
        StrataError::Serialization(err.to_string())
    }
}
