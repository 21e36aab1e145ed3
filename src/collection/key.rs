//! Document keys

use serde::{Deserialize, Serialize};

/// Key of a document in a collection
///
/// Append-only collections only accept integer keys. The integer 0 is
/// reserved to mean "assign one at commit time".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DocumentKey {
    /// Resolved from the key sequence at commit time
    #[default]
    Unassigned,

    /// Explicit positive integer key
    Int(u64),

    /// String key, not supported by append-only collections
    Str(String),
}

impl DocumentKey {
    /// Build an integer key; 0 maps to `Unassigned`
    pub fn int(key: u64) -> Self {
        if key == 0 {
            DocumentKey::Unassigned
        } else {
            DocumentKey::Int(key)
        }
    }

    /// Integer value of the key, 0 for unassigned
    pub fn int_key(&self) -> Option<u64> {
        match self {
            DocumentKey::Unassigned => Some(0),
            DocumentKey::Int(key) => Some(*key),
            DocumentKey::Str(_) => None,
        }
    }
}

impl From<u64> for DocumentKey {
    fn from(key: u64) -> Self {
        DocumentKey::int(key)
    }
}

impl From<&str> for DocumentKey {
    fn from(key: &str) -> Self {
        DocumentKey::Str(key.to_string())
    }
}

impl From<String> for DocumentKey {
    fn from(key: String) -> Self {
        DocumentKey::Str(key)
    }
}
