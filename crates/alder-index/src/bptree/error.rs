//! Error types for the B+ tree index.

use alder_common::types::PageId;
use thiserror::Error;

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors that can occur in index operations.
///
/// Only [`IndexError::DuplicateKey`] is produced by a healthy tree; the
/// remaining variants diagnose structural corruption and indicate a bug in
/// the tree itself rather than misuse by the caller.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Duplicate key found during insert.
    #[error("duplicate key")]
    DuplicateKey,

    /// A node id led nowhere in the node arena.
    #[error("page not found: {0}")]
    PageNotFound(PageId),

    /// A node had the wrong kind for the operation.
    #[error("invalid node type: expected {expected}, found {found}")]
    InvalidNodeType {
        /// Expected node kind.
        expected: &'static str,
        /// Found node kind.
        found: &'static str,
    },

    /// The tree violated one of its structural invariants.
    #[error("tree structure error: {0}")]
    TreeStructure(String),
}

impl IndexError {
    /// Creates a new tree structure error.
    pub fn structure(msg: impl Into<String>) -> Self {
        Self::TreeStructure(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(IndexError::DuplicateKey.to_string(), "duplicate key");

        let err = IndexError::PageNotFound(PageId::new(42));
        assert!(err.to_string().contains("42"));

        let err = IndexError::structure("leaf chain broken");
        assert!(err.to_string().contains("leaf chain broken"));
    }
}
