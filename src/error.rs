//! Error types for tree operations and the store contract.
//!
//! `TreeError` is what every public operation returns on failure. Store
//! failures are folded into it keeping only their message text, so callers
//! never see a backend-specific error type.

use std::fmt;

use crate::node::NodeId;

/// Error type for locate, reconcile, resolve and coordinator operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Target identity absent from the forest or a direct lookup
    NotFound { id: String },
    /// Missing or malformed identifying input
    BadInput { field: String, message: String },
    /// Traversal went deeper than the configured limit
    DepthExceeded { limit: usize, at: String },
    /// A node id re-appeared on its own ancestor path
    CycleDetected { id: NodeId },
    /// The root document changed between load and write-back
    StaleWrite { root_id: NodeId, message: String },
    /// Store failure, message text only
    Store(String),
}

impl TreeError {
    pub(crate) fn not_found(id: impl fmt::Display) -> Self {
        TreeError::NotFound { id: id.to_string() }
    }

    pub(crate) fn bad_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        TreeError::BadInput {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::NotFound { id } => write!(f, "Category not found: {id}"),
            TreeError::BadInput { field, message } => {
                write!(f, "Bad input for '{field}': {message}")
            }
            TreeError::DepthExceeded { limit, at } => {
                write!(f, "Tree depth limit of {limit} exceeded at '{at}'")
            }
            TreeError::CycleDetected { id } => {
                write!(f, "Cycle detected: category {id} is its own ancestor")
            }
            TreeError::StaleWrite { root_id, message } => {
                write!(f, "Stale write to category tree {root_id}: {message}")
            }
            TreeError::Store(msg) => write!(f, "Store error: {msg}"),
        }
    }
}

impl std::error::Error for TreeError {}

/// Error type reported by [`CategoryStore`](crate::store::CategoryStore) implementations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend could not serve the request
    Unavailable(String),
    /// Addressed document or parent does not exist
    NotFound(NodeId),
    /// A new document was written under an id that is already stored
    AlreadyExists(NodeId),
    /// Optimistic concurrency check failed at write-back
    VersionConflict {
        root_id: NodeId,
        expected: u64,
        actual: u64,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
            StoreError::NotFound(id) => write!(f, "no document for {id}"),
            StoreError::AlreadyExists(id) => write!(f, "a document with id {id} already exists"),
            StoreError::VersionConflict {
                root_id,
                expected,
                actual,
            } => write!(
                f,
                "version conflict on {root_id}: expected {expected}, found {actual}"
            ),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for TreeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => TreeError::NotFound { id: id.to_string() },
            StoreError::AlreadyExists(_) => TreeError::BadInput {
                field: "id".to_string(),
                message: err.to_string(),
            },
            StoreError::VersionConflict { ref root_id, .. } => TreeError::StaleWrite {
                root_id: root_id.clone(),
                message: err.to_string(),
            },
            other => TreeError::Store(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for TreeError {
    fn from(err: serde_json::Error) -> Self {
        TreeError::BadInput {
            field: "payload".to_string(),
            message: err.to_string(),
        }
    }
}
