//! Store contract consumed by the coordinator.
//!
//! The core never talks to a database directly. It loads the whole forest,
//! computes, and writes back one root document at a time through
//! [`CategoryStore`]. Implementations own connection handling, retries and
//! indexing.

mod memory;

pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::node::{CategoryNode, NodeId};

/// What to write back for one root document
#[derive(Debug, Clone, PartialEq)]
pub enum SubtreeWrite {
    /// Replace the root's own scalar fields; its children stay as stored
    Fields(CategoryNode),
    /// Replace the root's `children` array
    Children(Vec<CategoryNode>),
    /// Insert or replace the whole root document
    Document(CategoryNode),
}

/// Persistence operations the taxonomy core depends on
///
/// # Examples
///
/// ```
/// use repertoire::store::{CategoryStore, MemoryStore, SubtreeWrite};
/// use repertoire::CategoryNode;
///
/// let store = MemoryStore::new();
/// let root = CategoryNode::new("Sicilian").with_id("s");
/// store.persist_subtree(&root.id.clone(), SubtreeWrite::Document(root), None).unwrap();
/// assert_eq!(store.load_forest().unwrap().len(), 1);
/// ```
pub trait CategoryStore {
    /// All root documents with their children fully populated
    fn load_forest(&self) -> Result<Vec<CategoryNode>, StoreError>;

    /// Write back one root document
    ///
    /// `expected_version` is the `version` the root carried when it was
    /// loaded (`None` for a new document). Stores that track versions
    /// reject the write with `VersionConflict` when it no longer matches.
    /// A `Document` write with no expected version must not replace a
    /// stored root; it fails with `AlreadyExists` instead.
    fn persist_subtree(
        &self,
        root_id: &NodeId,
        write: SubtreeWrite,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError>;

    /// Add exactly one child under `parent_id`, anywhere in the forest
    fn append_child(&self, parent_id: &NodeId, child: CategoryNode) -> Result<(), StoreError>;
}

impl<S: CategoryStore + ?Sized> CategoryStore for &S {
    fn load_forest(&self) -> Result<Vec<CategoryNode>, StoreError> {
        (**self).load_forest()
    }

    fn persist_subtree(
        &self,
        root_id: &NodeId,
        write: SubtreeWrite,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError> {
        (**self).persist_subtree(root_id, write, expected_version)
    }

    fn append_child(&self, parent_id: &NodeId, child: CategoryNode) -> Result<(), StoreError> {
        (**self).append_child(parent_id, child)
    }
}
