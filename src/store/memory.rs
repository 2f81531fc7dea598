//! In-memory [`CategoryStore`] for tests and embedding.

use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::node::{CategoryNode, NodeId};
use crate::reconcile::relink;
use crate::store::{CategoryStore, SubtreeWrite};
use crate::tree::locate;
use crate::tree::TreeLimits;

/// Root documents held behind a mutex, versioned on every write
#[derive(Debug, Default)]
pub struct MemoryStore {
    roots: Mutex<Vec<CategoryNode>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store; roots without a version start at 1
    pub fn with_forest(roots: Vec<CategoryNode>) -> Self {
        let roots = roots
            .into_iter()
            .map(|mut root| {
                root.version.get_or_insert(1);
                relink(&mut root);
                root
            })
            .collect();
        Self {
            roots: Mutex::new(roots),
        }
    }

    /// Copy of every stored root document
    pub fn snapshot(&self) -> Vec<CategoryNode> {
        self.lock().map(|roots| roots.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<CategoryNode>>, StoreError> {
        self.roots
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl CategoryStore for MemoryStore {
    fn load_forest(&self) -> Result<Vec<CategoryNode>, StoreError> {
        Ok(self.lock()?.clone())
    }

    fn persist_subtree(
        &self,
        root_id: &NodeId,
        write: SubtreeWrite,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError> {
        let mut roots = self.lock()?;
        let position = roots.iter().position(|r| &r.id == root_id);

        match (position, expected_version) {
            (Some(i), Some(expected)) => {
                let actual = roots[i].version.unwrap_or(0);
                if actual != expected {
                    return Err(StoreError::VersionConflict {
                        root_id: root_id.clone(),
                        expected,
                        actual,
                    });
                }
            }
            // A document without an expected version is an insert
            (Some(_), None) if matches!(write, SubtreeWrite::Document(_)) => {
                return Err(StoreError::AlreadyExists(root_id.clone()));
            }
            _ => {}
        }

        match (position, write) {
            (Some(i), SubtreeWrite::Fields(fields)) => {
                let children = std::mem::take(&mut roots[i].children);
                let mut updated = fields.shallow_clone();
                updated.children = children;
                updated.version = roots[i].version;
                roots[i] = updated;
            }
            (Some(i), SubtreeWrite::Children(children)) => {
                roots[i].children = children;
            }
            (Some(i), SubtreeWrite::Document(doc)) => {
                let version = roots[i].version;
                roots[i] = doc;
                roots[i].version = version;
            }
            (None, SubtreeWrite::Document(mut doc)) => {
                doc.version = Some(0);
                roots.push(doc);
            }
            (None, _) => return Err(StoreError::NotFound(root_id.clone())),
        }

        let i = position.unwrap_or(roots.len() - 1);
        let root = &mut roots[i];
        root.parent = None;
        root.version = Some(root.version.unwrap_or(0) + 1);
        relink(root);
        Ok(())
    }

    fn append_child(&self, parent_id: &NodeId, mut child: CategoryNode) -> Result<(), StoreError> {
        let mut roots = self.lock()?;
        // Depth is the coordinator's policy, not the store's
        let path = locate::find_path(&roots, parent_id, TreeLimits::unbounded())
            .map_err(|_| StoreError::NotFound(parent_id.clone()))?;

        let parent = locate::node_at_path_mut(&mut roots, &path)
            .ok_or_else(|| StoreError::NotFound(parent_id.clone()))?;
        child.parent = Some(parent.id.clone());
        relink(&mut child);
        parent.children.push(child);

        let root = &mut roots[path[0]];
        root.version = Some(root.version.unwrap_or(0) + 1);
        Ok(())
    }
}
