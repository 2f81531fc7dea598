//! Forest representation and traversal.
//!
//! Write paths work directly on nested [`CategoryNode`] values (see
//! [`locate`]). Read paths move a loaded forest into a [`Forest`] arena:
//! every node lives in one slot, children are owned index lists, and the
//! parent link is an index computed from structure during construction.
//!
//! Construction enforces [`TreeLimits::max_depth`] and rejects an id that
//! re-appears on its own ancestor path, so later walks over the arena can
//! neither recurse without bound nor loop.

pub mod flatten;
pub mod locate;

pub use flatten::{flatten, FlatRow};

use std::collections::HashMap;

use crate::error::TreeError;
use crate::node::{CategoryNode, NodeId};

/// Bounds applied to every traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLimits {
    /// Deepest level (roots are level 0) a traversal may visit
    pub max_depth: usize,
}

impl Default for TreeLimits {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

impl TreeLimits {
    /// No depth cap; traversals still run on an explicit stack
    pub fn unbounded() -> Self {
        Self {
            max_depth: usize::MAX,
        }
    }

    pub(crate) fn check(&self, depth: usize, at: &str) -> Result<(), TreeError> {
        if depth > self.max_depth {
            return Err(TreeError::DepthExceeded {
                limit: self.max_depth,
                at: at.to_string(),
            });
        }
        Ok(())
    }
}

/// Index of a node inside a [`Forest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

#[derive(Debug, Clone)]
struct Slot {
    /// The node's own fields; `children` is always empty here
    node: CategoryNode,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
    depth: usize,
}

/// Arena of category nodes indexed by id
///
/// Slots are allocated in pre-order, so iterating indexes in ascending
/// order visits every node before its subtree.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    slots: Vec<Slot>,
    roots: Vec<NodeIndex>,
    by_id: HashMap<NodeId, NodeIndex>,
}

impl Forest {
    /// Move a nested forest into the arena
    ///
    /// Back-references are recomputed from structure; whatever `parent`
    /// the stored documents carried is discarded. When two nodes share an
    /// id, lookups resolve to the first in pre-order.
    ///
    /// # Errors
    ///
    /// `DepthExceeded` past `limits.max_depth`, `CycleDetected` when a node
    /// repeats the id of one of its ancestors.
    pub fn from_roots(roots: Vec<CategoryNode>, limits: TreeLimits) -> Result<Self, TreeError> {
        let mut forest = Forest::default();
        let mut stack: Vec<(CategoryNode, Option<NodeIndex>, usize)> =
            roots.into_iter().rev().map(|n| (n, None, 0)).collect();

        while let Some((mut node, parent, depth)) = stack.pop() {
            limits.check(depth, &node.name)?;
            if forest.on_ancestor_path(parent, &node.id) {
                return Err(TreeError::CycleDetected { id: node.id });
            }

            let idx = NodeIndex(forest.slots.len());
            let children = std::mem::take(&mut node.children);
            node.parent = parent.map(|p| forest.slots[p.0].node.id.clone());

            forest.by_id.entry(node.id.clone()).or_insert(idx);
            match parent {
                Some(p) => forest.slots[p.0].children.push(idx),
                None => forest.roots.push(idx),
            }
            forest.slots.push(Slot {
                node,
                parent,
                children: Vec::with_capacity(children.len()),
                depth,
            });

            for child in children.into_iter().rev() {
                stack.push((child, Some(idx), depth + 1));
            }
        }

        Ok(forest)
    }

    fn on_ancestor_path(&self, mut cursor: Option<NodeIndex>, id: &NodeId) -> bool {
        while let Some(idx) = cursor {
            let slot = &self.slots[idx.0];
            if &slot.node.id == id {
                return true;
            }
            cursor = slot.parent;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    /// First node in pre-order carrying `id`
    pub fn find(&self, id: &NodeId) -> Option<NodeIndex> {
        self.by_id.get(id).copied()
    }

    /// Like [`find`](Self::find) but reporting `NotFound`
    pub fn require(&self, id: &NodeId) -> Result<NodeIndex, TreeError> {
        self.find(id).ok_or_else(|| TreeError::not_found(id))
    }

    /// The node's own fields (its `children` list is empty in the arena)
    pub fn node(&self, idx: NodeIndex) -> &CategoryNode {
        &self.slots[idx.0].node
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.slots[idx.0].parent
    }

    pub fn children(&self, idx: NodeIndex) -> &[NodeIndex] {
        &self.slots[idx.0].children
    }

    pub fn depth(&self, idx: NodeIndex) -> usize {
        self.slots[idx.0].depth
    }

    /// All nodes, each before its subtree
    pub fn pre_order(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        (0..self.slots.len()).map(NodeIndex)
    }

    /// The chain from `idx` up to its root, nearest first
    pub fn ancestors(&self, idx: NodeIndex) -> Ancestors<'_> {
        Ancestors {
            forest: self,
            cursor: Some(idx),
        }
    }

    /// Rebuild the nested subtree rooted at `idx`
    pub fn subtree(&self, idx: NodeIndex) -> CategoryNode {
        let mut node = self.slots[idx.0].node.clone();
        node.children = self.slots[idx.0]
            .children
            .iter()
            .map(|&c| self.subtree(c))
            .collect();
        node
    }

    /// Move the arena back into nested roots
    pub fn into_roots(self) -> Vec<CategoryNode> {
        let Forest { slots, roots, .. } = self;
        let links: Vec<Vec<NodeIndex>> = slots.iter().map(|s| s.children.clone()).collect();
        let mut built: Vec<Option<CategoryNode>> = slots.into_iter().map(|s| Some(s.node)).collect();

        // Children always sit at higher indexes than their parent
        for i in (0..built.len()).rev() {
            let children: Vec<CategoryNode> = links[i]
                .iter()
                .filter_map(|c| built[c.0].take())
                .collect();
            if let Some(node) = built[i].as_mut() {
                node.children = children;
            }
        }

        roots.iter().filter_map(|r| built[r.0].take()).collect()
    }
}

/// Iterator over a node and its ancestors, see [`Forest::ancestors`]
pub struct Ancestors<'a> {
    forest: &'a Forest,
    cursor: Option<NodeIndex>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<NodeIndex> {
        let current = self.cursor?;
        self.cursor = self.forest.parent(current);
        Some(current)
    }
}
