//! Identity-preserving tree reconciliation.
//!
//! [`Reconciler::merge`] folds an incoming, possibly partial descriptor into
//! an existing node:
//!
//! - `id`, `createdDate` and `createCreatedDate` always come from the
//!   existing node; `createUuid` does too unless the existing node has none.
//! - every other field supplied by the descriptor replaces the stored value.
//! - when the descriptor supplies `children`, they are matched to existing
//!   children by `createUuid` only. Matches merge recursively, unmatched
//!   descriptors become fresh nodes, and existing children left unmatched
//!   are kept with `active = false` after the supplied ones. Children that
//!   predate `createUuid` are matched by `id` instead, and a fresh node
//!   whose `id` is already taken by a sibling gets a generated one.
//! - `parent` is recomputed from structure for every node in the result.
//!
//! Merging the same descriptor twice yields the same tree apart from
//! `modifiedDate`.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::TreeError;
use crate::node::{CategoryInput, CategoryNode, NodeId};
use crate::tree::TreeLimits;

/// Counts gathered during one merge or create
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub merged: usize,
    pub created: usize,
    pub deactivated: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    limits: TreeLimits,
}

impl Reconciler {
    pub fn new(limits: TreeLimits) -> Self {
        Self { limits }
    }

    /// Reconcile `incoming` into `existing`
    ///
    /// # Errors
    ///
    /// - `BadInput` when sibling descriptors repeat a `createUuid`
    /// - `DepthExceeded` when the descriptor nests deeper than the limit
    ///
    /// # Example
    ///
    /// ```
    /// use repertoire::{CategoryInput, CategoryNode, Reconciler};
    ///
    /// let existing = CategoryNode::new("Sicilian")
    ///     .with_child(CategoryNode::new("Dragon").with_id("d").with_create_uuid("d1"))
    ///     .with_child(CategoryNode::new("Najdorf").with_id("n").with_create_uuid("n1"));
    /// let incoming = CategoryInput::named("Sicilian").with_children(vec![
    ///     CategoryInput::named("Dragon X").with_create_uuid("d1"),
    /// ]);
    ///
    /// let merged = Reconciler::default().merge(&existing, &incoming).unwrap();
    /// assert_eq!(merged.children.len(), 2);
    /// assert_eq!(merged.children[0].name, "Dragon X");
    /// assert_eq!(merged.children[0].id.as_str(), "d");
    /// assert!(!merged.children[1].active);
    /// ```
    pub fn merge(
        &self,
        existing: &CategoryNode,
        incoming: &CategoryInput,
    ) -> Result<CategoryNode, TreeError> {
        self.merge_with_stats(existing, incoming).map(|(node, _)| node)
    }

    /// [`merge`](Self::merge), also reporting what changed
    pub fn merge_with_stats(
        &self,
        existing: &CategoryNode,
        incoming: &CategoryInput,
    ) -> Result<(CategoryNode, MergeStats), TreeError> {
        let now = Utc::now();
        let mut stats = MergeStats::default();
        let mut merged = self.merge_at(existing, incoming, now, 0, &mut stats)?;
        merged.parent = existing.parent.clone();
        relink(&mut merged);

        log::debug!(
            "Reconciled category {} ({}): {} merged, {} created, {} deactivated",
            merged.id,
            merged.name,
            stats.merged,
            stats.created,
            stats.deactivated
        );
        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_merge(&stats);

        Ok((merged, stats))
    }

    /// Materialize a brand-new node (and any nested descriptors)
    ///
    /// Missing `id`/`createUuid` are generated, creation timestamps default
    /// to now and both visibility flags default to `true`. A creation
    /// timestamp carried by the descriptor is kept as provenance.
    ///
    /// # Errors
    ///
    /// `BadInput` when the top-level descriptor has no name. Nested
    /// descriptors without one get an empty name.
    pub fn create_fresh(&self, descriptor: &CategoryInput) -> Result<CategoryNode, TreeError> {
        if descriptor.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            return Err(TreeError::bad_input("name", "a new category needs a name"));
        }
        let mut stats = MergeStats::default();
        let mut node = self.create_at(descriptor, Utc::now(), 0, &mut stats)?;
        relink(&mut node);

        log::debug!("Created category {} ({}) with {} node(s)", node.id, node.name, stats.created);
        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_merge(&stats);

        Ok(node)
    }

    fn merge_at(
        &self,
        existing: &CategoryNode,
        incoming: &CategoryInput,
        now: DateTime<Utc>,
        depth: usize,
        stats: &mut MergeStats,
    ) -> Result<CategoryNode, TreeError> {
        self.limits.check(depth, &existing.name)?;

        let mut merged = existing.shallow_clone();
        if merged.create_uuid.is_none() {
            merged.create_uuid = incoming.create_uuid.clone();
        }
        if let Some(name) = &incoming.name {
            merged.name = name.clone();
        }
        if let Some(active) = incoming.active {
            merged.active = active;
        }
        if let Some(is_active) = incoming.is_active {
            merged.is_active = is_active;
        }
        if let Some(config) = &incoming.ai_config {
            merged.ai_config = Some(config.clone());
        }
        if let Some(translations) = &incoming.translations {
            merged.translations = Some(translations.clone());
        }
        merged.modified_date = Some(now);
        stats.merged += 1;

        merged.children = match &incoming.children {
            None => existing.children.clone(),
            Some(descriptors) => {
                self.reconcile_children(&existing.children, descriptors, now, depth + 1, stats)?
            }
        };

        Ok(merged)
    }

    fn reconcile_children(
        &self,
        existing: &[CategoryNode],
        descriptors: &[CategoryInput],
        now: DateTime<Utc>,
        depth: usize,
        stats: &mut MergeStats,
    ) -> Result<Vec<CategoryNode>, TreeError> {
        ensure_unique_uuids(descriptors)?;

        let mut by_uuid: HashMap<&str, usize> = HashMap::new();
        // Children stored before createUuid existed can only be matched by id
        let mut legacy_by_id: HashMap<&NodeId, usize> = HashMap::new();
        for (i, child) in existing.iter().enumerate() {
            match child.create_uuid.as_deref() {
                Some(uuid) => {
                    by_uuid.entry(uuid).or_insert(i);
                }
                None => {
                    legacy_by_id.entry(&child.id).or_insert(i);
                }
            }
        }

        let mut matched = HashSet::new();
        let mut taken: HashSet<NodeId> = existing.iter().map(|c| c.id.clone()).collect();
        let mut children = Vec::with_capacity(existing.len().max(descriptors.len()));
        for descriptor in descriptors {
            let counterpart = match descriptor.create_uuid.as_deref() {
                Some(uuid) => by_uuid.get(uuid).copied(),
                None => descriptor
                    .id
                    .as_ref()
                    .and_then(|id| legacy_by_id.get(id).copied())
                    .filter(|i| !matched.contains(i)),
            };
            match counterpart {
                Some(i) => {
                    matched.insert(i);
                    children.push(self.merge_at(&existing[i], descriptor, now, depth, stats)?);
                }
                None => {
                    let mut node = self.create_at(descriptor, now, depth, stats)?;
                    if !taken.insert(node.id.clone()) {
                        let fresh = NodeId::generate();
                        log::debug!(
                            "New category '{}' reused sibling id {}, assigned {}",
                            node.name,
                            node.id,
                            fresh
                        );
                        node.id = fresh.clone();
                        taken.insert(fresh);
                    }
                    children.push(node);
                }
            }
        }

        for (i, orphan) in existing.iter().enumerate() {
            if matched.contains(&i) {
                continue;
            }
            let mut orphan = orphan.clone();
            if orphan.active {
                orphan.active = false;
                orphan.modified_date = Some(now);
                stats.deactivated += 1;
            }
            children.push(orphan);
        }

        Ok(children)
    }

    fn create_at(
        &self,
        descriptor: &CategoryInput,
        now: DateTime<Utc>,
        depth: usize,
        stats: &mut MergeStats,
    ) -> Result<CategoryNode, TreeError> {
        let name = descriptor.name.as_deref().map(str::trim).unwrap_or("");
        self.limits.check(depth, name)?;

        let id = descriptor
            .id
            .clone()
            .filter(|id| !id.is_blank())
            .unwrap_or_else(NodeId::generate);
        let create_uuid = descriptor
            .create_uuid
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let created = descriptor.created_date.unwrap_or(now);

        let mut node = CategoryNode::new(name).with_id(id).with_create_uuid(create_uuid);
        node.active = descriptor.active.unwrap_or(true);
        node.is_active = descriptor.is_active.unwrap_or(true);
        node.created_date = Some(created);
        node.create_created_date = Some(descriptor.create_created_date.unwrap_or(created));
        node.modified_date = Some(now);
        node.ai_config = descriptor.ai_config.clone();
        node.translations = descriptor.translations.clone();
        stats.created += 1;

        if let Some(children) = &descriptor.children {
            ensure_unique_uuids(children)?;
            for child in children {
                node.children.push(self.create_at(child, now, depth + 1, stats)?);
            }
        }

        Ok(node)
    }
}

fn ensure_unique_uuids(descriptors: &[CategoryInput]) -> Result<(), TreeError> {
    let mut seen = HashSet::new();
    for uuid in descriptors.iter().filter_map(|d| d.create_uuid.as_deref()) {
        if !seen.insert(uuid) {
            return Err(TreeError::bad_input(
                "createUuid",
                format!("'{uuid}' appears more than once among siblings"),
            ));
        }
    }
    Ok(())
}

/// Recompute every back-reference below `root` from structure
pub fn relink(root: &mut CategoryNode) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let id = node.id.clone();
        for child in node.children.iter_mut() {
            child.parent = Some(id.clone());
            stack.push(child);
        }
    }
}
