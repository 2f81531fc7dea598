//! Store-backed operations over the category forest.
//!
//! Every operation reloads the forest, computes against it, and writes back
//! only the root document it touched. Batches run their descriptors one at
//! a time; a failing descriptor is recorded in the [`BatchReport`] and the
//! rest still run, with nothing rolled back.

use serde::Serialize;
use serde_json::Value;

use crate::config::TaxonomyConfig;
use crate::error::TreeError;
use crate::grid::{GridPage, GridQuery, GridQueryEngine};
use crate::inherit::{ConfigResolver, ConfigSchema};
use crate::node::{CategoryInput, CategoryNode, ConfigMap, NodeId};
use crate::reconcile::{relink, Reconciler};
use crate::store::{CategoryStore, SubtreeWrite};
use crate::tree::{locate, FlatRow, Forest, TreeLimits};

/// A batch item that failed, keyed by the descriptor's name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of a batch operation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub created: Vec<CategoryNode>,
    pub updated: Vec<CategoryNode>,
    /// Matches left untouched by the create-only path
    pub existing: Vec<CategoryNode>,
    pub errors: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.created.len() + self.updated.len() + self.existing.len() + self.errors.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Result of a single-item create-or-update
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Created(CategoryNode),
    Updated(CategoryNode),
    Existing(CategoryNode),
}

/// Result of [`SyncCoordinator::ensure_subcategory`]
#[derive(Debug, Clone, PartialEq)]
pub struct Ensured {
    pub node: CategoryNode,
    pub created: bool,
}

/// Parse a bulk payload; anything but a JSON array is `BadInput`
pub fn parse_batch(payload: Value) -> Result<Vec<CategoryInput>, TreeError> {
    if !payload.is_array() {
        return Err(TreeError::bad_input(
            "categories",
            "expected an array of category descriptors",
        ));
    }
    Ok(serde_json::from_value(payload)?)
}

/// Drives reconciliation, lookup and queries against a [`CategoryStore`]
pub struct SyncCoordinator<S> {
    store: S,
    config: TaxonomyConfig,
    reconciler: Reconciler,
    resolver: ConfigResolver,
    engine: GridQueryEngine,
}

impl<S: CategoryStore> SyncCoordinator<S> {
    pub fn new(store: S, config: TaxonomyConfig) -> Self {
        let limits = config.limits();
        Self {
            reconciler: Reconciler::new(limits),
            resolver: ConfigResolver::new(ConfigSchema::ai_config(), limits),
            engine: GridQueryEngine::new(config.default_page_size),
            store,
            config,
        }
    }

    /// Replace the `aiConfig` merge schema
    pub fn with_schema(mut self, schema: ConfigSchema) -> Self {
        self.resolver = ConfigResolver::new(schema, self.limits());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &TaxonomyConfig {
        &self.config
    }

    fn limits(&self) -> TreeLimits {
        self.config.limits()
    }

    fn load(&self) -> Result<Vec<CategoryNode>, TreeError> {
        Ok(self.store.load_forest()?)
    }

    fn load_arena(&self) -> Result<Forest, TreeError> {
        Forest::from_roots(self.load()?, self.limits())
    }

    /// Create-only bulk import, matching roots by `name`
    ///
    /// A descriptor whose name (or explicit `id`) already exists among the
    /// roots is reported under `existing` and not modified.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(items = descriptors.len())))]
    pub fn sync_create(&self, descriptors: &[CategoryInput]) -> BatchReport {
        self.run_batch(descriptors, |d| self.create_root_if_missing(d))
    }

    /// Structural sync, matching roots by `createUuid`, then by explicit `id`
    ///
    /// Matches are reconciled (orphaned children deactivated); unmatched
    /// descriptors become new root documents.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(items = descriptors.len())))]
    pub fn sync_tree(&self, descriptors: &[CategoryInput]) -> BatchReport {
        self.run_batch(descriptors, |d| self.sync_root(d))
    }

    fn run_batch<F>(&self, descriptors: &[CategoryInput], mut apply: F) -> BatchReport
    where
        F: FnMut(&CategoryInput) -> Result<Applied, TreeError>,
    {
        let mut report = BatchReport::default();
        for descriptor in descriptors {
            match apply(descriptor) {
                Ok(Applied::Created(node)) => report.created.push(node),
                Ok(Applied::Updated(node)) => report.updated.push(node),
                Ok(Applied::Existing(node)) => report.existing.push(node),
                Err(err) => {
                    log::warn!("Batch item '{}' failed: {}", descriptor.label(), err);
                    #[cfg(feature = "metrics")]
                    crate::metrics::METRICS.record_batch_failure();
                    report.errors.push(BatchFailure {
                        name: descriptor.label().to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }
        log::info!(
            "Batch finished: {} created, {} updated, {} existing, {} failed",
            report.created.len(),
            report.updated.len(),
            report.existing.len(),
            report.errors.len()
        );
        report
    }

    fn create_root_if_missing(&self, descriptor: &CategoryInput) -> Result<Applied, TreeError> {
        let name = descriptor
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| TreeError::bad_input("name", "descriptor has no name"))?;

        let roots = self.load()?;
        let found = match roots.iter().find(|r| r.name == name) {
            Some(root) => Some(root),
            None => self.claimed_root(&roots, descriptor)?,
        };
        if let Some(found) = found {
            log::debug!("Category '{}' already exists as {}", name, found.id);
            return Ok(Applied::Existing(found.clone()));
        }

        let node = self.reconciler.create_fresh(descriptor)?;
        self.store
            .persist_subtree(&node.id, SubtreeWrite::Document(node.clone()), None)?;
        Ok(Applied::Created(node))
    }

    fn sync_root(&self, descriptor: &CategoryInput) -> Result<Applied, TreeError> {
        let roots = self.load()?;
        let counterpart = match descriptor
            .create_uuid
            .as_deref()
            .and_then(|uuid| roots.iter().find(|r| r.create_uuid.as_deref() == Some(uuid)))
        {
            Some(root) => Some(root),
            None => self.claimed_root(&roots, descriptor)?,
        };

        match counterpart {
            Some(existing) => {
                let merged = self.reconciler.merge(existing, descriptor)?;
                self.store.persist_subtree(
                    &merged.id,
                    SubtreeWrite::Document(merged.clone()),
                    existing.version,
                )?;
                Ok(Applied::Updated(merged))
            }
            None => {
                let node = self.reconciler.create_fresh(descriptor)?;
                self.store
                    .persist_subtree(&node.id, SubtreeWrite::Document(node.clone()), None)?;
                Ok(Applied::Created(node))
            }
        }
    }

    /// The root a descriptor addresses through its explicit `id`, if any
    ///
    /// A new root may not reuse the id of a nested category, so that case
    /// is `BadInput`.
    fn claimed_root<'r>(
        &self,
        roots: &'r [CategoryNode],
        descriptor: &CategoryInput,
    ) -> Result<Option<&'r CategoryNode>, TreeError> {
        let Some(id) = descriptor.id.as_ref().filter(|id| !id.is_blank()) else {
            return Ok(None);
        };
        match locate::find_path(roots, id, self.limits()) {
            Ok(path) if path.len() == 1 => Ok(roots.get(path[0])),
            Ok(_) => Err(TreeError::bad_input(
                "id",
                format!("{id} already belongs to a nested category"),
            )),
            Err(TreeError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Return the child named `child_name` under the category named
    /// `parent_name`, creating it if absent
    ///
    /// The parent is the first category with that exact name in pre-order.
    /// Creation appends the one child through the store's append primitive
    /// rather than rewriting the parent's subtree.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn ensure_subcategory(
        &self,
        parent_name: &str,
        child_name: &str,
    ) -> Result<Ensured, TreeError> {
        let parent_name = parent_name.trim();
        let child_name = child_name.trim();
        if parent_name.is_empty() {
            return Err(TreeError::bad_input("parent", "parent category name is required"));
        }
        if child_name.is_empty() {
            return Err(TreeError::bad_input("name", "subcategory name is required"));
        }

        let roots = self.load()?;
        let parent = locate::find_by_name(&roots, parent_name, self.limits())?
            .ok_or_else(|| TreeError::not_found(parent_name))?;

        if let Some(existing) = parent.children.iter().find(|c| c.name == child_name) {
            return Ok(Ensured {
                node: existing.clone(),
                created: false,
            });
        }

        let mut child = self.reconciler.create_fresh(&CategoryInput::named(child_name))?;
        child.parent = Some(parent.id.clone());
        self.store.append_child(&parent.id, child.clone())?;
        log::info!("Created subcategory '{}' under '{}'", child_name, parent_name);
        Ok(Ensured {
            node: child,
            created: true,
        })
    }

    /// Reconcile one node, anywhere in the forest, against `input`
    ///
    /// Roots are written back as whole documents; deeper nodes by replacing
    /// their root's `children` array.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, input)))]
    pub fn update_category(
        &self,
        id: &NodeId,
        input: &CategoryInput,
    ) -> Result<CategoryNode, TreeError> {
        let mut roots = self.load()?;
        let path = locate::find_path(&roots, id, self.limits())?;
        let existing = locate::node_at_path(&roots, &path).ok_or_else(|| TreeError::not_found(id))?;
        let merged = self.reconciler.merge(existing, input)?;

        let root_index = path[0];
        let root_id = roots[root_index].id.clone();
        let root_version = roots[root_index].version;

        if path.len() == 1 {
            self.store.persist_subtree(
                &root_id,
                SubtreeWrite::Document(merged.clone()),
                root_version,
            )?;
        } else {
            let slot = locate::node_at_path_mut(&mut roots, &path)
                .ok_or_else(|| TreeError::not_found(id))?;
            *slot = merged.clone();
            let root = &mut roots[root_index];
            relink(root);
            let children = std::mem::take(&mut root.children);
            self.store
                .persist_subtree(&root_id, SubtreeWrite::Children(children), root_version)?;
        }

        Ok(merged)
    }

    /// Soft delete: clear both visibility flags, keep the node and its subtree
    pub fn deactivate(&self, id: &NodeId) -> Result<CategoryNode, TreeError> {
        let input = CategoryInput {
            active: Some(false),
            is_active: Some(false),
            ..Default::default()
        };
        self.update_category(id, &input)
    }

    /// Every node as a grid row, in pre-order
    pub fn flat_rows(&self) -> Result<Vec<FlatRow>, TreeError> {
        Ok(self.load_arena()?.flatten())
    }

    /// Filtered, sorted window over the flattened forest
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn grid(&self, query: &GridQuery) -> Result<GridPage<FlatRow>, TreeError> {
        Ok(self.engine.run(self.flat_rows()?, query))
    }

    /// Rows whose name or any translation contains `term`, ignoring case
    ///
    /// # Errors
    ///
    /// `BadInput` when the trimmed term is shorter than
    /// `search_min_chars` characters.
    pub fn search(&self, term: &str) -> Result<Vec<FlatRow>, TreeError> {
        let term = term.trim();
        if term.chars().count() < self.config.search_min_chars {
            return Err(TreeError::bad_input(
                "q",
                format!(
                    "search term must be at least {} characters",
                    self.config.search_min_chars
                ),
            ));
        }
        let needle = term.to_lowercase();
        let hit = |text: &str| text.to_lowercase().contains(&needle);

        Ok(self
            .flat_rows()?
            .into_iter()
            .filter(|row| {
                hit(&row.node.name)
                    || row
                        .node
                        .translations
                        .as_ref()
                        .is_some_and(|t| t.values().any(|v| hit(v)))
            })
            .collect())
    }

    /// Effective `aiConfig` for the node with `id`
    pub fn resolve_config(&self, id: &NodeId) -> Result<ConfigMap, TreeError> {
        let forest = self.load_arena()?;
        self.resolver.resolve_by_id(&forest, id)
    }

    /// The node with `id` and its subtree
    pub fn find(&self, id: &NodeId) -> Result<CategoryNode, TreeError> {
        let roots = self.load()?;
        locate::find_by_id(&roots, id, self.limits()).cloned()
    }
}
