//! Cascading `aiConfig` inheritance.
//!
//! A node's effective configuration is its ancestors' configs merged
//! root-first, each level overriding the accumulated result. How a key
//! merges is declared per field in a [`ConfigSchema`] rather than guessed
//! from the shape of the values at hand.
//!
//! # Example
//!
//! ```
//! use repertoire::{CategoryNode, ConfigResolver, Forest, NodeId, TreeLimits};
//! use serde_json::json;
//!
//! let obj = |v: serde_json::Value| v.as_object().cloned().unwrap();
//! let roots = vec![CategoryNode::new("Sicilian").with_id("s")
//!     .with_ai_config(obj(json!({"systemPrompt": "S", "model": "m1"})))
//!     .with_child(CategoryNode::new("Najdorf").with_id("n")
//!         .with_ai_config(obj(json!({"systemPrompt": "N"}))))];
//! let forest = Forest::from_roots(roots, TreeLimits::default()).unwrap();
//!
//! let resolved = ConfigResolver::default()
//!     .resolve_by_id(&forest, &NodeId::from("n"))
//!     .unwrap();
//! assert_eq!(resolved["systemPrompt"], "N");
//! assert_eq!(resolved["model"], "m1");
//! ```

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::error::TreeError;
use crate::node::{ConfigMap, NodeId};
use crate::tree::{Forest, NodeIndex, TreeLimits};

/// How a descendant's value for a key combines with the inherited one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// A non-null descendant value replaces the inherited value
    Override,
    /// Objects merge key by key, one level deep; nested nulls are skipped.
    /// If either side is not an object this behaves as `Override`.
    ShallowMerge,
}

/// Declared per-key merge policies for a config object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSchema {
    fields: BTreeMap<String, MergePolicy>,
    fallback: MergePolicy,
}

impl ConfigSchema {
    pub fn new(fallback: MergePolicy) -> Self {
        Self {
            fields: BTreeMap::new(),
            fallback,
        }
    }

    pub fn field(mut self, key: impl Into<String>, policy: MergePolicy) -> Self {
        self.fields.insert(key.into(), policy);
        self
    }

    /// Known `aiConfig` keys
    ///
    /// Undeclared keys fall back to `ShallowMerge`, which keeps nested
    /// objects merging per key and scalars overriding.
    pub fn ai_config() -> Self {
        Self::new(MergePolicy::ShallowMerge)
            .field("systemPrompt", MergePolicy::Override)
            .field("model", MergePolicy::Override)
            .field("temperature", MergePolicy::Override)
            .field("maxTokens", MergePolicy::Override)
            .field("language", MergePolicy::Override)
            .field("enabled", MergePolicy::Override)
            .field("modelParams", MergePolicy::ShallowMerge)
            .field("promptVariables", MergePolicy::ShallowMerge)
    }

    pub fn policy_for(&self, key: &str) -> MergePolicy {
        self.fields.get(key).copied().unwrap_or(self.fallback)
    }
}

impl Default for ConfigSchema {
    fn default() -> Self {
        Self::ai_config()
    }
}

/// Resolves effective configuration along a node's ancestor chain
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    schema: ConfigSchema,
    limits: TreeLimits,
}

impl ConfigResolver {
    pub fn new(schema: ConfigSchema, limits: TreeLimits) -> Self {
        Self { schema, limits }
    }

    pub fn schema(&self) -> &ConfigSchema {
        &self.schema
    }

    /// Effective config for the node with `id`
    pub fn resolve_by_id(&self, forest: &Forest, id: &NodeId) -> Result<ConfigMap, TreeError> {
        let idx = forest.require(id)?;
        self.resolve(forest, idx)
    }

    /// Effective config for `target`; `{}` when nothing in its chain has one
    ///
    /// # Errors
    ///
    /// `CycleDetected` if the chain revisits a node and `DepthExceeded` if it
    /// is longer than the configured limit.
    pub fn resolve(&self, forest: &Forest, target: NodeIndex) -> Result<ConfigMap, TreeError> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        for idx in forest.ancestors(target) {
            let node = forest.node(idx);
            if !seen.insert(idx) {
                return Err(TreeError::CycleDetected { id: node.id.clone() });
            }
            self.limits.check(chain.len(), &node.name)?;
            chain.push(node.ai_config.as_ref());
        }

        // Oldest ancestor first
        Ok(self.merge_layers(chain.into_iter().rev().flatten()))
    }

    /// Merge config layers, each later layer overriding the earlier ones
    pub fn merge_layers<'a, I>(&self, layers: I) -> ConfigMap
    where
        I: IntoIterator<Item = &'a ConfigMap>,
    {
        let mut resolved = ConfigMap::new();
        for layer in layers {
            self.apply(&mut resolved, layer);
        }
        resolved
    }

    fn apply(&self, acc: &mut ConfigMap, layer: &ConfigMap) {
        for (key, value) in layer {
            if value.is_null() {
                continue;
            }
            match (self.schema.policy_for(key), value) {
                (MergePolicy::ShallowMerge, Value::Object(own)) => {
                    let own = own
                        .iter()
                        .filter(|(_, v)| !v.is_null())
                        .map(|(k, v)| (k.clone(), v.clone()));
                    match acc.get_mut(key) {
                        Some(Value::Object(inherited)) => inherited.extend(own),
                        _ => {
                            acc.insert(key.clone(), Value::Object(own.collect()));
                        }
                    }
                }
                _ => {
                    acc.insert(key.clone(), value.clone());
                }
            }
        }
    }
}
