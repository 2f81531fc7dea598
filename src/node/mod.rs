//! Category node records.
//!
//! [`CategoryNode`] is the stored shape: a strongly typed recursive record
//! whose children are owned exclusively by their parent. [`CategoryInput`]
//! is the shape callers submit for creates and updates. It has no `parent`
//! field at all, so a back-reference can only ever be computed from tree
//! structure, never taken from a payload.

pub mod id;

pub use id::NodeId;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inheritable configuration object (`aiConfig`)
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Language code to localized name
pub type Translations = BTreeMap<String, String>;

fn default_true() -> bool {
    true
}

/// A category in the taxonomy, with its owned subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_created_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) parent: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CategoryNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_config: Option<ConfigMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<Translations>,
    /// Optimistic concurrency token, carried by root documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl CategoryNode {
    /// A bare active node with a generated id and no provenance
    ///
    /// Mostly useful for fixtures; production nodes come from
    /// [`create_fresh`](crate::reconcile::Reconciler::create_fresh).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::generate(),
            name: name.into(),
            active: true,
            is_active: true,
            create_uuid: None,
            created_date: None,
            create_created_date: None,
            modified_date: None,
            parent: None,
            children: Vec::new(),
            ai_config: None,
            translations: None,
            version: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_create_uuid(mut self, create_uuid: impl Into<String>) -> Self {
        self.create_uuid = Some(create_uuid.into());
        self
    }

    pub fn with_ai_config(mut self, config: ConfigMap) -> Self {
        self.ai_config = Some(config);
        self
    }

    pub fn with_translation(mut self, lang: impl Into<String>, name: impl Into<String>) -> Self {
        self.translations
            .get_or_insert_with(Translations::new)
            .insert(lang.into(), name.into());
        self
    }

    /// Append a child, linking its back-reference to this node
    pub fn with_child(mut self, mut child: CategoryNode) -> Self {
        child.parent = Some(self.id.clone());
        self.children.push(child);
        self
    }

    /// Id of the owning node, as last computed from structure
    pub fn parent(&self) -> Option<&NodeId> {
        self.parent.as_ref()
    }

    /// Copy of this node's own fields, without its subtree
    pub fn shallow_clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            active: self.active,
            is_active: self.is_active,
            create_uuid: self.create_uuid.clone(),
            created_date: self.created_date,
            create_created_date: self.create_created_date,
            modified_date: self.modified_date,
            parent: self.parent.clone(),
            children: Vec::new(),
            ai_config: self.ai_config.clone(),
            translations: self.translations.clone(),
            version: self.version,
        }
    }

    /// Number of nodes in this subtree, including this one
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// Externally supplied descriptor for creating or updating a category
///
/// Every field is optional so partial trees can be submitted. `children:
/// None` leaves the existing children untouched; `Some(list)` is the full
/// child list to reconcile against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_created_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_config: Option<ConfigMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<Translations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<CategoryInput>>,
}

impl CategoryInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_create_uuid(mut self, create_uuid: impl Into<String>) -> Self {
        self.create_uuid = Some(create_uuid.into());
        self
    }

    pub fn with_children(mut self, children: Vec<CategoryInput>) -> Self {
        self.children = Some(children);
        self
    }

    /// Name of the descriptor for error reporting, `""` when absent
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// A stored node as a full descriptor: every field supplied, children
/// included. The back-reference and version token are dropped.
impl From<CategoryNode> for CategoryInput {
    fn from(node: CategoryNode) -> Self {
        Self {
            id: Some(node.id),
            name: Some(node.name),
            active: Some(node.active),
            is_active: Some(node.is_active),
            create_uuid: node.create_uuid,
            created_date: node.created_date,
            create_created_date: node.create_created_date,
            ai_config: node.ai_config,
            translations: node.translations,
            children: Some(node.children.into_iter().map(CategoryInput::from).collect()),
        }
    }
}
