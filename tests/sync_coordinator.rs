//! Coordinator scenarios against the in-memory store

use serde_json::json;

use repertoire::grid::{ColumnFilter, SortKey, TextOperator};
use repertoire::store::SubtreeWrite;
use repertoire::{
    parse_batch, CategoryInput, CategoryNode, CategoryStore, GridQuery, MemoryStore, NodeId,
    StoreError, SyncCoordinator, TaxonomyConfig, TreeError,
};

// ============================================================================
// Fixtures
// ============================================================================

fn seeded() -> MemoryStore {
    MemoryStore::with_forest(vec![
        CategoryNode::new("Sicilian")
            .with_id("s")
            .with_create_uuid("s1")
            .with_translation("fr", "Sicilienne")
            .with_ai_config(json!({"systemPrompt": "S", "modelParams": {"a": 1}}).as_object().cloned().unwrap())
            .with_child(
                CategoryNode::new("Najdorf")
                    .with_id("n")
                    .with_create_uuid("n1")
                    .with_ai_config(json!({"modelParams": {"b": 2}}).as_object().cloned().unwrap())
                    .with_child(CategoryNode::new("English Attack").with_id("ea").with_create_uuid("ea1")),
            )
            .with_child(CategoryNode::new("Dragon").with_id("d").with_create_uuid("d1")),
        CategoryNode::new("French").with_id("f").with_create_uuid("f1"),
    ])
}

fn coordinator(store: &MemoryStore) -> SyncCoordinator<&MemoryStore> {
    SyncCoordinator::new(store, TaxonomyConfig::default())
}

/// Fails every document write whose root is named `poison`
struct FlakyStore {
    inner: MemoryStore,
    poison: &'static str,
}

impl CategoryStore for FlakyStore {
    fn load_forest(&self) -> Result<Vec<CategoryNode>, StoreError> {
        self.inner.load_forest()
    }

    fn persist_subtree(
        &self,
        root_id: &NodeId,
        write: SubtreeWrite,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError> {
        if let SubtreeWrite::Document(doc) = &write {
            if doc.name == self.poison {
                return Err(StoreError::Unavailable("connection reset".to_string()));
            }
        }
        self.inner.persist_subtree(root_id, write, expected_version)
    }

    fn append_child(&self, parent_id: &NodeId, child: CategoryNode) -> Result<(), StoreError> {
        self.inner.append_child(parent_id, child)
    }
}

/// Serves a snapshot taken before another writer touched the store
struct LaggingStore {
    inner: MemoryStore,
    stale: Vec<CategoryNode>,
}

impl CategoryStore for LaggingStore {
    fn load_forest(&self) -> Result<Vec<CategoryNode>, StoreError> {
        Ok(self.stale.clone())
    }

    fn persist_subtree(
        &self,
        root_id: &NodeId,
        write: SubtreeWrite,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError> {
        self.inner.persist_subtree(root_id, write, expected_version)
    }

    fn append_child(&self, parent_id: &NodeId, child: CategoryNode) -> Result<(), StoreError> {
        self.inner.append_child(parent_id, child)
    }
}

// ============================================================================
// Batches
// ============================================================================

#[test]
fn test_sync_create_skips_existing_names() {
    let store = seeded();
    let report = coordinator(&store).sync_create(&[
        CategoryInput::named("Sicilian"),
        CategoryInput::named("Caro-Kann"),
        CategoryInput::default(),
    ]);

    assert_eq!(report.existing.len(), 1);
    assert_eq!(report.existing[0].id.as_str(), "s");
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.errors.len(), 1, "A nameless descriptor is a per-item failure");
    assert_eq!(report.errors[0].name, "");
    assert_eq!(report.processed(), 3);

    let names: Vec<String> = store.snapshot().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["Sicilian", "French", "Caro-Kann"]);
}

#[test]
fn test_sync_tree_reconciles_by_create_uuid() {
    let store = seeded();
    let incoming = CategoryInput::named("Sicilian Defence")
        .with_create_uuid("s1")
        .with_children(vec![
            CategoryInput::named("Dragon").with_create_uuid("d1"),
            CategoryInput::named("Kan"),
        ]);
    let report = coordinator(&store).sync_tree(&[incoming, CategoryInput::named("Pirc")]);

    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.created.len(), 1);
    assert!(!report.has_errors());

    let roots = store.snapshot();
    let sicilian = &roots[0];
    assert_eq!(sicilian.id.as_str(), "s");
    assert_eq!(sicilian.name, "Sicilian Defence");
    assert_eq!(sicilian.version, Some(2));

    let children: Vec<(&str, bool)> = sicilian
        .children
        .iter()
        .map(|c| (c.name.as_str(), c.active))
        .collect();
    assert_eq!(
        children,
        vec![("Dragon", true), ("Kan", true), ("Najdorf", false)],
        "Najdorf was omitted and should be kept inactive"
    );
    assert_eq!(roots[2].name, "Pirc");
}

#[test]
fn test_sync_create_never_replaces_root_with_same_id() {
    let store = seeded();
    let descriptor: CategoryInput =
        serde_json::from_value(json!({"id": "s", "name": "Sicilian Defence"})).unwrap();
    let report = coordinator(&store).sync_create(&[descriptor]);

    assert_eq!(report.created.len(), 0);
    assert_eq!(report.existing.len(), 1);
    assert!(!report.has_errors());

    let roots = store.snapshot();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0].name, "Sicilian");
    assert_eq!(roots[0].children.len(), 2, "Stored subtree must survive");
}

#[test]
fn test_sync_tree_matches_root_by_id_when_uuid_differs() {
    let store = seeded();
    let descriptor: CategoryInput = serde_json::from_value(json!({
        "id": {"$oid": "S"},
        "name": "Sicilian Defence",
        "createUuid": "not-s1"
    }))
    .unwrap();
    let report = coordinator(&store).sync_tree(&[descriptor]);

    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.created.len(), 0);

    let root = &store.snapshot()[0];
    assert_eq!(root.id.as_str(), "s");
    assert_eq!(root.create_uuid.as_deref(), Some("s1"));
    assert_eq!(root.name, "Sicilian Defence");
    assert_eq!(root.children.len(), 2);
}

#[test]
fn test_new_root_cannot_reuse_nested_id() {
    let store = seeded();
    let descriptor: CategoryInput =
        serde_json::from_value(json!({"id": "n", "name": "Najdorf Sicilian"})).unwrap();
    let report = coordinator(&store).sync_tree(&[descriptor]);

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].name, "Najdorf Sicilian");
    assert_eq!(store.snapshot().len(), 2);
}

#[test]
fn test_batch_continues_after_store_failure() {
    let store = FlakyStore {
        inner: MemoryStore::new(),
        poison: "Alekhine",
    };
    let report = SyncCoordinator::new(&store, TaxonomyConfig::default()).sync_create(&[
        CategoryInput::named("Alekhine"),
        CategoryInput::named("Scandinavian"),
    ]);

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].name, "Alekhine");
    assert!(report.errors[0].error.contains("connection reset"));
    assert_eq!(report.created.len(), 1);
    assert_eq!(store.inner.snapshot()[0].name, "Scandinavian");
}

#[test]
fn test_parse_batch_requires_array() {
    let err = parse_batch(json!({"name": "Sicilian"})).unwrap_err();
    assert!(matches!(err, TreeError::BadInput { ref field, .. } if field == "categories"));

    let parsed = parse_batch(json!([{"name": "Sicilian", "children": [{"name": "Dragon"}]}])).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].children.as_ref().map(Vec::len), Some(1));
}

// ============================================================================
// Single-node writes
// ============================================================================

#[test]
fn test_ensure_subcategory_is_idempotent() {
    let store = seeded();
    let sync = coordinator(&store);

    let first = sync.ensure_subcategory("Najdorf", "Poisoned Pawn").unwrap();
    assert!(first.created);
    assert_eq!(first.node.parent(), Some(&NodeId::from("n")));

    let second = sync.ensure_subcategory(" Najdorf ", "Poisoned Pawn").unwrap();
    assert!(!second.created);
    assert_eq!(second.node.id, first.node.id);

    let najdorf = &store.snapshot()[0].children[0];
    assert_eq!(najdorf.children.len(), 2, "Only one child should have been appended");
}

#[test]
fn test_ensure_subcategory_errors() {
    let store = seeded();
    let sync = coordinator(&store);

    let err = sync.ensure_subcategory("Dutch", "Leningrad").unwrap_err();
    assert!(matches!(err, TreeError::NotFound { ref id } if id == "Dutch"));

    let err = sync.ensure_subcategory("  ", "Leningrad").unwrap_err();
    assert!(matches!(err, TreeError::BadInput { ref field, .. } if field == "parent"));

    let err = sync.ensure_subcategory("Sicilian", "").unwrap_err();
    assert!(matches!(err, TreeError::BadInput { ref field, .. } if field == "name"));
}

#[test]
fn test_update_nested_category() {
    let store = seeded();
    let input = CategoryInput {
        name: Some("Dragon Variation".to_string()),
        ..Default::default()
    };
    let updated = coordinator(&store)
        .update_category(&NodeId::from("D"), &input)
        .unwrap();
    assert_eq!(updated.id.as_str(), "d");
    assert_eq!(updated.name, "Dragon Variation");

    let root = &store.snapshot()[0];
    assert_eq!(root.version, Some(2));
    assert_eq!(root.name, "Sicilian");
    assert_eq!(root.children[1].name, "Dragon Variation");
    assert_eq!(root.children[0].children.len(), 1, "Siblings keep their subtrees");
}

#[test]
fn test_update_unknown_id() {
    let store = seeded();
    let err = coordinator(&store)
        .update_category(&NodeId::from("zz"), &CategoryInput::named("x"))
        .unwrap_err();
    assert!(matches!(err, TreeError::NotFound { .. }));
}

#[test]
fn test_deactivate_keeps_subtree() {
    let store = seeded();
    let node = coordinator(&store).deactivate(&NodeId::from("n")).unwrap();
    assert!(!node.active && !node.is_active);
    assert_eq!(node.children.len(), 1);

    let stored = &store.snapshot()[0].children[0];
    assert!(!stored.active && !stored.is_active);
    assert!(stored.children[0].active, "Descendants are not touched");
}

#[test]
fn test_stale_write_is_rejected() {
    let inner = seeded();
    let stale = inner.snapshot();
    coordinator(&inner)
        .update_category(&NodeId::from("s"), &CategoryInput::named("Sicilian Defence"))
        .unwrap();

    let store = LaggingStore { inner, stale };
    let err = SyncCoordinator::new(&store, TaxonomyConfig::default())
        .update_category(&NodeId::from("d"), &CategoryInput::named("Dragon"))
        .unwrap_err();
    assert!(matches!(err, TreeError::StaleWrite { ref root_id, .. } if root_id.as_str() == "s"));
    assert_eq!(store.inner.snapshot()[0].name, "Sicilian Defence");
}

// ============================================================================
// Reads
// ============================================================================

#[test]
fn test_search_names_and_translations() {
    let store = seeded();
    let sync = coordinator(&store);

    let hits = sync.search("NAJ").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].breadcrumb, "Sicilian > Najdorf");

    let hits = sync.search("sicilienne").unwrap();
    assert_eq!(hits[0].id().as_str(), "s");

    assert_eq!(sync.search("ab").unwrap().len(), 0);
    let err = sync.search(" a ").unwrap_err();
    assert!(matches!(err, TreeError::BadInput { ref field, .. } if field == "q"));
}

#[test]
fn test_grid_window_and_total() {
    let roots = (0..10)
        .map(|i| CategoryNode::new(format!("line {i}")).with_id(format!("l{i}")))
        .collect();
    let store = MemoryStore::with_forest(roots);
    let sync = coordinator(&store);

    let page = sync.grid(&GridQuery::window(0, 2)).unwrap();
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.last_row, 10);

    let page = sync.grid(&GridQuery::window(50, 60)).unwrap();
    assert!(page.rows.is_empty());
    assert_eq!(page.last_row, 10);

    let query = GridQuery::window(0, 3)
        .filter(
            "name",
            ColumnFilter::Text {
                operator: TextOperator::EndsWith,
                filter: Some(json!("7")),
            },
        )
        .sort(SortKey::desc("name"));
    let page = sync.grid(&query).unwrap();
    assert_eq!(page.last_row, 1);
    assert_eq!(page.rows[0].name(), "line 7");
}

#[test]
fn test_grid_over_tree_columns() {
    let store = seeded();
    let query: GridQuery = serde_json::from_value(json!({
        "startRow": 0,
        "endRow": 10,
        "filterModel": {"depth": {"filterType": "number", "type": "greaterThan", "filter": 0}},
        "sortModel": [{"colId": "breadcrumb", "sort": "asc"}]
    }))
    .unwrap();
    let page = coordinator(&store).grid(&query).unwrap();
    let crumbs: Vec<&str> = page.rows.iter().map(|r| r.breadcrumb.as_str()).collect();
    assert_eq!(
        crumbs,
        vec![
            "Sicilian > Dragon",
            "Sicilian > Najdorf",
            "Sicilian > Najdorf > English Attack"
        ]
    );
}

#[test]
fn test_resolve_config_through_store() {
    let store = seeded();
    let sync = coordinator(&store);

    let config = sync.resolve_config(&NodeId::from("ea")).unwrap();
    assert_eq!(config["systemPrompt"], json!("S"));
    assert_eq!(config["modelParams"], json!({"a": 1, "b": 2}));

    assert!(sync.resolve_config(&NodeId::from("f")).unwrap().is_empty());
    assert!(matches!(
        sync.resolve_config(&NodeId::from("missing")),
        Err(TreeError::NotFound { .. })
    ));
}

#[test]
fn test_find_returns_subtree() {
    let store = seeded();
    let node = coordinator(&store).find(&NodeId::from("n")).unwrap();
    assert_eq!(node.name, "Najdorf");
    assert_eq!(node.children[0].name, "English Attack");
}
