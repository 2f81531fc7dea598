//! Pre-order flattening of a forest into grid rows.

use serde::Serialize;

use crate::error::TreeError;
use crate::node::{CategoryNode, NodeId};
use crate::tree::{Forest, TreeLimits};

/// Separator between breadcrumb segments
pub const BREADCRUMB_SEPARATOR: &str = " > ";

/// One node as a flat grid row
///
/// Serializes as the node's own fields (children omitted) plus `depth`,
/// `breadcrumb` and `childCount`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatRow {
    #[serde(flatten)]
    pub node: CategoryNode,
    pub depth: usize,
    pub breadcrumb: String,
    pub child_count: usize,
}

fn breadcrumb_of(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(crumb) => format!("{crumb}{BREADCRUMB_SEPARATOR}{name}"),
        None => name.to_string(),
    }
}

/// Flatten a nested forest without consuming it
///
/// Each node is emitted immediately before its entire subtree; roots get
/// depth 0 and their own name as breadcrumb. The input is never modified.
///
/// # Example
///
/// ```
/// use repertoire::{flatten, CategoryNode, TreeLimits};
///
/// let roots = vec![CategoryNode::new("Sicilian").with_child(CategoryNode::new("Dragon"))];
/// let rows = flatten(&roots, TreeLimits::default()).unwrap();
/// assert_eq!(rows[1].breadcrumb, "Sicilian > Dragon");
/// assert_eq!(rows[1].depth, 1);
/// ```
pub fn flatten(roots: &[CategoryNode], limits: TreeLimits) -> Result<Vec<FlatRow>, TreeError> {
    let mut rows = Vec::new();
    // (node, depth, index of the parent's row)
    let mut stack: Vec<(&CategoryNode, usize, Option<usize>)> =
        roots.iter().rev().map(|n| (n, 0, None)).collect();

    while let Some((node, depth, parent_row)) = stack.pop() {
        limits.check(depth, &node.name)?;

        let (breadcrumb, parent_id) = match parent_row {
            Some(p) => {
                let parent: &FlatRow = &rows[p];
                (
                    breadcrumb_of(Some(&parent.breadcrumb), &node.name),
                    Some(parent.node.id.clone()),
                )
            }
            None => (breadcrumb_of(None, &node.name), None),
        };

        let mut row_node = node.shallow_clone();
        row_node.parent = parent_id;
        let row_index = rows.len();
        rows.push(FlatRow {
            node: row_node,
            depth,
            breadcrumb,
            child_count: node.children.len(),
        });

        for child in node.children.iter().rev() {
            stack.push((child, depth + 1, Some(row_index)));
        }
    }

    Ok(rows)
}

impl Forest {
    /// Flatten the arena into rows, in slot (pre-)order
    pub fn flatten(&self) -> Vec<FlatRow> {
        let mut rows: Vec<FlatRow> = Vec::with_capacity(self.len());
        for idx in self.pre_order() {
            // A parent's slot precedes its children, so its row already exists
            let parent_crumb = self.parent(idx).map(|p| rows[p.0].breadcrumb.as_str());
            let node = self.node(idx);
            let breadcrumb = breadcrumb_of(parent_crumb, &node.name);
            rows.push(FlatRow {
                node: node.shallow_clone(),
                depth: self.depth(idx),
                breadcrumb,
                child_count: self.children(idx).len(),
            });
        }
        rows
    }
}

impl FlatRow {
    pub fn id(&self) -> &NodeId {
        &self.node.id
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sicilian() -> CategoryNode {
        CategoryNode::new("Sicilian")
            .with_id("s")
            .with_child(
                CategoryNode::new("Najdorf")
                    .with_id("n")
                    .with_child(CategoryNode::new("Poisoned Pawn").with_id("pp")),
            )
            .with_child(CategoryNode::new("Dragon").with_id("d"))
    }

    #[test]
    fn test_single_child_scenario() {
        let roots = vec![CategoryNode::new("Sicilian").with_child(CategoryNode::new("Dragon"))];
        let rows = flatten(&roots, TreeLimits::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].name(), rows[0].depth, rows[0].breadcrumb.as_str()), ("Sicilian", 0, "Sicilian"));
        assert_eq!(
            (rows[1].name(), rows[1].depth, rows[1].breadcrumb.as_str()),
            ("Dragon", 1, "Sicilian > Dragon")
        );
    }

    #[test]
    fn test_row_count_and_breadcrumb_chain() {
        let roots = vec![sicilian(), CategoryNode::new("French").with_id("f")];
        let total: usize = roots.iter().map(CategoryNode::subtree_len).sum();
        let rows = flatten(&roots, TreeLimits::default()).unwrap();
        assert_eq!(rows.len(), total);

        let by_id: HashMap<&str, &FlatRow> = rows.iter().map(|r| (r.id().as_str(), r)).collect();
        for row in rows.iter().filter(|r| r.depth > 0) {
            let parent = by_id[row.node.parent().unwrap().as_str()];
            assert_eq!(row.breadcrumb, format!("{} > {}", parent.breadcrumb, row.name()));
            assert_eq!(row.depth, parent.depth + 1);
        }
    }

    #[test]
    fn test_subtree_follows_its_root() {
        let rows = flatten(&[sicilian()], TreeLimits::default()).unwrap();
        let names: Vec<&str> = rows.iter().map(FlatRow::name).collect();
        assert_eq!(names, vec!["Sicilian", "Najdorf", "Poisoned Pawn", "Dragon"]);
        assert_eq!(rows[0].child_count, 2);
    }

    #[test]
    fn test_input_untouched() {
        let roots = vec![sicilian()];
        let before = roots.clone();
        let _ = flatten(&roots, TreeLimits::default()).unwrap();
        assert_eq!(roots, before);
    }

    #[test]
    fn test_arena_flatten_matches_nested_flatten() {
        let roots = vec![sicilian(), CategoryNode::new("French").with_id("f")];
        let nested = flatten(&roots, TreeLimits::default()).unwrap();
        let arena = Forest::from_roots(roots, TreeLimits::default()).unwrap().flatten();
        assert_eq!(nested, arena);
    }

    #[test]
    fn test_rows_serialize_grid_fields() {
        let rows = flatten(&[sicilian()], TreeLimits::default()).unwrap();
        let value = serde_json::to_value(&rows[1]).unwrap();
        assert_eq!(value["breadcrumb"], "Sicilian > Najdorf");
        assert_eq!(value["depth"], 1);
        assert_eq!(value["isActive"], true);
        assert!(value.get("children").is_none());
    }
}
