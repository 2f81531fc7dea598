//! Depth-first lookups over nested forests.
//!
//! All searches are pre-order and return the first match. They use an
//! explicit stack, so a deep payload costs heap rather than call stack,
//! and stop with `DepthExceeded` past [`TreeLimits::max_depth`].

use crate::error::TreeError;
use crate::node::{CategoryNode, NodeId};
use crate::tree::TreeLimits;

/// Position of a node as child indexes from the forest root list downwards
///
/// `path[0]` indexes the roots slice, each following entry indexes the
/// previous node's `children`.
pub type NodePath = Vec<usize>;

fn find_path_where<F>(
    roots: &[CategoryNode],
    limits: TreeLimits,
    mut matches: F,
) -> Result<Option<NodePath>, TreeError>
where
    F: FnMut(&CategoryNode) -> bool,
{
    let mut stack: Vec<(&CategoryNode, NodePath)> = roots
        .iter()
        .enumerate()
        .rev()
        .map(|(i, n)| (n, vec![i]))
        .collect();

    while let Some((node, path)) = stack.pop() {
        limits.check(path.len() - 1, &node.name)?;
        if matches(node) {
            return Ok(Some(path));
        }
        for (i, child) in node.children.iter().enumerate().rev() {
            let mut child_path = path.clone();
            child_path.push(i);
            stack.push((child, child_path));
        }
    }

    Ok(None)
}

/// Find the first node with `target` id anywhere in the forest
///
/// Ids compare in normalized form, so `{"$oid": "AB"}` matches `"ab"`.
///
/// # Example
///
/// ```
/// use repertoire::{CategoryNode, NodeId, TreeLimits};
/// use repertoire::tree::locate::find_by_id;
///
/// let roots = vec![CategoryNode::new("Sicilian").with_id("s")
///     .with_child(CategoryNode::new("Dragon").with_id("d"))];
/// let dragon = find_by_id(&roots, &NodeId::from("D"), TreeLimits::default()).unwrap();
/// assert_eq!(dragon.name, "Dragon");
/// ```
pub fn find_by_id<'a>(
    roots: &'a [CategoryNode],
    target: &NodeId,
    limits: TreeLimits,
) -> Result<&'a CategoryNode, TreeError> {
    let path = find_path(roots, target, limits)?;
    node_at_path(roots, &path).ok_or_else(|| TreeError::not_found(target))
}

/// Child-index path of the first node with `target` id
pub fn find_path(
    roots: &[CategoryNode],
    target: &NodeId,
    limits: TreeLimits,
) -> Result<NodePath, TreeError> {
    find_path_where(roots, limits, |n| &n.id == target)?
        .ok_or_else(|| TreeError::not_found(target))
}

/// First node whose name equals `name` exactly, at any depth
pub fn find_by_name<'a>(
    roots: &'a [CategoryNode],
    name: &str,
    limits: TreeLimits,
) -> Result<Option<&'a CategoryNode>, TreeError> {
    Ok(find_path_where(roots, limits, |n| n.name == name)?
        .and_then(|path| node_at_path(roots, &path)))
}

pub fn node_at_path<'a>(roots: &'a [CategoryNode], path: &[usize]) -> Option<&'a CategoryNode> {
    let (first, rest) = path.split_first()?;
    let mut node = roots.get(*first)?;
    for &i in rest {
        node = node.children.get(i)?;
    }
    Some(node)
}

pub fn node_at_path_mut<'a>(
    roots: &'a mut [CategoryNode],
    path: &[usize],
) -> Option<&'a mut CategoryNode> {
    let (first, rest) = path.split_first()?;
    let mut node = roots.get_mut(*first)?;
    for &i in rest {
        node = node.children.get_mut(i)?;
    }
    Some(node)
}
