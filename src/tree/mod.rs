//! Tree algebra over the bookmark forest.
//!
//! Every operation here is pure: it borrows a tree and returns a new one, leaving
//! the input untouched so earlier snapshots stay valid. Higher-level mutations
//! (delete, move, undo) are compositions of `remove`, `insert`, `update` and
//! `reindex`.

pub mod folder_paths;

use std::collections::HashMap;

use crate::types::bookmark::{Bookmark, BookmarkNode, Folder, NodeId, Tree, ROOT_ID};
use crate::types::errors::TreeError;

pub use folder_paths::FolderPathIndex;

/// Depth-first search for the node with the given id.
pub fn locate<'a>(tree: &'a [BookmarkNode], id: &str) -> Option<&'a BookmarkNode> {
    for node in tree {
        if node.id() == id {
            return Some(node);
        }
        if let BookmarkNode::Folder(folder) = node {
            if let Some(found) = locate(&folder.children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Rebuilds the tree without the node `id`. A removed folder takes its whole subtree with it.
pub fn remove(tree: &[BookmarkNode], id: &str) -> (Tree, Option<BookmarkNode>) {
    let mut removed = None;
    let rebuilt = remove_in(tree, id, &mut removed);
    (rebuilt, removed)
}

fn remove_in(nodes: &[BookmarkNode], id: &str, removed: &mut Option<BookmarkNode>) -> Tree {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        if removed.is_some() {
            out.push(node.clone());
            continue;
        }
        if node.id() == id {
            *removed = Some(node.clone());
            continue;
        }
        match node {
            BookmarkNode::Folder(folder) => {
                let children = remove_in(&folder.children, id, removed);
                out.push(with_children(folder, children));
            }
            BookmarkNode::Bookmark(_) => out.push(node.clone()),
        }
    }
    out
}

/// Inserts `node` as a direct child of `parent_id` at `index` (`0..=len`).
///
/// The inserted node gets its envelope set to the new position; siblings are
/// not renumbered, so callers follow up with [`reindex`].
pub fn insert(
    tree: &[BookmarkNode],
    node: BookmarkNode,
    parent_id: &str,
    index: usize,
) -> Result<Tree, TreeError> {
    if parent_id == ROOT_ID {
        if index > tree.len() {
            return Err(TreeError::IndexOutOfRange {
                parent_id: parent_id.to_string(),
                index,
                len: tree.len(),
            });
        }
        let mut node = node;
        node.set_position(ROOT_ID, index);
        let mut out = tree.to_vec();
        out.insert(index, node);
        return Ok(out);
    }

    let mut pending = Some(node);
    let mut outcome: Option<Result<(), TreeError>> = None;
    let out = insert_in(tree, parent_id, index, &mut pending, &mut outcome);
    match outcome {
        Some(Ok(())) => Ok(out),
        Some(Err(e)) => Err(e),
        None => Err(TreeError::ParentNotFound(parent_id.to_string())),
    }
}

fn insert_in(
    nodes: &[BookmarkNode],
    parent_id: &str,
    index: usize,
    pending: &mut Option<BookmarkNode>,
    outcome: &mut Option<Result<(), TreeError>>,
) -> Tree {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        let folder = match node {
            BookmarkNode::Folder(folder) if outcome.is_none() => folder,
            _ => {
                out.push(node.clone());
                continue;
            }
        };

        if folder.id == parent_id {
            if index > folder.children.len() {
                *outcome = Some(Err(TreeError::IndexOutOfRange {
                    parent_id: parent_id.to_string(),
                    index,
                    len: folder.children.len(),
                }));
                out.push(node.clone());
                continue;
            }
            let mut children = folder.children.clone();
            if let Some(mut inserted) = pending.take() {
                inserted.set_position(&folder.id, index);
                children.insert(index, inserted);
            }
            *outcome = Some(Ok(()));
            out.push(with_children(folder, children));
        } else {
            let children = insert_in(&folder.children, parent_id, index, pending, outcome);
            out.push(with_children(folder, children));
        }
    }
    out
}

/// Replaces the node `id` with `updater(node)`. Unknown ids leave the tree unchanged.
pub fn update<F>(tree: &[BookmarkNode], id: &str, updater: F) -> Tree
where
    F: Fn(&BookmarkNode) -> BookmarkNode,
{
    update_in(tree, id, &updater)
}

fn update_in<F>(nodes: &[BookmarkNode], id: &str, updater: &F) -> Tree
where
    F: Fn(&BookmarkNode) -> BookmarkNode,
{
    nodes
        .iter()
        .map(|node| {
            if node.id() == id {
                return updater(node);
            }
            match node {
                BookmarkNode::Folder(folder) => {
                    with_children(folder, update_in(&folder.children, id, updater))
                }
                BookmarkNode::Bookmark(_) => node.clone(),
            }
        })
        .collect()
}

/// Resets every node's `index` to its position and `parent_id` to its real container.
pub fn reindex(tree: &[BookmarkNode], parent_id: &str) -> Tree {
    tree.iter()
        .enumerate()
        .map(|(index, node)| match node {
            BookmarkNode::Bookmark(b) => BookmarkNode::Bookmark(Bookmark {
                parent_id: parent_id.to_string(),
                index,
                ..b.clone()
            }),
            BookmarkNode::Folder(f) => BookmarkNode::Folder(Folder {
                id: f.id.clone(),
                parent_id: parent_id.to_string(),
                index,
                title: f.title.clone(),
                date_added: f.date_added,
                children: reindex(&f.children, &f.id),
            }),
        })
        .collect()
}

/// [`reindex`] starting from the top-level sequence.
pub fn reindex_root(tree: &[BookmarkNode]) -> Tree {
    reindex(tree, ROOT_ID)
}

/// Removes `id` and re-inserts it under `parent_id` at `index`, reindexing after each step.
///
/// `index` is interpreted against the sibling list *after* the removal.
pub fn relocate(
    tree: &[BookmarkNode],
    id: &str,
    parent_id: &str,
    index: usize,
) -> Result<(Tree, BookmarkNode), TreeError> {
    let (without, removed) = remove(tree, id);
    let node = removed.ok_or_else(|| TreeError::NodeNotFound(id.to_string()))?;
    let without = reindex_root(&without);
    let inserted = insert(&without, node, parent_id, index)?;
    let reindexed = reindex_root(&inserted);
    let moved = locate(&reindexed, id)
        .cloned()
        .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))?;
    Ok((reindexed, moved))
}

/// Children of `parent_id`, or the top-level sequence for the root sentinel.
pub fn children_of<'a>(tree: &'a [BookmarkNode], parent_id: &str) -> Option<&'a [BookmarkNode]> {
    if parent_id == ROOT_ID {
        return Some(tree);
    }
    match locate(tree, parent_id)? {
        BookmarkNode::Folder(folder) => Some(&folder.children),
        BookmarkNode::Bookmark(_) => None,
    }
}

/// Number of direct children of `parent_id`; `None` when it is not a container.
pub fn sibling_count(tree: &[BookmarkNode], parent_id: &str) -> Option<usize> {
    children_of(tree, parent_id).map(<[BookmarkNode]>::len)
}

/// Lookup table from node id to the id of its container.
pub fn parent_map(tree: &[BookmarkNode]) -> HashMap<NodeId, NodeId> {
    let mut map = HashMap::new();
    fill_parent_map(tree, ROOT_ID, &mut map);
    map
}

fn fill_parent_map(nodes: &[BookmarkNode], parent_id: &str, map: &mut HashMap<NodeId, NodeId>) {
    for node in nodes {
        map.insert(node.id().to_string(), parent_id.to_string());
        if let BookmarkNode::Folder(folder) = node {
            fill_parent_map(&folder.children, &folder.id, map);
        }
    }
}

/// Walks the ancestor chain from `node_id` upward and reports whether `ancestor_id`
/// is met before the root. A node counts as its own ancestor.
pub fn is_ancestor_or_self(parents: &HashMap<NodeId, NodeId>, ancestor_id: &str, node_id: &str) -> bool {
    let mut current = node_id;
    // Bounded by the number of nodes so a corrupt map cannot loop forever.
    for _ in 0..=parents.len() {
        if current == ancestor_id {
            return true;
        }
        if current == ROOT_ID {
            return false;
        }
        match parents.get(current) {
            Some(parent) => current = parent,
            None => return false,
        }
    }
    false
}

/// Finds a bookmark other than `exclude_id` whose URL equals `url`.
pub fn find_duplicate_url<'a>(
    tree: &'a [BookmarkNode],
    url: &str,
    exclude_id: &str,
) -> Option<&'a Bookmark> {
    flatten(tree).into_iter().find_map(|node| match node {
        BookmarkNode::Bookmark(b) if b.url == url && b.id != exclude_id => Some(b),
        _ => None,
    })
}

/// Pre-order listing of every node in the forest.
pub fn flatten(tree: &[BookmarkNode]) -> Vec<&BookmarkNode> {
    let mut out = Vec::new();
    fn walk<'a>(nodes: &'a [BookmarkNode], out: &mut Vec<&'a BookmarkNode>) {
        for node in nodes {
            out.push(node);
            walk(node.children(), out);
        }
    }
    walk(tree, &mut out);
    out
}

/// Total number of nodes in the forest.
pub fn count_nodes(tree: &[BookmarkNode]) -> usize {
    tree.iter().map(BookmarkNode::subtree_len).sum()
}

fn with_children(folder: &Folder, children: Tree) -> BookmarkNode {
    BookmarkNode::Folder(Folder {
        id: folder.id.clone(),
        parent_id: folder.parent_id.clone(),
        index: folder.index,
        title: folder.title.clone(),
        date_added: folder.date_added,
        children,
    })
}
