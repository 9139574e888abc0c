//! Drag-and-drop position resolution.
//!
//! Turns a pointer-relative drop gesture into a concrete `(parent, index)` pair,
//! rejecting folder drops into the folder's own subtree. Two indices come out of a
//! successful resolution: `local_index`, used to re-insert the node after it has
//! been removed from the local tree, and `backend_index`, the caller's intended
//! slot as the store expects it (the store applies the same-parent shift itself).

use serde::{Deserialize, Serialize};

use crate::tree;
use crate::types::bookmark::{BookmarkNode, NodeId, Position, ROOT_ID};
use crate::types::errors::DropRejection;

/// Where, relative to a row, the pointer was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropZone {
    Before,
    After,
    /// Inside a folder's body: becomes its first child.
    Inside,
}

impl DropZone {
    /// Top half of a row inserts before it, bottom half after it; a folder's body wins over both.
    pub fn from_pointer(offset_y: f32, row_height: f32, over_folder_body: bool) -> Self {
        if over_folder_body {
            DropZone::Inside
        } else if offset_y < row_height / 2.0 {
            DropZone::Before
        } else {
            DropZone::After
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "lowercase")]
pub enum DropTarget {
    /// Released over an existing row or card.
    Row { target_id: NodeId, zone: DropZone },
    /// An explicit slot, e.g. an empty folder's body or the end of the root list.
    Slot { parent_id: NodeId, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDrop {
    pub node_id: NodeId,
    pub from: Position,
    pub parent_id: NodeId,
    /// Insertion index after the node has been taken out of its current parent.
    pub local_index: usize,
    /// Index to send to the backend move call.
    pub backend_index: usize,
}

impl ResolvedDrop {
    /// The node would land exactly where it already is.
    pub fn is_noop(&self) -> bool {
        self.from.parent_id == self.parent_id && self.from.index == self.local_index
    }
}

/// The unadjusted `(parent, index)` the gesture points at.
pub fn candidate(tree: &[BookmarkNode], target: &DropTarget) -> Result<Position, DropRejection> {
    match target {
        DropTarget::Row { target_id, zone } => {
            let row = tree::locate(tree, target_id)
                .ok_or_else(|| DropRejection::UnknownTarget(target_id.clone()))?;
            match zone {
                DropZone::Before => Ok(Position::new(row.parent_id(), row.index())),
                DropZone::After => Ok(Position::new(row.parent_id(), row.index() + 1)),
                DropZone::Inside if row.is_folder() => Ok(Position::new(row.id(), 0)),
                DropZone::Inside => Err(DropRejection::NotAFolder(target_id.clone())),
            }
        }
        DropTarget::Slot { parent_id, index } => {
            let siblings = if parent_id == ROOT_ID {
                tree
            } else {
                match tree::locate(tree, parent_id) {
                    Some(BookmarkNode::Folder(folder)) => folder.children.as_slice(),
                    Some(BookmarkNode::Bookmark(_)) => {
                        return Err(DropRejection::NotAFolder(parent_id.clone()))
                    }
                    None => return Err(DropRejection::UnknownTarget(parent_id.clone())),
                }
            };
            if *index > siblings.len() {
                return Err(DropRejection::IndexOutOfRange {
                    parent_id: parent_id.clone(),
                    index: *index,
                });
            }
            Ok(Position::new(parent_id.clone(), *index))
        }
    }
}

/// Resolves a drop of `node_id` onto `target`.
pub fn resolve(
    tree: &[BookmarkNode],
    node_id: &str,
    target: &DropTarget,
) -> Result<ResolvedDrop, DropRejection> {
    let node = tree::locate(tree, node_id).ok_or_else(|| DropRejection::UnknownNode(node_id.to_string()))?;
    let from = Position::new(node.parent_id(), node.index());
    let dest = candidate(tree, target)?;

    if node.is_folder() {
        ensure_not_into_subtree(tree, node_id, &dest.parent_id)?;
    }

    Ok(ResolvedDrop {
        node_id: node_id.to_string(),
        local_index: local_index_for(&from, &dest),
        backend_index: dest.index,
        parent_id: dest.parent_id,
        from,
    })
}

/// Rejects moving folder `folder_id` under `dest_parent_id` when that is the folder
/// itself or one of its descendants.
pub fn ensure_not_into_subtree(
    tree: &[BookmarkNode],
    folder_id: &str,
    dest_parent_id: &str,
) -> Result<(), DropRejection> {
    if dest_parent_id == folder_id {
        return Err(DropRejection::IntoSelf(folder_id.to_string()));
    }
    let parents = tree::parent_map(tree);
    if tree::is_ancestor_or_self(&parents, folder_id, dest_parent_id) {
        return Err(DropRejection::IntoDescendant {
            folder: folder_id.to_string(),
            target: dest_parent_id.to_string(),
        });
    }
    Ok(())
}

/// Same-parent correction: removing the node first shifts later siblings down by one.
pub fn local_index_for(from: &Position, dest: &Position) -> usize {
    if dest.parent_id == from.parent_id && dest.index > from.index {
        dest.index - 1
    } else {
        dest.index
    }
}

/// Backend index that puts a node currently at `current` back at `origin`.
///
/// The inverse of [`local_index_for`]: `origin.index` is a post-removal index, so a
/// same-parent move downward needs one added before the store subtracts it again.
pub fn backend_index_for_restore(current: &Position, origin: &Position) -> usize {
    if current.parent_id == origin.parent_id && origin.index > current.index {
        origin.index + 1
    } else {
        origin.index
    }
}
