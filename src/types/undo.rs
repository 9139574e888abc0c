use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::bookmark::{remap_id, BookmarkNode, NodeId, Position};

/// Compensating description of one completed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum UndoAction {
    /// Deep copies of every deleted node (with full subtrees) and each one's index before removal.
    Delete {
        nodes: Vec<BookmarkNode>,
        original_indices: BTreeMap<NodeId, usize>,
    },
    Edit {
        previous: BookmarkNode,
        current: BookmarkNode,
    },
    /// `to.index` is the locally applied (shift-corrected) index.
    Move {
        node_id: NodeId,
        from: Position,
        to: Position,
    },
    Create { node: BookmarkNode },
}

impl UndoAction {
    /// Short label used in logs and notices.
    pub fn label(&self) -> &'static str {
        match self {
            UndoAction::Delete { .. } => "delete",
            UndoAction::Edit { .. } => "edit",
            UndoAction::Move { .. } => "move",
            UndoAction::Create { .. } => "create",
        }
    }

    /// Points the entry at backend-assigned ids after placeholders were re-created.
    pub fn remap_ids(&mut self, id_map: &HashMap<NodeId, NodeId>) {
        match self {
            UndoAction::Delete {
                nodes,
                original_indices,
            } => {
                for node in nodes.iter_mut() {
                    node.remap_ids(id_map);
                }
                *original_indices = std::mem::take(original_indices)
                    .into_iter()
                    .map(|(id, index)| (id_map.get(&id).cloned().unwrap_or(id), index))
                    .collect();
            }
            UndoAction::Edit { previous, current } => {
                previous.remap_ids(id_map);
                current.remap_ids(id_map);
            }
            UndoAction::Move { node_id, from, to } => {
                remap_id(node_id, id_map);
                remap_id(&mut from.parent_id, id_map);
                remap_id(&mut to.parent_id, id_map);
            }
            UndoAction::Create { node } => node.remap_ids(id_map),
        }
    }
}
