//! Undo log: a LIFO stack of compensating descriptions.
//!
//! One entry per completed mutation. Popping removes the entry for good; there is
//! no redo stack, and executing an entry never pushes a new one.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::bookmark::NodeId;
use crate::types::undo::UndoAction;

/// Trait defining undo log operations.
pub trait UndoLogTrait {
    fn push(&mut self, action: UndoAction);
    fn pop(&mut self) -> Option<UndoAction>;
    fn peek(&self) -> Option<&UndoAction>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
    fn entries(&self) -> &[UndoAction];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UndoLog {
    entries: Vec<UndoAction>,
}

impl UndoLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrites placeholder ids in every entry.
    pub fn remap_ids(&mut self, id_map: &HashMap<NodeId, NodeId>) {
        for entry in &mut self.entries {
            entry.remap_ids(id_map);
        }
    }
}

impl UndoLogTrait for UndoLog {
    fn push(&mut self, action: UndoAction) {
        self.entries.push(action);
    }

    fn pop(&mut self) -> Option<UndoAction> {
        self.entries.pop()
    }

    fn peek(&self) -> Option<&UndoAction> {
        self.entries.last()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    fn entries(&self) -> &[UndoAction] {
        &self.entries
    }
}
