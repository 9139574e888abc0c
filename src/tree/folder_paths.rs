//! Folder path index: folder id → human-readable ancestry path.
//!
//! A derived read model, rebuilt from a tree snapshot whenever it is needed.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::bookmark::{BookmarkNode, NodeId};

pub const DEFAULT_SEPARATOR: &str = " / ";

/// One folder and its rendered path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderPathEntry {
    pub id: NodeId,
    pub path: String,
    pub depth: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FolderPathIndex {
    segments: HashMap<NodeId, Vec<String>>,
    rendered: HashMap<NodeId, String>,
}

impl FolderPathIndex {
    pub fn build(tree: &[BookmarkNode]) -> Self {
        Self::build_with_separator(tree, DEFAULT_SEPARATOR)
    }

    pub fn build_with_separator(tree: &[BookmarkNode], separator: &str) -> Self {
        let mut index = Self::default();
        let mut trail = Vec::new();
        index.walk(tree, &mut trail);
        index.rendered = index
            .segments
            .iter()
            .map(|(id, parts)| (id.clone(), parts.join(separator)))
            .collect();
        index
    }

    fn walk(&mut self, nodes: &[BookmarkNode], trail: &mut Vec<String>) {
        for node in nodes {
            if let BookmarkNode::Folder(folder) = node {
                trail.push(folder.title.clone());
                self.segments.insert(folder.id.clone(), trail.clone());
                self.walk(&folder.children, trail);
                trail.pop();
            }
        }
    }

    /// Rendered path of a folder, e.g. `"Work / Rust / Crates"`.
    pub fn path(&self, folder_id: &str) -> Option<&str> {
        self.rendered.get(folder_id).map(String::as_str)
    }

    /// Titles from the top-level folder down to `folder_id`.
    pub fn segments(&self, folder_id: &str) -> Option<&[String]> {
        self.segments.get(folder_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Every folder sorted by rendered path, for folder pickers.
    pub fn entries(&self) -> Vec<FolderPathEntry> {
        let mut entries: Vec<FolderPathEntry> = self
            .rendered
            .iter()
            .map(|(id, path)| FolderPathEntry {
                id: id.clone(),
                path: path.clone(),
                depth: self.segments.get(id).map_or(0, Vec::len),
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.id.cmp(&b.id)));
        entries
    }
}
