use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Opaque node identifier assigned by the backend.
pub type NodeId = String;

/// Identifier of the invisible container holding the top-level nodes.
pub const ROOT_ID: &str = "root";

/// An ordered forest of bookmark nodes. Top-level nodes have `parent_id == ROOT_ID`.
pub type Tree = Vec<BookmarkNode>;

/// Reachability of a bookmark's URL, filled in by the enrichment pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    #[default]
    Unchecked,
    Checking,
    Live,
    Dead,
    Parked,
}

/// Threat-heuristic verdict for a bookmark's URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyStatus {
    #[default]
    Unknown,
    Checking,
    Safe,
    Warning,
    Unsafe,
}

/// A saved link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: NodeId,
    pub parent_id: NodeId,
    pub index: usize,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub status: LinkStatus,
    #[serde(default)]
    pub safety_status: SafetyStatus,
    /// UNIX timestamp in milliseconds.
    pub date_added: i64,
}

/// A folder owning an ordered list of children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: NodeId,
    pub parent_id: NodeId,
    pub index: usize,
    pub title: String,
    #[serde(default)]
    pub children: Vec<BookmarkNode>,
    pub date_added: i64,
}

/// A node of the bookmark tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BookmarkNode {
    Bookmark(Bookmark),
    Folder(Folder),
}

impl BookmarkNode {
    pub fn id(&self) -> &str {
        match self {
            BookmarkNode::Bookmark(b) => &b.id,
            BookmarkNode::Folder(f) => &f.id,
        }
    }

    pub fn parent_id(&self) -> &str {
        match self {
            BookmarkNode::Bookmark(b) => &b.parent_id,
            BookmarkNode::Folder(f) => &f.parent_id,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            BookmarkNode::Bookmark(b) => b.index,
            BookmarkNode::Folder(f) => f.index,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            BookmarkNode::Bookmark(b) => &b.title,
            BookmarkNode::Folder(f) => &f.title,
        }
    }

    pub fn date_added(&self) -> i64 {
        match self {
            BookmarkNode::Bookmark(b) => b.date_added,
            BookmarkNode::Folder(f) => f.date_added,
        }
    }

    /// Overwrites the positional envelope (`parent_id`, `index`).
    pub fn set_position(&mut self, parent_id: &str, index: usize) {
        match self {
            BookmarkNode::Bookmark(b) => {
                b.parent_id = parent_id.to_string();
                b.index = index;
            }
            BookmarkNode::Folder(f) => {
                f.parent_id = parent_id.to_string();
                f.index = index;
            }
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, BookmarkNode::Folder(_))
    }

    pub fn as_bookmark(&self) -> Option<&Bookmark> {
        match self {
            BookmarkNode::Bookmark(b) => Some(b),
            BookmarkNode::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            BookmarkNode::Folder(f) => Some(f),
            BookmarkNode::Bookmark(_) => None,
        }
    }

    /// Children of a folder; empty for bookmarks.
    pub fn children(&self) -> &[BookmarkNode] {
        match self {
            BookmarkNode::Folder(f) => &f.children,
            BookmarkNode::Bookmark(_) => &[],
        }
    }

    /// Rewrites ids and parent ids found in `id_map`, recursively.
    pub fn remap_ids(&mut self, id_map: &HashMap<NodeId, NodeId>) {
        match self {
            BookmarkNode::Bookmark(b) => {
                remap_id(&mut b.id, id_map);
                remap_id(&mut b.parent_id, id_map);
            }
            BookmarkNode::Folder(f) => {
                remap_id(&mut f.id, id_map);
                remap_id(&mut f.parent_id, id_map);
                for child in &mut f.children {
                    child.remap_ids(id_map);
                }
            }
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children().iter().map(BookmarkNode::subtree_len).sum::<usize>()
    }
}

/// Replaces `id` with its mapped value, if any.
pub fn remap_id(id: &mut NodeId, id_map: &HashMap<NodeId, NodeId>) {
    if let Some(mapped) = id_map.get(id.as_str()) {
        *id = mapped.clone();
    }
}

/// Position of a node: its container and its offset among siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub parent_id: NodeId,
    pub index: usize,
}

impl Position {
    pub fn new(parent_id: impl Into<NodeId>, index: usize) -> Self {
        Self {
            parent_id: parent_id.into(),
            index,
        }
    }
}
