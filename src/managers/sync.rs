//! Sync coordinator: replaces the local tree with the backend's snapshot.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use super::sidebar::Sidebar;
use crate::tree;
use crate::types::bookmark::{remap_id, BookmarkNode, LinkStatus, NodeId, SafetyStatus, Tree};
use crate::types::errors::SidebarError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum LoadState {
    Idle,
    Loading,
    /// A loaded tree is shown while a fresh snapshot is fetched.
    Refreshing,
    Ready,
    /// Blocking error state; no tree is shown.
    Failed(String),
}

impl Sidebar {
    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn is_loaded(&self) -> bool {
        self.require_loaded().is_ok()
    }

    /// Initial fetch of the authoritative tree. Returns the number of nodes loaded.
    pub async fn load(&mut self) -> Result<usize, SidebarError> {
        self.fetch(LoadState::Loading, &HashMap::new()).await
    }

    /// Same as [`Sidebar::load`] but reported as a refresh. Local changes the
    /// backend has not seen are discarded.
    pub async fn reload(&mut self) -> Result<usize, SidebarError> {
        self.fetch(LoadState::Refreshing, &HashMap::new()).await
    }

    /// Reload after a restore; `id_map` maps placeholder ids to backend-assigned ones.
    pub(super) async fn reload_with_id_map(
        &mut self,
        id_map: &HashMap<NodeId, NodeId>,
    ) -> Result<usize, SidebarError> {
        self.fetch(LoadState::Refreshing, id_map).await
    }

    async fn fetch(
        &mut self,
        phase: LoadState,
        id_map: &HashMap<NodeId, NodeId>,
    ) -> Result<usize, SidebarError> {
        self.load_state = phase;
        match self.backend.get_all_bookmarks().await {
            Ok(fresh) => {
                let fresh = carry_enrichment(&self.tree, tree::reindex_root(&fresh), id_map);
                let count = tree::count_nodes(&fresh);
                self.commit(fresh);
                if !id_map.is_empty() {
                    self.undo_log.remap_ids(id_map);
                    if let Some(pending) = &mut self.pending_edit {
                        remap_id(&mut pending.id, id_map);
                    }
                }
                self.load_state = LoadState::Ready;
                info!(nodes = count, remapped = id_map.len(), "bookmarks loaded");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "loading bookmarks failed");
                self.commit(Vec::new());
                self.load_state = LoadState::Failed(e.to_string());
                Err(SidebarError::LoadFailed(e.to_string()))
            }
        }
    }
}

/// Copies link/safety verdicts from `previous` onto matching bookmarks of `fresh`.
///
/// A bookmark matches when its id (after mapping through `id_map`) is unchanged
/// and so is its URL. The backend stores no verdicts, so without this every
/// reload would send the whole tree back through enrichment.
pub fn carry_enrichment(previous: &[BookmarkNode], fresh: Tree, id_map: &HashMap<NodeId, NodeId>) -> Tree {
    let mut known: HashMap<&str, (&str, LinkStatus, SafetyStatus)> = HashMap::new();
    for node in tree::flatten(previous) {
        if let BookmarkNode::Bookmark(b) = node {
            if b.status == LinkStatus::Checking {
                continue;
            }
            let id = id_map.get(&b.id).map_or(b.id.as_str(), String::as_str);
            known.insert(id, (b.url.as_str(), b.status, b.safety_status));
        }
    }
    annotate(fresh, &known)
}

fn annotate(nodes: Tree, known: &HashMap<&str, (&str, LinkStatus, SafetyStatus)>) -> Tree {
    nodes
        .into_iter()
        .map(|node| match node {
            BookmarkNode::Bookmark(mut b) => {
                if let Some((url, status, safety)) = known.get(b.id.as_str()) {
                    if *url == b.url {
                        b.status = *status;
                        b.safety_status = *safety;
                    }
                }
                BookmarkNode::Bookmark(b)
            }
            BookmarkNode::Folder(mut f) => {
                f.children = annotate(std::mem::take(&mut f.children), known);
                BookmarkNode::Folder(f)
            }
        })
        .collect()
}
