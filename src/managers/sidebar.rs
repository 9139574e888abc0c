//! The sidebar: owner of the local tree, the undo log and the backend queue.
//!
//! Every user mutation follows the same protocol: compute the new tree with the
//! tree algebra, swap it in, record the inverse in the undo log, then queue the
//! backend call. A failed call becomes a [`Notice`]; the local tree is left ahead
//! of the backend until an undo or reload reconciles the two.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::dispatcher::{BackendCommand, DeleteTarget, DispatchOutcome, Dispatcher, Origin};
use super::sync::LoadState;
use super::undo_log::{UndoLog, UndoLogTrait};
use crate::backend::{BookmarkBackend, BookmarkChanges, NewBookmark, NewFolder};
use crate::services::drop_resolver::{self, DropTarget, ResolvedDrop};
use crate::tree::{self, FolderPathIndex};
use crate::types::bookmark::{Bookmark, BookmarkNode, Folder, LinkStatus, NodeId, Position, SafetyStatus, Tree};
use crate::types::errors::{SidebarError, TreeError};
use crate::types::undo::UndoAction;

/// User-visible, non-blocking messages produced by background work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// A forward mutation was rejected by the backend; undo or reload to reconcile.
    MutationFailed { action: &'static str, message: String },
    /// The backend rejected an undo; the tree has been (or will be) reloaded.
    UndoFailed { action: &'static str, message: String },
    EnrichmentFailed { failed: usize, message: String },
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::MutationFailed { action, message } => format!(
                "Could not save {} ({}). Undo the change or reload bookmarks.",
                action, message
            ),
            Notice::UndoFailed { action, message } => {
                format!("Could not undo {} ({}). Bookmarks were reloaded.", action, message)
            }
            Notice::EnrichmentFailed { failed, message } => {
                format!("Could not check {} link(s): {}", failed, message)
            }
        }
    }
}

/// Result of a bookmark edit request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EditOutcome {
    Applied,
    /// Another bookmark already has the new URL; the edit is parked until
    /// [`Sidebar::confirm_pending_edit`] or [`Sidebar::cancel_pending_edit`].
    DuplicateUrl { existing: Bookmark },
}

/// An edit suspended on a duplicate-URL decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEdit {
    pub id: NodeId,
    pub changes: BookmarkChanges,
}

/// Serializable snapshot of the sidebar's owned state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarState {
    pub tree: Tree,
    pub undo_log: UndoLog,
}

pub struct Sidebar {
    pub(super) backend: Arc<dyn BookmarkBackend>,
    pub(super) dispatcher: Dispatcher,
    pub(super) tree: Arc<Tree>,
    pub(super) undo_log: UndoLog,
    pub(super) load_state: LoadState,
    pub(super) pending_edit: Option<PendingEdit>,
    pub(super) notices: Vec<Notice>,
    /// Set when a reload is owed once the backend queue drains; carries restore id mappings.
    pub(super) deferred_reload: Option<HashMap<NodeId, NodeId>>,
    pub(super) path_separator: String,
    pub(super) revision: u64,
}

impl Sidebar {
    /// Creates an empty, not-yet-loaded sidebar. Must be called inside a tokio runtime.
    pub fn new(backend: Arc<dyn BookmarkBackend>) -> Self {
        Self {
            dispatcher: Dispatcher::spawn(backend.clone()),
            backend,
            tree: Arc::new(Vec::new()),
            undo_log: UndoLog::new(),
            load_state: LoadState::Idle,
            pending_edit: None,
            notices: Vec::new(),
            deferred_reload: None,
            path_separator: tree::folder_paths::DEFAULT_SEPARATOR.to_string(),
            revision: 0,
        }
    }

    pub fn with_path_separator(mut self, separator: impl Into<String>) -> Self {
        self.set_path_separator(separator);
        self
    }

    pub fn set_path_separator(&mut self, separator: impl Into<String>) {
        self.path_separator = separator.into();
    }

    /// Current tree. Cheap to clone; later mutations never alter a returned snapshot.
    pub fn tree(&self) -> Arc<Tree> {
        self.tree.clone()
    }

    pub fn locate(&self, id: &str) -> Option<&BookmarkNode> {
        tree::locate(&self.tree, id)
    }

    pub fn undo_log(&self) -> &UndoLog {
        &self.undo_log
    }

    pub fn pending_edit(&self) -> Option<&PendingEdit> {
        self.pending_edit.as_ref()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Number of local tree replacements so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Backend calls queued but not yet reported back.
    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    pub fn folder_paths(&self) -> FolderPathIndex {
        FolderPathIndex::build_with_separator(&self.tree, &self.path_separator)
    }

    pub fn state(&self) -> SidebarState {
        SidebarState {
            tree: self.tree.as_ref().clone(),
            undo_log: self.undo_log.clone(),
        }
    }

    pub(super) fn commit(&mut self, tree: Tree) {
        self.tree = Arc::new(tree);
        self.revision += 1;
    }

    pub(super) fn require_loaded(&self) -> Result<(), SidebarError> {
        match self.load_state {
            LoadState::Ready | LoadState::Refreshing => Ok(()),
            _ => Err(SidebarError::NotLoaded),
        }
    }

    // ─── Delete ───

    /// Deletes a batch of nodes in one optimistic step and one undo entry.
    ///
    /// Returns the number of nodes removed, descendants included.
    pub fn delete(&mut self, ids: &[NodeId]) -> Result<usize, SidebarError> {
        self.require_loaded()?;
        if ids.is_empty() {
            return Err(SidebarError::NothingSelected);
        }

        let parents = tree::parent_map(&self.tree);
        if let Some(missing) = ids.iter().find(|id| !parents.contains_key(id.as_str())) {
            return Err(SidebarError::NotFound(missing.clone()));
        }

        // A node whose ancestor is also selected goes away with that ancestor.
        let mut targets: Vec<&NodeId> = Vec::new();
        for id in ids {
            let covered = ids
                .iter()
                .any(|other| other != id && tree::is_ancestor_or_self(&parents, other, id));
            if !covered && !targets.contains(&id) {
                targets.push(id);
            }
        }

        let mut working: Tree = self.tree.as_ref().clone();
        let mut snapshots = Vec::with_capacity(targets.len());
        let mut original_indices = BTreeMap::new();
        let mut commands = Vec::with_capacity(targets.len());
        for id in targets {
            let (rest, removed) = tree::remove(&working, id);
            working = rest;
            if let Some(node) = removed {
                original_indices.insert(id.clone(), node.index());
                commands.push(DeleteTarget {
                    id: id.clone(),
                    is_folder: node.is_folder(),
                });
                snapshots.push(node);
            }
        }

        let removed_count: usize = snapshots.iter().map(BookmarkNode::subtree_len).sum();
        self.commit(tree::reindex_root(&working));
        debug!(targets = snapshots.len(), removed_count, "deleted locally");
        self.undo_log.push(UndoAction::Delete {
            nodes: snapshots,
            original_indices,
        });
        self.dispatcher.submit(Origin::Forward, BackendCommand::Delete(commands));
        Ok(removed_count)
    }

    // ─── Create ───

    /// Creates a bookmark through the backend, then reloads.
    ///
    /// Nothing is spliced in locally: the identifier only exists once the backend assigns it.
    pub async fn create_bookmark(&mut self, bookmark: NewBookmark) -> Result<BookmarkNode, SidebarError> {
        self.require_loaded()?;
        self.settle().await;
        let created = self.backend.create_bookmark(bookmark).await.map_err(|e| {
            warn!(error = %e, "create bookmark failed");
            SidebarError::Backend(e)
        })?;
        self.finish_create(created).await
    }

    pub async fn create_folder(&mut self, folder: NewFolder) -> Result<BookmarkNode, SidebarError> {
        self.require_loaded()?;
        self.settle().await;
        let created = self.backend.create_folder(folder).await.map_err(|e| {
            warn!(error = %e, "create folder failed");
            SidebarError::Backend(e)
        })?;
        self.finish_create(created).await
    }

    async fn finish_create(&mut self, created: BookmarkNode) -> Result<BookmarkNode, SidebarError> {
        debug!(id = created.id(), "created in backend");
        self.undo_log.push(UndoAction::Create { node: created.clone() });
        self.reload().await?;
        Ok(created)
    }

    // ─── Edit ───

    /// Replaces a bookmark's editable fields, unless the new URL is already bookmarked.
    pub fn edit_bookmark(&mut self, id: &str, changes: BookmarkChanges) -> Result<EditOutcome, SidebarError> {
        self.require_loaded()?;
        self.pending_edit = None;
        let current = self.bookmark(id)?;

        if changes.url != current.url {
            if let Some(existing) = tree::find_duplicate_url(&self.tree, &changes.url, id) {
                debug!(id, url = %changes.url, existing = %existing.id, "edit parked on duplicate url");
                let existing = existing.clone();
                self.pending_edit = Some(PendingEdit {
                    id: id.to_string(),
                    changes,
                });
                return Ok(EditOutcome::DuplicateUrl { existing });
            }
        }

        self.apply_bookmark_edit(current, changes);
        Ok(EditOutcome::Applied)
    }

    /// Proceeds with the parked edit, allowing the duplicate URL.
    pub fn confirm_pending_edit(&mut self) -> Result<(), SidebarError> {
        self.require_loaded()?;
        let pending = self.pending_edit.take().ok_or(SidebarError::NoPendingEdit)?;
        let current = self.bookmark(&pending.id)?;
        self.apply_bookmark_edit(current, pending.changes);
        Ok(())
    }

    /// Drops the parked edit, if any.
    pub fn cancel_pending_edit(&mut self) -> Option<PendingEdit> {
        self.pending_edit.take()
    }

    fn apply_bookmark_edit(&mut self, current: Bookmark, changes: BookmarkChanges) {
        if changes_match(&current, &changes) {
            return;
        }
        let updated = BookmarkNode::Bookmark(with_changes(&current, &changes));
        let id = current.id.clone();
        self.commit(tree::update(&self.tree, &id, |_| updated.clone()));
        self.undo_log.push(UndoAction::Edit {
            previous: BookmarkNode::Bookmark(current),
            current: updated,
        });
        self.dispatcher
            .submit(Origin::Forward, BackendCommand::UpdateBookmark { id, changes });
    }

    pub fn rename_folder(&mut self, id: &str, title: &str) -> Result<(), SidebarError> {
        self.require_loaded()?;
        let previous = match self.locate(id) {
            Some(BookmarkNode::Folder(folder)) => folder.clone(),
            Some(BookmarkNode::Bookmark(_)) => {
                return Err(SidebarError::WrongKind {
                    id: id.to_string(),
                    expected: "folder",
                })
            }
            None => return Err(SidebarError::NotFound(id.to_string())),
        };
        if previous.title == title {
            return Ok(());
        }

        let updated = BookmarkNode::Folder(Folder {
            title: title.to_string(),
            ..previous.clone()
        });
        self.commit(tree::update(&self.tree, id, |_| updated.clone()));
        self.undo_log.push(UndoAction::Edit {
            previous: BookmarkNode::Folder(previous),
            current: updated,
        });
        self.dispatcher.submit(
            Origin::Forward,
            BackendCommand::UpdateFolder {
                id: id.to_string(),
                title: title.to_string(),
            },
        );
        Ok(())
    }

    // ─── Move ───

    /// Applies a drag-and-drop move. Rejected drops leave everything untouched.
    pub fn move_node(&mut self, id: &str, target: &DropTarget) -> Result<ResolvedDrop, SidebarError> {
        self.require_loaded()?;
        let resolved = drop_resolver::resolve(&self.tree, id, target)?;
        if resolved.is_noop() {
            return Ok(resolved);
        }

        let (next, _) = tree::relocate(&self.tree, id, &resolved.parent_id, resolved.local_index)?;
        self.commit(next);
        debug!(
            id,
            parent = %resolved.parent_id,
            local_index = resolved.local_index,
            backend_index = resolved.backend_index,
            "moved locally"
        );
        self.undo_log.push(UndoAction::Move {
            node_id: id.to_string(),
            from: resolved.from.clone(),
            to: Position::new(resolved.parent_id.clone(), resolved.local_index),
        });
        // The backend gets the caller's intended index, not the shift-corrected one.
        self.dispatcher.submit(
            Origin::Forward,
            BackendCommand::Move {
                id: id.to_string(),
                parent_id: resolved.parent_id.clone(),
                index: resolved.backend_index,
            },
        );
        Ok(resolved)
    }

    // ─── Undo ───

    /// Pops the most recent entry and applies its inverse. Returns the entry, or
    /// `None` when the log is empty. Undo is not itself recorded.
    pub async fn undo(&mut self) -> Result<Option<UndoAction>, SidebarError> {
        self.require_loaded()?;
        let Some(action) = self.undo_log.pop() else {
            return Ok(None);
        };

        match self.apply_inverse(&action) {
            Ok(()) => {
                debug!(action = action.label(), "undo applied locally");
                Ok(Some(action))
            }
            Err(e) => {
                error!(action = action.label(), error = %e, "undo could not be applied; reloading");
                self.notices.push(Notice::UndoFailed {
                    action: action.label(),
                    message: e.to_string(),
                });
                if let Err(reload_error) = self.reload().await {
                    warn!(error = %reload_error, "reload after failed undo failed");
                }
                Err(SidebarError::UndoFailed {
                    action: action.label(),
                    message: e.to_string(),
                })
            }
        }
    }

    fn apply_inverse(&mut self, action: &UndoAction) -> Result<(), SidebarError> {
        match action {
            UndoAction::Delete {
                nodes,
                original_indices,
            } => self.restore_deleted(nodes, original_indices),
            UndoAction::Edit { previous, .. } => self.restore_edit(previous),
            UndoAction::Move { node_id, from, .. } => self.move_back(node_id, from),
            UndoAction::Create { node } => self.remove_created(node),
        }
    }

    /// Re-inserts the captured subtrees at their original positions. The restored
    /// nodes keep their old ids as placeholders until the backend has re-created
    /// them and the follow-up reload swaps in the real ids.
    fn restore_deleted(
        &mut self,
        nodes: &[BookmarkNode],
        original_indices: &BTreeMap<NodeId, usize>,
    ) -> Result<(), SidebarError> {
        let mut ordered: Vec<&BookmarkNode> = nodes.iter().collect();
        ordered.sort_by_key(|node| original_indices.get(node.id()).copied().unwrap_or(node.index()));

        let mut working: Tree = self.tree.as_ref().clone();
        let mut restored = Vec::with_capacity(ordered.len());
        for node in ordered {
            let index = original_indices.get(node.id()).copied().unwrap_or(node.index());
            let parent_id = node.parent_id().to_string();
            let len = tree::sibling_count(&working, &parent_id)
                .ok_or_else(|| TreeError::ParentNotFound(parent_id.clone()))?;
            let index = index.min(len);
            working = tree::insert(&working, node.clone(), &parent_id, index)?;

            let mut snapshot = node.clone();
            snapshot.set_position(&parent_id, index);
            restored.push(snapshot);
        }

        self.commit(tree::reindex_root(&working));
        self.dispatcher.submit(Origin::Undo, BackendCommand::Restore(restored));
        Ok(())
    }

    /// Puts back the previous field values while keeping the node's current place
    /// (and, for folders, its current children).
    fn restore_edit(&mut self, previous: &BookmarkNode) -> Result<(), SidebarError> {
        let id = previous.id().to_string();
        let current = self
            .locate(&id)
            .cloned()
            .ok_or_else(|| SidebarError::NotFound(id.clone()))?;

        let (restored, command) = match (previous, current) {
            (BookmarkNode::Bookmark(prev), BookmarkNode::Bookmark(cur)) => {
                let changes = BookmarkChanges {
                    title: prev.title.clone(),
                    url: prev.url.clone(),
                    tags: prev.tags.clone(),
                    keyword: prev.keyword.clone(),
                };
                let restored = BookmarkNode::Bookmark(Bookmark {
                    status: prev.status,
                    safety_status: prev.safety_status,
                    ..with_changes(&cur, &changes)
                });
                (restored, BackendCommand::UpdateBookmark { id: id.clone(), changes })
            }
            (BookmarkNode::Folder(prev), BookmarkNode::Folder(cur)) => {
                let restored = BookmarkNode::Folder(Folder {
                    title: prev.title.clone(),
                    ..cur
                });
                (
                    restored,
                    BackendCommand::UpdateFolder {
                        id: id.clone(),
                        title: prev.title.clone(),
                    },
                )
            }
            _ => {
                return Err(SidebarError::WrongKind {
                    id,
                    expected: if previous.is_folder() { "folder" } else { "bookmark" },
                })
            }
        };

        self.commit(tree::update(&self.tree, &id, |_| restored.clone()));
        self.dispatcher.submit(Origin::Undo, command);
        Ok(())
    }

    fn move_back(&mut self, node_id: &str, origin: &Position) -> Result<(), SidebarError> {
        let node = self
            .locate(node_id)
            .ok_or_else(|| SidebarError::NotFound(node_id.to_string()))?;
        let current = Position::new(node.parent_id(), node.index());
        if node.is_folder() {
            drop_resolver::ensure_not_into_subtree(&self.tree, node_id, &origin.parent_id)?;
        }

        let siblings = tree::sibling_count(&self.tree, &origin.parent_id)
            .ok_or_else(|| TreeError::ParentNotFound(origin.parent_id.clone()))?;
        let available = if current.parent_id == origin.parent_id {
            siblings - 1
        } else {
            siblings
        };
        let local_index = origin.index.min(available);
        let target = Position::new(origin.parent_id.clone(), local_index);
        let backend_index = drop_resolver::backend_index_for_restore(&current, &target);

        let (next, _) = tree::relocate(&self.tree, node_id, &target.parent_id, target.index)?;
        self.commit(next);
        self.dispatcher.submit(
            Origin::Undo,
            BackendCommand::Move {
                id: node_id.to_string(),
                parent_id: target.parent_id,
                index: backend_index,
            },
        );
        Ok(())
    }

    fn remove_created(&mut self, created: &BookmarkNode) -> Result<(), SidebarError> {
        let (rest, removed) = tree::remove(&self.tree, created.id());
        let removed = removed.ok_or_else(|| SidebarError::NotFound(created.id().to_string()))?;
        self.commit(tree::reindex_root(&rest));
        self.dispatcher.submit(
            Origin::Undo,
            BackendCommand::Delete(vec![DeleteTarget {
                id: removed.id().to_string(),
                is_folder: removed.is_folder(),
            }]),
        );
        Ok(())
    }

    // ─── Backend outcomes ───

    /// Handles every backend call that has already finished, without waiting.
    pub async fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(outcome) = self.dispatcher.try_next() {
            self.handle_outcome(outcome);
            handled += 1;
        }
        self.run_deferred_reload().await;
        handled
    }

    /// Waits for every queued backend call and handles its outcome.
    pub async fn settle(&mut self) -> usize {
        let mut handled = 0;
        while let Some(outcome) = self.dispatcher.next().await {
            self.handle_outcome(outcome);
            handled += 1;
        }
        self.run_deferred_reload().await;
        handled
    }

    fn handle_outcome(&mut self, outcome: DispatchOutcome) {
        // A restore that failed partway still re-created some nodes.
        if !outcome.restored.is_empty() {
            self.deferred_reload
                .get_or_insert_with(HashMap::new)
                .extend(outcome.restored);
        }
        match (outcome.origin, outcome.result) {
            (_, Ok(())) => {}
            (Origin::Forward, Err(e)) => {
                self.notices.push(Notice::MutationFailed {
                    action: outcome.kind,
                    message: e.0,
                });
            }
            (Origin::Undo, Err(e)) => {
                error!(kind = outcome.kind, error = %e, "undo rejected by backend; reload required");
                self.notices.push(Notice::UndoFailed {
                    action: outcome.kind,
                    message: e.0,
                });
                self.deferred_reload.get_or_insert_with(HashMap::new);
            }
        }
    }

    /// Reloads once nothing is queued, so the fresh snapshot already reflects every issued call.
    async fn run_deferred_reload(&mut self) {
        if self.dispatcher.in_flight() > 0 {
            return;
        }
        if let Some(id_map) = self.deferred_reload.take() {
            if let Err(e) = self.reload_with_id_map(&id_map).await {
                warn!(error = %e, "deferred reload failed");
            }
        }
    }

    // ─── Helpers ───

    fn bookmark(&self, id: &str) -> Result<Bookmark, SidebarError> {
        match self.locate(id) {
            Some(BookmarkNode::Bookmark(b)) => Ok(b.clone()),
            Some(BookmarkNode::Folder(_)) => Err(SidebarError::WrongKind {
                id: id.to_string(),
                expected: "bookmark",
            }),
            None => Err(SidebarError::NotFound(id.to_string())),
        }
    }
}

fn changes_match(current: &Bookmark, changes: &BookmarkChanges) -> bool {
    current.title == changes.title
        && current.url == changes.url
        && current.tags == changes.tags
        && current.keyword == changes.keyword
}

/// Applies `changes` to `current`. A new URL invalidates earlier enrichment verdicts.
fn with_changes(current: &Bookmark, changes: &BookmarkChanges) -> Bookmark {
    let url_changed = current.url != changes.url;
    Bookmark {
        title: changes.title.clone(),
        url: changes.url.clone(),
        tags: changes.tags.clone(),
        keyword: changes.keyword.clone(),
        status: if url_changed { LinkStatus::Unchecked } else { current.status },
        safety_status: if url_changed {
            SafetyStatus::Unknown
        } else {
            current.safety_status
        },
        ..current.clone()
    }
}
