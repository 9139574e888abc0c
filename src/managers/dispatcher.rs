//! Ordered fire-and-forget backend dispatch.
//!
//! Local state is updated before a backend call is issued; the call itself is
//! queued here and executed by a single worker task in submission order, so an
//! undo can never overtake the mutation it compensates. Finished calls come back
//! as [`DispatchOutcome`]s for the sidebar to surface.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::backend::{BookmarkBackend, BookmarkChanges, NewBookmark, NewFolder};
use crate::types::bookmark::{remap_id, BookmarkNode, NodeId};
use crate::types::errors::BackendError;

/// Whether a call belongs to a forward mutation or to the execution of an undo entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Forward,
    Undo,
}

/// A node to delete and which backend call removes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTarget {
    pub id: NodeId,
    pub is_folder: bool,
}

#[derive(Debug, Clone)]
pub enum BackendCommand {
    /// Issued as a sequential loop of independent calls, not one atomic batch.
    Delete(Vec<DeleteTarget>),
    UpdateBookmark { id: NodeId, changes: BookmarkChanges },
    UpdateFolder { id: NodeId, title: String },
    Move { id: NodeId, parent_id: NodeId, index: usize },
    /// Re-creates deep-copied subtrees at their recorded positions.
    Restore(Vec<BookmarkNode>),
}

impl BackendCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            BackendCommand::Delete(_) => "delete",
            BackendCommand::UpdateBookmark { .. } | BackendCommand::UpdateFolder { .. } => "edit",
            BackendCommand::Move { .. } => "move",
            BackendCommand::Restore(_) => "restore",
        }
    }

    /// Rewrites placeholder ids that an earlier restore has since replaced.
    /// Restored nodes keep their own ids; only where they attach is rewritten.
    fn resolve_ids(&mut self, aliases: &HashMap<NodeId, NodeId>) {
        if aliases.is_empty() {
            return;
        }
        match self {
            BackendCommand::Delete(targets) => {
                for target in targets {
                    remap_id(&mut target.id, aliases);
                }
            }
            BackendCommand::UpdateBookmark { id, .. } | BackendCommand::UpdateFolder { id, .. } => {
                remap_id(id, aliases)
            }
            BackendCommand::Move { id, parent_id, .. } => {
                remap_id(id, aliases);
                remap_id(parent_id, aliases);
            }
            BackendCommand::Restore(nodes) => {
                for node in nodes {
                    if let Some(parent_id) = aliases.get(node.parent_id()).cloned() {
                        let index = node.index();
                        node.set_position(&parent_id, index);
                    }
                }
            }
        }
    }

    /// Runs the call. The map holds every node a restore re-created, even when a
    /// later create in the same restore failed.
    async fn execute(self, backend: &dyn BookmarkBackend) -> (Result<(), BackendError>, HashMap<NodeId, NodeId>) {
        let result = match self {
            BackendCommand::Restore(nodes) => {
                let (id_map, failure) = restore(backend, nodes).await;
                return (failure.map_or(Ok(()), Err), id_map);
            }
            BackendCommand::Delete(targets) => delete_all(backend, targets).await,
            BackendCommand::UpdateBookmark { id, changes } => backend.update_bookmark(&id, changes).await,
            BackendCommand::UpdateFolder { id, title } => backend.update_folder(&id, &title).await,
            BackendCommand::Move { id, parent_id, index } => {
                backend.move_bookmark_or_folder(&id, &parent_id, index).await
            }
        };
        (result, HashMap::new())
    }
}

async fn delete_all(backend: &dyn BookmarkBackend, targets: Vec<DeleteTarget>) -> Result<(), BackendError> {
    let total = targets.len();
    let mut failed = Vec::new();
    for target in targets {
        let result = if target.is_folder {
            backend.delete_folder(&target.id).await
        } else {
            backend.delete_bookmark(&target.id).await
        };
        if let Err(e) = result {
            failed.push(format!("{} ({})", target.id, e.0));
        }
    }
    if failed.is_empty() {
        Ok(())
    } else {
        Err(BackendError(format!(
            "{} of {} deletions failed: {}",
            failed.len(),
            total,
            failed.join(", ")
        )))
    }
}

/// Breadth-first re-creation: a folder is created before its children so their
/// parent id can be mapped onto the id the backend just assigned. Stops at the
/// first failed create and returns the ids assigned up to that point.
async fn restore(
    backend: &dyn BookmarkBackend,
    mut nodes: Vec<BookmarkNode>,
) -> (HashMap<NodeId, NodeId>, Option<BackendError>) {
    nodes.sort_by_key(BookmarkNode::index);
    let mut id_map: HashMap<NodeId, NodeId> = HashMap::new();
    let mut queue: VecDeque<BookmarkNode> = nodes.into();

    while let Some(node) = queue.pop_front() {
        let parent_id = id_map
            .get(node.parent_id())
            .cloned()
            .unwrap_or_else(|| node.parent_id().to_string());
        let created = match &node {
            BookmarkNode::Bookmark(b) => {
                backend
                    .create_bookmark(NewBookmark {
                        parent_id,
                        index: Some(b.index),
                        title: b.title.clone(),
                        url: b.url.clone(),
                        tags: b.tags.clone(),
                        keyword: b.keyword.clone(),
                    })
                    .await
            }
            BookmarkNode::Folder(f) => {
                backend
                    .create_folder(NewFolder {
                        parent_id,
                        index: Some(f.index),
                        title: f.title.clone(),
                    })
                    .await
            }
        };
        let created = match created {
            Ok(created) => created,
            Err(e) => return (id_map, Some(e)),
        };
        id_map.insert(node.id().to_string(), created.id().to_string());
        if let BookmarkNode::Folder(folder) = node {
            queue.extend(folder.children);
        }
    }
    (id_map, None)
}

#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub origin: Origin,
    pub kind: &'static str,
    pub result: Result<(), BackendError>,
    /// Placeholder id → id assigned by the backend, for nodes a restore re-created.
    pub restored: HashMap<NodeId, NodeId>,
}

struct Job {
    origin: Origin,
    command: BackendCommand,
}

/// Handle to the backend worker task.
pub struct Dispatcher {
    jobs: mpsc::UnboundedSender<Job>,
    outcomes: mpsc::UnboundedReceiver<DispatchOutcome>,
    in_flight: usize,
}

impl Dispatcher {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn(backend: Arc<dyn BookmarkBackend>) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(backend, jobs_rx, outcomes_tx));
        Self {
            jobs: jobs_tx,
            outcomes: outcomes_rx,
            in_flight: 0,
        }
    }

    /// Queues a call; never waits for it.
    pub fn submit(&mut self, origin: Origin, command: BackendCommand) {
        debug!(kind = command.kind(), ?origin, "queueing backend call");
        if self.jobs.send(Job { origin, command }).is_ok() {
            self.in_flight += 1;
        } else {
            warn!("backend worker has stopped; call dropped");
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Next finished call, if one is ready.
    pub fn try_next(&mut self) -> Option<DispatchOutcome> {
        let outcome = self.outcomes.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(outcome)
    }

    /// Waits for the next finished call; `None` once nothing is in flight.
    pub async fn next(&mut self) -> Option<DispatchOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        let outcome = self.outcomes.recv().await;
        self.in_flight = if outcome.is_some() { self.in_flight - 1 } else { 0 };
        outcome
    }
}

async fn run_worker(
    backend: Arc<dyn BookmarkBackend>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    outcomes: mpsc::UnboundedSender<DispatchOutcome>,
) {
    // Placeholder id → backend id, for every node restored so far.
    let mut aliases: HashMap<NodeId, NodeId> = HashMap::new();
    while let Some(Job { origin, mut command }) = jobs.recv().await {
        let kind = command.kind();
        command.resolve_ids(&aliases);
        let (result, restored) = command.execute(backend.as_ref()).await;
        aliases.extend(restored.iter().map(|(old, new)| (old.clone(), new.clone())));
        if let Err(e) = &result {
            warn!(kind, ?origin, error = %e, restored = restored.len(), "backend call failed");
        }
        // The sidebar may be gone; remaining calls still run to completion.
        let _ = outcomes.send(DispatchOutcome {
            origin,
            kind,
            result,
            restored,
        });
    }
}
