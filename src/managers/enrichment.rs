//! Applying link-check verdicts to the local tree.
//!
//! Verdicts are plain field updates: they never change the tree's shape and are
//! not recorded in the undo log.

use tracing::{debug, warn};

use super::sidebar::{Notice, Sidebar};
use crate::services::link_checker::LinkChecker;
use crate::tree;
use crate::types::bookmark::{Bookmark, BookmarkNode, LinkStatus, NodeId, SafetyStatus};
use crate::types::errors::SidebarError;

impl Sidebar {
    /// Bookmarks that have not been checked yet, in display order.
    pub fn pending_enrichment(&self) -> Vec<Bookmark> {
        tree::flatten(&self.tree)
            .into_iter()
            .filter_map(BookmarkNode::as_bookmark)
            .filter(|b| b.status == LinkStatus::Unchecked)
            .cloned()
            .collect()
    }

    pub fn apply_enrichment(
        &mut self,
        id: &str,
        status: LinkStatus,
        safety: SafetyStatus,
    ) -> Result<(), SidebarError> {
        match self.locate(id) {
            Some(BookmarkNode::Bookmark(_)) => {}
            Some(BookmarkNode::Folder(_)) => {
                return Err(SidebarError::WrongKind {
                    id: id.to_string(),
                    expected: "bookmark",
                })
            }
            None => return Err(SidebarError::NotFound(id.to_string())),
        }
        let next = tree::update(&self.tree, id, |node| match node {
            BookmarkNode::Bookmark(b) => BookmarkNode::Bookmark(Bookmark {
                status,
                safety_status: safety,
                ..b.clone()
            }),
            other => other.clone(),
        });
        self.commit(next);
        Ok(())
    }

    /// Checks every pending bookmark one after another. Returns how many were checked.
    pub async fn enrich_pending(&mut self, checker: &dyn LinkChecker) -> Result<usize, SidebarError> {
        self.require_loaded()?;
        let pending = self.pending_enrichment();
        if pending.is_empty() {
            return Ok(0);
        }

        for bookmark in &pending {
            self.apply_enrichment(&bookmark.id, LinkStatus::Checking, SafetyStatus::Checking)?;
        }

        let mut failures: Vec<(NodeId, String)> = Vec::new();
        for bookmark in &pending {
            let (status, safety) = match checker.check(&bookmark.url).await {
                Ok(report) => (report.status, report.safety),
                Err(e) => {
                    failures.push((bookmark.id.clone(), e.to_string()));
                    (LinkStatus::Dead, SafetyStatus::Unknown)
                }
            };
            debug!(id = %bookmark.id, ?status, ?safety, "link checked");
            self.apply_enrichment(&bookmark.id, status, safety)?;
        }

        if !failures.is_empty() {
            warn!(failed = failures.len(), "link checks failed");
            let message = failures
                .iter()
                .map(|(id, e)| format!("{} ({})", id, e))
                .collect::<Vec<_>>()
                .join(", ");
            self.notices.push(Notice::EnrichmentFailed {
                failed: failures.len(),
                message,
            });
        }
        Ok(pending.len())
    }
}
