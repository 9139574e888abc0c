//! Contract of the external bookmark store.
//!
//! The store owns the authoritative tree and assigns every identifier. Calls are
//! asynchronous, may fail, and offer no transaction spanning several calls.

pub mod sqlite;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::bookmark::{BookmarkNode, NodeId, Tree};
use crate::types::errors::BackendError;

pub use sqlite::SqliteBackend;

/// Parameters for creating a bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBookmark {
    pub parent_id: NodeId,
    #[serde(default)]
    pub index: Option<usize>,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub keyword: Option<String>,
}

/// Parameters for creating a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFolder {
    pub parent_id: NodeId,
    #[serde(default)]
    pub index: Option<usize>,
    pub title: String,
}

/// Full replacement of a bookmark's editable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkChanges {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub keyword: Option<String>,
}

#[async_trait]
pub trait BookmarkBackend: Send + Sync {
    /// Full snapshot of the authoritative tree.
    async fn get_all_bookmarks(&self) -> Result<Tree, BackendError>;
    async fn create_bookmark(&self, bookmark: NewBookmark) -> Result<BookmarkNode, BackendError>;
    async fn create_folder(&self, folder: NewFolder) -> Result<BookmarkNode, BackendError>;
    async fn update_bookmark(&self, id: &str, changes: BookmarkChanges) -> Result<(), BackendError>;
    async fn update_folder(&self, id: &str, title: &str) -> Result<(), BackendError>;
    async fn delete_bookmark(&self, id: &str) -> Result<(), BackendError>;
    /// Deletes the folder and everything below it.
    async fn delete_folder(&self, id: &str) -> Result<(), BackendError>;
    /// `dest_index` is counted against the destination's children *before* the node
    /// is taken out; for a same-parent move downward the store shifts it itself.
    async fn move_bookmark_or_folder(
        &self,
        id: &str,
        dest_parent_id: &str,
        dest_index: usize,
    ) -> Result<(), BackendError>;
}
