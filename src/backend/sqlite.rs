//! Reference bookmark store backed by SQLite via `rusqlite`.
//!
//! Implements the same remove-then-insert move semantics as browser bookmark
//! stores, so the sidebar can be driven end to end without a browser.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use super::{BookmarkBackend, BookmarkChanges, NewBookmark, NewFolder};
use crate::database::Database;
use crate::tree;
use crate::types::bookmark::{Bookmark, BookmarkNode, Folder, Tree, ROOT_ID};
use crate::types::errors::BackendError;

const KIND_BOOKMARK: &str = "bookmark";
const KIND_FOLDER: &str = "folder";

const SELECT_COLUMNS: &str =
    "SELECT id, parent_id, position, kind, title, url, tags, keyword, date_added FROM bookmark_nodes";

/// A stored row: the node plus its raw placement.
struct NodeRow {
    parent_id: String,
    position: i64,
    node: BookmarkNode,
}

/// Bookmark store backed by a SQLite database.
pub struct SqliteBackend {
    db: Mutex<Database>,
}

impl SqliteBackend {
    /// Opens (or creates) the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BackendError> {
        Ok(Self::from_database(Database::open(path)?))
    }

    /// Opens a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self, BackendError> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    pub fn from_database(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>, BackendError> {
        self.db
            .lock()
            .map_err(|e| BackendError(format!("store lock poisoned: {}", e)))
    }

    /// Returns the current UNIX timestamp in milliseconds.
    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    fn row_to_node(row: &rusqlite::Row) -> rusqlite::Result<NodeRow> {
        let id: String = row.get(0)?;
        let parent_id: String = row.get(1)?;
        let position: i64 = row.get(2)?;
        let kind: String = row.get(3)?;
        let title: String = row.get(4)?;
        let date_added: i64 = row.get(8)?;
        let index = position.max(0) as usize;

        let node = if kind == KIND_FOLDER {
            BookmarkNode::Folder(Folder {
                id,
                parent_id: parent_id.clone(),
                index,
                title,
                children: Vec::new(),
                date_added,
            })
        } else {
            let url: Option<String> = row.get(5)?;
            let tags_json: String = row.get(6)?;
            let tags: BTreeSet<String> = serde_json::from_str(&tags_json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
            })?;
            BookmarkNode::Bookmark(Bookmark {
                id,
                parent_id: parent_id.clone(),
                index,
                title,
                url: url.unwrap_or_default(),
                tags,
                keyword: row.get(7)?,
                status: Default::default(),
                safety_status: Default::default(),
                date_added,
            })
        };

        Ok(NodeRow {
            parent_id,
            position,
            node,
        })
    }

    fn fetch_row(conn: &Connection, id: &str) -> Result<Option<NodeRow>, BackendError> {
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], Self::row_to_node).optional()?)
    }

    /// Checks that `parent_id` is the root or an existing folder.
    fn ensure_container(conn: &Connection, parent_id: &str) -> Result<(), BackendError> {
        if parent_id == ROOT_ID {
            return Ok(());
        }
        let kind: Option<String> = conn
            .query_row(
                "SELECT kind FROM bookmark_nodes WHERE id = ?1",
                params![parent_id],
                |row| row.get(0),
            )
            .optional()?;
        match kind.as_deref() {
            Some(KIND_FOLDER) => Ok(()),
            Some(_) => Err(BackendError(format!("not a folder: {}", parent_id))),
            None => Err(BackendError(format!("folder not found: {}", parent_id))),
        }
    }

    fn sibling_count(conn: &Connection, parent_id: &str, excluding: Option<&str>) -> Result<usize, BackendError> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM bookmark_nodes WHERE parent_id = ?1 AND id != COALESCE(?2, '')",
            params![parent_id, excluding],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    /// Opens a gap at `index` among the children of `parent_id`.
    fn open_gap(conn: &Connection, parent_id: &str, index: usize, excluding: Option<&str>) -> Result<(), BackendError> {
        conn.execute(
            "UPDATE bookmark_nodes SET position = position + 1 \
             WHERE parent_id = ?1 AND position >= ?2 AND id != COALESCE(?3, '')",
            params![parent_id, index as i64, excluding],
        )?;
        Ok(())
    }

    /// Closes the gap left at `position` among the children of `parent_id`.
    fn close_gap(conn: &Connection, parent_id: &str, position: i64) -> Result<(), BackendError> {
        conn.execute(
            "UPDATE bookmark_nodes SET position = position - 1 WHERE parent_id = ?1 AND position > ?2",
            params![parent_id, position],
        )?;
        Ok(())
    }

    /// Ids of `id` and everything below it.
    fn subtree_ids(conn: &Connection, id: &str) -> Result<Vec<String>, BackendError> {
        let mut stmt = conn.prepare(
            "WITH RECURSIVE subtree(id) AS ( \
                 SELECT id FROM bookmark_nodes WHERE id = ?1 \
                 UNION ALL \
                 SELECT n.id FROM bookmark_nodes n JOIN subtree s ON n.parent_id = s.id \
             ) SELECT id FROM subtree",
        )?;
        let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn insert_node(
        conn: &Connection,
        kind: &str,
        parent_id: &str,
        index: Option<usize>,
        title: &str,
        url: Option<&str>,
        tags: &BTreeSet<String>,
        keyword: Option<&str>,
    ) -> Result<String, BackendError> {
        Self::ensure_container(conn, parent_id)?;
        let count = Self::sibling_count(conn, parent_id, None)?;
        let index = index.unwrap_or(count).min(count);
        let id = Uuid::new_v4().to_string();
        let tags_json = serde_json::to_string(tags)?;

        let tx = conn.unchecked_transaction()?;
        Self::open_gap(&tx, parent_id, index, None)?;
        tx.execute(
            "INSERT INTO bookmark_nodes (id, parent_id, position, kind, title, url, tags, keyword, date_added) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![id, parent_id, index as i64, kind, title, url, tags_json, keyword, Self::now()],
        )?;
        tx.commit()?;
        Ok(id)
    }

    fn delete_kind(&self, id: &str, kind: &str) -> Result<(), BackendError> {
        let db = self.lock()?;
        let conn = db.connection();
        let row = Self::fetch_row(conn, id)?.ok_or_else(|| BackendError(format!("node not found: {}", id)))?;
        let is_folder = row.node.is_folder();
        if (kind == KIND_FOLDER) != is_folder {
            return Err(BackendError(format!("{} is not a {}", id, kind)));
        }

        let ids = Self::subtree_ids(conn, id)?;
        let tx = conn.unchecked_transaction()?;
        for node_id in &ids {
            tx.execute("DELETE FROM bookmark_nodes WHERE id = ?1", params![node_id])?;
        }
        Self::close_gap(&tx, &row.parent_id, row.position)?;
        tx.commit()?;
        debug!(id, removed = ids.len(), "deleted from store");
        Ok(())
    }
}

#[async_trait]
impl BookmarkBackend for SqliteBackend {
    async fn get_all_bookmarks(&self) -> Result<Tree, BackendError> {
        let db = self.lock()?;
        let mut stmt = db
            .connection()
            .prepare(&format!("{} ORDER BY parent_id, position", SELECT_COLUMNS))?;
        let rows = stmt.query_map([], Self::row_to_node)?;

        let mut by_parent: HashMap<String, Vec<(i64, BookmarkNode)>> = HashMap::new();
        for row in rows {
            let row = row?;
            by_parent.entry(row.parent_id).or_default().push((row.position, row.node));
        }

        fn build(parent_id: &str, by_parent: &mut HashMap<String, Vec<(i64, BookmarkNode)>>) -> Tree {
            let mut children = by_parent.remove(parent_id).unwrap_or_default();
            children.sort_by_key(|(position, _)| *position);
            children
                .into_iter()
                .map(|(_, node)| match node {
                    BookmarkNode::Folder(mut folder) => {
                        folder.children = build(&folder.id, by_parent);
                        BookmarkNode::Folder(folder)
                    }
                    bookmark => bookmark,
                })
                .collect()
        }

        Ok(tree::reindex_root(&build(ROOT_ID, &mut by_parent)))
    }

    async fn create_bookmark(&self, bookmark: NewBookmark) -> Result<BookmarkNode, BackendError> {
        let db = self.lock()?;
        let conn = db.connection();
        let id = Self::insert_node(
            conn,
            KIND_BOOKMARK,
            &bookmark.parent_id,
            bookmark.index,
            &bookmark.title,
            Some(&bookmark.url),
            &bookmark.tags,
            bookmark.keyword.as_deref(),
        )?;
        let row = Self::fetch_row(conn, &id)?.ok_or_else(|| BackendError(format!("node vanished: {}", id)))?;
        Ok(row.node)
    }

    async fn create_folder(&self, folder: NewFolder) -> Result<BookmarkNode, BackendError> {
        let db = self.lock()?;
        let conn = db.connection();
        let id = Self::insert_node(
            conn,
            KIND_FOLDER,
            &folder.parent_id,
            folder.index,
            &folder.title,
            None,
            &BTreeSet::new(),
            None,
        )?;
        let row = Self::fetch_row(conn, &id)?.ok_or_else(|| BackendError(format!("node vanished: {}", id)))?;
        Ok(row.node)
    }

    async fn update_bookmark(&self, id: &str, changes: BookmarkChanges) -> Result<(), BackendError> {
        let db = self.lock()?;
        let tags_json = serde_json::to_string(&changes.tags)?;
        let affected = db.connection().execute(
            "UPDATE bookmark_nodes SET title = ?1, url = ?2, tags = ?3, keyword = ?4 \
             WHERE id = ?5 AND kind = 'bookmark'",
            params![changes.title, changes.url, tags_json, changes.keyword, id],
        )?;
        if affected == 0 {
            return Err(BackendError(format!("bookmark not found: {}", id)));
        }
        Ok(())
    }

    async fn update_folder(&self, id: &str, title: &str) -> Result<(), BackendError> {
        let db = self.lock()?;
        let affected = db.connection().execute(
            "UPDATE bookmark_nodes SET title = ?1 WHERE id = ?2 AND kind = 'folder'",
            params![title, id],
        )?;
        if affected == 0 {
            return Err(BackendError(format!("folder not found: {}", id)));
        }
        Ok(())
    }

    async fn delete_bookmark(&self, id: &str) -> Result<(), BackendError> {
        self.delete_kind(id, KIND_BOOKMARK)
    }

    async fn delete_folder(&self, id: &str) -> Result<(), BackendError> {
        self.delete_kind(id, KIND_FOLDER)
    }

    async fn move_bookmark_or_folder(
        &self,
        id: &str,
        dest_parent_id: &str,
        dest_index: usize,
    ) -> Result<(), BackendError> {
        let db = self.lock()?;
        let conn = db.connection();
        let row = Self::fetch_row(conn, id)?.ok_or_else(|| BackendError(format!("node not found: {}", id)))?;
        Self::ensure_container(conn, dest_parent_id)?;
        if row.node.is_folder() && Self::subtree_ids(conn, id)?.iter().any(|n| n == dest_parent_id) {
            return Err(BackendError(format!("cannot move {} into its own subtree", id)));
        }

        let mut index = dest_index;
        if row.parent_id == dest_parent_id && index as i64 > row.position {
            index -= 1;
        }

        let tx = conn.unchecked_transaction()?;
        Self::close_gap(&tx, &row.parent_id, row.position)?;
        // Park the node out of the way while positions are shuffled.
        tx.execute(
            "UPDATE bookmark_nodes SET position = -1 WHERE id = ?1",
            params![id],
        )?;
        let count = Self::sibling_count(&tx, dest_parent_id, Some(id))?;
        let index = index.min(count);
        Self::open_gap(&tx, dest_parent_id, index, Some(id))?;
        tx.execute(
            "UPDATE bookmark_nodes SET parent_id = ?1, position = ?2 WHERE id = ?3",
            params![dest_parent_id, index as i64, id],
        )?;
        tx.commit()?;
        debug!(id, parent = dest_parent_id, index, "moved in store");
        Ok(())
    }
}
