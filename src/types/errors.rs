use thiserror::Error;

// === TreeError ===

/// Errors raised by the pure tree operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The node with the given ID is not in the tree.
    #[error("Node not found: {0}")]
    NodeNotFound(String),
    /// The insertion parent is neither the root nor a folder in the tree.
    #[error("Parent folder not found: {0}")]
    ParentNotFound(String),
    /// The insertion index is past the end of the sibling list.
    #[error("Index {index} out of range for parent {parent_id} with {len} children")]
    IndexOutOfRange {
        parent_id: String,
        index: usize,
        len: usize,
    },
}

// === BackendError ===

/// Any failure reported by the external bookmark store.
///
/// Network, permission and not-found failures are deliberately not told apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Bookmark backend error: {0}")]
pub struct BackendError(pub String);

impl From<rusqlite::Error> for BackendError {
    fn from(e: rusqlite::Error) -> Self {
        BackendError(e.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        BackendError(e.to_string())
    }
}

// === DropRejection ===

/// Reasons a drag-and-drop gesture cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropRejection {
    /// The dragged node is not in the tree.
    #[error("Dragged node not found: {0}")]
    UnknownNode(String),
    /// The row or folder under the pointer is not in the tree.
    #[error("Drop target not found: {0}")]
    UnknownTarget(String),
    /// Dropping inside something that is not a folder.
    #[error("Drop target is not a folder: {0}")]
    NotAFolder(String),
    /// A folder dropped onto itself.
    #[error("Cannot drop folder into itself: {0}")]
    IntoSelf(String),
    /// A folder dropped into one of its own descendants.
    #[error("Cannot drop folder {folder} into its descendant {target}")]
    IntoDescendant { folder: String, target: String },
    /// The requested slot is past the end of the destination's children.
    #[error("Drop index {index} out of range for {parent_id}")]
    IndexOutOfRange { parent_id: String, index: usize },
}

// === SidebarError ===

/// Errors surfaced by the sidebar's mutation, undo and sync operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SidebarError {
    /// The tree has not been loaded yet (or the last load failed).
    #[error("Bookmark tree is not loaded")]
    NotLoaded,
    /// Fetching the authoritative tree failed.
    #[error("Failed to load bookmarks: {0}")]
    LoadFailed(String),
    /// The node with the given ID is not in the local tree.
    #[error("Bookmark node not found: {0}")]
    NotFound(String),
    /// An operation was invoked on the wrong node variant.
    #[error("Wrong node kind for {id}: expected {expected}")]
    WrongKind { id: String, expected: &'static str },
    /// A delete was requested with no targets.
    #[error("No bookmarks selected")]
    NothingSelected,
    /// There is no parked edit to confirm.
    #[error("No pending edit")]
    NoPendingEdit,
    /// The drop gesture was rejected; nothing changed.
    #[error("Invalid drop: {0}")]
    InvalidDrop(#[from] DropRejection),
    /// A tree operation failed locally.
    #[error("Tree operation failed: {0}")]
    Tree(#[from] TreeError),
    /// A call the sidebar awaited directly (create) was rejected.
    #[error("{0}")]
    Backend(#[from] BackendError),
    /// The inverse of an undo entry could not be applied; the tree was reloaded.
    #[error("Undo of {action} failed: {message}")]
    UndoFailed {
        action: &'static str,
        message: String,
    },
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

// === LinkCheckError ===

/// Errors related to link reachability checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkCheckError {
    /// The URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// The HTTP client could not be constructed.
    #[error("Link checker setup failed: {0}")]
    Client(String),
}
