// marksync state managers
// Managers own mutable session state: the sidebar (tree + undo log), its backend queue and sync.

pub mod dispatcher;
pub mod enrichment;
pub mod sidebar;
pub mod sync;
pub mod undo_log;

pub use sidebar::{EditOutcome, Notice, PendingEdit, Sidebar, SidebarState};
pub use sync::LoadState;
