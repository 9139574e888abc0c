//! App core for marksync.
//!
//! Central struct wiring the settings, the bookmark store and the sidebar, and
//! managing their lifecycle.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::{BookmarkBackend, SqliteBackend};
use crate::managers::sidebar::Sidebar;
use crate::platform;
use crate::services::link_checker::LinkChecker;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

/// Central application struct holding the sidebar and its collaborators.
pub struct App {
    pub settings_engine: SettingsEngine,
    pub sidebar: Sidebar,
    /// `None` when enrichment is disabled in the settings.
    pub link_checker: Option<Box<dyn LinkChecker>>,
}

impl App {
    /// Creates an App from already-loaded settings, opening the SQLite store at
    /// `storage.database_path` or `<data_dir>/bookmarks.db`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(
        settings_engine: SettingsEngine,
        data_dir: Option<PathBuf>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let db_path = match &settings_engine.get_settings().storage.database_path {
            Some(path) => PathBuf::from(path),
            None => data_dir
                .unwrap_or_else(platform::get_data_dir)
                .join("bookmarks.db"),
        };
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let backend = SqliteBackend::open(&db_path)
            .map_err(|e| format!("Bookmark store init failed: {}", e))?;
        info!(path = %db_path.display(), "bookmark store opened");
        Ok(Self::with_backend(settings_engine, Arc::new(backend)))
    }

    /// Creates an App over any backend, e.g. an in-memory store.
    pub fn with_backend(settings_engine: SettingsEngine, backend: Arc<dyn BookmarkBackend>) -> Self {
        let settings = settings_engine.get_settings().clone();
        let sidebar = Sidebar::new(backend).with_path_separator(settings.display.path_separator.clone());
        let link_checker = link_checker_for(&settings.enrichment);

        Self {
            settings_engine,
            sidebar,
            link_checker,
        }
    }

    /// Rebuilds the link checker from the current `enrichment` settings.
    pub fn apply_enrichment_settings(&mut self) {
        let enrichment = &self.settings_engine.get_settings().enrichment;
        self.link_checker = link_checker_for(enrichment);
        info!(enabled = self.link_checker.is_some(), "enrichment settings applied");
    }

    /// Startup sequence: initial load of the bookmark tree.
    ///
    /// A failed load leaves the sidebar in its blocking error state; the caller
    /// can retry with `tree.reload`.
    pub async fn startup(&mut self) {
        if let Err(e) = self.sidebar.load().await {
            warn!(error = %e, "initial bookmark load failed");
        }
    }

    /// Shutdown sequence: wait for queued backend calls to finish.
    pub async fn shutdown(&mut self) {
        let handled = self.sidebar.settle().await;
        info!(handled, "sidebar settled");
    }
}

fn link_checker_for(
    settings: &crate::types::settings::EnrichmentSettings,
) -> Option<Box<dyn LinkChecker>> {
    if settings.enabled {
        default_link_checker(settings)
    } else {
        None
    }
}

#[cfg(feature = "network")]
fn default_link_checker(
    settings: &crate::types::settings::EnrichmentSettings,
) -> Option<Box<dyn LinkChecker>> {
    use crate::services::link_checker::HttpLinkChecker;

    match HttpLinkChecker::new(settings) {
        Ok(checker) => Some(Box::new(checker)),
        Err(e) => {
            warn!(error = %e, "link checker unavailable");
            None
        }
    }
}

#[cfg(not(feature = "network"))]
fn default_link_checker(
    _settings: &crate::types::settings::EnrichmentSettings,
) -> Option<Box<dyn LinkChecker>> {
    None
}
