use serde::{Deserialize, Serialize};

/// Top-level sidebar settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SidebarSettings {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub enrichment: EnrichmentSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where the reference SQLite store lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageSettings {
    /// `None` means `<data dir>/bookmarks.db`.
    pub database_path: Option<String>,
}

/// Link reachability and safety checking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichmentSettings {
    pub enabled: bool,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            request_timeout_secs: 10,
            user_agent: format!("marksync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Rendering of derived read models.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplaySettings {
    /// Separator between folder titles in a rendered folder path.
    pub path_separator: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            path_separator: " / ".to_string(),
        }
    }
}

/// Log output configuration; `RUST_LOG` takes precedence when set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
