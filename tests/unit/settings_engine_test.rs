//! Integration-level unit tests for the SettingsEngine public API.
//!
//! These tests exercise the SettingsEngine through its public trait interface,
//! validating default loading, value persistence, validation and reset.

use marksync::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use marksync::types::errors::SettingsError;
use marksync::types::settings::{DisplaySettings, SidebarSettings};
use serde_json::json;
use tempfile::TempDir;

/// Helper: create a SettingsEngine backed by a temp directory that lives for the
/// duration of the test (the caller holds the `TempDir` handle).
fn engine_in_temp(dir: &TempDir) -> SettingsEngine {
    let path = dir
        .path()
        .join("settings.json")
        .to_string_lossy()
        .to_string();
    SettingsEngine::new(Some(path))
}

/// When no config file exists on disk, `load()` returns the built-in defaults.
#[test]
fn test_load_defaults_when_no_config_file_exists() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let settings = engine.load().unwrap();

    assert_eq!(settings, SidebarSettings::default());
    assert_eq!(settings.display.path_separator, " / ");
    assert!(settings.enrichment.enabled);
}

/// A change made through `set_value` is visible to a fresh engine on the same file.
#[test]
fn test_set_value_persists_changes() {
    let dir = TempDir::new().unwrap();

    {
        let mut engine = engine_in_temp(&dir);
        engine.load().unwrap();
        engine
            .set_value("display.path_separator", json!(" > "))
            .unwrap();
        engine
            .set_value("enrichment.request_timeout_secs", json!(3))
            .unwrap();
    }

    {
        let mut engine2 = engine_in_temp(&dir);
        let loaded = engine2.load().unwrap();
        assert_eq!(loaded.display.path_separator, " > ");
        assert_eq!(loaded.enrichment.request_timeout_secs, 3);
    }
}

#[test]
fn test_set_value_accepts_optional_paths() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    engine
        .set_value("storage.database_path", json!("/tmp/marks.db"))
        .unwrap();
    assert_eq!(
        engine.get_settings().storage.database_path.as_deref(),
        Some("/tmp/marks.db")
    );
}

#[test]
fn test_set_value_rejects_unknown_keys() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    assert!(matches!(
        engine.set_value("display.theme", json!("dark")),
        Err(SettingsError::InvalidKey(_))
    ));
    assert!(matches!(
        engine.set_value("", json!(1)),
        Err(SettingsError::InvalidKey(_))
    ));
    assert_eq!(*engine.get_settings(), SidebarSettings::default());
}

#[test]
fn test_set_value_rejects_wrong_types() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    assert!(matches!(
        engine.set_value("enrichment.request_timeout_secs", json!("soon")),
        Err(SettingsError::InvalidValue(_))
    ));
    assert_eq!(engine.get_settings().enrichment.request_timeout_secs, 10);
}

#[test]
fn test_load_malformed_file_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();
    let mut engine = engine_in_temp(&dir);

    assert!(matches!(
        engine.load(),
        Err(SettingsError::SerializationError(_))
    ));
}

#[test]
fn test_load_partial_file_fills_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("settings.json"),
        r#"{"logging": {"filter": "debug"}}"#,
    )
    .unwrap();
    let mut engine = engine_in_temp(&dir);

    let loaded = engine.load().unwrap();
    assert_eq!(loaded.logging.filter, "debug");
    assert_eq!(loaded.display, DisplaySettings::default());
}

/// After modifying settings and calling `reset()`, all values revert to
/// defaults and the defaults are persisted to disk.
#[test]
fn test_reset_restores_defaults() {
    let dir = TempDir::new().unwrap();

    {
        let mut engine = engine_in_temp(&dir);
        engine.load().unwrap();

        engine.set_value("enrichment.enabled", json!(false)).unwrap();
        engine.set_value("logging.filter", json!("trace")).unwrap();
        assert!(!engine.get_settings().enrichment.enabled);

        engine.reset().unwrap();
        assert_eq!(*engine.get_settings(), SidebarSettings::default());
    }

    {
        let mut engine2 = engine_in_temp(&dir);
        let loaded = engine2.load().unwrap();
        assert_eq!(loaded, SidebarSettings::default());
    }
}
