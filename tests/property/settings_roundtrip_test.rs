//! Property-based tests for SidebarSettings serialization round-trip.
//!
//! These tests verify that SidebarSettings can be serialized to JSON and
//! deserialized back without data loss, and that a value written through the
//! settings engine is read back by a fresh engine.

use marksync::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use marksync::types::settings::{
    DisplaySettings, EnrichmentSettings, LoggingSettings, SidebarSettings, StorageSettings,
};
use proptest::prelude::*;
use tempfile::TempDir;

// --- Arbitrary strategies for all settings sub-types ---

fn arb_storage_settings() -> impl Strategy<Value = StorageSettings> {
    proptest::option::of("[a-zA-Z0-9/._-]{1,40}")
        .prop_map(|database_path| StorageSettings { database_path })
}

fn arb_enrichment_settings() -> impl Strategy<Value = EnrichmentSettings> {
    (any::<bool>(), 1u64..=120, "[a-zA-Z0-9/. ]{1,30}").prop_map(
        |(enabled, request_timeout_secs, user_agent)| EnrichmentSettings {
            enabled,
            request_timeout_secs,
            user_agent,
        },
    )
}

fn arb_display_settings() -> impl Strategy<Value = DisplaySettings> {
    prop_oneof![Just(" / ".to_string()), Just(" > ".to_string()), "[ /|>:-]{1,3}"]
        .prop_map(|path_separator| DisplaySettings { path_separator })
}

fn arb_logging_settings() -> impl Strategy<Value = LoggingSettings> {
    prop_oneof![
        Just("info".to_string()),
        Just("debug".to_string()),
        "marksync=(trace|debug|warn)",
    ]
    .prop_map(|filter| LoggingSettings { filter })
}

fn arb_sidebar_settings() -> impl Strategy<Value = SidebarSettings> {
    (
        arb_storage_settings(),
        arb_enrichment_settings(),
        arb_display_settings(),
        arb_logging_settings(),
    )
        .prop_map(|(storage, enrichment, display, logging)| SidebarSettings {
            storage,
            enrichment,
            display,
            logging,
        })
}

// **Property 7: Settings serialization round-trip**
//
// *For any* valid `SidebarSettings` struct, serializing to JSON then
// deserializing SHALL produce an equivalent struct.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn settings_serialization_roundtrip(settings in arb_sidebar_settings()) {
        let json = serde_json::to_string(&settings)
            .expect("Serialization to JSON should succeed for any valid SidebarSettings");

        let deserialized: SidebarSettings = serde_json::from_str(&json)
            .expect("Deserialization from JSON should succeed for valid JSON");

        prop_assert_eq!(deserialized, settings);
    }
}

// **Property 8: Values set through the engine persist**
//
// *For any* path separator, `set_value` followed by a fresh `load` on the same
// file SHALL return the separator unchanged.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn set_value_persists(separator in "[ /|>:-]{1,3}") {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json").to_string_lossy().to_string();

        let mut engine = SettingsEngine::new(Some(path.clone()));
        engine.load().unwrap();
        engine.set_value("display.path_separator", serde_json::json!(separator.clone())).unwrap();

        let mut fresh = SettingsEngine::new(Some(path));
        let loaded = fresh.load().unwrap();
        prop_assert_eq!(loaded.display.path_separator, separator);
    }
}
