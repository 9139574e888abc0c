//! Unit tests for the RPC handler: JSON-RPC methods dispatched by `handle_method`.
//!
//! These tests go through the same code path as the `marksync-rpc` binary, over
//! an in-memory store and a settings file in a temp directory.

use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Mutex;

use marksync::app::App;
use marksync::backend::SqliteBackend;
use marksync::rpc_handler::handle_method;
use marksync::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

fn engine(tmp: &TempDir) -> SettingsEngine {
    let path = tmp.path().join("settings.json").to_string_lossy().to_string();
    SettingsEngine::new(Some(path))
}

async fn start(settings: SettingsEngine) -> Mutex<App> {
    let backend = SqliteBackend::open_in_memory().expect("in-memory store should open");
    let mut app = App::with_backend(settings, Arc::new(backend));
    app.startup().await;
    Mutex::new(app)
}

/// Create a fresh, loaded App with an empty store.
async fn setup() -> (Mutex<App>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let app = start(engine(&tmp)).await;
    (app, tmp)
}

async fn call(app: &Mutex<App>, method: &str, params: Value) -> Value {
    handle_method(app, method, &params)
        .await
        .unwrap_or_else(|e| panic!("{} failed: {}", method, e))
}

async fn create_folder(app: &Mutex<App>, parent_id: &str, title: &str) -> String {
    let node = call(app, "folder.create", json!({"parent_id": parent_id, "title": title})).await;
    node["id"].as_str().unwrap().to_string()
}

async fn create_bookmark(app: &Mutex<App>, parent_id: &str, title: &str, url: &str) -> String {
    let node = call(
        app,
        "bookmark.create",
        json!({"parent_id": parent_id, "title": title, "url": url}),
    )
    .await;
    node["id"].as_str().unwrap().to_string()
}

async fn root_titles(app: &Mutex<App>) -> Vec<String> {
    let res = call(app, "tree.get", json!({})).await;
    res["tree"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["title"].as_str().unwrap().to_string())
        .collect()
}

// ─── Ping ───

#[tokio::test]
async fn test_ping() {
    let (app, _tmp) = setup().await;
    let res = handle_method(&app, "ping", &json!({})).await.unwrap();
    assert_eq!(res, json!({"pong": true}));
}

// ─── Unknown method ───

#[tokio::test]
async fn test_unknown_method_returns_error() {
    let (app, _tmp) = setup().await;
    let res = handle_method(&app, "nonexistent.method", &json!({})).await;
    assert!(res.unwrap_err().contains("unknown method"));
}

// ─── Tree ───

#[tokio::test]
async fn test_tree_get_after_startup() {
    let (app, _tmp) = setup().await;
    let res = call(&app, "tree.get", json!({})).await;
    assert_eq!(res["tree"], json!([]));
    assert_eq!(res["state"], json!({"state": "ready"}));
}

#[tokio::test]
async fn test_create_and_reload() {
    let (app, _tmp) = setup().await;
    let work = create_folder(&app, "root", "Work").await;
    create_bookmark(&app, &work, "Docs", "https://docs.rs").await;

    let res = call(&app, "tree.reload", json!({})).await;
    assert_eq!(res["nodes"], 2);

    let tree = call(&app, "tree.get", json!({})).await;
    assert_eq!(tree["tree"][0]["type"], "folder");
    assert_eq!(tree["tree"][0]["children"][0]["url"], "https://docs.rs");
}

// ─── Mutations ───

#[tokio::test]
async fn test_bookmark_create_invalid_url() {
    let (app, _tmp) = setup().await;
    let res = handle_method(
        &app,
        "bookmark.create",
        &json!({"parent_id": "root", "title": "Bad", "url": "not a url"}),
    )
    .await;
    assert!(res.unwrap_err().contains("invalid url"));
}

#[tokio::test]
async fn test_bookmark_create_missing_params() {
    let (app, _tmp) = setup().await;
    let res = handle_method(&app, "bookmark.create", &json!({"parent_id": "root", "url": "https://x.com"})).await;
    assert!(res.unwrap_err().contains("invalid params"));
}

#[tokio::test]
async fn test_delete_and_undo() {
    let (app, _tmp) = setup().await;
    create_folder(&app, "root", "A").await;
    let b = create_folder(&app, "root", "B").await;

    let res = call(&app, "node.delete", json!({"ids": [b]})).await;
    assert_eq!(res["removed"], 1);
    assert_eq!(root_titles(&app).await, vec!["A"]);

    let res = call(&app, "undo", json!({})).await;
    assert_eq!(res["undone"], "delete");
    assert_eq!(root_titles(&app).await, vec!["A", "B"]);

    let res = call(&app, "undo", json!({})).await;
    assert_eq!(res["undone"], "create");
}

#[tokio::test]
async fn test_node_move() {
    let (app, _tmp) = setup().await;
    create_folder(&app, "root", "A").await;
    let b = create_folder(&app, "root", "B").await;

    let res = call(
        &app,
        "node.move",
        json!({"id": b, "target": {"target": "slot", "parent_id": "root", "index": 0}}),
    )
    .await;
    assert_eq!(res["noop"], false);
    assert_eq!(res["index"], 0);
    assert_eq!(root_titles(&app).await, vec!["B", "A"]);

    let res = call(
        &app,
        "node.move",
        json!({"id": b, "target": {"target": "slot", "parent_id": "root", "index": 0}}),
    )
    .await;
    assert_eq!(res["noop"], true);
}

#[tokio::test]
async fn test_node_move_into_itself_is_rejected() {
    let (app, _tmp) = setup().await;
    let a = create_folder(&app, "root", "A").await;
    let res = handle_method(
        &app,
        "node.move",
        &json!({"id": a, "target": {"target": "row", "target_id": a, "zone": "inside"}}),
    )
    .await;
    assert!(res.unwrap_err().contains("Invalid drop"));
}

#[tokio::test]
async fn test_edit_duplicate_url_then_confirm() {
    let (app, _tmp) = setup().await;
    create_bookmark(&app, "root", "One", "https://one.com").await;
    let two = create_bookmark(&app, "root", "Two", "https://two.com").await;

    let res = call(
        &app,
        "bookmark.edit",
        json!({"id": two, "title": "Two", "url": "https://one.com"}),
    )
    .await;
    assert_eq!(res["outcome"], "duplicate_url");
    assert_eq!(res["existing"]["title"], "One");

    call(&app, "edit.confirm", json!({})).await;
    let tree = call(&app, "tree.get", json!({})).await;
    assert_eq!(tree["tree"][1]["url"], "https://one.com");

    let res = call(&app, "edit.cancel", json!({})).await;
    assert_eq!(res["cancelled"], false);
}

#[tokio::test]
async fn test_folder_rename_and_paths() {
    let (app, _tmp) = setup().await;
    let work = create_folder(&app, "root", "Work").await;
    create_folder(&app, &work, "Rust").await;

    call(&app, "folder.rename", json!({"id": work, "title": "Job"})).await;
    let paths = call(&app, "folders.paths", json!({})).await;
    let rendered: Vec<&str> = paths
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["path"].as_str().unwrap())
        .collect();
    assert_eq!(rendered, vec!["Job", "Job / Rust"]);
}

#[tokio::test]
async fn test_notices_take_is_empty_without_failures() {
    let (app, _tmp) = setup().await;
    let res = call(&app, "notices.take", json!({})).await;
    assert_eq!(res, json!([]));
}

// ─── Enrichment ───

#[tokio::test]
async fn test_enrichment_pending_and_apply() {
    let (app, _tmp) = setup().await;
    let id = create_bookmark(&app, "root", "Docs", "https://docs.rs").await;

    let pending = call(&app, "enrichment.pending", json!({})).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    call(
        &app,
        "enrichment.apply",
        json!({"id": id, "status": "live", "safety": "safe"}),
    )
    .await;
    let pending = call(&app, "enrichment.pending", json!({})).await;
    assert_eq!(pending, json!([]));

    let res = handle_method(
        &app,
        "enrichment.apply",
        &json!({"id": id, "status": "bogus", "safety": "safe"}),
    )
    .await;
    assert!(res.unwrap_err().contains("invalid status"));
}

#[tokio::test]
async fn test_enrichment_run_when_disabled() {
    let tmp = TempDir::new().unwrap();
    let mut settings = engine(&tmp);
    settings.load().unwrap();
    settings.set_value("enrichment.enabled", json!(false)).unwrap();
    let app = start(settings).await;

    let res = handle_method(&app, "enrichment.run", &json!({})).await;
    assert!(res.unwrap_err().contains("disabled"));
}

#[tokio::test]
async fn test_enrichment_follows_settings_at_runtime() {
    let (app, _tmp) = setup().await;
    call(
        &app,
        "settings.set",
        json!({"key": "enrichment.enabled", "value": false}),
    )
    .await;
    assert!(app.lock().await.link_checker.is_none());
    let res = handle_method(&app, "enrichment.run", &json!({})).await;
    assert!(res.unwrap_err().contains("disabled"));

    call(
        &app,
        "settings.set",
        json!({"key": "enrichment.enabled", "value": true}),
    )
    .await;
    assert_eq!(
        app.lock().await.link_checker.is_some(),
        cfg!(feature = "network")
    );
}

#[cfg(feature = "network")]
#[tokio::test]
async fn test_enrichment_run_after_reenabling() {
    let tmp = TempDir::new().unwrap();
    let mut settings = engine(&tmp);
    settings.load().unwrap();
    settings.set_value("enrichment.enabled", json!(false)).unwrap();
    let app = start(settings).await;
    assert!(handle_method(&app, "enrichment.run", &json!({})).await.is_err());

    call(
        &app,
        "settings.set",
        json!({"key": "enrichment.enabled", "value": true}),
    )
    .await;
    // Empty store: nothing to check, and no network traffic.
    let res = call(&app, "enrichment.run", json!({})).await;
    assert_eq!(res["checked"], 0);
}

// ─── Settings ───

#[tokio::test]
async fn test_settings_set_updates_path_separator() {
    let (app, _tmp) = setup().await;
    let work = create_folder(&app, "root", "Work").await;
    create_folder(&app, &work, "Rust").await;

    call(
        &app,
        "settings.set",
        json!({"key": "display.path_separator", "value": " > "}),
    )
    .await;
    let settings = call(&app, "settings.get", json!({})).await;
    assert_eq!(settings["display"]["path_separator"], " > ");

    let paths = call(&app, "folders.paths", json!({})).await;
    assert_eq!(paths[1]["path"], "Work > Rust");
}

#[tokio::test]
async fn test_settings_set_invalid_key() {
    let (app, _tmp) = setup().await;
    let res = handle_method(&app, "settings.set", &json!({"key": "nope", "value": 1})).await;
    assert!(res.is_err());
    let res = handle_method(&app, "settings.set", &json!({"key": "logging.filter"})).await;
    assert!(res.unwrap_err().contains("missing value"));
}
