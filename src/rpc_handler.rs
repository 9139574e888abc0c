//! RPC method handler for the marksync JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be tested independently. The
//! `handle_method` function dispatches JSON-RPC method calls onto the sidebar
//! and settings held by the `App` struct.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use url::Url;

use crate::app::App;
use crate::backend::{BookmarkChanges, NewBookmark, NewFolder};
use crate::services::drop_resolver::DropTarget;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::bookmark::{LinkStatus, NodeId, SafetyStatus};

fn str_param<'a>(params: &'a Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", key))
}

fn parse_params<T: DeserializeOwned>(params: &Value) -> Result<T, String> {
    serde_json::from_value(params.clone()).map_err(|e| format!("invalid params: {}", e))
}

fn parse_field<T: DeserializeOwned>(params: &Value, key: &str) -> Result<T, String> {
    let value = params.get(key).cloned().ok_or_else(|| format!("missing {}", key))?;
    serde_json::from_value(value).map_err(|e| format!("invalid {}: {}", key, e))
}

fn validate_url(url: &str) -> Result<(), String> {
    Url::parse(url)
        .map(|_| ())
        .map_err(|e| format!("invalid url: {}", e))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
/// Finished backend calls are drained before every response so their notices
/// are visible to the next `notices.take`.
pub async fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    let mut guard = app.lock().await;
    let a = &mut *guard;
    let result = dispatch(a, method, params).await;
    a.sidebar.pump().await;
    result
}

async fn dispatch(a: &mut App, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Tree ───
        "tree.get" => Ok(json!({
            "tree": to_json(a.sidebar.tree().as_ref())?,
            "revision": a.sidebar.revision(),
            "state": to_json(a.sidebar.load_state())?,
        })),
        "tree.load" => {
            let nodes = a.sidebar.load().await.map_err(|e| e.to_string())?;
            Ok(json!({"nodes": nodes}))
        }
        "tree.reload" => {
            let nodes = a.sidebar.reload().await.map_err(|e| e.to_string())?;
            Ok(json!({"nodes": nodes}))
        }
        "state.get" => to_json(&a.sidebar.state()),
        "folders.paths" => to_json(&a.sidebar.folder_paths().entries()),

        // ─── Mutations ───
        "bookmark.create" => {
            let bookmark: NewBookmark = parse_params(params)?;
            validate_url(&bookmark.url)?;
            let node = a.sidebar.create_bookmark(bookmark).await.map_err(|e| e.to_string())?;
            to_json(&node)
        }
        "folder.create" => {
            let folder: NewFolder = parse_params(params)?;
            let node = a.sidebar.create_folder(folder).await.map_err(|e| e.to_string())?;
            to_json(&node)
        }
        "bookmark.edit" => {
            let id = str_param(params, "id")?;
            let changes: BookmarkChanges = parse_params(params)?;
            validate_url(&changes.url)?;
            let outcome = a.sidebar.edit_bookmark(id, changes).map_err(|e| e.to_string())?;
            to_json(&outcome)
        }
        "edit.confirm" => {
            a.sidebar.confirm_pending_edit().map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "edit.cancel" => {
            let cancelled = a.sidebar.cancel_pending_edit();
            Ok(json!({"cancelled": cancelled.is_some()}))
        }
        "folder.rename" => {
            let id = str_param(params, "id")?;
            let title = str_param(params, "title")?;
            a.sidebar.rename_folder(id, title).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "node.delete" => {
            let ids: Vec<NodeId> = parse_field(params, "ids")?;
            let removed = a.sidebar.delete(&ids).map_err(|e| e.to_string())?;
            Ok(json!({"removed": removed}))
        }
        "node.move" => {
            let id = str_param(params, "id")?;
            let target: DropTarget = parse_field(params, "target")?;
            let resolved = a.sidebar.move_node(id, &target).map_err(|e| e.to_string())?;
            Ok(json!({
                "noop": resolved.is_noop(),
                "parent_id": resolved.parent_id,
                "index": resolved.local_index,
            }))
        }
        "undo" => {
            let undone = a.sidebar.undo().await.map_err(|e| e.to_string())?;
            Ok(json!({"undone": undone.map(|action| action.label())}))
        }
        "notices.take" => {
            let notices: Vec<Value> = a
                .sidebar
                .take_notices()
                .iter()
                .map(|n| {
                    let mut value = serde_json::to_value(n).unwrap_or(Value::Null);
                    if let Some(obj) = value.as_object_mut() {
                        obj.insert("text".to_string(), json!(n.message()));
                    }
                    value
                })
                .collect();
            Ok(json!(notices))
        }

        // ─── Enrichment ───
        "enrichment.pending" => to_json(&a.sidebar.pending_enrichment()),
        "enrichment.apply" => {
            let id = str_param(params, "id")?;
            let status: LinkStatus = parse_field(params, "status")?;
            let safety: SafetyStatus = parse_field(params, "safety")?;
            a.sidebar
                .apply_enrichment(id, status, safety)
                .map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "enrichment.run" => {
            let checker = a
                .link_checker
                .as_deref()
                .ok_or("link checking is disabled")?;
            let checked = a.sidebar.enrich_pending(checker).await.map_err(|e| e.to_string())?;
            Ok(json!({"checked": checked}))
        }

        // ─── Settings ───
        "settings.get" => to_json(a.settings_engine.get_settings()),
        "settings.set" => {
            let key = str_param(params, "key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            a.settings_engine.set_value(key, value).map_err(|e| e.to_string())?;
            if key == "display.path_separator" {
                let separator = a.settings_engine.get_settings().display.path_separator.clone();
                a.sidebar.set_path_separator(separator);
            }
            if key.starts_with("enrichment.") {
                a.apply_enrichment_settings();
            }
            Ok(json!({"ok": true}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
