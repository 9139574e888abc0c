//! marksync RPC server: JSON-RPC over stdin/stdout for a sidebar front end.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"node.move", "params":{"id":"...","target":{...}}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use marksync::app::App;
use marksync::rpc_handler::handle_method;
use marksync::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Simple rate limiter: max requests per second.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        let elapsed = self.window_start.elapsed();
        if elapsed.as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

fn respond(value: &Value) {
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{}", value);
    let _ = stdout.flush();
}

#[tokio::main]
async fn main() {
    let mut settings_engine = SettingsEngine::new(std::env::var("MARKSYNC_SETTINGS").ok());
    let settings_error = settings_engine.load().err();

    // stdout carries the protocol; logs go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings_engine.get_settings().logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    if let Some(e) = settings_error {
        error!(error = %e, "settings could not be loaded; using defaults");
    }

    let data_dir = std::env::var("MARKSYNC_DATA_DIR").ok().map(PathBuf::from);
    let app = match App::new(settings_engine, data_dir) {
        Ok(app) => Mutex::new(app),
        Err(e) => {
            error!(error = %e, "failed to initialize marksync");
            std::process::exit(1);
        }
    };
    app.lock().await.startup().await;

    respond(&json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));

    // Max 200 RPC requests per second.
    let mut rate_limiter = RateLimiter::new(200);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                respond(&json!({"id": null, "error": format!("parse error: {}", e)}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            respond(&json!({"id": id, "error": "rate limit exceeded"}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(&app, method, &params).await {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        respond(&response);
    }

    app.lock().await.shutdown().await;
    info!("stdin closed; exiting");
}
