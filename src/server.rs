//!
//! presetd HTTP server
//! -------------------
//! Axum routes for the preset store, mounted under `/api/presets`.
//!
//! Responsibilities:
//! - Resolve the requesting user's directory set from the `x-user-handle` header.
//! - Translate JSON bodies into `PresetStore` calls, run on blocking workers.
//! - Map `AppError` kinds to status codes and JSON error bodies.
//! - Startup: folder checks, default index load, default user provisioning.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::defaults::DefaultPresetIndex;
use crate::error::{AppError, AppResult};
use crate::storage::{PresetStore, RestoreResult};
use crate::users::UserDirectories;

/// Header naming the user whose folders a request operates on.
pub const USER_HANDLE_HEADER: &str = "x-user-handle";

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: PresetStore,
    pub data_root: PathBuf,
    /// Handle used when a request carries no `x-user-handle`.
    pub default_user: String,
}

impl AppState {
    pub fn new(defaults: DefaultPresetIndex, data_root: PathBuf, default_user: String) -> Self {
        Self { store: PresetStore::new(Arc::new(defaults)), data_root, default_user }
    }

    /// Directory set for the user named by the request headers.
    fn user_dirs(&self, headers: &HeaderMap) -> AppResult<UserDirectories> {
        let handle = headers
            .get(USER_HANDLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.default_user.as_str());
        UserDirectories::for_user(&self.data_root, handle)
    }
}

/// Build the router. Exposed separately from `run` so tests can bind their own listener.
pub fn router(state: AppState) -> Router {
    let presets = Router::new()
        .route("/save", post(save_preset))
        .route("/rename", post(rename_preset))
        .route("/delete", post(delete_preset))
        .route("/restore", post(restore_preset))
        .route("/save-openai", post(save_openai_preset))
        .route("/delete-openai", post(delete_openai_preset));
    Router::new()
        .route("/", get(|| async { "presetd ok" }))
        .nest("/api/presets", presets)
        .with_state(state)
}

fn log_startup_folders(cfg: &ServerConfig) {
    let cwd = std::env::current_dir().ok();
    info!(
        target: "startup",
        "presetd starting. Folder configuration: cwd={:?}, data_root={:?}, content_root={:?}, default_user={:?}",
        cwd, cfg.data_root, cfg.content_root, cfg.default_user
    );
    info!(
        target: "startup",
        "Path existence: data_root_exists={}, content_root_exists={}",
        cfg.data_root.exists(), cfg.content_root.exists()
    );
}

/// Start the HTTP server with the given configuration.
///
/// Ensures the data root and the default user's preset folders exist, loads the
/// bundled default index, then serves until the listener fails.
pub async fn run(cfg: ServerConfig) -> anyhow::Result<()> {
    log_startup_folders(&cfg);

    std::fs::create_dir_all(&cfg.data_root)
        .with_context(|| format!("Failed to create or access data root: {}", cfg.data_root.display()))?;
    let defaults = DefaultPresetIndex::load(&cfg.content_root)
        .with_context(|| format!("While loading default presets from: {}", cfg.content_root.display()))?;
    info!(target: "startup", "Loaded {} default presets", defaults.len());

    UserDirectories::for_user(&cfg.data_root, &cfg.default_user)
        .and_then(|d| d.ensure_exist())
        .with_context(|| format!("While provisioning default user '{}'", cfg.default_user))?;

    let app = router(AppState::new(defaults, cfg.data_root.clone(), cfg.default_user.clone()));
    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Run filesystem work off the async workers. A panicked or cancelled task is internal.
async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::internal("task_failed".to_string(), e.to_string()))?
}

fn error_response(op: &str, err: AppError) -> Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match &err {
        AppError::Internal { .. } => error!(target: "presetd::http", "{} failed: {}", op, err),
        _ => debug!(target: "presetd::http", "{} rejected: {}", op, err),
    }
    (status, Json(err.to_body())).into_response()
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(p)| p)
        .map_err(|rej| AppError::user("invalid_body".to_string(), rej.body_text()))
}

/// Text form of a truthy name: non-empty strings, non-zero numbers and `true`.
fn truthy_name(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SavePayload {
    api_id: Option<String>,
    name: Option<String>,
    preset: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RenamePayload {
    api_id: Option<String>,
    old_name: Option<String>,
    new_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct NamedPayload {
    api_id: Option<String>,
    name: Option<String>,
}

/// `delete-openai` takes any truthy JSON scalar as its name.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LooseNamePayload {
    name: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NameQuery {
    name: Option<String>,
}

async fn save_preset(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SavePayload>, JsonRejection>,
) -> Response {
    let res: AppResult<String> = async move {
        let p = json_body(payload)?;
        let dirs = state.user_dirs(&headers)?;
        let store = state.store.clone();
        blocking(move || {
            store.save(&dirs, p.api_id.as_deref().unwrap_or_default(), p.name.as_deref().unwrap_or_default(), p.preset.as_ref())
        })
        .await
    }
    .await;
    match res {
        Ok(name) => (StatusCode::OK, Json(json!({ "name": name }))).into_response(),
        Err(e) => error_response("save", e),
    }
}

async fn rename_preset(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RenamePayload>, JsonRejection>,
) -> Response {
    let res: AppResult<()> = async move {
        let p = json_body(payload)?;
        let dirs = state.user_dirs(&headers)?;
        let store = state.store.clone();
        blocking(move || {
            store.rename(
                &dirs,
                p.api_id.as_deref().unwrap_or_default(),
                p.old_name.as_deref().unwrap_or_default(),
                p.new_name.as_deref().unwrap_or_default(),
            )
        })
        .await
    }
    .await;
    match res {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(e) => error_response("rename", e),
    }
}

async fn delete_preset(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NamedPayload>, JsonRejection>,
) -> Response {
    let res: AppResult<()> = async move {
        let p = json_body(payload)?;
        let dirs = state.user_dirs(&headers)?;
        let store = state.store.clone();
        blocking(move || store.delete(&dirs, p.api_id.as_deref().unwrap_or_default(), p.name.as_deref().unwrap_or_default()))
            .await
    }
    .await;
    match res {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response("delete", e),
    }
}

async fn restore_preset(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NamedPayload>, JsonRejection>,
) -> Response {
    let res: AppResult<RestoreResult> = async move {
        let p = json_body(payload)?;
        let dirs = state.user_dirs(&headers)?;
        let store = state.store.clone();
        blocking(move || {
            store.restore_lookup(&dirs, p.api_id.as_deref().unwrap_or_default(), p.name.as_deref().unwrap_or_default())
        })
        .await
    }
    .await;
    match res {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response("restore", e),
    }
}

async fn save_openai_preset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<NameQuery>,
    body: Bytes,
) -> Response {
    let res: AppResult<String> = async move {
        let name = q.name.ok_or_else(|| AppError::user("invalid_name", "query parameter 'name' is required"))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(AppError::user("missing_preset", "preset content is required"));
        }
        let content: Value = serde_json::from_slice(&body)
            .map_err(|e| AppError::user("invalid_body".to_string(), e.to_string()))?;
        let dirs = state.user_dirs(&headers)?;
        let store = state.store.clone();
        blocking(move || store.save_openai(&dirs, &name, Some(&content))).await
    }
    .await;
    match res {
        Ok(name) => (StatusCode::OK, Json(json!({ "name": name }))).into_response(),
        Err(e) => error_response("save-openai", e),
    }
}

async fn delete_openai_preset(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<LooseNamePayload>, JsonRejection>,
) -> Response {
    let res: AppResult<bool> = async move {
        let p = json_body(payload)?;
        let name = p
            .name
            .as_ref()
            .and_then(truthy_name)
            .ok_or_else(|| AppError::user("invalid_name", "'name' is required"))?;
        let dirs = state.user_dirs(&headers)?;
        let store = state.store.clone();
        blocking(move || store.delete_openai(&dirs, &name)).await
    }
    .await;
    match res {
        Ok(true) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Ok(false) => (StatusCode::OK, Json(json!({ "error": true }))).into_response(),
        Err(e) => error_response("delete-openai", e),
    }
}
