//!
//! stowage HTTP server
//! -------------------
//! This module defines the Axum-based HTTP API for the file-hosting service.
//!
//! Responsibilities:
//! - Register/login/logout endpoints backed by the `identity` module.
//! - Bearer-token resolution for the per-user file routes.
//! - Expired-session sweep as a pre-dispatch middleware on every inbound
//!   request, which bounds staleness of the session table to one request.
//! - File list/stat/upload/download/delete delegating to the sandboxed
//!   store; the gateway owns serialization only.

use std::net::SocketAddr;

use anyhow::Context;
use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, Path, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

use crate::catalog::SharedCatalog;
use crate::error::AppError;
use crate::identity::{AuthProvider, LocalAuthProvider, LoginRequest, LogoutStatus, SessionManager};
use crate::storage::{FileStore, StorageError};

const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: LocalAuthProvider,
    pub sm: SessionManager,
    pub files: FileStore,
}

fn log_startup_folders(data_root: &str) {
    // Gather basic environment and folder info
    let cwd = std::env::current_dir().ok();
    let exe = std::env::current_exe().ok();
    let root_env = std::env::var("STOWAGE_DATA_FOLDER").ok();
    info!(
        target: "startup",
        "stowage starting. Folder configuration: cwd={:?}, exe={:?}, data_root_param={:?}, STOWAGE_DATA_FOLDER_env={:?}",
        cwd, exe, data_root, root_env
    );
    let root = std::path::Path::new(data_root);
    info!(target: "startup", "Path existence: data_root_exists={}", root.exists());
}

/// Start the stowage HTTP server bound to the given port, with all durable
/// state under the given data root (`users.db` plus one `files/<login>/`
/// directory per user).
pub async fn run_with_port(http_port: u16, data_root: &str) -> anyhow::Result<()> {
    log_startup_folders(data_root);

    std::fs::create_dir_all(data_root)
        .with_context(|| format!("Failed to create or access data root: {}", data_root))?;
    let root = std::path::Path::new(data_root);

    let catalog = SharedCatalog::open(root.join("users.db"))
        .with_context(|| format!("While opening the auth catalog under: {}", data_root))?;
    let sm = SessionManager::new(catalog.clone());
    let auth = LocalAuthProvider::new(catalog, sm.clone());
    let files = FileStore::new(root.join("files"))
        .with_context(|| format!("While creating the file store under: {}", data_root))?;

    let app_state = AppState { auth, sm, files };

    let app = Router::new()
        .route("/", get(|| async { "stowage ok" }))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/files", get(list_files))
        .route("/files/{filename}", get(download).put(upload).delete(delete_file))
        .route("/files/{filename}/stat", get(stat_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn_with_state(app_state.clone(), sweep_sessions))
        .with_state(app_state);

    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Convenience entry point using the default port (8000) and data root "data".
pub async fn run() -> anyhow::Result<()> {
    run_with_port(8000, "data").await
}

/// Pre-dispatch hook: evict expired session rows before routing. Part of the
/// gateway contract, not an optimization.
async fn sweep_sessions(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match state.sm.sweep_expired() {
        Ok(removed) if removed > 0 => debug!(removed = removed, "session_sweep"),
        Err(e) => warn!("session sweep failed: {e}"),
        _ => {}
    }
    next.run(req).await
}

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    #[serde(rename = "type")]
    kind: String,
    login: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    #[serde(rename = "type")]
    kind: String,
    login: String,
    password: String,
}

fn parse_bearer(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get("authorization").or_else(|| headers.get("Authorization"))?;
    let s = auth.to_str().ok()?;
    let (scheme, token) = s.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") { return None; }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token.to_string()) }
}

/// Resolve the bearer token to its owning login. Missing, unknown, and
/// expired tokens all produce the same rejection.
fn require_login(state: &AppState, headers: &HeaderMap) -> Result<String, AppError> {
    let Some(token) = parse_bearer(headers) else {
        return Err(AppError::auth("invalid_session", "missing or expired session token"));
    };
    match state.sm.validate(&token) {
        Ok(Some(login)) => Ok(login),
        Ok(None) => Err(AppError::auth("invalid_session", "missing or expired session token")),
        Err(e) => Err(e.into()),
    }
}

fn app_error_response(e: AppError) -> (StatusCode, Json<serde_json::Value>) {
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!("request failed: {e}");
    }
    (status, Json(json!({"status":"error","code": e.code_str(),"message": e.message()})))
}

async fn register(State(state): State<AppState>, Json(payload): Json<RegisterPayload>) -> impl IntoResponse {
    if payload.kind != "reg" {
        return (StatusCode::BAD_REQUEST, Json(json!({"status":"error","error":"wrong request type"})));
    }
    let req = LoginRequest { login: payload.login, password: payload.password };
    match state.auth.register(&req) {
        Ok(session) => (StatusCode::OK, Json(json!({"session_id": session.token}))),
        Err(e) => app_error_response(e),
    }
}

async fn login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> impl IntoResponse {
    if payload.kind != "login" {
        return (StatusCode::BAD_REQUEST, Json(json!({"status":"error","error":"wrong request type"})));
    }
    let req = LoginRequest { login: payload.login, password: payload.password };
    match state.auth.login(&req) {
        Ok(session) => (StatusCode::OK, Json(json!({"session_id": session.token}))),
        Err(e) => app_error_response(e),
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(token) = parse_bearer(&headers) else {
        return (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized"})));
    };
    // Absent tokens are a soft status: logout is idempotent, never an error.
    match state.sm.invalidate(&token) {
        Ok(LogoutStatus::Removed) => (StatusCode::OK, Json(json!({"status":"ok"}))),
        Ok(LogoutStatus::NotFound) => (StatusCode::OK, Json(json!({"status":"not_found"}))),
        Err(e) => app_error_response(e.into()),
    }
}

async fn list_files(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let login = match require_login(&state, &headers) {
        Ok(l) => l,
        Err(e) => return app_error_response(e),
    };
    match state.files.list(&login) {
        Ok(files) => (StatusCode::OK, Json(json!({"status":"ok","files": files}))),
        Err(e) => app_error_response(e.into()),
    }
}

async fn stat_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    let login = match require_login(&state, &headers) {
        Ok(l) => l,
        Err(e) => return app_error_response(e),
    };
    match state.files.stat(&login, &filename) {
        Ok(Some(info)) => (StatusCode::OK, Json(json!({"status":"ok","file": info}))),
        Ok(None) => app_error_response(AppError::not_found("not_found", "no such file")),
        Err(e) => app_error_response(e.into()),
    }
}

async fn download(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(filename): Path<String>,
) -> Response {
    let login = match require_login(&state, &headers) {
        Ok(l) => l,
        Err(e) => return app_error_response(e).into_response(),
    };
    match state.files.open(&login, &filename) {
        Ok((file, name)) => {
            let stream = ReaderStream::new(tokio::fs::File::from_std(file));
            let disposition = format!("attachment; filename=\"{}\"", name);
            (
                [
                    (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                Body::from_stream(stream),
            )
                .into_response()
        }
        Err(e) => app_error_response(e.into()).into_response(),
    }
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(filename): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let login = match require_login(&state, &headers) {
        Ok(l) => l,
        Err(e) => return app_error_response(e),
    };
    match state.files.write(&login, &filename, &body) {
        Ok(()) => (StatusCode::OK, Json(json!({"status":"ok"}))),
        // Upload reports bad and escaping names through one opaque status.
        Err(StorageError::InvalidName) | Err(StorageError::Denied) => {
            (StatusCode::BAD_REQUEST, Json(json!({"status":"error","code":"invalid_path","message":"invalid path"})))
        }
        Err(e) => app_error_response(e.into()),
    }
}

async fn delete_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    let login = match require_login(&state, &headers) {
        Ok(l) => l,
        Err(e) => return app_error_response(e),
    };
    match state.files.delete(&login, &filename) {
        Ok(()) => (StatusCode::OK, Json(json!({"status":"ok"}))),
        Err(StorageError::InvalidName) | Err(StorageError::Denied) => {
            (StatusCode::BAD_REQUEST, Json(json!({"status":"error","code":"invalid_path","message":"invalid path"})))
        }
        Err(e) => app_error_response(e.into()),
    }
}
