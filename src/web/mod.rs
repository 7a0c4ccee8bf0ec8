//! Web API module for PageStudio.
//!
//! This module provides a REST API for the page builder frontend: reading
//! pages, rendering resolved breakpoint views and driving editor sessions.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /api/pages` - List pages
//! - `GET /api/pages/{id}` - Load a page (cached)
//! - `GET /api/pages/{id}/render/{breakpoint}` - Resolved view of a breakpoint
//! - `POST /api/pages/{id}/session` - Open an editor session
//! - `GET /api/pages/{id}/session` - Session status
//! - `DELETE /api/pages/{id}/session` - Flush and close the session
//! - `PUT /api/pages/{id}/session/layouts` - Apply a grid layout change
//! - `POST /api/pages/{id}/session/items` - Drop a module onto the canvas
//! - `PATCH /api/pages/{id}/session/items/{key}` - Update an item
//! - `DELETE /api/pages/{id}/session/items/{key}` - Remove an item
//! - `PUT /api/pages/{id}/session/modules/{key}/config` - Write module config
//! - `POST /api/pages/{id}/session/copy-layout` - Copy a breakpoint layout
//! - `POST /api/pages/{id}/session/undo` / `redo` - History
//! - `POST /api/pages/{id}/session/save` - Save now
//! - `GET /api/plugins/{plugin}/modules/{module}` - Module metadata

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::models::{Breakpoint, ConfigMap, GridItemUpdate, ModuleStaticDefinition, Page, PageSummary};
use crate::registry::{ManifestRegistry, ModuleRegistry};
use crate::services::pages::validate_page_id;
use crate::services::{FilePageStore, PageStore, RenderedView, Renderer};
use crate::session::{
    AutoSaveDriver, ConfigScope, ModuleDrop, PageCache, SessionHandle, SessionOptions, SessionStatus,
    StudioSession,
};

// ============================================================================
// Application State
// ============================================================================

/// An open editor session and the driver saving it.
#[derive(Clone)]
struct OpenSession {
    handle: SessionHandle,
    driver: AutoSaveDriver,
}

/// Shared application state for the web API.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    config: Arc<Config>,
    /// Page persistence
    store: Arc<dyn PageStore>,
    /// Installed plugin modules (immutable after load)
    registry: Arc<ManifestRegistry>,
    /// Read cache, invalidated by sessions after saving
    cache: PageCache,
    /// Open sessions by page id
    sessions: Arc<RwLock<HashMap<String, OpenSession>>>,
}

impl AppState {
    /// Creates a state storing pages in `workspace_root` and loading plugin
    /// manifests from `plugins_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the plugin directory cannot be read.
    pub fn new(config: Config, workspace_root: PathBuf, plugins_dir: &std::path::Path) -> anyhow::Result<Self> {
        let registry = ManifestRegistry::load_dir(plugins_dir)?;
        info!(modules = registry.len(), "loaded plugin registry");
        Ok(Self::with_parts(
            config,
            Arc::new(FilePageStore::new(workspace_root)),
            registry,
        ))
    }

    /// Creates a state from already-built parts.
    #[must_use]
    pub fn with_parts(config: Config, store: Arc<dyn PageStore>, registry: ManifestRegistry) -> Self {
        Self {
            config: Arc::new(config),
            store,
            registry: Arc::new(registry),
            cache: PageCache::new(),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The page read cache.
    #[must_use]
    pub const fn cache(&self) -> &PageCache {
        &self.cache
    }

    fn session(&self, id: &str) -> Result<OpenSession, ApiFailure> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| failure(StatusCode::NOT_FOUND, format!("No open session for page '{id}'")))
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Current health status (e.g., "healthy").
    pub status: String,
    /// Application version.
    pub version: String,
}

/// Page list response.
#[derive(Debug, Serialize)]
pub struct PageListResponse {
    /// Page summaries sorted by id.
    pub pages: Vec<PageSummary>,
}

/// Response to dropping a module.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddModuleResponse {
    /// Key of the new instance.
    pub instance_key: String,
    /// Session status after the drop.
    pub status: SessionStatus,
}

/// Partial item update, optionally limited to one breakpoint.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    /// Breakpoint to update; all breakpoints when omitted.
    #[serde(default)]
    pub breakpoint: Option<Breakpoint>,
    /// Fields to change.
    #[serde(flatten)]
    pub update: GridItemUpdate,
}

/// Module configuration write.
#[derive(Debug, Deserialize)]
pub struct ConfigUpdateRequest {
    /// Breakpoint override to write; the shared config when omitted.
    #[serde(default)]
    pub breakpoint: Option<Breakpoint>,
    /// Values to merge.
    pub values: ConfigMap,
    /// Stamp the touch field to force a refresh.
    #[serde(default)]
    pub touch: bool,
}

/// Layout copy request.
#[derive(Debug, Deserialize)]
pub struct CopyLayoutRequest {
    /// Source breakpoint.
    pub from: Breakpoint,
    /// Target breakpoint.
    pub to: Breakpoint,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Error message.
    pub error: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

type ApiFailure = (StatusCode, Json<ApiError>);
type ApiResult<T> = Result<Json<T>, ApiFailure>;

fn failure(status: StatusCode, error: impl Into<String>) -> ApiFailure {
    (status, Json(ApiError::new(error)))
}

fn failure_with_details(status: StatusCode, error: impl Into<String>, details: &anyhow::Error) -> ApiFailure {
    (status, Json(ApiError::with_details(error, format!("{details:#}"))))
}

// ============================================================================
// Validation Helpers
// ============================================================================

fn checked_page_id(id: &str) -> Result<&str, ApiFailure> {
    validate_page_id(id).map_err(|e| failure(StatusCode::BAD_REQUEST, e.to_string()))
}

fn parse_breakpoint(name: &str) -> Result<Breakpoint, ApiFailure> {
    name.parse()
        .map_err(|e: anyhow::Error| failure(StatusCode::BAD_REQUEST, e.to_string()))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /health - Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/pages - List all pages.
async fn list_pages(State(state): State<AppState>) -> ApiResult<PageListResponse> {
    let pages = state.store.list_pages().map_err(|e| {
        failure_with_details(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list pages", &e)
    })?;
    Ok(Json(PageListResponse { pages }))
}

/// GET /api/pages/{id} - Load a page through the cache.
async fn get_page(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Page> {
    let id = checked_page_id(&id)?;
    let page = state
        .cache
        .get_or_load(id, state.store.as_ref())
        .map_err(|e| failure_with_details(StatusCode::NOT_FOUND, format!("Page not found: {id}"), &e))?;
    Ok(Json(page))
}

/// GET /api/pages/{id}/render/{breakpoint} - Resolved view.
///
/// Renders the open session's content when there is one, otherwise the
/// stored page.
async fn render_page(
    State(state): State<AppState>,
    Path((id, breakpoint)): Path<(String, String)>,
) -> ApiResult<RenderedView> {
    let id = checked_page_id(&id)?;
    let breakpoint = parse_breakpoint(&breakpoint)?;

    if let Ok(open) = state.session(id) {
        return Ok(Json(open.handle.with(|s| s.preview(breakpoint))));
    }

    let page = state
        .cache
        .get_or_load(id, state.store.as_ref())
        .map_err(|e| failure_with_details(StatusCode::NOT_FOUND, format!("Page not found: {id}"), &e))?;
    let resolver = crate::services::ConfigResolver::new();
    let renderer = Renderer::new(state.registry.as_ref(), &resolver);
    Ok(Json(renderer.render(&page.content, breakpoint)))
}

/// POST /api/pages/{id}/session - Open (or rejoin) an editor session.
async fn open_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<SessionStatus>), ApiFailure> {
    let id = checked_page_id(&id)?;
    if let Ok(open) = state.session(id) {
        return Ok((StatusCode::OK, Json(open.handle.with(StudioSession::status))));
    }

    let page = state
        .store
        .get_page(id)
        .map_err(|e| failure_with_details(StatusCode::NOT_FOUND, format!("Page not found: {id}"), &e))?;

    let registry: Arc<dyn ModuleRegistry> = state.registry.clone();
    let session = StudioSession::open(page, registry, SessionOptions::from(&state.config.studio));
    let handle = SessionHandle::new(session);
    let driver = AutoSaveDriver::new(handle.clone(), Arc::clone(&state.store), state.cache.clone());

    let mut sessions = state.sessions.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = sessions.get(id) {
        return Ok((StatusCode::OK, Json(existing.handle.with(StudioSession::status))));
    }
    let _task = driver.clone().spawn();
    let status = handle.with(StudioSession::status);
    sessions.insert(id.to_string(), OpenSession { handle, driver });
    info!(page = %id, "opened editor session");

    Ok((StatusCode::CREATED, Json(status)))
}

/// GET /api/pages/{id}/session - Session status.
async fn session_status(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SessionStatus> {
    let open = state.session(&id)?;
    Ok(Json(open.handle.with(StudioSession::status)))
}

/// DELETE /api/pages/{id}/session - Flush pending edits and close.
async fn close_session(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SessionStatus> {
    let open = state.session(&id)?;
    open.driver
        .flush()
        .await
        .map_err(|e| failure_with_details(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save page", &e))?;

    open.handle.close();
    state
        .sessions
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&id);
    info!(page = %id, "closed editor session");
    Ok(Json(open.handle.with(StudioSession::status)))
}

/// PUT /api/pages/{id}/session/layouts - Apply a layout change from the grid.
async fn put_layouts(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(raw): Json<Value>,
) -> ApiResult<SessionStatus> {
    let open = state.session(&id)?;
    if !raw.is_object() {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "Layout change must be an object keyed by breakpoint",
        ));
    }
    Ok(Json(open.handle.update(|s| {
        s.apply_layout_change(&raw);
        s.status()
    })))
}

/// POST /api/pages/{id}/session/items - Drop a module onto the canvas.
async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(drop): Json<ModuleDrop>,
) -> Result<(StatusCode, Json<AddModuleResponse>), ApiFailure> {
    let open = state.session(&id)?;
    let (instance_key, status) = open
        .handle
        .update(|s| s.add_module(&drop).map(|key| (key, s.status())))
        .map_err(|e| failure_with_details(StatusCode::BAD_REQUEST, "Cannot add module", &e))?;
    Ok((StatusCode::CREATED, Json(AddModuleResponse { instance_key, status })))
}

/// PATCH /api/pages/{id}/session/items/{key} - Update an item.
async fn update_item(
    State(state): State<AppState>,
    Path((id, key)): Path<(String, String)>,
    Json(request): Json<UpdateItemRequest>,
) -> ApiResult<SessionStatus> {
    let open = state.session(&id)?;
    open.handle
        .update(|s| {
            s.update_item(&key, request.breakpoint, &request.update)
                .map(|()| s.status())
        })
        .map(Json)
        .map_err(|e| failure_with_details(StatusCode::NOT_FOUND, "Cannot update item", &e))
}

/// DELETE /api/pages/{id}/session/items/{key} - Remove an item everywhere.
async fn remove_item(
    State(state): State<AppState>,
    Path((id, key)): Path<(String, String)>,
) -> ApiResult<SessionStatus> {
    let open = state.session(&id)?;
    open.handle
        .update(|s| s.remove_item(&key).map(|()| s.status()))
        .map(Json)
        .map_err(|e| failure_with_details(StatusCode::NOT_FOUND, "Cannot remove item", &e))
}

/// PUT /api/pages/{id}/session/modules/{key}/config - Write configuration.
async fn put_module_config(
    State(state): State<AppState>,
    Path((id, key)): Path<(String, String)>,
    Json(request): Json<ConfigUpdateRequest>,
) -> ApiResult<SessionStatus> {
    let open = state.session(&id)?;
    let scope = request.breakpoint.map_or(ConfigScope::Global, ConfigScope::Breakpoint);
    open.handle
        .update(|s| {
            s.update_config(&key, scope, &request.values, request.touch)
                .map(|()| s.status())
        })
        .map(Json)
        .map_err(|e| failure_with_details(StatusCode::NOT_FOUND, "Cannot update configuration", &e))
}

/// POST /api/pages/{id}/session/copy-layout - Copy one breakpoint onto another.
async fn copy_layout(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CopyLayoutRequest>,
) -> ApiResult<SessionStatus> {
    let open = state.session(&id)?;
    Ok(Json(open.handle.update(|s| {
        s.copy_layout(request.from, request.to);
        s.status()
    })))
}

/// POST /api/pages/{id}/session/undo - Undo one edit.
async fn undo(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SessionStatus> {
    let open = state.session(&id)?;
    Ok(Json(open.handle.update(|s| {
        s.undo();
        s.status()
    })))
}

/// POST /api/pages/{id}/session/redo - Redo one edit.
async fn redo(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SessionStatus> {
    let open = state.session(&id)?;
    Ok(Json(open.handle.update(|s| {
        s.redo();
        s.status()
    })))
}

/// POST /api/pages/{id}/session/save - Save now, or retry a failed save.
async fn save_session(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SessionStatus> {
    let open = state.session(&id)?;
    open.driver
        .flush()
        .await
        .map_err(|e| failure_with_details(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save page", &e))?;
    Ok(Json(open.handle.with(StudioSession::status)))
}

/// GET /api/plugins/{plugin}/modules/{module} - Module metadata.
async fn get_module(
    State(state): State<AppState>,
    Path((plugin, module)): Path<(String, String)>,
) -> ApiResult<ModuleStaticDefinition> {
    state
        .registry
        .get_module_by_id(&plugin, &module)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            failure(
                StatusCode::NOT_FOUND,
                format!("Module '{module}' of plugin '{plugin}' is not installed"),
            )
        })
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    // NOTE: permissive CORS is meant for running the server locally next to
    // the editor frontend. Restrict origins when deploying it elsewhere.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Page endpoints
        .route("/api/pages", get(list_pages))
        .route("/api/pages/{id}", get(get_page))
        .route("/api/pages/{id}/render/{breakpoint}", get(render_page))
        // Session endpoints
        .route(
            "/api/pages/{id}/session",
            post(open_session).get(session_status).delete(close_session),
        )
        .route("/api/pages/{id}/session/layouts", put(put_layouts))
        .route("/api/pages/{id}/session/items", post(add_item))
        .route(
            "/api/pages/{id}/session/items/{key}",
            axum::routing::patch(update_item).delete(remove_item),
        )
        .route("/api/pages/{id}/session/modules/{key}/config", put(put_module_config))
        .route("/api/pages/{id}/session/copy-layout", post(copy_layout))
        .route("/api/pages/{id}/session/undo", post(undo))
        .route("/api/pages/{id}/session/redo", post(redo))
        .route("/api/pages/{id}/session/save", post(save_session))
        // Plugin metadata
        .route("/api/plugins/{plugin}/modules/{module}", get(get_module))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the web server.
///
/// # Errors
///
/// Returns an error if the plugin registry cannot be loaded or the server
/// fails to start.
pub async fn run_server(
    config: Config,
    workspace_root: PathBuf,
    plugins_dir: PathBuf,
    addr: SocketAddr,
) -> anyhow::Result<()> {
    let state = AppState::new(config, workspace_root, &plugins_dir)?;
    let app = create_router(state);

    info!("Starting PageStudio web server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_page_id() {
        assert!(checked_page_id("home").is_ok());
        let (status, _) = checked_page_id("../secret").unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_parse_breakpoint_aliases() {
        assert_eq!(parse_breakpoint("sm").unwrap(), Breakpoint::Mobile);
        assert!(parse_breakpoint("watch").is_err());
    }

    #[test]
    fn test_update_item_request_flattens_update() {
        let request: UpdateItemRequest =
            serde_json::from_str(r#"{"breakpoint": "tablet", "x": 2, "minW": 1}"#).unwrap();
        assert_eq!(request.breakpoint, Some(Breakpoint::Tablet));
        assert_eq!(request.update.x, Some(2));
        assert_eq!(request.update.min_w, Some(1));
    }
}
