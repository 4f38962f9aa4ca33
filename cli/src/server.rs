use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;

use larder_core::error::ShoppingError;
use larder_core::list::ShoppingList;
use larder_core::models::{
    AdhocItem, ChecklistEntry, ItemExclusion, ItemId, OrderAssignment, Session, SessionId,
};
use larder_core::resolve::SortMode;
use larder_core::service::ShoppingService;
use larder_core::store_order::{OrderSlot, StoreOrderManager};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    svc: Arc<Mutex<ShoppingService>>,
    api_key: Option<String>,
    default_mode: SortMode,
}

impl AppState {
    fn svc(&self) -> MutexGuard<'_, ShoppingService> {
        self.svc
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct ListQuery {
    mode: Option<String>,
}

#[derive(Deserialize)]
struct ToggleRequest {
    checked: bool,
}

#[derive(Deserialize)]
struct AddChecklistRequest {
    name: String,
}

#[derive(Deserialize)]
struct AddAdhocRequest {
    name: String,
    amount: Option<String>,
}

#[derive(Deserialize)]
struct StoreOrderRequest {
    ordered: Vec<ItemId>,
}

#[derive(Serialize)]
struct StoreOrderResponse {
    ordered: Vec<OrderSlot>,
    unordered: Vec<OrderSlot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    saved: Vec<OrderAssignment>,
}

impl StoreOrderResponse {
    fn new(manager: &StoreOrderManager, saved: Vec<OrderAssignment>) -> Self {
        Self {
            ordered: manager.ordered().to_vec(),
            unordered: manager.unordered().to_vec(),
            saved,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                log::error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<ShoppingError> for ApiError {
    fn from(err: ShoppingError) -> Self {
        match err {
            ShoppingError::ItemResolution { .. } => Self::BadRequest(err.to_string()),
            ShoppingError::UnknownItem(_) => Self::NotFound(err.to_string()),
            ShoppingError::Persistence(_) => Self::Internal(err.into()),
        }
    }
}

fn require_session(svc: &ShoppingService, id: i64) -> Result<SessionId, ApiError> {
    svc.db()
        .get_session(SessionId(id))
        .map(|s| s.id)
        .map_err(|_| ApiError::NotFound(format!("Session {id} not found")))
}

fn require_item(svc: &ShoppingService, id: i64) -> Result<ItemId, ApiError> {
    svc.db()
        .get_item(ItemId(id))
        .map(|i| i.id)
        .map_err(|_| ApiError::NotFound(format!("Item {id} not found")))
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn list_sessions(State(state): State<AppState>) -> Result<Json<Vec<Session>>, ApiError> {
    let sessions = state.svc().db().list_sessions().context("database error")?;
    Ok(Json(sessions))
}

async fn get_shopping_list(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ShoppingList>, ApiError> {
    let mode = match query.mode.as_deref() {
        Some(m) => m
            .parse::<SortMode>()
            .map_err(|e| ApiError::BadRequest(format!("{e}")))?,
        None => state.default_mode,
    };
    let svc = state.svc();
    let session = require_session(&svc, id)?;
    let list = svc
        .build_shopping_list(session, mode)
        .context("failed to build shopping list")?;
    Ok(Json(list))
}

async fn toggle_checklist_item(
    State(state): State<AppState>,
    Path((id, item)): Path<(i64, i64)>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<ChecklistEntry>, ApiError> {
    let svc = state.svc();
    let session = require_session(&svc, id)?;
    let entry = svc.toggle_item(session, ItemId(item), req.checked)?;
    Ok(Json(entry))
}

async fn add_checklist_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<AddChecklistRequest>,
) -> Result<(StatusCode, Json<ChecklistEntry>), ApiError> {
    let svc = state.svc();
    let session = require_session(&svc, id)?;
    let entry = svc.add_checklist_item(session, &req.name)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn add_adhoc_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<AddAdhocRequest>,
) -> Result<(StatusCode, Json<AdhocItem>), ApiError> {
    let svc = state.svc();
    let session = require_session(&svc, id)?;
    let added = svc.add_adhoc_item(session, &req.name, req.amount.as_deref())?;
    Ok((StatusCode::CREATED, Json(added)))
}

async fn remove_adhoc_item(
    State(state): State<AppState>,
    Path((id, item)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    let svc = state.svc();
    let session = require_session(&svc, id)?;
    if svc
        .remove_adhoc_item(session, ItemId(item))
        .context("failed to remove ad-hoc item")?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Item {item} is not an ad-hoc item")))
    }
}

async fn add_exclusion(
    State(state): State<AppState>,
    Path((id, item)): Path<(i64, i64)>,
) -> Result<(StatusCode, Json<ItemExclusion>), ApiError> {
    let svc = state.svc();
    let session = require_session(&svc, id)?;
    let item = require_item(&svc, item)?;
    let exclusion = svc
        .exclude_item(session, item)
        .context("failed to add exclusion")?;
    Ok((StatusCode::CREATED, Json(exclusion)))
}

async fn remove_exclusion(
    State(state): State<AppState>,
    Path((id, item)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    let svc = state.svc();
    let session = require_session(&svc, id)?;
    if svc
        .include_item(session, ItemId(item))
        .context("failed to remove exclusion")?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Item {item} is not excluded")))
    }
}

async fn get_store_order(
    State(state): State<AppState>,
) -> Result<Json<StoreOrderResponse>, ApiError> {
    let manager = state.svc().store_order().context("database error")?;
    Ok(Json(StoreOrderResponse::new(&manager, Vec::new())))
}

/// Replaces the positioned sequence with `ordered`; every other item ends up
/// unpositioned. Saved as one batch.
async fn put_store_order(
    State(state): State<AppState>,
    Json(req): Json<StoreOrderRequest>,
) -> Result<Json<StoreOrderResponse>, ApiError> {
    let mut seen = HashSet::new();
    if let Some(dup) = req.ordered.iter().find(|id| !seen.insert(**id)) {
        return Err(ApiError::BadRequest(format!("Item {dup} listed more than once")));
    }

    let svc = state.svc();
    let mut manager = svc.store_order().context("database error")?;
    if let Some(unknown) = req.ordered.iter().find(|id| !manager.contains(**id)) {
        return Err(ApiError::BadRequest(format!("Unknown item {unknown}")));
    }

    let stale: Vec<ItemId> = manager
        .ordered()
        .iter()
        .map(|s| s.item)
        .filter(|id| !seen.contains(id))
        .collect();
    for id in stale {
        manager.demote(id);
    }
    for (target, id) in req.ordered.iter().enumerate() {
        match manager.ordered().iter().position(|s| s.item == *id) {
            Some(current) => {
                manager.move_within_ordered(current, target);
            }
            None => {
                manager.promote(*id, Some(target));
            }
        }
    }

    let saved = if manager.has_pending_changes() {
        svc.commit_store_order(&mut manager)?
    } else {
        Vec::new()
    };
    Ok(Json(StoreOrderResponse::new(&manager, saved)))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/{id}/list", get(get_shopping_list))
        .route("/api/sessions/{id}/checklist", post(add_checklist_item))
        .route(
            "/api/sessions/{id}/checklist/{item}",
            put(toggle_checklist_item),
        )
        .route("/api/sessions/{id}/adhoc", post(add_adhoc_item))
        .route(
            "/api/sessions/{id}/adhoc/{item}",
            axum::routing::delete(remove_adhoc_item),
        )
        .route(
            "/api/sessions/{id}/exclusions/{item}",
            post(add_exclusion).delete(remove_exclusion),
        )
        .route("/api/store-order", get(get_store_order).put(put_store_order))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

/// Shows the first and last four characters of a key, or only asterisks
/// when the key is too short for that to hide anything.
fn mask_key(key: &str) -> String {
    let len = key.chars().count();
    if len < 8 {
        return "*".repeat(len.max(4));
    }
    let head: String = key.chars().take(4).collect();
    let tail: String = key.chars().skip(len - 4).collect();
    format!("{head}...{tail}")
}

pub async fn start_server(
    svc: ShoppingService,
    port: u16,
    bind: &str,
    api_key: Option<String>,
    new_api_key: bool,
    default_mode: SortMode,
) -> anyhow::Result<()> {
    let state = AppState {
        svc: Arc::new(Mutex::new(svc)),
        api_key: api_key.clone(),
        default_mode,
    };

    let app = build_router(state);

    match (&api_key, new_api_key) {
        (Some(key), true) => {
            eprintln!("Generated API key: {key}");
            eprintln!("Clients must send it as `Authorization: Bearer <key>`");
        }
        (Some(key), false) => eprintln!(
            "API key: {} (see api_key file in data directory)",
            mask_key(key)
        ),
        (None, _) => log::warn!("authentication disabled (--no-auth); the API is open to anyone"),
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        log::warn!(
            "listening on {bind} with no authentication; any device on your network can access this API"
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    eprintln!("Listening on http://{bind}:{port}");
    log::info!("default sort mode: {default_mode}");
    axum::serve(listener, app).await?;

    Ok(())
}
