//! HTTP API routes.

use std::{sync::Arc, time::Instant};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, Query, State, rejection::JsonRejection},
    http::{Method, StatusCode, Uri},
    middleware,
    routing::{get, post},
};
use chrono::Utc;
use labshell_core::{
    CommandHistory, Session, SessionError, SessionId, SessionPage, SessionStorage, Statistics,
    validation::validate_command_payload,
};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{
    ApiError, RateLimiter,
    error::handle_panic,
    protocol::{CommandResponse, DeleteResponse, HealthResponse, ListQuery, TerminateResponse},
    rate_limit::rate_limit,
};

/// Maximum accepted request body (10 MiB).
pub const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn SessionStorage>,
    pub rate_limiter: Arc<RateLimiter>,
    pub started_at: Instant,
}

impl AppState {
    /// Create state around `storage` with the default rate limit.
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            storage,
            rate_limiter: Arc::new(RateLimiter::default()),
            started_at: Instant::now(),
        }
    }

    /// Replace the rate limiter.
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Arc::new(limiter);
        self
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let limiter = Arc::clone(&state.rate_limiter);

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/sessions/terminate-all", post(terminate_all))
        .route(
            "/api/sessions/{id}",
            get(get_session).put(update_session).delete(delete_session),
        )
        .route("/api/sessions/{id}/command", post(execute_command))
        .route("/api/sessions/{id}/history", get(command_history))
        .route("/api/statistics", get(statistics))
        .fallback(route_not_found)
        .method_not_allowed_fallback(route_not_found)
        .layer(middleware::from_fn_with_state(limiter, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(BODY_LIMIT)),
        )
        .with_state(state)
}

fn parse_id(raw: &str) -> Result<SessionId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Session(SessionError::NotFound(raw.to_string())))
}

// ============ Health Check ============

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "labshell API is running".to_string(),
    })
}

// ============ Sessions ============

async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<SessionPage>, ApiError> {
    let page = state.storage.list(&query.into()).await?;
    Ok(Json(page))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let session = state.storage.get(parse_id(&id)?).await?;
    Ok(Json(session))
}

async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let Json(payload) = payload?;
    let session = state.storage.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Session>, ApiError> {
    let id = parse_id(&id)?;
    let Json(payload) = payload?;
    let session = state.storage.update(id, &payload).await?;
    Ok(Json(session))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.storage.delete(parse_id(&id)?).await?;
    Ok(Json(DeleteResponse {
        message: "Session deleted successfully".to_string(),
        deleted_session: deleted,
    }))
}

// ============ Commands ============

async fn execute_command(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CommandResponse>, ApiError> {
    let Json(payload) = payload?;
    let command = validate_command_payload(&payload)?;
    let (session, result) = state
        .storage
        .append_command(parse_id(&id)?, &command)
        .await?;

    Ok(Json(CommandResponse {
        session,
        command_response: result,
    }))
}

async fn command_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CommandHistory>, ApiError> {
    let history = state.storage.history(parse_id(&id)?).await?;
    Ok(Json(history))
}

async fn terminate_all(State(state): State<AppState>) -> Result<Json<TerminateResponse>, ApiError> {
    let terminated = state.storage.terminate_all().await?;
    Ok(Json(TerminateResponse {
        message: format!("{terminated} sessions terminated successfully"),
        terminated_count: terminated,
    }))
}

// ============ Statistics ============

async fn statistics(State(state): State<AppState>) -> Result<Json<Statistics>, ApiError> {
    Ok(Json(state.storage.statistics().await?))
}

// ============ Fallback ============

async fn route_not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::RouteNotFound {
        method: method.to_string(),
        path: uri
            .path_and_query()
            .map_or_else(|| uri.path().to_string(), ToString::to_string),
    }
}
