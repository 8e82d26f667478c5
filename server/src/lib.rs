use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use filmquery_core::persist::{load_snapshot, IndexPaths};
use filmquery_core::query::{
    ActorStats, DirectorStats, Metric, MonthCount, RankedTitle, Recommendations, RecordPage,
    TitleScore, TitleVotes, WeekdayCount,
};
use filmquery_core::{QueryConfig, QueryError, QueryService};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QueryService>,
    pub index_root: PathBuf,
    pub admin_token: Option<String>,
}

/// JSON error body: `{ "error": kind, "message": text }`.
pub enum ApiError {
    Query(QueryError),
    Unauthorized(&'static str),
    /// A blocking task panicked or was aborted.
    Internal(String),
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self { ApiError::Query(e) }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        tracing::error!(error = %e, "blocking task failed");
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Query(e) => {
                let status = match &e {
                    QueryError::NotFound { .. } => StatusCode::NOT_FOUND,
                    QueryError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
                    QueryError::PolicyNotMet(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    QueryError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                    QueryError::IndexOutOfRange { .. } | QueryError::LoadFailure(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, e.kind(), e.to_string())
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        };
        (status, Json(serde_json::json!({ "error": kind, "message": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Load the snapshot directory and build the router over it.
pub fn build_app(index_dir: String, config: QueryConfig) -> Result<Router> {
    let paths = IndexPaths::new(&index_dir);
    let snapshot = load_snapshot(&paths)?;
    let service = Arc::new(QueryService::new(snapshot, config));
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    Ok(router(AppState { service, index_root: PathBuf::from(&index_dir), admin_token }))
}

pub fn router(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/count/month/:month", get(count_by_month))
        .route("/count/weekday/:weekday", get(count_by_weekday))
        .route("/count/months", get(month_histogram))
        .route("/count/weekdays", get(weekday_histogram))
        .route("/title/:title", get(title_lookup))
        .route("/title/:title/votes", get(title_votes))
        .route("/actor/:name", get(actor_stats))
        .route("/director/:name", get(director_stats))
        .route("/recommend/:title", get(recommend))
        .route("/movies", get(records))
        .route("/top/:metric", get(top_by))
        .route("/admin/reload", post(reload))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn count_by_month(State(state): State<AppState>, Path(month): Path<String>) -> ApiResult<MonthCount> {
    Ok(Json(state.service.count_by_month(&month)?))
}

async fn count_by_weekday(State(state): State<AppState>, Path(weekday): Path<String>) -> ApiResult<WeekdayCount> {
    Ok(Json(state.service.count_by_weekday(&weekday)?))
}

async fn month_histogram(State(state): State<AppState>) -> Json<[usize; 12]> {
    Json(state.service.month_histogram())
}

async fn weekday_histogram(State(state): State<AppState>) -> Json<[usize; 7]> {
    Json(state.service.weekday_histogram())
}

async fn title_lookup(State(state): State<AppState>, Path(title): Path<String>) -> ApiResult<TitleScore> {
    Ok(Json(state.service.title_lookup(&title)?))
}

async fn title_votes(State(state): State<AppState>, Path(title): Path<String>) -> ApiResult<TitleVotes> {
    Ok(Json(state.service.title_votes(&title)?))
}

async fn actor_stats(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<ActorStats> {
    Ok(Json(state.service.actor_stats(&name)?))
}

async fn director_stats(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<DirectorStats> {
    Ok(Json(state.service.director_stats(&name)?))
}

async fn recommend(State(state): State<AppState>, Path(title): Path<String>) -> ApiResult<Recommendations> {
    // top-k is CPU-bound and O(corpus); keep it off the async workers
    let service = Arc::clone(&state.service);
    let result = tokio::task::spawn_blocking(move || service.recommend(&title)).await?;
    Ok(Json(result?))
}

#[derive(Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}
fn default_page_size() -> usize { 100 }

async fn records(State(state): State<AppState>, Query(params): Query<PageParams>) -> Json<RecordPage> {
    Json(state.service.records(params.page, params.page_size))
}

#[derive(Deserialize)]
pub struct TopParams {
    #[serde(default = "default_n")]
    pub n: usize,
}
fn default_n() -> usize { 10 }

async fn top_by(
    State(state): State<AppState>,
    Path(metric): Path<String>,
    Query(params): Query<TopParams>,
) -> ApiResult<Vec<RankedTitle>> {
    let metric: Metric = metric.parse()?;
    Ok(Json(state.service.top_by(metric, params.n.min(1000))))
}

#[derive(Serialize)]
pub struct ReloadResponse {
    pub records: usize,
    pub previous_records: usize,
}

async fn reload(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<ReloadResponse> {
    authorize(&state, &headers)?;
    let paths = IndexPaths::new(&state.index_root);
    let loaded = tokio::task::spawn_blocking(move || load_snapshot(&paths)).await?;
    match loaded {
        Ok(next) => {
            let records = next.catalog.len();
            let prev = state.service.reload(next);
            Ok(Json(ReloadResponse { records, previous_records: prev.catalog.len() }))
        }
        Err(e) => {
            tracing::warn!(error = %e, "reload rejected, keeping current snapshot");
            Err(QueryError::from(e).into())
        }
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = state.admin_token.as_deref().ok_or(ApiError::Unauthorized("ADMIN_TOKEN not set"))?;
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token"))
    }
}
