//! HTTP route handlers for the retrieval API.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RetrievalConfig;
use crate::corpus::UserId;
use crate::error::LshError;
use crate::index::ScoredItem;
use crate::lsh::IndexStats;
use crate::server::AppState;
use crate::vector::Vector;

// --- Request/Response types ---

/// Either a raw query vector or the id of a known user.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub vector: Option<Vec<f32>>,
    pub user: Option<UserId>,
    pub k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<ScoredItem>,
    pub touched: usize,
    pub touched_fraction: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub item_count: usize,
    pub user_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub total_queries: u64,
    pub failed_queries: u64,
    pub avg_query_latency_us: f64,
    pub p50_query_latency_us: f64,
    pub p95_query_latency_us: f64,
    pub p99_query_latency_us: f64,
    pub avg_touched_fraction: f64,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub config: RetrievalConfig,
    pub stats: IndexStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

impl From<LshError> for ApiError {
    fn from(e: LshError) -> Self {
        let status = match &e {
            LshError::VectorNotFound { .. } => StatusCode::NOT_FOUND,
            LshError::IoError(_) | LshError::SerializationError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        };
        api_error(status, e.to_string())
    }
}

// --- Router ---

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/query", post(query))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .route("/config", get(get_config))
        .with_state(state)
}

// --- Handlers ---

fn resolve_query(state: &AppState, req: QueryRequest) -> Result<(Vector, usize), LshError> {
    let k = req.k.unwrap_or(state.index.config().top_k);
    let vector = match (req.vector, req.user) {
        (Some(data), None) => {
            let vector = Vector::new(data);
            if !vector.is_finite() {
                return Err(LshError::InvalidVector {
                    reason: "query vector has a non-finite component".to_string(),
                });
            }
            vector
        }
        (None, Some(user)) => state
            .users
            .as_ref()
            .and_then(|users| users.get(user))
            .cloned()
            .ok_or(LshError::VectorNotFound { id: user })?,
        _ => {
            return Err(LshError::config(
                "request must name exactly one of `vector` or `user`",
            ))
        }
    };
    Ok((vector, k))
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let start = Instant::now();

    let result = resolve_query(&state, req).and_then(|(vector, k)| state.index.query(&vector, k));
    let result = match result {
        Ok(result) => result,
        Err(e) => {
            if let Ok(mut metrics) = state.metrics.write() {
                metrics.record_failure();
            }
            debug!(error = %e, "rejected query");
            return Err(e.into());
        }
    };

    let elapsed = start.elapsed();
    let touched_fraction = result.touched_fraction();

    if let Ok(mut metrics) = state.metrics.write() {
        metrics.record_query(elapsed, touched_fraction);
    }

    Ok(Json(QueryResponse {
        touched: result.touched,
        touched_fraction,
        results: result.items,
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        item_count: state.index.items().len(),
        user_count: state.users.as_ref().map_or(0, |users| users.len()),
    })
}

async fn get_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MetricsResponse>, ApiError> {
    let metrics = state
        .metrics
        .read()
        .map_err(|_| api_error(StatusCode::INTERNAL_SERVER_ERROR, "Lock poisoned"))?;

    Ok(Json(MetricsResponse {
        total_queries: metrics.total_queries(),
        failed_queries: metrics.failed_queries(),
        avg_query_latency_us: metrics.avg_query_latency_us(),
        p50_query_latency_us: metrics.percentile_query_latency_us(50.0),
        p95_query_latency_us: metrics.percentile_query_latency_us(95.0),
        p99_query_latency_us: metrics.percentile_query_latency_us(99.0),
        avg_touched_fraction: metrics.avg_touched_fraction(),
    }))
}

async fn get_config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        config: state.index.config().clone(),
        stats: state.index.stats(),
    })
}
