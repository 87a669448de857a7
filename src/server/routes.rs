//! HTTP route handlers for the classifier API.

use crate::classifier::{AnchorStrategy, FastKnn};
use crate::dataset::points_from_rows;
use crate::error::KnnError;
use crate::metrics::{LatencySummary, QueryKind};
use crate::server::AppState;
use crate::vote::Method;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, MutexGuard};
use std::time::Instant;

// --- Request/Response types ---

#[derive(Deserialize)]
pub struct InsertRequest {
    pub point: Vec<f64>,
    pub label: String,
}

#[derive(Deserialize)]
pub struct BatchInsertRequest {
    pub points: Vec<Vec<f64>>,
    pub labels: Vec<String>,
}

#[derive(Deserialize)]
pub struct ClassifyRequest {
    pub point: Vec<f64>,
    pub k: Option<usize>,
    pub method: Option<String>,
}

#[derive(Deserialize)]
pub struct AnchorsRequest {
    pub strategy: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct NeighborResponse {
    pub index: usize,
    pub distance: f64,
    pub label: String,
}

#[derive(Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub label: String,
    pub neighbors: Vec<NeighborResponse>,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub point_count: usize,
    pub anchor_count: usize,
    pub index_fresh: bool,
}

#[derive(Serialize, Deserialize)]
pub struct MetricsResponse {
    pub total_queries: u64,
    pub cold_queries: u64,
    pub total_inserts: u64,
    pub total_anchor_resets: u64,
    pub warm_latency: LatencySummary,
    pub cold_latency: LatencySummary,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

// --- Router ---

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/points", post(insert_point))
        .route("/points/batch", post(insert_batch))
        .route("/classify", post(classify))
        .route("/anchors", post(reset_anchors))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

fn lock(state: &AppState) -> Result<MutexGuard<'_, FastKnn<String>>, ApiError> {
    state.classifier.lock().map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Lock poisoned".to_string(),
            }),
        )
    })
}

fn bad_request(e: KnnError) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// --- Handlers ---

async fn insert_point(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InsertRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let point = Array1::from(req.point);
    let index = {
        let mut classifier = lock(&state)?;
        classifier
            .insert(point.view(), req.label)
            .map_err(bad_request)?;
        classifier.len() - 1
    };

    if let Ok(mut metrics) = state.metrics.write() {
        metrics.record_inserts(1);
    }

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"index": index, "status": "inserted"})),
    ))
}

async fn insert_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchInsertRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let points = points_from_rows(&req.points).map_err(bad_request)?;
    let count = req.labels.len();
    {
        let mut classifier = lock(&state)?;
        classifier
            .insert_batch(points.view(), &req.labels)
            .map_err(bad_request)?;
    }

    if let Ok(mut metrics) = state.metrics.write() {
        metrics.record_inserts(count);
    }

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"inserted": count, "status": "inserted"})),
    ))
}

async fn classify(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let point = Array1::from(req.point);
    let k = req.k.unwrap_or(1);
    let method = match req.method.as_deref() {
        Some(m) => m.parse::<Method>().map_err(bad_request)?,
        None => Method::Mode,
    };

    let start = Instant::now();

    let (response, kind) = {
        let mut classifier = lock(&state)?;
        // The query rebuilds first unless the lists exist for a full anchor set.
        let warm =
            classifier.is_fresh() && classifier.anchors().len() >= classifier.num_anchors();
        let kind = if warm { QueryKind::Warm } else { QueryKind::Cold };
        let neighbors = classifier.neighbors(point.view(), k).map_err(bad_request)?;
        let labels = classifier.labels();
        let label = method
            .aggregate(neighbors.iter().map(|n| &labels[n.index]))
            .ok_or_else(|| bad_request(KnnError::invalid("no neighbors to aggregate")))?;

        let response = ClassifyResponse {
            label,
            neighbors: neighbors
                .iter()
                .map(|n| NeighborResponse {
                    index: n.index,
                    distance: n.distance,
                    label: labels[n.index].clone(),
                })
                .collect(),
        };
        (response, kind)
    };

    let elapsed = start.elapsed();

    if let Ok(mut metrics) = state.metrics.write() {
        metrics.record_query(kind, elapsed);
    }

    Ok(Json(response))
}

async fn reset_anchors(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnchorsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let strategy = match req.strategy.as_deref() {
        Some(s) => s.parse::<AnchorStrategy>().map_err(bad_request)?,
        None => AnchorStrategy::Random,
    };

    let anchors = {
        let mut classifier = lock(&state)?;
        classifier.select_anchors(strategy);
        classifier.anchors().to_vec()
    };

    if let Ok(mut metrics) = state.metrics.write() {
        metrics.record_anchor_reset();
    }

    Ok(Json(serde_json::json!({"anchors": anchors, "status": "stale"})))
}

async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    let classifier = lock(&state)?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        point_count: classifier.len(),
        anchor_count: classifier.anchors().len(),
        index_fresh: classifier.is_fresh(),
    }))
}

async fn get_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MetricsResponse>, ApiError> {
    let metrics = state.metrics.read().map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Lock poisoned".to_string(),
            }),
        )
    })?;

    Ok(Json(MetricsResponse {
        total_queries: metrics.total_queries(),
        cold_queries: metrics.cold_queries(),
        total_inserts: metrics.total_inserts(),
        total_anchor_resets: metrics.total_anchor_resets(),
        warm_latency: metrics.warm_latency().summary(),
        cold_latency: metrics.cold_latency().summary(),
    }))
}
