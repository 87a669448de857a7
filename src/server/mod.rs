//! HTTP API server for the classifier.

pub mod routes;

use crate::classifier::FastKnn;
use crate::metrics::MetricsCollector;
use std::sync::{Arc, Mutex, RwLock};
use tracing::info;

/// Shared application state for the HTTP server.
///
/// Queries may rebuild the anchor lists, so every classifier operation,
/// reads included, takes the one exclusive lock.
pub struct AppState {
    pub classifier: Mutex<FastKnn<String>>,
    pub metrics: RwLock<MetricsCollector>,
}

impl AppState {
    pub fn new(classifier: FastKnn<String>) -> Self {
        Self {
            classifier: Mutex::new(classifier),
            metrics: RwLock::new(MetricsCollector::new()),
        }
    }
}

/// Serve `classifier` over HTTP until the process is stopped.
pub async fn serve(addr: &str, classifier: FastKnn<String>) -> anyhow::Result<()> {
    let points = classifier.len();
    let state = Arc::new(AppState::new(classifier));

    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, points, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
