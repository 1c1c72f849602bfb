//! HTTP API for serving retrieval queries.

pub mod routes;

use std::sync::{Arc, RwLock};

use tracing::info;

use crate::corpus::Corpus;
use crate::metrics::MetricsCollector;
use crate::mips::MipsIndex;

/// Shared application state for the HTTP server.
///
/// The index and user vectors are frozen after startup; only the metrics
/// are written per request.
pub struct AppState {
    pub index: Arc<MipsIndex>,
    /// Known user vectors, for queries by user id
    pub users: Option<Arc<Corpus>>,
    pub metrics: RwLock<MetricsCollector>,
}

impl AppState {
    pub fn new(index: Arc<MipsIndex>, users: Option<Arc<Corpus>>) -> Self {
        Self {
            index,
            users,
            metrics: RwLock::new(MetricsCollector::new()),
        }
    }
}

/// Serve `state` on `addr` until the process is stopped.
pub async fn start(addr: &str, state: AppState) -> anyhow::Result<()> {
    let stats = state.index.stats();
    let app = routes::create_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        items = stats.corpus_len,
        tables = stats.num_tables,
        bits = stats.num_bits,
        "server listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
