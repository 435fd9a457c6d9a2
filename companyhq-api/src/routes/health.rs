/// Health check endpoint
///
/// Verifies database connectivity and runs the pipeline's `health_check`
/// tool (working directory writable, data source present).
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "ok",
///   "version": "0.1.0",
///   "database": "connected",
///   "tmpDir": ".tmp",
///   "dataSource": "none"
/// }
/// ```
///
/// `503` with `"status": "error"` when either check fails.

use crate::app::AppState;
use axum::{extract::State, http::StatusCode, Json};
use companyhq_pipeline::tools::SUCCESS;
use companyhq_shared::db::pool;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok` or `error`
    pub status: String,
    pub version: String,
    /// `connected` or `disconnected`
    pub database: String,
    pub tmp_dir: String,
    /// `path`, `url` or `none`
    pub data_source: String,
    /// Exit code of the `health_check` tool
    pub health_exit: i32,
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_ok = match pool::health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            false
        }
    };

    let health_exit = state.dispatcher.health().await;
    let healthy = database_ok && health_exit == SUCCESS;

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "ok" } else { "error" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if database_ok { "connected" } else { "disconnected" }.to_string(),
            tmp_dir: state.dispatcher.tmp_dir().display().to_string(),
            data_source: state.config.pipeline.data_source.kind().to_string(),
            health_exit,
        }),
    )
}
