/// Pipeline trigger endpoint
///
/// Cron/webhook entry point. The body is an optional action envelope;
/// a missing or malformed body counts as `{}`, which runs the full pipeline.
///
/// # Endpoint
///
/// ```text
/// POST /trigger
/// Content-Type: application/json
///
/// { "action": "analyze", "payload": {}, "options": {} }
/// ```
///
/// # Response
///
/// ```json
/// { "route": { "tool": "analyze", ... }, "tool_exit": 0 }
/// ```
///
/// The exit key is `health_exit`, `pipeline_exit` or `tool_exit` depending
/// on what ran. Failures return 503 for the health check and 500 otherwise.

use crate::app::AppState;
use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use companyhq_pipeline::router::Envelope;
use serde_json::Value as JsonValue;

pub async fn trigger(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<JsonValue>) {
    let envelope = Envelope::from_body(&body);
    let outcome = state.dispatcher.dispatch(envelope).await;

    let status =
        StatusCode::from_u16(outcome.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (status, Json(outcome.to_json()))
}
