/// AI assistant endpoints
///
/// - `POST /v1/ai/query` - Ask the model (counts against the daily quota)
/// - `GET /v1/ai/quota` - Today's usage
/// - `POST /v1/ai/route` - Route a free-text query without running anything

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use companyhq_pipeline::router::{route, Envelope, RouteResult};
use companyhq_shared::ai::{AiAnswer, QuotaStatus};
use companyhq_shared::auth::principal::Principal;
use serde::Deserialize;

/// AI query request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub prompt: String,
    pub task_type: Option<String>,
}

/// Routing request; `action` defaults to `full_pipeline`
#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    #[serde(default)]
    pub query: String,
    pub action: Option<String>,
}

/// Ask the AI assistant
///
/// # Errors
///
/// - `403 Forbidden`: AI access disabled for the caller
/// - `503 Service Unavailable`: no provider configured
/// - `429 Too Many Requests`: daily quota used up
/// - `400 Bad Request`: blank prompt
/// - `500 Internal Server Error`: provider call failed
pub async fn query(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<Json<AiAnswer>> {
    let Json(req) = payload?;
    let answer = state
        .ai
        .ask(&principal, &req.prompt, req.task_type.as_deref())
        .await?;
    Ok(Json(answer))
}

/// Today's quota usage for the caller
pub async fn quota(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<QuotaStatus>> {
    Ok(Json(state.ai.quota_status(&principal).await?))
}

/// Route a free-text query to a pipeline tool
pub async fn route_query(
    Extension(principal): Extension<Principal>,
    payload: Result<Json<RouteRequest>, JsonRejection>,
) -> ApiResult<Json<RouteResult>> {
    let Json(req) = payload?;

    let query = req.query.trim();
    if query.is_empty() {
        return Err(ApiError::invalid("query", "query is required"));
    }

    let mut envelope = Envelope::for_query(query);
    if let Some(action) = req.action {
        envelope.action = Some(action);
    }

    let result = route(&envelope);
    tracing::debug!(user_id = %principal.user_id, tool = %result.tool, "Routed AI query");

    Ok(Json(result))
}
