/// User management endpoints
///
/// - `GET /v1/users` - List users
/// - `PATCH /v1/users/:id/ai-toggle` - Flip a user's AI access

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use companyhq_shared::auth::authorization::require_self_or_admin;
use companyhq_shared::auth::principal::Principal;
use companyhq_shared::models::user::{User, UserSummary};
use uuid::Uuid;

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

/// List all users (public fields only)
pub async fn list_users(
    State(state): State<AppState>,
    Extension(_principal): Extension<Principal>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let users = User::list(&state.db).await?;
    Ok(Json(users.into_iter().map(UserSummary::from).collect()))
}

/// Toggle AI access for a user
///
/// # Errors
///
/// - `403 Forbidden`: caller is neither the user nor an admin
/// - `404 Not Found`: no such user
pub async fn toggle_ai(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserSummary>> {
    let user_id: Uuid = user_id.parse().map_err(|_| user_not_found())?;
    require_self_or_admin(&principal, user_id)?;

    let user = User::toggle_ai(&state.db, user_id)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(
        user_id = %user.id,
        changed_by = %principal.user_id,
        ai_enabled = user.ai_enabled,
        "AI access toggled"
    );

    Ok(Json(user.into()))
}
