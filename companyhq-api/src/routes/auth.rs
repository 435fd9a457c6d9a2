/// Authentication endpoints
///
/// - `POST /v1/auth/register` - Register and start a session
/// - `POST /v1/auth/login` - Log in by username or email
/// - `POST /v1/auth/logout` - End the current session
/// - `GET /v1/auth/me` - Current user
///
/// Register and login set the session cookie and also return the token in
/// the body for clients that send `Authorization: Bearer`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::session::SessionToken,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use companyhq_shared::auth::identity::{IssuedSession, Registration};
use companyhq_shared::auth::principal::Principal;
use companyhq_shared::validation::FieldError;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(max = 80, message = "Username must be at most 80 characters"))]
    pub username: String,

    #[serde(default)]
    #[validate(length(max = 120, message = "Email must be at most 120 characters"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(max = 128, message = "Password must be at most 128 characters"))]
    pub password: String,

    /// Must equal `password` when present
    pub password_confirm: Option<String>,
}

/// Login request
///
/// `identifier` may be a username or an email; `username` and `email` are
/// accepted as aliases.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default, alias = "username", alias = "email")]
    #[validate(length(min = 1, message = "Username or email is required"))]
    pub identifier: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Register/login response: the user plus the session credential
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(flatten)]
    pub user: Principal,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Converts `validator` failures into field errors
pub fn validation_errors(errors: validator::ValidationErrors) -> ApiError {
    let mut details: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                FieldError::new(
                    field.to_string(),
                    error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                )
            })
        })
        .collect();
    details.sort_by(|a, b| a.field.cmp(&b.field));
    ApiError::ValidationError(details)
}

fn session_response(state: &AppState, status: StatusCode, session: IssuedSession) -> ApiResult<Response> {
    let cookie = HeaderValue::from_str(&state.cookie.build(&session.token))
        .map_err(|e| ApiError::InternalError(format!("Invalid cookie header: {}", e)))?;

    let body = SessionResponse {
        user: session.principal,
        token: session.token,
        expires_at: session.expires_at,
    };

    Ok((status, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "email": "alice@example.com",
///   "password": "secret1",
///   "passwordConfirm": "secret1"
/// }
/// ```
///
/// The first user ever registered becomes an admin.
///
/// # Errors
///
/// - `400 Bad Request`: validation failed, weak password, or username/email taken
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = payload?;
    req.validate().map_err(validation_errors)?;

    let principal = state
        .identity
        .register(Registration {
            username: req.username,
            email: req.email,
            password: req.password,
            password_confirm: req.password_confirm,
        })
        .await?;

    let session = state.identity.start_session_for(principal.user_id).await?;
    session_response(&state, StatusCode::CREATED, session)
}

/// Log in
///
/// # Errors
///
/// - `400 Bad Request`: missing fields
/// - `401 Unauthorized`: unknown user or wrong password
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = payload?;
    req.validate().map_err(validation_errors)?;

    let session = state.identity.authenticate(&req.identifier, &req.password).await?;
    tracing::info!(user_id = %session.principal.user_id, "User logged in");

    session_response(&state, StatusCode::OK, session)
}

/// Log out: revokes the session and clears the cookie
pub async fn logout(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(token): Extension<SessionToken>,
) -> ApiResult<Response> {
    state.identity.revoke(&token.0).await?;
    tracing::info!(user_id = %principal.user_id, "User logged out");

    let cookie = HeaderValue::from_str(&state.cookie.clear())
        .map_err(|e| ApiError::InternalError(format!("Invalid cookie header: {}", e)))?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
        .into_response())
}

/// Current user
pub async fn me(Extension(principal): Extension<Principal>) -> Json<Principal> {
    Json(principal)
}
