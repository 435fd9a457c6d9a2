/// Session authentication middleware
///
/// Resolves the request's session token to a [`Principal`] and stores it in
/// the request extensions together with the raw [`SessionToken`]. The token
/// is read from `Authorization: Bearer <token>` first, then from the
/// session cookie. Requests without a live session get `401`.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use companyhq_shared::auth::principal::Principal;
use companyhq_shared::auth::session::{extract_bearer, SessionCookie};

use crate::{app::AppState, error::ApiError};

/// The plaintext token that authenticated the current request
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Finds the session token in `headers`
pub fn session_token(headers: &HeaderMap, cookie: &SessionCookie) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer)
        .map(str::to_string);

    bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|raw| cookie.extract(raw))
    })
}

/// Requires a valid session
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(req.headers(), &state.cookie)
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let principal: Principal = state.identity.resolve(&token).await?;
    tracing::debug!(user_id = %principal.user_id, "Session resolved");

    req.extensions_mut().insert(principal);
    req.extensions_mut().insert(SessionToken(token));

    Ok(next.run(req).await)
}
