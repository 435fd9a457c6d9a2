/// Error handling for the API server
///
/// Every handler returns `ApiResult<T>`; library errors convert into
/// [`ApiError`] with `?` and render as
///
/// ```json
/// { "error": "Task not found", "code": "not_found" }
/// ```
///
/// Validation failures add `details: [{field, message}]`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use companyhq_shared::ai::AiError;
use companyhq_shared::auth::authorization::AuthzError;
use companyhq_shared::auth::identity::IdentityError;
use companyhq_shared::resource::{CrudError, UnknownKind};
use companyhq_shared::validation::{summarize, FieldError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Validation failed (400)
    ValidationError(Vec<FieldError>),

    /// Username or email already registered (400)
    DuplicateIdentifier(String),

    /// Missing or invalid session (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Daily AI quota used up (429)
    QuotaExceeded(String),

    /// AI provider call failed (500)
    UpstreamFailure(String),

    /// Internal server error (500), details are logged, not returned
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,

    /// Error code (e.g., "not_found", "quota_exceeded")
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::ValidationError(_)
            | ApiError::DuplicateIdentifier(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamFailure(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::DuplicateIdentifier(_) => "duplicate_identifier",
            ApiError::Unauthorized(_) => "unauthenticated",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::QuotaExceeded(_) => "quota_exceeded",
            ApiError::UpstreamFailure(_) => "upstream_failure",
            ApiError::InternalError(_) => "internal_error",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
        }
    }

    /// Single-field validation error
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![FieldError::new(field, message)])
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::DuplicateIdentifier(msg) => write!(f, "Duplicate identifier: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::QuotaExceeded(msg) => write!(f, "Quota exceeded: {}", msg),
            ApiError::UpstreamFailure(msg) => write!(f, "Upstream failure: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();

        let (message, details) = match self {
            ApiError::ValidationError(errors) => (summarize(&errors), Some(errors)),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                ("An internal error occurred".to_string(), None)
            }
            ApiError::BadRequest(msg)
            | ApiError::DuplicateIdentifier(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::QuotaExceeded(msg)
            | ApiError::UpstreamFailure(msg)
            | ApiError::ServiceUnavailable(msg) => (msg, None),
        };

        let body = Json(ErrorResponse {
            error: message,
            code,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert malformed JSON bodies to API errors
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Convert identity errors to API errors
impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Validation(errors) => ApiError::ValidationError(errors),
            IdentityError::WeakSecret(msg) => ApiError::invalid("password", msg),
            IdentityError::DuplicateIdentifier(msg) => ApiError::DuplicateIdentifier(msg),
            IdentityError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid username/email or password".to_string())
            }
            IdentityError::Unauthenticated => {
                ApiError::Unauthorized("Authentication required".to_string())
            }
            IdentityError::Password(e) => {
                ApiError::InternalError(format!("Password operation failed: {}", e))
            }
            IdentityError::Database(e) => e.into(),
        }
    }
}

/// Convert controller errors to API errors
impl From<CrudError> for ApiError {
    fn from(err: CrudError) -> Self {
        match err {
            CrudError::Validation(errors) => ApiError::ValidationError(errors),
            CrudError::NotFound(_) => ApiError::NotFound(err.to_string()),
            CrudError::Forbidden(_) => ApiError::Forbidden(err.to_string()),
            CrudError::Database(e) => e.into(),
        }
    }
}

/// Convert AI gateway errors to API errors
impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::Disabled => ApiError::Forbidden(err.to_string()),
            AiError::NotConfigured => ApiError::ServiceUnavailable(err.to_string()),
            AiError::QuotaExceeded { .. } => ApiError::QuotaExceeded(err.to_string()),
            AiError::UpstreamFailure(_) => ApiError::UpstreamFailure(err.to_string()),
            AiError::Validation(errors) => ApiError::ValidationError(errors),
            AiError::Database(e) => e.into(),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotAuthorized => {
                ApiError::Forbidden("Not authorized to access this resource".to_string())
            }
        }
    }
}

impl From<UnknownKind> for ApiError {
    fn from(err: UnknownKind) -> Self {
        ApiError::NotFound(err.to_string())
    }
}
