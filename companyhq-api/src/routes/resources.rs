/// Resource endpoints for tasks, notes and events
///
/// - `GET /v1/resources/:kind` - List visible resources
/// - `POST /v1/resources/:kind` - Create (201)
/// - `PATCH|PUT /v1/resources/:kind/:id` - Partial update
/// - `DELETE /v1/resources/:kind/:id` - Delete
///
/// `:kind` is one of `tasks`, `notes`, `events`; anything else is 404.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use companyhq_shared::auth::principal::Principal;
use companyhq_shared::models::{event::Event, note::Note, task::Task};
use companyhq_shared::resource::{self, CrudError, Resource, ResourceKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: String,
}

/// Parses a request body into a typed payload
///
/// An empty body counts as `{}`. Unparseable JSON is a bad request; a
/// well-formed object with a wrong-typed or out-of-range field (e.g. an
/// unknown status) is a validation error.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    let value = if body.iter().all(u8::is_ascii_whitespace) {
        JsonValue::Object(Default::default())
    } else {
        serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Malformed JSON: {}", e)))?
    };

    if !value.is_object() {
        return Err(ApiError::BadRequest("Request body must be a JSON object".to_string()));
    }

    serde_json::from_value(value).map_err(|e| ApiError::invalid("body", e.to_string()))
}

/// Parses an id path segment; one that is not a UUID names no resource
fn parse_id(kind: ResourceKind, id: &str) -> ApiResult<Uuid> {
    id.parse::<Uuid>().map_err(|_| CrudError::NotFound(kind).into())
}

fn to_json<T: Serialize>(value: &T) -> ApiResult<JsonValue> {
    serde_json::to_value(value).map_err(|e| ApiError::InternalError(format!("Serialization failed: {}", e)))
}

async fn list_kind<R: Resource>(pool: &SqlitePool, principal: &Principal) -> ApiResult<JsonValue> {
    let items = resource::list::<R>(pool, principal).await?;
    to_json(&items)
}

async fn create_kind<R: Resource>(pool: &SqlitePool, principal: &Principal, body: &Bytes) -> ApiResult<JsonValue> {
    let fields: R::Create = parse_body(body)?;
    let item = resource::create::<R>(pool, principal, fields).await?;
    to_json(&item)
}

async fn update_kind<R: Resource>(
    pool: &SqlitePool,
    principal: &Principal,
    id: Uuid,
    body: &Bytes,
) -> ApiResult<JsonValue> {
    let changes: R::Update = parse_body(body)?;
    let item = resource::update::<R>(pool, principal, id, changes).await?;
    to_json(&item)
}

/// List resources of `kind` visible to the caller
pub async fn list_resources(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(kind): Path<String>,
) -> ApiResult<Json<JsonValue>> {
    let items = match kind.parse::<ResourceKind>()? {
        ResourceKind::Tasks => list_kind::<Task>(&state.db, &principal).await?,
        ResourceKind::Notes => list_kind::<Note>(&state.db, &principal).await?,
        ResourceKind::Events => list_kind::<Event>(&state.db, &principal).await?,
    };

    Ok(Json(items))
}

/// Create a resource owned by the caller
///
/// # Errors
///
/// - `400 Bad Request`: malformed body or failed validation
/// - `404 Not Found`: unknown kind
pub async fn create_resource(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(kind): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<JsonValue>)> {
    let item = match kind.parse::<ResourceKind>()? {
        ResourceKind::Tasks => create_kind::<Task>(&state.db, &principal, &body).await?,
        ResourceKind::Notes => create_kind::<Note>(&state.db, &principal, &body).await?,
        ResourceKind::Events => create_kind::<Event>(&state.db, &principal, &body).await?,
    };

    Ok((StatusCode::CREATED, Json(item)))
}

/// Partially update a resource
///
/// # Errors
///
/// - `403 Forbidden`: the caller may not update it
/// - `404 Not Found`: unknown kind or id
pub async fn update_resource(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((kind, id)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<JsonValue>> {
    let kind = kind.parse::<ResourceKind>()?;
    let id = parse_id(kind, &id)?;
    let item = match kind {
        ResourceKind::Tasks => update_kind::<Task>(&state.db, &principal, id, &body).await?,
        ResourceKind::Notes => update_kind::<Note>(&state.db, &principal, id, &body).await?,
        ResourceKind::Events => update_kind::<Event>(&state.db, &principal, id, &body).await?,
    };

    Ok(Json(item))
}

/// Delete a resource; only its owner may
pub async fn delete_resource(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<Json<DeletedResponse>> {
    let kind = kind.parse::<ResourceKind>()?;
    let id = parse_id(kind, &id)?;
    match kind {
        ResourceKind::Tasks => resource::delete::<Task>(&state.db, &principal, id).await?,
        ResourceKind::Notes => resource::delete::<Note>(&state.db, &principal, id).await?,
        ResourceKind::Events => resource::delete::<Event>(&state.db, &principal, id).await?,
    }

    Ok(Json(DeletedResponse {
        message: format!("{} deleted", kind.label()),
    }))
}
