/// Generic ownership-scoped CRUD controller
///
/// Tasks, notes and events share one set of operations. Each kind plugs in
/// its storage, visibility query and validation through the [`Resource`]
/// trait; authorization is decided here, once, from the resource's
/// [`Ownership`].
///
/// Authorization always runs before any write, and a failed check never
/// leaves a partial mutation behind.
///
/// | Outcome | When |
/// |---------|------|
/// | `NotFound` | the id doesn't exist |
/// | `Forbidden` | the id exists but the principal lacks the access |
/// | `Validation` | a required field is missing or malformed |
///
/// # Example
///
/// ```no_run
/// use companyhq_shared::resource;
/// use companyhq_shared::models::task::{CreateTask, Task, UpdateTask, TaskStatus};
/// # use companyhq_shared::auth::principal::Principal;
/// # use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool, me: Principal) -> Result<(), Box<dyn std::error::Error>> {
/// let task: Task = resource::create(&pool, &me, CreateTask {
///     title: Some("Ship it".into()),
///     ..Default::default()
/// }).await?;
///
/// let done: Task = resource::update(&pool, &me, task.id, UpdateTask {
///     status: Some(TaskStatus::Done),
///     ..Default::default()
/// }).await?;
///
/// resource::delete::<Task>(&pool, &me, done.id).await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::authorization::{self, Access, Ownership};
use crate::auth::principal::Principal;
use crate::validation::FieldError;

/// Resource kinds exposed by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Tasks,
    Notes,
    Events,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Tasks => "tasks",
            ResourceKind::Notes => "notes",
            ResourceKind::Events => "events",
        }
    }

    /// Singular, capitalized name for messages
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Tasks => "Task",
            ResourceKind::Notes => "Note",
            ResourceKind::Events => "Event",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a path segment names no resource kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown resource kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tasks" => Ok(ResourceKind::Tasks),
            "notes" => Ok(ResourceKind::Notes),
            "events" => Ok(ResourceKind::Events),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Controller errors
#[derive(Debug, thiserror::Error)]
pub enum CrudError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{} not found", .0.label())]
    NotFound(ResourceKind),

    #[error("Not authorized to modify this {}", .0.label().to_lowercase())]
    Forbidden(ResourceKind),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A resource kind managed by the controller
///
/// Implementors supply storage, ordering and validation. The controller
/// supplies authorization.
#[async_trait]
pub trait Resource: Serialize + Send + Sync + Sized + 'static {
    const KIND: ResourceKind;

    /// Create payload (JSON, camelCase)
    type Create: DeserializeOwned + Send + 'static;

    /// Partial update payload; absent fields are left untouched
    type Update: DeserializeOwned + Send + 'static;

    fn id(&self) -> Uuid;

    /// Owner, assignee and sharing facts used for authorization
    fn ownership(&self) -> Ownership;

    /// Everything the principal may view, in the kind's canonical order
    async fn list_visible(pool: &SqlitePool, principal: &Principal) -> Result<Vec<Self>, sqlx::Error>;

    /// Looks up any resource of this kind, regardless of who may see it
    async fn find(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error>;

    /// Validates `fields` and stores a new resource owned by `owner`
    async fn insert(
        pool: &SqlitePool,
        owner: &Principal,
        fields: Self::Create,
        now: DateTime<Utc>,
    ) -> Result<Self, CrudError>;

    /// Validates and applies `changes`, persisting the result
    async fn apply(
        self,
        pool: &SqlitePool,
        changes: Self::Update,
        now: DateTime<Utc>,
    ) -> Result<Self, CrudError>;

    /// Hard-deletes by id; returns false if nothing was deleted
    async fn remove(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error>;
}

/// Lists every resource of kind `R` visible to `principal`
pub async fn list<R: Resource>(pool: &SqlitePool, principal: &Principal) -> Result<Vec<R>, CrudError> {
    let items = R::list_visible(pool, principal).await?;
    debug!(kind = %R::KIND, user_id = %principal.user_id, count = items.len(), "Listed resources");
    Ok(items)
}

/// Creates a resource owned by `principal`
pub async fn create<R: Resource>(
    pool: &SqlitePool,
    principal: &Principal,
    fields: R::Create,
) -> Result<R, CrudError> {
    let item = R::insert(pool, principal, fields, Utc::now()).await?;
    info!(kind = %R::KIND, id = %item.id(), user_id = %principal.user_id, "Resource created");
    Ok(item)
}

/// Applies a partial update after checking update rights
pub async fn update<R: Resource>(
    pool: &SqlitePool,
    principal: &Principal,
    id: Uuid,
    changes: R::Update,
) -> Result<R, CrudError> {
    let existing = authorize::<R>(pool, principal, id, Access::Update).await?;
    let updated = existing.apply(pool, changes, Utc::now()).await?;
    info!(kind = %R::KIND, id = %id, user_id = %principal.user_id, "Resource updated");
    Ok(updated)
}

/// Deletes a resource after checking delete rights
///
/// Deleting the same id twice yields `Ok` then `NotFound`.
pub async fn delete<R: Resource>(
    pool: &SqlitePool,
    principal: &Principal,
    id: Uuid,
) -> Result<(), CrudError> {
    authorize::<R>(pool, principal, id, Access::Delete).await?;

    if !R::remove(pool, id).await? {
        // removed between the check and the delete
        return Err(CrudError::NotFound(R::KIND));
    }

    info!(kind = %R::KIND, id = %id, user_id = %principal.user_id, "Resource deleted");
    Ok(())
}

/// Loads the resource and checks `access` for `principal`
async fn authorize<R: Resource>(
    pool: &SqlitePool,
    principal: &Principal,
    id: Uuid,
    access: Access,
) -> Result<R, CrudError> {
    let existing = R::find(pool, id).await?.ok_or(CrudError::NotFound(R::KIND))?;

    authorization::require(principal, &existing.ownership(), access).map_err(|_| {
        debug!(kind = %R::KIND, id = %id, user_id = %principal.user_id, ?access, "Access denied");
        CrudError::Forbidden(R::KIND)
    })?;

    Ok(existing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_round_trip_names() {
        for kind in [ResourceKind::Tasks, ResourceKind::Notes, ResourceKind::Events] {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind() {
        let err = "widgets".parse::<ResourceKind>().unwrap_err();
        assert_eq!(err, UnknownKind("widgets".to_string()));
        assert!(err.to_string().contains("widgets"));
    }

    #[test]
    fn test_crud_error_messages() {
        assert_eq!(CrudError::NotFound(ResourceKind::Tasks).to_string(), "Task not found");
        assert_eq!(
            CrudError::Forbidden(ResourceKind::Notes).to_string(),
            "Not authorized to modify this note"
        );
    }
}
