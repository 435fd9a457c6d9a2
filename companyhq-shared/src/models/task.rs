/// Task model and database operations
///
/// Tasks are created by one user and may be assigned to another. Both can
/// see and update the task; only the creator can delete it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id BLOB PRIMARY KEY NOT NULL,
///     title TEXT NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     status TEXT NOT NULL DEFAULT 'todo',       -- todo | in_progress | done
///     priority TEXT NOT NULL DEFAULT 'medium',   -- low | medium | high
///     due_date TEXT,
///     assigned_to BLOB REFERENCES users(id) ON DELETE SET NULL,
///     created_by BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TEXT NOT NULL,
///     updated_at TEXT NOT NULL
/// );
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::authorization::Ownership;
use crate::auth::principal::Principal;
use crate::models::user::User;
use crate::resource::{CrudError, Resource, ResourceKind};
use crate::serde_util::{double_option, parse_timestamp};
use crate::validation::{required_text, FieldError};

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Task with creator and assignee names resolved
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
    pub assignee_name: Option<String>,
    pub created_by: Uuid,
    pub creator_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a task
///
/// Only `title` is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<String>,
    pub assigned_to: Option<Uuid>,
}

/// Partial update for a task
///
/// `dueDate` and `assignedTo` can be cleared with an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,
}

const TASK_SELECT: &str = r#"
    SELECT t.id, t.title, t.description, t.status, t.priority, t.due_date,
           t.assigned_to, a.username AS assignee_name,
           t.created_by, c.username AS creator_name,
           t.created_at, t.updated_at
    FROM tasks t
    JOIN users c ON c.id = t.created_by
    LEFT JOIN users a ON a.id = t.assigned_to
"#;

impl Task {
    /// Finds a task by ID
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!("{TASK_SELECT} WHERE t.id = ?1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Lists tasks created by or assigned to `user_id`, newest first
    pub async fn list_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "{TASK_SELECT} WHERE t.created_by = ?1 OR t.assigned_to = ?1
             ORDER BY t.created_at DESC, t.rowid DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Inserts the task row and reads it back with names resolved
    async fn insert_row(pool: &SqlitePool, task: &Task) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, title, description, status, priority, due_date,
                               assigned_to, created_by, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.priority)
        .bind(task.due_date)
        .bind(task.assigned_to)
        .bind(task.created_by)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(pool)
        .await?;

        Self::find_by_id(pool, task.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Writes every mutable column and reads the row back
    async fn save(pool: &SqlitePool, task: &Task) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET title = ?1, description = ?2, status = ?3, priority = ?4,
                due_date = ?5, assigned_to = ?6, updated_at = ?7
            WHERE id = ?8
            "#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.priority)
        .bind(task.due_date)
        .bind(task.assigned_to)
        .bind(task.updated_at)
        .bind(task.id)
        .execute(pool)
        .await?;

        Self::find_by_id(pool, task.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Deletes a task by ID
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn parse_due_date(raw: &str) -> Result<Option<DateTime<Utc>>, FieldError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_timestamp(raw)
        .map(Some)
        .ok_or_else(|| FieldError::new("dueDate", "dueDate must be an ISO 8601 date or date-time"))
}

async fn check_assignee(pool: &SqlitePool, assignee: Option<Uuid>) -> Result<Option<FieldError>, sqlx::Error> {
    let Some(id) = assignee else {
        return Ok(None);
    };

    if User::find_by_id(pool, id).await?.is_some() {
        Ok(None)
    } else {
        Ok(Some(FieldError::new("assignedTo", "assignedTo must reference an existing user")))
    }
}

#[async_trait]
impl Resource for Task {
    const KIND: ResourceKind = ResourceKind::Tasks;

    type Create = CreateTask;
    type Update = UpdateTask;

    fn id(&self) -> Uuid {
        self.id
    }

    fn ownership(&self) -> Ownership {
        Ownership::owned_by(self.created_by).assigned_to(self.assigned_to)
    }

    async fn list_visible(pool: &SqlitePool, principal: &Principal) -> Result<Vec<Self>, sqlx::Error> {
        Self::list_for_user(pool, principal.user_id).await
    }

    async fn find(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        Self::find_by_id(pool, id).await
    }

    async fn insert(
        pool: &SqlitePool,
        owner: &Principal,
        fields: CreateTask,
        now: DateTime<Utc>,
    ) -> Result<Self, CrudError> {
        let mut errors = Vec::new();

        let title = required_text("title", fields.title.as_deref())
            .map_err(|e| errors.push(e))
            .ok();

        let due_date = match fields.due_date.as_deref().map(parse_due_date) {
            Some(Ok(due)) => due,
            Some(Err(e)) => {
                errors.push(e);
                None
            }
            None => None,
        };

        if let Some(e) = check_assignee(pool, fields.assigned_to).await? {
            errors.push(e);
        }

        let Some(title) = title.filter(|_| errors.is_empty()) else {
            return Err(CrudError::Validation(errors));
        };

        let task = Task {
            id: Uuid::new_v4(),
            title,
            description: fields.description.unwrap_or_default(),
            status: fields.status.unwrap_or_default(),
            priority: fields.priority.unwrap_or_default(),
            due_date,
            assigned_to: fields.assigned_to,
            assignee_name: None,
            created_by: owner.user_id,
            creator_name: owner.username.clone(),
            created_at: now,
            updated_at: now,
        };

        Ok(Self::insert_row(pool, &task).await?)
    }

    async fn apply(
        mut self,
        pool: &SqlitePool,
        changes: UpdateTask,
        now: DateTime<Utc>,
    ) -> Result<Self, CrudError> {
        let mut errors = Vec::new();

        if let Some(title) = changes.title {
            match required_text("title", Some(title.as_str())) {
                Ok(title) => self.title = title,
                Err(e) => errors.push(e),
            }
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(due) = changes.due_date {
            match due.as_deref().map(parse_due_date).transpose() {
                Ok(parsed) => self.due_date = parsed.flatten(),
                Err(e) => errors.push(e),
            }
        }
        if let Some(assignee) = changes.assigned_to {
            if let Some(e) = check_assignee(pool, assignee).await? {
                errors.push(e);
            }
            self.assigned_to = assignee;
        }

        if !errors.is_empty() {
            return Err(CrudError::Validation(errors));
        }

        self.updated_at = now;
        Ok(Self::save(pool, &self).await?)
    }

    async fn remove(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        Self::delete(pool, id).await
    }
}
