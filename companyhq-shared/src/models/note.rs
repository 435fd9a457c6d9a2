/// Note model and database operations
///
/// Notes belong to their author. A shared note is readable by every user
/// but can still only be changed or deleted by its author.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::authorization::Ownership;
use crate::auth::principal::Principal;
use crate::resource::{CrudError, Resource, ResourceKind};
use crate::serde_util::double_option;
use crate::validation::required_text;

/// Note with the author's username resolved
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub folder: Option<String>,
    pub is_shared: bool,
    pub user_id: Uuid,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNote {
    pub title: Option<String>,
    pub content: Option<String>,
    pub folder: Option<String>,
    pub is_shared: Option<bool>,
}

/// Partial update for a note; `folder: null` moves it out of its folder
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNote {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub folder: Option<Option<String>>,
    pub is_shared: Option<bool>,
}

const NOTE_SELECT: &str = r#"
    SELECT n.id, n.title, n.content, n.folder, n.is_shared,
           n.user_id, u.username AS user_name, n.created_at, n.updated_at
    FROM notes n
    JOIN users u ON u.id = n.user_id
"#;

impl Note {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let note = sqlx::query_as::<_, Note>(&format!("{NOTE_SELECT} WHERE n.id = ?1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(note)
    }

    /// Lists the user's own notes plus every shared note, newest first
    pub async fn list_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let notes = sqlx::query_as::<_, Note>(&format!(
            "{NOTE_SELECT} WHERE n.user_id = ?1 OR n.is_shared = 1
             ORDER BY n.created_at DESC, n.rowid DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(notes)
    }

    async fn insert_row(pool: &SqlitePool, note: &Note) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO notes (id, user_id, title, content, folder, is_shared, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(note.id)
        .bind(note.user_id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(&note.folder)
        .bind(note.is_shared)
        .bind(note.created_at)
        .bind(note.updated_at)
        .execute(pool)
        .await?;

        Self::find_by_id(pool, note.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    async fn save(pool: &SqlitePool, note: &Note) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE notes
            SET title = ?1, content = ?2, folder = ?3, is_shared = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(&note.title)
        .bind(&note.content)
        .bind(&note.folder)
        .bind(note.is_shared)
        .bind(note.updated_at)
        .bind(note.id)
        .execute(pool)
        .await?;

        Self::find_by_id(pool, note.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notes WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Blank folder names are stored as no folder
fn normalize_folder(folder: Option<String>) -> Option<String> {
    folder
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
}

#[async_trait]
impl Resource for Note {
    const KIND: ResourceKind = ResourceKind::Notes;

    type Create = CreateNote;
    type Update = UpdateNote;

    fn id(&self) -> Uuid {
        self.id
    }

    fn ownership(&self) -> Ownership {
        Ownership::owned_by(self.user_id).shared(self.is_shared)
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
        fields: CreateNote,
        now: DateTime<Utc>,
    ) -> Result<Self, CrudError> {
        let title = required_text("title", fields.title.as_deref())
            .map_err(|e| CrudError::Validation(vec![e]))?;

        let note = Note {
            id: Uuid::new_v4(),
            title,
            content: fields.content.unwrap_or_default(),
            folder: normalize_folder(fields.folder),
            is_shared: fields.is_shared.unwrap_or(false),
            user_id: owner.user_id,
            user_name: owner.username.clone(),
            created_at: now,
            updated_at: now,
        };

        Ok(Self::insert_row(pool, &note).await?)
    }

    async fn apply(
        mut self,
        pool: &SqlitePool,
        changes: UpdateNote,
        now: DateTime<Utc>,
    ) -> Result<Self, CrudError> {
        if let Some(title) = changes.title {
            self.title = required_text("title", Some(title.as_str()))
                .map_err(|e| CrudError::Validation(vec![e]))?;
        }
        if let Some(content) = changes.content {
            self.content = content;
        }
        if let Some(folder) = changes.folder {
            self.folder = normalize_folder(folder);
        }
        if let Some(is_shared) = changes.is_shared {
            self.is_shared = is_shared;
        }

        self.updated_at = now;
        Ok(Self::save(pool, &self).await?)
    }

    async fn remove(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        Self::delete(pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folder() {
        assert_eq!(normalize_folder(Some(" Work ".into())), Some("Work".into()));
        assert_eq!(normalize_folder(Some("  ".into())), None);
        assert_eq!(normalize_folder(None), None);
    }

    #[test]
    fn test_create_note_accepts_camel_case() {
        let fields: CreateNote =
            serde_json::from_str(r#"{"title": "n", "isShared": true}"#).unwrap();
        assert_eq!(fields.is_shared, Some(true));
        assert!(fields.content.is_none());
    }

    #[test]
    fn test_note_serializes_camel_case() {
        let note = Note {
            id: Uuid::new_v4(),
            title: "n".into(),
            content: String::new(),
            folder: None,
            is_shared: true,
            user_id: Uuid::new_v4(),
            user_name: "ada".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["isShared"], true);
        assert_eq!(json["userName"], "ada");
        assert!(json["folder"].is_null());
    }
}
