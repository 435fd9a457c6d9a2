/// Calendar event model and database operations
///
/// Events are strictly private to their owner. Every event is a time range;
/// the single-date form accepted on create (`{"date": "2025-03-01"}`) is
/// stored as an all-day event spanning that UTC day.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE events (
///     id BLOB PRIMARY KEY NOT NULL,
///     user_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title TEXT NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     start_time TEXT NOT NULL,
///     end_time TEXT NOT NULL,
///     color TEXT NOT NULL DEFAULT '#3788d8',
///     all_day INTEGER NOT NULL DEFAULT 0,
///     created_at TEXT NOT NULL
/// );
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::authorization::Ownership;
use crate::auth::principal::Principal;
use crate::resource::{CrudError, Resource, ResourceKind};
use crate::serde_util::{parse_date, parse_timestamp};
use crate::validation::{required_text, FieldError};

/// Color used when the client doesn't pick one
pub const DEFAULT_EVENT_COLOR: &str = "#3788d8";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "start")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "end")]
    pub end_time: DateTime<Utc>,
    pub color: String,
    pub all_day: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when creating an event
///
/// Either `start` and `end`, or a single `date` (`YYYY-MM-DD`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub date: Option<String>,
    pub color: Option<String>,
    pub all_day: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub color: Option<String>,
    pub all_day: Option<bool>,
}

const EVENT_COLUMNS: &str =
    "id, user_id, title, description, start_time, end_time, color, all_day, created_at";

impl Event {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(event)
    }

    /// Lists the user's events in chronological order
    pub async fn list_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE user_id = ?1
             ORDER BY start_time ASC, rowid ASC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(events)
    }

    async fn insert_row(pool: &SqlitePool, event: &Event) -> Result<Self, sqlx::Error> {
        let stored = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (id, user_id, title, description, start_time, end_time,
                                color, all_day, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event.id)
        .bind(event.user_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.color)
        .bind(event.all_day)
        .bind(event.created_at)
        .fetch_one(pool)
        .await?;

        Ok(stored)
    }

    async fn save(pool: &SqlitePool, event: &Event) -> Result<Self, sqlx::Error> {
        let stored = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET title = ?1, description = ?2, start_time = ?3, end_time = ?4,
                color = ?5, all_day = ?6
            WHERE id = ?7
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.color)
        .bind(event.all_day)
        .bind(event.id)
        .fetch_one(pool)
        .await?;

        Ok(stored)
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn parse_instant(field: &str, raw: &str) -> Result<DateTime<Utc>, FieldError> {
    parse_timestamp(raw).ok_or_else(|| {
        FieldError::new(field, format!("{} must be an ISO 8601 date-time", field))
    })
}

/// Accepts `#rgb` or `#rrggbb`
fn validate_color(color: &str) -> Result<String, FieldError> {
    let color = color.trim();
    let valid = color
        .strip_prefix('#')
        .map(|hex| (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false);

    if valid {
        Ok(color.to_string())
    } else {
        Err(FieldError::new("color", "color must be a hex color like #3788d8"))
    }
}

fn check_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), FieldError> {
    if end < start {
        Err(FieldError::new("end", "end must not be before start"))
    } else {
        Ok(())
    }
}

/// Resolves the create payload into `(start, end, all_day)`
fn resolve_range(fields: &CreateEvent) -> Result<(DateTime<Utc>, DateTime<Utc>, bool), FieldError> {
    if fields.start.is_none() {
        if let Some(ref raw) = fields.date {
            let day = parse_date(raw)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(|| FieldError::new("date", "date must be YYYY-MM-DD"))?;
            let start = Utc.from_utc_datetime(&day);
            return Ok((start, start + Duration::days(1), fields.all_day.unwrap_or(true)));
        }
    }

    let start = match fields.start.as_deref() {
        Some(raw) => parse_instant("start", raw)?,
        None => return Err(FieldError::new("start", "start and end, or date, are required")),
    };
    let end = match fields.end.as_deref() {
        Some(raw) => parse_instant("end", raw)?,
        None => return Err(FieldError::new("end", "end is required")),
    };
    check_range(start, end)?;

    Ok((start, end, fields.all_day.unwrap_or(false)))
}

#[async_trait]
impl Resource for Event {
    const KIND: ResourceKind = ResourceKind::Events;

    type Create = CreateEvent;
    type Update = UpdateEvent;

    fn id(&self) -> Uuid {
        self.id
    }

    fn ownership(&self) -> Ownership {
        Ownership::owned_by(self.user_id)
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
        fields: CreateEvent,
        now: DateTime<Utc>,
    ) -> Result<Self, CrudError> {
        let mut errors = Vec::new();

        let title = required_text("title", fields.title.as_deref())
            .map_err(|e| errors.push(e))
            .ok();
        let range = resolve_range(&fields).map_err(|e| errors.push(e)).ok();
        let color = match fields.color.as_deref() {
            Some(raw) => validate_color(raw).map_err(|e| errors.push(e)).ok(),
            None => Some(DEFAULT_EVENT_COLOR.to_string()),
        };

        let (Some(title), Some((start_time, end_time, all_day)), Some(color)) = (title, range, color)
        else {
            return Err(CrudError::Validation(errors));
        };

        let event = Event {
            id: Uuid::new_v4(),
            user_id: owner.user_id,
            title,
            description: fields.description.unwrap_or_default(),
            start_time,
            end_time,
            color,
            all_day,
            created_at: now,
        };

        Ok(Self::insert_row(pool, &event).await?)
    }

    async fn apply(
        mut self,
        pool: &SqlitePool,
        changes: UpdateEvent,
        _now: DateTime<Utc>,
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
        if let Some(raw) = changes.start {
            match parse_instant("start", &raw) {
                Ok(start) => self.start_time = start,
                Err(e) => errors.push(e),
            }
        }
        if let Some(raw) = changes.end {
            match parse_instant("end", &raw) {
                Ok(end) => self.end_time = end,
                Err(e) => errors.push(e),
            }
        }
        if let Some(raw) = changes.color {
            match validate_color(&raw) {
                Ok(color) => self.color = color,
                Err(e) => errors.push(e),
            }
        }
        if let Some(all_day) = changes.all_day {
            self.all_day = all_day;
        }

        if errors.is_empty() {
            if let Err(e) = check_range(self.start_time, self.end_time) {
                errors.push(e);
            }
        }
        if !errors.is_empty() {
            return Err(CrudError::Validation(errors));
        }

        Ok(Self::save(pool, &self).await?)
    }

    async fn remove(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        Self::delete(pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(json: &str) -> CreateEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_single_date_becomes_all_day_range() {
        let (start, end, all_day) =
            resolve_range(&create(r#"{"title": "x", "date": "2025-03-01"}"#)).unwrap();

        assert_eq!(start.to_rfc3339(), "2025-03-01T00:00:00+00:00");
        assert_eq!(end - start, Duration::days(1));
        assert!(all_day);
    }

    #[test]
    fn test_explicit_range() {
        let (start, end, all_day) = resolve_range(&create(
            r#"{"start": "2025-03-01T09:00:00Z", "end": "2025-03-01T10:00:00Z"}"#,
        ))
        .unwrap();

        assert_eq!(end - start, Duration::hours(1));
        assert!(!all_day);
    }

    #[test]
    fn test_end_before_start_rejected() {
        let err = resolve_range(&create(
            r#"{"start": "2025-03-01T10:00:00Z", "end": "2025-03-01T09:00:00Z"}"#,
        ))
        .unwrap_err();
        assert_eq!(err.field, "end");
    }

    #[test]
    fn test_missing_range_rejected() {
        assert_eq!(resolve_range(&create("{}")).unwrap_err().field, "start");
        assert_eq!(
            resolve_range(&create(r#"{"start": "2025-03-01T10:00:00Z"}"#))
                .unwrap_err()
                .field,
            "end"
        );
        assert_eq!(
            resolve_range(&create(r#"{"date": "March 1st"}"#)).unwrap_err().field,
            "date"
        );
    }

    #[test]
    fn test_validate_color() {
        assert_eq!(validate_color("#3788d8").unwrap(), "#3788d8");
        assert!(validate_color("#fff").is_ok());
        assert!(validate_color("red").is_err());
        assert!(validate_color("#12345g").is_err());
    }
}
