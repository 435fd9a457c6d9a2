/// Daily AI request quota
///
/// Each user may make a fixed number of AI requests per UTC calendar day.
/// The window is a fixed bucket that resets at 00:00:00 UTC, not a rolling
/// 24 hours. Usage is the count of logged requests since the window start;
/// there is no separate counter to drift out of sync.
///
/// # Example
///
/// ```no_run
/// use companyhq_shared::quota::DailyQuota;
/// use chrono::Utc;
/// # use sqlx::SqlitePool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: SqlitePool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let quota = DailyQuota::new(pool, 50);
///
/// let status = quota.check_at(user_id, Utc::now()).await?;
/// println!("{} of {} used, {} left", status.current, status.limit, status.remaining);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, TimeZone, Utc};
use sqlx::SqlitePool;
use std::fmt;
use uuid::Uuid;

use crate::models::ai_request::AiRequest;

/// Default number of AI requests per user per UTC day
pub const DEFAULT_DAILY_AI_LIMIT: u32 = 50;

/// Quota errors
#[derive(Debug)]
pub enum QuotaError {
    /// The user has used up today's requests
    LimitExceeded { limit: u32, current: u32 },

    /// Database error while counting usage
    DatabaseError(sqlx::Error),
}

impl fmt::Display for QuotaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaError::LimitExceeded { limit, .. } => write!(
                f,
                "Daily AI request limit reached ({}/day). Try again tomorrow.",
                limit
            ),
            QuotaError::DatabaseError(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for QuotaError {}

impl From<sqlx::Error> for QuotaError {
    fn from(err: sqlx::Error) -> Self {
        QuotaError::DatabaseError(err)
    }
}

/// Result of a quota check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaCheckResult {
    /// Whether another request is allowed
    pub allowed: bool,

    /// Requests already used in the current window
    pub current: u32,

    pub limit: u32,

    /// Requests left before the limit (0 when exceeded)
    pub remaining: u32,
}

impl QuotaCheckResult {
    pub fn allowed(current: u32, limit: u32) -> Self {
        QuotaCheckResult {
            allowed: true,
            current,
            limit,
            remaining: limit.saturating_sub(current),
        }
    }

    pub fn exceeded(current: u32, limit: u32) -> Self {
        QuotaCheckResult {
            allowed: false,
            current,
            limit,
            remaining: 0,
        }
    }

    /// Builds the result for `current` requests used against `limit`
    pub fn evaluate(current: u32, limit: u32) -> Self {
        if current >= limit {
            Self::exceeded(current, limit)
        } else {
            Self::allowed(current, limit)
        }
    }
}

/// Start of the UTC calendar day containing `now`
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_else(|| now.naive_utc());
    Utc.from_utc_datetime(&midnight)
}

/// Per-user daily request quota backed by the AI request log
#[derive(Debug, Clone)]
pub struct DailyQuota {
    db: SqlitePool,
    limit: u32,
}

impl DailyQuota {
    pub fn new(db: SqlitePool, limit: u32) -> Self {
        DailyQuota { db, limit }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Counts the user's requests in the window containing `now`
    pub async fn used_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<u32, QuotaError> {
        let count = AiRequest::count_since(&self.db, user_id, window_start(now)).await?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Checks the quota without enforcing it
    pub async fn check_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<QuotaCheckResult, QuotaError> {
        let current = self.used_at(user_id, now).await?;
        Ok(QuotaCheckResult::evaluate(current, self.limit))
    }

    /// Checks the quota and fails with `LimitExceeded` when it is used up
    pub async fn enforce_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<QuotaCheckResult, QuotaError> {
        let result = self.check_at(user_id, now).await?;

        if !result.allowed {
            return Err(QuotaError::LimitExceeded {
                limit: result.limit,
                current: result.current,
            });
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_start_is_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 23, 59, 59).unwrap();
        assert_eq!(
            window_start(now),
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_window_start_at_midnight_is_itself() {
        let midnight = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
        assert_eq!(window_start(midnight), midnight);
    }

    #[test]
    fn test_quota_check_result_allowed() {
        let result = QuotaCheckResult::evaluate(49, 50);
        assert!(result.allowed);
        assert_eq!(result.remaining, 1);
    }

    #[test]
    fn test_quota_check_result_exceeded() {
        let result = QuotaCheckResult::evaluate(50, 50);
        assert!(!result.allowed);
        assert_eq!(result.current, 50);
        assert_eq!(result.remaining, 0);
    }

    #[test]
    fn test_quota_error_display() {
        let err = QuotaError::LimitExceeded {
            limit: 50,
            current: 50,
        };
        assert_eq!(
            err.to_string(),
            "Daily AI request limit reached (50/day). Try again tomorrow."
        );
    }
}
