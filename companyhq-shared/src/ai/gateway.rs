/// Quota-checked AI gateway
///
/// Preconditions are checked in a fixed order before the provider is
/// called:
///
/// 1. the principal has AI access enabled, else `Disabled`
/// 2. a provider is configured, else `NotConfigured`
/// 3. fewer than `limit` requests were logged since 00:00 UTC, else
///    `QuotaExceeded`
///
/// The provider gets exactly one attempt. A successful call is appended to
/// the request log, which is also what the quota counts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

use super::provider::Generator;
use crate::auth::principal::Principal;
use crate::models::ai_request::{AiRequest, CreateAiRequest};
use crate::quota::{DailyQuota, QuotaError};
use crate::validation::{required_text, FieldError};

/// Task type recorded when the caller doesn't give one
pub const DEFAULT_TASK_TYPE: &str = "general";

/// AI gateway errors
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI assistant is disabled for your account")]
    Disabled,

    #[error("AI assistant not configured. Please set GEMINI_API_KEY environment variable.")]
    NotConfigured,

    #[error("Daily AI request limit reached ({limit}/day). Try again tomorrow.")]
    QuotaExceeded { limit: u32 },

    #[error("AI request failed: {0}")]
    UpstreamFailure(String),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<QuotaError> for AiError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::LimitExceeded { limit, .. } => AiError::QuotaExceeded { limit },
            QuotaError::DatabaseError(e) => AiError::Database(e),
        }
    }
}

/// Successful gateway answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnswer {
    pub response: String,
    pub requests_remaining: i64,
}

/// Quota usage for the current UTC day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
}

/// The AI gateway
#[derive(Clone)]
pub struct AiGateway {
    db: SqlitePool,
    generator: Option<Arc<dyn Generator>>,
    quota: DailyQuota,
}

impl std::fmt::Debug for AiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiGateway")
            .field("generator", &self.generator.as_ref().map(|g| g.name().to_string()))
            .field("limit", &self.quota.limit())
            .finish()
    }
}

impl AiGateway {
    /// Creates a gateway; `generator: None` means no provider is configured
    pub fn new(db: SqlitePool, generator: Option<Arc<dyn Generator>>, daily_limit: u32) -> Self {
        let quota = DailyQuota::new(db.clone(), daily_limit);
        Self {
            db,
            generator,
            quota,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    /// Asks the provider on behalf of `principal`
    pub async fn ask(
        &self,
        principal: &Principal,
        prompt: &str,
        task_type: Option<&str>,
    ) -> Result<AiAnswer, AiError> {
        self.ask_at(principal, prompt, task_type, Utc::now()).await
    }

    /// Same as [`AiGateway::ask`] with an explicit clock
    pub async fn ask_at(
        &self,
        principal: &Principal,
        prompt: &str,
        task_type: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AiAnswer, AiError> {
        if !principal.ai_enabled {
            return Err(AiError::Disabled);
        }

        let Some(generator) = self.generator.as_ref() else {
            return Err(AiError::NotConfigured);
        };

        let quota = self.quota.enforce_at(principal.user_id, now).await?;

        let prompt = required_text("prompt", Some(prompt)).map_err(|e| AiError::Validation(vec![e]))?;
        let task_type = task_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TASK_TYPE)
            .to_string();

        let generation = match generator.generate(&prompt).await {
            Ok(generation) => generation,
            Err(e) => {
                warn!(
                    user_id = %principal.user_id,
                    provider = generator.name(),
                    error = %e,
                    "AI provider call failed"
                );
                return Err(AiError::UpstreamFailure(e.0));
            }
        };

        AiRequest::create(
            &self.db,
            CreateAiRequest {
                user_id: principal.user_id,
                prompt,
                response: generation.text.clone(),
                task_type: task_type.clone(),
                tokens_used: generation.tokens_used.unwrap_or(0),
            },
            now,
        )
        .await?;

        let requests_remaining =
            (i64::from(quota.limit) - i64::from(quota.current) - 1).max(0);

        info!(
            user_id = %principal.user_id,
            task_type = %task_type,
            tokens_used = generation.tokens_used.unwrap_or(0),
            requests_remaining,
            "AI request served"
        );

        Ok(AiAnswer {
            response: generation.text,
            requests_remaining,
        })
    }

    /// Reports today's usage for `principal`
    pub async fn quota_status(&self, principal: &Principal) -> Result<QuotaStatus, AiError> {
        self.quota_status_at(principal, Utc::now()).await
    }

    pub async fn quota_status_at(
        &self,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<QuotaStatus, AiError> {
        let result = self.quota.check_at(principal.user_id, now).await?;
        Ok(QuotaStatus {
            used: result.current,
            limit: result.limit,
            remaining: result.remaining,
        })
    }
}
