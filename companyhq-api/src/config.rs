/// Configuration management for the API server
///
/// Configuration comes from environment variables; a `.env` file is loaded
/// first when present.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT` or `PORT`: Port to bind to (default: 8080)
/// - `API_PRODUCTION`: Enables HSTS and `Secure` cookies (default: false)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: *)
/// - `DATABASE_URL`: SQLite URL (default: sqlite://companyhq.db?mode=rwc)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `SESSION_TTL_HOURS`: Session lifetime (default: 168)
/// - `SESSION_COOKIE_NAME`: Session cookie name (default: hq_session)
/// - `GEMINI_API_KEY`: Enables the AI assistant when set
/// - `GEMINI_MODEL`, `GEMINI_BASE_URL`: Provider overrides
/// - `AI_DAILY_LIMIT`: AI requests per user per UTC day (default: 50)
/// - `PIPELINE_TMP_DIR`, `DATA_SOURCE_PATH`, `DATA_SOURCE_URL`, `DELIVERY_URL`:
///   see `companyhq_pipeline::config`
///
/// # Example
///
/// ```no_run
/// use companyhq_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use companyhq_pipeline::config::PipelineConfig;
use companyhq_shared::ai::provider::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use companyhq_shared::auth::session::DEFAULT_COOKIE_NAME;
use companyhq_shared::quota::DEFAULT_DAILY_AI_LIMIT;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseSettings,
    pub session: SessionConfig,
    pub ai: AiConfig,
    pub pipeline: PipelineConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Production mode: HSTS header and `Secure` cookies
    pub production: bool,

    /// Allowed CORS origins; `*` allows any origin
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub ttl_hours: i64,
    pub cookie_name: String,
}

/// AI provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Provider API key; `None` leaves the assistant unconfigured
    #[serde(skip)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub daily_limit: u32,
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("daily_limit", &self.daily_limit)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                production: false,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseSettings {
                url: "sqlite://companyhq.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            session: SessionConfig {
                ttl_hours: 168,
                cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            },
            ai: AiConfig {
                api_key: None,
                model: DEFAULT_GEMINI_MODEL.to_string(),
                base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
                daily_limit: DEFAULT_DAILY_AI_LIMIT,
            },
            pipeline: PipelineConfig::default(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, default: bool) -> anyhow::Result<bool> {
    match non_empty_var(key).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("{} must be a boolean, got {}", key, v),
        },
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a malformed value
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let port = match non_empty_var("API_PORT") {
            Some(_) => parse_var("API_PORT", defaults.api.port)?,
            None => parse_var("PORT", defaults.api.port)?,
        };

        let cors_origins = non_empty_var("CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .filter(|origins| !origins.is_empty())
            .unwrap_or(defaults.api.cors_origins);

        let ttl_hours: i64 = parse_var("SESSION_TTL_HOURS", defaults.session.ttl_hours)?;
        if ttl_hours <= 0 {
            anyhow::bail!("SESSION_TTL_HOURS must be positive");
        }

        let max_connections: u32 =
            parse_var("DATABASE_MAX_CONNECTIONS", defaults.database.max_connections)?;
        if max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }

        Ok(Self {
            api: ApiConfig {
                host: non_empty_var("API_HOST").unwrap_or(defaults.api.host),
                port,
                production: parse_bool("API_PRODUCTION", defaults.api.production)?,
                cors_origins,
            },
            database: DatabaseSettings {
                url: non_empty_var("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections,
            },
            session: SessionConfig {
                ttl_hours,
                cookie_name: non_empty_var("SESSION_COOKIE_NAME")
                    .unwrap_or(defaults.session.cookie_name),
            },
            ai: AiConfig {
                api_key: non_empty_var("GEMINI_API_KEY"),
                model: non_empty_var("GEMINI_MODEL").unwrap_or(defaults.ai.model),
                base_url: non_empty_var("GEMINI_BASE_URL").unwrap_or(defaults.ai.base_url),
                daily_limit: parse_var("AI_DAILY_LIMIT", defaults.ai.daily_limit)?,
            },
            pipeline: PipelineConfig::from_env()?,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|o| o == "*")
    }
}
