/// Database connection pool management
///
/// This module provides the SQLite connection pool used by every component.
/// The pool is created once at startup, passed explicitly to each handler via
/// application state, and closed on shutdown.
///
/// # Example
///
/// ```no_run
/// use companyhq_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: "sqlite://companyhq.db?mode=rwc".to_string(),
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///
///     let row: (i64,) = sqlx::query_as("SELECT ?1")
///         .bind(42i64)
///         .fetch_one(&pool)
///         .await?;
///
///     Ok(())
/// }
/// ```

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pool settings; durations are whole seconds so they map onto env vars
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `sqlite://companyhq.db?mode=rwc`, `sqlite::memory:`, ...
    pub url: String,

    /// Upper bound on open connections (10). An in-memory database needs
    /// exactly 1: each connection would otherwise see its own empty database.
    pub max_connections: u32,

    /// Connections kept open while idle (1)
    pub min_connections: u32,

    /// How long a request waits for a free connection (30)
    pub connect_timeout_seconds: u64,

    /// Idle connections are closed after this long (600); `None` keeps them
    pub idle_timeout_seconds: Option<u64>,

    /// Connections are recycled after this long (1800); `None` keeps them
    pub max_lifetime_seconds: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            max_lifetime_seconds: Some(1800),
        }
    }
}

impl DatabaseConfig {
    /// Configuration for a private in-memory database
    ///
    /// A single connection that never expires, so the schema and data live
    /// as long as the pool does. Used by tests and throwaway instances.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout_seconds: 30,
            idle_timeout_seconds: None,
            max_lifetime_seconds: None,
        }
    }
}

/// Opens the SQLite pool with foreign keys enforced and checks it answers
///
/// Fails on a malformed URL, a database file that cannot be opened or
/// created, or a failed `SELECT 1`.
pub async fn create_pool(config: DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        connect_timeout_seconds = config.connect_timeout_seconds,
        "Creating database connection pool"
    );

    let connect_options = SqliteConnectOptions::from_str(&config.url)?.foreign_keys(true);

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .idle_timeout(config.idle_timeout_seconds.map(Duration::from_secs))
        .max_lifetime(config.max_lifetime_seconds.map(Duration::from_secs));

    if config.max_connections == 1 {
        pool_options = pool_options.test_before_acquire(false);
        debug!("Single-connection pool, skipping test_before_acquire");
    }

    let pool = pool_options.connect_with(connect_options).await?;

    health_check(&pool).await?;

    info!("Database connection pool created successfully");
    Ok(pool)
}

/// Round-trips `SELECT 1`; used at startup and by `GET /health`
pub async fn health_check(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let (answer,): (i64,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;

    if answer != 1 {
        warn!(answer, "Database answered SELECT 1 with an unexpected value");
        return Err(sqlx::Error::Protocol("unexpected SELECT 1 result".into()));
    }

    debug!("Database reachable");
    Ok(())
}

/// Closes every connection; called once on shutdown
pub async fn close_pool(pool: SqlitePool) {
    pool.close().await;
    info!("Database pool closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.connect_timeout_seconds, 30);
        assert_eq!(config.idle_timeout_seconds, Some(600));
        assert_eq!(config.max_lifetime_seconds, Some(1800));
    }

    #[test]
    fn test_in_memory_config_is_single_connection() {
        let config = DatabaseConfig::in_memory();
        assert_eq!(config.max_connections, 1);
        assert!(config.idle_timeout_seconds.is_none());
        assert!(config.max_lifetime_seconds.is_none());
    }

    #[tokio::test]
    async fn test_create_in_memory_pool() {
        let pool = create_pool(DatabaseConfig::in_memory())
            .await
            .expect("in-memory pool should open");

        assert!(health_check(&pool).await.is_ok());

        close_pool(pool).await;
    }
}
