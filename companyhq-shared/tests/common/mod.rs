//! Shared helpers for companyhq-shared integration tests
//!
//! Every test gets its own in-memory SQLite database with migrations
//! applied, so tests are hermetic and can run in parallel.

#![allow(dead_code)]

use chrono::Duration;
use companyhq_shared::auth::identity::{IdentityStore, Registration};
use companyhq_shared::auth::principal::Principal;
use companyhq_shared::db::migrations::run_migrations;
use companyhq_shared::db::pool::{create_pool, DatabaseConfig};
use sqlx::SqlitePool;

/// Opens a fresh in-memory database with the schema applied
pub async fn setup_pool() -> SqlitePool {
    let pool = create_pool(DatabaseConfig::in_memory())
        .await
        .expect("in-memory pool should open");
    run_migrations(&pool).await.expect("migrations should apply");
    pool
}

pub fn identity_store(pool: &SqlitePool) -> IdentityStore {
    IdentityStore::new(pool.clone(), Duration::hours(168))
}

/// Registers `username` with password `secret1`
pub async fn register(pool: &SqlitePool, username: &str) -> Principal {
    identity_store(pool)
        .register(Registration {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "secret1".to_string(),
            password_confirm: Some("secret1".to_string()),
        })
        .await
        .expect("registration should succeed")
}
