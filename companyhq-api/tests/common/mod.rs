//! Common test utilities for API integration tests
//!
//! Each [`TestApp`] owns a private in-memory database, a scratch pipeline
//! directory and a router wired to a canned AI generator. Requests are
//! driven through `tower::ServiceExt::oneshot`, no socket involved.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use companyhq_api::app::{build_router, AppState};
use companyhq_api::config::Config;
use companyhq_shared::ai::{GenerateError, Generation, Generator};
use companyhq_shared::db::migrations::run_migrations;
use companyhq_shared::db::pool::{create_pool, DatabaseConfig};
use serde_json::Value as JsonValue;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

/// Generator that answers `echo: <prompt>` and counts calls
#[derive(Default)]
pub struct EchoGenerator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Generator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str) -> Result<Generation, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Generation {
            text: format!("echo: {}", prompt),
            tokens_used: Some(5),
        })
    }
}

/// Response pieces tests look at
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: JsonValue,
}

impl TestResponse {
    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

/// A registered user and their bearer token
pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

pub struct TestApp {
    pub app: Router,
    pub db: SqlitePool,
    pub generator: Arc<EchoGenerator>,
    pub tmp_dir: PathBuf,
}

impl TestApp {
    /// App with an AI provider configured
    pub async fn new() -> Self {
        Self::build(true).await
    }

    /// App with no AI provider
    pub async fn without_ai() -> Self {
        Self::build(false).await
    }

    async fn build(with_ai: bool) -> Self {
        let db = create_pool(DatabaseConfig::in_memory())
            .await
            .expect("in-memory pool should open");
        run_migrations(&db).await.expect("migrations should apply");

        let tmp_dir = std::env::temp_dir().join(format!("companyhq-api-test-{}", Uuid::new_v4()));

        let mut config = Config::default();
        config.pipeline = config.pipeline.with_tmp_dir(&tmp_dir);

        let generator = Arc::new(EchoGenerator::default());
        let provider: Option<Arc<dyn Generator>> = if with_ai {
            Some(generator.clone() as Arc<dyn Generator>)
        } else {
            None
        };

        let state = AppState::with_generator(db.clone(), config, provider).expect("state should build");

        TestApp {
            app: build_router(state),
            db,
            generator,
            tmp_dir,
        }
    }

    /// Sends a request; `body` is JSON, `token` goes in `Authorization: Bearer`
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<JsonValue>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body ({}): {}", status, String::from_utf8_lossy(&bytes))
            })
        };

        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: JsonValue) -> TestResponse {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: JsonValue) -> TestResponse {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers `username` with password `secret1`
    pub async fn register(&self, username: &str) -> TestUser {
        let response = self
            .request(
                Method::POST,
                "/v1/auth/register",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "secret1",
                    "passwordConfirm": "secret1"
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

        TestUser {
            id: response.body["id"].as_str().unwrap().parse().unwrap(),
            token: response.body["token"].as_str().unwrap().to_string(),
        }
    }

    pub fn generator_calls(&self) -> usize {
        self.generator.calls.load(Ordering::SeqCst)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.tmp_dir);
    }
}
