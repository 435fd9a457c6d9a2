/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use companyhq_api::{app::AppState, config::Config};
/// use companyhq_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
/// let state = AppState::new(pool, config)?;
/// let app = companyhq_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use companyhq_pipeline::trigger::Dispatcher;
use companyhq_shared::ai::{AiGateway, GeminiClient, Generator};
use companyhq_shared::auth::identity::IdentityStore;
use companyhq_shared::auth::session::SessionCookie;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub identity: IdentityStore,
    pub ai: AiGateway,
    pub dispatcher: Arc<Dispatcher>,
    pub cookie: SessionCookie,
}

impl AppState {
    /// Builds the state, with a Gemini client when `GEMINI_API_KEY` is set
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP clients can't be created
    pub fn new(db: SqlitePool, config: Config) -> anyhow::Result<Self> {
        let generator: Option<Arc<dyn Generator>> = match &config.ai.api_key {
            Some(key) => Some(Arc::new(GeminiClient::new(
                key.clone(),
                config.ai.model.clone(),
                config.ai.base_url.clone(),
            )?)),
            None => {
                tracing::warn!("GEMINI_API_KEY not set, AI assistant disabled");
                None
            }
        };

        Self::with_generator(db, config, generator)
    }

    /// Builds the state around an explicit generator
    pub fn with_generator(
        db: SqlitePool,
        config: Config,
        generator: Option<Arc<dyn Generator>>,
    ) -> anyhow::Result<Self> {
        let ttl = chrono::Duration::hours(config.session.ttl_hours);
        let identity = IdentityStore::new(db.clone(), ttl);
        let ai = AiGateway::new(db.clone(), generator, config.ai.daily_limit);
        let dispatcher = Dispatcher::from_config(&config.pipeline)?;
        let cookie = SessionCookie::new(
            config.session.cookie_name.clone(),
            ttl.num_seconds(),
            config.api.production,
        );

        Ok(Self {
            db,
            config: Arc::new(config),
            identity,
            ai,
            dispatcher: Arc::new(dispatcher),
            cookie,
        })
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET      /health
/// ├── GET|POST /trigger
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /register
///     │   ├── POST /login
///     │   ├── POST /logout            (session)
///     │   └── GET  /me                (session)
///     ├── /users/                     (session)
///     │   ├── GET   /
///     │   └── PATCH /:id/ai-toggle
///     ├── /resources/:kind            (session; tasks, notes, events)
///     │   ├── GET | POST /
///     │   └── PATCH | PUT | DELETE /:id
///     └── /ai/                        (session)
///         ├── POST /query
///         ├── GET  /quota
///         └── POST /route
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::middleware::session::require_session;
    use crate::routes;

    let session_layer = axum::middleware::from_fn_with_state(state.clone(), require_session);

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let session_auth_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/me", get(routes::auth::me))
        .layer(session_layer.clone());

    let user_routes = Router::new()
        .route("/", get(routes::users::list_users))
        .route("/:id/ai-toggle", patch(routes::users::toggle_ai))
        .layer(session_layer.clone());

    let resource_routes = Router::new()
        .route(
            "/:kind",
            get(routes::resources::list_resources).post(routes::resources::create_resource),
        )
        .route(
            "/:kind/:id",
            patch(routes::resources::update_resource)
                .put(routes::resources::update_resource)
                .delete(routes::resources::delete_resource),
        )
        .layer(session_layer.clone());

    let ai_routes = Router::new()
        .route("/query", post(routes::ai::query))
        .route("/quota", get(routes::ai::quota))
        .route("/route", post(routes::ai::route_query))
        .layer(session_layer);

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(session_auth_routes))
        .nest("/users", user_routes)
        .nest("/resources", resource_routes)
        .nest("/ai", ai_routes);

    let cors = if state.config.allows_any_origin() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let production = state.config.api.production;

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/trigger",
            get(routes::trigger::trigger).post(routes::trigger::trigger),
        )
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}
