pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::{MemoryStore, PgStore, Store};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let store = PgStore::connect(database_url, config.database_max_connections).await?;

            tracing::info!("Running migrations...");
            store.run_migrations().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set, admin routes are disabled");
    }
    tracing::info!(
        curated = config.curated.len(),
        dev_mode = config.dev_mode,
        "Configuration loaded"
    );

    let addr = config.bind_address.clone();
    let app = router(AppState::new(store, config));

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the full router. Tests drive this directly.
pub fn router(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/api/auth/me", get(routes::auth::me))
        // Feed and answers
        .route("/api/playables/feed", get(routes::playables::feed))
        .route("/api/playables/:id/answer", post(routes::playables::answer))
        .route("/api/playables/:id/skip", post(routes::playables::skip))
        // User
        .route("/api/user/stats", get(routes::user::stats))
        .route("/api/user/categories", put(routes::user::select_categories))
        .route("/api/user/progress", delete(routes::user::reset_progress))
        .route("/api/categories", get(routes::categories::list))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            routes::auth::auth_middleware,
        ));

    let admin_routes = Router::new()
        .route(
            "/api/admin/playables",
            get(routes::admin::list_playables).post(routes::admin::create_playable),
        )
        .route("/api/admin/playables/bulk", post(routes::admin::bulk_import))
        .route(
            "/api/admin/playables/:id",
            get(routes::admin::get_playable)
                .put(routes::admin::replace_playable)
                .delete(routes::admin::delete_playable),
        )
        .route("/api/admin/categories", post(routes::admin::create_category))
        .route(
            "/api/admin/categories/:name",
            put(routes::admin::update_category).delete(routes::admin::delete_category),
        )
        .route("/api/admin/seed", post(routes::admin::seed))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            routes::auth::admin_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/dev-login", post(routes::auth::dev_login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .merge(session_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
