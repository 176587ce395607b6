mod config;
mod dispatcher;
mod engine;
mod error;
mod events;
mod models;
mod registry;
mod routes;
mod store;
mod websocket;

use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use dispatcher::Dispatcher;
use engine::ScoreboardEngine;
use registry::SessionRegistry;
use store::PgStore;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across all handlers
pub struct AppState {
    pub engine: ScoreboardEngine<PgStore>,
    pub registry: Arc<SessionRegistry>,
    pub dispatcher: Dispatcher,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lanescore_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting lanescore backend server...");

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Connect to database
    let pool = store::create_pool(config.database_url(), config.database.max_connections).await?;
    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create application state
    let registry = Arc::new(SessionRegistry::new());
    let state = Arc::new(AppState {
        engine: ScoreboardEngine::new(PgStore::new(pool)),
        dispatcher: Dispatcher::new(registry.clone()),
        registry,
    });

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        // One WebSocket session per game scoreboard
        .route(
            "/ws/scoreboard/{game_id}",
            get(websocket::handle_websocket),
        )
        // REST routes
        .merge(routes::create_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("WebSocket endpoint: ws://{}/ws/scoreboard/{{game_id}}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
