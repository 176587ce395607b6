pub mod health;
pub mod scoreboard;

use std::sync::Arc;

use axum::{routing::get, routing::post, Router};

use crate::AppState;

pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/scoreboard/join", post(scoreboard::join))
        .route("/scoreboard/cancel", post(scoreboard::cancel))
        .route("/scoreboard/stop", post(scoreboard::stop_game))
}
