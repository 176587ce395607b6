use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::dispatcher::Outbox;
use crate::error::Result;
use crate::models::ScoreboardRow;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub game_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub avg: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub game_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStopRequest {
    pub game_id: i64,
}

/// Adds a participant to a game's scoreboard and announces the new row to
/// everyone already watching. Joining twice returns the existing row.
pub async fn join(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<ScoreboardRow>> {
    let mut outbox = Outbox::new();
    let row = state
        .engine
        .participant_join(request.game_id, request.user_id, request.avg, &mut outbox)
        .await?;
    state.dispatcher.dispatch(outbox).await;
    Ok(Json(row))
}

/// Removes a participant's row. Observers pick the removal up on their next
/// snapshot.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CancelRequest>,
) -> Result<StatusCode> {
    state
        .engine
        .participant_cancel(request.game_id, request.user_id)
        .await?;
    Ok(StatusCode::OK)
}

/// Finishes a game and stops score counting. Award/ceremony bookkeeping is
/// handled by the reporting layer, not here.
pub async fn stop_game(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GameStopRequest>,
) -> Result<StatusCode> {
    tracing::info!("stop requested for game {}", request.game_id);
    state.engine.stop_game(request.game_id).await?;
    Ok(StatusCode::OK)
}
