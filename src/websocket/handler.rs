use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::dispatcher::Outbox;
use crate::error::Result;
use crate::websocket::messages::{now_millis, ClientMessage, ServerMessage};
use crate::AppState;

/// WebSocket upgrade for one observer of a game session.
pub async fn handle_websocket(
    Path(game_id): Path<i64>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, game_id))
}

/// Handle individual WebSocket connection: register the channel, send the
/// initial snapshot, then pump inbound mutations until the socket closes.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, game_id: i64) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(100);

    let handle = state.registry.register(game_id, tx.clone());
    tracing::info!(
        "observer connected to game {} ({} observers)",
        game_id,
        state.registry.observer_count(game_id)
    );

    // Initial full state so the new observer starts consistent.
    match state.engine.snapshot(game_id).await {
        Ok(snapshot) => {
            let _ = tx.send(ServerMessage::from(snapshot)).await;
        }
        Err(e) => {
            tracing::warn!("failed to build snapshot for game {}: {}", game_id, e);
            let _ = tx
                .send(ServerMessage::Error {
                    message: e.to_string(),
                })
                .await;
        }
    }

    // Spawn a task to send messages to the client
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("failed to serialize message: {}", e);
                }
            }
        }
    });

    // Handle incoming messages from the client
    let state_for_recv = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => {
                        if let Err(e) = handle_client_message(client_msg, &state_for_recv, &tx).await
                        {
                            tracing::error!("error handling message for game {}: {}", game_id, e);
                            let _ = tx
                                .send(ServerMessage::Error {
                                    message: e.to_string(),
                                })
                                .await;
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to parse message: {}", e);
                        let _ = tx
                            .send(ServerMessage::Error {
                                message: format!("Invalid message format: {}", e),
                            })
                            .await;
                    }
                },
                Message::Close(_) => {
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    state.registry.unregister(&handle);
    tracing::info!("observer disconnected from game {}", game_id);
}

/// Routes one parsed client message into the engine, then drains the outbox.
/// Events reach the outbox only after their store write committed, so the
/// drain is safe even when the handler itself returned an error: anything
/// staged describes a durable mutation.
async fn handle_client_message(
    msg: ClientMessage,
    state: &AppState,
    tx: &mpsc::Sender<ServerMessage>,
) -> Result<()> {
    let mut outbox = Outbox::new();
    let result = match msg {
        ClientMessage::UpdateScore {
            game_id,
            user_id,
            score,
        } => {
            state
                .engine
                .score_update(game_id, user_id, score.coerced(), &mut outbox)
                .await
        }
        ClientMessage::UpdateGrade { game_id, users } => {
            state.engine.grade_update(game_id, users, &mut outbox).await
        }
        ClientMessage::UpdateTeam { game_id, users } => {
            state.engine.team_update(game_id, users, &mut outbox).await
        }
        ClientMessage::UpdateSide {
            game_id,
            user_id,
            side_type,
        } => {
            state
                .engine
                .side_toggle(game_id, user_id, side_type, &mut outbox)
                .await
        }
        ClientMessage::UpdateConfirm {
            game_id,
            user_id,
            code,
        } => {
            state
                .engine
                .join_confirm(game_id, user_id, &code, &mut outbox)
                .await
        }
        ClientMessage::UpdateScoreCounting {
            game_id,
            user_id,
            score_counting,
        } => {
            state
                .engine
                .score_counting(game_id, user_id, score_counting, &mut outbox)
                .await
        }
        ClientMessage::RequestInitialData { game_id } => {
            // Resync request: rebroadcast the current full state to every
            // observer of the game.
            let snapshot = state.engine.snapshot(game_id).await?;
            state
                .registry
                .broadcast(game_id, ServerMessage::from(snapshot))
                .await;
            return Ok(());
        }
        ClientMessage::StartCardDraw {
            game_id,
            card_draw_data,
        } => {
            state
                .engine
                .start_card_draw(game_id, card_draw_data, &mut outbox)
                .await
        }
        ClientMessage::SelectCard {
            game_id,
            user_id,
            team_number,
        } => {
            state
                .engine
                .select_card(game_id, user_id, team_number, &mut outbox)
                .await
        }
        ClientMessage::ResetCardDraw { game_id } => {
            state.engine.reset_card_draw(game_id, &mut outbox).await
        }
        ClientMessage::Ping => {
            let _ = tx
                .send(ServerMessage::Pong {
                    timestamp: now_millis(),
                })
                .await;
            return Ok(());
        }
    };

    state.dispatcher.dispatch(outbox).await;
    result
}
