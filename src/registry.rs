use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::websocket::messages::ServerMessage;

/// Identifies one registered observer channel. Returned by
/// [`SessionRegistry::register`] and consumed by `unregister`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelHandle {
    game_id: i64,
    channel_id: Uuid,
}

/// Fan-out address book for one game. Created on first register, destroyed
/// when the last channel leaves. Holds no authoritative state.
struct GameSession {
    channels: DashMap<Uuid, mpsc::Sender<ServerMessage>>,
    /// Serializes broadcasts for this game so events leave in publish order.
    send_lock: Mutex<()>,
}

impl GameSession {
    fn new() -> Self {
        Self {
            channels: DashMap::new(),
            send_lock: Mutex::new(()),
        }
    }
}

/// In-memory mapping from game id to the currently connected observer
/// channels. Safe for concurrent register/unregister/broadcast.
#[derive(Default)]
pub struct SessionRegistry {
    games: DashMap<i64, Arc<GameSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer channel under a game and hands back its handle.
    /// Each call registers a distinct channel; a connection registers exactly
    /// once and keeps the handle for its `unregister`.
    pub fn register(&self, game_id: i64, tx: mpsc::Sender<ServerMessage>) -> ChannelHandle {
        let channel_id = Uuid::new_v4();
        // The insert happens while the entry guard is held: a concurrent
        // unregister of the last channel cannot tear the session down between
        // the lookup and the insert.
        self.games
            .entry(game_id)
            .or_insert_with(|| Arc::new(GameSession::new()))
            .channels
            .insert(channel_id, tx);
        ChannelHandle {
            game_id,
            channel_id,
        }
    }

    /// Removes the channel; tears the session down when it was the last one.
    pub fn unregister(&self, handle: &ChannelHandle) {
        if let Some(session) = self.games.get(&handle.game_id) {
            session.channels.remove(&handle.channel_id);
            let empty = session.channels.is_empty();
            drop(session);
            if empty {
                self.games
                    .remove_if(&handle.game_id, |_, s| s.channels.is_empty());
            }
        }
    }

    /// Best-effort fan-out of one message to every observer of the game.
    /// A channel that refuses delivery is logged and evicted; it will
    /// resynchronize through a fresh connect.
    pub async fn broadcast(&self, game_id: i64, message: ServerMessage) {
        let Some(session) = self.games.get(&game_id).map(|s| Arc::clone(s.value())) else {
            return;
        };

        let _guard = session.send_lock.lock().await;
        let mut dead = Vec::new();
        for entry in session.channels.iter() {
            if entry.value().try_send(message.clone()).is_err() {
                dead.push(*entry.key());
            }
        }
        for channel_id in dead {
            session.channels.remove(&channel_id);
            tracing::warn!(
                "dropping unresponsive observer channel {} for game {}",
                channel_id,
                game_id
            );
        }
    }

    /// Number of channels currently registered under a game.
    pub fn observer_count(&self, game_id: i64) -> usize {
        self.games
            .get(&game_id)
            .map(|s| s.channels.len())
            .unwrap_or(0)
    }
}
