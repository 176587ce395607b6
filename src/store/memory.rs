use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::models::{GameMeta, ScoreboardRow};
use crate::store::Store;

/// In-memory store with the same atomicity guarantees as the Postgres
/// backend, used by the test suite and useful for local development without
/// a database.
#[derive(Default)]
pub struct MemoryStore {
    games: RwLock<HashMap<i64, GameMeta>>,
    rows: RwLock<HashMap<(i64, i64), ScoreboardRow>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            games: RwLock::new(HashMap::new()),
            rows: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Seeds a game row, standing in for the external game CRUD layer.
    pub async fn seed_game(&self, meta: GameMeta) {
        self.games.write().await.insert(meta.id, meta);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load_meta(&self, game_id: i64) -> Result<GameMeta> {
        self.games
            .read()
            .await
            .get(&game_id)
            .cloned()
            .ok_or(Error::GameNotFound)
    }

    async fn save_meta(&self, meta: &GameMeta) -> Result<()> {
        let mut games = self.games.write().await;
        if !games.contains_key(&meta.id) {
            return Err(Error::GameNotFound);
        }
        games.insert(meta.id, meta.clone());
        Ok(())
    }

    async fn load_row(&self, game_id: i64, user_id: i64) -> Result<ScoreboardRow> {
        self.find_row(game_id, user_id)
            .await?
            .ok_or(Error::ScoreboardNotFound)
    }

    async fn find_row(&self, game_id: i64, user_id: i64) -> Result<Option<ScoreboardRow>> {
        Ok(self.rows.read().await.get(&(game_id, user_id)).cloned())
    }

    async fn insert_row(&self, mut row: ScoreboardRow) -> Result<ScoreboardRow> {
        row.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.rows
            .write()
            .await
            .insert((row.game_id, row.user_id), row.clone());
        Ok(row)
    }

    async fn save_row(&self, row: &ScoreboardRow) -> Result<()> {
        self.rows
            .write()
            .await
            .insert((row.game_id, row.user_id), row.clone());
        Ok(())
    }

    async fn delete_row(&self, game_id: i64, user_id: i64) -> Result<()> {
        self.rows.write().await.remove(&(game_id, user_id));
        Ok(())
    }

    async fn list_rows_by_game(&self, game_id: i64) -> Result<Vec<ScoreboardRow>> {
        let mut rows: Vec<ScoreboardRow> = self
            .rows
            .read()
            .await
            .values()
            .filter(|r| r.game_id == game_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    async fn reset_team_numbers(&self, game_id: i64) -> Result<()> {
        let mut rows = self.rows.write().await;
        for row in rows.values_mut().filter(|r| r.game_id == game_id) {
            row.team_number = 0;
        }
        Ok(())
    }
}
