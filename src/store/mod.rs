use async_trait::async_trait;

use crate::error::Result;
use crate::models::{GameMeta, ScoreboardRow};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{create_pool, PgStore};

/// Durable Store collaborator: transactional reads/writes of scoreboard rows
/// and per-game metadata. Every method commits (or fails) atomically; the
/// engine layers no locking of its own on top.
#[async_trait]
pub trait Store: Send + Sync {
    /// Loads a game's metadata, or `GameNotFound`.
    async fn load_meta(&self, game_id: i64) -> Result<GameMeta>;

    /// Persists the mutable metadata fields of an existing game.
    async fn save_meta(&self, meta: &GameMeta) -> Result<()>;

    /// Loads the row for `(game_id, user_id)`, or `ScoreboardNotFound`.
    async fn load_row(&self, game_id: i64, user_id: i64) -> Result<ScoreboardRow>;

    /// Like `load_row` but absence is not an error. Batch handlers use this
    /// so one missing row does not abort the rest of the batch.
    async fn find_row(&self, game_id: i64, user_id: i64) -> Result<Option<ScoreboardRow>>;

    /// Inserts a freshly joined participant's row and returns it with its
    /// store-assigned id.
    async fn insert_row(&self, row: ScoreboardRow) -> Result<ScoreboardRow>;

    /// Persists the mutable fields of an existing row.
    async fn save_row(&self, row: &ScoreboardRow) -> Result<()>;

    /// Deletes the row for `(game_id, user_id)`.
    async fn delete_row(&self, game_id: i64, user_id: i64) -> Result<()>;

    /// All rows of a game, in insertion order.
    async fn list_rows_by_game(&self, game_id: i64) -> Result<Vec<ScoreboardRow>>;

    /// Sets every row's team number back to the unassigned sentinel, in one
    /// transaction.
    async fn reset_team_numbers(&self, game_id: i64) -> Result<()>;
}
