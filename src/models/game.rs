use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Division number -> shuffled slot numbers `1..=N`, where N is the number
/// of rows in that division at draw time. Persisted once per draw and reused
/// for every resync until an explicit reset.
pub type CardDrawAssignment = BTreeMap<i32, Vec<i32>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum GameStatus {
    Active,
    Finished,
}

/// Per-game metadata owned by the scoreboard engine.
///
/// Rows in `games` are created by the club/game CRUD layer; this crate only
/// mutates the live-scoreboard fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMeta {
    pub id: i64,
    pub name: String,
    pub status: GameStatus,
    pub confirm_code: String,
    pub score_counting: bool,
    pub card_draw_active: bool,
    pub card_draw_assignment: Option<CardDrawAssignment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
