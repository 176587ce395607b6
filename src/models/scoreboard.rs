use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Which side-game flag a toggle targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideType {
    #[serde(rename = "grade1")]
    Grade1,
    #[serde(rename = "avg")]
    Avg,
}

/// One participant's row on a game's scoreboard. Unique per (game, user).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardRow {
    pub id: i64,
    pub game_id: i64,
    pub user_id: i64,
    pub score1: i32,
    pub score2: i32,
    pub score3: i32,
    pub score4: i32,
    pub grade: Option<i32>,
    /// 0 means unassigned; any other value came from the game's card draw.
    pub team_number: i32,
    pub side: bool,
    pub side_avg: bool,
    pub confirmed: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Historical average copied in at join time, immutable afterwards.
    pub avg: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScoreboardRow {
    /// Fresh row for a participant joining a game. The id is assigned by the
    /// store on insert.
    pub fn new(game_id: i64, user_id: i64, avg: Option<i32>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            game_id,
            user_id,
            score1: 0,
            score2: 0,
            score3: 0,
            score4: 0,
            grade: None,
            team_number: 0,
            side: false,
            side_avg: false,
            confirmed: false,
            confirmed_at: None,
            avg,
            created_at: now,
            updated_at: now,
        }
    }

    /// Division bucket used by the card draw; ungraded rows fall into 0.
    pub fn division(&self) -> i32 {
        self.grade.unwrap_or(0)
    }

    pub fn update_scores(&mut self, scores: [i32; 4]) {
        [self.score1, self.score2, self.score3, self.score4] = scores;
    }

    pub fn scores(&self) -> [i32; 4] {
        [self.score1, self.score2, self.score3, self.score4]
    }
}
