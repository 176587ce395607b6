use serde::{Deserialize, Serialize};

use crate::models::{CardDrawAssignment, ScoreboardRow, SideType};

/// One entry of a batch team-number update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamAssignment {
    pub user_id: i64,
    pub team_number: i32,
}

/// One entry of a batch grade update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeAssignment {
    pub user_id: i64,
    pub grade: i32,
}

/// Self-describing notification of one committed mutation, fanned out to
/// every observer of the game. Events are ephemeral; a lost event is
/// reconciled by the next full snapshot.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    ScoreUpdate {
        game_id: i64,
        user_id: i64,
        scores: [i32; 4],
    },
    GradeUpdate {
        game_id: i64,
        users: Vec<GradeAssignment>,
    },
    TeamUpdate {
        game_id: i64,
        users: Vec<TeamAssignment>,
    },
    SideUpdate {
        game_id: i64,
        user_id: i64,
        side_type: SideType,
        joined: bool,
    },
    ConfirmUpdate {
        game_id: i64,
        user_id: i64,
        confirmed: bool,
    },
    CountingUpdate {
        game_id: i64,
        score_counting: bool,
    },
    ParticipantJoin {
        game_id: i64,
        row: ScoreboardRow,
    },
    CardDrawStart {
        game_id: i64,
        assignment: CardDrawAssignment,
    },
    CardSelect {
        game_id: i64,
        user_id: i64,
        grade: i32,
        card_index: Option<i32>,
        team_number: i32,
    },
    CardDrawReset {
        game_id: i64,
    },
}

impl DomainEvent {
    /// The game session this event should be fanned out to.
    pub fn game_id(&self) -> i64 {
        match self {
            DomainEvent::ScoreUpdate { game_id, .. }
            | DomainEvent::GradeUpdate { game_id, .. }
            | DomainEvent::TeamUpdate { game_id, .. }
            | DomainEvent::SideUpdate { game_id, .. }
            | DomainEvent::ConfirmUpdate { game_id, .. }
            | DomainEvent::CountingUpdate { game_id, .. }
            | DomainEvent::ParticipantJoin { game_id, .. }
            | DomainEvent::CardDrawStart { game_id, .. }
            | DomainEvent::CardSelect { game_id, .. }
            | DomainEvent::CardDrawReset { game_id } => *game_id,
        }
    }
}
