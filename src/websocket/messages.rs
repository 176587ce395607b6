use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::engine::snapshot::{SelectedCard, Snapshot};
use crate::events::{DomainEvent, GradeAssignment, TeamAssignment};
use crate::models::{CardDrawAssignment, ScoreboardRow, SideType};

/// Millisecond timestamp stamped onto outbound notifications.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// The four per-game scores of a score update. Missing or null values are
/// deliberately coerced to 0: the update replaces the whole row, it does not
/// patch it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorePayload {
    pub game1_score: Option<i32>,
    pub game2_score: Option<i32>,
    pub game3_score: Option<i32>,
    pub game4_score: Option<i32>,
}

impl ScorePayload {
    pub fn coerced(&self) -> [i32; 4] {
        [
            self.game1_score.unwrap_or(0),
            self.game2_score.unwrap_or(0),
            self.game3_score.unwrap_or(0),
            self.game4_score.unwrap_or(0),
        ]
    }
}

/// Messages sent from client to server, tagged by `action`. The closed enum
/// makes an unrecognized action a parse error instead of a silent no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    UpdateScore {
        game_id: i64,
        user_id: i64,
        score: ScorePayload,
    },
    UpdateGrade {
        game_id: i64,
        users: Vec<GradeAssignment>,
    },
    UpdateTeam {
        game_id: i64,
        users: Vec<TeamAssignment>,
    },
    UpdateSide {
        game_id: i64,
        user_id: i64,
        side_type: SideType,
    },
    UpdateConfirm {
        game_id: i64,
        user_id: i64,
        code: String,
    },
    UpdateScoreCounting {
        game_id: i64,
        user_id: i64,
        score_counting: bool,
    },
    RequestInitialData {
        game_id: i64,
    },
    StartCardDraw {
        game_id: i64,
        #[serde(default)]
        card_draw_data: Option<CardDrawAssignment>,
    },
    SelectCard {
        game_id: i64,
        user_id: i64,
        team_number: i32,
    },
    ResetCardDraw {
        game_id: i64,
    },
    Ping,
}

/// Messages sent from server to client, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    InitialData {
        scoreboards: Vec<ScoreboardRow>,
        card_draw_started: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        card_draw_data: Option<CardDrawAssignment>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selected_cards: Option<HashMap<String, SelectedCard>>,
    },
    ScoreUpdated {
        game_id: i64,
        user_id: i64,
        score1: i32,
        score2: i32,
        score3: i32,
        score4: i32,
    },
    BatchGradeUpdate {
        game_id: i64,
        updates: Vec<GradeAssignment>,
        count: usize,
        timestamp: i64,
    },
    BatchTeamNumberUpdate {
        game_id: i64,
        updates: Vec<TeamAssignment>,
        count: usize,
        timestamp: i64,
    },
    SideUpdated {
        game_id: i64,
        user_id: i64,
        side_type: SideType,
        joined: bool,
    },
    ConfirmedUpdated {
        game_id: i64,
        user_id: i64,
        confirmed: bool,
    },
    ScoreCountingUpdated {
        game_id: i64,
        score_counting: bool,
    },
    NewParticipantJoin {
        game_id: i64,
        new_participant: ScoreboardRow,
        timestamp: i64,
    },
    CardDrawStart {
        game_id: i64,
        card_data: CardDrawAssignment,
        timestamp: i64,
    },
    CardSelected {
        game_id: i64,
        user_id: i64,
        grade: i32,
        card_index: Option<i32>,
        team_number: i32,
        timestamp: i64,
    },
    CardDrawReset {
        game_id: i64,
        timestamp: i64,
    },
    Pong {
        timestamp: i64,
    },
    Error {
        message: String,
    },
}

impl From<Snapshot> for ServerMessage {
    fn from(snapshot: Snapshot) -> Self {
        ServerMessage::InitialData {
            scoreboards: snapshot.scoreboards,
            card_draw_started: snapshot.card_draw_started,
            card_draw_data: snapshot.card_draw_data,
            selected_cards: snapshot.selected_cards,
        }
    }
}

impl From<DomainEvent> for ServerMessage {
    fn from(event: DomainEvent) -> Self {
        match event {
            DomainEvent::ScoreUpdate {
                game_id,
                user_id,
                scores,
            } => ServerMessage::ScoreUpdated {
                game_id,
                user_id,
                score1: scores[0],
                score2: scores[1],
                score3: scores[2],
                score4: scores[3],
            },
            DomainEvent::GradeUpdate { game_id, users } => ServerMessage::BatchGradeUpdate {
                game_id,
                count: users.len(),
                updates: users,
                timestamp: now_millis(),
            },
            DomainEvent::TeamUpdate { game_id, users } => ServerMessage::BatchTeamNumberUpdate {
                game_id,
                count: users.len(),
                updates: users,
                timestamp: now_millis(),
            },
            DomainEvent::SideUpdate {
                game_id,
                user_id,
                side_type,
                joined,
            } => ServerMessage::SideUpdated {
                game_id,
                user_id,
                side_type,
                joined,
            },
            DomainEvent::ConfirmUpdate {
                game_id,
                user_id,
                confirmed,
            } => ServerMessage::ConfirmedUpdated {
                game_id,
                user_id,
                confirmed,
            },
            DomainEvent::CountingUpdate {
                game_id,
                score_counting,
            } => ServerMessage::ScoreCountingUpdated {
                game_id,
                score_counting,
            },
            DomainEvent::ParticipantJoin { game_id, row } => ServerMessage::NewParticipantJoin {
                game_id,
                new_participant: row,
                timestamp: now_millis(),
            },
            DomainEvent::CardDrawStart {
                game_id,
                assignment,
            } => ServerMessage::CardDrawStart {
                game_id,
                card_data: assignment,
                timestamp: now_millis(),
            },
            DomainEvent::CardSelect {
                game_id,
                user_id,
                grade,
                card_index,
                team_number,
            } => ServerMessage::CardSelected {
                game_id,
                user_id,
                grade,
                card_index,
                team_number,
                timestamp: now_millis(),
            },
            DomainEvent::CardDrawReset { game_id } => ServerMessage::CardDrawReset {
                game_id,
                timestamp: now_millis(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_score_parses_with_null_scores() {
        let raw = r#"{
            "action": "updateScore",
            "gameId": 7,
            "userId": 42,
            "score": {"game1Score": 180, "game2Score": null, "game3Score": 220, "game4Score": null}
        }"#;
        let msg: ClientMessage = serde_json::from_str(raw).expect("valid message");
        match msg {
            ClientMessage::UpdateScore {
                game_id,
                user_id,
                score,
            } => {
                assert_eq!(game_id, 7);
                assert_eq!(user_id, 42);
                assert_eq!(score.coerced(), [180, 0, 220, 0]);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn unknown_action_is_a_parse_error() {
        let raw = r#"{"action": "dropTables", "gameId": 1}"#;
        assert!(serde_json::from_str::<ClientMessage>(raw).is_err());
    }

    #[test]
    fn side_type_uses_wire_names() {
        let raw = r#"{"action": "updateSide", "gameId": 1, "userId": 2, "sideType": "avg"}"#;
        let msg: ClientMessage = serde_json::from_str(raw).expect("valid message");
        assert!(matches!(
            msg,
            ClientMessage::UpdateSide {
                side_type: SideType::Avg,
                ..
            }
        ));
    }

    #[test]
    fn server_messages_are_tagged_by_type() {
        let msg = ServerMessage::ScoreCountingUpdated {
            game_id: 3,
            score_counting: false,
        };
        let json = serde_json::to_value(&msg).expect("serializable");
        assert_eq!(json["type"], "scoreCountingUpdated");
        assert_eq!(json["gameId"], 3);
        assert_eq!(json["scoreCounting"], false);
    }

    #[test]
    fn initial_data_omits_card_draw_fields_when_inactive() {
        let msg = ServerMessage::InitialData {
            scoreboards: Vec::new(),
            card_draw_started: false,
            card_draw_data: None,
            selected_cards: None,
        };
        let json = serde_json::to_value(&msg).expect("serializable");
        assert_eq!(json["type"], "initialData");
        assert!(json.get("cardDrawData").is_none());
        assert!(json.get("selectedCards").is_none());
    }
}
