use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{CardDrawAssignment, ScoreboardRow};
use crate::store::Store;

use super::card_draw::slot_index;
use super::ScoreboardEngine;

/// A slot already claimed during the card draw, keyed in the snapshot by
/// `"division-index"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedCard {
    pub user_id: i64,
    pub team_number: i32,
}

/// Full current state of a game session, built fresh from the store for each
/// (re)connecting observer.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub scoreboards: Vec<ScoreboardRow>,
    pub card_draw_started: bool,
    pub card_draw_data: Option<CardDrawAssignment>,
    pub selected_cards: Option<HashMap<String, SelectedCard>>,
}

/// Maps every row with a claimed slot to its `"division-index"` key so a
/// reconnecting client can render taken cards without racing other pickers.
pub fn selected_cards(
    rows: &[ScoreboardRow],
    assignment: &CardDrawAssignment,
) -> HashMap<String, SelectedCard> {
    let mut selected = HashMap::new();
    for row in rows.iter().filter(|r| r.team_number > 0) {
        let division = row.division();
        if let Some(index) = slot_index(assignment, division, row.team_number) {
            selected.insert(
                format!("{}-{}", division, index),
                SelectedCard {
                    user_id: row.user_id,
                    team_number: row.team_number,
                },
            );
        }
    }
    selected
}

impl<S: Store> ScoreboardEngine<S> {
    /// Assembles the full state of a game. A game with no rows yields an
    /// empty snapshot, not an error; card-draw fields are present only while
    /// a draw is active.
    pub async fn snapshot(&self, game_id: i64) -> Result<Snapshot> {
        let meta = self.store().load_meta(game_id).await?;
        let rows = self.store().list_rows_by_game(game_id).await?;

        if !meta.card_draw_active {
            return Ok(Snapshot {
                scoreboards: rows,
                card_draw_started: false,
                card_draw_data: None,
                selected_cards: None,
            });
        }

        let assignment = meta.card_draw_assignment.unwrap_or_default();
        let selected = selected_cards(&rows, &assignment);
        Ok(Snapshot {
            scoreboards: rows,
            card_draw_started: true,
            card_draw_data: Some(assignment),
            selected_cards: Some(selected),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::engine_with_game;
    use super::*;
    use crate::dispatcher::Outbox;
    use crate::events::GradeAssignment;

    #[tokio::test]
    async fn empty_game_yields_empty_snapshot() {
        let engine = engine_with_game(1, "X").await;
        let snapshot = engine.snapshot(1).await.expect("snapshot");
        assert!(snapshot.scoreboards.is_empty());
        assert!(!snapshot.card_draw_started);
        assert!(snapshot.card_draw_data.is_none());
        assert!(snapshot.selected_cards.is_none());
    }

    #[tokio::test]
    async fn snapshot_reflects_a_mutation_immediately() {
        let engine = engine_with_game(1, "X").await;
        let mut outbox = Outbox::new();
        engine
            .participant_join(1, 10, Some(170), &mut outbox)
            .await
            .expect("join");
        engine
            .score_update(1, 10, [200, 0, 150, 0], &mut outbox)
            .await
            .expect("score");

        let snapshot = engine.snapshot(1).await.expect("snapshot");
        assert_eq!(snapshot.scoreboards.len(), 1);
        assert_eq!(snapshot.scoreboards[0].scores(), [200, 0, 150, 0]);
        assert_eq!(snapshot.scoreboards[0].avg, Some(170));
    }

    #[tokio::test]
    async fn snapshot_marks_claimed_slots_during_a_draw() {
        let engine = engine_with_game(8, "X").await;
        let mut outbox = Outbox::new();
        for user_id in [10, 11, 12] {
            engine
                .participant_join(8, user_id, None, &mut outbox)
                .await
                .expect("join");
        }
        engine
            .grade_update(
                8,
                vec![
                    GradeAssignment { user_id: 10, grade: 1 },
                    GradeAssignment { user_id: 11, grade: 1 },
                    GradeAssignment { user_id: 12, grade: 2 },
                ],
                &mut outbox,
            )
            .await
            .expect("grades");

        let provided: CardDrawAssignment =
            [(1, vec![2, 1]), (2, vec![1])].into_iter().collect();
        engine
            .start_card_draw(8, Some(provided), &mut outbox)
            .await
            .expect("start");
        engine.select_card(8, 10, 2, &mut outbox).await.expect("select");

        let snapshot = engine.snapshot(8).await.expect("snapshot");
        assert!(snapshot.card_draw_started);
        let selected = snapshot.selected_cards.expect("selected map");
        // Division 1's list is [2, 1]: slot value 2 lives at index 0.
        let card = selected.get("1-0").expect("claimed slot");
        assert_eq!(card.user_id, 10);
        assert_eq!(card.team_number, 2);
        assert_eq!(selected.len(), 1);
    }

    #[tokio::test]
    async fn snapshot_assignment_is_stable_across_calls() {
        let engine = engine_with_game(8, "X").await;
        let mut outbox = Outbox::new();
        for user_id in [10, 11, 12, 13] {
            engine
                .participant_join(8, user_id, None, &mut outbox)
                .await
                .expect("join");
        }
        engine
            .start_card_draw(8, None, &mut outbox)
            .await
            .expect("start");

        let first = engine.snapshot(8).await.expect("snapshot");
        let second = engine.snapshot(8).await.expect("snapshot");
        assert_eq!(first.card_draw_data, second.card_draw_data);
    }
}
