use std::collections::BTreeMap;

use rand::seq::SliceRandom;

use crate::dispatcher::Outbox;
use crate::error::Result;
use crate::events::DomainEvent;
use crate::models::{CardDrawAssignment, ScoreboardRow};
use crate::store::Store;

use super::ScoreboardEngine;

/// Uniformly random permutation of slots `1..=N` for each division, where N
/// is the division's row count. Slot numbers are 1-based and dense; 0 stays
/// reserved as the unassigned sentinel.
pub fn generate_assignment(rows: &[ScoreboardRow]) -> CardDrawAssignment {
    let mut divisions: BTreeMap<i32, i32> = BTreeMap::new();
    for row in rows {
        *divisions.entry(row.division()).or_default() += 1;
    }

    let mut rng = rand::rng();
    divisions
        .into_iter()
        .map(|(division, count)| {
            let mut slots: Vec<i32> = (1..=count).collect();
            slots.shuffle(&mut rng);
            (division, slots)
        })
        .collect()
}

/// Index of a claimed team number within its division's shuffled slot list.
pub fn slot_index(
    assignment: &CardDrawAssignment,
    division: i32,
    team_number: i32,
) -> Option<i32> {
    assignment
        .get(&division)
        .and_then(|slots| slots.iter().position(|s| *s == team_number))
        .map(|i| i as i32)
}

impl<S: Store> ScoreboardEngine<S> {
    /// Starts (or resumes) a card draw. An already-active draw reuses its
    /// persisted assignment so every reconnecting observer sees the same
    /// shuffle; a caller-provided assignment is trusted as-is; otherwise one
    /// is generated from the current rows.
    pub async fn start_card_draw(
        &self,
        game_id: i64,
        provided: Option<CardDrawAssignment>,
        outbox: &mut Outbox,
    ) -> Result<()> {
        let mut meta = self.store().load_meta(game_id).await?;

        if meta.card_draw_active {
            if let Some(existing) = meta.card_draw_assignment.clone() {
                tracing::debug!("card draw already active for game {}, reusing", game_id);
                outbox.stage(DomainEvent::CardDrawStart {
                    game_id,
                    assignment: existing,
                });
                return Ok(());
            }
        }

        let assignment = match provided {
            Some(assignment) => assignment,
            None => {
                let rows = self.store().list_rows_by_game(game_id).await?;
                generate_assignment(&rows)
            }
        };

        meta.card_draw_active = true;
        meta.card_draw_assignment = Some(assignment.clone());
        self.store().save_meta(&meta).await?;
        tracing::info!("card draw started for game {}", game_id);

        outbox.stage(DomainEvent::CardDrawStart {
            game_id,
            assignment,
        });
        Ok(())
    }

    /// Records a user's card pick. The chosen slot value is trusted as sent;
    /// the event additionally carries the division and the slot's index in
    /// that division's list so observers can mark it taken.
    pub async fn select_card(
        &self,
        game_id: i64,
        user_id: i64,
        team_number: i32,
        outbox: &mut Outbox,
    ) -> Result<()> {
        let meta = self.store().load_meta(game_id).await?;
        let mut row = self.store().load_row(game_id, user_id).await?;

        row.team_number = team_number;
        self.store().save_row(&row).await?;

        let grade = row.division();
        let card_index = meta
            .card_draw_assignment
            .as_ref()
            .and_then(|assignment| slot_index(assignment, grade, team_number));

        outbox.stage(DomainEvent::CardSelect {
            game_id,
            user_id,
            grade,
            card_index,
            team_number,
        });
        Ok(())
    }

    /// Clears the draw: every row back to unassigned, assignment dropped,
    /// draw deactivated.
    pub async fn reset_card_draw(&self, game_id: i64, outbox: &mut Outbox) -> Result<()> {
        let mut meta = self.store().load_meta(game_id).await?;
        self.store().reset_team_numbers(game_id).await?;

        meta.card_draw_active = false;
        meta.card_draw_assignment = None;
        self.store().save_meta(&meta).await?;
        tracing::info!("card draw reset for game {}", game_id);

        outbox.stage(DomainEvent::CardDrawReset { game_id });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::engine_with_game;
    use super::*;
    use crate::events::GradeAssignment;

    /// Seeds the game with rows split across divisions {1: 2 rows, 2: 1 row}.
    async fn seed_three_rows(engine: &ScoreboardEngine<crate::store::MemoryStore>, game_id: i64) {
        let mut outbox = Outbox::new();
        for user_id in [10, 11, 12] {
            engine
                .participant_join(game_id, user_id, None, &mut outbox)
                .await
                .expect("join");
        }
        engine
            .grade_update(
                game_id,
                vec![
                    GradeAssignment { user_id: 10, grade: 1 },
                    GradeAssignment { user_id: 11, grade: 1 },
                    GradeAssignment { user_id: 12, grade: 2 },
                ],
                &mut outbox,
            )
            .await
            .expect("grades");
    }

    fn sorted(mut v: Vec<i32>) -> Vec<i32> {
        v.sort_unstable();
        v
    }

    #[test]
    fn assignment_is_a_permutation_per_division() {
        let mut rows = Vec::new();
        for (user_id, grade) in [(1, 1), (2, 1), (3, 1), (4, 2), (5, 0)] {
            let mut row = ScoreboardRow::new(9, user_id, None);
            row.grade = (grade > 0).then_some(grade);
            rows.push(row);
        }

        let assignment = generate_assignment(&rows);
        assert_eq!(sorted(assignment[&1].clone()), vec![1, 2, 3]);
        assert_eq!(assignment[&2], vec![1]);
        assert_eq!(assignment[&0], vec![1], "ungraded rows bucket under 0");
    }

    #[tokio::test]
    async fn start_persists_assignment_and_activates() {
        let engine = engine_with_game(8, "X").await;
        seed_three_rows(&engine, 8).await;

        let mut outbox = Outbox::new();
        engine
            .start_card_draw(8, None, &mut outbox)
            .await
            .expect("start");

        let meta = engine.store().load_meta(8).await.unwrap();
        assert!(meta.card_draw_active);
        let assignment = meta.card_draw_assignment.expect("persisted");
        assert_eq!(sorted(assignment[&1].clone()), vec![1, 2]);
        assert_eq!(assignment[&2], vec![1]);
        assert_eq!(outbox.len(), 1);
    }

    #[tokio::test]
    async fn second_start_reuses_the_persisted_assignment() {
        let engine = engine_with_game(8, "X").await;
        seed_three_rows(&engine, 8).await;

        let mut outbox = Outbox::new();
        engine
            .start_card_draw(8, None, &mut outbox)
            .await
            .expect("first start");
        let first = engine
            .store()
            .load_meta(8)
            .await
            .unwrap()
            .card_draw_assignment
            .expect("assignment");

        engine
            .start_card_draw(8, None, &mut outbox)
            .await
            .expect("second start");
        let second = engine
            .store()
            .load_meta(8)
            .await
            .unwrap()
            .card_draw_assignment
            .expect("assignment");

        assert_eq!(first, second, "no regeneration while active");

        // Both starts still announce the draw so late joiners catch up.
        let events = outbox.into_events();
        assert_eq!(events.len(), 2);
        for event in events {
            match event {
                DomainEvent::CardDrawStart { assignment, .. } => assert_eq!(assignment, first),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn caller_provided_assignment_is_used_verbatim() {
        let engine = engine_with_game(8, "X").await;
        seed_three_rows(&engine, 8).await;

        let provided: CardDrawAssignment =
            [(1, vec![2, 1]), (2, vec![1])].into_iter().collect();
        let mut outbox = Outbox::new();
        engine
            .start_card_draw(8, Some(provided.clone()), &mut outbox)
            .await
            .expect("start");

        let meta = engine.store().load_meta(8).await.unwrap();
        assert_eq!(meta.card_draw_assignment, Some(provided));
    }

    #[tokio::test]
    async fn select_sets_team_number_and_reports_slot_index() {
        let engine = engine_with_game(8, "X").await;
        seed_three_rows(&engine, 8).await;

        let provided: CardDrawAssignment =
            [(1, vec![2, 1]), (2, vec![1])].into_iter().collect();
        let mut outbox = Outbox::new();
        engine
            .start_card_draw(8, Some(provided), &mut outbox)
            .await
            .expect("start");

        let mut outbox = Outbox::new();
        engine
            .select_card(8, 10, 2, &mut outbox)
            .await
            .expect("select");

        let row = engine.store().load_row(8, 10).await.unwrap();
        assert_eq!(row.team_number, 2);

        let events = outbox.into_events();
        match &events[0] {
            DomainEvent::CardSelect {
                user_id,
                grade,
                card_index,
                team_number,
                ..
            } => {
                assert_eq!(*user_id, 10);
                assert_eq!(*grade, 1);
                // In division 1 the list is [2, 1]; slot value 2 sits at index 0.
                assert_eq!(*card_index, Some(0));
                assert_eq!(*team_number, 2);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn reset_clears_assignment_and_team_numbers() {
        let engine = engine_with_game(8, "X").await;
        seed_three_rows(&engine, 8).await;

        let mut outbox = Outbox::new();
        engine
            .start_card_draw(8, None, &mut outbox)
            .await
            .expect("start");
        engine.select_card(8, 10, 1, &mut outbox).await.expect("select");

        engine.reset_card_draw(8, &mut outbox).await.expect("reset");

        let meta = engine.store().load_meta(8).await.unwrap();
        assert!(!meta.card_draw_active);
        assert!(meta.card_draw_assignment.is_none());
        for row in engine.store().list_rows_by_game(8).await.unwrap() {
            assert_eq!(row.team_number, 0);
        }
    }

    #[tokio::test]
    async fn start_after_reset_generates_a_fresh_assignment() {
        let engine = engine_with_game(8, "X").await;
        seed_three_rows(&engine, 8).await;

        let mut outbox = Outbox::new();
        engine
            .start_card_draw(8, None, &mut outbox)
            .await
            .expect("start");
        engine.reset_card_draw(8, &mut outbox).await.expect("reset");
        engine
            .start_card_draw(8, None, &mut outbox)
            .await
            .expect("restart");

        let meta = engine.store().load_meta(8).await.unwrap();
        let assignment = meta.card_draw_assignment.expect("regenerated");
        assert_eq!(sorted(assignment[&1].clone()), vec![1, 2]);
    }
}
