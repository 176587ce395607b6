pub mod card_draw;
pub mod snapshot;

use chrono::Utc;

use crate::dispatcher::Outbox;
use crate::error::{Error, Result};
use crate::events::{DomainEvent, GradeAssignment, TeamAssignment};
use crate::models::{GameStatus, ScoreboardRow, SideType};
use crate::store::Store;

/// Applies inbound mutations to the store and stages domain events for
/// post-commit fan-out. Each handler loads the target row/meta, applies a
/// pure transition, persists, and stages exactly one event; an event is
/// staged only after its write committed.
pub struct ScoreboardEngine<S> {
    store: S,
}

impl<S: Store> ScoreboardEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replaces all four scores of a row. Null inputs become 0.
    pub async fn score_update(
        &self,
        game_id: i64,
        user_id: i64,
        scores: [i32; 4],
        outbox: &mut Outbox,
    ) -> Result<()> {
        self.store.load_meta(game_id).await?;
        let mut row = self.store.load_row(game_id, user_id).await?;
        row.update_scores(scores);
        self.store.save_row(&row).await?;
        outbox.stage(DomainEvent::ScoreUpdate {
            game_id,
            user_id,
            scores,
        });
        Ok(())
    }

    /// Batch grade update. Pairs are applied independently; a missing row
    /// skips that pair without aborting the rest.
    pub async fn grade_update(
        &self,
        game_id: i64,
        users: Vec<GradeAssignment>,
        outbox: &mut Outbox,
    ) -> Result<()> {
        self.store.load_meta(game_id).await?;
        for user in &users {
            if let Some(mut row) = self.store.find_row(game_id, user.user_id).await? {
                row.grade = Some(user.grade);
                self.store.save_row(&row).await?;
            }
        }
        outbox.stage(DomainEvent::GradeUpdate { game_id, users });
        Ok(())
    }

    /// Batch team-number update with the same partial-success semantics as
    /// `grade_update`. Slot values are trusted as sent.
    pub async fn team_update(
        &self,
        game_id: i64,
        users: Vec<TeamAssignment>,
        outbox: &mut Outbox,
    ) -> Result<()> {
        self.store.load_meta(game_id).await?;
        for user in &users {
            if let Some(mut row) = self.store.find_row(game_id, user.user_id).await? {
                row.team_number = user.team_number;
                self.store.save_row(&row).await?;
                tracing::debug!(
                    "team number updated: game={} user={} -> {}",
                    game_id,
                    user.user_id,
                    user.team_number
                );
            }
        }
        outbox.stage(DomainEvent::TeamUpdate { game_id, users });
        Ok(())
    }

    /// Flips the side flag selected by `side_type`. A missing row is quietly
    /// ignored; the event carries the post-toggle value.
    pub async fn side_toggle(
        &self,
        game_id: i64,
        user_id: i64,
        side_type: SideType,
        outbox: &mut Outbox,
    ) -> Result<()> {
        self.store.load_meta(game_id).await?;
        let Some(mut row) = self.store.find_row(game_id, user_id).await? else {
            return Ok(());
        };
        let joined = match side_type {
            SideType::Grade1 => {
                row.side = !row.side;
                row.side
            }
            SideType::Avg => {
                row.side_avg = !row.side_avg;
                row.side_avg
            }
        };
        self.store.save_row(&row).await?;
        outbox.stage(DomainEvent::SideUpdate {
            game_id,
            user_id,
            side_type,
            joined,
        });
        Ok(())
    }

    /// Confirms attendance iff the supplied code equals the game's confirm
    /// code. On mismatch nothing is mutated and `InvalidCode` is surfaced to
    /// the sender only.
    pub async fn join_confirm(
        &self,
        game_id: i64,
        user_id: i64,
        code: &str,
        outbox: &mut Outbox,
    ) -> Result<()> {
        let meta = self.store.load_meta(game_id).await?;
        let mut row = self.store.load_row(game_id, user_id).await?;

        if meta.confirm_code != code {
            return Err(Error::InvalidCode);
        }

        row.confirmed = true;
        row.confirmed_at = Some(Utc::now());
        self.store.save_row(&row).await?;
        outbox.stage(DomainEvent::ConfirmUpdate {
            game_id,
            user_id,
            confirmed: true,
        });
        Ok(())
    }

    /// Toggles whether aggregate scoring is live. Requests from users without
    /// a row in the game are silently ignored: the toggle arrives frequently
    /// from stale clients and availability wins over strictness here.
    pub async fn score_counting(
        &self,
        game_id: i64,
        user_id: i64,
        counting: bool,
        outbox: &mut Outbox,
    ) -> Result<()> {
        let mut meta = self.store.load_meta(game_id).await?;
        let rows = self.store.list_rows_by_game(game_id).await?;
        if !rows.iter().any(|r| r.user_id == user_id) {
            tracing::debug!(
                "ignoring score counting toggle from non-participant {} in game {}",
                user_id,
                game_id
            );
            return Ok(());
        }

        meta.score_counting = counting;
        self.store.save_meta(&meta).await?;
        outbox.stage(DomainEvent::CountingUpdate {
            game_id,
            score_counting: counting,
        });
        Ok(())
    }

    /// Creates the scoreboard row for a newly joined participant, copying in
    /// their historical average. Joining twice is replay-safe: the existing
    /// row is returned untouched and no event is staged.
    pub async fn participant_join(
        &self,
        game_id: i64,
        user_id: i64,
        avg: Option<i32>,
        outbox: &mut Outbox,
    ) -> Result<ScoreboardRow> {
        self.store.load_meta(game_id).await?;
        if let Some(existing) = self.store.find_row(game_id, user_id).await? {
            return Ok(existing);
        }

        let row = self
            .store
            .insert_row(ScoreboardRow::new(game_id, user_id, avg))
            .await?;
        outbox.stage(DomainEvent::ParticipantJoin {
            game_id,
            row: row.clone(),
        });
        Ok(row)
    }

    /// Removes a participant's row. Observers reconcile via the next
    /// snapshot, so no event is emitted.
    pub async fn participant_cancel(&self, game_id: i64, user_id: i64) -> Result<()> {
        self.store.load_row(game_id, user_id).await?;
        self.store.delete_row(game_id, user_id).await
    }

    /// Finishes a game: status becomes FINISHED and score counting stops.
    pub async fn stop_game(&self, game_id: i64) -> Result<()> {
        let mut meta = self.store.load_meta(game_id).await?;
        meta.status = GameStatus::Finished;
        meta.score_counting = false;
        self.store.save_meta(&meta).await?;
        tracing::info!("game {} finished", game_id);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;

    use crate::models::{GameMeta, GameStatus};
    use crate::store::MemoryStore;

    use super::ScoreboardEngine;

    pub fn game_meta(game_id: i64, confirm_code: &str) -> GameMeta {
        let now = Utc::now();
        GameMeta {
            id: game_id,
            name: format!("game {}", game_id),
            status: GameStatus::Active,
            confirm_code: confirm_code.to_string(),
            score_counting: true,
            card_draw_active: false,
            card_draw_assignment: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Engine over a memory store seeded with one active game.
    pub async fn engine_with_game(
        game_id: i64,
        confirm_code: &str,
    ) -> ScoreboardEngine<MemoryStore> {
        let store = MemoryStore::new();
        store.seed_game(game_meta(game_id, confirm_code)).await;
        ScoreboardEngine::new(store)
    }
}
