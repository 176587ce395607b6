use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

use crate::error::{Error, Result};
use crate::models::{CardDrawAssignment, GameMeta, GameStatus, ScoreboardRow};
use crate::store::Store;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    Ok(PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?)
}

/// Postgres-backed store. Single-statement writes rely on Postgres row-level
/// atomicity; multi-row writes run inside an explicit transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Raw `games` row; the assignment column is JSONB and decoded separately.
#[derive(FromRow)]
struct GameMetaRow {
    id: i64,
    name: String,
    status: GameStatus,
    confirm_code: String,
    score_counting: bool,
    card_draw_active: bool,
    card_draw_assignment: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GameMetaRow {
    fn into_meta(self) -> Result<GameMeta> {
        let card_draw_assignment = self
            .card_draw_assignment
            .map(serde_json::from_value::<CardDrawAssignment>)
            .transpose()
            .map_err(|e| {
                Error::Database(sqlx::Error::Protocol(format!(
                    "invalid card draw assignment for game {}: {}",
                    self.id, e
                )))
            })?;
        Ok(GameMeta {
            id: self.id,
            name: self.name,
            status: self.status,
            confirm_code: self.confirm_code,
            score_counting: self.score_counting,
            card_draw_active: self.card_draw_active,
            card_draw_assignment,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn load_meta(&self, game_id: i64) -> Result<GameMeta> {
        let row = sqlx::query_as::<_, GameMetaRow>("SELECT * FROM games WHERE id = $1")
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::GameNotFound)?;
        row.into_meta()
    }

    async fn save_meta(&self, meta: &GameMeta) -> Result<()> {
        let assignment = meta
            .card_draw_assignment
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| {
                Error::Database(sqlx::Error::Protocol(format!(
                    "failed to serialize card draw assignment: {}",
                    e
                )))
            })?;

        sqlx::query(
            r#"
            UPDATE games
            SET status = $1,
                confirm_code = $2,
                score_counting = $3,
                card_draw_active = $4,
                card_draw_assignment = $5,
                updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(meta.status)
        .bind(&meta.confirm_code)
        .bind(meta.score_counting)
        .bind(meta.card_draw_active)
        .bind(assignment)
        .bind(meta.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_row(&self, game_id: i64, user_id: i64) -> Result<ScoreboardRow> {
        self.find_row(game_id, user_id)
            .await?
            .ok_or(Error::ScoreboardNotFound)
    }

    async fn find_row(&self, game_id: i64, user_id: i64) -> Result<Option<ScoreboardRow>> {
        Ok(sqlx::query_as::<_, ScoreboardRow>(
            "SELECT * FROM scoreboards WHERE game_id = $1 AND user_id = $2",
        )
        .bind(game_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_row(&self, row: ScoreboardRow) -> Result<ScoreboardRow> {
        Ok(sqlx::query_as::<_, ScoreboardRow>(
            r#"
            INSERT INTO scoreboards (
                game_id, user_id, score1, score2, score3, score4,
                grade, team_number, side, side_avg, confirmed, confirmed_at, avg
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(row.game_id)
        .bind(row.user_id)
        .bind(row.score1)
        .bind(row.score2)
        .bind(row.score3)
        .bind(row.score4)
        .bind(row.grade)
        .bind(row.team_number)
        .bind(row.side)
        .bind(row.side_avg)
        .bind(row.confirmed)
        .bind(row.confirmed_at)
        .bind(row.avg)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn save_row(&self, row: &ScoreboardRow) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE scoreboards
            SET score1 = $1,
                score2 = $2,
                score3 = $3,
                score4 = $4,
                grade = $5,
                team_number = $6,
                side = $7,
                side_avg = $8,
                confirmed = $9,
                confirmed_at = $10,
                updated_at = NOW()
            WHERE game_id = $11 AND user_id = $12
            "#,
        )
        .bind(row.score1)
        .bind(row.score2)
        .bind(row.score3)
        .bind(row.score4)
        .bind(row.grade)
        .bind(row.team_number)
        .bind(row.side)
        .bind(row.side_avg)
        .bind(row.confirmed)
        .bind(row.confirmed_at)
        .bind(row.game_id)
        .bind(row.user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_row(&self, game_id: i64, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM scoreboards WHERE game_id = $1 AND user_id = $2")
            .bind(game_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_rows_by_game(&self, game_id: i64) -> Result<Vec<ScoreboardRow>> {
        Ok(sqlx::query_as::<_, ScoreboardRow>(
            "SELECT * FROM scoreboards WHERE game_id = $1 ORDER BY id",
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn reset_team_numbers(&self, game_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE scoreboards SET team_number = 0, updated_at = NOW() WHERE game_id = $1")
            .bind(game_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
