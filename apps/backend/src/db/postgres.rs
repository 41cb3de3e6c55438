//! PostgreSQL store

use std::collections::HashSet;

use async_trait::async_trait;
use invin_core::{Category, Playable, ProgressRecord, SampleFilter, User, UserStats};
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool, Postgres, Transaction};

use super::{Store, StoreError, StoreResult};
use crate::models::{DbCategory, DbPlayable, DbProgress, DbUser, Session};

const USER_COLUMNS: &str = "user_id, email, name, picture, total_played, correct_answers, \
     current_streak, best_streak, skipped, selected_categories, onboarding_complete, created_at";

const PLAYABLE_COLUMNS: &str = "playable_id, category, title, difficulty, content, created_at";

/// Store backed by a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Share-lock the category row for the rest of `tx`. A concurrent
/// `delete_category` either waits for the commit or has already removed it.
async fn lock_category(tx: &mut Transaction<'_, Postgres>, name: &str) -> StoreResult<()> {
    let found: Option<String> =
        sqlx::query_scalar("SELECT name FROM categories WHERE LOWER(name) = LOWER($1) FOR SHARE")
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(StoreError::UnknownCategory(name.to_string())),
    }
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[async_trait]
impl Store for PgStore {
    // === Users ===

    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DbUser::into_user).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DbUser::into_user).transpose()
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, email, name, picture, total_played, correct_answers,
                               current_streak, best_streak, skipped, selected_categories,
                               onboarding_complete, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.picture)
        .bind(to_i32(user.stats.total_played))
        .bind(to_i32(user.stats.correct_answers))
        .bind(to_i32(user.stats.current_streak))
        .bind(to_i32(user.stats.best_streak))
        .bind(to_i32(user.stats.skipped))
        .bind(&user.selected_categories)
        .bind(user.onboarding_complete)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_selected_categories(
        &self,
        user_id: &str,
        categories: &[String],
    ) -> StoreResult<User> {
        let row = sqlx::query_as::<_, DbUser>(&format!(
            r#"
            UPDATE users
            SET selected_categories = $2, onboarding_complete = TRUE
            WHERE user_id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(categories)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))?;

        row.into_user()
    }

    async fn reset_progress(&self, user_id: &str) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET total_played = 0, correct_answers = 0, current_streak = 0,
                best_streak = 0, skipped = 0
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {user_id}")));
        }

        let deleted = sqlx::query("DELETE FROM user_progress WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted.rows_affected())
    }

    // === Sessions ===

    async fn insert_session(&self, session: &Session) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_sessions (token_hash, user_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&session.token_hash)
        .bind(&session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT token_hash, user_id, expires_at, created_at
            FROM user_sessions
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn delete_session(&self, token_hash: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // === Categories ===

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, DbCategory>(
            r#"
            SELECT c.name, c.icon, c.color, COUNT(p.playable_id) AS playable_count
            FROM categories c
            LEFT JOIN playables p ON LOWER(p.category) = LOWER(c.name)
            GROUP BY c.name, c.icon, c.color
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DbCategory::into_category).collect())
    }

    async fn get_category(&self, name: &str) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, DbCategory>(
            r#"
            SELECT c.name, c.icon, c.color, COUNT(p.playable_id) AS playable_count
            FROM categories c
            LEFT JOIN playables p ON LOWER(p.category) = LOWER(c.name)
            WHERE LOWER(c.name) = LOWER($1)
            GROUP BY c.name, c.icon, c.color
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(DbCategory::into_category))
    }

    async fn count_playables_in_category(&self, name: &str) -> StoreResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM playables WHERE LOWER(category) = LOWER($1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.max(0) as u64)
    }

    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        sqlx::query("INSERT INTO categories (name, icon, color) VALUES ($1, $2, $3)")
            .bind(&category.name)
            .bind(&category.icon)
            .bind(&category.color)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_category(&self, name: &str, category: &Category) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = $2, icon = $3, color = $4
            WHERE LOWER(name) = LOWER($1)
            "#,
        )
        .bind(name)
        .bind(&category.name)
        .bind(&category.icon)
        .bind(&category.color)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("category {name}")));
        }
        Ok(())
    }

    async fn delete_category(&self, name: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        // Conflicts with the FOR SHARE lock taken by playable writes
        let locked: Option<String> =
            sqlx::query_scalar("SELECT name FROM categories WHERE LOWER(name) = LOWER($1) FOR UPDATE")
                .bind(name)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(StoreError::NotFound(format!("category {name}")));
        }

        let in_use: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM playables WHERE LOWER(category) = LOWER($1)")
                .bind(name)
                .fetch_one(&mut *tx)
                .await?;
        if in_use > 0 {
            return Err(StoreError::Conflict(format!(
                "category {name} is used by {in_use} playables"
            )));
        }

        sqlx::query("DELETE FROM categories WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // === Playables ===

    async fn get_playable(&self, id: &str) -> StoreResult<Option<Playable>> {
        let row = sqlx::query_as::<_, DbPlayable>(&format!(
            "SELECT {PLAYABLE_COLUMNS} FROM playables WHERE playable_id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DbPlayable::into_playable).transpose()
    }

    async fn get_playables(&self, ids: &[String]) -> StoreResult<Vec<Playable>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, DbPlayable>(&format!(
            "SELECT {PLAYABLE_COLUMNS} FROM playables WHERE playable_id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DbPlayable::into_playable).collect()
    }

    async fn list_playables(&self) -> StoreResult<Vec<Playable>> {
        let rows = sqlx::query_as::<_, DbPlayable>(&format!(
            "SELECT {PLAYABLE_COLUMNS} FROM playables ORDER BY created_at DESC, playable_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DbPlayable::into_playable).collect()
    }

    async fn count_playables(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM playables")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn insert_playable(&self, playable: &Playable) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        lock_category(&mut tx, &playable.category).await?;

        sqlx::query(
            r#"
            INSERT INTO playables (playable_id, kind, category, title, difficulty, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&playable.id)
        .bind(playable.kind().as_str())
        .bind(&playable.category)
        .bind(&playable.title)
        .bind(playable.difficulty.as_str())
        .bind(Json(&playable.content))
        .bind(playable.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn replace_playable(&self, playable: &Playable) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        lock_category(&mut tx, &playable.category).await?;

        let result = sqlx::query(
            r#"
            UPDATE playables
            SET kind = $2, category = $3, title = $4, difficulty = $5, content = $6
            WHERE playable_id = $1
            "#,
        )
        .bind(&playable.id)
        .bind(playable.kind().as_str())
        .bind(&playable.category)
        .bind(&playable.title)
        .bind(playable.difficulty.as_str())
        .bind(Json(&playable.content))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("playable {}", playable.id)));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_playable(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM playables WHERE playable_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("playable {id}")));
        }
        Ok(())
    }

    async fn sample_playables(
        &self,
        filter: &SampleFilter,
        limit: usize,
    ) -> StoreResult<Vec<Playable>> {
        let exclude: Vec<String> = filter.exclude.iter().cloned().collect();
        let rows = sqlx::query_as::<_, DbPlayable>(&format!(
            r#"
            SELECT {PLAYABLE_COLUMNS}
            FROM playables
            WHERE NOT (playable_id = ANY($1))
              AND ($2::TEXT[] IS NULL OR LOWER(category) = ANY($2))
            ORDER BY random()
            LIMIT $3
            "#
        ))
        .bind(&exclude)
        .bind(&filter.categories)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DbPlayable::into_playable).collect()
    }

    // === Progress ===

    async fn seen_playable_ids(&self, user_id: &str) -> StoreResult<HashSet<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT playable_id FROM user_progress WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().collect())
    }

    async fn get_progress(
        &self,
        user_id: &str,
        playable_id: &str,
    ) -> StoreResult<Option<ProgressRecord>> {
        let row = sqlx::query_as::<_, DbProgress>(
            r#"
            SELECT user_id, playable_id, answered, correct, skipped,
                   hints_used, moves_used, recorded_at
            FROM user_progress
            WHERE user_id = $1 AND playable_id = $2
            "#,
        )
        .bind(user_id)
        .bind(playable_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DbProgress::into_record).transpose()
    }

    async fn record_outcome(&self, record: &ProgressRecord) -> StoreResult<UserStats> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO user_progress (user_id, playable_id, answered, correct, skipped,
                                       hints_used, moves_used, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, playable_id) DO NOTHING
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.playable_id)
        .bind(record.answered)
        .bind(record.correct)
        .bind(record.skipped)
        .bind(record.hints_used.map(to_i32))
        .bind(record.moves_used.map(to_i32))
        .bind(record.timestamp)
        .execute(&mut *tx)
        .await?;

        // Dropping the transaction rolls it back
        if inserted.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "playable {} already resolved",
                record.playable_id
            )));
        }

        let user = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(&record.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("user {}", record.user_id)))?;

        let mut stats = user.stats()?;
        stats.apply(record);

        sqlx::query(
            r#"
            UPDATE users
            SET total_played = $2, correct_answers = $3, current_streak = $4,
                best_streak = $5, skipped = $6
            WHERE user_id = $1
            "#,
        )
        .bind(&record.user_id)
        .bind(to_i32(stats.total_played))
        .bind(to_i32(stats.correct_answers))
        .bind(to_i32(stats.current_streak))
        .bind(to_i32(stats.best_streak))
        .bind(to_i32(stats.skipped))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(stats)
    }
}
