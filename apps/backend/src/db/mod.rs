//! Persistence for users, sessions, categories, playables and progress

pub mod memory;
pub mod postgres;

use std::collections::HashSet;

use async_trait::async_trait;
use invin_core::{Category, Playable, ProgressRecord, SampleFilter, User, UserStats};
use thiserror::Error;

use crate::models::Session;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Store failures, mapped onto HTTP statuses by `ApiError`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A playable write named a category that does not exist.
    #[error("unknown category {0}")]
    UnknownCategory(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::Decode(e) | sqlx::Error::ColumnDecode { source: e, .. } => {
                StoreError::Corrupt(e.to_string())
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Everything the services need from a backing store.
///
/// Category names compare case-insensitively everywhere.
#[async_trait]
pub trait Store: Send + Sync {
    // === Users ===

    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Conflict if the id or email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    /// Store the onboarding selection and mark onboarding complete.
    async fn set_selected_categories(
        &self,
        user_id: &str,
        categories: &[String],
    ) -> StoreResult<User>;

    /// Delete the user's progress records and zero their counters.
    /// Returns the number of records removed.
    async fn reset_progress(&self, user_id: &str) -> StoreResult<u64>;

    // === Sessions ===

    async fn insert_session(&self, session: &Session) -> StoreResult<()>;

    async fn get_session(&self, token_hash: &str) -> StoreResult<Option<Session>>;

    /// Returns whether a session was removed.
    async fn delete_session(&self, token_hash: &str) -> StoreResult<bool>;

    // === Categories ===

    /// All categories with their playable counts, ordered by name.
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;

    async fn get_category(&self, name: &str) -> StoreResult<Option<Category>>;

    async fn count_playables_in_category(&self, name: &str) -> StoreResult<u64>;

    /// Conflict if a category with the same name exists.
    async fn insert_category(&self, category: &Category) -> StoreResult<()>;

    /// Replace the category stored under `name`.
    async fn update_category(&self, name: &str, category: &Category) -> StoreResult<()>;

    /// Conflict while any playable still references the category.
    async fn delete_category(&self, name: &str) -> StoreResult<()>;

    // === Playables ===

    async fn get_playable(&self, id: &str) -> StoreResult<Option<Playable>>;

    /// Playables for the given ids, in no particular order. Unknown ids are skipped.
    async fn get_playables(&self, ids: &[String]) -> StoreResult<Vec<Playable>>;

    /// Every playable, newest first.
    async fn list_playables(&self) -> StoreResult<Vec<Playable>>;

    async fn count_playables(&self) -> StoreResult<u64>;

    /// UnknownCategory if the playable's category is missing at write time.
    async fn insert_playable(&self, playable: &Playable) -> StoreResult<()>;

    /// NotFound if no playable has this id, UnknownCategory as for inserts.
    async fn replace_playable(&self, playable: &Playable) -> StoreResult<()>;

    /// NotFound if no playable has this id. Progress records are kept.
    async fn delete_playable(&self, id: &str) -> StoreResult<()>;

    /// Uniform random sample of up to `limit` playables admitted by `filter`.
    async fn sample_playables(
        &self,
        filter: &SampleFilter,
        limit: usize,
    ) -> StoreResult<Vec<Playable>>;

    // === Progress ===

    /// Ids of every playable the user has a progress record for.
    async fn seen_playable_ids(&self, user_id: &str) -> StoreResult<HashSet<String>>;

    async fn get_progress(
        &self,
        user_id: &str,
        playable_id: &str,
    ) -> StoreResult<Option<ProgressRecord>>;

    /// Write the record and apply it to the user's counters as one unit.
    ///
    /// Conflict if a record for the pair already exists; nothing changes then.
    async fn record_outcome(&self, record: &ProgressRecord) -> StoreResult<UserStats>;
}
