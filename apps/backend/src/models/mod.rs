//! Database rows and API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

pub use invin_core::{
    Category, Difficulty, GradeOutcome, Playable, PlayableContent, PlayableDraft, PlayableKind,
    PlayableView, ProgressRecord, User, UserStats,
};

use crate::db::StoreError;

// === Domain Types ===

/// A login session. Only the SHA-256 hex digest of the token is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub token_hash: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// === Database Entity Types ===

/// User row in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub total_played: i32,
    pub correct_answers: i32,
    pub current_streak: i32,
    pub best_streak: i32,
    pub skipped: i32,
    pub selected_categories: Vec<String>,
    pub onboarding_complete: bool,
    pub created_at: DateTime<Utc>,
}

impl DbUser {
    pub fn stats(&self) -> Result<UserStats, StoreError> {
        Ok(UserStats {
            total_played: counter(self.total_played, "total_played")?,
            correct_answers: counter(self.correct_answers, "correct_answers")?,
            current_streak: counter(self.current_streak, "current_streak")?,
            best_streak: counter(self.best_streak, "best_streak")?,
            skipped: counter(self.skipped, "skipped")?,
        })
    }

    pub fn into_user(self) -> Result<User, StoreError> {
        let stats = self.stats()?;
        Ok(User {
            user_id: self.user_id,
            email: self.email,
            name: self.name,
            picture: self.picture,
            stats,
            selected_categories: self.selected_categories,
            onboarding_complete: self.onboarding_complete,
            created_at: self.created_at,
        })
    }
}

fn counter(value: i32, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {column}: {value}")))
}

/// Playable row in PostgreSQL; the kind-specific payload lives in JSONB
#[derive(Debug, Clone, FromRow)]
pub struct DbPlayable {
    pub playable_id: String,
    pub category: String,
    pub title: String,
    pub difficulty: String,
    pub content: Json<PlayableContent>,
    pub created_at: DateTime<Utc>,
}

impl DbPlayable {
    pub fn into_playable(self) -> Result<Playable, StoreError> {
        let difficulty = Difficulty::from_str(&self.difficulty).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "playable {} has difficulty {}",
                self.playable_id, self.difficulty
            ))
        })?;
        Ok(Playable {
            id: self.playable_id,
            category: self.category,
            title: self.title,
            difficulty,
            created_at: self.created_at,
            content: self.content.0,
        })
    }
}

/// Category row joined with its playable count
#[derive(Debug, Clone, FromRow)]
pub struct DbCategory {
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub playable_count: i64,
}

impl DbCategory {
    pub fn into_category(self) -> Category {
        Category {
            name: self.name,
            icon: self.icon,
            color: self.color,
            playable_count: self.playable_count.max(0) as u64,
        }
    }
}

/// Progress row in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct DbProgress {
    pub user_id: String,
    pub playable_id: String,
    pub answered: bool,
    pub correct: bool,
    pub skipped: bool,
    pub hints_used: Option<i32>,
    pub moves_used: Option<i32>,
    pub recorded_at: DateTime<Utc>,
}

impl DbProgress {
    pub fn into_record(self) -> Result<ProgressRecord, StoreError> {
        Ok(ProgressRecord {
            user_id: self.user_id,
            playable_id: self.playable_id,
            answered: self.answered,
            correct: self.correct,
            skipped: self.skipped,
            hints_used: self.hints_used.map(|h| counter(h, "hints_used")).transpose()?,
            moves_used: self.moves_used.map(|m| counter(m, "moves_used")).transpose()?,
            timestamp: self.recorded_at,
        })
    }
}

// === API Request/Response Types ===

/// Public part of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub selected_categories: Vec<String>,
    pub onboarding_complete: bool,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            picture: user.picture.clone(),
            selected_categories: user.selected_categories.clone(),
            onboarding_complete: user.onboarding_complete,
        }
    }
}

/// Request body for dev login
#[derive(Debug, Default, Deserialize)]
pub struct DevLoginRequest {
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Response for a successful login
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

/// Response for logout
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}

/// Query parameters for the feed
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    #[serde(alias = "page_size")]
    pub limit: Option<usize>,
}

/// Response for the feed
#[derive(Debug, Serialize, Deserialize)]
pub struct FeedResponse {
    pub playables: Vec<PlayableView>,
    pub count: usize,
}

/// Request body for answering a playable. Which fields are needed depends on
/// the playable's kind.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SubmitAnswerRequest {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub hint_number: Option<u32>,
    #[serde(default)]
    pub solved: Option<bool>,
    #[serde(default)]
    pub moves_used: Option<u32>,
}

/// Counters plus accuracy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_played: u32,
    pub correct_answers: u32,
    pub current_streak: u32,
    pub best_streak: u32,
    pub skipped: u32,
    pub accuracy: f64,
}

impl From<UserStats> for StatsResponse {
    fn from(stats: UserStats) -> Self {
        Self {
            total_played: stats.total_played,
            correct_answers: stats.correct_answers,
            current_streak: stats.current_streak,
            best_streak: stats.best_streak,
            skipped: stats.skipped,
            accuracy: stats.accuracy(),
        }
    }
}

/// Response for an answer submission
#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
    #[serde(flatten)]
    pub outcome: GradeOutcome,
    #[serde(flatten)]
    pub stats: StatsResponse,
}

/// Response for a skip
#[derive(Debug, Serialize, Deserialize)]
pub struct SkipResponse {
    pub playable_id: String,
    pub stats: StatsResponse,
}

/// Request body for the onboarding category selection
#[derive(Debug, Deserialize)]
pub struct SelectCategoriesRequest {
    pub categories: Vec<String>,
}

/// Response for a progress reset
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetProgressResponse {
    pub records_deleted: u64,
}

/// Response for category listings
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
}

/// Request body for creating a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Request body for updating a category; absent fields are kept
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Response for the admin playable listing
#[derive(Debug, Serialize, Deserialize)]
pub struct PlayablesResponse {
    pub count: usize,
    pub playables: Vec<Playable>,
}

/// Request body for bulk import; rows are already parsed by the client
#[derive(Debug, Deserialize)]
pub struct BulkImportRequest {
    pub rows: Vec<serde_json::Value>,
}

/// One rejected row of a bulk import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    pub index: usize,
    pub message: String,
}

/// Response for bulk import
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BulkImportResponse {
    pub imported: usize,
    pub playable_ids: Vec<String>,
    pub errors: Vec<RowError>,
}

/// Response for seeding
#[derive(Debug, Serialize, Deserialize)]
pub struct SeedResponse {
    pub seeded: bool,
    pub playables_created: usize,
    pub categories_created: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_expiry_is_inclusive() {
        let now = Utc::now();
        let session = Session {
            token_hash: "abc".to_string(),
            user_id: "user_1".to_string(),
            expires_at: now,
            created_at: now - Duration::days(7),
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn test_negative_counter_is_corrupt() {
        let row = DbUser {
            user_id: "user_1".to_string(),
            email: "a@b.c".to_string(),
            name: "A".to_string(),
            picture: None,
            total_played: -1,
            correct_answers: 0,
            current_streak: 0,
            best_streak: 0,
            skipped: 0,
            selected_categories: Vec::new(),
            onboarding_complete: false,
            created_at: Utc::now(),
        };
        assert!(matches!(row.into_user(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_stats_response_includes_accuracy() {
        let stats = UserStats {
            total_played: 3,
            correct_answers: 2,
            current_streak: 1,
            best_streak: 2,
            skipped: 0,
        };
        let response = StatsResponse::from(stats);
        assert_eq!(response.accuracy, 66.7);
    }

    #[test]
    fn test_answer_request_fields_are_optional() {
        let request: SubmitAnswerRequest = serde_json::from_str(r#"{"answer": "Paris"}"#).unwrap();
        assert_eq!(request.answer.as_deref(), Some("Paris"));
        assert_eq!(request.hint_number, None);
        assert_eq!(request.solved, None);
    }
}
