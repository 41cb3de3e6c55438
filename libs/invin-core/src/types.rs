//! Core types shared by the feed, grading and stats engines.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stats::UserStats;

/// Question difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Medium
    }
}

impl Difficulty {
    /// Get the difficulty name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

/// Which question shape a playable has. Decides the grading strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayableKind {
    Text,
    Image,
    Video,
    ImageText,
    VideoText,
    GuessTheX,
    #[serde(rename = "chess_mate_in_2")]
    ChessMateIn2,
    ThisOrThat,
}

impl PlayableKind {
    pub const ALL: [PlayableKind; 8] = [
        Self::Text,
        Self::Image,
        Self::Video,
        Self::ImageText,
        Self::VideoText,
        Self::GuessTheX,
        Self::ChessMateIn2,
        Self::ThisOrThat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::ImageText => "image_text",
            Self::VideoText => "video_text",
            Self::GuessTheX => "guess_the_x",
            Self::ChessMateIn2 => "chess_mate_in_2",
            Self::ThisOrThat => "this_or_that",
        }
    }

}

impl fmt::Display for PlayableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the user enters an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    #[serde(alias = "mcq")]
    MultipleChoice,
    #[serde(alias = "text_input")]
    FreeText,
    TapSelect,
}

impl AnswerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::FreeText => "free_text",
            Self::TapSelect => "tap_select",
        }
    }
}

impl fmt::Display for AnswerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Matching mode for free text answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingMode {
    CaseInsensitive,
    Fuzzy,
}

impl Default for MatchingMode {
    fn default() -> Self {
        Self::CaseInsensitive
    }
}

impl MatchingMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "case_insensitive" => Some(Self::CaseInsensitive),
            "fuzzy" => Some(Self::Fuzzy),
            _ => None,
        }
    }
}

/// Content category with display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Number of playables referencing this category. Derived, never stored.
    #[serde(default)]
    pub playable_count: u64,
}

/// A user account with its cumulative counters and onboarding state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(flatten)]
    pub stats: UserStats,
    pub selected_categories: Vec<String>,
    pub onboarding_complete: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A freshly authenticated user with zeroed counters.
    pub fn new(user_id: String, email: String, name: String, picture: Option<String>) -> Self {
        Self {
            user_id,
            email,
            name,
            picture,
            stats: UserStats::default(),
            selected_categories: Vec::new(),
            onboarding_complete: false,
            created_at: Utc::now(),
        }
    }
}

/// Durable marker that a (user, playable) pair has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: String,
    pub playable_id: String,
    pub answered: bool,
    pub correct: bool,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints_used: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moves_used: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressRecord {
    /// Record for a conclusive grading outcome.
    pub fn answered(
        user_id: &str,
        playable_id: &str,
        correct: bool,
        hints_used: Option<u32>,
        moves_used: Option<u32>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            playable_id: playable_id.to_string(),
            answered: true,
            correct,
            skipped: false,
            hints_used,
            moves_used,
            timestamp,
        }
    }

    /// Record for a skipped playable.
    pub fn skipped(user_id: &str, playable_id: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            playable_id: playable_id.to_string(),
            answered: false,
            correct: false,
            skipped: true,
            hints_used: None,
            moves_used: None,
            timestamp,
        }
    }
}

/// Raw user input for one playable. The shape must fit the playable's kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Single-shot text, option or label answer.
    Answer { answer: String },
    /// A guess_the_x attempt while the user views hint `hint_number` (1-based).
    Guess { answer: String, hint_number: u32 },
    /// Result of client-side chess move validation.
    ChessResult { solved: bool, moves_used: u32 },
}

impl Submission {
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Answer { .. } => "answer",
            Self::Guess { .. } => "guess",
            Self::ChessResult { .. } => "chess_result",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display_matches_serde() {
        for kind in PlayableKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
        assert!(serde_json::from_str::<PlayableKind>("\"chess\"").is_err());
    }

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&PlayableKind::ChessMateIn2).unwrap();
        assert_eq!(json, "\"chess_mate_in_2\"");
        let json = serde_json::to_string(&PlayableKind::GuessTheX).unwrap();
        assert_eq!(json, "\"guess_the_x\"");
    }

    #[test]
    fn test_answer_mode_accepts_legacy_names() {
        let mode: AnswerMode = serde_json::from_str("\"mcq\"").unwrap();
        assert_eq!(mode, AnswerMode::MultipleChoice);
        let mode: AnswerMode = serde_json::from_str("\"text_input\"").unwrap();
        assert_eq!(mode, AnswerMode::FreeText);
        assert_eq!(AnswerMode::FreeText.to_string(), "free_text");
        assert!(serde_json::from_str::<AnswerMode>("\"swipe\"").is_err());
    }

    #[test]
    fn test_skipped_record_is_not_answered() {
        let record = ProgressRecord::skipped("user_1", "play_1", Utc::now());
        assert!(record.skipped);
        assert!(!record.answered);
        assert!(!record.correct);
    }
}
