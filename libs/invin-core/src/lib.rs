//! Core library for the Invin playable feed.
//!
//! Provides:
//! - Playable model (tagged by kind, validated at construction)
//! - Answer grading for every playable kind
//! - Answer matching (normalized and Levenshtein)
//! - Feed selection helpers (curated sequence, sample filter)
//! - Streak and accuracy counters

pub mod error;
pub mod feed;
pub mod grading;
pub mod matching;
pub mod playable;
pub mod stats;
pub mod types;

pub use error::{GradeError, ValidationError};
pub use feed::{CuratedSequence, SampleFilter};
pub use grading::{grade, GradeOutcome, GradingPolicy};
pub use matching::{compare_answers, normalize_answer, MatchResult};
pub use playable::{Playable, PlayableContent, PlayableDraft, PlayableView};
pub use stats::UserStats;
pub use types::{
    AnswerMode, Category, Difficulty, MatchingMode, PlayableKind, ProgressRecord, Submission,
    User,
};
