//! Error types for invin-core.

use thiserror::Error;

use crate::types::{AnswerMode, PlayableKind};

/// A playable definition that cannot be stored.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required field `{field}` for kind {kind}")]
    MissingField {
        kind: PlayableKind,
        field: &'static str,
    },

    #[error("field `{field}` is not allowed for kind {kind}")]
    UnexpectedField {
        kind: PlayableKind,
        field: &'static str,
    },

    #[error("answer mode {mode} is not supported for kind {kind}")]
    UnsupportedAnswerMode { kind: PlayableKind, mode: AnswerMode },

    #[error("multiple choice needs at least 2 options, got {count}")]
    TooFewOptions { count: usize },

    #[error("duplicate option `{0}`")]
    DuplicateOption(String),

    #[error("correct answer `{0}` is not among the options")]
    AnswerNotInOptions(String),

    #[error("correct answer `{0}` does not match either label")]
    AnswerNotALabel(String),

    #[error("both sides share the label `{0}`")]
    DuplicateLabel(String),

    #[error("guess_the_x needs 3 to 5 hints, got {count}")]
    HintCount { count: usize },

    #[error("invalid FEN position: {0}")]
    InvalidFen(String),

    #[error("invalid move `{0}` in solution")]
    InvalidMove(String),

    #[error("invalid video clip: {0}")]
    InvalidClip(String),

    #[error("unknown category `{0}`")]
    UnknownCategory(String),
}

/// A submission that cannot be graded against the given playable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradeError {
    #[error("{kind} playables do not accept a {given} submission")]
    SubmissionMismatch {
        kind: PlayableKind,
        given: &'static str,
    },

    #[error("hint number must be at least 1")]
    InvalidHintNumber,
}
