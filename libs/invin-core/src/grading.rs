//! Answer grading, one strategy per playable kind.
//!
//! Grading is pure: it never touches the progress ledger or the counters.
//! A conclusive [`GradeOutcome`] is turned into a [`ProgressRecord`] by the
//! caller, which writes it together with the stats update.

use std::iter;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GradeError;
use crate::matching::{compare_answers, normalize_answer};
use crate::playable::{Playable, PlayableContent};
use crate::types::{AnswerMode, MatchingMode, ProgressRecord, Submission};

/// Congratulations for a correct guess, indexed by the hint the user was on.
pub const GUESS_FEEDBACK: [&str; 5] = [
    "Genius! You got it on the very first hint.",
    "Brilliant! Only two hints needed.",
    "Nice work! The third hint did it.",
    "Got there! Four hints in.",
    "Phew! Solved on the final hint.",
];

/// Feedback for a correct guess at `hint_number`, clamped to the last tier.
pub fn guess_feedback(hint_number: u32) -> &'static str {
    let tier = (hint_number.max(1) as usize - 1).min(GUESS_FEEDBACK.len() - 1);
    GUESS_FEEDBACK[tier]
}

/// Free text matching settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradingPolicy {
    pub matching_mode: MatchingMode,
    pub fuzzy_threshold: f64,
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            matching_mode: MatchingMode::CaseInsensitive,
            fuzzy_threshold: 0.85,
        }
    }
}

/// What grading decided for one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeOutcome {
    pub correct: bool,
    /// Conclusive outcomes finalize the playable for the user.
    pub conclusive: bool,
    pub reveal_answer: bool,
    /// Present iff `reveal_answer`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints_used: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moves_used: Option<u32>,
    /// Hint the client should reveal next (inconclusive guesses only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_hint: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl GradeOutcome {
    fn conclusive(correct: bool, answer: String) -> Self {
        Self {
            correct,
            conclusive: true,
            reveal_answer: true,
            correct_answer: Some(answer),
            hints_used: None,
            moves_used: None,
            next_hint: None,
            feedback: None,
        }
    }

    fn reveal_next_hint(next_hint: u32) -> Self {
        Self {
            correct: false,
            conclusive: false,
            reveal_answer: false,
            correct_answer: None,
            hints_used: None,
            moves_used: None,
            next_hint: Some(next_hint),
            feedback: None,
        }
    }

    /// The ledger entry for this outcome, or `None` while hints remain.
    pub fn to_record(
        &self,
        user_id: &str,
        playable_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Option<ProgressRecord> {
        self.conclusive.then(|| {
            ProgressRecord::answered(
                user_id,
                playable_id,
                self.correct,
                self.hints_used,
                self.moves_used,
                timestamp,
            )
        })
    }
}

/// Grade `submission` against `playable`.
pub fn grade(
    playable: &Playable,
    submission: &Submission,
    policy: &GradingPolicy,
) -> Result<GradeOutcome, GradeError> {
    match (&playable.content, submission) {
        (
            PlayableContent::Text(q)
            | PlayableContent::Image(q)
            | PlayableContent::Video(q)
            | PlayableContent::ImageText(q)
            | PlayableContent::VideoText(q),
            Submission::Answer { answer },
        ) => {
            // Picking an option is never fuzzy
            let mode = match q.answer_mode {
                AnswerMode::FreeText => policy.matching_mode,
                _ => MatchingMode::CaseInsensitive,
            };
            let accepted = iter::once(q.correct_answer.as_str())
                .chain(q.alternate_answers.iter().map(String::as_str));
            let result = compare_answers(answer, accepted, mode, policy.fuzzy_threshold);

            Ok(GradeOutcome::conclusive(
                result.is_correct,
                q.correct_answer.clone(),
            ))
        }

        (PlayableContent::GuessTheX(g), Submission::Guess { answer, hint_number }) => {
            if *hint_number == 0 {
                return Err(GradeError::InvalidHintNumber);
            }
            let total_hints = g.hints.len() as u32;
            let hints_used = (*hint_number).min(total_hints);

            let accepted = iter::once(g.correct_answer.as_str())
                .chain(g.alternate_answers.iter().map(String::as_str));
            let result = compare_answers(
                answer,
                accepted,
                policy.matching_mode,
                policy.fuzzy_threshold,
            );

            if result.is_correct {
                let mut outcome = GradeOutcome::conclusive(true, g.correct_answer.clone());
                outcome.hints_used = Some(hints_used);
                outcome.feedback = Some(guess_feedback(hints_used).to_string());
                Ok(outcome)
            } else if *hint_number < total_hints {
                Ok(GradeOutcome::reveal_next_hint(hint_number + 1))
            } else {
                let mut outcome = GradeOutcome::conclusive(false, g.correct_answer.clone());
                outcome.hints_used = Some(hints_used);
                Ok(outcome)
            }
        }

        (PlayableContent::ChessMateIn2(c), Submission::ChessResult { solved, moves_used }) => {
            let mut outcome = GradeOutcome::conclusive(*solved, c.solution.join(" "));
            outcome.moves_used = Some(*moves_used);
            Ok(outcome)
        }

        (PlayableContent::ThisOrThat(t), Submission::Answer { answer }) => {
            let submitted = normalize_answer(answer);
            let correct = !submitted.is_empty() && submitted == normalize_answer(&t.correct_answer);
            Ok(GradeOutcome::conclusive(correct, t.correct_answer.clone()))
        }

        (content, submission) => Err(GradeError::SubmissionMismatch {
            kind: content.kind(),
            given: submission.shape(),
        }),
    }
}
