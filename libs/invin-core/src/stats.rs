//! Per-user streak and accuracy counters.
//!
//! Counters only move through [`UserStats::apply`]; the store runs it inside
//! the same transaction that writes the matching progress record.

use serde::{Deserialize, Serialize};

use crate::types::ProgressRecord;

/// Cumulative counters for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_played: u32,
    pub correct_answers: u32,
    pub current_streak: u32,
    pub best_streak: u32,
    pub skipped: u32,
}

impl UserStats {
    /// Apply one conclusive grading outcome.
    pub fn apply_result(&mut self, correct: bool) {
        self.total_played += 1;
        if correct {
            self.correct_answers += 1;
            self.current_streak += 1;
            self.best_streak = self.best_streak.max(self.current_streak);
        } else {
            self.current_streak = 0;
        }
    }

    /// A skip is not a failure: the streak is left alone.
    pub fn apply_skip(&mut self) {
        self.skipped += 1;
    }

    /// Apply whatever a freshly written progress record implies.
    pub fn apply(&mut self, record: &ProgressRecord) {
        if record.skipped {
            self.apply_skip();
        } else {
            self.apply_result(record.correct);
        }
    }

    /// Percentage of played items answered correctly, one decimal.
    pub fn accuracy(&self) -> f64 {
        if self.total_played == 0 {
            return 0.0;
        }
        let pct = self.correct_answers as f64 * 100.0 / self.total_played as f64;
        (pct * 10.0).round() / 10.0
    }

    /// `correct_answers <= total_played` and `current_streak <= best_streak`.
    pub fn is_consistent(&self) -> bool {
        self.correct_answers <= self.total_played && self.current_streak <= self.best_streak
    }
}
