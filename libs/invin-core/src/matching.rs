//! Answer matching for free text, option and label submissions.

use serde::{Deserialize, Serialize};

use crate::types::MatchingMode;

/// Result of comparing a submission against the accepted answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Whether the answer is considered correct.
    pub is_correct: bool,
    /// Best similarity score between 0.0 and 1.0.
    pub similarity: f64,
    /// The matching mode used.
    pub matching_mode: MatchingMode,
    /// Normalized submission (for display).
    pub typed_normalized: String,
}

/// Normalize an answer for comparison: trim, collapse inner whitespace,
/// lowercase.
pub fn normalize_answer(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Compare a submission against every accepted answer.
///
/// A blank submission never matches, whatever the mode.
pub fn compare_answers<'a, I>(
    typed: &str,
    accepted: I,
    mode: MatchingMode,
    fuzzy_threshold: f64,
) -> MatchResult
where
    I: IntoIterator<Item = &'a str>,
{
    let typed_normalized = normalize_answer(typed);

    if typed_normalized.is_empty() {
        return MatchResult {
            is_correct: false,
            similarity: 0.0,
            matching_mode: mode,
            typed_normalized,
        };
    }

    let mut best = 0.0_f64;
    for candidate in accepted {
        let candidate = normalize_answer(candidate);
        if candidate.is_empty() {
            continue;
        }
        let similarity = match mode {
            MatchingMode::CaseInsensitive => {
                if candidate == typed_normalized {
                    1.0
                } else {
                    0.0
                }
            }
            MatchingMode::Fuzzy => normalized_similarity(&typed_normalized, &candidate),
        };
        best = best.max(similarity);
        if best >= 1.0 {
            break;
        }
    }

    let is_correct = match mode {
        MatchingMode::CaseInsensitive => best >= 1.0,
        MatchingMode::Fuzzy => best >= fuzzy_threshold,
    };

    MatchResult {
        is_correct,
        similarity: best,
        matching_mode: mode,
        typed_normalized,
    }
}

/// Calculate Levenshtein distance between two strings.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    // Two rows instead of the full matrix
    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;

        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] {
                0
            } else {
                1
            };

            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Calculate normalized similarity (0.0 to 1.0) based on Levenshtein distance.
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let distance = levenshtein_distance(a, b);
    1.0 - (distance as f64 / max_len as f64)
}
