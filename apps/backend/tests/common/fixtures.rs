//! Test fixtures and factory functions for creating test data.

use chrono::Utc;
use serde_json::{json, Value};

use invin_backend::config::Config;
use invin_backend::models::{Playable, PlayableDraft};

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Dev mode on, admin token set, everything else default.
pub fn test_config() -> Config {
    Config {
        admin_token: Some(ADMIN_TOKEN.to_string()),
        dev_mode: true,
        ..Config::default()
    }
}

/// Validate a draft given as JSON into a playable with a fixed id.
pub fn playable(id: &str, draft: Value) -> Playable {
    serde_json::from_value::<PlayableDraft>(draft)
        .unwrap()
        .into_playable(id.to_string(), Utc::now())
        .unwrap()
}

/// Free text question.
pub fn text_draft(category: &str, prompt: &str, answer: &str) -> Value {
    json!({
        "kind": "text",
        "category": category,
        "title": prompt,
        "question": {"text": prompt},
        "correct_answer": answer
    })
}

pub fn text_playable(id: &str, category: &str, answer: &str) -> Playable {
    playable(id, text_draft(category, &format!("Question {id}?"), answer))
}

/// Multiple choice question with four options.
pub fn mcq_playable(id: &str, category: &str) -> Playable {
    playable(
        id,
        json!({
            "kind": "text",
            "category": category,
            "title": "World War II",
            "question": {"text": "In which year did World War II end?"},
            "options": ["1943", "1944", "1945", "1946"],
            "correct_answer": "1945"
        }),
    )
}

/// guess_the_x with three hints.
pub fn guess_playable(id: &str) -> Playable {
    playable(
        id,
        json!({
            "kind": "guess_the_x",
            "category": "Geography",
            "title": "Guess the Landmark",
            "hints": ["Finished in 1889", "Wrought iron", "Champ de Mars"],
            "correct_answer": "Eiffel Tower"
        }),
    )
}

pub fn chess_playable(id: &str) -> Playable {
    playable(
        id,
        json!({
            "kind": "chess_mate_in_2",
            "category": "Chess",
            "title": "Morphy's Mate",
            "question": {"fen": "kbK5/pp6/1P6/8/8/8/8/R7 w - - 0 1"},
            "solution": ["Ra6", "bxa6", "b7#"]
        }),
    )
}

pub fn this_or_that_playable(id: &str) -> Playable {
    playable(
        id,
        json!({
            "kind": "this_or_that",
            "category": "Science",
            "title": "Gas Giants",
            "question": {
                "text": "Which planet is bigger?",
                "left_label": "Jupiter",
                "right_label": "Saturn"
            },
            "correct_answer": "Jupiter"
        }),
    )
}
