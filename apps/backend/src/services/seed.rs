//! Sample content for empty installations

use chrono::Utc;
use invin_core::{Category, PlayableDraft};
use serde_json::json;

use crate::db::Store;
use crate::error::{ApiError, Result};
use crate::models::SeedResponse;
use crate::services::catalog::new_playable_id;

fn sample_categories() -> Vec<Category> {
    [
        ("Science", "flask", "#4CAF50"),
        ("History", "landmark", "#795548"),
        ("Geography", "globe", "#2196F3"),
        ("Technology", "cpu", "#607D8B"),
        ("Math", "calculator", "#FF9800"),
        ("Literature", "book", "#9C27B0"),
        ("Music", "music", "#E91E63"),
        ("Art", "palette", "#FF5722"),
        ("Chess", "chess", "#212121"),
    ]
    .into_iter()
    .map(|(name, icon, color)| Category {
        name: name.to_string(),
        icon: Some(icon.to_string()),
        color: Some(color.to_string()),
        playable_count: 0,
    })
    .collect()
}

fn sample_drafts() -> Vec<serde_json::Value> {
    vec![
        json!({
            "kind": "video",
            "category": "Science",
            "title": "How does photosynthesis work?",
            "difficulty": "easy",
            "question": {
                "video_url": "https://www.w3schools.com/html/mov_bbb.mp4",
                "text": "What is the primary gas absorbed during photosynthesis?"
            },
            "options": ["Oxygen", "Carbon Dioxide", "Nitrogen", "Hydrogen"],
            "correct_answer": "Carbon Dioxide"
        }),
        json!({
            "kind": "text",
            "category": "History",
            "title": "World War II",
            "difficulty": "easy",
            "question": {"text": "In which year did World War II end?"},
            "options": ["1943", "1944", "1945", "1946"],
            "correct_answer": "1945"
        }),
        json!({
            "kind": "image",
            "category": "Geography",
            "title": "World Capitals",
            "difficulty": "easy",
            "question": {
                "image": "https://images.unsplash.com/photo-1511739001486-6bfe10ce785f?w=400&h=300&fit=crop",
                "text": "Which city is this landmark located in?"
            },
            "correct_answer": "Paris"
        }),
        json!({
            "kind": "video_text",
            "category": "Technology",
            "title": "Programming Basics",
            "difficulty": "easy",
            "question": {
                "video_url": "https://www.w3schools.com/html/movie.mp4",
                "text": "What does HTML stand for?"
            },
            "options": [
                "Hyper Text Markup Language",
                "High Tech Modern Language",
                "Home Tool Markup Language",
                "Hyperlinks and Text Markup Language"
            ],
            "correct_answer": "Hyper Text Markup Language"
        }),
        json!({
            "kind": "image_text",
            "category": "Math",
            "title": "Basic Arithmetic",
            "difficulty": "easy",
            "question": {
                "image": "https://images.unsplash.com/photo-1509228468518-180dd4864904?w=400&h=300&fit=crop",
                "text": "What is 5 + 7?"
            },
            "options": ["10", "11", "12", "13"],
            "correct_answer": "12"
        }),
        json!({
            "kind": "text",
            "category": "Literature",
            "title": "Famous Authors",
            "difficulty": "easy",
            "question": {"text": "Who wrote 'Romeo and Juliet'?"},
            "correct_answer": "Shakespeare",
            "alternate_answers": ["William Shakespeare"]
        }),
        json!({
            "kind": "video",
            "category": "Music",
            "title": "Musical Instruments",
            "difficulty": "medium",
            "question": {
                "video_url": "https://www.w3schools.com/html/mov_bbb.mp4",
                "text": "What instrument family does the piano belong to?"
            },
            "correct_answer": "Percussion"
        }),
        json!({
            "kind": "image_text",
            "category": "Art",
            "title": "Famous Paintings",
            "difficulty": "medium",
            "question": {
                "image": "https://images.unsplash.com/photo-1574870111867-089730e5a72b?w=400&h=300&fit=crop",
                "text": "Who painted this famous artwork?"
            },
            "correct_answer": "Leonardo da Vinci",
            "alternate_answers": ["Da Vinci", "Leonardo"]
        }),
        json!({
            "kind": "guess_the_x",
            "category": "Geography",
            "title": "Guess the Landmark",
            "difficulty": "medium",
            "question": {"text": "Which landmark is this?"},
            "hints": [
                "It was finished in 1889",
                "It is made of wrought iron",
                "It stands on the Champ de Mars in Paris"
            ],
            "correct_answer": "Eiffel Tower",
            "alternate_answers": ["The Eiffel Tower"]
        }),
        json!({
            "kind": "chess_mate_in_2",
            "category": "Chess",
            "title": "Morphy's Mate",
            "difficulty": "hard",
            "question": {
                "text": "White to move and mate in two.",
                "fen": "kbK5/pp6/1P6/8/8/8/8/R7 w - - 0 1"
            },
            "solution": ["Ra6", "bxa6", "b7#"],
            "hints": ["Give up the rook"]
        }),
        json!({
            "kind": "this_or_that",
            "category": "Science",
            "title": "Gas Giants",
            "difficulty": "easy",
            "question": {
                "text": "Which planet is bigger?",
                "left_label": "Jupiter",
                "right_label": "Saturn"
            },
            "correct_answer": "Jupiter"
        }),
    ]
}

/// Seed sample categories and playables, but only into a store without
/// playables. Categories that already exist are left as they are.
pub async fn seed(store: &dyn Store) -> Result<SeedResponse> {
    let existing = store.count_playables().await?;
    if existing > 0 {
        tracing::info!(existing, "Store already has playables, not seeding");
        return Ok(SeedResponse {
            seeded: false,
            playables_created: 0,
            categories_created: 0,
        });
    }

    let mut categories_created = 0;
    for category in sample_categories() {
        if store.get_category(&category.name).await?.is_none() {
            store.insert_category(&category).await?;
            categories_created += 1;
        }
    }

    let mut playables_created = 0;
    for raw in sample_drafts() {
        let draft: PlayableDraft = serde_json::from_value(raw)
            .map_err(|e| ApiError::Internal(format!("bad sample playable: {e}")))?;
        let playable = draft.into_playable(new_playable_id(), Utc::now())?;
        store.insert_playable(&playable).await?;
        playables_created += 1;
    }

    tracing::info!(playables_created, categories_created, "Seeded sample content");
    Ok(SeedResponse {
        seeded: true,
        playables_created,
        categories_created,
    })
}
