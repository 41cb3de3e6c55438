//! Answer submission and skipping

use chrono::Utc;
use invin_core::{
    grade, GradeOutcome, GradingPolicy, Playable, PlayableKind, ProgressRecord, Submission, User,
    UserStats,
};

use crate::db::{Store, StoreError};
use crate::error::{ApiError, Result};
use crate::models::SubmitAnswerRequest;

/// Grading outcome plus the user's counters after it was applied.
#[derive(Debug, Clone)]
pub struct AnswerResult {
    pub outcome: GradeOutcome,
    pub stats: UserStats,
}

/// Shape the raw request into the submission `kind` expects.
pub fn submission_for(kind: PlayableKind, request: SubmitAnswerRequest) -> Result<Submission> {
    let missing = |field: &str| ApiError::BadRequest(format!("{kind} answers need `{field}`"));
    match kind {
        PlayableKind::GuessTheX => Ok(Submission::Guess {
            answer: request.answer.ok_or_else(|| missing("answer"))?,
            hint_number: request.hint_number.ok_or_else(|| missing("hint_number"))?,
        }),
        PlayableKind::ChessMateIn2 => Ok(Submission::ChessResult {
            solved: request.solved.ok_or_else(|| missing("solved"))?,
            moves_used: request.moves_used.unwrap_or(0),
        }),
        _ => Ok(Submission::Answer {
            answer: request.answer.ok_or_else(|| missing("answer"))?,
        }),
    }
}

async fn load_playable(store: &dyn Store, playable_id: &str) -> Result<Playable> {
    store
        .get_playable(playable_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("playable {playable_id}")))
}

async fn ensure_unresolved(store: &dyn Store, user_id: &str, playable_id: &str) -> Result<()> {
    if store.get_progress(user_id, playable_id).await?.is_some() {
        tracing::warn!(%user_id, %playable_id, "Rejected submission for resolved playable");
        return Err(ApiError::Conflict(format!(
            "playable {playable_id} already resolved"
        )));
    }
    Ok(())
}

/// Write the record and stats together; a lost race surfaces as Conflict.
async fn commit(store: &dyn Store, record: &ProgressRecord) -> Result<UserStats> {
    store.record_outcome(record).await.map_err(|e| {
        match &e {
            StoreError::Conflict(_) => tracing::warn!(
                user_id = %record.user_id,
                playable_id = %record.playable_id,
                "Concurrent submission lost the race"
            ),
            StoreError::Unavailable(msg) => {
                tracing::warn!(error = %msg, "Progress write failed")
            }
            _ => {}
        }
        e.into()
    })
}

/// Grade a submission and, when conclusive, record it and update stats.
pub async fn submit_answer(
    store: &dyn Store,
    policy: &GradingPolicy,
    user: &User,
    playable_id: &str,
    request: SubmitAnswerRequest,
) -> Result<AnswerResult> {
    let playable = load_playable(store, playable_id).await?;
    ensure_unresolved(store, &user.user_id, playable_id).await?;

    let submission = submission_for(playable.kind(), request)?;
    let outcome = grade(&playable, &submission, policy)?;

    let stats = match outcome.to_record(&user.user_id, playable_id, Utc::now()) {
        Some(record) => {
            let stats = commit(store, &record).await?;
            tracing::info!(
                user_id = %user.user_id,
                %playable_id,
                kind = %playable.kind(),
                correct = outcome.correct,
                streak = stats.current_streak,
                "Answer graded"
            );
            stats
        }
        None => user.stats,
    };

    Ok(AnswerResult { outcome, stats })
}

/// Mark a playable as skipped. Streaks are left alone.
pub async fn skip(store: &dyn Store, user: &User, playable_id: &str) -> Result<UserStats> {
    load_playable(store, playable_id).await?;
    ensure_unresolved(store, &user.user_id, playable_id).await?;

    let record = ProgressRecord::skipped(&user.user_id, playable_id, Utc::now());
    let stats = commit(store, &record).await?;
    tracing::info!(user_id = %user.user_id, %playable_id, "Playable skipped");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use invin_core::Category;
    use std::sync::Arc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn playable(id: &str, content: serde_json::Value) -> Playable {
        let mut value = json!({
            "id": id,
            "category": "General",
            "title": id,
            "difficulty": "easy",
            "created_at": Utc::now(),
        });
        if let (Some(target), Some(fields)) = (value.as_object_mut(), content.as_object()) {
            target.extend(fields.clone());
        }
        serde_json::from_value(value).unwrap()
    }

    async fn setup() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let paris = playable(
            "paris",
            json!({
                "kind": "text",
                "prompt": "Capital of France?",
                "answer_mode": "free_text",
                "correct_answer": "Paris"
            }),
        );
        let rome = playable(
            "rome",
            json!({
                "kind": "text",
                "prompt": "Capital of Italy?",
                "answer_mode": "free_text",
                "correct_answer": "Rome"
            }),
        );
        let tower = playable(
            "tower",
            json!({
                "kind": "guess_the_x",
                "hints": ["Iron", "1889", "Paris"],
                "correct_answer": "Eiffel Tower"
            }),
        );
        let chess = playable(
            "chess",
            json!({
                "kind": "chess_mate_in_2",
                "fen": "kbK5/pp6/1P6/8/8/8/8/R7 w - - 0 1",
                "solution": ["Ra6", "bxa6", "b7#"]
            }),
        );
        store
            .insert_category(&Category {
                name: "General".to_string(),
                icon: None,
                color: None,
                playable_count: 0,
            })
            .await
            .unwrap();
        for p in [paris, rome, tower, chess] {
            store.insert_playable(&p).await.unwrap();
        }
        let user = User::new(
            "user_1".to_string(),
            "a@invin.local".to_string(),
            "A".to_string(),
            None,
        );
        store.insert_user(&user).await.unwrap();
        (store, user)
    }

    fn answer(text: &str) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            answer: Some(text.to_string()),
            ..SubmitAnswerRequest::default()
        }
    }

    fn guess(text: &str, hint_number: u32) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            answer: Some(text.to_string()),
            hint_number: Some(hint_number),
            ..SubmitAnswerRequest::default()
        }
    }

    async fn current(store: &MemoryStore, user: &User) -> User {
        store.get_user(&user.user_id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_correct_then_wrong_answer_streaks() {
        let (store, user) = setup().await;
        let policy = GradingPolicy::default();

        let first = submit_answer(&store, &policy, &user, "paris", answer(" PARIS "))
            .await
            .unwrap();
        assert!(first.outcome.correct);
        assert_eq!(first.stats.current_streak, 1);
        assert_eq!(first.stats.best_streak, 1);

        let user = current(&store, &user).await;
        let second = submit_answer(&store, &policy, &user, "rome", answer("Milan"))
            .await
            .unwrap();
        assert!(!second.outcome.correct);
        assert_eq!(second.outcome.correct_answer.as_deref(), Some("Rome"));
        assert_eq!(second.stats.current_streak, 0);
        assert_eq!(second.stats.best_streak, 1);
        assert_eq!(second.stats.total_played, 2);
        assert_eq!(second.stats.correct_answers, 1);
    }

    #[tokio::test]
    async fn test_second_submission_conflicts_without_stat_change() {
        let (store, user) = setup().await;
        let policy = GradingPolicy::default();

        submit_answer(&store, &policy, &user, "paris", answer("Paris"))
            .await
            .unwrap();
        let err = submit_answer(&store, &policy, &user, "paris", answer("Paris"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let user = current(&store, &user).await;
        assert_eq!(user.stats.total_played, 1);
    }

    #[tokio::test]
    async fn test_guess_records_once_with_hints_used() {
        let (store, user) = setup().await;
        let policy = GradingPolicy::default();

        for hint in [1, 2] {
            let result = submit_answer(&store, &policy, &user, "tower", guess("Big Ben", hint))
                .await
                .unwrap();
            assert!(!result.outcome.conclusive);
            assert_eq!(result.outcome.next_hint, Some(hint + 1));
            assert_eq!(result.outcome.correct_answer, None);
            assert_eq!(result.stats.total_played, 0);
        }
        assert!(store.seen_playable_ids(&user.user_id).await.unwrap().is_empty());

        let result = submit_answer(&store, &policy, &user, "tower", guess("eiffel tower", 3))
            .await
            .unwrap();
        assert!(result.outcome.correct);
        assert_eq!(result.outcome.hints_used, Some(3));
        assert_eq!(result.stats.total_played, 1);

        let record = store
            .get_progress(&user.user_id, "tower")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.hints_used, Some(3));
        assert!(record.correct);
    }

    #[tokio::test]
    async fn test_chess_result_trusts_solved_flag() {
        let (store, user) = setup().await;
        let request = SubmitAnswerRequest {
            solved: Some(true),
            moves_used: Some(2),
            ..SubmitAnswerRequest::default()
        };

        let result = submit_answer(&store, &GradingPolicy::default(), &user, "chess", request)
            .await
            .unwrap();
        assert!(result.outcome.correct);
        assert_eq!(result.outcome.moves_used, Some(2));
        assert_eq!(result.outcome.correct_answer.as_deref(), Some("Ra6 bxa6 b7#"));
    }

    #[tokio::test]
    async fn test_missing_fields_are_bad_requests() {
        let (store, user) = setup().await;
        let policy = GradingPolicy::default();

        let err = submit_answer(&store, &policy, &user, "tower", answer("Eiffel Tower"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = submit_answer(&store, &policy, &user, "chess", answer("Ra6"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = submit_answer(&store, &policy, &user, "tower", guess("Eiffel Tower", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_unknown_playable_is_not_found() {
        let (store, user) = setup().await;
        let err = submit_answer(&store, &GradingPolicy::default(), &user, "nope", answer("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_skip_keeps_streak_and_excludes() {
        let (store, user) = setup().await;
        submit_answer(&store, &GradingPolicy::default(), &user, "paris", answer("Paris"))
            .await
            .unwrap();

        let user = current(&store, &user).await;
        let stats = skip(&store, &user, "rome").await.unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.total_played, 1);

        let record = store
            .get_progress(&user.user_id, "rome")
            .await
            .unwrap()
            .unwrap();
        assert!(record.skipped && !record.answered && !record.correct);

        let err = skip(&store, &user, "rome").await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_answers_all_counted() {
        let (store, user) = setup().await;
        let store = Arc::new(store);
        let ids: Vec<String> = (0..16).map(|i| format!("capital_{i}")).collect();
        for id in &ids {
            let p = playable(
                id,
                json!({
                    "kind": "text",
                    "prompt": "Capital of France?",
                    "answer_mode": "free_text",
                    "correct_answer": "Paris"
                }),
            );
            store.insert_playable(&p).await.unwrap();
        }

        let handles: Vec<_> = ids
            .iter()
            .cloned()
            .map(|id| {
                let store = Arc::clone(&store);
                let user = user.clone();
                tokio::spawn(async move {
                    let policy = GradingPolicy::default();
                    submit_answer(store.as_ref(), &policy, &user, &id, answer("Paris")).await
                })
            })
            .collect();
        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert!(result.outcome.correct);
        }

        let stats = current(&store, &user).await.stats;
        assert_eq!(stats.total_played, 16);
        assert_eq!(stats.correct_answers, 16);
        assert_eq!(stats.current_streak, 16);
        assert_eq!(stats.best_streak, 16);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_counted_once() {
        let (store, user) = setup().await;
        let store = Arc::new(store);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                let user = user.clone();
                tokio::spawn(async move {
                    let policy = GradingPolicy::default();
                    submit_answer(store.as_ref(), &policy, &user, "paris", answer("Paris")).await
                })
            })
            .collect();
        let mut accepted = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(ApiError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!((accepted, conflicts), (1, 1));

        let stats = current(&store, &user).await.stats;
        assert_eq!(stats.total_played, 1);
        assert_eq!(stats.current_streak, 1);
    }
}
