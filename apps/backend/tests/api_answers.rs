//! Answer, skip and stats API tests.

mod common;

use axum::http::{header::AUTHORIZATION, StatusCode};
use axum_test::{TestResponse, TestServer};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use common::fixtures;
use common::TestContext;
use invin_backend::config::Config;
use invin_backend::services::sessions::{self, Identity};

async fn answer(server: &TestServer, token: &str, id: &str, body: Value) -> TestResponse {
    server
        .post(&format!("/api/playables/{id}/answer"))
        .add_header(AUTHORIZATION, TestContext::auth_header_value(token))
        .json(&body)
        .await
}

async fn stats(server: &TestServer, token: &str) -> Value {
    let response = server
        .get("/api/user/stats")
        .add_header(AUTHORIZATION, TestContext::auth_header_value(token))
        .await;
    response.assert_status_ok();
    response.json()
}

/// Test a right answer then a wrong one moves the streak and keeps the best.
#[tokio::test]
async fn test_text_answers_update_streaks() {
    let ctx = TestContext::new();
    ctx.add_playables(&[
        fixtures::playable(
            "capital_fr",
            fixtures::text_draft("Geography", "Capital of France?", "Paris"),
        ),
        fixtures::playable(
            "capital_it",
            fixtures::text_draft("Geography", "Capital of Italy?", "Rome"),
        ),
    ])
    .await;
    let server = ctx.server();
    let token = TestContext::login(&server, "player@invin.local").await;

    let response = answer(&server, &token, "capital_fr", json!({ "answer": "  paris " })).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["correct"], true);
    assert_eq!(body["conclusive"], true);
    assert_eq!(body["reveal_answer"], true);
    assert_eq!(body["correct_answer"], "Paris");
    assert_eq!(body["total_played"], 1);
    assert_eq!(body["correct_answers"], 1);
    assert_eq!(body["current_streak"], 1);
    assert_eq!(body["best_streak"], 1);

    let response = answer(&server, &token, "capital_it", json!({ "answer": "Milan" })).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["correct"], false);
    assert_eq!(body["correct_answer"], "Rome");
    assert_eq!(body["total_played"], 2);
    assert_eq!(body["correct_answers"], 1);
    assert_eq!(body["current_streak"], 0);
    assert_eq!(body["best_streak"], 1);

    let body = stats(&server, &token).await;
    assert_eq!(body["accuracy"], 50.0);
    assert_eq!(body["skipped"], 0);
}

/// Test a second conclusive submission is rejected without touching stats.
#[tokio::test]
async fn test_second_submission_conflicts() {
    let ctx = TestContext::new();
    ctx.add_playables(&[fixtures::text_playable("q1", "Science", "Oxygen")])
        .await;
    let server = ctx.server();
    let token = TestContext::login(&server, "player@invin.local").await;

    answer(&server, &token, "q1", json!({ "answer": "Oxygen" }))
        .await
        .assert_status_ok();

    let response = answer(&server, &token, "q1", json!({ "answer": "Oxygen" })).await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "conflict");

    let body = stats(&server, &token).await;
    assert_eq!(body["total_played"], 1);
    assert_eq!(body["current_streak"], 1);
}

/// Test wrong guesses reveal hints until the third one lands.
#[tokio::test]
async fn test_guess_the_x_hint_progression() {
    let ctx = TestContext::new();
    ctx.add_playables(&[fixtures::guess_playable("landmark")]).await;
    let server = ctx.server();
    let token = TestContext::login(&server, "player@invin.local").await;

    let response = answer(
        &server,
        &token,
        "landmark",
        json!({ "answer": "Big Ben", "hint_number": 1 }),
    )
    .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["correct"], false);
    assert_eq!(body["conclusive"], false);
    assert_eq!(body["reveal_answer"], false);
    assert_eq!(body["next_hint"], 2);
    assert!(body.get("correct_answer").is_none());
    assert_eq!(body["total_played"], 0);

    let body: Value = answer(
        &server,
        &token,
        "landmark",
        json!({ "answer": "Louvre", "hint_number": 2 }),
    )
    .await
    .json();
    assert_eq!(body["next_hint"], 3);
    assert_eq!(body["total_played"], 0);

    let response = answer(
        &server,
        &token,
        "landmark",
        json!({ "answer": "eiffel tower", "hint_number": 3 }),
    )
    .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["correct"], true);
    assert_eq!(body["conclusive"], true);
    assert_eq!(body["hints_used"], 3);
    assert_eq!(body["correct_answer"], "Eiffel Tower");
    assert_eq!(body["total_played"], 1);
    assert_eq!(body["correct_answers"], 1);

    let response = answer(
        &server,
        &token,
        "landmark",
        json!({ "answer": "eiffel tower", "hint_number": 3 }),
    )
    .await;
    response.assert_status(StatusCode::CONFLICT);
}

/// Test missing the last hint finalizes the guess as wrong.
#[tokio::test]
async fn test_guess_the_x_out_of_hints() {
    let ctx = TestContext::new();
    ctx.add_playables(&[fixtures::guess_playable("landmark")]).await;
    let server = ctx.server();
    let token = TestContext::login(&server, "player@invin.local").await;

    let body: Value = answer(
        &server,
        &token,
        "landmark",
        json!({ "answer": "Colosseum", "hint_number": 3 }),
    )
    .await
    .json();

    assert_eq!(body["correct"], false);
    assert_eq!(body["conclusive"], true);
    assert_eq!(body["correct_answer"], "Eiffel Tower");
    assert_eq!(body["total_played"], 1);
    assert_eq!(body["current_streak"], 0);
}

/// Test chess results are taken as reported by the client.
#[tokio::test]
async fn test_chess_result() {
    let ctx = TestContext::new();
    ctx.add_playables(&[fixtures::chess_playable("morphy")]).await;
    let server = ctx.server();
    let token = TestContext::login(&server, "player@invin.local").await;

    let response = answer(
        &server,
        &token,
        "morphy",
        json!({ "solved": true, "moves_used": 2 }),
    )
    .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["correct"], true);
    assert_eq!(body["moves_used"], 2);
    assert_eq!(body["correct_answer"], "Ra6 bxa6 b7#");
    assert_eq!(body["current_streak"], 1);
}

/// Test this_or_that compares the picked label.
#[tokio::test]
async fn test_this_or_that() {
    let ctx = TestContext::new();
    ctx.add_playables(&[
        fixtures::this_or_that_playable("planets_a"),
        fixtures::this_or_that_playable("planets_b"),
    ])
    .await;
    let server = ctx.server();
    let token = TestContext::login(&server, "player@invin.local").await;

    let body: Value = answer(&server, &token, "planets_a", json!({ "answer": "jupiter" }))
        .await
        .json();
    assert_eq!(body["correct"], true);

    let body: Value = answer(&server, &token, "planets_b", json!({ "answer": "Saturn" }))
        .await
        .json();
    assert_eq!(body["correct"], false);
    assert_eq!(body["correct_answer"], "Jupiter");
}

/// Test submissions that do not fit the playable are rejected.
#[tokio::test]
async fn test_malformed_submissions() {
    let ctx = TestContext::new();
    ctx.add_playables(&[
        fixtures::text_playable("q1", "Science", "Oxygen"),
        fixtures::guess_playable("landmark"),
        fixtures::chess_playable("morphy"),
    ])
    .await;
    let server = ctx.server();
    let token = TestContext::login(&server, "player@invin.local").await;

    let cases = [
        ("q1", json!({})),
        ("q1", json!({ "solved": true })),
        ("landmark", json!({ "answer": "Eiffel Tower" })),
        ("landmark", json!({ "answer": "Eiffel Tower", "hint_number": 0 })),
        ("morphy", json!({ "answer": "Ra6" })),
    ];
    for (id, body) in cases {
        let response = answer(&server, &token, id, body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    let body = stats(&server, &token).await;
    assert_eq!(body["total_played"], 0);
}

/// Test answering an unknown playable.
#[tokio::test]
async fn test_unknown_playable() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let token = TestContext::login(&server, "player@invin.local").await;

    let response = answer(&server, &token, "missing", json!({ "answer": "x" })).await;

    response.assert_status(StatusCode::NOT_FOUND);
}

/// Test skipping counts separately and does not break the streak.
#[tokio::test]
async fn test_skip() {
    let ctx = TestContext::new();
    ctx.add_playables(&[
        fixtures::text_playable("q1", "Science", "Oxygen"),
        fixtures::text_playable("q2", "Science", "Carbon"),
    ])
    .await;
    let server = ctx.server();
    let token = TestContext::login(&server, "player@invin.local").await;

    answer(&server, &token, "q1", json!({ "answer": "Oxygen" }))
        .await
        .assert_status_ok();

    let response = server
        .post("/api/playables/q2/skip")
        .add_header(AUTHORIZATION, TestContext::auth_header_value(&token))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["playable_id"], "q2");
    assert_eq!(body["stats"]["skipped"], 1);
    assert_eq!(body["stats"]["total_played"], 1);
    assert_eq!(body["stats"]["current_streak"], 1);

    let response = server
        .post("/api/playables/q2/skip")
        .add_header(AUTHORIZATION, TestContext::auth_header_value(&token))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let response = answer(&server, &token, "q2", json!({ "answer": "Carbon" })).await;
    response.assert_status(StatusCode::CONFLICT);
}

/// Test stats are per user.
#[tokio::test]
async fn test_stats_are_per_user() {
    let ctx = TestContext::new();
    ctx.add_playables(&[fixtures::text_playable("q1", "Science", "Oxygen")])
        .await;
    let server = ctx.server();
    let alice = TestContext::login(&server, "alice@invin.local").await;
    let bob = TestContext::login(&server, "bob@invin.local").await;

    answer(&server, &alice, "q1", json!({ "answer": "Oxygen" }))
        .await
        .assert_status_ok();
    answer(&server, &bob, "q1", json!({ "answer": "Nitrogen" }))
        .await
        .assert_status_ok();

    let body = stats(&server, &alice).await;
    assert_eq!(body["accuracy"], 100.0);
    let body = stats(&server, &bob).await;
    assert_eq!(body["accuracy"], 0.0);
    assert_eq!(body["total_played"], 1);
}

/// Test resetting progress clears stats and returns playables to the feed.
#[tokio::test]
async fn test_reset_progress() {
    let ctx = TestContext::new();
    ctx.add_playables(&[
        fixtures::text_playable("q1", "Science", "Oxygen"),
        fixtures::text_playable("q2", "Science", "Carbon"),
    ])
    .await;
    let server = ctx.server();
    let token = TestContext::login(&server, "player@invin.local").await;

    answer(&server, &token, "q1", json!({ "answer": "Oxygen" }))
        .await
        .assert_status_ok();
    server
        .post("/api/playables/q2/skip")
        .add_header(AUTHORIZATION, TestContext::auth_header_value(&token))
        .await
        .assert_status_ok();

    let response = server
        .delete("/api/user/progress")
        .add_header(AUTHORIZATION, TestContext::auth_header_value(&token))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["records_deleted"], 2);

    let body = stats(&server, &token).await;
    assert_eq!(body["total_played"], 0);
    assert_eq!(body["skipped"], 0);
    assert_eq!(body["best_streak"], 0);

    let body: Value = server
        .get("/api/playables/feed")
        .add_header(AUTHORIZATION, TestContext::auth_header_value(&token))
        .await
        .json();
    assert_eq!(body["count"], 2);
}

/// Test progress reset is refused outside dev mode.
#[tokio::test]
async fn test_reset_progress_disabled() {
    let ctx = TestContext::with_config(Config {
        dev_mode: false,
        ..fixtures::test_config()
    });
    let server = ctx.server();
    let issued = sessions::login(
        ctx.store.as_ref(),
        Identity {
            email: "reset@invin.local".to_string(),
            name: "Reset".to_string(),
            picture: None,
        },
        chrono::Duration::days(1),
        "session_",
    )
    .await
    .unwrap();

    let response = server
        .delete("/api/user/progress")
        .add_header(AUTHORIZATION, TestContext::auth_header_value(&issued.token))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}
