//! Feed and answer endpoints

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use crate::error::Result;
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::services::{answers, feed as feed_service};
use crate::AppState;

/// GET /api/playables/feed
pub async fn feed(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>> {
    let page_size = feed_service::page_size(query.limit, &state.config)?;
    let page = feed_service::get_feed(
        state.store.as_ref(),
        &state.config.curated,
        &auth.user,
        page_size,
    )
    .await?;

    let playables: Vec<PlayableView> = page.iter().map(Playable::view).collect();
    Ok(Json(FeedResponse {
        count: playables.len(),
        playables,
    }))
}

/// POST /api/playables/:id/answer
pub async fn answer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(playable_id): Path<String>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<AnswerResponse>> {
    let result = answers::submit_answer(
        state.store.as_ref(),
        &state.config.grading,
        &auth.user,
        &playable_id,
        payload,
    )
    .await?;

    Ok(Json(AnswerResponse {
        outcome: result.outcome,
        stats: result.stats.into(),
    }))
}

/// POST /api/playables/:id/skip
pub async fn skip(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(playable_id): Path<String>,
) -> Result<Json<SkipResponse>> {
    let stats = answers::skip(state.store.as_ref(), &auth.user, &playable_id).await?;

    Ok(Json(SkipResponse {
        playable_id,
        stats: stats.into(),
    }))
}
