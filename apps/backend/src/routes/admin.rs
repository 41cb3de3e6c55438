//! Admin endpoints for playables, categories and seeding

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::Result;
use crate::models::*;
use crate::services::{catalog, seed as seeding};
use crate::AppState;

/// GET /api/admin/playables
pub async fn list_playables(State(state): State<AppState>) -> Result<Json<PlayablesResponse>> {
    let playables = state.store.list_playables().await?;
    Ok(Json(PlayablesResponse {
        count: playables.len(),
        playables,
    }))
}

/// POST /api/admin/playables
pub async fn create_playable(
    State(state): State<AppState>,
    Json(draft): Json<PlayableDraft>,
) -> Result<(StatusCode, Json<Playable>)> {
    let playable = catalog::create_playable(state.store.as_ref(), draft).await?;
    Ok((StatusCode::CREATED, Json(playable)))
}

/// GET /api/admin/playables/:id
pub async fn get_playable(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Playable>> {
    let playable = catalog::get_playable(state.store.as_ref(), &id).await?;
    Ok(Json(playable))
}

/// PUT /api/admin/playables/:id
pub async fn replace_playable(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<PlayableDraft>,
) -> Result<Json<Playable>> {
    let playable = catalog::replace_playable(state.store.as_ref(), &id, draft).await?;
    Ok(Json(playable))
}

/// DELETE /api/admin/playables/:id
pub async fn delete_playable(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    catalog::delete_playable(state.store.as_ref(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/playables/bulk
pub async fn bulk_import(
    State(state): State<AppState>,
    Json(payload): Json<BulkImportRequest>,
) -> Result<Json<BulkImportResponse>> {
    let report = catalog::bulk_import(state.store.as_ref(), payload.rows).await?;
    Ok(Json(report))
}

/// POST /api/admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = catalog::create_category(state.store.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/admin/categories/:name
pub async fn update_category(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>> {
    let category = catalog::update_category(state.store.as_ref(), &name, payload).await?;
    Ok(Json(category))
}

/// DELETE /api/admin/categories/:name
pub async fn delete_category(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode> {
    catalog::delete_category(state.store.as_ref(), &name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/seed
pub async fn seed(State(state): State<AppState>) -> Result<Json<SeedResponse>> {
    let report = seeding::seed(state.store.as_ref()).await?;
    Ok(Json(report))
}
