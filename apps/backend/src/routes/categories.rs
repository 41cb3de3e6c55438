//! Category listing

use axum::{extract::State, Json};

use crate::error::Result;
use crate::models::*;
use crate::AppState;

/// GET /api/categories
pub async fn list(State(state): State<AppState>) -> Result<Json<CategoriesResponse>> {
    let categories = state.store.list_categories().await?;
    Ok(Json(CategoriesResponse { categories }))
}
