//! Per-user endpoints: stats, onboarding selection, progress reset

use axum::{extract::State, Extension, Json};
use invin_core::ValidationError;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

/// GET /api/user/stats
pub async fn stats(Extension(auth): Extension<AuthenticatedUser>) -> Json<StatsResponse> {
    Json(auth.user.stats.into())
}

/// PUT /api/user/categories
pub async fn select_categories(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(payload): Json<SelectCategoriesRequest>,
) -> Result<Json<UserProfile>> {
    // Stored under the category's own spelling, first occurrence wins
    let mut selected: Vec<String> = Vec::new();
    for name in payload.categories {
        let category = state
            .store
            .get_category(name.trim())
            .await?
            .ok_or_else(|| ValidationError::UnknownCategory(name.clone()))?;
        if !selected.contains(&category.name) {
            selected.push(category.name);
        }
    }

    let user = state
        .store
        .set_selected_categories(&auth.user.user_id, &selected)
        .await?;
    tracing::info!(
        user_id = %user.user_id,
        categories = ?user.selected_categories,
        "Onboarding categories saved"
    );

    Ok(Json(UserProfile::from(&user)))
}

/// DELETE /api/user/progress
pub async fn reset_progress(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<ResetProgressResponse>> {
    if !state.config.dev_mode {
        return Err(ApiError::Forbidden("Progress reset is disabled".to_string()));
    }

    let records_deleted = state.store.reset_progress(&auth.user.user_id).await?;
    tracing::info!(user_id = %auth.user.user_id, records_deleted, "Progress reset");

    Ok(Json(ResetProgressResponse { records_deleted }))
}
