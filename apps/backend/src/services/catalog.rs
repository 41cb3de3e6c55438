//! Admin-side content management: playables and categories

use chrono::{DateTime, Utc};
use invin_core::{Category, Playable, PlayableDraft, ValidationError};
use uuid::Uuid;

use crate::db::Store;
use crate::error::{ApiError, Result};
use crate::models::{BulkImportResponse, CreateCategoryRequest, RowError, UpdateCategoryRequest};

pub fn new_playable_id() -> String {
    format!("play_{}", &Uuid::new_v4().simple().to_string()[..12])
}

/// Validate `draft` and pin its category to the stored spelling.
async fn prepare(
    store: &dyn Store,
    draft: PlayableDraft,
    id: String,
    created_at: DateTime<Utc>,
) -> Result<Playable> {
    let mut playable = draft.into_playable(id, created_at)?;
    let category = store
        .get_category(&playable.category)
        .await?
        .ok_or_else(|| ValidationError::UnknownCategory(playable.category.clone()))?;
    playable.category = category.name;
    Ok(playable)
}

pub async fn get_playable(store: &dyn Store, id: &str) -> Result<Playable> {
    store
        .get_playable(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("playable {id}")))
}

pub async fn create_playable(store: &dyn Store, draft: PlayableDraft) -> Result<Playable> {
    let playable = prepare(store, draft, new_playable_id(), Utc::now()).await?;
    store.insert_playable(&playable).await?;
    tracing::info!(
        playable_id = %playable.id,
        kind = %playable.kind(),
        category = %playable.category,
        "Playable created"
    );
    Ok(playable)
}

/// Replace a playable's definition, keeping its id and creation time.
pub async fn replace_playable(
    store: &dyn Store,
    id: &str,
    draft: PlayableDraft,
) -> Result<Playable> {
    let existing = get_playable(store, id).await?;
    let playable = prepare(store, draft, existing.id, existing.created_at).await?;
    store.replace_playable(&playable).await?;
    tracing::info!(playable_id = %playable.id, "Playable replaced");
    Ok(playable)
}

pub async fn delete_playable(store: &dyn Store, id: &str) -> Result<()> {
    store.delete_playable(id).await?;
    tracing::info!(playable_id = %id, "Playable deleted");
    Ok(())
}

/// Import already-parsed rows. Valid rows are inserted; each invalid row is
/// reported by index and nothing else about the batch changes.
pub async fn bulk_import(
    store: &dyn Store,
    rows: Vec<serde_json::Value>,
) -> Result<BulkImportResponse> {
    let mut response = BulkImportResponse::default();

    for (index, row) in rows.into_iter().enumerate() {
        let draft: PlayableDraft = match serde_json::from_value(row) {
            Ok(draft) => draft,
            Err(e) => {
                response.errors.push(RowError {
                    index,
                    message: format!("malformed row: {e}"),
                });
                continue;
            }
        };

        let prepared = prepare(store, draft, new_playable_id(), Utc::now()).await;
        let outcome = match prepared {
            Ok(playable) => {
                let inserted = store.insert_playable(&playable).await;
                inserted.map(|()| playable.id).map_err(ApiError::from)
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(id) => response.playable_ids.push(id),
            Err(e @ (ApiError::Validation(_) | ApiError::Conflict(_))) => {
                response.errors.push(RowError {
                    index,
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    response.imported = response.playable_ids.len();
    tracing::info!(
        imported = response.imported,
        rejected = response.errors.len(),
        "Bulk import finished"
    );
    Ok(response)
}

// === Categories ===

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("category name must not be blank".to_string()));
    }
    Ok(name.to_string())
}

pub async fn create_category(
    store: &dyn Store,
    request: CreateCategoryRequest,
) -> Result<Category> {
    let category = Category {
        name: clean_name(&request.name)?,
        icon: request.icon,
        color: request.color,
        playable_count: 0,
    };
    store.insert_category(&category).await?;
    tracing::info!(category = %category.name, "Category created");
    Ok(category)
}

/// Update icon, color or name. Renaming is refused while playables still use
/// the old name, unless only letter case changes.
pub async fn update_category(
    store: &dyn Store,
    name: &str,
    request: UpdateCategoryRequest,
) -> Result<Category> {
    let existing = store
        .get_category(name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("category {name}")))?;

    let new_name = match request.name {
        Some(raw) => clean_name(&raw)?,
        None => existing.name.clone(),
    };
    if new_name.to_lowercase() != existing.name.to_lowercase() && existing.playable_count > 0 {
        return Err(ApiError::Conflict(format!(
            "category {} is used by {} playables",
            existing.name, existing.playable_count
        )));
    }

    let updated = Category {
        name: new_name,
        icon: request.icon.or(existing.icon),
        color: request.color.or(existing.color),
        playable_count: existing.playable_count,
    };
    store.update_category(&existing.name, &updated).await?;
    tracing::info!(from = %existing.name, to = %updated.name, "Category updated");
    Ok(updated)
}

pub async fn delete_category(store: &dyn Store, name: &str) -> Result<()> {
    store.delete_category(name).await?;
    tracing::info!(category = %name, "Category deleted");
    Ok(())
}
