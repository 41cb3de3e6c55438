//! Feed assembly over a store

use invin_core::feed::order_curated;
use invin_core::{CuratedSequence, Playable, SampleFilter, User};

use crate::config::Config;
use crate::db::Store;
use crate::error::{ApiError, Result};

/// Resolve the requested page size: absent takes the default, 0 is rejected,
/// anything else is clamped to the configured maximum.
pub fn page_size(requested: Option<usize>, config: &Config) -> Result<usize> {
    match requested {
        None => Ok(config.feed_default_page_size),
        Some(0) => Err(ApiError::BadRequest("limit must be at least 1".to_string())),
        Some(n) => Ok(n.min(config.feed_max_page_size)),
    }
}

/// Up to `page_size` playables the user has not seen: unseen curated ones
/// first in curated order, then a random sample of the rest.
pub async fn get_feed(
    store: &dyn Store,
    curated: &CuratedSequence,
    user: &User,
    page_size: usize,
) -> Result<Vec<Playable>> {
    let seen = store.seen_playable_ids(&user.user_id).await?;

    let unseen: Vec<String> = curated.unseen(&seen).map(str::to_string).collect();
    let mut page = if unseen.is_empty() {
        Vec::new()
    } else {
        let found = store.get_playables(&unseen).await?;
        order_curated(&unseen, found, page_size)
    };

    let curated_count = page.len();
    if curated_count < page_size {
        let filter = SampleFilter::new(curated, &seen, user);
        let sampled = store
            .sample_playables(&filter, page_size - curated_count)
            .await?;
        page.extend(sampled);
    }

    tracing::debug!(
        user_id = %user.user_id,
        curated = curated_count,
        total = page.len(),
        "Feed assembled"
    );

    Ok(page)
}
