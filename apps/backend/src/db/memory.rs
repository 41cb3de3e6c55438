//! In-process store, used for tests and when no database is configured

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use invin_core::{Category, Playable, ProgressRecord, SampleFilter, User, UserStats};

use super::{Store, StoreError, StoreResult};
use crate::models::Session;

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    sessions: HashMap<String, Session>,
    /// Keyed by lowercased name
    categories: HashMap<String, Category>,
    playables: HashMap<String, Playable>,
    /// user_id -> playable_id -> record
    progress: HashMap<String, HashMap<String, ProgressRecord>>,
}

impl Inner {
    fn ensure_category(&self, name: &str) -> StoreResult<()> {
        if self.categories.contains_key(&name.to_lowercase()) {
            Ok(())
        } else {
            Err(StoreError::UnknownCategory(name.to_string()))
        }
    }

    fn playable_count(&self, category: &str) -> u64 {
        let key = category.to_lowercase();
        self.playables
            .values()
            .filter(|p| p.category.to_lowercase() == key)
            .count() as u64
    }

    fn with_count(&self, category: &Category) -> Category {
        Category {
            playable_count: self.playable_count(&category.name),
            ..category.clone()
        }
    }

    fn user_mut(&mut self, user_id: &str) -> StoreResult<&mut User> {
        self.users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))
    }
}

/// Every operation runs under one lock, so `record_outcome` is atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `StoreError::Unavailable` until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.get(user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.to_lowercase();
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let email = user.email.to_lowercase();
        if inner.users.contains_key(&user.user_id)
            || inner.users.values().any(|u| u.email.to_lowercase() == email)
        {
            return Err(StoreError::Conflict(format!("user {} already exists", user.email)));
        }
        inner.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn set_selected_categories(
        &self,
        user_id: &str,
        categories: &[String],
    ) -> StoreResult<User> {
        let mut inner = self.lock()?;
        let user = inner.user_mut(user_id)?;
        user.selected_categories = categories.to_vec();
        user.onboarding_complete = true;
        Ok(user.clone())
    }

    async fn reset_progress(&self, user_id: &str) -> StoreResult<u64> {
        let mut inner = self.lock()?;
        inner.user_mut(user_id)?.stats = UserStats::default();
        let removed = inner
            .progress
            .remove(user_id)
            .map(|records| records.len() as u64)
            .unwrap_or(0);
        Ok(removed)
    }

    async fn insert_session(&self, session: &Session) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if !inner.users.contains_key(&session.user_id) {
            return Err(StoreError::NotFound(format!("user {}", session.user_id)));
        }
        inner
            .sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        Ok(self.lock()?.sessions.get(token_hash).cloned())
    }

    async fn delete_session(&self, token_hash: &str) -> StoreResult<bool> {
        Ok(self.lock()?.sessions.remove(token_hash).is_some())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let inner = self.lock()?;
        let mut categories: Vec<Category> = inner
            .categories
            .values()
            .map(|c| inner.with_count(c))
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, name: &str) -> StoreResult<Option<Category>> {
        let inner = self.lock()?;
        Ok(inner
            .categories
            .get(&name.to_lowercase())
            .map(|c| inner.with_count(c)))
    }

    async fn count_playables_in_category(&self, name: &str) -> StoreResult<u64> {
        Ok(self.lock()?.playable_count(name))
    }

    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let key = category.name.to_lowercase();
        if inner.categories.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "category {} already exists",
                category.name
            )));
        }
        inner.categories.insert(key, category.clone());
        Ok(())
    }

    async fn update_category(&self, name: &str, category: &Category) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let old_key = name.to_lowercase();
        let new_key = category.name.to_lowercase();
        if !inner.categories.contains_key(&old_key) {
            return Err(StoreError::NotFound(format!("category {name}")));
        }
        if new_key != old_key && inner.categories.contains_key(&new_key) {
            return Err(StoreError::Conflict(format!(
                "category {} already exists",
                category.name
            )));
        }
        inner.categories.remove(&old_key);
        inner.categories.insert(new_key, category.clone());
        Ok(())
    }

    async fn delete_category(&self, name: &str) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let key = name.to_lowercase();
        if !inner.categories.contains_key(&key) {
            return Err(StoreError::NotFound(format!("category {name}")));
        }
        let count = inner.playable_count(name);
        if count > 0 {
            return Err(StoreError::Conflict(format!(
                "category {name} is used by {count} playables"
            )));
        }
        inner.categories.remove(&key);
        Ok(())
    }

    async fn get_playable(&self, id: &str) -> StoreResult<Option<Playable>> {
        Ok(self.lock()?.playables.get(id).cloned())
    }

    async fn get_playables(&self, ids: &[String]) -> StoreResult<Vec<Playable>> {
        let inner = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| inner.playables.get(id).cloned())
            .collect())
    }

    async fn list_playables(&self) -> StoreResult<Vec<Playable>> {
        let mut playables: Vec<Playable> = self.lock()?.playables.values().cloned().collect();
        playables.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(playables)
    }

    async fn count_playables(&self) -> StoreResult<u64> {
        Ok(self.lock()?.playables.len() as u64)
    }

    async fn insert_playable(&self, playable: &Playable) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.ensure_category(&playable.category)?;
        if inner.playables.contains_key(&playable.id) {
            return Err(StoreError::Conflict(format!(
                "playable {} already exists",
                playable.id
            )));
        }
        inner.playables.insert(playable.id.clone(), playable.clone());
        Ok(())
    }

    async fn replace_playable(&self, playable: &Playable) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.ensure_category(&playable.category)?;
        match inner.playables.get_mut(&playable.id) {
            Some(existing) => {
                *existing = playable.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("playable {}", playable.id))),
        }
    }

    async fn delete_playable(&self, id: &str) -> StoreResult<()> {
        self.lock()?
            .playables
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("playable {id}")))
    }

    async fn sample_playables(
        &self,
        filter: &SampleFilter,
        limit: usize,
    ) -> StoreResult<Vec<Playable>> {
        let inner = self.lock()?;
        let mut pool: Vec<&Playable> = inner.playables.values().filter(|p| filter.admits(p)).collect();
        // HashMap order is arbitrary; sort so the sample only depends on the rng
        pool.sort_by(|a, b| a.id.cmp(&b.id));
        let mut rng = rand::thread_rng();
        Ok(invin_core::feed::sample_uniform(&pool, limit, &mut rng)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn seen_playable_ids(&self, user_id: &str) -> StoreResult<HashSet<String>> {
        Ok(self
            .lock()?
            .progress
            .get(user_id)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_progress(
        &self,
        user_id: &str,
        playable_id: &str,
    ) -> StoreResult<Option<ProgressRecord>> {
        Ok(self
            .lock()?
            .progress
            .get(user_id)
            .and_then(|records| records.get(playable_id))
            .cloned())
    }

    async fn record_outcome(&self, record: &ProgressRecord) -> StoreResult<UserStats> {
        let mut inner = self.lock()?;
        let already = inner
            .progress
            .get(&record.user_id)
            .is_some_and(|records| records.contains_key(&record.playable_id));
        if already {
            return Err(StoreError::Conflict(format!(
                "playable {} already resolved",
                record.playable_id
            )));
        }

        let user = inner.user_mut(&record.user_id)?;
        user.stats.apply(record);
        let stats = user.stats;

        inner
            .progress
            .entry(record.user_id.clone())
            .or_default()
            .insert(record.playable_id.clone(), record.clone());
        Ok(stats)
    }
}
