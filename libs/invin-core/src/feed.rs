//! Feed selection.
//!
//! A page is the user's unseen part of the curated sequence, in curated
//! order, topped up with a uniform random sample of everything else the
//! user has not seen. The store does the sampling; this module decides what
//! is eligible and in which order pieces are assembled.

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::playable::Playable;
use crate::types::User;

/// Hand-ordered onboarding ids shared by every user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CuratedSequence {
    ids: Vec<String>,
}

impl CuratedSequence {
    /// Build from ids, dropping blanks and repeats (first occurrence wins).
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let ids = ids
            .into_iter()
            .map(|id| id.into().trim().to_string())
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();
        Self { ids }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|curated| curated == id)
    }

    /// Curated ids the user has no progress record for, curated order kept.
    pub fn unseen<'a>(&'a self, seen: &'a HashSet<String>) -> impl Iterator<Item = &'a str> + 'a {
        self.ids
            .iter()
            .filter(move |id| !seen.contains(id.as_str()))
            .map(String::as_str)
    }
}

impl From<Vec<String>> for CuratedSequence {
    fn from(ids: Vec<String>) -> Self {
        Self::new(ids)
    }
}

impl From<CuratedSequence> for Vec<String> {
    fn from(sequence: CuratedSequence) -> Self {
        sequence.ids
    }
}

/// Which playables may fill the random part of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleFilter {
    /// Ids never to return: the curated sequence plus everything seen.
    pub exclude: HashSet<String>,
    /// Lowercased category names, `None` for every category.
    pub categories: Option<Vec<String>>,
}

impl SampleFilter {
    pub fn new(curated: &CuratedSequence, seen: &HashSet<String>, user: &User) -> Self {
        let mut exclude: HashSet<String> = seen.clone();
        exclude.extend(curated.ids().iter().cloned());
        Self {
            exclude,
            categories: category_scope(user),
        }
    }

    pub fn admits(&self, playable: &Playable) -> bool {
        if self.exclude.contains(&playable.id) {
            return false;
        }
        match &self.categories {
            Some(categories) => {
                let category = playable.category.to_lowercase();
                categories.iter().any(|c| *c == category)
            }
            None => true,
        }
    }
}

/// Categories the random pool is restricted to, if the user finished
/// onboarding with a non-empty selection.
pub fn category_scope(user: &User) -> Option<Vec<String>> {
    if !user.onboarding_complete || user.selected_categories.is_empty() {
        return None;
    }
    Some(
        user.selected_categories
            .iter()
            .map(|c| c.trim().to_lowercase())
            .collect(),
    )
}

/// Arrange fetched curated playables in curated order, up to `limit`.
/// Ids the store no longer has are skipped.
pub fn order_curated(ids: &[String], found: Vec<Playable>, limit: usize) -> Vec<Playable> {
    let mut by_id: HashMap<String, Playable> = found.into_iter().map(|p| (p.id.clone(), p)).collect();
    ids.iter()
        .filter_map(|id| by_id.remove(id))
        .take(limit)
        .collect()
}

/// Uniform sample of up to `n` items without replacement.
pub fn sample_uniform<T, R>(pool: &[T], n: usize, rng: &mut R) -> Vec<T>
where
    T: Clone,
    R: Rng + ?Sized,
{
    pool.choose_multiple(rng, n).cloned().collect()
}
