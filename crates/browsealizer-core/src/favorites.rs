use crate::models::{RepoId, Repository};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A saved repository. Just enough to list it and open it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    pub id: RepoId,
    pub name: String,
    pub url: String,
    pub language: Option<String>,
    #[serde(default)]
    pub stars: u32,
    pub added_at: DateTime<Utc>,
}

impl FavoriteEntry {
    pub fn from_repository(repo: &Repository, added_at: DateTime<Utc>) -> Self {
        Self {
            id: repo.id,
            name: repo.full_name.clone(),
            url: repo.url.clone(),
            language: repo.language.clone(),
            stars: repo.stars,
            added_at,
        }
    }
}

/// Insertion-ordered set of favorites, at most one entry per repository.
///
/// Mutators report whether anything changed so the owner knows when a
/// write-back is due.
#[derive(Debug, Clone, Default)]
pub struct FavoritesStore {
    entries: Vec<FavoriteEntry>,
}

impl FavoritesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted entries, dropping any duplicate identities
    pub fn from_entries(entries: Vec<FavoriteEntry>) -> Self {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .filter(|entry| seen.insert(entry.id))
            .collect();
        Self { entries }
    }

    pub fn add(&mut self, repo: &Repository) -> bool {
        self.add_at(repo, Utc::now())
    }

    pub fn add_at(&mut self, repo: &Repository, added_at: DateTime<Utc>) -> bool {
        if self.contains(repo.id) {
            return false;
        }
        self.entries
            .push(FavoriteEntry::from_repository(repo, added_at));
        true
    }

    pub fn remove(&mut self, id: RepoId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn contains(&self, id: RepoId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    pub fn get(&self, id: RepoId) -> Option<&FavoriteEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Find by "owner/name", case-insensitively like GitHub does
    pub fn find_by_name(&self, full_name: &str) -> Option<&FavoriteEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(full_name))
    }

    /// Favorites in the order they were added
    pub fn list(&self) -> &[FavoriteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
