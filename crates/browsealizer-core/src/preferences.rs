// User preferences - one JSON record holding settings and favorites
use crate::favorites::{FavoriteEntry, FavoritesStore};
use crate::models::{RepoId, Repository};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Anything faster than this and the popups turn into a strobe light
pub const MIN_RECOMMENDATION_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl std::str::FromStr for ViewMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "grid" => Ok(ViewMode::Grid),
            "list" => Ok(ViewMode::List),
            other => Err(Error::ConfigError(format!("Unknown view mode: {}", other))),
        }
    }
}

/// The on-disk shape of the record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub dark_mode: bool,
    pub show_recommendations: bool,
    /// Milliseconds each recommendation stays up
    pub recommendation_frequency: u64,
    pub view: ViewMode,
    pub favorites: Vec<FavoriteEntry>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            dark_mode: false,
            show_recommendations: true,
            recommendation_frequency: 10_000,
            view: ViewMode::Grid,
            favorites: Vec::new(),
        }
    }
}

/// Durable key-value slot for the record
#[cfg_attr(test, mockall::automock)]
pub trait StateStorage: Send {
    fn load(&self) -> Result<Option<PersistedState>>;
    fn save(&self, state: &PersistedState) -> Result<()>;
}

/// Stores the record as pretty JSON in a single file
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl StateStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<PersistedState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let state = serde_json::from_str(&contents)?;
        Ok(Some(state))
    }

    fn save(&self, state: &PersistedState) -> Result<()> {
        // Create directory if it doesn't exist
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, contents).map_err(|e| {
            Error::StorageError(format!("Failed to write {}: {}", self.path.display(), e))
        })
    }
}

/// Settings + favorites, written back after every change
pub struct Preferences {
    storage: Box<dyn StateStorage>,
    dark_mode: bool,
    show_recommendations: bool,
    recommendation_interval: Duration,
    view: ViewMode,
    favorites: FavoritesStore,
}

impl Preferences {
    /// Read the record once. A broken record is logged and replaced by defaults.
    pub fn load(storage: Box<dyn StateStorage>, default_interval: Duration) -> Self {
        let state = match storage.load() {
            Ok(Some(state)) => {
                debug!("Loaded preferences with {} favorites", state.favorites.len());
                state
            }
            Ok(None) => PersistedState {
                recommendation_frequency: default_interval.as_millis() as u64,
                ..PersistedState::default()
            },
            Err(e) => {
                warn!("Error loading saved state, using defaults: {}", e);
                PersistedState {
                    recommendation_frequency: default_interval.as_millis() as u64,
                    ..PersistedState::default()
                }
            }
        };

        Self {
            storage,
            dark_mode: state.dark_mode,
            show_recommendations: state.show_recommendations,
            recommendation_interval: Duration::from_millis(state.recommendation_frequency)
                .max(MIN_RECOMMENDATION_INTERVAL),
            view: state.view,
            favorites: FavoritesStore::from_entries(state.favorites),
        }
    }

    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            dark_mode: self.dark_mode,
            show_recommendations: self.show_recommendations,
            recommendation_frequency: self.recommendation_interval.as_millis() as u64,
            view: self.view,
            favorites: self.favorites.list().to_vec(),
        }
    }

    fn persist(&self) -> Result<()> {
        self.storage.save(&self.snapshot())
    }

    fn restore(&mut self, state: PersistedState) {
        self.dark_mode = state.dark_mode;
        self.show_recommendations = state.show_recommendations;
        self.recommendation_interval = Duration::from_millis(state.recommendation_frequency);
        self.view = state.view;
        self.favorites = FavoritesStore::from_entries(state.favorites);
    }

    /// Apply `change` and write the record. If the write fails the change is
    /// undone, so memory never holds anything the disk doesn't.
    fn update(&mut self, change: impl FnOnce(&mut Self) -> bool) -> Result<bool> {
        let before = self.snapshot();
        if !change(self) {
            return Ok(false);
        }

        if let Err(e) = self.persist() {
            warn!("Failed to save preferences, keeping previous state: {}", e);
            self.restore(before);
            return Err(e);
        }
        Ok(true)
    }

    /// Returns false (and writes nothing) when it was already a favorite
    pub fn add_favorite(&mut self, repo: &Repository) -> Result<bool> {
        self.update(|prefs| prefs.favorites.add(repo))
    }

    /// Returns false (and writes nothing) when it wasn't a favorite
    pub fn remove_favorite(&mut self, id: RepoId) -> Result<bool> {
        self.update(|prefs| prefs.favorites.remove(id))
    }

    pub fn is_favorite(&self, id: RepoId) -> bool {
        self.favorites.contains(id)
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn set_dark_mode(&mut self, enabled: bool) -> Result<()> {
        self.update(|prefs| std::mem::replace(&mut prefs.dark_mode, enabled) != enabled)?;
        Ok(())
    }

    pub fn show_recommendations(&self) -> bool {
        self.show_recommendations
    }

    pub fn set_show_recommendations(&mut self, enabled: bool) -> Result<()> {
        self.update(|prefs| std::mem::replace(&mut prefs.show_recommendations, enabled) != enabled)?;
        Ok(())
    }

    pub fn recommendation_interval(&self) -> Duration {
        self.recommendation_interval
    }

    pub fn set_recommendation_interval(&mut self, interval: Duration) -> Result<()> {
        let interval = interval.max(MIN_RECOMMENDATION_INTERVAL);
        self.update(|prefs| {
            std::mem::replace(&mut prefs.recommendation_interval, interval) != interval
        })?;
        Ok(())
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn set_view(&mut self, view: ViewMode) -> Result<()> {
        self.update(|prefs| std::mem::replace(&mut prefs.view, view) != view)?;
        Ok(())
    }
}
