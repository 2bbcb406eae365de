// Core business logic lives here - the brain of the operation
pub mod analytics;
pub mod browser;
pub mod config;
pub mod error;
pub mod favorites;
pub mod format;
pub mod models;
pub mod pagination;
pub mod preferences;
pub mod providers;
pub mod recommendations;
pub mod search;

pub use analytics::{Analytics, AnalyticsEvent};
pub use browser::{
    fetch_detail, Browser, Command, NoticeLevel, PendingSearch, SearchCompletion, Task, UiEvent,
};
pub use config::Config;
pub use error::Error;
pub use favorites::{FavoriteEntry, FavoritesStore};
pub use models::{
    CommitActivity, Contributor, Issue, RepoId, Repository, RepositoryDetail, WeeklyCommits,
};
pub use pagination::{PageItem, Pagination};
pub use preferences::{JsonFileStorage, PersistedState, Preferences, StateStorage, ViewMode};
pub use providers::GitHubProvider;
pub use recommendations::{
    Phase, RecommendationQueue, RecommendationScheduler, SchedulerEvent, SchedulerTimings,
};
pub use search::{
    Category, DateRange, SearchCriteria, SearchFilters, SearchOutcome, SearchPage,
    SearchProvider, SearchRequest, SortKey,
};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
