//! The top-level controller.
//!
//! `Browser` owns all session state. The UI turns user input into
//! [`Command`]s, hands them to [`Browser::dispatch`], runs whatever network
//! [`Task`] comes back, and drains the resulting [`UiEvent`]s to redraw.
//! Network work is kept outside `&mut self` so a slow search never blocks
//! the popup timers, and each search carries a generation token so only the
//! newest one gets to touch the listing.

use crate::analytics::{Analytics, AnalyticsEvent};
use crate::config::Config;
use crate::favorites::FavoriteEntry;
use crate::models::{RepoId, Repository, RepositoryDetail};
use crate::pagination::Pagination;
use crate::preferences::{Preferences, ViewMode};
use crate::recommendations::{RecommendationScheduler, SchedulerEvent, SchedulerTimings};
use crate::search::{
    Category, SearchCriteria, SearchFilters, SearchOutcome, SearchPage, SearchProvider,
    SearchRequest,
};
use crate::{Error, Result};
use browsealizer_api::RateLimitState;
use browsealizer_cache::ResultCache;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Everything the UI can ask for
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Search(String),
    SelectCategory(Category),
    SelectTopic(String),
    ApplyFilters(SearchFilters),
    ResetFilters,
    NextPage,
    PrevPage,
    GoToPage(u32),
    OpenRepository(RepoId),
    AddFavorite(RepoId),
    RemoveFavorite(RepoId),
    SetRecommendations(bool),
    SetRecommendationInterval(Duration),
    SetDarkMode(bool),
    SetView(ViewMode),
    DismissRecommendation,
    FavoriteRecommendation,
    ViewRecommendation,
    /// Let the popup timers catch up with the clock
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// What the UI should redraw
#[derive(Debug, Clone)]
pub enum UiEvent {
    Loading {
        title: String,
    },
    SearchCompleted {
        title: String,
        page: SearchPage,
    },
    NoResults {
        title: String,
    },
    /// The listing is replaced by `message` and the pager is hidden
    SearchFailed {
        message: String,
    },
    PaginationChanged(Pagination),
    DetailOpened(Box<RepositoryDetail>),
    RecommendationShown(Repository),
    RecommendationHidden,
    FavoritesChanged(Vec<FavoriteEntry>),
    SettingsChanged,
    OpenUrl(String),
    Notice {
        level: NoticeLevel,
        message: String,
    },
}

/// Network work the caller has to run and feed back
#[derive(Debug)]
pub enum Task {
    Search(PendingSearch),
    Open(Repository),
}

/// A search that has been started but not applied yet
#[derive(Debug, Clone)]
pub struct PendingSearch {
    pub token: u64,
    pub request: SearchRequest,
}

impl PendingSearch {
    pub async fn run(self, provider: &dyn SearchProvider) -> SearchCompletion {
        let result = provider.search(&self.request).await;
        SearchCompletion {
            token: self.token,
            result,
        }
    }
}

#[derive(Debug)]
pub struct SearchCompletion {
    pub token: u64,
    pub result: Result<SearchOutcome>,
}

/// Fetch all four detail tabs at once. Each tab succeeds or fails alone.
pub async fn fetch_detail(provider: &dyn SearchProvider, repo: Repository) -> RepositoryDetail {
    let (readme, activity, issues, contributors) = futures::join!(
        provider.readme(&repo),
        provider.commit_activity(&repo),
        provider.open_issues(&repo),
        provider.contributors(&repo),
    );

    RepositoryDetail {
        readme: readme.map_err(|e| tab_error("README", e)),
        activity: activity.map_err(|e| tab_error("commit activity", e)),
        issues: issues.map_err(|e| tab_error("issues", e)),
        contributors: contributors.map_err(|e| tab_error("contributors", e)),
        repository: repo,
    }
}

fn tab_error(tab: &str, err: Error) -> String {
    warn!("Failed to load {}: {}", tab, err);
    format!("Failed to load {}: {}", tab, err)
}

pub struct Browser {
    provider: Arc<dyn SearchProvider>,
    cache: ResultCache<Repository>,
    scheduler: RecommendationScheduler,
    preferences: Preferences,
    analytics: Analytics,
    criteria: SearchCriteria,
    filters: SearchFilters,
    pagination: Pagination,
    per_page: u32,
    listing: Vec<Repository>,
    generation: u64,
    outbox: Vec<UiEvent>,
}

impl Browser {
    pub fn new(provider: Arc<dyn SearchProvider>, preferences: Preferences, config: &Config) -> Self {
        let timings = SchedulerTimings {
            interval: preferences.recommendation_interval(),
            cooldown: config.recommendations.cooldown(),
            startup_delay: config.recommendations.startup_delay(),
        };
        let scheduler = RecommendationScheduler::new(timings, preferences.show_recommendations());

        Self {
            provider,
            cache: ResultCache::new(),
            scheduler,
            preferences,
            analytics: Analytics::new(),
            criteria: SearchCriteria::default(),
            filters: SearchFilters::default(),
            pagination: Pagination::new(),
            per_page: config.search.per_page,
            listing: Vec::new(),
            generation: 0,
            outbox: Vec::new(),
        }
    }

    /// Session start: arm the first recommendation and load the default listing
    pub fn start(&mut self, now: Instant) -> PendingSearch {
        self.analytics.track(
            AnalyticsEvent::AppLoaded,
            [
                ("dark_mode", json!(self.preferences.dark_mode())),
                ("view_mode", json!(self.preferences.view())),
            ],
        );
        self.scheduler.start(now);
        self.begin_search()
    }

    /// Pull the current quota from the server. Failure only costs us the
    /// up-front number, so it's logged and otherwise ignored.
    pub async fn refresh_quota(&mut self) -> Option<RateLimitState> {
        let provider = Arc::clone(&self.provider);
        match provider.refresh_quota().await {
            Ok(state) => {
                info!("Rate limit: {}/{}", state.remaining, state.limit);
                self.check_quota();
                Some(state)
            }
            Err(e) => {
                warn!("Error fetching rate limit: {}", e);
                None
            }
        }
    }

    pub fn dispatch(&mut self, command: Command, now: Instant) -> Result<Option<Task>> {
        debug!("Dispatching {:?}", command);

        let task = match command {
            Command::Search(query) => {
                let query = query.trim();
                if query.is_empty() {
                    return Ok(None);
                }
                self.criteria = SearchCriteria::Query(query.to_string());
                self.new_listing()
            }
            Command::SelectCategory(category) => {
                self.criteria = SearchCriteria::Category(category);
                self.new_listing()
            }
            Command::SelectTopic(topic) => {
                self.criteria = SearchCriteria::Topic(topic.trim().to_string());
                self.new_listing()
            }
            Command::ApplyFilters(filters) => {
                self.filters = filters;
                self.new_listing()
            }
            Command::ResetFilters => {
                self.filters = SearchFilters::default();
                self.new_listing()
            }
            Command::NextPage => self.pagination.next().map(|_| self.search_task()),
            Command::PrevPage => self.pagination.prev().map(|_| self.search_task()),
            Command::GoToPage(page) => self.pagination.go_to(page).map(|_| self.search_task()),
            Command::OpenRepository(id) => {
                let repo = self.find_repository(id)?;
                self.analytics.track(
                    AnalyticsEvent::ViewRepositoryDetails,
                    [("repo_id", json!(repo.id)), ("repo_name", json!(repo.full_name))],
                );
                Some(Task::Open(repo))
            }
            Command::AddFavorite(id) => {
                let repo = self.find_repository(id)?;
                self.add_favorite(&repo)?;
                None
            }
            Command::RemoveFavorite(id) => {
                self.remove_favorite(id)?;
                None
            }
            Command::SetRecommendations(enabled) => {
                // The scheduler follows whatever the preference ended up as,
                // saved or rolled back
                let saved = self.preferences.set_show_recommendations(enabled);
                let enabled = self.preferences.show_recommendations();
                let rate_limited = self.provider.is_rate_limited();
                let events = self
                    .scheduler
                    .set_enabled(enabled, now, &self.cache, rate_limited);
                self.apply_scheduler_events(events);
                saved?;
                self.outbox.push(UiEvent::SettingsChanged);
                None
            }
            Command::SetRecommendationInterval(interval) => {
                let saved = self.preferences.set_recommendation_interval(interval);
                self.scheduler
                    .set_interval(self.preferences.recommendation_interval());
                saved?;
                self.outbox.push(UiEvent::SettingsChanged);
                None
            }
            Command::SetDarkMode(enabled) => {
                self.preferences.set_dark_mode(enabled)?;
                self.outbox.push(UiEvent::SettingsChanged);
                None
            }
            Command::SetView(view) => {
                self.preferences.set_view(view)?;
                self.outbox.push(UiEvent::SettingsChanged);
                None
            }
            Command::DismissRecommendation => {
                let events = self.scheduler.dismiss(now);
                self.apply_scheduler_events(events);
                None
            }
            Command::FavoriteRecommendation => {
                // Popup stays up
                if let Some(repo) = self.scheduler.active().cloned() {
                    self.add_favorite(&repo)?;
                }
                None
            }
            Command::ViewRecommendation => {
                if let Some(repo) = self.scheduler.active() {
                    self.outbox.push(UiEvent::OpenUrl(repo.url.clone()));
                }
                None
            }
            Command::Tick => {
                self.tick(now);
                None
            }
        };

        Ok(task)
    }

    /// Dispatch and run the resulting task inline
    pub async fn execute(&mut self, command: Command, now: Instant) -> Result<()> {
        match self.dispatch(command, now)? {
            Some(Task::Search(pending)) => {
                let provider = Arc::clone(&self.provider);
                let completion = pending.run(provider.as_ref()).await;
                self.complete_search(completion, now);
            }
            Some(Task::Open(repo)) => {
                let provider = Arc::clone(&self.provider);
                let detail = fetch_detail(provider.as_ref(), repo).await;
                self.complete_open(detail);
            }
            None => {}
        }
        Ok(())
    }

    /// Fetch a repository by "owner/name" so commands can refer to it by id
    pub async fn lookup(&mut self, full_name: &str) -> Result<RepoId> {
        let provider = Arc::clone(&self.provider);
        let repo = provider.get_repository(full_name).await;
        self.check_quota();

        let repo = repo?;
        let id = repo.id;
        self.cache.put(repo);
        Ok(id)
    }

    /// Look a repository up by "owner/name" and open it
    pub async fn open_by_name(&mut self, full_name: &str, now: Instant) -> Result<()> {
        let id = self.lookup(full_name).await?;
        self.execute(Command::OpenRepository(id), now).await
    }

    /// Start a search for the current criteria/filters/page.
    /// Any search started earlier is now stale.
    pub fn begin_search(&mut self) -> PendingSearch {
        self.generation += 1;

        let mut request = SearchRequest::new(self.criteria.clone());
        request.filters = self.filters.clone();
        request.page = self.pagination.current();
        request.per_page = self.per_page;

        self.outbox.push(UiEvent::Loading {
            title: self.criteria.title(),
        });

        PendingSearch {
            token: self.generation,
            request,
        }
    }

    /// Apply a finished search. Returns false if a newer one has started since.
    pub fn complete_search(&mut self, completion: SearchCompletion, now: Instant) -> bool {
        if completion.token != self.generation {
            debug!(
                "Discarding stale search {} (current is {})",
                completion.token, self.generation
            );
            return false;
        }

        let title = self.criteria.title();
        let label = self.query_label();

        match completion.result {
            Ok(SearchOutcome::Results(page)) => {
                self.cache.extend(page.items.iter().cloned());
                self.listing = page.items.clone();
                self.pagination.set_total_pages(page.total_pages);

                self.analytics.track(
                    AnalyticsEvent::SearchResults,
                    [
                        ("query", json!(label)),
                        ("result_count", json!(page.items.len())),
                        ("total_count", json!(page.total_count)),
                    ],
                );

                let events = self.scheduler.enqueue(page.items.iter().cloned(), now);
                self.outbox.push(UiEvent::SearchCompleted { title, page });
                self.outbox.push(UiEvent::PaginationChanged(self.pagination));
                self.apply_scheduler_events(events);
            }
            Ok(SearchOutcome::NoMatches) => {
                self.listing.clear();
                self.pagination.hide();
                self.analytics
                    .track(AnalyticsEvent::SearchNoResults, [("query", json!(label))]);
                self.outbox.push(UiEvent::NoResults { title });
                self.outbox.push(UiEvent::PaginationChanged(self.pagination));
            }
            Err(e) => {
                warn!("Error fetching repositories: {}", e);
                self.listing.clear();
                self.pagination.hide();

                let message = match &e {
                    Error::RateLimited { .. } | Error::Timeout => e.to_string(),
                    _ => format!("Failed to fetch repositories: {}", e),
                };
                self.outbox.push(UiEvent::Notice {
                    level: NoticeLevel::Error,
                    message: message.clone(),
                });
                self.outbox.push(UiEvent::SearchFailed { message });
                self.outbox.push(UiEvent::PaginationChanged(self.pagination));
            }
        }

        self.check_quota();
        true
    }

    pub fn complete_open(&mut self, detail: RepositoryDetail) {
        self.check_quota();
        self.outbox.push(UiEvent::DetailOpened(Box::new(detail)));
    }

    /// Advance the popup timers
    pub fn tick(&mut self, now: Instant) {
        let rate_limited = self.provider.is_rate_limited();
        let events = self.scheduler.poll(now, &self.cache, rate_limited);
        self.apply_scheduler_events(events);
    }

    /// When the popup timers next need a `tick`
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Hand everything that happened since the last drain to the UI
    pub fn drain_events(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn provider(&self) -> Arc<dyn SearchProvider> {
        Arc::clone(&self.provider)
    }

    pub fn listing(&self) -> &[Repository] {
        &self.listing
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    pub fn filters(&self) -> &SearchFilters {
        &self.filters
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn scheduler(&self) -> &RecommendationScheduler {
        &self.scheduler
    }

    pub fn cache(&self) -> &ResultCache<Repository> {
        &self.cache
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    pub fn rate_limit_state(&self) -> RateLimitState {
        self.provider.rate_limit_state()
    }

    fn new_listing(&mut self) -> Option<Task> {
        self.pagination.reset();
        Some(self.search_task())
    }

    fn search_task(&mut self) -> Task {
        Task::Search(self.begin_search())
    }

    fn query_label(&self) -> String {
        match &self.criteria {
            SearchCriteria::Query(q) => q.clone(),
            SearchCriteria::Topic(topic) => topic.clone(),
            SearchCriteria::Category(category) => category.slug().to_string(),
        }
    }

    fn find_repository(&self, id: RepoId) -> Result<Repository> {
        self.listing
            .iter()
            .find(|r| r.id == id)
            .or_else(|| self.cache.get(&id))
            .or_else(|| self.scheduler.active().filter(|r| r.id == id))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("repository {}", id)))
    }

    fn add_favorite(&mut self, repo: &Repository) -> Result<()> {
        if !self.preferences.add_favorite(repo)? {
            self.notice(
                NoticeLevel::Info,
                format!("{} is already in your favorites", repo.full_name),
            );
            return Ok(());
        }

        self.analytics.track(
            AnalyticsEvent::AddFavorite,
            [
                ("repo_id", json!(repo.id)),
                ("repo_name", json!(repo.full_name)),
                ("total_favorites", json!(self.preferences.favorites().len())),
            ],
        );
        self.notice(NoticeLevel::Success, "Repository added to favorites".to_string());
        self.favorites_changed();
        Ok(())
    }

    fn remove_favorite(&mut self, id: RepoId) -> Result<()> {
        let name = self
            .preferences
            .favorites()
            .get(id)
            .map(|entry| entry.name.clone());

        if !self.preferences.remove_favorite(id)? {
            return Ok(());
        }

        self.analytics.track(
            AnalyticsEvent::RemoveFavorite,
            [
                ("repo_id", json!(id)),
                ("repo_name", json!(name)),
                ("total_favorites", json!(self.preferences.favorites().len())),
            ],
        );
        self.favorites_changed();
        Ok(())
    }

    fn favorites_changed(&mut self) {
        self.outbox.push(UiEvent::FavoritesChanged(
            self.preferences.favorites().list().to_vec(),
        ));
    }

    fn apply_scheduler_events(&mut self, events: Vec<SchedulerEvent>) {
        for event in events {
            match event {
                SchedulerEvent::Show(repo) => {
                    self.analytics.track(
                        AnalyticsEvent::ShowRecommendation,
                        [
                            ("queue_length", json!(self.scheduler.queue().len())),
                            (
                                "frequency",
                                json!(self.scheduler.timings().interval.as_millis() as u64),
                            ),
                        ],
                    );
                    self.outbox.push(UiEvent::RecommendationShown(repo));
                }
                SchedulerEvent::Hide => self.outbox.push(UiEvent::RecommendationHidden),
            }
        }
    }

    fn check_quota(&mut self) {
        if let Some(remaining) = self.provider.take_low_quota_warning() {
            self.notice(
                NoticeLevel::Warning,
                format!(
                    "GitHub API rate limit running low: {} requests remaining",
                    remaining
                ),
            );
        }
    }

    fn notice(&mut self, level: NoticeLevel, message: String) {
        self.outbox.push(UiEvent::Notice { level, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::repo;
    use crate::models::CommitActivity;
    use crate::preferences::MockStateStorage;
    use crate::search::MockSearchProvider;
    use browsealizer_api::ResetWait;

    fn quiet_provider() -> MockSearchProvider {
        let mut provider = MockSearchProvider::new();
        provider.expect_is_rate_limited().returning(|| false);
        provider.expect_take_low_quota_warning().returning(|| None);
        provider
    }

    fn prefs(show_recommendations: bool) -> Preferences {
        let mut storage = MockStateStorage::new();
        storage.expect_load().returning(move || {
            Ok(Some(crate::preferences::PersistedState {
                show_recommendations,
                ..Default::default()
            }))
        });
        storage.expect_save().returning(|_| Ok(()));
        Preferences::load(Box::new(storage), Duration::from_secs(10))
    }

    fn browser(provider: MockSearchProvider, show_recommendations: bool) -> Browser {
        Browser::new(
            Arc::new(provider),
            prefs(show_recommendations),
            &Config::default(),
        )
    }

    fn results(ids: &[RepoId], total_pages: u32) -> Result<SearchOutcome> {
        let items: Vec<_> = ids.iter().map(|&id| repo(id, &format!("o/r{}", id))).collect();
        Ok(SearchOutcome::Results(SearchPage {
            total_count: u64::from(total_pages) * 30,
            page: 1,
            total_pages,
            items,
        }))
    }

    fn notices(events: &[UiEvent], wanted: NoticeLevel) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Notice { level, message } if *level == wanted => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_search_fills_listing_cache_and_pager() {
        let mut provider = quiet_provider();
        provider
            .expect_search()
            .withf(|req| req.page == 1 && req.criteria == SearchCriteria::Query("rust".into()))
            .times(1)
            .returning(|_| results(&[1, 2, 3], 34));

        let mut b = browser(provider, false);
        let now = Instant::now();
        b.execute(Command::Search("  rust ".into()), now).await.unwrap();

        assert_eq!(b.listing().len(), 3);
        assert_eq!(b.cache().len(), 3);
        assert_eq!(b.pagination().total_pages(), 34);
        assert!(b.pagination().is_visible());
        assert_eq!(b.analytics().count(AnalyticsEvent::SearchResults), 1);

        let events = b.drain_events();
        assert!(matches!(events[0], UiEvent::Loading { .. }));
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::SearchCompleted { page, .. } if page.items.len() == 3)));
    }

    #[tokio::test]
    async fn test_blank_search_does_nothing() {
        let mut b = browser(quiet_provider(), false);
        let task = b.dispatch(Command::Search("   ".into()), Instant::now()).unwrap();
        assert!(task.is_none());
        assert!(b.drain_events().is_empty());
    }

    #[test]
    fn test_stale_search_is_discarded() {
        let mut b = browser(quiet_provider(), false);
        let now = Instant::now();

        let first = b.begin_search();
        let second = b.begin_search();
        b.drain_events();

        let applied = b.complete_search(
            SearchCompletion {
                token: first.token,
                result: results(&[1], 1),
            },
            now,
        );
        assert!(!applied);
        assert!(b.listing().is_empty());
        assert!(b.drain_events().is_empty());

        let applied = b.complete_search(
            SearchCompletion {
                token: second.token,
                result: results(&[2, 3], 2),
            },
            now,
        );
        assert!(applied);
        assert_eq!(b.listing().len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limited_search_replaces_listing() {
        let mut provider = quiet_provider();
        provider.expect_search().returning(|_| {
            Err(Error::RateLimited {
                wait: ResetWait::In(Duration::from_secs(125)),
            })
        });

        let mut b = browser(provider, false);
        b.execute(Command::SelectCategory(Category::MostStarred), Instant::now())
            .await
            .unwrap();

        let events = b.drain_events();
        let failed = events.iter().find_map(|e| match e {
            UiEvent::SearchFailed { message } => Some(message.clone()),
            _ => None,
        });
        assert_eq!(
            failed.as_deref(),
            Some("GitHub API rate limit exceeded. Try again in 2m 5s")
        );
        assert_eq!(notices(&events, NoticeLevel::Error).len(), 1);
        assert!(!b.pagination().is_visible());
    }

    #[tokio::test]
    async fn test_no_matches_hides_pager() {
        let mut provider = quiet_provider();
        provider
            .expect_search()
            .returning(|_| Ok(SearchOutcome::NoMatches));

        let mut b = browser(provider, false);
        b.execute(Command::SelectTopic("nothing-here".into()), Instant::now())
            .await
            .unwrap();

        let events = b.drain_events();
        assert!(events.iter().any(|e| matches!(e, UiEvent::NoResults { .. })));
        assert!(!b.pagination().is_visible());
        assert_eq!(b.analytics().count(AnalyticsEvent::SearchNoResults), 1);
    }

    #[tokio::test]
    async fn test_paging_and_filters_reset() {
        let mut provider = quiet_provider();
        provider.expect_search().returning(|_| results(&[1], 5));

        let mut b = browser(provider, false);
        let now = Instant::now();
        b.execute(Command::SelectCategory(Category::Trending), now)
            .await
            .unwrap();

        b.execute(Command::NextPage, now).await.unwrap();
        b.execute(Command::GoToPage(4), now).await.unwrap();
        assert_eq!(b.pagination().current(), 4);

        // Can't go past the last page
        b.execute(Command::GoToPage(5), now).await.unwrap();
        assert!(b.dispatch(Command::NextPage, now).unwrap().is_none());

        let filters = SearchFilters {
            language: Some("Go".into()),
            ..Default::default()
        };
        let task = b.dispatch(Command::ApplyFilters(filters), now).unwrap();
        match task {
            Some(Task::Search(pending)) => {
                assert_eq!(pending.request.page, 1);
                assert_eq!(pending.request.filters.language.as_deref(), Some("Go"));
            }
            other => panic!("expected a search, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_results_feed_recommendations() {
        let mut provider = quiet_provider();
        provider.expect_search().returning(|_| results(&[1, 2], 1));

        let mut b = browser(provider, true);
        let now = Instant::now();
        b.execute(Command::SelectCategory(Category::Recommendations), now)
            .await
            .unwrap();

        let events = b.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::RecommendationShown(r) if r.id == 1)));
        assert_eq!(b.next_deadline(), Some(now + Duration::from_secs(10)));

        b.dispatch(Command::SetRecommendations(false), now).unwrap();
        let events = b.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::RecommendationHidden)));
        assert!(!b.preferences().show_recommendations());

        b.dispatch(Command::Tick, now + Duration::from_secs(60)).unwrap();
        assert!(!b
            .drain_events()
            .iter()
            .any(|e| matches!(e, UiEvent::RecommendationShown(_))));
    }

    #[tokio::test]
    async fn test_popup_actions() {
        let mut provider = quiet_provider();
        provider.expect_search().returning(|_| results(&[7], 1));

        let mut b = browser(provider, true);
        let now = Instant::now();
        b.execute(Command::SelectCategory(Category::Trending), now)
            .await
            .unwrap();
        b.drain_events();

        b.dispatch(Command::FavoriteRecommendation, now).unwrap();
        assert!(b.preferences().is_favorite(7));
        // Still showing
        assert_eq!(b.scheduler().active().map(|r| r.id), Some(7));

        b.dispatch(Command::ViewRecommendation, now).unwrap();
        let events = b.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::OpenUrl(url) if url == "https://github.com/o/r7")));

        b.dispatch(Command::DismissRecommendation, now).unwrap();
        assert!(b.scheduler().active().is_none());
    }

    #[tokio::test]
    async fn test_favorites_commands() {
        let mut provider = quiet_provider();
        provider.expect_search().returning(|_| results(&[1, 2], 1));

        let mut b = browser(provider, false);
        let now = Instant::now();
        b.execute(Command::Search("x".into()), now).await.unwrap();
        b.drain_events();

        b.dispatch(Command::AddFavorite(2), now).unwrap();
        b.dispatch(Command::AddFavorite(2), now).unwrap();
        let events = b.drain_events();
        assert_eq!(notices(&events, NoticeLevel::Success).len(), 1);
        assert_eq!(notices(&events, NoticeLevel::Info).len(), 1);
        assert_eq!(b.preferences().favorites().len(), 1);

        b.dispatch(Command::RemoveFavorite(99), now).unwrap();
        assert!(b.drain_events().is_empty());

        b.dispatch(Command::RemoveFavorite(2), now).unwrap();
        assert!(b.preferences().favorites().is_empty());
        assert_eq!(b.analytics().count(AnalyticsEvent::RemoveFavorite), 1);

        let err = b.dispatch(Command::AddFavorite(404), now).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_open_repository_tabs_fail_independently() {
        let mut provider = quiet_provider();
        provider.expect_search().returning(|_| results(&[1], 1));
        provider.expect_readme().returning(|_| Ok(None));
        provider
            .expect_commit_activity()
            .returning(|_| Ok(CommitActivity::default()));
        provider
            .expect_open_issues()
            .returning(|_| Err(Error::Timeout));
        provider.expect_contributors().returning(|_| Ok(Vec::new()));

        let mut b = browser(provider, false);
        let now = Instant::now();
        b.execute(Command::Search("x".into()), now).await.unwrap();
        b.drain_events();

        b.execute(Command::OpenRepository(1), now).await.unwrap();
        let events = b.drain_events();
        let detail = events
            .into_iter()
            .find_map(|e| match e {
                UiEvent::DetailOpened(detail) => Some(detail),
                _ => None,
            })
            .unwrap();

        assert_eq!(detail.readme, Ok(None));
        assert!(detail.activity.is_ok());
        assert!(detail.issues.unwrap_err().starts_with("Failed to load issues"));
        assert!(detail.contributors.is_ok());
        assert_eq!(b.analytics().count(AnalyticsEvent::ViewRepositoryDetails), 1);
    }

    #[tokio::test]
    async fn test_low_quota_becomes_a_warning() {
        let mut provider = MockSearchProvider::new();
        provider.expect_is_rate_limited().returning(|| false);
        provider
            .expect_take_low_quota_warning()
            .times(1)
            .returning(|| Some(3));
        provider.expect_search().returning(|_| results(&[1], 1));

        let mut b = browser(provider, false);
        b.execute(Command::Search("x".into()), Instant::now())
            .await
            .unwrap();

        let warnings = notices(&b.drain_events(), NoticeLevel::Warning);
        assert_eq!(
            warnings,
            vec!["GitHub API rate limit running low: 3 requests remaining".to_string()]
        );
    }

    #[tokio::test]
    async fn test_open_by_name_caches_the_lookup() {
        let mut provider = quiet_provider();
        provider
            .expect_get_repository()
            .withf(|name| name == "octo/cat")
            .returning(|name| Ok(repo(42, name)));
        provider.expect_readme().returning(|_| Ok(Some("# Hi".into())));
        provider
            .expect_commit_activity()
            .returning(|_| Ok(CommitActivity::default()));
        provider.expect_open_issues().returning(|_| Ok(Vec::new()));
        provider.expect_contributors().returning(|_| Ok(Vec::new()));

        let mut b = browser(provider, false);
        b.open_by_name("octo/cat", Instant::now()).await.unwrap();

        assert!(b.cache().get(&42).is_some());
        assert!(b
            .drain_events()
            .iter()
            .any(|e| matches!(e, UiEvent::DetailOpened(d) if d.repository.id == 42)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_popup_cycle_follows_the_clock() {
        let mut provider = quiet_provider();
        provider.expect_search().returning(|_| results(&[1, 2], 1));

        let mut b = browser(provider, true);
        let t0 = Instant::now();
        let pending = b.start(t0);
        let completion = pending.run(b.provider().as_ref()).await;
        b.complete_search(completion, t0);
        assert_eq!(b.scheduler().active().map(|r| r.id), Some(1));

        let deadline = b.next_deadline().unwrap();
        tokio::time::sleep_until(deadline).await;
        b.tick(Instant::now());
        assert!(b.scheduler().active().is_none());

        tokio::time::advance(Duration::from_secs(2)).await;
        b.tick(Instant::now());
        assert_eq!(b.scheduler().active().map(|r| r.id), Some(2));
        assert_eq!(
            b.analytics().count(AnalyticsEvent::ShowRecommendation),
            2
        );
    }

    #[tokio::test]
    async fn test_settings_are_persisted() {
        let mut b = browser(quiet_provider(), true);
        let now = Instant::now();

        b.dispatch(Command::SetDarkMode(true), now).unwrap();
        b.dispatch(Command::SetView(ViewMode::List), now).unwrap();
        b.dispatch(
            Command::SetRecommendationInterval(Duration::from_secs(20)),
            now,
        )
        .unwrap();

        assert!(b.preferences().dark_mode());
        assert_eq!(b.preferences().view(), ViewMode::List);
        assert_eq!(
            b.scheduler().timings().interval,
            Duration::from_secs(20)
        );
    }

    #[tokio::test]
    async fn test_failed_save_keeps_scheduler_and_preferences_in_step() {
        let mut storage = MockStateStorage::new();
        storage.expect_load().returning(|| Ok(None));
        storage
            .expect_save()
            .returning(|_| Err(Error::StorageError("disk full".into())));
        let prefs = Preferences::load(Box::new(storage), Duration::from_secs(10));

        let mut provider = quiet_provider();
        provider.expect_search().returning(|_| results(&[1, 2], 1));
        let mut b = Browser::new(Arc::new(provider), prefs, &Config::default());

        let now = Instant::now();
        b.execute(Command::SelectCategory(Category::Trending), now)
            .await
            .unwrap();
        assert_eq!(b.scheduler().active().map(|r| r.id), Some(1));

        let err = b.dispatch(Command::SetRecommendations(false), now);
        assert!(matches!(err, Err(Error::StorageError(_))));
        assert_eq!(
            b.preferences().show_recommendations(),
            b.scheduler().is_enabled()
        );

        let err = b.dispatch(Command::AddFavorite(2), now);
        assert!(matches!(err, Err(Error::StorageError(_))));
        assert!(!b.preferences().is_favorite(2));
        assert_eq!(b.analytics().count(AnalyticsEvent::AddFavorite), 0);
    }
}
