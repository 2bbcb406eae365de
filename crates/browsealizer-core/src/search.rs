use crate::models::{CommitActivity, Contributor, Issue, Repository};
use crate::{Error, Result};
use browsealizer_api::{RateLimitState, ResetWait};
use chrono::{Days, Months, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// GitHub stops serving search results past the first 1000 matches
pub const MAX_RESULTS: u64 = 1000;

pub const DEFAULT_PER_PAGE: u32 = 30;

/// Canned searches for the sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    /// Created within the last month
    #[default]
    Trending,
    /// Over 5000 stars
    MostStarred,
    /// Pushed within the last week
    RecentlyPushed,
    /// Broad pool of well-known projects
    Recommendations,
}

impl Category {
    pub fn all() -> [Category; 4] {
        [
            Category::Trending,
            Category::MostStarred,
            Category::RecentlyPushed,
            Category::Recommendations,
        ]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Category::Trending => "trending",
            Category::MostStarred => "stars",
            Category::RecentlyPushed => "recent",
            Category::Recommendations => "recommendations",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Trending => "Trending",
            Category::MostStarred => "Most Starred",
            Category::RecentlyPushed => "Recently Updated",
            Category::Recommendations => "Recommended",
        }
    }

    /// The search predicate this category stands for, resolved against `today`
    pub fn predicate(&self, today: NaiveDate) -> String {
        match self {
            Category::Trending => {
                let since = today.checked_sub_months(Months::new(1)).unwrap_or(today);
                format!("created:>{}", since.format("%Y-%m-%d"))
            }
            Category::MostStarred => "stars:>5000".to_string(),
            Category::RecentlyPushed => {
                let since = today.checked_sub_days(Days::new(7)).unwrap_or(today);
                format!("pushed:>{}", since.format("%Y-%m-%d"))
            }
            Category::Recommendations => "stars:>1000".to_string(),
        }
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::all()
            .into_iter()
            .find(|c| c.slug().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::ConfigError(format!("Unknown category: {}", s)))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// What the listing is currently showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    Query(String),
    Topic(String),
    Category(Category),
}

impl Default for SearchCriteria {
    fn default() -> Self {
        SearchCriteria::Category(Category::default())
    }
}

impl SearchCriteria {
    fn base_query(&self, today: NaiveDate) -> String {
        match self {
            SearchCriteria::Query(q) => q.trim().to_string(),
            SearchCriteria::Topic(topic) => format!("topic:{}", topic.trim()),
            SearchCriteria::Category(category) => category.predicate(today),
        }
    }

    /// Heading for the result list
    pub fn title(&self) -> String {
        match self {
            SearchCriteria::Query(q) => format!("Search Results for \"{}\"", q),
            SearchCriteria::Topic(topic) => format!("{} Repositories", topic),
            SearchCriteria::Category(category) => category.display_name().to_string(),
        }
    }
}

/// Relative "created after" buckets, resolved to a date at call time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl DateRange {
    pub fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        let cutoff = match self {
            DateRange::Daily => Some(today),
            DateRange::Weekly => today.checked_sub_days(Days::new(7)),
            DateRange::Monthly => today.checked_sub_months(Months::new(1)),
            DateRange::Yearly => today.checked_sub_months(Months::new(12)),
        };
        cutoff.unwrap_or(today)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DateRange::Daily => "daily",
            DateRange::Weekly => "weekly",
            DateRange::Monthly => "monthly",
            DateRange::Yearly => "yearly",
        }
    }
}

impl FromStr for DateRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(DateRange::Daily),
            "weekly" => Ok(DateRange::Weekly),
            "monthly" => Ok(DateRange::Monthly),
            "yearly" => Ok(DateRange::Yearly),
            other => Err(Error::ConfigError(format!("Unknown date range: {}", other))),
        }
    }
}

/// How results are sorted. Direction is always descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Stars,
    Forks,
    Updated,
    HelpWantedIssues,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Stars => "stars",
            SortKey::Forks => "forks",
            SortKey::Updated => "updated",
            SortKey::HelpWantedIssues => "help-wanted-issues",
        }
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "stars" => Ok(SortKey::Stars),
            "forks" => Ok(SortKey::Forks),
            "updated" => Ok(SortKey::Updated),
            "help-wanted-issues" => Ok(SortKey::HelpWantedIssues),
            other => Err(Error::ConfigError(format!("Unknown sort key: {}", other))),
        }
    }
}

pub const SORT_ORDER: &str = "desc";

/// Refinements layered on top of any criteria
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub language: Option<String>,
    pub min_stars: u32,
    pub date_range: Option<DateRange>,
    pub sort: SortKey,
}

impl SearchFilters {
    pub fn build_query(&self, base_query: &str, today: NaiveDate) -> String {
        let mut parts = vec![base_query.to_string()];

        if let Some(lang) = &self.language {
            let lang = lang.trim();
            if lang.contains(char::is_whitespace) {
                parts.push(format!("language:\"{}\"", lang));
            } else if !lang.is_empty() {
                parts.push(format!("language:{}", lang));
            }
        }

        if self.min_stars > 0 {
            parts.push(format!("stars:>={}", self.min_stars));
        }

        if let Some(range) = self.date_range {
            parts.push(format!("created:>{}", range.cutoff(today).format("%Y-%m-%d")));
        }

        parts.retain(|p| !p.is_empty());
        parts.join(" ")
    }
}

/// Everything needed to fetch one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub criteria: SearchCriteria,
    pub filters: SearchFilters,
    /// 1-indexed
    pub page: u32,
    pub per_page: u32,
}

impl SearchRequest {
    pub fn new(criteria: SearchCriteria) -> Self {
        Self {
            criteria,
            filters: SearchFilters::default(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }

    pub fn query_string(&self, today: NaiveDate) -> String {
        self.filters
            .build_query(&self.criteria.base_query(today), today)
    }
}

/// One successful page of results
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub items: Vec<Repository>,
    pub total_count: u64,
    pub page: u32,
    pub total_pages: u32,
}

/// A search that went through. Zero matches is a result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Results(SearchPage),
    NoMatches,
}

/// Pages we can actually reach for `total_count` matches. Only the first
/// `MAX_RESULTS` count, whatever the page size.
pub fn total_pages(total_count: u64, per_page: u32) -> u32 {
    if per_page == 0 {
        return 0;
    }
    let reachable = total_count.min(MAX_RESULTS);
    let per_page = u64::from(per_page);
    ((reachable + per_page - 1) / per_page) as u32
}

/// Trait for the repository source - makes testing easier and keeps the
/// controller ignorant of HTTP.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome>;
    async fn get_repository(&self, full_name: &str) -> Result<Repository>;

    async fn readme(&self, repo: &Repository) -> Result<Option<String>>;
    async fn commit_activity(&self, repo: &Repository) -> Result<CommitActivity>;
    async fn open_issues(&self, repo: &Repository) -> Result<Vec<Issue>>;
    async fn contributors(&self, repo: &Repository) -> Result<Vec<Contributor>>;

    /// Ask the server for the current quota
    async fn refresh_quota(&self) -> Result<RateLimitState>;

    fn is_rate_limited(&self) -> bool;
    fn time_until_reset(&self) -> ResetWait;
    fn rate_limit_state(&self) -> RateLimitState;
    fn take_low_quota_warning(&self) -> Option<u32>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn test_total_pages_is_capped() {
        assert_eq!(total_pages(12000, 30), 34);
        assert_eq!(total_pages(1000, 30), 34);
        assert_eq!(total_pages(61, 30), 3);
        assert_eq!(total_pages(30, 30), 1);
        assert_eq!(total_pages(0, 30), 0);
    }

    #[test]
    fn test_page_cap_follows_page_size() {
        assert_eq!(total_pages(12000, 10), 100);
        assert_eq!(total_pages(12000, 100), 10);
        assert_eq!(total_pages(12000, 50), 20);
        assert_eq!(total_pages(450, 100), 5);

        // The last reachable page still starts inside the first 1000 matches
        let last = total_pages(u64::MAX / 2, 100);
        assert!(u64::from(last - 1) * 100 < MAX_RESULTS);
    }

    #[test]
    fn test_category_predicates() {
        assert_eq!(
            Category::Trending.predicate(today()),
            "created:>2024-02-15"
        );
        assert_eq!(Category::MostStarred.predicate(today()), "stars:>5000");
        assert_eq!(
            Category::RecentlyPushed.predicate(today()),
            "pushed:>2024-03-08"
        );
        assert_eq!(Category::Recommendations.predicate(today()), "stars:>1000");
    }

    #[test]
    fn test_category_from_slug() {
        assert_eq!("stars".parse::<Category>().unwrap(), Category::MostStarred);
        assert_eq!("Trending".parse::<Category>().unwrap(), Category::Trending);
        assert!("nope".parse::<Category>().is_err());
    }

    #[test]
    fn test_date_range_cutoffs() {
        assert_eq!(DateRange::Daily.cutoff(today()), today());
        assert_eq!(
            DateRange::Weekly.cutoff(today()),
            NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()
        );
        assert_eq!(
            DateRange::Monthly.cutoff(today()),
            NaiveDate::from_ymd_opt(2024, 2, 15).unwrap()
        );
        assert_eq!(
            DateRange::Yearly.cutoff(today()),
            NaiveDate::from_ymd_opt(2023, 3, 15).unwrap()
        );
    }

    #[test]
    fn test_query_with_all_filters() {
        let mut request = SearchRequest::new(SearchCriteria::Query("http client".into()));
        request.filters = SearchFilters {
            language: Some("Rust".into()),
            min_stars: 100,
            date_range: Some(DateRange::Weekly),
            sort: SortKey::Forks,
        };

        assert_eq!(
            request.query_string(today()),
            "http client language:Rust stars:>=100 created:>2024-03-08"
        );
    }

    #[test]
    fn test_topic_query_and_quoted_language() {
        let mut request = SearchRequest::new(SearchCriteria::Topic("machine-learning".into()));
        request.filters.language = Some("Jupyter Notebook".into());

        assert_eq!(
            request.query_string(today()),
            "topic:machine-learning language:\"Jupyter Notebook\""
        );
    }

    #[test]
    fn test_default_request() {
        let request = SearchRequest::new(SearchCriteria::default());
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, 30);
        assert_eq!(request.filters.sort.as_str(), "stars");
        assert_eq!(request.criteria.title(), "Trending");
    }
}
