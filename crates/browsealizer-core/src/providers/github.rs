// GitHub provider implementation - bridges API client with SearchProvider trait
use async_trait::async_trait;
use browsealizer_api::{
    GitHubClient, GitHubContributor, GitHubIssue, GitHubRepo, RateLimitState, ResetWait,
    WeeklyCommitActivity,
};
use chrono::{TimeZone, Utc};
use tracing::{debug, info};

use crate::{
    config::Config,
    models::{
        split_full_name, CommitActivity, Contributor, Issue, IssueLabel, Repository,
        WeeklyCommits,
    },
    search::{total_pages, SearchOutcome, SearchPage, SearchProvider, SearchRequest, SORT_ORDER},
    Error, Result,
};

/// Wrapper around GitHubClient that implements SearchProvider
pub struct GitHubProvider {
    client: GitHubClient,
    issues_per_page: u32,
    contributors_per_page: u32,
}

impl GitHubProvider {
    pub fn new(client: GitHubClient) -> Self {
        Self {
            client,
            issues_per_page: 5,
            contributors_per_page: 10,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = GitHubClient::with_options(
            config.github.api_url.clone(),
            std::time::Duration::from_secs(config.github.timeout_secs),
            &config.github.user_agent,
        )?;

        Ok(Self {
            client,
            issues_per_page: config.search.issues_per_page,
            contributors_per_page: config.search.contributors_per_page,
        })
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }
}

fn owner_and_name(full_name: &str) -> Result<(&str, &str)> {
    split_full_name(full_name)
        .ok_or_else(|| Error::ApiError(format!("Invalid repository name: {}", full_name)))
}

#[async_trait]
impl SearchProvider for GitHubProvider {
    async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        let query = request.query_string(Utc::now().date_naive());
        info!("Searching GitHub: {} (page {})", query, request.page);

        let response = self
            .client
            .search_repositories(
                &query,
                request.filters.sort.as_str(),
                SORT_ORDER,
                request.page,
                request.per_page,
            )
            .await?;

        if response.items.is_empty() {
            debug!("No repositories matched {}", query);
            return Ok(SearchOutcome::NoMatches);
        }

        Ok(SearchOutcome::Results(SearchPage {
            total_pages: total_pages(response.total_count, request.per_page),
            total_count: response.total_count,
            page: request.page,
            items: response.items.into_iter().map(github_to_repo).collect(),
        }))
    }

    async fn get_repository(&self, full_name: &str) -> Result<Repository> {
        let (owner, name) = owner_and_name(full_name)?;
        let repo = self.client.get_repository(owner, name).await?;
        Ok(github_to_repo(repo))
    }

    async fn readme(&self, repo: &Repository) -> Result<Option<String>> {
        let (owner, name) = owner_and_name(&repo.full_name)?;
        Ok(self.client.get_readme(owner, name).await?)
    }

    async fn commit_activity(&self, repo: &Repository) -> Result<CommitActivity> {
        let (owner, name) = owner_and_name(&repo.full_name)?;
        let weeks = self.client.get_commit_activity(owner, name).await?;
        Ok(CommitActivity::recent(
            weeks.into_iter().filter_map(github_to_week).collect(),
        ))
    }

    async fn open_issues(&self, repo: &Repository) -> Result<Vec<Issue>> {
        let (owner, name) = owner_and_name(&repo.full_name)?;
        let issues = self
            .client
            .get_open_issues(owner, name, self.issues_per_page)
            .await?;
        Ok(issues.into_iter().map(github_to_issue).collect())
    }

    async fn contributors(&self, repo: &Repository) -> Result<Vec<Contributor>> {
        let (owner, name) = owner_and_name(&repo.full_name)?;
        let contributors = self
            .client
            .get_contributors(owner, name, self.contributors_per_page)
            .await?;
        Ok(contributors.into_iter().map(github_to_contributor).collect())
    }

    async fn refresh_quota(&self) -> Result<RateLimitState> {
        Ok(self.client.check_rate_limit().await?)
    }

    fn is_rate_limited(&self) -> bool {
        self.client.is_rate_limited()
    }

    fn time_until_reset(&self) -> ResetWait {
        self.client.time_until_reset()
    }

    fn rate_limit_state(&self) -> RateLimitState {
        self.client.rate_limit_state()
    }

    fn take_low_quota_warning(&self) -> Option<u32> {
        self.client.with_tracker(|tracker| tracker.take_low_quota_warning())
    }
}

/// Convert GitHub API repo to our internal Repository model
fn github_to_repo(gh: GitHubRepo) -> Repository {
    Repository {
        id: gh.id,
        full_name: gh.full_name,
        description: gh.description,
        url: gh.html_url,
        homepage_url: gh.homepage.filter(|h| !h.is_empty()),
        stars: gh.stargazers_count,
        forks: gh.forks_count,
        watchers: gh.watchers_count,
        open_issues: gh.open_issues_count,
        language: gh.language,
        topics: gh.topics,
        license: gh.license.map(|l| l.name),
        created_at: gh.created_at,
        updated_at: gh.updated_at,
        // Never pushed to? Last update is the best we've got
        pushed_at: gh.pushed_at.unwrap_or(gh.updated_at),
        size: gh.size,
        default_branch: gh.default_branch,
        is_archived: gh.archived,
    }
}

fn github_to_week(week: WeeklyCommitActivity) -> Option<WeeklyCommits> {
    Some(WeeklyCommits {
        week_start: Utc.timestamp_opt(week.week, 0).single()?,
        total: week.total,
    })
}

fn github_to_issue(issue: GitHubIssue) -> Issue {
    Issue {
        number: issue.number,
        title: issue.title,
        url: issue.html_url,
        author: issue.user.login,
        created_at: issue.created_at,
        comments: issue.comments,
        labels: issue
            .labels
            .into_iter()
            .map(|l| IssueLabel {
                name: l.name,
                color: l.color,
            })
            .collect(),
    }
}

fn github_to_contributor(c: GitHubContributor) -> Contributor {
    Contributor {
        login: c.login,
        avatar_url: c.avatar_url,
        profile_url: c.html_url,
        contributions: c.contributions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{Category, SearchCriteria};
    use browsealizer_api::DEFAULT_TIMEOUT;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo_json(id: u64, full_name: &str) -> serde_json::Value {
        let (owner, name) = full_name.split_once('/').unwrap();
        serde_json::json!({
            "id": id,
            "name": name,
            "full_name": full_name,
            "owner": { "login": owner, "avatar_url": "https://avatars.example/u" },
            "description": null,
            "html_url": format!("https://github.com/{}", full_name),
            "homepage": "",
            "stargazers_count": 9000,
            "forks_count": 12,
            "watchers_count": 9000,
            "open_issues_count": 3,
            "language": null,
            "topics": [],
            "license": null,
            "created_at": "2021-05-01T00:00:00Z",
            "updated_at": "2024-05-01T00:00:00Z",
            "pushed_at": null,
            "size": 10,
            "default_branch": "main"
        })
    }

    async fn provider_for(server: &MockServer) -> GitHubProvider {
        let client = GitHubClient::with_base_url(server.uri(), DEFAULT_TIMEOUT).unwrap();
        GitHubProvider::new(client)
    }

    #[tokio::test]
    async fn test_most_starred_page_count_is_capped() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "total_count": 12000,
            "items": [repo_json(7, "octo/big")]
        });

        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .and(query_param("q", "stars:>5000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let request = SearchRequest::new(SearchCriteria::Category(Category::MostStarred));

        match provider.search(&request).await.unwrap() {
            SearchOutcome::Results(page) => {
                assert_eq!(page.total_pages, 34);
                assert_eq!(page.total_count, 12000);
                assert_eq!(page.items[0].id, 7);
                // Empty homepage and missing push date get normalised
                assert_eq!(page.items[0].homepage_url, None);
                assert_eq!(page.items[0].pushed_at, page.items[0].updated_at);
            }
            SearchOutcome::NoMatches => panic!("expected results"),
        }
    }

    #[tokio::test]
    async fn test_zero_matches_is_not_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "total_count": 0, "items": [] })),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let request = SearchRequest::new(SearchCriteria::Query("zzzzqqqq".into()));

        assert_eq!(provider.search(&request).await.unwrap(), SearchOutcome::NoMatches);
    }

    #[tokio::test]
    async fn test_detail_calls_reject_bad_names() {
        let server = MockServer::start().await;
        let provider = provider_for(&server).await;

        let err = provider.get_repository("not-a-full-name").await.unwrap_err();
        assert!(matches!(err, Error::ApiError(_)));
    }

    #[tokio::test]
    async fn test_open_issues_are_mapped() {
        let server = MockServer::start().await;
        let body = serde_json::json!([{
            "number": 42,
            "title": "Crash on startup",
            "html_url": "https://github.com/octo/cat/issues/42",
            "user": { "login": "hubot" },
            "created_at": "2024-05-01T00:00:00Z",
            "comments": 3,
            "labels": [{ "name": "bug", "color": "d73a4a" }]
        }]);

        Mock::given(method("GET"))
            .and(path("/repos/octo/cat/issues"))
            .and(query_param("state", "open"))
            .and(query_param("per_page", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let repo = provider_repo("octo/cat");
        let issues = provider.open_issues(&repo).await.unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].number, 42);
        assert_eq!(issues[0].author, "hubot");
        assert_eq!(issues[0].labels[0].color, "d73a4a");
    }

    fn provider_repo(full_name: &str) -> Repository {
        crate::models::fixtures::repo(1, full_name)
    }
}
