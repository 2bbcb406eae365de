// GitHub REST client - read-only, unauthenticated, one shared quota
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::rate_limit::{Quota, RateLimitState, RateTracker, RequestLogEntry, ResetWait};

const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "Browsealizer/0.1.0";

/// Every call gets this long before we give up on it
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("GitHub API rate limit exceeded. Try again in {wait}")]
    RateLimited { wait: ResetWait },

    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API request failed (status {status}): {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Could not decode README: {0}")]
    DecodeError(String),
}

pub type Result<T> = std::result::Result<T, GitHubError>;

/// Status + body of a finished call, quota already applied
struct ApiResponse {
    status: StatusCode,
    body: String,
}

impl ApiResponse {
    /// Parse a success body, turning everything else into the matching error
    fn json<T: DeserializeOwned>(self, what: &str) -> Result<T> {
        if self.status.is_success() {
            return Ok(serde_json::from_str(&self.body)?);
        }
        Err(self.into_error(what))
    }

    fn into_error(self, what: &str) -> GitHubError {
        if self.status == StatusCode::NOT_FOUND {
            return GitHubError::NotFound(what.to_string());
        }

        // GitHub error bodies look like {"message": "...", "documentation_url": "..."}
        let message = serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or(self.body);

        GitHubError::RequestFailed {
            status: self.status.as_u16(),
            message,
        }
    }
}

pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    tracker: Arc<Mutex<RateTracker>>,
}

impl GitHubClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(GITHUB_API_BASE.to_string(), DEFAULT_TIMEOUT)
    }

    /// For GitHub Enterprise, or a mock server in tests
    pub fn with_base_url(base_url: String, timeout: Duration) -> Result<Self> {
        Self::with_options(base_url, timeout, USER_AGENT)
    }

    /// GitHub rejects requests without a User-Agent, so a bad one falls back
    /// to ours instead of failing
    pub fn with_options(base_url: String, timeout: Duration, user_agent: &str) -> Result<Self> {
        let agent = reqwest::header::HeaderValue::from_str(user_agent).unwrap_or_else(|_| {
            warn!("Invalid user agent {:?}, using {}", user_agent, USER_AGENT);
            reqwest::header::HeaderValue::from_static(USER_AGENT)
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::USER_AGENT, agent);
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            tracker: Arc::new(Mutex::new(RateTracker::new())),
        })
    }

    fn tracker(&self) -> MutexGuard<'_, RateTracker> {
        // Nothing panics while holding this lock, but don't let a poisoned
        // mutex take the whole client down with it
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Peek at the tracker without exposing the lock
    pub fn with_tracker<R>(&self, f: impl FnOnce(&mut RateTracker) -> R) -> R {
        f(&mut self.tracker())
    }

    pub fn rate_limit_state(&self) -> RateLimitState {
        self.tracker().state()
    }

    pub fn is_rate_limited(&self) -> bool {
        self.tracker().is_exhausted()
    }

    pub fn time_until_reset(&self) -> ResetWait {
        self.tracker().time_until_reset()
    }

    pub fn request_log(&self) -> Vec<RequestLogEntry> {
        self.tracker().request_log().cloned().collect()
    }

    /// Issue a GET, gated on quota and bounded by the client timeout
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse> {
        {
            let tracker = self.tracker();
            if tracker.is_exhausted() {
                let wait = tracker.time_until_reset();
                warn!("Refusing to call {}: rate limit exhausted", path);
                return Err(GitHubError::RateLimited { wait });
            }
        }

        self.send(path, query).await
    }

    async fn send(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.get(&url).query(query).build()?;

        self.tracker().record_request(request.url().as_str());
        debug!("GET {}", request.url());

        let call = async {
            let response = self.client.execute(request).await?;

            // Quota comes along on every response, failures included
            self.tracker().apply_headers(response.headers());

            let status = response.status();
            let body = response.text().await?;
            Ok::<_, GitHubError>(ApiResponse { status, body })
        };

        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Request to {} timed out", path);
                Err(GitHubError::Timeout(self.timeout))
            }
        }
    }

    /// Ask GitHub how much quota is left.
    ///
    /// This endpoint doesn't count against the quota, so it skips the
    /// exhaustion check and is the way back out of an exhausted state.
    pub async fn check_rate_limit(&self) -> Result<RateLimitState> {
        let response = self.send("/rate_limit", &[]).await?;
        let data: RateLimitResponse = response.json("rate limit")?;

        // Search has its own, much smaller, bucket and that's what we burn
        if let Some(search) = data.resources.and_then(|r| r.search) {
            self.tracker()
                .apply_quota(Quota::new(search.limit, search.remaining, Some(search.reset)));
        }

        Ok(self.rate_limit_state())
    }

    /// Search repositories. `query` uses GitHub search syntax.
    pub async fn search_repositories(
        &self,
        query: &str,
        sort: &str,
        order: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchResponse> {
        let params = [
            ("q", query.to_string()),
            ("sort", sort.to_string()),
            ("order", order.to_string()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];

        let response = self.get("/search/repositories", &params).await?;
        response.json(query)
    }

    pub async fn get_repository(&self, owner: &str, repo: &str) -> Result<GitHubRepo> {
        let path = repo_path(owner, repo, "");
        let response = self.get(&path, &[]).await?;
        response.json(&format!("{}/{}", owner, repo))
    }

    /// Fetch and decode the README. `Ok(None)` means the repo simply has none.
    pub async fn get_readme(&self, owner: &str, repo: &str) -> Result<Option<String>> {
        let path = repo_path(owner, repo, "/readme");
        let response = self.get(&path, &[]).await?;

        if response.status == StatusCode::NOT_FOUND {
            debug!("No README for {}/{}", owner, repo);
            return Ok(None);
        }

        let readme: ReadmeResponse = response.json(&format!("README for {}/{}", owner, repo))?;
        readme.decode().map(Some)
    }

    /// Weekly commit totals for the last year
    pub async fn get_commit_activity(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<WeeklyCommitActivity>> {
        let path = repo_path(owner, repo, "/stats/commit_activity");
        let response = self.get(&path, &[]).await?;

        // 202: GitHub is still crunching the numbers. 204: empty repository.
        if response.status == StatusCode::ACCEPTED || response.status == StatusCode::NO_CONTENT {
            debug!("Commit activity for {}/{} not ready yet", owner, repo);
            return Ok(Vec::new());
        }

        response.json(&format!("commit activity for {}/{}", owner, repo))
    }

    pub async fn get_open_issues(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> Result<Vec<GitHubIssue>> {
        let path = repo_path(owner, repo, "/issues");
        let params = [("state", "open".to_string()), ("per_page", per_page.to_string())];
        let response = self.get(&path, &params).await?;
        response.json(&format!("issues for {}/{}", owner, repo))
    }

    pub async fn get_contributors(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> Result<Vec<GitHubContributor>> {
        let path = repo_path(owner, repo, "/contributors");
        let params = [("per_page", per_page.to_string())];
        let response = self.get(&path, &params).await?;

        if response.status == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }

        response.json(&format!("contributors for {}/{}", owner, repo))
    }
}

fn repo_path(owner: &str, repo: &str, suffix: &str) -> String {
    format!(
        "/repos/{}/{}{}",
        urlencoding::encode(owner),
        urlencoding::encode(repo),
        suffix
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total_count: u64,
    pub items: Vec<GitHubRepo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: GitHubOwner,
    pub description: Option<String>,
    pub html_url: String,
    pub homepage: Option<String>,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub watchers_count: u32,
    #[serde(default)]
    pub open_issues_count: u32,
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub license: Option<GitHubLicense>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Null for repositories nobody ever pushed to
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub size: u64,
    pub default_branch: String,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubOwner {
    pub login: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubLicense {
    pub key: String,
    pub name: String,
    pub spdx_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReadmeResponse {
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

impl ReadmeResponse {
    fn decode(self) -> Result<String> {
        let content = self
            .content
            .ok_or_else(|| GitHubError::DecodeError("response carried no content".into()))?;

        if let Some(encoding) = self.encoding.as_deref() {
            if encoding != "base64" {
                return Err(GitHubError::DecodeError(format!(
                    "unsupported encoding {}",
                    encoding
                )));
            }
        }

        // GitHub wraps the base64 payload at 60 columns
        let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| GitHubError::DecodeError(e.to_string()))?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// One week of commit counts. `week` is the unix timestamp of the Sunday it starts on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyCommitActivity {
    pub week: i64,
    pub total: u32,
    #[serde(default)]
    pub days: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubIssue {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub user: GitHubUser,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub comments: u32,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubLabel {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubContributor {
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
    #[serde(default)]
    pub contributions: u32,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: Option<RateLimitResources>,
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    search: Option<RateLimitBucket>,
}

#[derive(Debug, Deserialize)]
struct RateLimitBucket {
    limit: u32,
    remaining: u32,
    reset: i64,
}
