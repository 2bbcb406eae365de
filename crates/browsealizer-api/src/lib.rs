// GitHub API client plus the rate limit bookkeeping that gates it
pub mod github;
pub mod rate_limit;

// Re-export common types
pub use github::{
    GitHubClient, GitHubContributor, GitHubError, GitHubIssue, GitHubLabel, GitHubRepo,
    SearchResponse, WeeklyCommitActivity, DEFAULT_TIMEOUT,
};
pub use rate_limit::{
    Quota, QuotaStatus, RateLimitState, RateTracker, RequestLogEntry, ResetWait,
    LOW_QUOTA_THRESHOLD, REQUEST_LOG_CAPACITY,
};
