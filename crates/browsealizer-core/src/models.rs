use browsealizer_cache::Cacheable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GitHub's numeric repository id - the identity everything is keyed by
pub type RepoId = u64;

/// Repository model - the star of the show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepoId,
    pub full_name: String,
    pub description: Option<String>,
    pub url: String,
    pub homepage_url: Option<String>,
    pub stars: u32,
    pub forks: u32,
    pub watchers: u32,
    pub open_issues: u32,
    pub language: Option<String>,
    pub topics: Vec<String>,
    pub license: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: DateTime<Utc>,
    /// In KB, the way GitHub reports it
    pub size: u64,
    pub default_branch: String,
    pub is_archived: bool,
}

impl Repository {
    /// Tags shown on a recommendation: language, license, first two topics
    pub fn tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        if let Some(lang) = &self.language {
            tags.push(lang.clone());
        }
        if let Some(license) = &self.license {
            tags.push(license.clone());
        }
        tags.extend(self.topics.iter().take(2).cloned());
        tags
    }
}

impl Cacheable for Repository {
    type Id = RepoId;

    fn cache_id(&self) -> RepoId {
        self.id
    }
}

/// "owner/name" -> ("owner", "name"), rejecting anything else
pub fn split_full_name(full_name: &str) -> Option<(&str, &str)> {
    let (owner, name) = full_name.split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((owner, name))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub comments: u32,
    pub labels: Vec<IssueLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueLabel {
    pub name: String,
    /// Hex without the leading '#'
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub login: String,
    pub avatar_url: String,
    pub profile_url: String,
    pub contributions: u32,
}

/// Weekly commit totals, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitActivity {
    pub weeks: Vec<WeeklyCommits>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyCommits {
    pub week_start: DateTime<Utc>,
    pub total: u32,
}

/// How many weeks the activity chart shows
pub const ACTIVITY_WEEKS: usize = 12;

impl CommitActivity {
    /// Keep only the last twelve weeks
    pub fn recent(weeks: Vec<WeeklyCommits>) -> Self {
        let skip = weeks.len().saturating_sub(ACTIVITY_WEEKS);
        Self {
            weeks: weeks.into_iter().skip(skip).collect(),
        }
    }

    pub fn total_commits(&self) -> u32 {
        self.weeks.iter().map(|w| w.total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }
}

/// Outcome of one detail tab. Each tab fails on its own.
pub type TabResult<T> = std::result::Result<T, String>;

/// Everything the detail view shows for one repository
#[derive(Debug, Clone)]
pub struct RepositoryDetail {
    pub repository: Repository,
    /// `Ok(None)` is "this repository has no README"
    pub readme: TabResult<Option<String>>,
    pub activity: TabResult<CommitActivity>,
    pub issues: TabResult<Vec<Issue>>,
    pub contributors: TabResult<Vec<Contributor>>,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_full_name() {
        assert_eq!(split_full_name("rust-lang/rust"), Some(("rust-lang", "rust")));
        assert_eq!(split_full_name("rust-lang"), None);
        assert_eq!(split_full_name("/rust"), None);
        assert_eq!(split_full_name("a/b/c"), None);
    }

    #[test]
    fn test_tags_take_two_topics() {
        let repo = fixtures::repo(1, "octo/cat");
        assert_eq!(repo.tags(), vec!["Rust", "MIT License", "cli", "tui"]);
    }

    #[test]
    fn test_recent_activity_keeps_last_twelve_weeks() {
        let weeks: Vec<WeeklyCommits> = (0..52)
            .map(|i| WeeklyCommits {
                week_start: Utc::now(),
                total: i,
            })
            .collect();

        let activity = CommitActivity::recent(weeks);
        assert_eq!(activity.weeks.len(), ACTIVITY_WEEKS);
        assert_eq!(activity.weeks[0].total, 40);
        assert_eq!(activity.total_commits(), (40..52).sum::<u32>());
    }
}
