use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
///
/// Static tunables only. Things the user flips at runtime (dark mode,
/// favorites, recommendation interval) live in the preferences record.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub recommendations: RecommendationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load config from default location, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&contents)
        } else {
            // No config file? Use defaults
            Ok(Self::default())
        }
    }

    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        toml::from_str(contents)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Get the config file path
    /// Uses XDG on Linux/macOS, AppData on Windows
    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("browsealizer");

        Ok(config_dir.join("config.toml"))
    }

    /// Where the preferences record lives
    pub fn state_path(&self) -> crate::Result<PathBuf> {
        if let Some(path) = &self.storage.state_path {
            return Ok(path.clone());
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find data directory".into()))?
            .join("browsealizer");

        Ok(data_dir.join("browsealizer_state.json"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// API URL (for GitHub Enterprise)
    #[serde(default = "default_github_url")]
    pub api_url: String,

    /// Client-side deadline for every call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_github_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Browsealizer/0.1.0".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    #[serde(default = "default_issues_per_page")]
    pub issues_per_page: u32,

    #[serde(default = "default_contributors_per_page")]
    pub contributors_per_page: u32,
}

fn default_per_page() -> u32 {
    30
}

fn default_issues_per_page() -> u32 {
    5
}

fn default_contributors_per_page() -> u32 {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            issues_per_page: default_issues_per_page(),
            contributors_per_page: default_contributors_per_page(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    /// Pause between one popup going away and the next one showing
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Wait this long after startup before the first popup
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,

    /// How long a popup stays up unless the user changed it
    #[serde(default = "default_interval_ms")]
    pub default_interval_ms: u64,
}

fn default_cooldown_ms() -> u64 {
    2000
}

fn default_startup_delay_ms() -> u64 {
    5000
}

fn default_interval_ms() -> u64 {
    10000
}

impl RecommendationConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            startup_delay_ms: default_startup_delay_ms(),
            default_interval_ms: default_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Override for the preferences file
    pub state_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.timeout_secs, 10);
        assert_eq!(config.search.per_page, 30);
        assert_eq!(config.recommendations.cooldown(), Duration::from_secs(2));
        assert_eq!(config.recommendations.startup_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = Config::from_toml(
            r#"
            [github]
            timeout_secs = 3

            [storage]
            state_path = "/tmp/state.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.github.timeout_secs, 3);
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.recommendations.default_interval_ms, 10000);
        assert_eq!(
            config.state_path().unwrap(),
            PathBuf::from("/tmp/state.json")
        );
    }

    #[test]
    fn test_bad_config_is_a_config_error() {
        let err = Config::from_toml("[github]\ntimeout_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, crate::Error::ConfigError(_)));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("timeout_secs"));
        assert!(toml.contains("cooldown_ms"));
    }
}
