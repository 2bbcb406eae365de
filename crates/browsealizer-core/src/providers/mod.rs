// Provider implementations - only GitHub for now
pub mod github;

pub use github::GitHubProvider;
