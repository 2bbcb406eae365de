// Rate limit bookkeeping for the unauthenticated GitHub API
//
// The tracker never predicts usage. It only mirrors whatever the server said
// last, so a second tab or another tool burning the same quota can't make us drift.
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// How many recent requests we keep around for diagnostics
pub const REQUEST_LOG_CAPACITY: usize = 10;

/// Below this many remaining requests the user gets nagged
pub const LOW_QUOTA_THRESHOLD: u32 = 10;

/// Unauthenticated GitHub clients get 60 requests an hour
const DEFAULT_LIMIT: u32 = 60;

/// Last known quota as reported by GitHub
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: Option<DateTime<Utc>>,
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            remaining: DEFAULT_LIMIT,
            reset_at: None,
        }
    }
}

/// A quota report pulled from a response (headers or the /rate_limit body)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
    pub reset_epoch_secs: Option<i64>,
}

impl Quota {
    pub fn new(limit: u32, remaining: u32, reset_epoch_secs: Option<i64>) -> Self {
        Self {
            limit,
            remaining,
            reset_epoch_secs,
        }
    }

    /// Read the `x-ratelimit-*` headers.
    ///
    /// Returns `None` when the response didn't report a quota at all, which
    /// happens on some error paths and on anything served by a proxy.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let limit = header_number::<u32>(headers, "x-ratelimit-limit")?;
        let remaining = header_number::<u32>(headers, "x-ratelimit-remaining")?;
        let reset = header_number::<i64>(headers, "x-ratelimit-reset");

        Some(Self::new(limit, remaining, reset))
    }
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// One outbound call, kept for diagnostics only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLogEntry {
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

/// What happened when a quota report was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaStatus {
    Healthy,
    Low { remaining: u32 },
}

/// How long until the quota window resets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetWait {
    /// We've never heard a reset time from the server
    Unknown,
    /// The reset time is already behind us
    Soon,
    In(Duration),
}

impl fmt::Display for ResetWait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetWait::Unknown => write!(f, "unknown"),
            ResetWait::Soon => write!(f, "soon"),
            ResetWait::In(wait) => {
                let secs = wait.as_secs();
                write!(f, "{}m {}s", secs / 60, secs % 60)
            }
        }
    }
}

/// Tracks call history and the server-reported quota
#[derive(Debug, Default)]
pub struct RateTracker {
    state: RateLimitState,
    request_count: u64,
    request_log: VecDeque<RequestLogEntry>,
    last_updated: Option<DateTime<Utc>>,
    pending_warning: Option<u32>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember an outbound call. Oldest entry goes once the log is full.
    pub fn record_request(&mut self, url: &str) {
        self.request_count += 1;

        if self.request_log.len() >= REQUEST_LOG_CAPACITY {
            self.request_log.pop_front();
        }
        self.request_log.push_back(RequestLogEntry {
            url: url.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Overwrite the quota with the server's numbers
    pub fn apply_quota(&mut self, quota: Quota) -> QuotaStatus {
        self.state.limit = quota.limit;
        self.state.remaining = quota.remaining;
        if let Some(reset) = quota.reset_epoch_secs {
            self.state.reset_at = Utc.timestamp_opt(reset, 0).single();
        }
        self.last_updated = Some(Utc::now());

        debug!(
            "Rate limit updated: {}/{} remaining",
            quota.remaining, quota.limit
        );

        if quota.remaining < LOW_QUOTA_THRESHOLD {
            warn!(
                "API rate limit getting low: {} requests remaining",
                quota.remaining
            );
            self.pending_warning = Some(quota.remaining);
            QuotaStatus::Low {
                remaining: quota.remaining,
            }
        } else {
            QuotaStatus::Healthy
        }
    }

    /// Apply whatever quota the response headers carry; no-op when they carry none
    pub fn apply_headers(&mut self, headers: &HeaderMap) -> Option<QuotaStatus> {
        Quota::from_headers(headers).map(|quota| self.apply_quota(quota))
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.remaining == 0
    }

    pub fn time_until_reset(&self) -> ResetWait {
        self.time_until_reset_at(Utc::now())
    }

    pub fn time_until_reset_at(&self, now: DateTime<Utc>) -> ResetWait {
        let Some(reset_at) = self.state.reset_at else {
            return ResetWait::Unknown;
        };

        match (reset_at - now).to_std() {
            Ok(wait) if !wait.is_zero() => ResetWait::In(wait),
            _ => ResetWait::Soon,
        }
    }

    /// Hand out the most recent low-quota warning once
    pub fn take_low_quota_warning(&mut self) -> Option<u32> {
        self.pending_warning.take()
    }

    pub fn state(&self) -> RateLimitState {
        self.state
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn request_log(&self) -> impl Iterator<Item = &RequestLogEntry> {
        self.request_log.iter()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }
}
