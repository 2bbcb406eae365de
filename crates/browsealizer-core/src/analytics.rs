// Session analytics - kept in memory and written to the log, never sent anywhere
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use tracing::info;

/// Most recent events kept in memory; counts cover the whole session
pub const MAX_TRACKED_EVENTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsEvent {
    AppLoaded,
    SearchResults,
    SearchNoResults,
    ViewRepositoryDetails,
    AddFavorite,
    RemoveFavorite,
    ShowRecommendation,
}

impl AnalyticsEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticsEvent::AppLoaded => "app_loaded",
            AnalyticsEvent::SearchResults => "search_results",
            AnalyticsEvent::SearchNoResults => "search_no_results",
            AnalyticsEvent::ViewRepositoryDetails => "view_repository_details",
            AnalyticsEvent::AddFavorite => "add_favorite",
            AnalyticsEvent::RemoveFavorite => "remove_favorite",
            AnalyticsEvent::ShowRecommendation => "show_recommendation",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackedEvent {
    pub event: AnalyticsEvent,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Default)]
pub struct Analytics {
    events: VecDeque<TrackedEvent>,
    counts: HashMap<AnalyticsEvent, usize>,
}

impl Analytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event with its key/value payload
    pub fn track<I, K>(&mut self, event: AnalyticsEvent, data: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let data: Map<String, Value> = data.into_iter().map(|(k, v)| (k.into(), v)).collect();
        info!(target: "analytics", event = event.name(), data = %serde_json::Value::Object(data.clone()));

        if self.events.len() >= MAX_TRACKED_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(TrackedEvent {
            event,
            timestamp: Utc::now(),
            data,
        });
        *self.counts.entry(event).or_insert(0) += 1;
    }

    /// Oldest first
    pub fn events(&self) -> impl Iterator<Item = &TrackedEvent> {
        self.events.iter()
    }

    pub fn count(&self, event: AnalyticsEvent) -> usize {
        self.counts.get(&event).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_track_keeps_payload() {
        let mut analytics = Analytics::new();
        analytics.track(
            AnalyticsEvent::SearchResults,
            [("query", json!("rust")), ("count", json!(30))],
        );
        analytics.track(AnalyticsEvent::AppLoaded, Vec::<(String, Value)>::new());

        assert_eq!(analytics.events().count(), 2);
        assert_eq!(analytics.count(AnalyticsEvent::SearchResults), 1);

        let first = analytics.events().next().unwrap();
        let json = serde_json::to_value(first).unwrap();
        assert_eq!(json["event"], "search_results");
        assert_eq!(json["query"], "rust");
        assert_eq!(json["count"], 30);
    }

    #[test]
    fn test_event_log_is_bounded() {
        let mut analytics = Analytics::new();
        for i in 0..MAX_TRACKED_EVENTS + 5 {
            analytics.track(AnalyticsEvent::ShowRecommendation, [("n", json!(i))]);
        }

        assert_eq!(analytics.events().count(), MAX_TRACKED_EVENTS);
        let oldest = analytics.events().next().unwrap();
        assert_eq!(oldest.data["n"], 5);
        // Counts still cover everything tracked
        assert_eq!(
            analytics.count(AnalyticsEvent::ShowRecommendation),
            MAX_TRACKED_EVENTS + 5
        );
    }
}
