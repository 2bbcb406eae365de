//! Recommendation popups.
//!
//! The scheduler is a plain state machine: callers feed it events together
//! with the current instant and get back what the UI should do. Timers are
//! just deadlines it hands out through [`RecommendationScheduler::next_deadline`];
//! whoever drives it sleeps until then and calls [`RecommendationScheduler::poll`].
//! Nothing here spawns tasks, so a disabled scheduler can't be woken by a
//! stale timer.

use crate::models::{RepoId, Repository};
use browsealizer_cache::ResultCache;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// FIFO of repositories waiting to be shown. Never holds the same id twice.
#[derive(Debug, Clone, Default)]
pub struct RecommendationQueue {
    items: VecDeque<Repository>,
    ids: HashSet<RepoId>,
}

impl RecommendationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the repositories not already queued, keeping their order.
    /// Returns how many were added.
    pub fn extend<I>(&mut self, repos: I) -> usize
    where
        I: IntoIterator<Item = Repository>,
    {
        let mut added = 0;
        for repo in repos {
            if self.ids.insert(repo.id) {
                self.items.push_back(repo);
                added += 1;
            }
        }
        added
    }

    pub fn pop(&mut self) -> Option<Repository> {
        let repo = self.items.pop_front()?;
        self.ids.remove(&repo.id);
        Some(repo)
    }

    pub fn contains(&self, id: RepoId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Repository> {
        self.items.iter()
    }
}

/// What the popup should do in response to an event
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    Show(Repository),
    Hide,
}

/// Coarse view of the state, for callers and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Showing,
    Cooldown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// `wake_at` is only set by the startup delay
    Idle { wake_at: Option<Instant> },
    Showing { hide_at: Instant },
    Cooldown { until: Instant },
}

/// Timings for the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerTimings {
    /// How long a popup stays up
    pub interval: Duration,
    /// Gap between one popup going away and the next
    pub cooldown: Duration,
    /// Wait before the very first popup
    pub startup_delay: Duration,
}

impl Default for SchedulerTimings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            cooldown: Duration::from_secs(2),
            startup_delay: Duration::from_secs(5),
        }
    }
}

pub struct RecommendationScheduler {
    queue: RecommendationQueue,
    state: State,
    active: Option<Repository>,
    enabled: bool,
    timings: SchedulerTimings,
}

impl RecommendationScheduler {
    pub fn new(timings: SchedulerTimings, enabled: bool) -> Self {
        let mut timings = timings;
        timings.interval = timings.interval.max(Duration::from_millis(1));

        Self {
            queue: RecommendationQueue::new(),
            state: State::Idle { wake_at: None },
            active: None,
            enabled,
            timings,
        }
    }

    /// Arm the startup delay. The first popup shows once it passes, from the
    /// queue or from the cache.
    pub fn start(&mut self, now: Instant) {
        if let State::Idle { .. } = self.state {
            self.state = State::Idle {
                wake_at: Some(now + self.timings.startup_delay),
            };
        }
    }

    /// Queue fresh results. Shows one right away if nothing is up.
    pub fn enqueue<I>(&mut self, repos: I, now: Instant) -> Vec<SchedulerEvent>
    where
        I: IntoIterator<Item = Repository>,
    {
        let added = self.queue.extend(repos);
        if added > 0 {
            debug!("Queued {} recommendations ({} waiting)", added, self.queue.len());
        }

        let mut events = Vec::new();
        if matches!(self.state, State::Idle { .. }) && self.enabled && !self.queue.is_empty() {
            events.extend(self.show_next(now));
        }
        events
    }

    /// Advance every timer that has expired by `now`.
    ///
    /// `cache` is where the queue is refilled from once it runs dry, unless
    /// `rate_limited` is set.
    pub fn poll(
        &mut self,
        now: Instant,
        cache: &ResultCache<Repository>,
        rate_limited: bool,
    ) -> Vec<SchedulerEvent> {
        let mut events = Vec::new();

        loop {
            match self.state {
                State::Showing { hide_at } if hide_at <= now => {
                    self.active = None;
                    self.state = State::Cooldown {
                        until: hide_at + self.timings.cooldown,
                    };
                    events.push(SchedulerEvent::Hide);
                }
                State::Cooldown { until } if until <= now => {
                    self.state = State::Idle { wake_at: None };
                    match self.attempt_show(until, cache, rate_limited) {
                        Some(event) => events.push(event),
                        None => break,
                    }
                }
                State::Idle { wake_at: Some(at) } if at <= now => {
                    self.state = State::Idle { wake_at: None };
                    match self.attempt_show(at, cache, rate_limited) {
                        Some(event) => events.push(event),
                        None => break,
                    }
                }
                _ => break,
            }
        }

        events
    }

    /// When `poll` next has something to do
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            State::Idle { wake_at } => wake_at,
            State::Showing { hide_at } => Some(hide_at),
            State::Cooldown { until } => Some(until),
        }
    }

    /// User closed the popup. The next one follows after the cooldown.
    pub fn dismiss(&mut self, now: Instant) -> Vec<SchedulerEvent> {
        match self.state {
            State::Showing { .. } => {
                self.active = None;
                self.state = State::Cooldown {
                    until: now + self.timings.cooldown,
                };
                vec![SchedulerEvent::Hide]
            }
            _ => Vec::new(),
        }
    }

    /// Turning it off hides the popup at once and drops every pending timer.
    /// Turning it back on shows the next one straight away.
    pub fn set_enabled(
        &mut self,
        enabled: bool,
        now: Instant,
        cache: &ResultCache<Repository>,
        rate_limited: bool,
    ) -> Vec<SchedulerEvent> {
        if self.enabled == enabled {
            return Vec::new();
        }
        self.enabled = enabled;

        let mut events = Vec::new();
        if !enabled {
            if matches!(self.state, State::Showing { .. }) {
                events.push(SchedulerEvent::Hide);
            }
            self.active = None;
            self.state = State::Idle { wake_at: None };
        } else if matches!(self.state, State::Idle { .. }) {
            self.state = State::Idle { wake_at: None };
            events.extend(self.attempt_show(now, cache, rate_limited));
        }
        events
    }

    /// Applies from the next popup on
    pub fn set_interval(&mut self, interval: Duration) {
        self.timings.interval = interval.max(Duration::from_millis(1));
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle { .. } => Phase::Idle,
            State::Showing { .. } => Phase::Showing,
            State::Cooldown { .. } => Phase::Cooldown,
        }
    }

    /// The repository currently on screen
    pub fn active(&self) -> Option<&Repository> {
        self.active.as_ref()
    }

    pub fn queue(&self) -> &RecommendationQueue {
        &self.queue
    }

    pub fn timings(&self) -> SchedulerTimings {
        self.timings
    }

    fn attempt_show(
        &mut self,
        at: Instant,
        cache: &ResultCache<Repository>,
        rate_limited: bool,
    ) -> Option<SchedulerEvent> {
        if !self.enabled {
            return None;
        }

        if self.queue.is_empty() {
            if rate_limited {
                debug!("Rate limited, not replaying recommendations from cache");
                return None;
            }
            let mut replay = cache.get_all();
            replay.sort_by(|a, b| b.stars.cmp(&a.stars).then(a.id.cmp(&b.id)));
            self.queue.extend(replay);
        }

        self.show_next(at)
    }

    fn show_next(&mut self, at: Instant) -> Option<SchedulerEvent> {
        let repo = self.queue.pop()?;
        self.state = State::Showing {
            hide_at: at + self.timings.interval,
        };
        self.active = Some(repo.clone());
        Some(SchedulerEvent::Show(repo))
    }
}
