//! Rate limiting for viewport-change events.
//!
//! Panning or zooming a map emits many bounds changes per second. Two gates
//! keep that from turning into a request storm:
//!
//! - **Minimum interval**: an event arriving sooner than `min_fetch_interval`
//!   after the previously *accepted* event is dropped.
//! - **Settle delay**: an accepted event only fetches after `settle_delay`
//!   has passed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};

/// Default minimum time between accepted viewport changes
pub const DEFAULT_MIN_FETCH_INTERVAL: Duration = Duration::from_secs(1);

/// Default wait between accepting a viewport change and fetching it
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// What happens to a fetch still waiting out its settle delay when a newer
/// viewport change is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleMode {
    /// Every accepted change fetches once its own delay elapses.
    #[default]
    Independent,
    /// A newer accepted change supersedes any fetch still waiting to start.
    /// Fetches already sent are never cancelled.
    Restart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub min_fetch_interval: Duration,
    pub settle_delay: Duration,
    pub settle_mode: SettleMode,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            min_fetch_interval: DEFAULT_MIN_FETCH_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
            settle_mode: SettleMode::default(),
        }
    }
}

/// Verdict on a single viewport-change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accepted {
        /// Earliest moment the fetch may be issued.
        fire_at: Instant,
        /// Monotonic id of this acceptance, used to detect superseded fetches.
        generation: u64,
    },
    Dropped {
        since_last: Duration,
    },
}

#[derive(Debug)]
pub struct ViewportDebouncer {
    settings: SyncSettings,
    last_accepted: Option<Instant>,
    latest_generation: Arc<AtomicU64>,
}

impl ViewportDebouncer {
    pub fn new(settings: SyncSettings) -> Self {
        Self {
            settings,
            last_accepted: None,
            latest_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Gate an event observed at `now`. The first event is always accepted.
    pub fn offer(&mut self, now: Instant) -> Decision {
        if let Some(last) = self.last_accepted {
            let since_last = now.saturating_duration_since(last);
            if since_last < self.settings.min_fetch_interval {
                return Decision::Dropped { since_last };
            }
        }

        self.last_accepted = Some(now);
        let generation = self.latest_generation.fetch_add(1, Ordering::SeqCst) + 1;
        Decision::Accepted {
            fire_at: now + self.settings.settle_delay,
            generation,
        }
    }

    /// Shared view of the latest accepted generation, readable from fetch tasks.
    pub fn generation_tracker(&self) -> GenerationTracker {
        GenerationTracker {
            latest: Arc::clone(&self.latest_generation),
            mode: self.settings.settle_mode,
        }
    }
}

/// Lets a delayed fetch task ask whether it has been superseded.
#[derive(Debug, Clone)]
pub struct GenerationTracker {
    latest: Arc<AtomicU64>,
    mode: SettleMode,
}

impl GenerationTracker {
    pub fn is_superseded(&self, generation: u64) -> bool {
        match self.mode {
            SettleMode::Independent => false,
            SettleMode::Restart => self.latest.load(Ordering::SeqCst) != generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted(decision: Decision) -> (Instant, u64) {
        match decision {
            Decision::Accepted {
                fire_at,
                generation,
            } => (fire_at, generation),
            Decision::Dropped { .. } => panic!("expected accepted, got {:?}", decision),
        }
    }

    #[test]
    fn test_first_event_accepted() {
        let mut debouncer = ViewportDebouncer::new(SyncSettings::default());
        let now = Instant::now();
        let (fire_at, generation) = accepted(debouncer.offer(now));
        assert_eq!(fire_at, now + DEFAULT_SETTLE_DELAY);
        assert_eq!(generation, 1);
    }

    #[test]
    fn test_events_within_interval_dropped() {
        let mut debouncer = ViewportDebouncer::new(SyncSettings::default());
        let t0 = Instant::now();
        accepted(debouncer.offer(t0));

        assert_eq!(
            debouncer.offer(t0 + Duration::from_millis(300)),
            Decision::Dropped {
                since_last: Duration::from_millis(300)
            }
        );
        assert!(matches!(
            debouncer.offer(t0 + Duration::from_millis(999)),
            Decision::Dropped { .. }
        ));

        // Measured from the last accepted event, not the last dropped one
        let (fire_at, generation) = accepted(debouncer.offer(t0 + Duration::from_millis(1200)));
        assert_eq!(fire_at, t0 + Duration::from_millis(1700));
        assert_eq!(generation, 2);
    }

    #[test]
    fn test_exact_interval_accepted() {
        let mut debouncer = ViewportDebouncer::new(SyncSettings::default());
        let t0 = Instant::now();
        accepted(debouncer.offer(t0));
        accepted(debouncer.offer(t0 + DEFAULT_MIN_FETCH_INTERVAL));
    }

    #[test]
    fn test_generation_tracker() {
        let settings = SyncSettings {
            settle_mode: SettleMode::Restart,
            min_fetch_interval: Duration::ZERO,
            ..SyncSettings::default()
        };
        let mut debouncer = ViewportDebouncer::new(settings);
        let tracker = debouncer.generation_tracker();

        let t0 = Instant::now();
        let (_, first) = accepted(debouncer.offer(t0));
        assert!(!tracker.is_superseded(first));

        let (_, second) = accepted(debouncer.offer(t0 + Duration::from_millis(10)));
        assert!(tracker.is_superseded(first));
        assert!(!tracker.is_superseded(second));
    }

    #[test]
    fn test_independent_mode_never_supersedes() {
        let mut debouncer = ViewportDebouncer::new(SyncSettings::default());
        let tracker = debouncer.generation_tracker();
        let t0 = Instant::now();
        let (_, first) = accepted(debouncer.offer(t0));
        accepted(debouncer.offer(t0 + Duration::from_secs(2)));
        assert!(!tracker.is_superseded(first));
    }
}
