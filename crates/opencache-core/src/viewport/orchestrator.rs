//! Viewport-driven incremental fetching.
//!
//! `FetchOrchestrator` sits between a map widget and a `GeocacheSource`.
//! The widget reports bounds changes; the orchestrator gates them through a
//! `ViewportDebouncer`, spawns a delayed fetch for each accepted change and
//! merges results into its `GeocacheStore`.
//!
//! Fetch tasks never touch the store. They report back over an MPSC channel
//! and the owner applies results when it drains the channel with
//! `check_background_tasks` or `process_next`, so all store mutation happens
//! on the owner's task. Nothing is merged or published to subscribers until
//! the owner drains; calling `on_map_bounds_change` alone never updates the
//! markers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::debounce::{Decision, GenerationTracker, SyncSettings, ViewportDebouncer};
use crate::api::{ApiError, GeocacheSource};
use crate::cache::{GeocacheStore, MergeStats};
use crate::models::{BoundingBox, FullGeocache, Geocache};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the fetch result channel.
/// Each accepted viewport change produces at most two messages.
const CHANNEL_BUFFER_SIZE: usize = 32;

// ============================================================================
// Background Task Messages
// ============================================================================

/// Messages sent from spawned fetch tasks back to the orchestrator.
enum FetchMessage {
    /// Settle delay elapsed and the request is being sent
    Started(BoundingBox),
    /// Fetch succeeded
    Completed(BoundingBox, HashMap<String, Geocache>),
    /// Fetch failed (network, status or decode)
    Failed(BoundingBox, ApiError),
    /// A newer viewport change replaced this one before it was sent
    Superseded(BoundingBox),
}

// ============================================================================
// Public Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    AwaitingSettle,
    Fetching,
}

/// Immediate result of reporting new map bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsOutcome {
    /// No usable bounds were supplied
    Ignored,
    /// Too soon after the previous accepted change
    Dropped,
    /// A fetch will be issued after the settle delay
    Scheduled,
}

/// What processing a single background message did.
#[derive(Debug)]
pub enum FetchOutcome {
    Started(BoundingBox),
    Merged {
        bbox: BoundingBox,
        stats: MergeStats,
    },
    Failed {
        bbox: BoundingBox,
        error: ApiError,
    },
    Superseded(BoundingBox),
}

pub type FailureHook = Box<dyn Fn(&BoundingBox, &ApiError) + Send + Sync>;

// ============================================================================
// Orchestrator
// ============================================================================

pub struct FetchOrchestrator<S: GeocacheSource> {
    source: Arc<S>,
    debouncer: ViewportDebouncer,
    generations: GenerationTracker,
    store: GeocacheStore,

    awaiting_settle: usize,
    in_flight: usize,

    result_tx: mpsc::Sender<FetchMessage>,
    result_rx: mpsc::Receiver<FetchMessage>,
    published: watch::Sender<Arc<Vec<Geocache>>>,
    failure_hook: Option<FailureHook>,
}

impl<S: GeocacheSource> FetchOrchestrator<S> {
    pub fn new(source: Arc<S>, settings: SyncSettings) -> Self {
        let debouncer = ViewportDebouncer::new(settings);
        let generations = debouncer.generation_tracker();
        let (result_tx, result_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (published, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            source,
            debouncer,
            generations,
            store: GeocacheStore::new(),
            awaiting_settle: 0,
            in_flight: 0,
            result_tx,
            result_rx,
            published,
            failure_hook: None,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        self.debouncer.settings()
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Read access to the session store, e.g. to resolve a clicked marker.
    pub fn store(&self) -> &GeocacheStore {
        &self.store
    }

    /// Current marker set.
    pub fn snapshot(&self) -> Vec<Geocache> {
        self.store.snapshot()
    }

    /// Receive the marker set every time a fetch result is merged.
    ///
    /// Merges only happen while the owner drains results with
    /// `check_background_tasks`, `process_next` or `settle`. A widget that
    /// only reports bounds must also poll one of those to see updates.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Geocache>>> {
        self.published.subscribe()
    }

    /// Called with every failed fetch, after it has been logged.
    pub fn set_failure_hook<F>(&mut self, hook: F)
    where
        F: Fn(&BoundingBox, &ApiError) + Send + Sync + 'static,
    {
        self.failure_hook = Some(Box::new(hook));
    }

    /// State as of the last processed background message.
    pub fn state(&self) -> FetchState {
        if self.in_flight > 0 {
            FetchState::Fetching
        } else if self.awaiting_settle > 0 {
            FetchState::AwaitingSettle
        } else {
            FetchState::Idle
        }
    }

    /// Whether any scheduled fetch has not reported its final outcome yet.
    pub fn has_pending(&self) -> bool {
        self.awaiting_settle > 0 || self.in_flight > 0
    }

    /// Report new map bounds. `None` means the map has no usable bounds yet.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_map_bounds_change(&mut self, bounds: Option<BoundingBox>) -> BoundsOutcome {
        let Some(bbox) = bounds else {
            return BoundsOutcome::Ignored;
        };

        match self.debouncer.offer(Instant::now()) {
            Decision::Dropped { since_last } => {
                debug!(bbox = %bbox, since_last_ms = since_last.as_millis() as u64, "Viewport change dropped");
                BoundsOutcome::Dropped
            }
            Decision::Accepted {
                fire_at,
                generation,
            } => {
                debug!(bbox = %bbox, generation, "Viewport change accepted");
                self.awaiting_settle += 1;

                let source = Arc::clone(&self.source);
                let generations = self.generations.clone();
                let tx = self.result_tx.clone();
                tokio::spawn(async move {
                    Self::execute_fetch(tx, source, generations, bbox, fire_at, generation).await;
                });

                BoundsOutcome::Scheduled
            }
        }
    }

    /// Detail fetch for a single cache. Bypasses the store.
    pub async fn get_geocache(&self, code: &str) -> Result<FullGeocache, ApiError> {
        self.source.get_geocache(code).await
    }

    /// Helper to send fetch messages; a closed channel means the owner is gone
    async fn send_message(tx: &mpsc::Sender<FetchMessage>, message: FetchMessage) {
        if tx.send(message).await.is_err() {
            debug!("Fetch result discarded - orchestrator dropped");
        }
    }

    /// Body of a spawned fetch task: wait out the settle delay, then fetch.
    async fn execute_fetch(
        tx: mpsc::Sender<FetchMessage>,
        source: Arc<S>,
        generations: GenerationTracker,
        bbox: BoundingBox,
        fire_at: Instant,
        generation: u64,
    ) {
        tokio::time::sleep_until(fire_at).await;

        if generations.is_superseded(generation) {
            Self::send_message(&tx, FetchMessage::Superseded(bbox)).await;
            return;
        }

        Self::send_message(&tx, FetchMessage::Started(bbox)).await;

        // Inner task so a panicking source still yields a terminal message
        let request = tokio::spawn(async move { source.search_and_retrieve(&bbox).await });
        let message = match request.await {
            Ok(Ok(geocaches)) => FetchMessage::Completed(bbox, geocaches),
            Ok(Err(error)) => FetchMessage::Failed(bbox, error),
            Err(join_error) => {
                FetchMessage::Failed(bbox, ApiError::TaskFailed(join_error.to_string()))
            }
        };
        Self::send_message(&tx, message).await;
    }

    /// Apply every message already waiting, without blocking.
    pub fn check_background_tasks(&mut self) -> Vec<FetchOutcome> {
        let mut messages = Vec::new();
        while let Ok(message) = self.result_rx.try_recv() {
            messages.push(message);
        }

        messages
            .into_iter()
            .map(|message| self.process_message(message))
            .collect()
    }

    /// Wait for and apply the next message. Returns None when nothing is
    /// pending, instead of waiting forever.
    pub async fn process_next(&mut self) -> Option<FetchOutcome> {
        if !self.has_pending() {
            return None;
        }
        let message = self.result_rx.recv().await?;
        Some(self.process_message(message))
    }

    /// Apply messages until every scheduled fetch has finished.
    pub async fn settle(&mut self) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.process_next().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    fn process_message(&mut self, message: FetchMessage) -> FetchOutcome {
        match message {
            FetchMessage::Started(bbox) => {
                self.awaiting_settle = self.awaiting_settle.saturating_sub(1);
                self.in_flight += 1;
                debug!(bbox = %bbox, "Fetch started");
                FetchOutcome::Started(bbox)
            }
            FetchMessage::Superseded(bbox) => {
                self.awaiting_settle = self.awaiting_settle.saturating_sub(1);
                debug!(bbox = %bbox, "Fetch superseded by newer viewport");
                FetchOutcome::Superseded(bbox)
            }
            FetchMessage::Completed(bbox, geocaches) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                let stats = self.store.merge(geocaches);
                debug!(
                    bbox = %bbox,
                    inserted = stats.inserted,
                    updated = stats.updated,
                    total = self.store.len(),
                    "Fetch merged"
                );
                self.published.send_replace(Arc::new(self.store.snapshot()));
                FetchOutcome::Merged { bbox, stats }
            }
            FetchMessage::Failed(bbox, error) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                warn!(bbox = %bbox, error = %error, "Fetch failed");
                if let Some(ref hook) = self.failure_hook {
                    hook(&bbox, &error);
                }
                FetchOutcome::Failed { bbox, error }
            }
        }
    }
}

impl<S: GeocacheSource> fmt::Debug for FetchOrchestrator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("settings", self.settings())
            .field("state", &self.state())
            .field("cached", &self.store.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
