//! Viewport-driven fetching of geocaches.
//!
//! This module provides:
//! - `ViewportDebouncer`: minimum-interval and settle-delay gating of map
//!   bounds changes
//! - `FetchOrchestrator`: turns accepted bounds changes into fetches and
//!   merges the results into a session `GeocacheStore`

pub mod debounce;
pub mod orchestrator;

pub use debounce::{
    Decision, GenerationTracker, SettleMode, SyncSettings, ViewportDebouncer,
    DEFAULT_MIN_FETCH_INTERVAL, DEFAULT_SETTLE_DELAY,
};
pub use orchestrator::{BoundsOutcome, FailureHook, FetchOrchestrator, FetchOutcome, FetchState};
