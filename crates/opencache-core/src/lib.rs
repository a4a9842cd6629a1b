//! Opencache core - viewport-driven geocache fetching for Opencaching maps.
//!
//! This crate contains everything below the user interface:
//!
//! - `api`: OKAPI REST client and the `GeocacheSource` trait
//! - `models`: geocache records, locations and bounding boxes
//! - `cache`: the session-scoped, grow-only `GeocacheStore`
//! - `viewport`: debouncing of map bounds changes and the fetch orchestrator
//! - `config` / `auth`: configuration file and consumer credentials

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod utils;
pub mod viewport;

pub use api::{ApiClient, ApiError, ApiSettings, GeocacheSource};
pub use cache::GeocacheStore;
pub use config::Config;
pub use models::{BoundingBox, FullGeocache, Geocache, Location};
pub use viewport::{FetchOrchestrator, SyncSettings};
