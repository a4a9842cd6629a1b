//! Data models for Opencaching entities.
//!
//! This module contains the data structures exchanged with the OKAPI
//! service:
//!
//! - `Geocache`: summary record rendered as a map marker
//! - `FullGeocache`: detail record for a single cache
//! - `Location`: lat/lon pair, encoded as `"lat|lon"` on the wire
//! - `BoundingBox`: rectangular region used to scope a search

pub mod bbox;
pub mod detail;
pub mod geocache;

pub use bbox::{BoundingBox, BoundingBoxParseError};
pub use detail::{FullGeocache, Owner};
pub use geocache::{Geocache, GeocacheStatus, GeocacheType, Location, LocationParseError};
