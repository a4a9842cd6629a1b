//! Detail record returned for a single geocache.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::Geocache;

/// The user who hid a cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Owner {
    pub uuid: String,
    pub username: String,
    pub profile_url: String,
}

/// Everything the detail view shows for one cache.
///
/// Fetched on demand and never merged into the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct FullGeocache {
    #[serde(flatten)]
    pub summary: Geocache,
    pub url: String,
    pub owner: Owner,
    /// HTML as delivered by the service.
    #[serde(default)]
    pub description: String,
    pub difficulty: f64,
    pub terrain: f64,
    /// Legacy numeric size; null for caches without a container.
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub hint: String,
    pub date_hidden: String,
    #[serde(default)]
    pub recommendations: u32,
}

impl FullGeocache {
    pub fn summary(&self) -> &Geocache {
        &self.summary
    }

    pub fn code(&self) -> &str {
        &self.summary.code
    }

    /// Parse `date_hidden`, returning None when the service sent something
    /// other than an RFC 3339 timestamp.
    pub fn hidden_on(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.date_hidden).ok()
    }

    pub fn has_hint(&self) -> bool {
        !self.hint.trim().is_empty()
    }
}
