use std::collections::HashMap;

use async_trait::async_trait;

use super::ApiError;
use crate::models::{BoundingBox, FullGeocache, Geocache};

/// Anything that can resolve geocaches for a map viewport.
///
/// `ApiClient` is the production implementation; the fetch orchestrator is
/// generic over this trait so it can be driven by an in-memory source.
#[async_trait]
pub trait GeocacheSource: Send + Sync + 'static {
    /// Combined search + retrieve: every cache inside `bbox`, keyed by code.
    async fn search_and_retrieve(
        &self,
        bbox: &BoundingBox,
    ) -> Result<HashMap<String, Geocache>, ApiError>;

    /// Lighter search without full field retrieval.
    async fn search_in_bounding_box(&self, bbox: &BoundingBox) -> Result<Vec<Geocache>, ApiError>;

    /// Single-cache detail fetch. Not cached.
    async fn get_geocache(&self, code: &str) -> Result<FullGeocache, ApiError>;
}
