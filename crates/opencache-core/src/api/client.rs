//! API client for the Opencaching OKAPI REST service.
//!
//! Every call is a single GET with the consumer key attached as a query
//! parameter. Responses are decoded from JSON; nothing is retried here.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Request};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{ApiError, GeocacheSource};
use crate::auth::ConsumerCredentials;
use crate::models::{BoundingBox, FullGeocache, Geocache};

// ============================================================================
// Constants
// ============================================================================

/// Base URL for OKAPI service endpoints on opencaching.pl
pub const DEFAULT_API_URL: &str = "https://opencaching.pl/okapi/services";

/// HTTP request timeout. Expiry is reported like any other network failure.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fields requested for every retrieved geocache.
pub const FULL_FIELDS: &str = "code|name|location|status|type|url|owner|description|difficulty|terrain|size|hint|date_hidden|recommendations";

const SEARCH_AND_RETRIEVE_PATH: &str = "caches/shortcuts/search_and_retrieve";
const SEARCH_BBOX_PATH: &str = "caches/search/bbox";
const GEOCACHE_PATH: &str = "caches/geocache";

const SEARCH_METHOD_BBOX: &str = "services/caches/search/bbox";
const RETRIEVE_METHOD_GEOCACHES: &str = "services/caches/geocaches";

/// Connection settings for `ApiClient`.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub credentials: ConsumerCredentials,
    pub timeout: Duration,
}

impl ApiSettings {
    pub fn new(credentials: ConsumerCredentials) -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            credentials,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// API client for OKAPI.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    consumer_key: String,
    timeout: Duration,
}

impl ApiClient {
    /// Create a new API client with its own connection pool
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self::with_http_client(client, settings))
    }

    /// Create a client on top of an existing reqwest client, sharing its pool.
    /// The timeout in `settings` is still applied to every request.
    pub fn with_http_client(client: Client, settings: ApiSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            consumer_key: settings.credentials.key,
            timeout: settings.timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn search_and_retrieve_request(&self, bbox: &BoundingBox) -> Result<Request, ApiError> {
        let search_params = serde_json::json!({ "bbox": bbox.to_query_format() }).to_string();
        let retr_params = serde_json::json!({ "fields": FULL_FIELDS }).to_string();

        let request = self
            .client
            .get(self.url(SEARCH_AND_RETRIEVE_PATH))
            .header(header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .query(&[
                ("consumer_key", self.consumer_key.as_str()),
                ("search_method", SEARCH_METHOD_BBOX),
                ("search_params", search_params.as_str()),
                ("retr_method", RETRIEVE_METHOD_GEOCACHES),
                ("retr_params", retr_params.as_str()),
                ("wrap", "false"),
            ])
            .build()?;
        Ok(request)
    }

    fn search_bbox_request(&self, bbox: &BoundingBox) -> Result<Request, ApiError> {
        let request = self
            .client
            .get(self.url(SEARCH_BBOX_PATH))
            .header(header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .query(&[
                ("consumer_key", self.consumer_key.as_str()),
                ("bbox", bbox.to_query_format().as_str()),
            ])
            .build()?;
        Ok(request)
    }

    fn geocache_request(&self, code: &str) -> Result<Request, ApiError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ApiError::InvalidRequest("empty cache code".to_string()));
        }

        let request = self
            .client
            .get(self.url(GEOCACHE_PATH))
            .header(header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .query(&[
                ("consumer_key", self.consumer_key.as_str()),
                ("cache_code", code),
                ("fields", FULL_FIELDS),
            ])
            .build()?;
        Ok(request)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn execute<T: DeserializeOwned>(&self, request: Request) -> Result<T, ApiError> {
        let path = request.url().path().to_string();
        let response = self.client.execute(request).await?;
        let response = Self::check_response(response).await?;

        let text = response.text().await?;
        debug!(path = %path, bytes = text.len(), "Response received");

        Ok(serde_json::from_str(&text)?)
    }

    // ===== Data Fetching Methods =====

    /// Search a bounding box and retrieve every match with full fields,
    /// keyed by cache code.
    pub async fn search_and_retrieve(
        &self,
        bbox: &BoundingBox,
    ) -> Result<HashMap<String, Geocache>, ApiError> {
        let request = self.search_and_retrieve_request(bbox)?;
        let caches: HashMap<String, Geocache> = self.execute(request).await?;
        debug!(bbox = %bbox, count = caches.len(), "search_and_retrieve complete");
        Ok(caches)
    }

    /// Plain bounding box search without the retrieve step.
    pub async fn search_in_bounding_box(
        &self,
        bbox: &BoundingBox,
    ) -> Result<Vec<Geocache>, ApiError> {
        let request = self.search_bbox_request(bbox)?;
        let caches: Vec<Geocache> = self.execute(request).await?;
        debug!(bbox = %bbox, count = caches.len(), "search_in_bounding_box complete");
        Ok(caches)
    }

    /// Fetch the full record for a single cache
    pub async fn get_geocache(&self, code: &str) -> Result<FullGeocache, ApiError> {
        let request = self.geocache_request(code)?;
        let cache: FullGeocache = self.execute(request).await?;
        debug!(code = %cache.code(), "get_geocache complete");
        Ok(cache)
    }
}

#[async_trait]
impl GeocacheSource for ApiClient {
    async fn search_and_retrieve(
        &self,
        bbox: &BoundingBox,
    ) -> Result<HashMap<String, Geocache>, ApiError> {
        ApiClient::search_and_retrieve(self, bbox).await
    }

    async fn search_in_bounding_box(&self, bbox: &BoundingBox) -> Result<Vec<Geocache>, ApiError> {
        ApiClient::search_in_bounding_box(self, bbox).await
    }

    async fn get_geocache(&self, code: &str) -> Result<FullGeocache, ApiError> {
        ApiClient::get_geocache(self, code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> ApiClient {
        let mut settings = ApiSettings::new(ConsumerCredentials::new("test-key"));
        settings.base_url = "https://okapi.example/okapi/services/".to_string();
        ApiClient::with_http_client(Client::new(), settings)
    }

    fn query(request: &Request) -> HashMap<String, String> {
        request.url().query_pairs().into_owned().collect()
    }

    #[test]
    fn test_search_and_retrieve_request() {
        let client = test_client();
        let bbox = BoundingBox::new(50.0, 18.0, 51.0, 19.0);
        let request = client.search_and_retrieve_request(&bbox).unwrap();

        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(
            request.url().path(),
            "/okapi/services/caches/shortcuts/search_and_retrieve"
        );
        assert_eq!(
            request
                .headers()
                .get(header::ACCEPT)
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );

        let q = query(&request);
        assert_eq!(q["consumer_key"], "test-key");
        assert_eq!(q["search_method"], "services/caches/search/bbox");
        assert_eq!(q["search_params"], r#"{"bbox":"50.0|18.0|51.0|19.0"}"#);
        assert_eq!(q["retr_method"], "services/caches/geocaches");
        assert_eq!(q["retr_params"], format!(r#"{{"fields":"{}"}}"#, FULL_FIELDS));
        assert_eq!(q["wrap"], "false");
    }

    #[test]
    fn test_injected_client_keeps_request_timeout() {
        let mut settings = ApiSettings::new(ConsumerCredentials::new("test-key"));
        settings.timeout = Duration::from_secs(3);
        let client = ApiClient::with_http_client(Client::new(), settings);
        let bbox = BoundingBox::new(50.0, 18.0, 51.0, 19.0);

        let requests = [
            client.search_and_retrieve_request(&bbox).unwrap(),
            client.search_bbox_request(&bbox).unwrap(),
            client.geocache_request("OP1").unwrap(),
        ];
        for request in &requests {
            assert_eq!(request.timeout(), Some(&Duration::from_secs(3)));
        }
    }

    #[test]
    fn test_search_bbox_request() {
        let client = test_client();
        let bbox = BoundingBox::new(50.1, 18.2, 50.3, 18.4);
        let request = client.search_bbox_request(&bbox).unwrap();

        assert_eq!(request.url().path(), "/okapi/services/caches/search/bbox");
        let q = query(&request);
        assert_eq!(q["consumer_key"], "test-key");
        assert_eq!(q["bbox"], "50.1|18.2|50.3|18.4");
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_geocache_request() {
        let client = test_client();
        let request = client.geocache_request(" OP8ABC ").unwrap();

        assert_eq!(request.url().path(), "/okapi/services/caches/geocache");
        let q = query(&request);
        assert_eq!(q["consumer_key"], "test-key");
        assert_eq!(q["cache_code"], "OP8ABC");
        assert_eq!(q["fields"], FULL_FIELDS);
    }

    #[test]
    fn test_geocache_request_rejects_empty_code() {
        let client = test_client();
        assert!(matches!(
            client.geocache_request("  "),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_parse_unwrapped_search_and_retrieve_response() {
        let json = r#"{
            "OP0001": {"code":"OP0001","name":"First","location":"50.1|18.1","status":"Available","type":"Traditional","url":"u","difficulty":1},
            "OP0002": {"code":"OP0002","name":"Second","location":"50.2|18.2","status":"Archived","type":"Quiz"}
        }"#;
        let parsed: HashMap<String, Geocache> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["OP0001"].name, "First");
        assert_eq!(parsed["OP0002"].kind, crate::models::GeocacheType::Quiz);
    }

    #[test]
    fn test_parse_empty_search_response() {
        let parsed: HashMap<String, Geocache> = serde_json::from_str("{}").unwrap();
        assert!(parsed.is_empty());
    }
}
