//! REST API client module for the Opencaching OKAPI service.
//!
//! This module provides the `ApiClient` for searching geocaches inside a
//! map viewport and fetching single-cache details, plus the
//! `GeocacheSource` trait the fetch orchestrator is written against.
//!
//! OKAPI identifies the calling application with a `consumer_key` query
//! parameter; no user authentication is involved.

pub mod client;
pub mod error;
pub mod source;

pub use client::{ApiClient, ApiSettings, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT, FULL_FIELDS};
pub use error::ApiError;
pub use source::GeocacheSource;
